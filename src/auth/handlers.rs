use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Form;
use chrono::Utc;

use crate::auth::registration::{self, VerifyOutcome, PENDING_COOKIE};
use crate::auth::{password, session};
use crate::db::users::{self, NewUser};
use crate::error::{AppError, AppResult};
use crate::extractors::{Flashes, MaybeUser};
use crate::forms::{FieldErrors, ForgotForm, LoginForm, RegisterForm, VerifyForm};
use crate::messages::{redirect_with, Flash, Notice};
use crate::routes::home::{Html, Layout};
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub form: RegisterForm,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "auth/verify.html")]
pub struct VerifyTemplate {
    pub layout: Layout,
    pub email: String,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub form: LoginForm,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "auth/forgot.html")]
pub struct ForgotTemplate {
    pub layout: Layout,
    pub email: String,
}

// -- Helpers --

/// Append a Set-Cookie header to a response.
pub(crate) fn with_cookie(mut response: Response, cookie: String) -> Response {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Invalid cookie header: {}", e),
    }
    response
}

async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash(&password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

// -- Registration --

/// GET /auth/register
pub async fn register_page(user: MaybeUser, flashes: Flashes) -> AppResult<Response> {
    Ok(Html(RegisterTemplate {
        layout: Layout::new(user.0.as_ref(), flashes),
        form: RegisterForm::default(),
        errors: FieldErrors::default(),
    })
    .into_response())
}

/// POST /auth/register: hold the registration and hand out a verification code.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let render = |form: RegisterForm, errors: FieldErrors, notice: Notice| {
        Html(RegisterTemplate {
            layout: Layout::default().with(notice),
            form,
            errors,
        })
        .into_response()
    };

    if let Err(errors) = form.validate() {
        tracing::debug!("Registration form invalid: {:?}", errors);
        return Ok(render(form, errors, Notice::FormValidationError));
    }

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();
    {
        let conn = state.db.get()?;
        if users::username_taken(&conn, &username)? {
            tracing::info!("Registration rejected: username {} taken", username);
            return Ok(render(form, FieldErrors::default(), Notice::RegisterUsernameTaken));
        }
        if users::email_taken(&conn, &email)? {
            tracing::info!("Registration rejected: email already registered");
            return Ok(render(form, FieldErrors::default(), Notice::RegisterEmailTaken));
        }
    }

    let password_hash = hash_password(form.password.clone(), state.config.auth.bcrypt_cost).await?;
    let minutes = state.config.auth.verification_minutes;
    let (pending_id, code) = {
        let mut pending = state.pending.lock().await;
        pending.insert(username.clone(), email.clone(), password_hash, Utc::now())
    };

    // No mail transport; the code is logged and shown on the next page.
    tracing::info!("Verification code for {}: {}", email, code);

    let response = redirect_with(
        "/auth/verify",
        &[
            Notice::RegisterSuccess.into(),
            Flash::info(format!(
                "Verification code: {} (expires in {} minutes)",
                code, minutes
            )),
        ],
    );
    Ok(with_cookie(
        response,
        registration::pending_cookie(&pending_id, minutes, state.secure_cookies()),
    ))
}

/// GET /auth/verify
pub async fn verify_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    flashes: Flashes,
) -> AppResult<Response> {
    let email = {
        let pending = state.pending.lock().await;
        session::cookie_value(&headers, PENDING_COOKIE)
            .and_then(|id| pending.get(id, Utc::now()))
            .map(|p| p.email.clone())
    };

    match email {
        Some(email) => Ok(Html(VerifyTemplate {
            layout: Layout::new(None, flashes),
            email,
        })
        .into_response()),
        None => Ok(with_cookie(
            redirect_with("/auth/register", &[Notice::VerifyExpired.into()]),
            registration::clear_pending_cookie(),
        )),
    }
}

/// POST /auth/verify: a correct code creates the verified user and signs them in.
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<VerifyForm>,
) -> AppResult<Response> {
    let Some(pending_id) = session::cookie_value(&headers, PENDING_COOKIE) else {
        return Ok(redirect_with("/auth/register", &[]));
    };

    let outcome = {
        let mut pending = state.pending.lock().await;
        pending.verify(pending_id, &form.verification_code, Utc::now())
    };

    let pending = match outcome {
        VerifyOutcome::Verified(pending) => pending,
        VerifyOutcome::WrongCode => {
            return Ok(redirect_with("/auth/verify", &[Notice::VerifyInvalidCode.into()]));
        }
        VerifyOutcome::Expired | VerifyOutcome::Missing => {
            return Ok(with_cookie(
                redirect_with("/auth/register", &[Notice::VerifyExpired.into()]),
                registration::clear_pending_cookie(),
            ));
        }
        VerifyOutcome::TooManyAttempts => {
            return Ok(with_cookie(
                redirect_with("/auth/register", &[Notice::VerifyTooManyAttempts.into()]),
                registration::clear_pending_cookie(),
            ));
        }
    };

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    // The name could have been claimed while the code was outstanding.
    if users::username_taken(&tx, &pending.username)? {
        return Ok(redirect_with("/auth/register", &[Notice::RegisterUsernameTaken.into()]));
    }
    if users::email_taken(&tx, &pending.email)? {
        return Ok(redirect_with("/auth/register", &[Notice::RegisterEmailTaken.into()]));
    }
    let user_id = users::create(
        &tx,
        &NewUser {
            username: &pending.username,
            email: &pending.email,
            password_hash: &pending.password_hash,
            is_admin: false,
            is_verified: true,
        },
    )?;
    let token = session::create_session(&tx, user_id, state.config.auth.session_hours)?;
    tx.commit()?;

    tracing::info!("User {} verified and registered (id {})", pending.username, user_id);

    let response = redirect_with("/dashboard", &[Notice::VerifySuccess.into()]);
    let response = with_cookie(response, registration::clear_pending_cookie());
    Ok(with_cookie(
        response,
        session::session_cookie(
            &token,
            state.config.auth.session_hours,
            state.secure_cookies(),
        ),
    ))
}

// -- Login / logout --

/// GET /auth/login
pub async fn login_page(user: MaybeUser, flashes: Flashes) -> AppResult<Response> {
    Ok(Html(LoginTemplate {
        layout: Layout::new(user.0.as_ref(), flashes),
        form: LoginForm::default(),
        errors: FieldErrors::default(),
    })
    .into_response())
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let render = |form: LoginForm, errors: FieldErrors, notice: Notice| {
        Html(LoginTemplate {
            layout: Layout::default().with(notice),
            form: LoginForm {
                password: String::new(),
                ..form
            },
            errors,
        })
        .into_response()
    };

    if let Err(errors) = form.validate() {
        return Ok(render(form, errors, Notice::FormValidationError));
    }

    let conn = state.db.get()?;
    let Some(user) = users::find_by_username(&conn, form.username.trim())? else {
        tracing::info!("Login failed: unknown user {}", form.username.trim());
        return Ok(render(form, FieldErrors::default(), Notice::LoginUserNotFound));
    };

    let candidate = form.password.clone();
    let stored = user.password_hash.clone();
    let password_ok = tokio::task::spawn_blocking(move || password::verify(&candidate, &stored))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !user.is_verified {
        tracing::info!("Login refused: {} is not verified", user.username);
        return Ok(render(form, FieldErrors::default(), Notice::LoginUnverified));
    }
    if !password_ok {
        tracing::info!("Login failed: wrong password for {}", user.username);
        return Ok(render(form, FieldErrors::default(), Notice::LoginWrongPassword));
    }

    let token = session::create_session(&conn, user.id, state.config.auth.session_hours)?;
    tracing::info!("User {} signed in", user.username);

    Ok(with_cookie(
        redirect_with("/dashboard", &[Notice::LoginSuccess.into()]),
        session::session_cookie(
            &token,
            state.config.auth.session_hours,
            state.secure_cookies(),
        ),
    ))
}

/// GET or POST /auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = session::cookie_value(&headers, session::SESSION_COOKIE) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok(with_cookie(
        redirect_with("/", &[Notice::LogoutSuccess.into()]),
        session::clear_session_cookie(),
    ))
}

// -- Password reset --

/// GET /auth/forgot
pub async fn forgot_page(user: MaybeUser, flashes: Flashes) -> AppResult<Response> {
    Ok(Html(ForgotTemplate {
        layout: Layout::new(user.0.as_ref(), flashes),
        email: String::new(),
    })
    .into_response())
}

/// POST /auth/forgot: report whether the address is known. Nothing is sent.
pub async fn forgot(
    State(state): State<AppState>,
    user: MaybeUser,
    Form(form): Form<ForgotForm>,
) -> AppResult<Response> {
    let email = form.email.trim().to_string();
    let conn = state.db.get()?;
    let notice = if users::find_by_email(&conn, &email)?.is_some() {
        tracing::info!("Password reset requested for a known address");
        Notice::PasswordResetSent
    } else {
        Notice::PasswordResetUnknownEmail
    };

    Ok(Html(ForgotTemplate {
        layout: Layout::new(user.0.as_ref(), Flashes::default()).with(notice),
        email,
    })
    .into_response())
}
