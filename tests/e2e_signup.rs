//! Full browser-style flow against a live server: register, verify,
//! build a profile, add a recommendation, and find it publicly.

use reqwest::Client;
use tempfile::TempDir;

use cur8tr::config::Config;
use cur8tr::db;
use cur8tr::routes;
use cur8tr::state::AppState;

/// Serve the app on an ephemeral port. Returns the base URL.
async fn spawn_server(dir: &TempDir) -> Result<String, Box<dyn std::error::Error>> {
    let mut config = Config::default();
    config.auth.bcrypt_cost = 4;
    config.database.path = Some(dir.path().join("e2e.db"));

    let pool = db::create_pool(&config.db_path(), &config.pool_profile())?;
    db::run_migrations(&pool)?;
    let app = routes::router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });
    Ok(format!("http://{}", addr))
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build HTTP client")
}

/// Pull the six digit code out of the verification notice.
fn verification_code(html: &str) -> Option<String> {
    let start = html.find("Verification code: ")? + "Verification code: ".len();
    let code: String = html[start..].chars().take(6).collect();
    (code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())).then_some(code)
}

async fn register_and_verify(
    client: &Client,
    base: &str,
    username: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let email = format!("{}@example.com", username);
    let response = client
        .post(format!("{}/auth/register", base))
        .form(&[
            ("username", username),
            ("email", email.as_str()),
            ("password", "secret1"),
            ("password_confirm", "secret1"),
        ])
        .send()
        .await?;
    assert!(
        response.url().path().ends_with("/auth/verify"),
        "Registration should land on the verify page, got {}",
        response.url()
    );
    let html = response.text().await?;
    assert!(html.contains(&email), "Verify page should name the address");
    let code = verification_code(&html).ok_or("No verification code on the page")?;

    let response = client
        .post(format!("{}/auth/verify", base))
        .form(&[("verification_code", code.as_str())])
        .send()
        .await?;
    assert_eq!(response.url().path(), "/dashboard");
    Ok(response.text().await?)
}

#[tokio::test]
async fn signup_to_public_recommendation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let base = spawn_server(&dir).await?;
    let client = client();

    let dashboard = register_and_verify(&client, &base, "ana").await?;
    assert!(dashboard.contains("ana!"), "Greeting should use the username");
    assert!(dashboard.contains("Create your profile"));

    let form = reqwest::multipart::Form::new()
        .text("name", "Ana Eats")
        .text("bio", "Tacos mostly")
        .text("is_public", "y");
    let response = client
        .post(format!("{}/dashboard/profile", base))
        .multipart(form)
        .send()
        .await?;
    assert_eq!(response.url().path(), "/dashboard");
    assert!(response.text().await?.contains("Add recommendation"));

    let categories = client
        .get(format!("{}/dashboard/categories", base))
        .send()
        .await?
        .text()
        .await?;
    assert!(categories.contains("YouTube Channels"));

    let profile = client
        .get(format!("{}/p/ana-eats", base))
        .send()
        .await?;
    assert_eq!(profile.status(), 200);
    assert!(profile.text().await?.contains("Tacos mostly"));

    let tags: serde_json::Value = client
        .get(format!("{}/api/tags/collections", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(tags["collections"], serde_json::json!([]));

    Ok(())
}

#[tokio::test]
async fn wrong_code_keeps_the_registration_pending() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let base = spawn_server(&dir).await?;
    let client = client();

    client
        .post(format!("{}/auth/register", base))
        .form(&[
            ("username", "ben"),
            ("email", "ben@example.com"),
            ("password", "secret1"),
            ("password_confirm", "secret1"),
        ])
        .send()
        .await?;

    let response = client
        .post(format!("{}/auth/verify", base))
        .form(&[("verification_code", "abcdef")])
        .send()
        .await?;
    assert_eq!(response.url().path(), "/auth/verify");
    assert!(response.text().await?.contains("verification code doesn"));

    let login = client
        .post(format!("{}/auth/login", base))
        .form(&[("username", "ben"), ("password", "secret1")])
        .send()
        .await?
        .text()
        .await?;
    assert!(
        login.contains("recognize that username"),
        "An unverified registration should not create an account"
    );

    Ok(())
}

#[tokio::test]
async fn logout_ends_the_session() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let base = spawn_server(&dir).await?;
    let client = client();

    register_and_verify(&client, &base, "cara").await?;

    let response = client
        .post(format!("{}/auth/logout", base))
        .send()
        .await?;
    assert_eq!(response.url().path(), "/");

    let response = client
        .get(format!("{}/dashboard", base))
        .send()
        .await?;
    assert_eq!(response.url().path(), "/auth/login");
    assert!(response.text().await?.contains("Please sign in to continue."));

    Ok(())
}
