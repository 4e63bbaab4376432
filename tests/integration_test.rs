use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use cur8tr::auth::{password, session};
use cur8tr::config::Config;
use cur8tr::db::models::CostTier;
use cur8tr::db::profiles::{self, ProfileInput};
use cur8tr::db::recommendations::{self, RecommendationInput};
use cur8tr::db::users::{self, NewUser};
use cur8tr::db::{self, categories, social};
use cur8tr::messages::{self, Flash, Notice, FLASH_COOKIE};
use cur8tr::routes;
use cur8tr::state::{AppState, DbPool};
use cur8tr::tags::Tags;

const BOUNDARY: &str = "cur8trtestboundary";

struct TestApp {
    _dir: TempDir,
    pool: DbPool,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        config.database.path = Some(dir.path().join("test.db"));

        let pool = db::create_pool(&config.db_path(), &config.pool_profile())
            .expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");

        let router = routes::router(AppState::new(pool.clone(), config));
        Self {
            _dir: dir,
            pool,
            router,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Create a verified user and return (user id, session cookie header).
    fn user(&self, username: &str, is_admin: bool) -> (i64, String) {
        let conn = self.pool.get().unwrap();
        let hash = password::hash("secret1", 4).unwrap();
        let id = users::create(
            &conn,
            &NewUser {
                username,
                email: &format!("{}@example.com", username),
                password_hash: &hash,
                is_admin,
                is_verified: true,
            },
        )
        .unwrap();
        let token = session::create_session(&conn, id, 1).unwrap();
        (id, format!("{}={}", session::SESSION_COOKIE, token))
    }

    fn profile(&self, user_id: i64, name: &str, is_public: bool) -> i64 {
        let conn = self.pool.get().unwrap();
        profiles::create(
            &conn,
            user_id,
            &ProfileInput {
                name: name.to_string(),
                is_public,
                ..Default::default()
            },
            None,
        )
        .unwrap()
    }

    /// Add a recommendation to the profile's category with the given slug.
    fn recommendation(&self, profile_id: i64, category_slug: &str, title: &str, tags: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        let category = categories::find_by_slug(&conn, profile_id, category_slug)
            .unwrap()
            .unwrap();
        recommendations::create(
            &conn,
            &RecommendationInput {
                category_id: category.id,
                title: title.to_string(),
                description: Some("Worth the trip".to_string()),
                pro_tip: None,
                url: None,
                rating: 5,
                cost_rating: CostTier::Budget,
                location: None,
                tags: Tags::from_form(tags, ""),
            },
            None,
        )
        .unwrap()
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_multipart(uri: &str, cookie: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Notices carried by the response's flash cookie.
fn flashes(response: &Response) -> Vec<Flash> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|v| v.strip_prefix(&format!("{}=", FLASH_COOKIE)))
        .flat_map(messages::decode)
        .collect()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn home_page_lists_public_recommendations() {
    let app = TestApp::new();
    let (ana, _) = app.user("ana", false);
    let profile = app.profile(ana, "Ana Eats", true);
    app.recommendation(profile, "food", "Tacos El Gordo", "tacos");

    let response = app.send(get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Tacos El Gordo"));
    assert!(body.contains("Ana Eats"));
}

#[tokio::test]
async fn dashboard_requires_login() {
    let app = TestApp::new();
    let response = app.send(get("/dashboard", None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
    assert_eq!(flashes(&response), vec![Flash::from(Notice::AccessDenied)]);
}

#[tokio::test]
async fn login_distinguishes_failures() {
    let app = TestApp::new();
    app.user("ana", false);

    let response = app
        .send(post_form("/auth/login", None, "username=nobody&password=secret1"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("recognize that username"));

    let response = app
        .send(post_form("/auth/login", None, "username=ana&password=wrong-one"))
        .await;
    assert!(body_text(response).await.contains("match our records"));

    let response = app
        .send(post_form("/auth/login", None, "username=ana&password=secret1"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
    assert!(cookies
        .iter()
        .any(|c| c.to_str().unwrap().starts_with("cur8tr_session=")));
}

#[tokio::test]
async fn logout_clears_the_session() {
    let app = TestApp::new();
    let (_, cookie) = app.user("ana", false);

    let response = app.send(post_form("/auth/logout", Some(&cookie), "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(flashes(&response), vec![Flash::from(Notice::LogoutSuccess)]);

    let response = app.send(get("/dashboard", Some(&cookie))).await;
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn creating_a_profile_adds_default_categories() {
    let app = TestApp::new();
    let (ana, cookie) = app.user("ana", false);

    let response = app
        .send(post_multipart(
            "/dashboard/profile",
            &cookie,
            &[("name", "Ana Eats"), ("bio", "Tacos mostly"), ("is_public", "y")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");

    let conn = app.pool.get().unwrap();
    let profile = profiles::find_by_user(&conn, ana).unwrap().unwrap();
    assert_eq!(profile.slug, "ana-eats");
    assert_eq!(categories::count(&conn, profile.id).unwrap(), 6);

    let response = app.send(get("/dashboard/categories", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Where To Stay"));
    assert!(!body.contains("default categories to your profile"));
}

#[tokio::test]
async fn invalid_profile_is_rerendered_with_errors() {
    let app = TestApp::new();
    let (_, cookie) = app.user("ana", false);

    let response = app
        .send(post_multipart(
            "/dashboard/profile",
            &cookie,
            &[("name", "A"), ("tiktok_handle", "not valid!")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Profile name must be between 2 and 100 characters"));
    assert!(body.contains("TikTok handle can only contain"));
}

#[tokio::test]
async fn new_recommendation_requires_a_profile() {
    let app = TestApp::new();
    let (_, cookie) = app.user("ana", false);

    let response = app
        .send(get("/dashboard/recommendations/new", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard/profile");
    assert_eq!(flashes(&response), vec![Flash::from(Notice::ProfileRequired)]);
}

#[tokio::test]
async fn recommendation_is_created_and_searchable_by_tag() {
    let app = TestApp::new();
    let (ana, cookie) = app.user("ana", false);
    let profile = app.profile(ana, "Ana Eats", true);
    let food = {
        let conn = app.pool.get().unwrap();
        categories::find_by_slug(&conn, profile, "food").unwrap().unwrap()
    };

    let category_id = food.id.to_string();
    let response = app
        .send(post_multipart(
            "/dashboard/recommendations/new",
            &cookie,
            &[
                ("category_id", category_id.as_str()),
                ("title", "Tacos El Gordo"),
                ("rating", "5"),
                ("cost_rating", "$"),
                ("pro_tip", "Order the adobada"),
                ("category_tags", "Tacos, Late Night"),
                ("collection_tags", "Vegas 2025"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard/recommendations");
    assert_eq!(
        flashes(&response),
        vec![Flash::from(Notice::RecommendationAdded)]
    );

    let listed = {
        let conn = app.pool.get().unwrap();
        recommendations::list_for_profile(&conn, profile).unwrap()
    };
    assert_eq!(listed.len(), 1);
    let rec = &listed[0].rec;
    assert_eq!(rec.tags.categories, vec!["tacos", "late-night"]);

    let response = app.send(get(&listed[0].href(), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Order the adobada"));

    let response = app
        .send(get("/api/recommendations?tags=tacos,vegas-2025", None))
        .await;
    let found = body_json(response).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["title"], "Tacos El Gordo");
    assert_eq!(found[0]["profile"]["slug"], "ana-eats");
    assert_eq!(found[0]["category"]["slug"], "food");

    let response = app.send(get("/api/recommendations?tags=taco", None)).await;
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn recommendation_in_someone_elses_category_is_rejected() {
    let app = TestApp::new();
    let (ana, _) = app.user("ana", false);
    let (ben, ben_cookie) = app.user("ben", false);
    let ana_profile = app.profile(ana, "Ana Eats", true);
    app.profile(ben, "Ben Reads", true);
    let ana_food = {
        let conn = app.pool.get().unwrap();
        categories::find_by_slug(&conn, ana_profile, "food")
            .unwrap()
            .unwrap()
    };

    let category_id = ana_food.id.to_string();
    let response = app
        .send(post_multipart(
            "/dashboard/recommendations/new",
            &ben_cookie,
            &[
                ("category_id", category_id.as_str()),
                ("title", "Sneaky"),
                ("rating", "3"),
                ("cost_rating", "$$"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Not a valid choice."));

    let conn = app.pool.get().unwrap();
    assert!(recommendations::list_for_category(&conn, ana_food.id)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn owners_only_edit_their_own_content() {
    let app = TestApp::new();
    let (ana, _) = app.user("ana", false);
    let (ben, ben_cookie) = app.user("ben", false);
    let ana_profile = app.profile(ana, "Ana Eats", true);
    app.profile(ben, "Ben Reads", true);
    let rec = app.recommendation(ana_profile, "food", "Tacos El Gordo", "tacos");

    let response = app
        .send(get(
            &format!("/dashboard/recommendations/{}/edit", rec),
            Some(&ben_cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(post_form(
            &format!("/dashboard/recommendations/{}/delete", rec),
            Some(&ben_cookie),
            "",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let conn = app.pool.get().unwrap();
    assert!(recommendations::find(&conn, rec).unwrap().is_some());
}

#[tokio::test]
async fn recommendation_page_renders_comments_and_like_button() {
    let app = TestApp::new();
    let (ana, ana_cookie) = app.user("ana", false);
    let profile = app.profile(ana, "Ana Eats", true);
    let rec = app.recommendation(profile, "food", "Tacos El Gordo", "tacos");
    {
        let conn = app.pool.get().unwrap();
        social::add_comment(&conn, ana, rec, "Still the best in town").unwrap();
    }
    let page = format!("/p/ana-eats/food/{}", rec);

    let response = app.send(get(&page, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Tacos El Gordo"));
    assert!(body.contains("Still the best in town"));
    assert!(!body.contains("class=\"link danger\""));

    let response = app.send(get(&page, Some(&ana_cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("data-like-url="));
    assert!(body.contains("class=\"link danger\""));
}

#[tokio::test]
async fn owner_deletes_recommendation_with_its_likes_and_comments() {
    let app = TestApp::new();
    let (ana, ana_cookie) = app.user("ana", false);
    let (ben, _) = app.user("ben", false);
    let profile = app.profile(ana, "Ana Eats", true);
    let rec = app.recommendation(profile, "food", "Tacos El Gordo", "tacos");
    {
        let conn = app.pool.get().unwrap();
        social::toggle_like(&conn, ben, rec).unwrap();
        social::add_comment(&conn, ben, rec, "Love it").unwrap();
    }

    let response = app
        .send(post_form(
            &format!("/dashboard/recommendations/{}/delete", rec),
            Some(&ana_cookie),
            "",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard/recommendations");
    assert_eq!(
        flashes(&response),
        vec![Flash::from(Notice::RecommendationDeleted)]
    );

    let conn = app.pool.get().unwrap();
    assert!(recommendations::find(&conn, rec).unwrap().is_none());
    assert_eq!(social::like_count(&conn, rec).unwrap(), 0);
    assert!(social::comments_for(&conn, rec).unwrap().is_empty());
}

#[tokio::test]
async fn tag_api_checks_ownership() {
    let app = TestApp::new();
    let (ana, ana_cookie) = app.user("ana", false);
    let (_, ben_cookie) = app.user("ben", false);
    let profile = app.profile(ana, "Ana Eats", true);
    let rec = app.recommendation(profile, "food", "Tacos El Gordo", "tacos");
    let uri = format!("/api/recommendations/{}/tags", rec);

    let body = serde_json::json!({ "tag": "Date Night" });
    let response = app.send(json_request("POST", &uri, None, body.clone())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(json_request("POST", &uri, Some(&ben_cookie), body.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "You can only edit your own recommendations"
    );

    let response = app
        .send(json_request("POST", &uri, Some(&ana_cookie), body))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["tags"], serde_json::json!(["tacos", "date-night"]));

    let response = app
        .send(json_request(
            "PUT",
            &uri,
            Some(&ana_cookie),
            serde_json::json!({ "categories": ["Food"], "collections": [] }),
        ))
        .await;
    assert_eq!(body_json(response).await["tags"], serde_json::json!(["food"]));

    let response = app
        .send(json_request(
            "DELETE",
            "/api/recommendations/9999/tags",
            Some(&ana_cookie),
            serde_json::json!({ "tag": "food" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn category_tag_list_includes_defaults() {
    let app = TestApp::new();
    let (ana, _) = app.user("ana", false);
    let profile = app.profile(ana, "Ana Eats", true);
    app.recommendation(profile, "food", "Tacos El Gordo", "late-night");

    let response = app.send(get("/api/tags/categories", None)).await;
    let json = body_json(response).await;
    let categories = json["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 7);
    assert!(categories.contains(&serde_json::json!({
        "id": "late-night",
        "name": "Late Night",
        "kind": "category"
    })));

    let response = app.send(get("/api/tags/collections", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn like_toggles_and_reports_json() {
    let app = TestApp::new();
    let (ana, _) = app.user("ana", false);
    let (_, ben_cookie) = app.user("ben", false);
    let profile = app.profile(ana, "Ana Eats", true);
    let rec = app.recommendation(profile, "food", "Tacos El Gordo", "tacos");
    let uri = format!("/p/ana-eats/food/{}/like", rec);

    let response = app.send(post_form(&uri, None, "")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(post_form(&uri, Some(&ben_cookie), "")).await;
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["action"], "liked");
    assert_eq!(json["like_count"], 1);
    assert_eq!(json["is_liked"], true);

    let response = app.send(post_form(&uri, Some(&ben_cookie), "")).await;
    let json = body_json(response).await;
    assert_eq!(json["action"], "unliked");
    assert_eq!(json["like_count"], 0);
}

#[tokio::test]
async fn comments_are_deleted_by_author_or_owner_only() {
    let app = TestApp::new();
    let (ana, ana_cookie) = app.user("ana", false);
    let (_, ben_cookie) = app.user("ben", false);
    let (_, cara_cookie) = app.user("cara", false);
    let profile = app.profile(ana, "Ana Eats", true);
    let rec = app.recommendation(profile, "food", "Tacos El Gordo", "tacos");
    let page = format!("/p/ana-eats/food/{}", rec);

    let response = app
        .send(post_form(&page, Some(&ben_cookie), "content=Love+this+place"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(flashes(&response), vec![Flash::from(Notice::CommentAdded)]);

    let comment = {
        let conn = app.pool.get().unwrap();
        social::comments_for(&conn, rec).unwrap().remove(0)
    };
    assert_eq!(comment.author, "ben");
    let delete = format!("{}/comment/{}/delete", page, comment.id);

    let response = app.send(post_form(&delete, Some(&cara_cookie), "")).await;
    assert_eq!(
        flashes(&response),
        vec![Flash::from(Notice::CommentPermissionDenied)]
    );

    let response = app.send(post_form(&delete, Some(&ana_cookie), "")).await;
    assert_eq!(flashes(&response), vec![Flash::from(Notice::CommentDeleted)]);
    let conn = app.pool.get().unwrap();
    assert!(social::comments_for(&conn, rec).unwrap().is_empty());
}

#[tokio::test]
async fn follow_rules() {
    let app = TestApp::new();
    let (ana, ana_cookie) = app.user("ana", false);
    let (ben, ben_cookie) = app.user("ben", false);
    app.profile(ana, "Ana Eats", true);

    let response = app
        .send(post_form(&format!("/follow/{}", ana), Some(&ana_cookie), ""))
        .await;
    assert_eq!(flashes(&response), vec![Flash::from(Notice::CannotFollowSelf)]);

    let response = app
        .send(post_form(&format!("/follow/{}", ana), Some(&ben_cookie), ""))
        .await;
    assert_eq!(location(&response), "/");
    assert_eq!(
        flashes(&response),
        vec![Flash::success("You are now following Ana Eats!")]
    );

    let response = app
        .send(post_form(&format!("/follow/{}", ana), Some(&ben_cookie), ""))
        .await;
    assert_eq!(flashes(&response), vec![Flash::from(Notice::AlreadyFollowing)]);

    let response = app
        .send(post_form(&format!("/unfollow/{}", ben), Some(&ana_cookie), ""))
        .await;
    assert_eq!(flashes(&response), vec![Flash::from(Notice::NotFollowing)]);

    let conn = app.pool.get().unwrap();
    assert_eq!(social::follower_count(&conn, ana).unwrap(), 1);
}

#[tokio::test]
async fn private_profiles_are_visible_to_their_owner_only() {
    let app = TestApp::new();
    let (ana, ana_cookie) = app.user("ana", false);
    let (_, ben_cookie) = app.user("ben", false);
    app.profile(ana, "Ana Eats", false);

    let response = app.send(get("/p/ana-eats", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.send(get("/p/ana-eats", Some(&ben_cookie))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.send(get("/p/ana-eats", Some(&ana_cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn share_page_has_qr_code_for_public_profiles() {
    let app = TestApp::new();
    let (ana, cookie) = app.user("ana", false);
    app.profile(ana, "Ana Eats", true);

    let request = Request::builder()
        .uri("/dashboard/share")
        .header(header::COOKIE, &cookie)
        .header(header::HOST, "cur8tr.test")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("cur8tr.test"));
    assert!(body.contains("ana-eats"));
    assert!(body.contains("<svg"));
}

#[tokio::test]
async fn admin_page_requires_admin() {
    let app = TestApp::new();
    let (_, user_cookie) = app.user("ana", false);
    let (_, admin_cookie) = app.user("root", true);

    let response = app.send(get("/admin", Some(&user_cookie))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.send(get("/admin", Some(&admin_cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("development"));
    assert!(body.contains("ana@example.com"));
}

#[tokio::test]
async fn flash_cookie_is_cleared_after_display() {
    let app = TestApp::new();
    let cookie = format!(
        "{}={}",
        FLASH_COOKIE,
        messages::encode(&[Flash::from(Notice::LogoutSuccess)])
    );

    let response = app.send(get("/", Some(&cookie))).await;
    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.to_str().unwrap() == messages::clear_flash_cookie());
    assert!(cleared);
    assert!(body_text(response).await.contains("safely signed out"));
}
