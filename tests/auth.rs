mod common;

use anyhow::Result;
use reqwest::{header, StatusCode};
use serde_json::json;

use common::{data, spawn_app, AuthExt};

#[tokio::test]
async fn health_reports_memory_backend() -> Result<()> {
    let app = spawn_app().await?;
    let res = app.get("/health").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = data(res).await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "memory");
    Ok(())
}

#[tokio::test]
async fn login_sets_http_only_session_cookie() -> Result<()> {
    let app = spawn_app().await?;
    let res = app
        .post("/api/auth/login")
        .json(&json!({ "username": "alice", "password": "alice-pass" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let set_cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(set_cookie.starts_with("sessionid="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let csrf_cookie = common::set_cookie(&res, "csrftoken").expect("csrf cookie");
    let body = data(res).await?;
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["scheme"], "session");
    assert_eq!(csrf_cookie, format!("csrftoken={}", body["csrf_token"].as_str().unwrap_or_default()));
    Ok(())
}

#[tokio::test]
async fn session_wins_over_an_unparseable_authorization_header() -> Result<()> {
    let app = spawn_app().await?;
    let cookie = app.login("alice").await?;

    let res = app
        .get("/api/owned-persons")
        .cookie(&cookie)
        .header(header::AUTHORIZATION, "Token abc123")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .get("/api/owned-persons")
        .header(header::AUTHORIZATION, "Token abc123")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn whoami_accepts_every_scheme() -> Result<()> {
    let app = spawn_app().await?;

    let cookie = app.login("bob").await?;
    let res = app.get("/api/auth/whoami").cookie(&cookie).send().await?;
    let body = data(res).await?;
    assert_eq!(body["username"], "bob");
    assert_eq!(body["permissions"], json!(["view_person_other_owner"]));

    let res = app.get("/api/auth/whoami").basic("carol").send().await?;
    assert_eq!(data(res).await?["scheme"], "basic");

    let token = app.token("admin").await?;
    let res = app.get("/api/auth/whoami").bearer(&token).send().await?;
    let body = data(res).await?;
    assert_eq!(body["scheme"], "token");
    assert_eq!(body["is_superuser"], true);
    Ok(())
}

#[tokio::test]
async fn anonymous_and_bad_credentials_are_unauthorized() -> Result<()> {
    let app = spawn_app().await?;

    let res = app.get("/api/auth/whoami").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .get("/api/auth/whoami")
        .basic_auth("alice", Some("wrong"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Basic realm=\"api\"");

    let res = app.get("/api/auth/whoami").bearer("not-a-jwt").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let res = app
        .post("/api/auth/token")
        .json(&json!({ "username": "alice", "password": "nope" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn malformed_login_body_is_bad_request() -> Result<()> {
    let app = spawn_app().await?;
    let res = app
        .post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app.post("/api/auth/login").json(&json!({ "username": "alice" })).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn logout_invalidates_the_session() -> Result<()> {
    let app = spawn_app().await?;
    let (cookie, csrf) = app.login_with_csrf("alice").await?;

    let res = app.post("/api/auth/logout").cookie(&cookie).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.post("/api/auth/logout").cookie(&cookie).csrf(&csrf).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let cleared = res.headers()[header::SET_COOKIE].to_str()?.to_string();
    assert!(cleared.starts_with("sessionid=;"));
    assert_eq!(data(res).await?, json!({ "message": "Logged out successfully" }));

    let res = app.get("/api/auth/whoami").cookie(&cookie).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.post("/api/auth/logout").cookie(&cookie).csrf(&csrf).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_requires_a_session_not_basic() -> Result<()> {
    let app = spawn_app().await?;
    let res = app.post("/api/auth/logout").basic("alice").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn inactive_users_cannot_authenticate() -> Result<()> {
    let app = spawn_app().await?;
    let token = app.token("alice").await?;
    app.state.accounts().set_active("alice", false).await?;

    let res = app.get("/api/auth/whoami").bearer(&token).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.get("/api/auth/whoami").basic("alice").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
