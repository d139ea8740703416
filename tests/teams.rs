mod common;

use anyhow::Result;
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

use common::{data, spawn_app, AuthExt};

#[tokio::test]
async fn detail_needs_basic_credentials() -> Result<()> {
    let app = spawn_app().await?;

    let res = app.get("/api/teams/1").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Basic realm=\"api\"");

    let token = app.token("alice").await?;
    let res = app.get("/api/teams/1").bearer(&token).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let team = data(app.get("/api/teams/1").basic("alice").send().await?).await?;
    assert_eq!(team, json!({ "id": 1, "name": "Orly", "country": "PL" }));
    Ok(())
}

#[tokio::test]
async fn delete_needs_the_delete_team_permission() -> Result<()> {
    let app = spawn_app().await?;

    let res = app.delete("/api/teams/1").basic("alice").send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "FORBIDDEN");

    // permission is checked before the lookup
    let res = app.delete("/api/teams/99").basic("alice").send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.delete("/api/teams/1").basic("carol").send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app.get("/api/teams/1").basic("carol").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.delete("/api/teams/99").basic("carol").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn superusers_may_delete_and_persons_are_detached() -> Result<()> {
    let app = spawn_app().await?;

    let res = app.delete("/api/teams/2").basic("admin").send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let persons = data(app.get("/api/persons").send().await?).await?;
    assert_eq!(persons[0]["team"], 1);
    assert_eq!(persons[1]["team"], Value::Null);
    Ok(())
}
