mod common;

use anyhow::Result;
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

use common::{data, ids, spawn_app, AuthExt};

#[tokio::test]
async fn list_is_public() -> Result<()> {
    let app = spawn_app().await?;
    let res = app.get("/api/persons").send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let rows = data(res).await?;
    assert_eq!(ids(&rows), vec![1, 2]);
    assert_eq!(
        rows[0],
        json!({ "id": 1, "name": "Ola", "shirt_size": "M", "month_added": 3, "team": 1 })
    );
    Ok(())
}

#[tokio::test]
async fn detail_needs_a_token() -> Result<()> {
    let app = spawn_app().await?;

    let res = app.get("/api/persons/1").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");

    // Basic credentials are valid but not accepted here
    let res = app.get("/api/persons/1").basic("admin").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = app.token("alice").await?;
    let res = app.get("/api/persons/2").bearer(&token).send().await?;
    assert_eq!(data(res).await?["name"], "Jan");

    let res = app.get("/api/persons/99").bearer(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.get("/api/persons/abc").bearer(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn update_persists_and_keeps_omitted_fields() -> Result<()> {
    let app = spawn_app().await?;

    let res = app
        .put("/api/persons/1/update")
        .basic("alice")
        .json(&json!({ "name": "Ola", "shirt_size": "L" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(data(res).await?["shirt_size"], "L");

    let token = app.token("alice").await?;
    let person = data(app.get("/api/persons/1").bearer(&token).send().await?).await?;
    assert_eq!(person["shirt_size"], "L");
    assert_eq!(person["month_added"], 3);
    assert_eq!(person["team"], 1);
    Ok(())
}

#[tokio::test]
async fn update_through_a_session() -> Result<()> {
    let app = spawn_app().await?;
    let (cookie, csrf) = app.login_with_csrf("bob").await?;

    let res = app
        .put("/api/persons/2/update")
        .cookie(&cookie)
        .csrf(&csrf)
        .json(&json!({ "name": "Janek", "team": null, "id": 40 }))
        .send()
        .await?;
    let person = data(res).await?;
    assert_eq!(person["id"], 2);
    assert_eq!(person["name"], "Janek");
    assert_eq!(person["team"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn session_updates_need_the_csrf_token() -> Result<()> {
    let app = spawn_app().await?;
    let (cookie, csrf) = app.login_with_csrf("bob").await?;

    let res = app
        .put("/api/persons/1/update")
        .cookie(&cookie)
        .header("Origin", "https://evil.example")
        .json(&json!({ "name": "pwned" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(body["message"], "CSRF Failed: CSRF token missing.");

    let res = app
        .put("/api/persons/1/update")
        .cookie(&cookie)
        .csrf("not-the-token")
        .json(&json!({ "name": "pwned" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .put("/api/persons/1/update")
        .cookie(&cookie)
        .csrf(&csrf)
        .json(&json!({ "name": "Olek" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(data(res).await?["name"], "Olek");
    Ok(())
}

#[tokio::test]
async fn update_validation_errors() -> Result<()> {
    let app = spawn_app().await?;

    let res = app
        .put("/api/persons/1/update")
        .basic("alice")
        .json(&json!({ "shirt_size": "XL", "month_added": 13, "team": 77 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields = &body["field_errors"];
    assert_eq!(fields["name"][0], "This field is required.");
    assert_eq!(fields["shirt_size"][0], "\"XL\" is not a valid choice.");
    assert_eq!(fields["month_added"][0], "Ensure this value is less than or equal to 12.");
    assert_eq!(fields["team"][0], "Invalid pk \"77\" - object does not exist.");

    let res = app
        .put("/api/persons/99/update")
        .basic("alice")
        .json(&json!({ "name": "Ghost" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.put("/api/persons/1/update").json(&json!({ "name": "Anon" })).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn delete_then_detail_is_not_found() -> Result<()> {
    let app = spawn_app().await?;
    let token = app.token("carol").await?;

    let res = app.delete("/api/persons/1/delete").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.delete("/api/persons/1/delete").bearer(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.bytes().await?.is_empty());

    let res = app.get("/api/persons/1").bearer(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.delete("/api/persons/1/delete").bearer(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
