mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{data, ids, spawn_app, AuthExt, ALICE_ID};

#[tokio::test]
async fn list_is_scoped_to_the_owner() -> Result<()> {
    let app = spawn_app().await?;

    let rows = data(app.get("/api/owned-persons").basic("alice").send().await?).await?;
    assert_eq!(ids(&rows), vec![1, 3]);
    for row in rows.as_array().into_iter().flatten() {
        assert_eq!(row["owner"], ALICE_ID);
    }

    // carol owns nothing
    let rows = data(app.get("/api/owned-persons").basic("carol").send().await?).await?;
    assert_eq!(rows, json!([]));
    Ok(())
}

#[tokio::test]
async fn elevated_users_see_every_owner() -> Result<()> {
    let app = spawn_app().await?;
    let cookie = app.login("bob").await?;

    let rows = data(app.get("/api/owned-persons").cookie(&cookie).send().await?).await?;
    assert_eq!(ids(&rows), vec![1, 2, 3]);

    let rows = data(app.get("/api/owned-persons").basic("admin").send().await?).await?;
    assert_eq!(ids(&rows), vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn list_query_narrows_within_the_scope() -> Result<()> {
    let app = spawn_app().await?;

    let rows = data(app.get("/api/owned-persons?q=SMI").basic("bob").send().await?).await?;
    assert_eq!(ids(&rows), vec![3]);

    // Marian belongs to bob, so alice cannot find him
    let rows = data(app.get("/api/owned-persons?q=marian").basic("alice").send().await?).await?;
    assert_eq!(rows, json!([]));
    Ok(())
}

#[tokio::test]
async fn list_and_create_need_session_or_basic() -> Result<()> {
    let app = spawn_app().await?;
    let res = app.get("/api/owned-persons").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = app.token("alice").await?;
    let res = app
        .post("/api/owned-persons")
        .bearer(&token)
        .json(&json!({ "first_name": "A", "last_name": "B", "sex": "other" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn create_forces_the_owner() -> Result<()> {
    let app = spawn_app().await?;

    let res = app
        .post("/api/owned-persons")
        .basic("alice")
        .json(&json!({
            "first_name": "Zofia",
            "last_name": "Lis",
            "sex": "female",
            "position": 2,
            "owner": 99,
            "created_at": "1999-01-01T00:00:00Z"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let created = data(res).await?;
    assert_eq!(created["id"], 4);
    assert_eq!(created["owner"], ALICE_ID);
    assert_eq!(created["position"], 2);
    assert_ne!(created["created_at"], "1999-01-01T00:00:00Z");

    let rows = data(app.get("/api/owned-persons").basic("alice").send().await?).await?;
    assert_eq!(ids(&rows), vec![1, 3, 4]);
    Ok(())
}

#[tokio::test]
async fn create_reports_missing_and_invalid_fields() -> Result<()> {
    let app = spawn_app().await?;

    let res = app
        .post("/api/owned-persons")
        .basic("alice")
        .json(&json!({ "first_name": "Zofia", "sex": "unknown", "position": 42 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["field_errors"]["last_name"][0], "This field is required.");
    assert_eq!(body["field_errors"]["sex"][0], "\"unknown\" is not a valid choice.");
    assert_eq!(body["field_errors"]["position"][0], "Invalid pk \"42\" - object does not exist.");

    let res = app.post("/api/owned-persons").basic("alice").json(&json!([1, 2])).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(
        body["field_errors"]["non_field_errors"][0],
        "Invalid data. Expected a dictionary, but got list."
    );
    Ok(())
}

#[tokio::test]
async fn detail_and_delete_are_public() -> Result<()> {
    let app = spawn_app().await?;

    let row = data(app.get("/api/owned-persons/2").send().await?).await?;
    assert_eq!(row["first_name"], "Marian");
    assert_eq!(row["sex"], "male");

    let res = app.delete("/api/owned-persons/2").send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app.get("/api/owned-persons/2").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = app.delete("/api/owned-persons/2").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn search_matches_either_name_case_insensitively() -> Result<()> {
    let app = spawn_app().await?;

    let rows = data(app.get("/api/search/owned-persons/an").send().await?).await?;
    assert_eq!(ids(&rows), vec![1, 2]);

    let rows = data(app.get("/api/search/owned-persons/AN").send().await?).await?;
    assert_eq!(ids(&rows), vec![1, 2]);

    let rows = data(app.get("/api/search/owned-persons/kowal").send().await?).await?;
    assert_eq!(ids(&rows), vec![2]);

    // wildcard characters are literal
    let rows = data(app.get("/api/search/owned-persons/%25").send().await?).await?;
    assert_eq!(rows, json!([]));
    Ok(())
}
