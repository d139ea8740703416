#![allow(dead_code)]

use anyhow::{Context, Result};
use reqwest::{header, redirect, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use roster_api::config::AppConfig;
use roster_api::database::models::{OwnedPersonDraft, PersonDraft, PositionDraft, Sex, ShirtSize, TeamDraft};
use roster_api::database::{Repository, Store};
use roster_api::policy::Permission;
use roster_api::state::AppState;

/// Seeded users in id order: (username, superuser, permissions).
pub const USERS: [(&str, bool, &[Permission]); 5] = [
    ("admin", true, &[]),
    ("alice", false, &[]),
    ("bob", false, &[Permission::ViewPersonOtherOwner]),
    ("carol", false, &[Permission::DeleteTeam]),
    ("dave", false, &[Permission::ViewPerson]),
];

pub const ALICE_ID: i64 = 2;
pub const BOB_ID: i64 = 3;

pub fn password(username: &str) -> String {
    format!("{}-pass", username)
}

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
}

/// Start the router on a free port over a freshly seeded in-memory store.
///
/// Teams: 1 Orly (PL), 2 Lions (GB). Persons: 1 Ola (team 1), 2 Jan (team 2).
/// Positions: 1 Goalkeeper, 2 Striker. Owned persons: 1 Anna Nowak (alice,
/// position 1), 2 Marian Kowal (bob, position 1), 3 Tom Smith (alice).
pub async fn spawn_app() -> Result<TestApp> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("roster_api=warn"))
        .with_test_writer()
        .try_init();

    let state = AppState::new(Store::memory(), AppConfig::development());
    seed(&state).await?;

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let app = roster_api::app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()?;

    Ok(TestApp {
        base_url: format!("http://127.0.0.1:{}", port),
        client,
        state,
    })
}

async fn seed(state: &AppState) -> Result<()> {
    let accounts = state.accounts();
    for (username, superuser, permissions) in USERS {
        accounts.create_user(username, &password(username), superuser).await?;
        for permission in permissions {
            accounts.grant(username, *permission).await?;
        }
    }

    let store = &state.store;
    for (name, country) in [("Orly", "PL"), ("Lions", "GB")] {
        store.teams.insert(TeamDraft { name: name.into(), country: country.into() }).await?;
    }
    for (name, size, team) in [("Ola", ShirtSize::M, 1), ("Jan", ShirtSize::L, 2)] {
        store
            .persons
            .insert(PersonDraft { name: name.into(), shirt_size: size, month_added: 3, team_id: Some(team) })
            .await?;
    }
    for name in ["Goalkeeper", "Striker"] {
        store.positions.insert(PositionDraft { name: name.into(), description: None }).await?;
    }
    for (first, last, sex, owner, position) in [
        ("Anna", "Nowak", Sex::Female, ALICE_ID, Some(1)),
        ("Marian", "Kowal", Sex::Male, BOB_ID, Some(1)),
        ("Tom", "Smith", Sex::Male, ALICE_ID, None),
    ] {
        store
            .owned_persons
            .insert(OwnedPersonDraft {
                first_name: first.into(),
                last_name: last.into(),
                sex,
                position_id: position,
                owner_id: owner,
            })
            .await?;
    }
    Ok(())
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Bearer token from the token endpoint.
    pub async fn token(&self, username: &str) -> Result<String> {
        let res = self
            .post("/api/auth/token")
            .json(&json!({ "username": username, "password": password(username) }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "token request failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("no token in response")
    }

    /// `sessionid=...` pair from a JSON login, ready for a Cookie header.
    pub async fn login(&self, username: &str) -> Result<String> {
        Ok(self.login_with_csrf(username).await?.0)
    }

    /// Session cookie pair plus the CSRF token unsafe requests must echo.
    pub async fn login_with_csrf(&self, username: &str) -> Result<(String, String)> {
        let res = self
            .post("/api/auth/login")
            .json(&json!({ "username": username, "password": password(username) }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let cookie = session_cookie(&res).context("no session cookie set")?;
        let csrf = data(res).await?["csrf_token"]
            .as_str()
            .map(str::to_string)
            .context("no csrf token in response")?;
        Ok((cookie, csrf))
    }
}

pub fn session_cookie(res: &reqwest::Response) -> Option<String> {
    set_cookie(res, "sessionid")
}

/// `name=value` pair of a cookie set by the response.
pub fn set_cookie(res: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub trait AuthExt {
    fn basic(self, username: &str) -> Self;
    fn bearer(self, token: &str) -> Self;
    fn cookie(self, cookie: &str) -> Self;
    fn csrf(self, token: &str) -> Self;
}

impl AuthExt for RequestBuilder {
    fn basic(self, username: &str) -> Self {
        self.basic_auth(username, Some(password(username)))
    }

    fn bearer(self, token: &str) -> Self {
        self.bearer_auth(token)
    }

    fn cookie(self, cookie: &str) -> Self {
        self.header(header::COOKIE, cookie)
    }

    fn csrf(self, token: &str) -> Self {
        self.header("X-CSRFToken", token)
    }
}

/// The `data` member of a success envelope.
pub async fn data(res: reqwest::Response) -> Result<Value> {
    let body: Value = res.json().await?;
    anyhow::ensure!(body["success"] == json!(true), "not a success envelope: {}", body);
    Ok(body["data"].clone())
}

pub fn ids(rows: &Value) -> Vec<i64> {
    rows.as_array()
        .map(|rows| rows.iter().filter_map(|r| r["id"].as_i64()).collect())
        .unwrap_or_default()
}
