//! Server-rendered pages. Failures render as small HTML pages rather than the
//! JSON error envelope.

use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::Local;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{error, info};

use crate::database::models::Person;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::auth::session_cookies;
use crate::middleware::authenticate;
use crate::policy::{authorize, Action, PolicyError};
use crate::services::AccountError;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/accounts/login";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body></html>\n",
        escape_html(title),
        body
    )
}

/// An error rendered as a page.
pub struct HtmlError {
    status: StatusCode,
    message: String,
}

impl HtmlError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        let title = self.status.canonical_reason().unwrap_or("Error");
        let body = format!("<h1>{}</h1>\n<p>{}</p>", escape_html(title), escape_html(&self.message));
        (self.status, Html(page(title, &body))).into_response()
    }
}

impl From<ApiError> for HtmlError {
    fn from(err: ApiError) -> Self {
        Self::new(err.status_code(), err.message())
    }
}

impl From<AccountError> for HtmlError {
    fn from(err: AccountError) -> Self {
        ApiError::from(err).into()
    }
}

impl From<crate::database::DatabaseError> for HtmlError {
    fn from(err: crate::database::DatabaseError) -> Self {
        ApiError::from(err).into()
    }
}

/// GET / - welcome page with the server's clock
pub async fn welcome() -> Html<String> {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S");
    Html(page(
        "Welcome",
        &format!("Welcome, user!<br>\nCurrent server date and time: {}.", now),
    ))
}

/// GET /persons - requires a session and `view_person`
///
/// Anonymous visitors are sent to the login form. A signed-in user lacking
/// `view_person` gets a 403 page instead of being bounced back to login,
/// which would only loop.
pub async fn person_list(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, HtmlError> {
    let action = Action::PersonListPage;
    let principal = authenticate(&state, &headers, action.schemes()).await?;
    let Some(principal) = principal else {
        let target = format!("{}?next=/persons", LOGIN_PATH);
        return Ok(Redirect::to(&target).into_response());
    };

    if let Err(e) = authorize(action, Some(&principal)) {
        return Err(match e {
            PolicyError::MissingPermission(_) => {
                HtmlError::new(StatusCode::FORBIDDEN, "You do not have permission to view this page.")
            }
            other => ApiError::from(other).into(),
        });
    }

    let persons = state.store.persons.select_any(FilterData::default()).await?;
    let teams: HashMap<i64, String> = state
        .store
        .teams
        .select_any(FilterData::default())
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    let mut body = String::from("<h1>Persons</h1>\n");
    if persons.is_empty() {
        body.push_str("<p>No persons.</p>");
    } else {
        body.push_str("<ul>\n");
        for person in &persons {
            let team = person
                .team_id
                .and_then(|id| teams.get(&id))
                .map(|name| format!(" ({})", escape_html(name)))
                .unwrap_or_default();
            body.push_str(&format!(
                "<li><a href=\"/persons/{}\">{}</a>{}</li>\n",
                person.id,
                escape_html(&person.name),
                team
            ));
        }
        body.push_str("</ul>");
    }

    Ok(Html(page("Persons", &body)).into_response())
}

fn person_detail_body(person: &Person, team: Option<&str>) -> String {
    format!(
        "<h1>{}</h1>\n<dl>\n<dt>Shirt size</dt><dd>{}</dd>\n<dt>Month added</dt><dd>{}</dd>\n<dt>Team</dt><dd>{}</dd>\n</dl>\n<p><a href=\"/persons\">All persons</a></p>",
        escape_html(&person.name),
        person.shirt_size.label(),
        person.month_added,
        escape_html(team.unwrap_or("-"))
    )
}

/// GET /persons/:id
pub async fn person_detail(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Html<String>, HtmlError> {
    authorize(Action::PersonDetailPage, None).map_err(ApiError::from)?;
    let missing = || HtmlError::new(StatusCode::NOT_FOUND, "Person with the given id does not exist");

    let Ok(Path(id)) = path else { return Err(missing()) };
    let person = state.store.persons.select_one(id).await?.ok_or_else(missing)?;
    let team = match person.team_id {
        Some(team_id) => state.store.teams.select_one(team_id).await?,
        None => None,
    };

    Ok(Html(page(&person.name, &person_detail_body(&person, team.as_ref().map(|t| t.name.as_str())))))
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

fn login_form(next: &str, error: Option<&str>) -> String {
    let error = error
        .map(|e| format!("<p class=\"error\">{}</p>\n", escape_html(e)))
        .unwrap_or_default();
    page(
        "Log in",
        &format!(
            "<h1>Log in</h1>\n{}<form method=\"post\" action=\"{}\">\n\
             <input type=\"hidden\" name=\"next\" value=\"{}\">\n\
             <label>Username <input type=\"text\" name=\"username\" required></label>\n\
             <label>Password <input type=\"password\" name=\"password\" required></label>\n\
             <button type=\"submit\">Log in</button>\n</form>",
            error,
            LOGIN_PATH,
            escape_html(next)
        ),
    )
}

/// GET /accounts/login
pub async fn login_page(Query(query): Query<NextQuery>) -> Html<String> {
    Html(login_form(safe_next(query.next.as_deref()), None))
}

/// POST /accounts/login - form login, then back to `next`
pub async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response, HtmlError> {
    let next = safe_next(form.next.as_deref()).to_string();
    let accounts = state.accounts();

    let user = match accounts.verify_credentials(&form.username, &form.password).await {
        Ok(user) => user,
        Err(AccountError::InvalidCredentials | AccountError::Inactive) => {
            let message = "Please enter a correct username and password.";
            return Ok((StatusCode::OK, Html(login_form(&next, Some(message)))).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let key = accounts.open_session(&user).await?;
    let cookies = session_cookies(&state, &key).map_err(|e| {
        error!("Session key produced an invalid cookie header");
        HtmlError::from(e)
    })?;

    info!("User '{}' logged in via form", user.username);
    Ok((cookies, Redirect::to(&next)).into_response())
}
