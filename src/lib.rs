pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod serializer;
pub mod services;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::middleware::{require_principal, AuthGate};
use crate::policy::Action;
use crate::state::AppState;

/// The whole HTTP surface: JSON API, pages and health.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        .merge(page_routes())
        .merge(system_routes())
        .merge(person_routes(&state))
        .merge(owned_person_routes(&state))
        .merge(position_routes(&state))
        .merge(team_routes(&state))
        .merge(auth_routes(&state))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if let Some(cors) = cors_layer(&config.security) {
        router = router.layer(cors);
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

/// Routes behind the schemes `action` accepts. Every route in the group must
/// accept the same ones.
fn gated(state: &AppState, action: Action, routes: Router<AppState>) -> Router<AppState> {
    let gate = AuthGate::for_action(state.clone(), action);
    routes.route_layer(from_fn_with_state(gate, require_principal))
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.is_empty() {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

fn system_routes() -> Router<AppState> {
    use handlers::system;

    Router::new()
        .route("/api", get(system::index))
        .route("/health", get(system::health))
}

fn page_routes() -> Router<AppState> {
    use handlers::html;

    Router::new()
        .route("/", get(html::welcome))
        .route("/persons", get(html::person_list))
        .route("/persons/:id", get(html::person_detail))
        .route(html::LOGIN_PATH, get(html::login_page).post(html::login_submit))
}

fn person_routes(state: &AppState) -> Router<AppState> {
    use handlers::persons;

    Router::new()
        .route("/api/persons", get(persons::list))
        .merge(gated(
            state,
            Action::ShowPerson,
            Router::new()
                .route("/api/persons/:pk", get(persons::show))
                .route("/api/persons/:pk/delete", delete(persons::delete)),
        ))
        .merge(gated(
            state,
            Action::UpdatePerson,
            Router::new().route("/api/persons/:pk/update", put(persons::update)),
        ))
}

fn owned_person_routes(state: &AppState) -> Router<AppState> {
    use handlers::owned_persons;

    Router::new()
        .route(
            "/api/owned-persons/:pk",
            get(owned_persons::show).delete(owned_persons::delete),
        )
        .route("/api/search/owned-persons/:substring", get(owned_persons::search))
        .merge(gated(
            state,
            Action::ListOwnedPersons,
            Router::new().route(
                "/api/owned-persons",
                get(owned_persons::list).post(owned_persons::create),
            ),
        ))
}

fn position_routes(state: &AppState) -> Router<AppState> {
    use handlers::positions;

    Router::new()
        .route("/api/positions", get(positions::list).post(positions::create))
        .route("/api/positions/:pk", get(positions::show).delete(positions::delete))
        .merge(gated(
            state,
            Action::ListPositionMembers,
            Router::new().route("/api/positions/:pk/members", get(positions::members)),
        ))
}

fn team_routes(state: &AppState) -> Router<AppState> {
    use handlers::teams;

    gated(
        state,
        Action::ShowTeam,
        Router::new().route("/api/teams/:pk", get(teams::show).delete(teams::delete)),
    )
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/token", post(auth::token))
        .merge(gated(
            state,
            Action::Logout,
            Router::new().route("/api/auth/logout", post(auth::logout)),
        ))
        .merge(gated(
            state,
            Action::Whoami,
            Router::new().route("/api/auth/whoami", get(auth::whoami)),
        ))
}
