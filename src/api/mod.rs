pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put, delete},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Auth routes
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .merge(
            Router::new()
                .route("/auth/me", get(handlers::auth::me))
                .route_layer(axum::middleware::from_fn_with_state(
                    app_state.clone(),
                    middleware::auth::require_auth,
                )),
        )

        // API routes
        .nest("/api", api_routes(app_state.clone()))

        // Admin routes
        .nest("/admin", admin_routes(app_state.clone()))

        // Add state to the router
        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/tariffs", tariff_routes())
        .nest("/payments", payment_routes(state))
        .route("/status/vpn", get(handlers::root::vpn_status))
}

// Read-only plan endpoints stay public so the storefront can render
// without logging in. Writes live under /admin.
fn tariff_routes() -> Router<AppState> {
    Router::new()
        .route("/active", get(handlers::tariffs::active))
        .route("/compare", get(handlers::tariffs::compare))
        .route("/:id", get(handlers::tariffs::get))
        .route("/:id/price", get(handlers::tariffs::price))
}

fn payment_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::payments::list))
        .route("/intents", post(handlers::payments::create_intent))
        .route("/intents", get(handlers::payments::list_intents))
        .route("/intents/:id", get(handlers::payments::get_intent))
        .route("/intents/:id/cancel", post(handlers::payments::cancel_intent))
        .route("/process", post(handlers::payments::process))
        .route("/refund", post(handlers::payments::refund))
        .route("/:id", get(handlers::payments::get))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/stats", get(handlers::admin::stats))
        .route("/payments", get(handlers::admin::payments))
        .route("/payments/expired-check", post(handlers::admin::check_expired))
        .nest("/users", user_admin_routes())
        .nest("/tariffs", tariff_admin_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ))
        .with_state(state)
}

fn user_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::users::list))
        .route("/:id", get(handlers::users::get))
        .route("/:id", put(handlers::users::update))
        .route("/:id", delete(handlers::users::delete))
}

fn tariff_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::tariffs::list))
        .route("/", post(handlers::tariffs::create))
        .route("/temporary", post(handlers::tariffs::create_temporary))
        .route("/:id", put(handlers::tariffs::update))
        .route("/:id/status", post(handlers::tariffs::change_status))
}
