use std::sync::Arc;

use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::modules::attendance::init_attendance_router;
use crate::modules::auth::init_auth_router;
use crate::modules::courses::init_courses_router;
use crate::modules::enrollments::init_enrollments_router;
use crate::modules::messages::init_messages_router;
use crate::modules::resources::init_resources_router;
use crate::modules::schools::init_schools_router;
use crate::modules::users::init_users_router;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Router, middleware};
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;

pub fn init_router(state: AppState) -> Router {
    let mut auth_router = init_auth_router();
    if let Some(config) = state.rate_limit_config.auth_governor_config() {
        auth_router = auth_router.layer(GovernorLayer::new(Arc::new(config)));
    }

    let mut api_router = Router::new()
        .nest("/users", init_users_router())
        .nest("/schools", init_schools_router())
        .nest("/courses", init_courses_router())
        .nest("/enrollments", init_enrollments_router())
        .nest("/attendance", init_attendance_router())
        .nest("/messages", init_messages_router())
        .nest("/resources", init_resources_router());
    if let Some(config) = state.rate_limit_config.general_governor_config() {
        api_router = api_router.layer(GovernorLayer::new(Arc::new(config)));
    }

    let mut router = Router::new().nest("/api", api_router.nest("/auth", auth_router));

    if let Some(handle) = state.metrics.clone() {
        router = router.route("/metrics", get(move || async move { handle.render() }));
    }

    router
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
