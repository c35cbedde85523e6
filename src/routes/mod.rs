//! HTTP routes for Gatehouse
//!
//! Wraps the application's public and private routers in the request
//! pipeline and adds the operational endpoints.

pub mod health;
pub mod metrics;
pub mod whoami;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    middleware::{
        access_log::access_log_middleware, auth::auth_middleware,
        rate_limiter::rate_limit_middleware,
    },
    ratelimit::LimiterGroup,
    AppState,
};

/// Create the main application router
///
/// `public` is mounted under `/api/public` behind the rate limiter; `private`
/// is mounted under `/api/private` behind the rate limiter and bearer token
/// authentication. Every request is timed and written to the access log.
pub fn create_router(
    state: Arc<AppState>,
    public: Router<Arc<AppState>>,
    private: Router<Arc<AppState>>,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Last applied runs first: rate limit, then auth
    let private_routes = private
        .route("/whoami", get(whoami::whoami))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), LimiterGroup::Private),
            rate_limit_middleware,
        ));

    // `layer` rather than `route_layer`: the application may register no public routes
    let public_routes = public.layer(middleware::from_fn_with_state(
        (state.clone(), LimiterGroup::Public),
        rate_limit_middleware,
    ));

    let operational_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    Router::new()
        .merge(operational_routes)
        .nest("/api/public", public_routes)
        .nest("/api/private", private_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access_log_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
