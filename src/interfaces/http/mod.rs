//! HTTP boundary built on `axum`.

pub mod handlers;

use crate::app::ServiceContext;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(ctx: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/payment", post(handlers::submit_payment))
        .route("/payment/:id", get(handlers::payment_status))
        .route("/user", get(handlers::get_user))
        .route("/application", post(handlers::submit_application))
        .route("/echo", post(handlers::echo))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
