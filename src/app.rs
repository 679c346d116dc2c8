use axum::http::Method;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::{health, sentiment};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    // Dashboard is a read-only consumer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/sentiment", sentiment::router())
        .layer(cors)
        .with_state(state)
}
