use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Liveness probe. It never touches the store: an unreachable database shows
/// up as 500s on `/api/sentiment`, not as a dead service.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(|| async { "OK" }))
}

#[cfg(test)]
mod tests {
    use crate::app::create_app;
    use crate::state::AppState;
    use crate::store::sentiment_store::memory::InMemorySentimentStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_answers_ok_with_empty_store() {
        let app = create_app(AppState {
            store: Arc::new(InMemorySentimentStore::default()),
        });

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }
}
