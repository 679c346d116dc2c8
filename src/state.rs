use std::sync::Arc;

use crate::store::SentimentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SentimentStore>,
}
