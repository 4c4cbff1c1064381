use std::sync::Arc;

use secureaws_db::ConversationStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<dyn ConversationStore>,
}

impl AppStateInner {
    /// Run a blocking store call off the async runtime.
    pub async fn run_store<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&dyn ConversationStore) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
    }
}
