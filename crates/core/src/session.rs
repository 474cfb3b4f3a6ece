use crate::knowledge::KnowledgeBase;
use crate::models::Exchange;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct SessionInner {
    index: Option<Arc<KnowledgeBase>>,
    history: Vec<Exchange>,
}

/// The active knowledge base and the exchange log since the last reset.
///
/// Both live behind one lock that is only held while state is read or
/// swapped. Searches run on a cloned `Arc` outside of it.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: Mutex<SessionInner>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the active index and clears the log in one step.
    pub async fn install_index(&self, index: Arc<KnowledgeBase>) -> Option<Arc<KnowledgeBase>> {
        let mut inner = self.inner.lock().await;
        inner.history.clear();
        inner.index.replace(index)
    }

    pub async fn current_index(&self) -> Option<Arc<KnowledgeBase>> {
        self.inner.lock().await.index.clone()
    }

    /// Appends `exchange` if the index with `index_id` is still installed and
    /// returns the updated log. Returns `None` when another upload won the race.
    pub async fn append_exchange(
        &self,
        index_id: Uuid,
        exchange: Exchange,
    ) -> Option<Vec<Exchange>> {
        let mut inner = self.inner.lock().await;
        let installed = inner.index.as_ref().map(|index| index.id());
        if installed != Some(index_id) {
            return None;
        }
        inner.history.push(exchange);
        Some(inner.history.clone())
    }

    pub async fn clear_history(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let cleared = inner.history.len();
        inner.history.clear();
        cleared
    }

    pub async fn history(&self) -> Vec<Exchange> {
        self.inner.lock().await.history.clone()
    }
}
