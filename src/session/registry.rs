use super::call::CallSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-wide table of live call sessions, keyed by call identifier
///
/// Sessions are never removed automatically; callers query status and decide.
/// Readers get `Arc` references, never copies of session state.
pub struct SessionRegistry {
    inner: RwLock<HashMap<String, Arc<CallSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, session: Arc<CallSession>) {
        let mut sessions = self.inner.write().await;
        sessions.insert(session.id().to_string(), session);
    }

    pub async fn get(&self, call_id: &str) -> Option<Arc<CallSession>> {
        let sessions = self.inner.read().await;
        sessions.get(call_id).cloned()
    }

    pub async fn list(&self) -> Vec<Arc<CallSession>> {
        let sessions = self.inner.read().await;
        sessions.values().cloned().collect()
    }

    pub async fn remove(&self, call_id: &str) -> Option<Arc<CallSession>> {
        let mut sessions = self.inner.write().await;
        sessions.remove(call_id)
    }

    pub async fn len(&self) -> usize {
        let sessions = self.inner.read().await;
        sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
