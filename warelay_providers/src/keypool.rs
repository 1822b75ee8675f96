use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use warelay_core::CompletionProvider;

/// Fixed pool of completion providers, one per configured credential.
///
/// Each user id is pinned to one slot on first contact, round-robin in
/// arrival order. Assignments are permanent for the process lifetime;
/// they deliberately outlive session expiry so a returning user keeps
/// hitting the same credential.
pub struct KeyPool {
    providers: Vec<Arc<dyn CompletionProvider>>,
    assignments: Mutex<HashMap<String, usize>>,
}

impl KeyPool {
    /// # Errors
    /// An empty pool is a fatal configuration error.
    pub fn new(providers: Vec<Arc<dyn CompletionProvider>>) -> anyhow::Result<Self> {
        if providers.is_empty() {
            anyhow::bail!("credential pool is empty; configure at least one API key");
        }
        Ok(Self {
            providers,
            assignments: Mutex::new(HashMap::new()),
        })
    }

    /// Provider pinned to this user, assigning a slot on first contact.
    pub async fn provider_for(&self, user_id: &str) -> Arc<dyn CompletionProvider> {
        let index = self.slot_for(user_id).await;
        self.providers[index].clone()
    }

    /// Slot index pinned to this user, assigning one on first contact.
    pub async fn slot_for(&self, user_id: &str) -> usize {
        let mut assignments = self.assignments.lock().await;
        if let Some(index) = assignments.get(user_id) {
            return *index;
        }
        let index = assignments.len() % self.providers.len();
        assignments.insert(user_id.to_string(), index);
        info!("Assigned credential slot {index} to user {user_id}");
        index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
