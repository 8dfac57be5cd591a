//! In-memory store for active ACME HTTP-01 challenges.
//!
//! The external ACME client registers a token and its key authorization before
//! asking the certificate authority to validate a domain; request handlers on
//! both listeners read the store to answer the well-known challenge path.
//! When a validation round completes the whole store is cleared so stale
//! tokens are never servable.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Concurrent map from challenge token to expected key authorization.
///
/// Cloning is cheap (shared `Arc`); all clones observe the same entries.
/// Writers (the ACME collaborator) and readers (request handlers) are
/// serialized by the inner `RwLock`: a lookup racing a write sees either
/// the pre- or post-write value, never a torn one.
#[derive(Clone, Debug, Default)]
pub struct ChallengeStore {
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl ChallengeStore {
    /// Creates a new empty challenge store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the entry for `token`.
    pub async fn put(&self, token: impl Into<String>, response: impl Into<String>) {
        self.tokens.write().await.insert(token.into(), response.into());
    }

    /// Atomically replaces the entire set with empty.
    pub async fn clear(&self) {
        *self.tokens.write().await = HashMap::new();
    }

    /// Looks up the expected response for `token`.
    ///
    /// `None` means "no such challenge"; the caller turns that into a 404,
    /// not an error.
    pub async fn lookup(&self, token: &str) -> Option<String> {
        self.tokens.read().await.get(token).cloned()
    }
}
