//! The current conversation id shared between the inbound gateway and the console relay.
//!
//! The gateway overwrites it on every received message; the relay reads it before each send.
//! Last write wins: there is no merge and no ordering guarantee against an in-flight read.

use std::sync::Arc;
use tokio::sync::RwLock;

/// Cloneable handle to a single `Option<String>` conversation id. `None` until the first set.
#[derive(Debug, Clone, Default)]
pub struct ConversationCell {
    inner: Arc<RwLock<Option<String>>>,
}

impl ConversationCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current id; returns the previous one.
    pub async fn set(&self, id: impl Into<String>) -> Option<String> {
        let mut g = self.inner.write().await;
        g.replace(id.into())
    }

    /// Snapshot of the current id.
    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_until_set() {
        let cell = ConversationCell::new();
        assert_eq!(cell.get().await, None);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let cell = ConversationCell::new();
        assert_eq!(cell.set("conv-a").await, None);
        assert_eq!(cell.set("conv-b").await, Some("conv-a".to_string()));
        assert_eq!(cell.get().await.as_deref(), Some("conv-b"));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let cell = ConversationCell::new();
        let other = cell.clone();
        other.set("shared").await;
        assert_eq!(cell.get().await.as_deref(), Some("shared"));
    }
}
