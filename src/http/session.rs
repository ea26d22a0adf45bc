//! Session registry for the streaming transport.
//!
//! One entry per live SSE connection: session token to outbound channel.
//! Entries are removed when the stream is dropped or a send fails, so a
//! stray follow-up message for a dead session always misses.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Error;

/// Map from session token to the connection's outbound channel.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, mpsc::Sender<String>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session's outbound channel.
    pub fn insert(&self, session_id: String, tx: mpsc::Sender<String>) {
        debug!(session = %session_id, "session registered");
        self.sessions.lock().unwrap().insert(session_id, tx);
    }

    /// Remove a session. Returns whether it was present.
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().unwrap().remove(session_id).is_some();
        if removed {
            debug!(session = %session_id, "session removed");
        }
        removed
    }

    /// Whether a session is currently live.
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(session_id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send a message down a session's channel.
    ///
    /// The sender is cloned out of the lock before awaiting. A failed
    /// send means the connection is gone; the entry is dropped so the
    /// caller (and any later caller) gets session-not-found.
    pub async fn send(&self, session_id: &str, message: String) -> Result<(), Error> {
        let tx = self
            .sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        if tx.send(message).await.is_err() {
            self.remove(session_id);
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_send() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::channel(4);
        registry.insert("abc".to_string(), tx);
        assert_eq!(registry.len(), 1);

        registry.send("abc", "hello".to_string()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_send_to_unknown_session() {
        let registry = SessionRegistry::new();
        let err = registry.send("nope", "hello".to_string()).await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_removed_session_is_unreachable() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        registry.insert("abc".to_string(), tx);

        assert!(registry.remove("abc"));
        assert!(registry.is_empty());
        assert!(!registry.contains("abc"));

        let err = registry.send("abc", "late".to_string()).await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_send_evicts_session() {
        let registry = SessionRegistry::new();
        let (tx, rx) = mpsc::channel(4);
        registry.insert("abc".to_string(), tx);
        drop(rx);

        let err = registry.send("abc", "hello".to_string()).await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
        assert!(registry.is_empty());
    }
}
