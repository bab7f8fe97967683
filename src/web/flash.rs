//! One-shot flash messages kept in the session until the next page render.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::warn;

const FLASH_KEY: &str = "_flashes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Danger,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Queue a message for the next rendered page.
///
/// Session store failures are logged and the message is dropped.
pub async fn push(session: &Session, level: FlashLevel, message: impl Into<String>) {
    let mut pending = match session.get::<Vec<Flash>>(FLASH_KEY).await {
        Ok(existing) => existing.unwrap_or_default(),
        Err(e) => {
            warn!("Could not read flashes from session: {}", e);
            Vec::new()
        }
    };
    pending.push(Flash {
        level,
        message: message.into(),
    });
    if let Err(e) = session.insert(FLASH_KEY, pending).await {
        warn!("Could not store flash in session: {}", e);
    }
}

/// Remove and return every queued message, oldest first.
pub async fn take(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(FLASH_KEY).await {
        Ok(flashes) => flashes.unwrap_or_default(),
        Err(e) => {
            warn!("Could not take flashes from session: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    #[tokio::test]
    async fn take_drains_in_order() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        push(&session, FlashLevel::Success, "first").await;
        push(&session, FlashLevel::Danger, "second").await;

        let taken = take(&session).await;
        assert_eq!(
            taken.iter().map(|f| f.message.as_str()).collect::<Vec<_>>(),
            vec!["first", "second"]
        );
        assert_eq!(taken[1].level, FlashLevel::Danger);
        assert!(take(&session).await.is_empty());
    }
}
