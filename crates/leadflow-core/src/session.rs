//! Per-chat conversation state.
//!
//! Callers must serialize access per chat (see [`ChatLocks`]): the store itself
//! is consistent under concurrency, but a begin/take pair from two interleaved
//! handlers of the same chat would race on the meaning of the next message.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::ChatId;

/// What the next freeform message of a chat should be read as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingStep {
    AwaitingTitles,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pending {
    pub step: PendingStep,
    pub started_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatSession {
    pub chat_id: ChatId,
    pub pending: Option<Pending>,
}

/// Explicit per-chat state store (at most one pending step per chat).
pub struct ChatSessions {
    ttl: Duration,
    inner: Mutex<HashMap<ChatId, ChatSession>>,
}

impl ChatSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Start a multi-turn step, replacing any step already pending.
    pub async fn begin(&self, chat_id: ChatId, step: PendingStep, now: DateTime<Utc>) {
        let mut map = self.inner.lock().await;
        let session = map.entry(chat_id).or_insert_with(|| ChatSession {
            chat_id,
            pending: None,
        });
        session.pending = Some(Pending {
            step,
            started_at: now,
        });
    }

    /// Consume the pending step. Expired steps are dropped and yield `None`.
    /// Either way the chat's entry is removed.
    pub async fn take_pending(&self, chat_id: ChatId, now: DateTime<Utc>) -> Option<PendingStep> {
        let mut map = self.inner.lock().await;
        let pending = map.remove(&chat_id)?.pending?;
        if self.is_expired(&pending, now) {
            tracing::info!(chat_id = %chat_id, step = ?pending.step, "pending step expired");
            return None;
        }
        Some(pending.step)
    }

    /// Clear without consuming; returns whether a live step was pending.
    pub async fn clear(&self, chat_id: ChatId, now: DateTime<Utc>) -> bool {
        self.take_pending(chat_id, now).await.is_some()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    fn is_expired(&self, pending: &Pending, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(pending.started_at);
        match age.to_std() {
            Ok(age) => age >= self.ttl,
            // Started "in the future" (clock skew): treat as fresh.
            Err(_) => false,
        }
    }
}

/// Per-chat mutual exclusion for update handlers.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Only the map still references an idle chat's lock.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
