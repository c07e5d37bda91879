//! State storage implementation
//!
//! Conversation contexts live only in process memory, keyed by user id.
//! They are intentionally lost on restart.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use super::context::{AdminPrompt, ConversationContext, ConversationState};

#[derive(Debug, Clone, Default)]
pub struct StateStorage {
    contexts: Arc<RwLock<HashMap<i64, ConversationContext>>>,
}

/// Snapshot of what the store currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageStats {
    pub sessions: usize,
    pub admin_prompts: usize,
}

impl StateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save conversation context, replacing any previous one
    pub async fn save_context(&self, context: ConversationContext) {
        debug!(user_id = context.user_id, composing = context.is_composing(), "Saving context");
        self.contexts.write().await.insert(context.user_id, context);
    }

    pub async fn load_context(&self, user_id: i64) -> Option<ConversationContext> {
        self.contexts.read().await.get(&user_id).cloned()
    }

    /// Delete conversation context; returns whether one existed
    pub async fn delete_context(&self, user_id: i64) -> bool {
        let removed = self.contexts.write().await.remove(&user_id).is_some();
        if removed {
            debug!(user_id = user_id, "Context discarded");
        }
        removed
    }

    /// Remove the admin prompt of a user, leaving a composition session alone
    pub async fn take_admin_prompt(&self, user_id: i64) -> Option<AdminPrompt> {
        let mut contexts = self.contexts.write().await;
        match contexts.get(&user_id).map(|c| &c.state) {
            Some(ConversationState::AwaitingAdmin(prompt)) => {
                let prompt = *prompt;
                contexts.remove(&user_id);
                Some(prompt)
            }
            _ => None,
        }
    }

    pub async fn stats(&self) -> StorageStats {
        let contexts = self.contexts.read().await;
        let sessions = contexts.values().filter(|c| c.is_composing()).count();
        StorageStats {
            sessions,
            admin_prompts: contexts.len() - sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::context::AdminPromptKind;

    #[tokio::test]
    async fn test_save_load_delete() {
        let storage = StateStorage::new();
        storage.save_context(ConversationContext::composing(1)).await;

        assert!(storage.load_context(1).await.is_some());
        assert!(storage.delete_context(1).await);
        assert!(!storage.delete_context(1).await);
        assert!(storage.load_context(1).await.is_none());
    }

    #[tokio::test]
    async fn test_take_admin_prompt_ignores_sessions() {
        let storage = StateStorage::new();
        storage.save_context(ConversationContext::composing(1)).await;
        assert!(storage.take_admin_prompt(1).await.is_none());
        assert!(storage.load_context(1).await.is_some());

        let prompt = AdminPrompt::new(3, AdminPromptKind::Nickname).with_controls(41);
        storage.save_context(ConversationContext::admin_prompt(2, prompt)).await;
        assert_eq!(storage.stats().await, StorageStats { sessions: 1, admin_prompts: 1 });
        assert_eq!(storage.take_admin_prompt(2).await, Some(prompt));
        assert!(storage.load_context(2).await.is_none());
    }
}
