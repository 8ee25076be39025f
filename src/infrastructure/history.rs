//! In-process session histories. Never persisted; dropped when their view is
//! evicted.

use crate::core::assistant::ChatMessage;
use crate::infrastructure::traits::HistoryRepository;
use async_trait::async_trait;
use di::{inject, injectable};
use log::debug;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryHistoryRepository {
    histories: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

#[injectable(HistoryRepository)]
impl InMemoryHistoryRepository {
    #[inject]
    pub fn create() -> InMemoryHistoryRepository {
        InMemoryHistoryRepository::default()
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn get_or_create(&self, session_id: &str) -> Vec<ChatMessage> {
        if let Some(history) = self.histories.read().await.get(session_id) {
            return history.clone();
        }

        let mut histories = self.histories.write().await;
        histories
            .entry(session_id.to_owned())
            .or_insert_with(|| {
                debug!("creating message history for session {session_id}");
                Vec::new()
            })
            .clone()
    }

    async fn append(&self, session_id: &str, messages: Vec<ChatMessage>) {
        self.histories
            .write()
            .await
            .entry(session_id.to_owned())
            .or_default()
            .extend(messages);
    }

    async fn remove(&self, session_id: &str) {
        if self.histories.write().await.remove(session_id).is_some() {
            debug!("dropped message history for session {session_id}");
        }
    }
}
