//! Infrastructure traits, used for DI on higher levels

use crate::core::assistant::ChatMessage;
use crate::infrastructure::entities;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("restaurant store request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("restaurant store returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("restaurant query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("malformed menu for restaurant {id}: {source}")]
    Menu {
        id: i64,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("chat model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat model returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("chat model response has no message content")]
    EmptyResponse,
}

#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    /// Reads every row of the `restaurants` table, in store order.
    async fn list_restaurants(&self) -> Result<Vec<entities::Restaurant>, StoreError>;
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Returns the history of a session, creating an empty one on first use.
    async fn get_or_create(&self, session_id: &str) -> Vec<ChatMessage>;

    async fn append(&self, session_id: &str, messages: Vec<ChatMessage>);

    /// Drops the history of a session. Unknown sessions are ignored.
    async fn remove(&self, session_id: &str);
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Runs one chat completion and returns the reply text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ModelError>;
}
