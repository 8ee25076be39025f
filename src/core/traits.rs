//! DI "Interfaces"

use crate::infrastructure::entities::Restaurant;
use async_trait::async_trait;

/// Session used when the caller doesn't name one.
pub const DEFAULT_SESSION_ID: &str = "default";

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("failed to generate bot reply")]
    ReplyFailed,
}

#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Replaces the restaurant list used to build the prompt context.
    async fn set_restaurants(&self, restaurants: Vec<Restaurant>);

    /// Answers `message` within the given session, extending its history on
    /// success.
    async fn get_bot_reply_in_session(
        &self,
        session_id: &str,
        message: String,
    ) -> Result<String, AssistantError>;

    /// Answers `message` within the default session.
    async fn get_bot_reply(&self, message: String) -> Result<String, AssistantError> {
        self.get_bot_reply_in_session(DEFAULT_SESSION_ID, message)
            .await
    }
}
