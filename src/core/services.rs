//! Implementations for the service the app needs.
//!

use crate::core::assistant::{ChatMessage, RestaurantContext, Role, render_system_prompt};
use crate::core::traits::{AssistantError, ConversationService};
use crate::infrastructure::entities::Restaurant;
use crate::infrastructure::traits::{ChatModel, HistoryRepository};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::{debug, error};

#[injectable(ConversationService)]
pub struct RestaurantConversationService {
    model: Ref<dyn ChatModel>,
    history: Ref<dyn HistoryRepository>,
    context: Ref<RestaurantContext>,
}

impl RestaurantConversationService {
    pub fn new(
        model: Ref<dyn ChatModel>,
        history: Ref<dyn HistoryRepository>,
        context: Ref<RestaurantContext>,
    ) -> Self {
        Self {
            model,
            history,
            context,
        }
    }
}

#[async_trait]
impl ConversationService for RestaurantConversationService {
    async fn set_restaurants(&self, restaurants: Vec<Restaurant>) {
        debug!("assistant context now has {} restaurants", restaurants.len());
        self.context.replace(restaurants);
    }

    async fn get_bot_reply_in_session(
        &self,
        session_id: &str,
        message: String,
    ) -> Result<String, AssistantError> {
        let restaurants = self.context.snapshot();
        let system_prompt = render_system_prompt(&restaurants).map_err(|e| {
            error!("Error generating bot reply: {e}");
            AssistantError::ReplyFailed
        })?;

        let history = self.history.get_or_create(session_id).await;
        debug!("session {session_id} has {} prior messages", history.len());

        let user_message = ChatMessage::new(Role::User, message);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new(Role::System, system_prompt));
        messages.extend(history);
        messages.push(user_message.clone());

        let reply = self.model.complete(&messages).await.map_err(|e| {
            error!("Error generating bot reply: {e}");
            AssistantError::ReplyFailed
        })?;

        self.history
            .append(
                session_id,
                vec![user_message, ChatMessage::new(Role::Assistant, reply.clone())],
            )
            .await;

        Ok(reply)
    }
}
