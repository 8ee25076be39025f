//! OpenAI compatible chat-completion client

use crate::core::assistant::{ChatMessage, Role};
use crate::infrastructure::settings::Settings;
use crate::infrastructure::traits::{ChatModel, ModelError};
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OpenAiChatModel {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> OpenAiChatModel {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_else(|e| {
            error!("failed to configure chat model client, using defaults: {e}");
            Client::new()
        });

        OpenAiChatModel {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[injectable(ChatModel)]
impl OpenAiChatModel {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> OpenAiChatModel {
        OpenAiChatModel::new(
            settings.openai_base_url.clone(),
            settings.openai_api_key.clone(),
            settings.openai_model.clone(),
            settings.openai_timeout,
        )
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ModelError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            temperature: 0.0,
            messages: messages.iter().map(WireMessage::from).collect(),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        debug!("chat completion with {} choices", parsed.choices.len());

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ModelError::EmptyResponse)
    }
}

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize, Debug)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        WireMessage {
            role: match message.role() {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: message.content(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}
