//! Direct conversation endpoint, without a mounted view

use crate::api::MaybeSession;
use crate::api::chat::schemas::{ChatError, ChatReply, CreateMessage};
use crate::core::traits::{ConversationService, DEFAULT_SESSION_ID};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;

pub const BOT_REPLY_ERROR: &str = "Failed to generate bot reply.";

pub fn router() -> Router {
    Router::new().route("/", post(post_message))
}

async fn post_message(
    Inject(conversation_service): Inject<dyn ConversationService>,
    MaybeSession(session_id): MaybeSession,
    Json(message): Json<CreateMessage>,
) -> Response {
    let session_id = session_id.unwrap_or_else(|| DEFAULT_SESSION_ID.to_owned());

    match conversation_service
        .get_bot_reply_in_session(&session_id, message.text)
        .await
    {
        Ok(reply) => (StatusCode::OK, Json(ChatReply { reply })).into_response(),
        Err(_) => (
            StatusCode::BAD_GATEWAY,
            Json(ChatError {
                error: BOT_REPLY_ERROR,
            }),
        )
            .into_response(),
    }
}

pub mod schemas {
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug)]
    pub struct CreateMessage {
        pub text: String,
    }

    #[derive(Serialize, Debug)]
    pub struct ChatReply {
        pub reply: String,
    }

    #[derive(Serialize, Debug)]
    pub struct ChatError {
        pub error: &'static str,
    }
}
