//! View endpoints: mount, location report, snapshot and message sending

use crate::api::view::schemas::{CreateMessage, LocationReport, ViewSnapshot};
use crate::api::{ExtractSession, MaybeSession};
use crate::core::traits::ConversationService;
use crate::core::view::SendRejected;
use crate::core::views::{ViewRegistry, load_restaurants};
use crate::infrastructure::traits::RestaurantRepository;
use async_stream::stream;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive};
use axum::response::{IntoResponse, Response, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use log::error;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(view_snapshot).post(mount_view))
        .route("/location", post(report_location))
        .route("/messages", post(post_message))
}

/// Mounts a view and starts the restaurant load in the background; the
/// browser takes its location fix meanwhile.
async fn mount_view(
    Inject(views): Inject<ViewRegistry>,
    Inject(store): Inject<dyn RestaurantRepository>,
    Inject(conversation_service): Inject<dyn ConversationService>,
    MaybeSession(session_id): MaybeSession,
) -> (StatusCode, Json<ViewSnapshot>) {
    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let view = views.mount(&session_id).await;

    let snapshot = ViewSnapshot::new(&session_id, &*view.lock().await);

    tokio::spawn(async move {
        load_restaurants(&view, &*store, &*conversation_service).await;
    });

    (StatusCode::CREATED, Json(snapshot))
}

async fn view_snapshot(
    Inject(views): Inject<ViewRegistry>,
    ExtractSession(session_id): ExtractSession,
) -> Result<Json<ViewSnapshot>, (StatusCode, &'static str)> {
    let view = views
        .get(&session_id)
        .await
        .ok_or((StatusCode::NOT_FOUND, "view is not mounted"))?;

    let snapshot = ViewSnapshot::new(&session_id, &*view.lock().await);
    Ok(Json(snapshot))
}

async fn report_location(
    Inject(views): Inject<ViewRegistry>,
    ExtractSession(session_id): ExtractSession,
    Json(report): Json<LocationReport>,
) -> Result<(StatusCode, Json<ViewSnapshot>), (StatusCode, &'static str)> {
    let view = views
        .get(&session_id)
        .await
        .ok_or((StatusCode::NOT_FOUND, "view is not mounted"))?;

    let mut view = view.lock().await;
    let status = if view.apply_location(report.into()) {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };

    Ok((status, Json(ViewSnapshot::new(&session_id, &view))))
}

/// Streams `user_message` right after the optimistic append and
/// `bot_message` once the reply settled. The reply runs to completion even if
/// the client goes away.
async fn post_message(
    Inject(views): Inject<ViewRegistry>,
    Inject(conversation_service): Inject<dyn ConversationService>,
    ExtractSession(session_id): ExtractSession,
    Json(message): Json<CreateMessage>,
) -> Response {
    let Some(view) = views.get(&session_id).await else {
        return (StatusCode::NOT_FOUND, "view is not mounted").into_response();
    };

    let (pending, user_snapshot) = {
        let mut view = view.lock().await;
        view.set_input(message.text);
        match view.begin_send() {
            Ok(pending) => (pending, ViewSnapshot::new(&session_id, &view)),
            Err(SendRejected::Blank) => return StatusCode::NO_CONTENT.into_response(),
            Err(SendRejected::NotReady) => {
                return (StatusCode::CONFLICT, "view is not ready").into_response();
            }
        }
    };

    let reply_task = tokio::spawn(async move {
        let reply = conversation_service
            .get_bot_reply_in_session(&session_id, pending.text.clone())
            .await;

        let mut view = view.lock().await;
        view.finish_send(pending, reply);
        ViewSnapshot::new(&session_id, &view)
    });

    let stream = stream! {
        yield Event::default().event("user_message").json_data(&user_snapshot);

        match reply_task.await {
            Ok(bot_snapshot) => {
                yield Event::default().event("bot_message").json_data(&bot_snapshot);
            }
            Err(e) => error!("reply task failed: {e}"),
        }
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

pub mod schemas {
    use crate::core::view;
    use crate::core::view::{ChatView, LocationError, MapView, Position};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Debug)]
    pub struct Message {
        pub id: i64,
        pub text: String,
        pub sender: view::Sender,
    }

    impl From<&view::Message> for Message {
        fn from(message: &view::Message) -> Self {
            Message {
                id: message.id,
                text: message.text.clone(),
                sender: message.sender,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ViewSnapshot {
        pub session_id: String,
        pub status: &'static str,
        pub error: Option<String>,
        pub messages: Vec<Message>,
        pub bot_typing: bool,
        pub map: Option<MapView>,
    }

    impl ViewSnapshot {
        pub fn new(session_id: &str, view: &ChatView) -> Self {
            let status = view.status();
            ViewSnapshot {
                session_id: session_id.to_owned(),
                status: status.name(),
                error: status.error_message(),
                messages: view.messages().iter().map(Message::from).collect(),
                bot_typing: view.is_bot_typing(),
                map: view.map(),
            }
        }
    }

    #[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum LocationFailure {
        Unavailable,
        Unsupported,
    }

    /// Either `{"lat": .., "lng": ..}` or `{"error": "unavailable"}`.
    #[derive(Deserialize, Debug)]
    #[serde(untagged)]
    pub enum LocationReport {
        Fix(Position),
        Failure { error: LocationFailure },
    }

    impl From<LocationReport> for Result<Position, LocationError> {
        fn from(report: LocationReport) -> Self {
            match report {
                LocationReport::Fix(position) => Ok(position),
                LocationReport::Failure {
                    error: LocationFailure::Unavailable,
                } => Err(LocationError::Unavailable),
                LocationReport::Failure {
                    error: LocationFailure::Unsupported,
                } => Err(LocationError::Unsupported),
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct CreateMessage {
        pub text: String,
    }

}
