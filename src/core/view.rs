//! The map + chat screen.
//!
//! A `ChatView` owns every piece of mutable UI state: the two mount-time loads
//! (location fix and restaurant list), the transcript, the input draft and the
//! typing indicator. The HTTP layer only forwards events into it and renders
//! what it reports.

use crate::core::traits::{AssistantError, ConversationService};
use crate::infrastructure::entities::Restaurant;
use crate::infrastructure::traits::StoreError;
use chrono::Utc;
use log::error;
use serde::{Deserialize, Serialize};

pub const BOT_ERROR_REPLY: &str = "Sorry, I encountered an error.";
pub const RESTAURANTS_ERROR: &str = "Failed to load restaurants.";
pub const DEFAULT_ZOOM: u8 = 13;
const USER_MARKER_POPUP: &str = "You are here";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Unable to access location.")]
    Unavailable,
    #[error("Geolocation is not supported by your browser.")]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub text: String,
    pub sender: Sender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    LoadingLocation,
    LoadingRestaurants,
    LocationError(LocationError),
    RestaurantsError,
    Ready,
}

impl ViewStatus {
    pub fn name(&self) -> &'static str {
        match self {
            ViewStatus::LoadingLocation => "loading-location",
            ViewStatus::LoadingRestaurants => "loading-restaurants",
            ViewStatus::LocationError(_) => "location-error",
            ViewStatus::RestaurantsError => "restaurants-error",
            ViewStatus::Ready => "ready",
        }
    }

    /// User-facing text for the error states.
    pub fn error_message(&self) -> Option<String> {
        match self {
            ViewStatus::LocationError(e) => Some(e.to_string()),
            ViewStatus::RestaurantsError => Some(RESTAURANTS_ERROR.to_owned()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendRejected {
    #[error("message is blank")]
    Blank,
    #[error("view is not ready")]
    NotReady,
}

/// A user message that has been appended and is waiting for its bot reply.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "every pending reply must be settled with `finish_send`"]
pub struct PendingReply {
    pub text: String,
}

#[derive(Debug)]
enum Load<T, E> {
    Pending,
    Loaded(T),
    Failed(E),
}

impl<T, E> Load<T, E> {
    fn is_pending(&self) -> bool {
        matches!(self, Load::Pending)
    }
}

#[derive(Debug)]
pub struct ChatView {
    location: Load<Position, LocationError>,
    restaurants: Load<Vec<Restaurant>, ()>,
    messages: Vec<Message>,
    input: String,
    replies_in_flight: usize,
    last_message_id: i64,
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView {
    /// A freshly mounted view with both loads outstanding.
    pub fn new() -> Self {
        Self {
            location: Load::Pending,
            restaurants: Load::Pending,
            messages: Vec::new(),
            input: String::new(),
            replies_in_flight: 0,
            last_message_id: 0,
        }
    }

    /// Applies the one-shot location fix. Returns `false` if a fix was already
    /// applied.
    pub fn apply_location(&mut self, fix: Result<Position, LocationError>) -> bool {
        if !self.location.is_pending() {
            return false;
        }
        self.location = match fix {
            Ok(position) => Load::Loaded(position),
            Err(e) => {
                error!("Error accessing location: {e:?}");
                Load::Failed(e)
            }
        };
        true
    }

    /// Applies the restaurant fetch outcome. Returns `false` if the list was
    /// already applied.
    pub fn apply_restaurants(&mut self, fetched: Result<Vec<Restaurant>, StoreError>) -> bool {
        if !self.restaurants.is_pending() {
            return false;
        }
        self.restaurants = match fetched {
            Ok(restaurants) => Load::Loaded(restaurants),
            Err(e) => {
                error!("Error fetching restaurants: {e}");
                Load::Failed(())
            }
        };
        true
    }

    pub fn status(&self) -> ViewStatus {
        if self.location.is_pending() {
            return ViewStatus::LoadingLocation;
        }
        if self.restaurants.is_pending() {
            return ViewStatus::LoadingRestaurants;
        }
        if let Load::Failed(e) = self.location {
            return ViewStatus::LocationError(e);
        }
        if let Load::Failed(()) = self.restaurants {
            return ViewStatus::RestaurantsError;
        }
        ViewStatus::Ready
    }

    pub fn position(&self) -> Option<Position> {
        match self.location {
            Load::Loaded(position) => Some(position),
            _ => None,
        }
    }

    pub fn restaurants(&self) -> &[Restaurant] {
        match &self.restaurants {
            Load::Loaded(restaurants) => restaurants,
            _ => &[],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn is_bot_typing(&self) -> bool {
        self.replies_in_flight > 0
    }

    /// The map pane, only present once the screen is ready.
    pub fn map(&self) -> Option<MapView> {
        match (self.status(), self.position()) {
            (ViewStatus::Ready, Some(center)) => Some(MapView::new(center, self.restaurants())),
            _ => None,
        }
    }

    /// First half of a send: appends the user message, clears the input and
    /// turns the typing indicator on.
    pub fn begin_send(&mut self) -> Result<PendingReply, SendRejected> {
        if self.input.trim().is_empty() {
            return Err(SendRejected::Blank);
        }
        if self.status() != ViewStatus::Ready {
            return Err(SendRejected::NotReady);
        }

        let text = std::mem::take(&mut self.input);
        let id = self.next_message_id();
        self.messages.push(Message {
            id,
            text: text.clone(),
            sender: Sender::User,
        });
        self.replies_in_flight += 1;

        Ok(PendingReply { text })
    }

    /// Second half of a send: appends exactly one bot message, the reply or
    /// the apology, and settles the typing indicator.
    pub fn finish_send(&mut self, _pending: PendingReply, reply: Result<String, AssistantError>) {
        let text = reply.unwrap_or_else(|_| BOT_ERROR_REPLY.to_owned());
        let id = self.next_message_id();
        self.messages.push(Message {
            id,
            text,
            sender: Sender::Bot,
        });
        self.replies_in_flight = self.replies_in_flight.saturating_sub(1);
    }

    /// Full send against a conversation service, for callers that own the
    /// view exclusively.
    pub async fn send(
        &mut self,
        conversation: &dyn ConversationService,
        session_id: &str,
    ) -> Result<(), SendRejected> {
        let pending = self.begin_send()?;
        let reply = conversation
            .get_bot_reply_in_session(session_id, pending.text.clone())
            .await;
        self.finish_send(pending, reply);
        Ok(())
    }

    fn next_message_id(&mut self) -> i64 {
        let id = Utc::now().timestamp_millis().max(self.last_message_id + 1);
        self.last_message_id = id;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    User,
    Restaurant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub restaurant_id: Option<i64>,
    pub position: Position,
    pub popup: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: Position,
    pub zoom: u8,
    pub markers: Vec<Marker>,
}

impl MapView {
    /// Centers on the user and places one marker per restaurant, popup showing
    /// the name only.
    pub fn new(center: Position, restaurants: &[Restaurant]) -> Self {
        let user = Marker {
            kind: MarkerKind::User,
            restaurant_id: None,
            position: center,
            popup: USER_MARKER_POPUP.to_owned(),
        };

        let markers = std::iter::once(user)
            .chain(restaurants.iter().map(|r| Marker {
                kind: MarkerKind::Restaurant,
                restaurant_id: Some(r.id),
                position: Position {
                    lat: r.lat,
                    lng: r.lng,
                },
                popup: r.name.clone(),
            }))
            .collect();

        MapView {
            center,
            zoom: DEFAULT_ZOOM,
            markers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const HERE: Position = Position {
        lat: 60.1699,
        lng: 24.9384,
    };

    fn restaurant(id: i64, name: &str) -> Restaurant {
        Restaurant {
            id,
            name: name.to_string(),
            description: "desc".to_string(),
            menu: vec!["soup".to_string()],
            lat: 60.0 + id as f64 / 100.0,
            lng: 25.0,
        }
    }

    fn store_failure() -> StoreError {
        StoreError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: "bad key".to_string(),
        }
    }

    fn ready_view(restaurants: Vec<Restaurant>) -> ChatView {
        let mut view = ChatView::new();
        view.apply_location(Ok(HERE));
        view.apply_restaurants(Ok(restaurants));
        view
    }

    /// Records calls; answers from a fixed outcome.
    struct ScriptedConversation {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl ScriptedConversation {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl ConversationService for ScriptedConversation {
        async fn set_restaurants(&self, _restaurants: Vec<Restaurant>) {}

        async fn get_bot_reply_in_session(
            &self,
            _session_id: &str,
            message: String,
        ) -> Result<String, AssistantError> {
            self.calls.lock().unwrap().push(message.clone());
            if self.fail {
                Err(AssistantError::ReplyFailed)
            } else {
                Ok(format!("echo: {message}"))
            }
        }
    }

    #[test]
    fn test_new_view_is_loading_location() {
        let view = ChatView::new();
        assert_eq!(view.status(), ViewStatus::LoadingLocation);
        assert!(view.map().is_none());
    }

    #[test]
    fn test_loads_in_either_order_reach_ready() {
        let mut view = ChatView::new();
        view.apply_restaurants(Ok(vec![restaurant(1, "A")]));
        assert_eq!(view.status(), ViewStatus::LoadingLocation);
        view.apply_location(Ok(HERE));
        assert_eq!(view.status(), ViewStatus::Ready);

        let mut view = ChatView::new();
        view.apply_location(Ok(HERE));
        assert_eq!(view.status(), ViewStatus::LoadingRestaurants);
        view.apply_restaurants(Ok(vec![]));
        assert_eq!(view.status(), ViewStatus::Ready);
    }

    #[test]
    fn test_restaurant_failure_never_reaches_ready() {
        let mut view = ChatView::new();
        view.apply_restaurants(Err(store_failure()));
        view.apply_location(Ok(HERE));

        assert_eq!(view.status(), ViewStatus::RestaurantsError);
        assert_eq!(
            view.status().error_message().as_deref(),
            Some("Failed to load restaurants.")
        );
        assert!(view.map().is_none());
    }

    #[test]
    fn test_location_error_wins_over_loaded_restaurants() {
        let mut view = ChatView::new();
        view.apply_restaurants(Ok(vec![restaurant(1, "A")]));
        view.apply_location(Err(LocationError::Unavailable));

        assert_eq!(
            view.status(),
            ViewStatus::LocationError(LocationError::Unavailable)
        );
        assert_eq!(view.status().name(), "location-error");
        assert_eq!(
            view.status().error_message().as_deref(),
            Some("Unable to access location.")
        );
    }

    #[test]
    fn test_location_error_checked_before_restaurant_error() {
        let mut view = ChatView::new();
        view.apply_restaurants(Err(store_failure()));
        view.apply_location(Err(LocationError::Unsupported));

        assert_eq!(
            view.status(),
            ViewStatus::LocationError(LocationError::Unsupported)
        );
        assert_eq!(
            view.status().error_message(),
            Some(LocationError::Unsupported.to_string())
        );
        assert_eq!(
            LocationError::Unsupported.to_string(),
            "Geolocation is not supported by your browser."
        );
    }

    #[test]
    fn test_loads_apply_only_once() {
        let mut view = ready_view(vec![restaurant(1, "A")]);

        assert!(!view.apply_location(Err(LocationError::Unavailable)));
        assert!(!view.apply_restaurants(Err(store_failure())));
        assert_eq!(view.status(), ViewStatus::Ready);
        assert_eq!(view.position(), Some(HERE));
    }

    #[test]
    fn test_map_has_one_marker_per_restaurant_plus_user() {
        let restaurants: Vec<_> = (1..=4).map(|i| restaurant(i, &format!("R{i}"))).collect();
        let view = ready_view(restaurants);
        let map = view.map().unwrap();

        assert_eq!(map.center, HERE);
        assert_eq!(map.zoom, 13);
        assert_eq!(map.markers.len(), 5);
        assert_eq!(
            map.markers
                .iter()
                .filter(|m| m.kind == MarkerKind::User)
                .count(),
            1
        );
        assert_eq!(map.markers[0].popup, "You are here");

        let third = &map.markers[3];
        assert_eq!(third.kind, MarkerKind::Restaurant);
        assert_eq!(third.restaurant_id, Some(3));
        assert_eq!(third.popup, "R3");
        assert_eq!(third.position.lat, restaurant(3, "R3").lat);
    }

    #[test]
    fn test_blank_input_is_a_no_op() {
        let mut view = ready_view(vec![]);
        for input in ["", "   ", "\n\t "] {
            view.set_input(input);
            assert_eq!(view.begin_send(), Err(SendRejected::Blank));
        }
        assert!(view.messages().is_empty());
        assert!(!view.is_bot_typing());
    }

    #[test]
    fn test_send_rejected_until_ready() {
        let mut view = ChatView::new();
        view.set_input("hello");
        assert_eq!(view.begin_send(), Err(SendRejected::NotReady));
        assert!(view.messages().is_empty());
        assert_eq!(view.input(), "hello");
    }

    #[test]
    fn test_typing_is_on_strictly_between_appends() {
        let mut view = ready_view(vec![]);
        view.set_input("any pizza?");

        let pending = view.begin_send().unwrap();
        assert_eq!(pending.text, "any pizza?");
        assert_eq!(view.messages().len(), 1);
        assert_eq!(view.messages()[0].sender, Sender::User);
        assert_eq!(view.input(), "");
        assert!(view.is_bot_typing());

        view.finish_send(pending, Ok("Try Trattoria".to_string()));
        assert_eq!(view.messages().len(), 2);
        assert_eq!(view.messages()[1].sender, Sender::Bot);
        assert_eq!(view.messages()[1].text, "Try Trattoria");
        assert!(!view.is_bot_typing());
    }

    #[test]
    fn test_failed_reply_appends_apology() {
        let mut view = ready_view(vec![]);
        view.set_input("hi");
        let pending = view.begin_send().unwrap();
        view.finish_send(pending, Err(AssistantError::ReplyFailed));

        assert_eq!(view.messages().len(), 2);
        assert_eq!(view.messages()[1].text, "Sorry, I encountered an error.");
        assert!(!view.is_bot_typing());
    }

    #[test]
    fn test_typing_stays_on_while_any_reply_is_outstanding() {
        let mut view = ready_view(vec![]);
        view.set_input("first");
        let first = view.begin_send().unwrap();
        view.set_input("second");
        let second = view.begin_send().unwrap();

        view.finish_send(first, Ok("one".to_string()));
        assert!(view.is_bot_typing());
        view.finish_send(second, Ok("two".to_string()));
        assert!(!view.is_bot_typing());
        assert_eq!(view.messages().len(), 4);
    }

    #[test]
    fn test_message_ids_strictly_increase() {
        let mut view = ready_view(vec![]);
        for i in 0..20 {
            view.set_input(format!("m{i}"));
            let pending = view.begin_send().unwrap();
            view.finish_send(pending, Ok("ok".to_string()));
        }

        let ids: Vec<i64> = view.messages().iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_send_calls_conversation_once() {
        let conversation = ScriptedConversation::new(false);
        let mut view = ready_view(vec![]);
        view.set_input("vegan?");

        view.send(&conversation, "s1").await.unwrap();

        assert_eq!(*conversation.calls.lock().unwrap(), vec!["vegan?"]);
        assert_eq!(view.messages()[1].text, "echo: vegan?");
    }

    #[tokio::test]
    async fn test_blank_send_never_reaches_conversation() {
        let conversation = ScriptedConversation::new(false);
        let mut view = ready_view(vec![]);
        view.set_input("  ");

        assert_eq!(
            view.send(&conversation, "s1").await,
            Err(SendRejected::Blank)
        );
        assert!(conversation.calls.lock().unwrap().is_empty());
        assert!(view.messages().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_path() {
        let conversation = ScriptedConversation::new(true);
        let mut view = ready_view(vec![]);
        view.set_input("hello");

        view.send(&conversation, "s1").await.unwrap();

        let senders: Vec<Sender> = view.messages().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Bot]);
        assert_eq!(view.messages()[1].text, BOT_ERROR_REPLY);
    }
}
