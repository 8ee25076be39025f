//! Mounted views, one per session.

use crate::core::traits::ConversationService;
use crate::core::view::ChatView;
use crate::infrastructure::traits::{HistoryRepository, RestaurantRepository};
use di::{Ref, inject, injectable};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Views kept before the least recently used one is evicted.
pub const MAX_VIEWS: usize = 1024;

/// A view lock is never held across an await on anything else.
pub type SharedView = Arc<Mutex<ChatView>>;

struct Entry {
    view: SharedView,
    last_used: u64,
}

#[derive(Default)]
struct Views {
    entries: HashMap<String, Entry>,
    clock: u64,
}

impl Views {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Removes the least recently used view once over capacity.
    fn evict(&mut self, capacity: usize) -> Option<String> {
        if self.entries.len() <= capacity {
            return None;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(session_id, _)| session_id.clone())?;
        self.entries.remove(&oldest);
        Some(oldest)
    }
}

/// Mounted views by session. Bounded: mounting past capacity evicts the least
/// recently used view together with its message history.
pub struct ViewRegistry {
    views: Mutex<Views>,
    history: Ref<dyn HistoryRepository>,
    capacity: usize,
}

#[injectable]
impl ViewRegistry {
    #[inject]
    pub fn create(history: Ref<dyn HistoryRepository>) -> ViewRegistry {
        ViewRegistry::new(history, MAX_VIEWS)
    }
}

impl ViewRegistry {
    pub fn new(history: Ref<dyn HistoryRepository>, capacity: usize) -> ViewRegistry {
        ViewRegistry {
            views: Mutex::default(),
            history,
            capacity: capacity.max(1),
        }
    }

    /// Mounts a fresh view for the session, replacing any earlier one.
    pub async fn mount(&self, session_id: &str) -> SharedView {
        let view = SharedView::default();
        let evicted = {
            let mut views = self.views.lock().await;
            let last_used = views.tick();
            let previous = views.entries.insert(
                session_id.to_owned(),
                Entry {
                    view: view.clone(),
                    last_used,
                },
            );
            if previous.is_some() {
                debug!("remounting view for session {session_id}");
            } else {
                info!("mounting view for session {session_id}");
            }
            views.evict(self.capacity)
        };

        if let Some(evicted) = evicted {
            info!("evicting idle view for session {evicted}");
            self.history.remove(&evicted).await;
        }
        view
    }

    pub async fn get(&self, session_id: &str) -> Option<SharedView> {
        let mut views = self.views.lock().await;
        let last_used = views.tick();
        let entry = views.entries.get_mut(session_id)?;
        entry.last_used = last_used;
        Some(entry.view.clone())
    }

    pub async fn mounted(&self) -> usize {
        self.views.lock().await.entries.len()
    }
}

/// Mount-time restaurant load: one fetch, applied to the view, and pushed to
/// the conversation client when it succeeded.
pub async fn load_restaurants(
    view: &SharedView,
    store: &dyn RestaurantRepository,
    conversation: &dyn ConversationService,
) {
    let fetched = store.list_restaurants().await;

    let loaded = {
        let mut view = view.lock().await;
        if view.apply_restaurants(fetched) {
            Some(view.restaurants().to_vec())
        } else {
            None
        }
    };

    if let Some(restaurants) = loaded {
        conversation.set_restaurants(restaurants).await;
    }
}
