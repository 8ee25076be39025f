//! Restaurant map + chat assistant server - Library exports for testing

pub mod api;
pub mod core;
pub mod infrastructure;

use crate::core::assistant::RestaurantContext;
use crate::core::services::RestaurantConversationService;
use crate::core::views::ViewRegistry;
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::history::InMemoryHistoryRepository;
use crate::infrastructure::openai::OpenAiChatModel;
use crate::infrastructure::repositories::{DbRestaurantRepository, SupabaseRestaurantRepository};
use crate::infrastructure::settings::{Settings, StoreBackend};
use crate::infrastructure::supabase::SupabaseConnection;
use anyhow::anyhow;
use di::{Injectable, ServiceCollection, ServiceProvider, existing_as_self};

/// Registers every service around already validated settings; the restaurant
/// store follows the configured backend.
pub fn service_provider(settings: Settings) -> anyhow::Result<ServiceProvider> {
    let store = settings.store;
    let mut services = ServiceCollection::new();
    services
        .add(existing_as_self(settings))
        .add(RestaurantContext::singleton())
        .add(InMemoryHistoryRepository::singleton())
        .add(ViewRegistry::singleton())
        .add(OpenAiChatModel::singleton())
        .add(RestaurantConversationService::scoped());

    match store {
        StoreBackend::Supabase => services
            .add(SupabaseConnection::singleton())
            .add(SupabaseRestaurantRepository::scoped()),
        StoreBackend::Sqlite => services
            .add(DatabaseConnection::singleton())
            .add(DbRestaurantRepository::scoped()),
    };

    services
        .build_provider()
        .map_err(|e| anyhow!("invalid service configuration: {e:?}"))
}
