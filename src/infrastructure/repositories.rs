//! Restaurant store implementations

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{RESTAURANT_COLUMNS, Restaurant, RestaurantRow};
use crate::infrastructure::supabase::SupabaseConnection;
use crate::infrastructure::traits::{RestaurantRepository, StoreError};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::{debug, error};

const RESTAURANTS_TABLE: &str = "restaurants";

#[injectable(RestaurantRepository)]
pub struct SupabaseRestaurantRepository {
    connection: Ref<SupabaseConnection>,
}

impl SupabaseRestaurantRepository {
    pub fn new(connection: Ref<SupabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl RestaurantRepository for SupabaseRestaurantRepository {
    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, StoreError> {
        let response = self
            .connection
            .select(RESTAURANTS_TABLE, RESTAURANT_COLUMNS)
            .send()
            .await
            .inspect_err(|e| error!("{e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("restaurant store returned {status}: {body}");
            return Err(StoreError::Status { status, body });
        }

        let restaurants: Vec<Restaurant> =
            response.json().await.inspect_err(|e| error!("{e}"))?;
        debug!("fetched {} restaurants from supabase", restaurants.len());
        Ok(restaurants)
    }
}

#[injectable(RestaurantRepository)]
pub struct DbRestaurantRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbRestaurantRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl RestaurantRepository for DbRestaurantRepository {
    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, StoreError> {
        let rows: Vec<RestaurantRow> =
            sqlx::query_as(&format!("SELECT {RESTAURANT_COLUMNS} FROM {RESTAURANTS_TABLE}"))
                .fetch_all(&**self.connection)
                .await
                .inspect_err(|e| error!("{e}"))?;

        let restaurants = rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                Restaurant::try_from(row).map_err(|source| StoreError::Menu { id, source })
            })
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| error!("{e}"))?;

        debug!("fetched {} restaurants from sqlite", restaurants.len());
        Ok(restaurants)
    }
}
