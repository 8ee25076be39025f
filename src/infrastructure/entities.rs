//! Store entities

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Columns requested from the `restaurants` table, in projection order.
pub const RESTAURANT_COLUMNS: &str = "id, name, description, menu, lat, lng";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub menu: Vec<String>,
    pub lat: f64,
    pub lng: f64,
}

/// Raw SQLite row. `menu` is stored as a JSON array string.
#[derive(Debug, FromRow)]
pub struct RestaurantRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub menu: String,
    pub lat: f64,
    pub lng: f64,
}

impl TryFrom<RestaurantRow> for Restaurant {
    type Error = serde_json::Error;

    fn try_from(row: RestaurantRow) -> Result<Self, Self::Error> {
        Ok(Restaurant {
            id: row.id,
            name: row.name,
            description: row.description,
            menu: serde_json::from_str(&row.menu)?,
            lat: row.lat,
            lng: row.lng,
        })
    }
}
