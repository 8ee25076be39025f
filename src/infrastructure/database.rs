//! Pooled SQLite connection for the local restaurant store

use crate::infrastructure::settings::Settings;
use di::{Ref, inject, injectable};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::ops::Deref;

pub struct DatabaseConnection {
    connection: SqlitePool,
}

impl DatabaseConnection {
    pub fn from_pool(connection: SqlitePool) -> DatabaseConnection {
        DatabaseConnection { connection }
    }
}

#[injectable]
impl DatabaseConnection {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> DatabaseConnection {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(settings.database_options.clone());

        DatabaseConnection { connection: pool }
    }
}

impl Deref for DatabaseConnection {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}
