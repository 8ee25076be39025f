//! HTTP connection to the Supabase REST (PostgREST) endpoint

use crate::infrastructure::settings::Settings;
use di::{Ref, inject, injectable};
use reqwest::{Client, RequestBuilder};

pub struct SupabaseConnection {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseConnection {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> SupabaseConnection {
        SupabaseConnection {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }

    /// Starts a GET against `/rest/v1/{table}` with the project key attached.
    pub fn select(&self, table: &str, columns: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/rest/v1/{table}", self.base_url))
            .query(&[("select", columns.replace(' ', ""))])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[injectable]
impl SupabaseConnection {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> SupabaseConnection {
        SupabaseConnection::new(settings.supabase_url.clone(), settings.supabase_key.clone())
    }
}
