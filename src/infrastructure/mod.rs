pub mod database;
pub mod entities;
pub mod history;
pub mod openai;
pub mod repositories;
pub mod settings;
pub mod supabase;
pub mod traits;
