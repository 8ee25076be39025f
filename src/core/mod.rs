pub mod assistant;
pub mod services;
pub mod traits;
pub mod view;
pub mod views;
