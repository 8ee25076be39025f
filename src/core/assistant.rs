//! Restaurant assistant prompt building.
//!

use crate::infrastructure::entities::Restaurant;
use di::{inject, injectable};
use minijinja::Environment;
use std::sync::{Arc, RwLock};

const SYSTEM_PROMPT_TEMPLATE: &str = "You are a helpful assistant that recommends a restaurant to the user. \
The following is the list of the restaurants: {{ restaurants }}\n\
Only recommend the restaurants in the list. When recommending, recommend all multiple restaurants that fit the description.";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    role: Role,
    content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Renders the restaurant list into the context string, one line per
/// restaurant.
pub fn format_restaurant_context(restaurants: &[Restaurant]) -> String {
    restaurants
        .iter()
        .map(|r| {
            format!(
                "- **{}**: {}. Menu includes {}.",
                r.name,
                r.description,
                r.menu.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_system_prompt(restaurants: &[Restaurant]) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
    env.add_template("system", SYSTEM_PROMPT_TEMPLATE)?;
    env.get_template("system")?
        .render(minijinja::context! { restaurants => format_restaurant_context(restaurants) })
}

/// The restaurant list the assistant currently answers from. Last write wins.
#[derive(Default)]
pub struct RestaurantContext {
    restaurants: RwLock<Arc<[Restaurant]>>,
}

#[injectable]
impl RestaurantContext {
    #[inject]
    pub fn create() -> RestaurantContext {
        RestaurantContext::default()
    }
}

impl RestaurantContext {
    pub fn replace(&self, restaurants: Vec<Restaurant>) {
        let restaurants: Arc<[Restaurant]> = restaurants.into();
        match self.restaurants.write() {
            Ok(mut current) => *current = restaurants,
            Err(poisoned) => *poisoned.into_inner() = restaurants,
        }
    }

    /// Cheap snapshot; later `replace` calls don't affect it.
    pub fn snapshot(&self) -> Arc<[Restaurant]> {
        match self.restaurants.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
