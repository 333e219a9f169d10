// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export handler components

pub mod api;
pub mod health;
pub mod pages;

pub use api::config as api_config;
pub use health::config as health_config;
pub use pages::config as pages_config;
