// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Re-export database components

pub mod repository;
pub mod schema;

pub use repository::ImageRepository;
pub use schema::init_schema;
