// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod image_service;
pub mod populate;

pub use image_service::ImageService;
pub use populate::{JobStatus, PopulateJob, PopulateProgress, PopulateSettings};
