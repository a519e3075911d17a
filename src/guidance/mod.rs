pub mod error;
pub mod guidance_model;
pub mod merger;
pub mod orchestrator;
