//! Shared data model, configuration, and error prelude for the Scam Site
//! Investigator (SSI) workspace.

pub mod config;
pub mod error;
pub mod models;

pub use error::SsiError;
pub use models::*;
