//! Shared types for the City Insight API client.

pub mod error;
pub mod models;

pub use error::*;
pub use models::*;
