//! Core data models and error types

mod error;
mod models;

pub use error::*;
pub use models::*;
