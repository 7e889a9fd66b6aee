//! Bank API client: credential exchange and paginated fetching

mod auth;
mod client;
mod pagination;

pub use auth::*;
pub use client::*;
pub use pagination::*;
