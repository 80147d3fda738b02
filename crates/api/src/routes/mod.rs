//! HTTP route handlers.

pub mod auth;
pub mod cart;
pub mod health;
pub mod items;
pub mod listings;
pub mod metrics;
