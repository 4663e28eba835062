//! HTTP request handlers, grouped by resource.

pub mod cart;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

pub use health::{health_check, metrics, readiness_check};
