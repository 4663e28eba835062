//! `PostgreSQL` storage for the order engine.
//!
//! This crate provides [`PostgresCommerceStore`], which implements every
//! storage trait from `order-engine-core`:
//!
//! - Products and the stock ledger, with a single-statement conditional
//!   decrement (`UPDATE ... WHERE stock_quantity >= $2`)
//! - Carts and their lines
//! - Orders, items and status history, with a row version for optimistic
//!   concurrency on status changes
//! - Explicit transactions for reconciliation and compensation
//!
//! Serialization failures (`40001`) and deadlocks (`40P01`) surface as
//! `StoreError::Conflict`, which the runtime retries.
//!
//! # Example
//!
//! ```ignore
//! use order_engine_postgres::PostgresCommerceStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresCommerceStore::connect("postgres://localhost/orders").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod queries;
mod store;
mod transaction;

pub use sqlx::postgres::PgPoolOptions;
pub use store::PostgresCommerceStore;
