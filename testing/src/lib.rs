//! # Order Engine Testing
//!
//! Testing utilities for the order engine.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits
//! - [`InMemoryCommerceStore`]: a transactional store with fault injection
//! - Fixtures for common domain values
//!
//! ## Example
//!
//! ```ignore
//! use order_engine_testing::{InMemoryCommerceStore, SequentialIdGenerator, test_clock};
//!
//! #[tokio::test]
//! async fn places_an_order() {
//!     let store = Arc::new(InMemoryCommerceStore::new());
//!     let widget = store.add_product("Widget", Money::from_cents(1000), 5);
//!     let service = OrderService::new(
//!         store.clone(),
//!         Arc::new(SequentialIdGenerator::new()),
//!         Arc::new(test_clock()),
//!         OrderServiceConfig::default(),
//!     );
//!     // ...
//! }
//! ```

use chrono::{DateTime, Utc};
use order_engine_core::environment::{Clock, IdGenerator};

pub mod fixtures;
pub mod in_memory;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};
    use uuid::Uuid;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use order_engine_testing::mocks::FixedClock;
    /// use order_engine_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// The instant every [`test_clock`] reports (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }

    /// Predictable identifiers: `00000000-0000-0000-0000-000000000001`, `...02`, ...
    ///
    /// Share one generator between everything that writes to the same
    /// store; two fresh generators hand out the same ids.
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Start counting from 1
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(0),
            }
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> Uuid {
            let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
            Uuid::from_u128(u128::from(n))
        }
    }
}

// Re-export commonly used items
pub use in_memory::InMemoryCommerceStore;
pub use mocks::{FixedClock, SequentialIdGenerator, test_clock, test_time};
