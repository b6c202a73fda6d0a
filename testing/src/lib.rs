//! # Vybeme Testing
//!
//! Testing utilities for reducers built on `vybeme-core`.
//!
//! - [`FixedClock`] / [`test_clock`]: deterministic time
//! - [`ReducerTest`]: given/when/then harness for a single reducer step
//! - [`reducer_test::assertions`]: effect assertions
//! - [`init_test_tracing`]: opt-in log output for debugging a test
//!
//! ## Example
//!
//! ```ignore
//! use vybeme_testing::{ReducerTest, reducer_test::assertions};
//!
//! ReducerTest::new(CheckInReducer::new())
//!     .with_env(test_environment())
//!     .given_state(selected_state("evt_1"))
//!     .when_action(CheckInAction::CodeDecoded { payload: "ABC123".into() })
//!     .then_state(|s| assert_eq!(s.scan.status(), ScanStatus::Submitting))
//!     .then_effects(|effects| assertions::assert_future_count(effects, 1))
//!     .run();
//! ```

use chrono::{DateTime, TimeZone, Utc};
use vybeme_core::environment::Clock;

pub mod reducer_test;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, TimeZone, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use vybeme_testing::mocks::FixedClock;
    /// use vybeme_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
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

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default())
    }
}

/// Install a `fmt` subscriber honouring `RUST_LOG`, once per process.
///
/// Later calls are ignored, so every test may call it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::ReducerTest;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_new_year_2025() {
        let clock = test_clock();
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn tracing_init_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
