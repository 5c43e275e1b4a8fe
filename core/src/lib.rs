//! # Sizopi Core
//!
//! Domain types, capacity rules and store traits for Sizopi facility reservations.
//!
//! This crate is the functional core of the booking subsystem. It owns:
//!
//! - **Types**: facilities, reservations, validated identifiers and commands
//! - **Capacity**: the pure "is there room?" computation and amendment planning
//! - **Errors**: the reservation error taxonomy shared by every layer
//! - **Store**: the traits the imperative shell (database, in-memory) implements
//! - **Environment**: injected dependencies such as the [`environment::Clock`]
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Decisions are plain functions over loaded data; I/O lives behind [`store`]
//! - The sold-ticket aggregate is recomputed inside the booking transaction,
//!   never cached
//!
//! ## Example
//!
//! ```
//! use chrono::{NaiveDate, Utc};
//! use sizopi_core::capacity::CapacityReport;
//! use sizopi_core::types::{Facility, FacilityKind, FacilityName, TicketCount};
//!
//! let facility = Facility {
//!     name: FacilityName::parse("Safari Show").unwrap(),
//!     schedule: Utc::now(),
//!     max_capacity: 10,
//!     kind: FacilityKind::General,
//! };
//! let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
//!
//! let report = CapacityReport::compute(&facility, date, 7);
//! assert_eq!(report.available, 3);
//! assert!(report.admits(TicketCount::new(3).unwrap()));
//! assert!(!report.admits(TicketCount::new(4).unwrap()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capacity;
pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use error::{ReservationError, StoreError};

/// Environment module - Dependency injection traits
///
/// All ambient dependencies of the booking logic are abstracted behind traits
/// and injected, so tests can pin them.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Used to stamp `created_at` / `updated_at` on reservations.
    ///
    /// # Examples
    ///
    /// ```
    /// use sizopi_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
