//! # Sizopi Testing
//!
//! Testing utilities and helpers for the Sizopi booking subsystem.
//!
//! This crate provides:
//! - [`InMemoryReservationStore`]: a transactional in-memory store
//! - [`FixedClock`]: deterministic time
//! - [`fixtures`]: builders for facilities, reservations and commands
//!
//! ## Example
//!
//! ```ignore
//! use sizopi_runtime::ReservationManager;
//! use sizopi_testing::{InMemoryReservationStore, fixtures, test_clock};
//!
//! #[tokio::test]
//! async fn test_booking() {
//!     let safari = fixtures::facility("Safari Show", 10);
//!     let store = InMemoryReservationStore::with_facilities([safari]);
//!     let manager = ReservationManager::with_clock(store, test_clock());
//!
//!     let reservation = manager
//!         .create(fixtures::create_command("budi", "Safari Show", fixtures::date(1), 3))
//!         .await
//!         .unwrap();
//!     assert!(reservation.is_active());
//! }
//! ```

use chrono::{DateTime, Utc};
use sizopi_core::environment::Clock;

/// In-memory store
pub mod store;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use sizopi_testing::mocks::FixedClock;
    /// use sizopi_core::environment::Clock;
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

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for domain values used across test suites.
///
/// These take plain literals and panic on invalid input, which keeps test
/// bodies short.
#[allow(clippy::expect_used, clippy::missing_panics_doc)]
pub mod fixtures {
    use super::mocks::test_clock;
    use chrono::{NaiveDate, TimeZone, Utc};
    use sizopi_core::environment::Clock;
    use sizopi_core::types::{
        CreateReservation, Facility, FacilityKind, FacilityName, Reservation, ReservationKey,
        TicketCount, VisitorId,
    };

    /// A date in June 2025.
    #[must_use]
    pub fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).expect("valid June day")
    }

    /// Parse a visitor id.
    #[must_use]
    pub fn visitor(name: &str) -> VisitorId {
        VisitorId::parse(name).expect("valid visitor id")
    }

    /// Parse a facility name.
    #[must_use]
    pub fn facility_name(name: &str) -> FacilityName {
        FacilityName::parse(name).expect("valid facility name")
    }

    /// A ticket count.
    #[must_use]
    pub fn tickets(count: u32) -> TicketCount {
        TicketCount::new(count).expect("positive ticket count")
    }

    /// A general facility with the given capacity.
    #[must_use]
    pub fn facility(name: &str, max_capacity: u32) -> Facility {
        Facility {
            name: facility_name(name),
            schedule: Utc
                .with_ymd_and_hms(2025, 1, 1, 10, 0, 0)
                .single()
                .expect("valid schedule"),
            max_capacity,
            kind: FacilityKind::General,
        }
    }

    /// A ride with the given capacity and rules.
    #[must_use]
    pub fn ride(name: &str, max_capacity: u32, rules: &[&str]) -> Facility {
        Facility {
            kind: FacilityKind::Ride {
                rules: rules.iter().map(ToString::to_string).collect(),
            },
            ..facility(name, max_capacity)
        }
    }

    /// Reservation key.
    #[must_use]
    pub fn key(visitor_id: &str, facility: &str, visit_date: NaiveDate) -> ReservationKey {
        ReservationKey::new(visitor(visitor_id), facility_name(facility), visit_date)
    }

    /// Create command.
    #[must_use]
    pub fn create_command(
        visitor_id: &str,
        facility: &str,
        visit_date: NaiveDate,
        count: u32,
    ) -> CreateReservation {
        CreateReservation {
            visitor_id: visitor(visitor_id),
            facility_name: facility_name(facility),
            visit_date,
            ticket_count: tickets(count),
        }
    }

    /// An active reservation stamped with [`test_clock`].
    #[must_use]
    pub fn active_reservation(
        visitor_id: &str,
        facility: &str,
        visit_date: NaiveDate,
        count: u32,
    ) -> Reservation {
        Reservation::new_active(
            &create_command(visitor_id, facility, visit_date, count),
            test_clock().now(),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use store::{InMemoryReservationStore, InMemoryTransaction};
