//! In-memory reservation store for fast, deterministic testing.
//!
//! Transactions hold one async mutex for their whole lifetime, so booking
//! transactions are fully serialized, and they stage their writes on a copy of
//! the tables that only replaces the shared state on commit. Dropping a
//! transaction discards its writes.

use chrono::NaiveDate;
use sizopi_core::StoreError;
use sizopi_core::store::{BookingTransaction, ReservationStore};
use sizopi_core::types::{Facility, FacilityName, Reservation, ReservationKey, VisitorId};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Debug, Default)]
struct Tables {
    facilities: BTreeMap<FacilityName, Facility>,
    reservations: BTreeMap<ReservationKey, Reservation>,
}

impl Tables {
    fn sum_active_tickets(&self, facility: &FacilityName, date: NaiveDate) -> u64 {
        self.reservations
            .values()
            .filter(|r| &r.facility_name == facility && r.visit_date == date && r.is_active())
            .map(|r| u64::from(r.ticket_count.get()))
            .sum()
    }
}

/// In-memory [`ReservationStore`].
///
/// Cloning the store shares the underlying tables.
///
/// # Example
///
/// ```
/// use sizopi_testing::InMemoryReservationStore;
/// use sizopi_testing::fixtures::facility;
///
/// let store = InMemoryReservationStore::with_facilities([facility("Safari Show", 10)]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryReservationStore {
    tables: Arc<Mutex<Tables>>,
    failing_commits: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryReservationStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `facilities`.
    #[must_use]
    pub fn with_facilities(facilities: impl IntoIterator<Item = Facility>) -> Self {
        let tables = Tables {
            facilities: facilities
                .into_iter()
                .map(|f| (f.name.clone(), f))
                .collect(),
            reservations: BTreeMap::new(),
        };
        Self {
            tables: Arc::new(Mutex::new(tables)),
            ..Self::default()
        }
    }

    /// Store a reservation directly, bypassing every check.
    ///
    /// Useful for seeding a date with existing bookings.
    pub async fn put_reservation(&self, reservation: Reservation) {
        self.tables
            .lock()
            .await
            .reservations
            .insert(reservation.key(), reservation);
    }

    /// Every committed reservation, ordered by key.
    pub async fn reservations(&self) -> Vec<Reservation> {
        self.tables.lock().await.reservations.values().cloned().collect()
    }

    /// Make the next `count` commits fail with [`StoreError::Transient`].
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Make [`ReservationStore::ping`] fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

/// Transaction over an [`InMemoryReservationStore`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    failing_commits: Arc<AtomicUsize>,
}

impl BookingTransaction for InMemoryTransaction {
    async fn lock_facility(
        &mut self,
        name: &FacilityName,
    ) -> Result<Option<Facility>, StoreError> {
        Ok(self.staged.facilities.get(name).cloned())
    }

    async fn sum_active_tickets(
        &mut self,
        facility: &FacilityName,
        date: NaiveDate,
    ) -> Result<u64, StoreError> {
        Ok(self.staged.sum_active_tickets(facility, date))
    }

    async fn find_reservation(
        &mut self,
        key: &ReservationKey,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self.staged.reservations.get(key).cloned())
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError> {
        let key = reservation.key();
        if self.staged.reservations.contains_key(&key) {
            return Err(StoreError::UniqueViolation(key.to_string()));
        }
        self.staged.reservations.insert(key, reservation.clone());
        Ok(())
    }

    async fn update_reservation(
        &mut self,
        original: &ReservationKey,
        updated: &Reservation,
    ) -> Result<(), StoreError> {
        let key = updated.key();
        if &key != original && self.staged.reservations.contains_key(&key) {
            return Err(StoreError::UniqueViolation(key.to_string()));
        }
        if self.staged.reservations.remove(original).is_none() {
            return Err(StoreError::Database(format!("no reservation {original}")));
        }
        self.staged.reservations.insert(key, updated.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let injected = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Transient(
                "could not serialize access due to concurrent update".to_string(),
            ));
        }
        *self.guard = self.staged;
        Ok(())
    }
}

impl ReservationStore for InMemoryReservationStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            staged,
            failing_commits: Arc::clone(&self.failing_commits),
        })
    }

    async fn find_facility(&self, name: &FacilityName) -> Result<Option<Facility>, StoreError> {
        Ok(self.tables.lock().await.facilities.get(name).cloned())
    }

    async fn list_facilities(&self) -> Result<Vec<Facility>, StoreError> {
        Ok(self.tables.lock().await.facilities.values().cloned().collect())
    }

    async fn sum_active_tickets(
        &self,
        facility: &FacilityName,
        date: NaiveDate,
    ) -> Result<u64, StoreError> {
        Ok(self.tables.lock().await.sum_active_tickets(facility, date))
    }

    async fn find_reservation(
        &self,
        key: &ReservationKey,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self.tables.lock().await.reservations.get(key).cloned())
    }

    async fn list_reservations_for_visitor(
        &self,
        visitor: &VisitorId,
    ) -> Result<Vec<Reservation>, StoreError> {
        let tables = self.tables.lock().await;
        let mut found: Vec<Reservation> = tables
            .reservations
            .values()
            .filter(|r| &r.visitor_id == visitor)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            (a.visit_date, &a.facility_name).cmp(&(b.visit_date, &b.facility_name))
        });
        Ok(found)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database("store marked unavailable".to_string()));
        }
        Ok(())
    }
}
