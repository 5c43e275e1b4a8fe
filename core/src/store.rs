//! Store traits for facilities and reservations.
//!
//! The reservation core reads facilities and reads/writes reservations through
//! these traits. Booking operations (create, amend, cancel) run entirely inside
//! a [`BookingTransaction`], which an implementation must isolate from every
//! other transaction touching the same facility: two transactions that lock
//! the same facility never observe each other's uncommitted writes, and the
//! second waits (or fails transiently) until the first commits or is dropped.
//!
//! # Implementations
//!
//! - `PostgresReservationStore` (in `sizopi-postgres`): `READ COMMITTED`
//!   transactions queued on a `FOR UPDATE` lock of the facility row
//! - `InMemoryReservationStore` (in `sizopi-testing`): a single async mutex held
//!   for the lifetime of the transaction
//!
//! # Example
//!
//! ```no_run
//! use sizopi_core::store::{BookingTransaction, ReservationStore};
//! use sizopi_core::types::FacilityName;
//! use sizopi_core::{NaiveDate, ReservationError};
//!
//! async fn sold<S: ReservationStore>(store: &S) -> Result<u64, ReservationError> {
//!     let name = FacilityName::parse("Safari Show")?;
//!     let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap_or_default();
//!
//!     let mut tx = store.begin().await?;
//!     tx.lock_facility(&name).await?;
//!     let sold = tx.sum_active_tickets(&name, date).await?;
//!     tx.commit().await?;
//!     Ok(sold)
//! }
//! ```
//!
//! Dropping a transaction without calling [`BookingTransaction::commit`] rolls
//! it back.

use crate::error::StoreError;
use crate::types::{Facility, FacilityName, Reservation, ReservationKey, VisitorId};
use chrono::NaiveDate;
use std::future::Future;

/// A unit of work in which a booking decision is read and written atomically.
pub trait BookingTransaction: Send {
    /// Load a facility and lock it against concurrent booking transactions.
    ///
    /// Returns `Ok(None)` if the facility does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn lock_facility(
        &mut self,
        name: &FacilityName,
    ) -> impl Future<Output = Result<Option<Facility>, StoreError>> + Send;

    /// Sum of ticket counts over active reservations for `facility` on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn sum_active_tickets(
        &mut self,
        facility: &FacilityName,
        date: NaiveDate,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Load a reservation by key, seeing this transaction's own writes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn find_reservation(
        &mut self,
        key: &ReservationKey,
    ) -> impl Future<Output = Result<Option<Reservation>, StoreError>> + Send;

    /// Insert a new reservation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if the key is taken.
    fn insert_reservation(
        &mut self,
        reservation: &Reservation,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replace the reservation stored under `original` with `updated`.
    ///
    /// `updated` may carry a different visit date, in which case the row moves
    /// to the new key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if the new key is taken, or
    /// [`StoreError::Database`] if `original` does not exist.
    fn update_reservation(
        &mut self,
        original: &ReservationKey,
        updated: &Reservation,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Make every write of this transaction visible.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transient`] on serialization failure, deadlock or
    /// lost connection; the caller retries the whole operation.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Facility and reservation storage.
///
/// Implementations must be `Send + Sync` so one store can be shared by every
/// request handler.
pub trait ReservationStore: Send + Sync {
    /// Transaction type handed out by [`ReservationStore::begin`].
    type Transaction: BookingTransaction;

    /// Start a booking transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if no connection is available.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, StoreError>> + Send;

    /// Load a facility without locking it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn find_facility(
        &self,
        name: &FacilityName,
    ) -> impl Future<Output = Result<Option<Facility>, StoreError>> + Send;

    /// All facilities ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_facilities(&self) -> impl Future<Output = Result<Vec<Facility>, StoreError>> + Send;

    /// Committed active-ticket sum, outside any booking transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn sum_active_tickets(
        &self,
        facility: &FacilityName,
        date: NaiveDate,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Load a committed reservation by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn find_reservation(
        &self,
        key: &ReservationKey,
    ) -> impl Future<Output = Result<Option<Reservation>, StoreError>> + Send;

    /// Every reservation of `visitor`, ordered by visit date then facility.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_reservations_for_visitor(
        &self,
        visitor: &VisitorId,
    ) -> impl Future<Output = Result<Vec<Reservation>, StoreError>> + Send;

    /// Check the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if it is not.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
