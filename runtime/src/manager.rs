//! The reservation manager: booking operations over a [`ReservationStore`].
//!
//! Each booking operation (create, amend, cancel) is one store transaction:
//! lock the facility, load what the decision needs, run the pure decision from
//! [`sizopi_core::capacity`], write, commit. A transaction that fails
//! transiently is retried from the top under the manager's [`RetryPolicy`].

use crate::HealthCheck;
use crate::metrics::BookingMetrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use chrono::NaiveDate;
use sizopi_core::ReservationError;
use sizopi_core::capacity::{
    AmendmentPlan, CapacityCheck, CapacityReport, CapacityRequirement, plan_amendment,
};
use sizopi_core::environment::{Clock, SystemClock};
use sizopi_core::store::{BookingTransaction, ReservationStore};
use sizopi_core::types::{
    AmendReservation, CreateReservation, Facility, FacilityName, Reservation, ReservationKey,
    ReservationStatus, TicketCount, VisitorId,
};
use sizopi_core::StoreError;
use std::future::Future;
use std::time::Instant;

/// Creates, amends and cancels reservations without ever overbooking.
#[derive(Debug, Clone)]
pub struct ReservationManager<S, C = SystemClock> {
    store: S,
    clock: C,
    retry_policy: RetryPolicy,
}

impl<S: ReservationStore> ReservationManager<S> {
    /// Manager over `store` using the system clock and the default retry policy.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: ReservationStore, C: Clock> ReservationManager<S, C> {
    /// Manager over `store` stamping records with `clock`.
    #[must_use]
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy for transient transaction failures.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Sold and remaining tickets for `facility` on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::FacilityNotFound`] for an unknown facility.
    #[tracing::instrument(skip_all, fields(facility = %facility, date = %date))]
    pub async fn capacity(
        &self,
        facility: &FacilityName,
        date: NaiveDate,
    ) -> Result<CapacityReport, ReservationError> {
        let found = self.facility(facility).await?;
        let sold = self.store.sum_active_tickets(facility, date).await?;
        Ok(CapacityReport::compute(&found, date, sold))
    }

    /// Whether `requested` more tickets fit at `facility` on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::FacilityNotFound`] for an unknown facility.
    pub async fn check_capacity(
        &self,
        facility: &FacilityName,
        date: NaiveDate,
        requested: TicketCount,
    ) -> Result<CapacityCheck, ReservationError> {
        Ok(self.capacity(facility, date).await?.check(requested))
    }

    /// Book tickets.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::FacilityNotFound`] for an unknown facility
    /// - [`ReservationError::Conflict`] if the visitor already has a
    ///   reservation for that facility and date
    /// - [`ReservationError::CapacityExceeded`] if the tickets do not fit
    #[tracing::instrument(
        skip_all,
        fields(
            visitor = %command.visitor_id,
            facility = %command.facility_name,
            date = %command.visit_date,
            tickets = command.ticket_count.get(),
        )
    )]
    pub async fn create(
        &self,
        command: CreateReservation,
    ) -> Result<Reservation, ReservationError> {
        let command = &command;
        let reservation = self
            .run_booking("create", || self.try_create(command))
            .await?;

        BookingMetrics::record_tickets_booked(reservation.ticket_count);
        tracing::info!("Reservation created");
        Ok(reservation)
    }

    /// Change ticket count, visit date and/or status of a reservation.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::ReservationNotFound`] if no reservation has the key
    /// - [`ReservationError::InvalidState`] if it is cancelled
    /// - [`ReservationError::Validation`] if cancellation is combined with
    ///   other changes
    /// - [`ReservationError::Conflict`] if moving onto a date the visitor
    ///   already booked
    /// - [`ReservationError::CapacityExceeded`] if the new tickets do not fit
    #[tracing::instrument(
        skip_all,
        fields(
            key = %amend.key,
            new_tickets = amend.new_ticket_count.map(TicketCount::get),
            new_date = amend.new_visit_date.map(|d| d.to_string()),
            new_status = amend.new_status.map(|s| s.as_str()),
        )
    )]
    pub async fn amend(&self, amend: AmendReservation) -> Result<Reservation, ReservationError> {
        let amend = &amend;
        let reservation = self
            .run_booking("amend", || self.try_amend(amend))
            .await?;

        tracing::info!(status = %reservation.status, "Reservation amended");
        Ok(reservation)
    }

    /// Cancel a reservation. Cancelling a cancelled reservation returns it
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::ReservationNotFound`] if no reservation has
    /// the key.
    #[tracing::instrument(skip_all, fields(key = %key))]
    pub async fn cancel(&self, key: ReservationKey) -> Result<Reservation, ReservationError> {
        let amend = &AmendReservation::of(key).status(ReservationStatus::Cancelled);
        let reservation = self
            .run_booking("cancel", || self.try_amend(amend))
            .await?;

        tracing::info!("Reservation cancelled");
        Ok(reservation)
    }

    /// Load one reservation.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::ReservationNotFound`] if no reservation has
    /// the key.
    pub async fn get(&self, key: &ReservationKey) -> Result<Reservation, ReservationError> {
        self.store
            .find_reservation(key)
            .await?
            .ok_or_else(|| ReservationError::ReservationNotFound(key.clone()))
    }

    /// Every reservation of a visitor, ordered by date then facility.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Store`] on store failure.
    pub async fn list_for_visitor(
        &self,
        visitor: &VisitorId,
    ) -> Result<Vec<Reservation>, ReservationError> {
        Ok(self.store.list_reservations_for_visitor(visitor).await?)
    }

    /// All facilities ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Store`] on store failure.
    pub async fn facilities(&self) -> Result<Vec<Facility>, ReservationError> {
        Ok(self.store.list_facilities().await?)
    }

    /// Load one facility.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::FacilityNotFound`] for an unknown facility.
    pub async fn facility(&self, name: &FacilityName) -> Result<Facility, ReservationError> {
        self.store
            .find_facility(name)
            .await?
            .ok_or_else(|| ReservationError::FacilityNotFound(name.clone()))
    }

    /// Check the store is reachable.
    pub async fn health(&self) -> HealthCheck {
        match self.store.ping().await {
            Ok(()) => HealthCheck::healthy("database"),
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                HealthCheck::unhealthy("database", e.to_string())
            }
        }
    }

    async fn run_booking<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, ReservationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ReservationError>>,
    {
        let started = Instant::now();
        let mut attempts = 0_usize;

        let result = retry_with_predicate(
            self.retry_policy.clone(),
            || {
                if attempts > 0 {
                    BookingMetrics::record_retry(operation);
                }
                attempts += 1;
                attempt()
            },
            ReservationError::is_transient,
        )
        .await;

        BookingMetrics::record_outcome(operation, &result, started.elapsed());
        if let Err(e) = &result {
            if matches!(e, ReservationError::Store(_)) {
                tracing::error!(operation, error = %e, "Booking transaction failed");
            } else {
                tracing::debug!(operation, error = %e, "Booking rejected");
            }
        }
        result
    }

    async fn try_create(
        &self,
        command: &CreateReservation,
    ) -> Result<Reservation, ReservationError> {
        let mut tx = self.store.begin().await?;

        let facility = tx
            .lock_facility(&command.facility_name)
            .await?
            .ok_or_else(|| ReservationError::FacilityNotFound(command.facility_name.clone()))?;

        let key = command.key();
        if tx.find_reservation(&key).await?.is_some() {
            return Err(ReservationError::Conflict(key));
        }

        let sold = tx
            .sum_active_tickets(&facility.name, command.visit_date)
            .await?;
        CapacityReport::compute(&facility, command.visit_date, sold)
            .ensure_admits(command.ticket_count)?;

        let reservation = Reservation::new_active(command, self.clock.now());
        tx.insert_reservation(&reservation)
            .await
            .map_err(|e| conflict_on_unique(e, &key))?;
        tx.commit().await?;

        Ok(reservation)
    }

    async fn try_amend(&self, amend: &AmendReservation) -> Result<Reservation, ReservationError> {
        let key = &amend.key;
        let mut tx = self.store.begin().await?;

        // The facility row is the lock every booking for it queues on.
        let Some(facility) = tx.lock_facility(&key.facility_name).await? else {
            return Err(ReservationError::ReservationNotFound(key.clone()));
        };

        let current = tx
            .find_reservation(key)
            .await?
            .ok_or_else(|| ReservationError::ReservationNotFound(key.clone()))?;

        match plan_amendment(&current, amend)? {
            AmendmentPlan::Unchanged => Ok(current),
            AmendmentPlan::Cancel => {
                let cancelled = current.cancelled(self.clock.now());
                tx.update_reservation(key, &cancelled).await?;
                tx.commit().await?;
                Ok(cancelled)
            }
            AmendmentPlan::Reschedule {
                ticket_count,
                visit_date,
                requirement,
            } => {
                let target = key.on_date(visit_date);
                match requirement {
                    CapacityRequirement::Unneeded => {}
                    CapacityRequirement::SameDate { own_tickets } => {
                        let sold = tx.sum_active_tickets(&facility.name, visit_date).await?;
                        CapacityReport::compute(&facility, visit_date, sold)
                            .excluding(own_tickets)
                            .ensure_admits(ticket_count)?;
                    }
                    CapacityRequirement::NewDate => {
                        if tx.find_reservation(&target).await?.is_some() {
                            return Err(ReservationError::Conflict(target));
                        }
                        let sold = tx.sum_active_tickets(&facility.name, visit_date).await?;
                        CapacityReport::compute(&facility, visit_date, sold)
                            .ensure_admits(ticket_count)?;
                    }
                }

                let updated = current.rescheduled(ticket_count, visit_date, self.clock.now());
                tx.update_reservation(key, &updated)
                    .await
                    .map_err(|e| conflict_on_unique(e, &target))?;
                tx.commit().await?;
                Ok(updated)
            }
        }
    }
}

fn conflict_on_unique(error: StoreError, key: &ReservationKey) -> ReservationError {
    match error {
        StoreError::UniqueViolation(_) => ReservationError::Conflict(key.clone()),
        other => ReservationError::Store(other),
    }
}
