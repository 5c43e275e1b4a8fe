//! Capacity arithmetic and amendment planning.
//!
//! Everything here is pure: the runtime loads the facility and the current
//! sold-ticket sum inside a booking transaction, and these functions decide
//! whether the write may go ahead.

use crate::error::ReservationError;
use crate::types::{
    AmendReservation, Facility, FacilityName, Reservation, ReservationStatus, TicketCount,
};
use chrono::NaiveDate;
use serde::Serialize;

/// Sold and remaining tickets for one facility on one date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityReport {
    /// Facility the report is for
    pub facility_name: FacilityName,
    /// Date the report is for
    pub visit_date: NaiveDate,
    /// Facility ceiling
    pub max_capacity: u32,
    /// Sum of tickets held by active reservations
    pub sold_tickets: u64,
    /// `max_capacity - sold_tickets`, never below zero
    pub available: u32,
}

impl CapacityReport {
    /// Build a report from a facility and the active-ticket sum for `visit_date`.
    #[must_use]
    pub fn compute(facility: &Facility, visit_date: NaiveDate, sold_tickets: u64) -> Self {
        Self {
            facility_name: facility.name.clone(),
            visit_date,
            max_capacity: facility.max_capacity,
            sold_tickets,
            available: remaining(facility.max_capacity, sold_tickets),
        }
    }

    /// The same report with `own` tickets no longer counted as sold.
    ///
    /// Used when a reservation grows on its current date: its existing
    /// tickets are replaced, not added to.
    #[must_use]
    pub fn excluding(&self, own: TicketCount) -> Self {
        let sold_tickets = self.sold_tickets.saturating_sub(u64::from(own.get()));
        Self {
            sold_tickets,
            available: remaining(self.max_capacity, sold_tickets),
            ..self.clone()
        }
    }

    /// Whether `requested` more tickets fit.
    #[must_use]
    pub const fn admits(&self, requested: TicketCount) -> bool {
        requested.get() <= self.available
    }

    /// Answer "is there room for `requested` tickets?".
    #[must_use]
    pub fn check(self, requested: TicketCount) -> CapacityCheck {
        let enough = self.admits(requested);
        CapacityCheck {
            report: self,
            requested,
            enough,
        }
    }

    /// Fail with [`ReservationError::CapacityExceeded`] unless `requested` fits.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::CapacityExceeded`] carrying the remaining
    /// ticket count.
    pub fn ensure_admits(&self, requested: TicketCount) -> Result<(), ReservationError> {
        if self.admits(requested) {
            return Ok(());
        }
        Err(ReservationError::CapacityExceeded {
            facility_name: self.facility_name.clone(),
            visit_date: self.visit_date,
            requested,
            available: self.available,
        })
    }
}

fn remaining(max_capacity: u32, sold_tickets: u64) -> u32 {
    let left = u64::from(max_capacity).saturating_sub(sold_tickets);
    // left <= max_capacity, so it always fits
    u32::try_from(left).unwrap_or(0)
}

/// A [`CapacityReport`] together with the verdict for a specific request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityCheck {
    /// Underlying numbers
    #[serde(flatten)]
    pub report: CapacityReport,
    /// Tickets asked about
    pub requested: TicketCount,
    /// `requested <= available`
    pub enough: bool,
}

/// Which capacity check an amendment needs before it can be written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapacityRequirement {
    /// Same date and not growing; always fits
    Unneeded,
    /// Same date, growing: check against the date's sum minus `own_tickets`
    SameDate {
        /// Tickets the reservation already holds on that date
        own_tickets: TicketCount,
    },
    /// Moving to another date: plain check against that date
    NewDate,
}

/// What an amendment resolves to once validated against the current record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AmendmentPlan {
    /// Nothing changes; return the record as-is
    Unchanged,
    /// Transition `Active → Cancelled`
    Cancel,
    /// Rewrite ticket count and/or date
    Reschedule {
        /// Resulting ticket count
        ticket_count: TicketCount,
        /// Resulting visit date
        visit_date: NaiveDate,
        /// Check to run before writing
        requirement: CapacityRequirement,
    },
}

/// Decide what `amend` does to `current`.
///
/// # Errors
///
/// - [`ReservationError::Validation`] when a cancellation is combined with a
///   ticket or date change
/// - [`ReservationError::InvalidState`] when `current` is cancelled and the
///   amendment is anything but a repeat cancellation
pub fn plan_amendment(
    current: &Reservation,
    amend: &AmendReservation,
) -> Result<AmendmentPlan, ReservationError> {
    let ticket_count = amend.new_ticket_count.unwrap_or(current.ticket_count);
    let visit_date = amend.new_visit_date.unwrap_or(current.visit_date);
    let reschedules = ticket_count != current.ticket_count || visit_date != current.visit_date;

    if amend.new_status == Some(ReservationStatus::Cancelled) {
        if reschedules {
            return Err(ReservationError::validation(
                "newStatus",
                "cancellation cannot be combined with ticket or date changes",
            ));
        }
        return Ok(if current.is_active() {
            AmendmentPlan::Cancel
        } else {
            AmendmentPlan::Unchanged
        });
    }

    if !current.is_active() {
        return Err(ReservationError::InvalidState {
            key: current.key(),
            status: current.status,
        });
    }

    if !reschedules {
        return Ok(AmendmentPlan::Unchanged);
    }

    let requirement = if visit_date != current.visit_date {
        CapacityRequirement::NewDate
    } else if ticket_count > current.ticket_count {
        CapacityRequirement::SameDate {
            own_tickets: current.ticket_count,
        }
    } else {
        CapacityRequirement::Unneeded
    };

    Ok(AmendmentPlan::Reschedule {
        ticket_count,
        visit_date,
        requirement,
    })
}
