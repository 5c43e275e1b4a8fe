//! `PostgreSQL` reservation store for Sizopi.
//!
//! This crate implements the `ReservationStore` trait from `sizopi-core` on top
//! of the `fasilitas`, `atraksi`, `wahana` and `reservasi` tables. It provides:
//!
//! - `READ COMMITTED` booking transactions serialized on the facility row lock
//! - Classification of serialization failures and deadlocks as transient
//! - Connection pooling
//! - Embedded migrations
//!
//! # Example
//!
//! ```no_run
//! use sizopi_postgres::PostgresReservationStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresReservationStore::connect("postgres://localhost/sizopi").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, NaiveDate, Utc};
use sizopi_core::StoreError;
use sizopi_core::store::{BookingTransaction, ReservationStore};
use sizopi_core::types::{
    Facility, FacilityKind, FacilityName, Reservation, ReservationKey, ReservationStatus,
    TicketCount, VisitorId,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};

/// SQLSTATE for `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";

const FACILITY_COLUMNS: &str = r"
    SELECT f.nama, f.jadwal, f.kapasitas_max, a.lokasi, w.peraturan
    FROM fasilitas f
    LEFT JOIN atraksi a ON a.nama_atraksi = f.nama
    LEFT JOIN wahana w ON w.nama_wahana = f.nama
";

const RESERVATION_COLUMNS: &str = r"
    SELECT username_p, nama_fasilitas, tanggal_kunjungan, jumlah_tiket, status,
           created_at, updated_at
    FROM reservasi
";

const BY_KEY: &str =
    "WHERE username_p = $1 AND nama_fasilitas = $2 AND tanggal_kunjungan = $3";

const SUM_ACTIVE_TICKETS: &str = r"
    SELECT COALESCE(SUM(jumlah_tiket), 0)::BIGINT
    FROM reservasi
    WHERE nama_fasilitas = $1 AND tanggal_kunjungan = $2 AND status = 'Active'
";

/// Map a sqlx error onto the store error taxonomy.
fn store_error(context: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation(db_err.message().to_string());
        }
        if matches!(
            db_err.code().as_deref(),
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
        ) {
            return StoreError::Transient(format!("{context}: {}", db_err.message()));
        }
    }
    if matches!(
        e,
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
    ) {
        return StoreError::Transient(format!("{context}: {e}"));
    }
    StoreError::Database(format!("{context}: {e}"))
}

#[derive(sqlx::FromRow)]
struct FacilityRow {
    nama: String,
    jadwal: DateTime<Utc>,
    kapasitas_max: i32,
    lokasi: Option<String>,
    peraturan: Option<Vec<String>>,
}

impl TryFrom<FacilityRow> for Facility {
    type Error = StoreError;

    fn try_from(row: FacilityRow) -> Result<Self, Self::Error> {
        let kind = match (row.lokasi, row.peraturan) {
            (Some(location), _) => FacilityKind::Attraction { location },
            (None, Some(rules)) => FacilityKind::Ride { rules },
            (None, None) => FacilityKind::General,
        };
        Ok(Self {
            name: FacilityName::parse(&row.nama)
                .map_err(|e| StoreError::Database(format!("Invalid facility row: {e}")))?,
            schedule: row.jadwal,
            max_capacity: u32::try_from(row.kapasitas_max).map_err(|_| {
                StoreError::Database(format!(
                    "Invalid capacity {} for facility {}",
                    row.kapasitas_max, row.nama
                ))
            })?,
            kind,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    username_p: String,
    nama_fasilitas: String,
    tanggal_kunjungan: NaiveDate,
    jumlah_tiket: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let invalid = |e: sizopi_core::ReservationError| {
            StoreError::Database(format!("Invalid reservation row: {e}"))
        };
        Ok(Self {
            visitor_id: VisitorId::parse(&row.username_p).map_err(invalid)?,
            facility_name: FacilityName::parse(&row.nama_fasilitas).map_err(invalid)?,
            visit_date: row.tanggal_kunjungan,
            ticket_count: u32::try_from(row.jumlah_tiket)
                .ok()
                .and_then(TicketCount::new)
                .ok_or_else(|| {
                    StoreError::Database(format!("Invalid ticket count {}", row.jumlah_tiket))
                })?,
            status: ReservationStatus::parse(&row.status).map_err(invalid)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn ticket_column(count: TicketCount) -> Result<i32, StoreError> {
    i32::try_from(count.get())
        .map_err(|_| StoreError::Database(format!("Ticket count {count} out of range")))
}

fn sold_tickets(sum: i64) -> Result<u64, StoreError> {
    u64::try_from(sum).map_err(|_| StoreError::Database(format!("Negative ticket sum {sum}")))
}

/// `PostgreSQL`-backed [`ReservationStore`].
#[derive(Clone, Debug)]
pub struct PostgresReservationStore {
    pool: PgPool,
}

impl PostgresReservationStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database is unreachable.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .connect(database_url)
            .await
            .map_err(|e| store_error("Failed to connect", e))?;
        Ok(Self::from_pool(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if migrations fail.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

/// Booking transaction on a pooled connection.
///
/// Runs at `READ COMMITTED`: every statement after
/// [`lock_facility`](BookingTransaction::lock_facility) must read the state
/// committed by the previous holder of the facility lock.
///
/// Dropping it without committing rolls back.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl BookingTransaction for PostgresTransaction {
    async fn lock_facility(&mut self, name: &FacilityName) -> Result<Option<Facility>, StoreError> {
        let query = format!("{FACILITY_COLUMNS} WHERE f.nama = $1 FOR UPDATE OF f");
        sqlx::query_as::<_, FacilityRow>(&query)
            .bind(name.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to lock facility", e))?
            .map(Facility::try_from)
            .transpose()
    }

    async fn sum_active_tickets(
        &mut self,
        facility: &FacilityName,
        date: NaiveDate,
    ) -> Result<u64, StoreError> {
        let (sum,): (i64,) = sqlx::query_as(SUM_ACTIVE_TICKETS)
            .bind(facility.as_str())
            .bind(date)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to sum tickets", e))?;
        sold_tickets(sum)
    }

    async fn find_reservation(
        &mut self,
        key: &ReservationKey,
    ) -> Result<Option<Reservation>, StoreError> {
        let query = format!("{RESERVATION_COLUMNS} {BY_KEY}");
        sqlx::query_as::<_, ReservationRow>(&query)
            .bind(key.visitor_id.as_str())
            .bind(key.facility_name.as_str())
            .bind(key.visit_date)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to load reservation", e))?
            .map(Reservation::try_from)
            .transpose()
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO reservasi
                (username_p, nama_fasilitas, tanggal_kunjungan, jumlah_tiket, status,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(reservation.visitor_id.as_str())
        .bind(reservation.facility_name.as_str())
        .bind(reservation.visit_date)
        .bind(ticket_column(reservation.ticket_count)?)
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to insert reservation", e))?;
        Ok(())
    }

    async fn update_reservation(
        &mut self,
        original: &ReservationKey,
        updated: &Reservation,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE reservasi
            SET tanggal_kunjungan = $4, jumlah_tiket = $5, status = $6, updated_at = $7
            WHERE username_p = $1 AND nama_fasilitas = $2 AND tanggal_kunjungan = $3
            ",
        )
        .bind(original.visitor_id.as_str())
        .bind(original.facility_name.as_str())
        .bind(original.visit_date)
        .bind(updated.visit_date)
        .bind(ticket_column(updated.ticket_count)?)
        .bind(updated.status.as_str())
        .bind(updated.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to update reservation", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Database(format!("No reservation {original}")));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| store_error("Failed to commit", e))
    }
}

impl ReservationStore for PostgresReservationStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin transaction", e))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await
            .map_err(|e| store_error("Failed to set isolation level", e))?;
        Ok(PostgresTransaction { tx })
    }

    async fn find_facility(&self, name: &FacilityName) -> Result<Option<Facility>, StoreError> {
        let query = format!("{FACILITY_COLUMNS} WHERE f.nama = $1");
        sqlx::query_as::<_, FacilityRow>(&query)
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("Failed to load facility", e))?
            .map(Facility::try_from)
            .transpose()
    }

    async fn list_facilities(&self) -> Result<Vec<Facility>, StoreError> {
        let query = format!("{FACILITY_COLUMNS} ORDER BY f.nama");
        sqlx::query_as::<_, FacilityRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("Failed to list facilities", e))?
            .into_iter()
            .map(Facility::try_from)
            .collect()
    }

    async fn sum_active_tickets(
        &self,
        facility: &FacilityName,
        date: NaiveDate,
    ) -> Result<u64, StoreError> {
        let (sum,): (i64,) = sqlx::query_as(SUM_ACTIVE_TICKETS)
            .bind(facility.as_str())
            .bind(date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("Failed to sum tickets", e))?;
        sold_tickets(sum)
    }

    async fn find_reservation(
        &self,
        key: &ReservationKey,
    ) -> Result<Option<Reservation>, StoreError> {
        let query = format!("{RESERVATION_COLUMNS} {BY_KEY}");
        sqlx::query_as::<_, ReservationRow>(&query)
            .bind(key.visitor_id.as_str())
            .bind(key.facility_name.as_str())
            .bind(key.visit_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("Failed to load reservation", e))?
            .map(Reservation::try_from)
            .transpose()
    }

    async fn list_reservations_for_visitor(
        &self,
        visitor: &VisitorId,
    ) -> Result<Vec<Reservation>, StoreError> {
        let query = format!(
            "{RESERVATION_COLUMNS} WHERE username_p = $1 ORDER BY tanggal_kunjungan, nama_fasilitas"
        );
        sqlx::query_as::<_, ReservationRow>(&query)
            .bind(visitor.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("Failed to list reservations", e))?
            .into_iter()
            .map(Reservation::try_from)
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Database ping failed", e))?;
        Ok(())
    }
}
