// region:    --- Imports
use super::{queries, JobStore, StoreError};
use crate::bidding::model::{Bid, Job, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Database Manager
pub struct DatabaseManager {
    pub pool: Arc<PgPool>,
}

impl DatabaseManager {
    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Run `f` inside a transaction; commits on `Ok`, rolls back on `Err`.
    /// `PostgresJobStore::commit` runs the versioned job update and the bid upserts through
    /// here, so a version conflict or a duplicate live bid leaves nothing behind.
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: for<'c> FnOnce(
            &'c mut sqlx::Transaction<'_, Postgres>,
        ) -> Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'c>>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;
        let result = f(&mut tx).await;
        match result {
            Ok(r) => {
                tx.commit().await?;
                Ok(r)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Create tables and indexes if missing.
    pub async fn initialize_database(&self) -> Result<(), sqlx::Error> {
        let create_schema_sql = include_str!("../../sql/01-create-schema.sql");
        self.execute_multi_query(create_schema_sql).await?;
        info!("{:<12} --> schema ready", "Store");
        Ok(())
    }

    async fn execute_multi_query(&self, sql: &str) -> Result<(), sqlx::Error> {
        for query in sql.split(';') {
            let query = query.trim();
            if !query.is_empty() {
                sqlx::query(query).execute(&*self.pool).await?;
            }
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
// endregion: --- Database Manager

// region:    --- Row Mapping
fn parse_label<T>(row: &PgRow, column: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let label: String = row.try_get(column)?;
    label
        .parse()
        .map_err(|e: T::Err| StoreError::Corrupt(format!("{column}: {e}")))
}

fn job_from_row(row: &PgRow) -> Result<Job, StoreError> {
    Ok(Job {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        description: row.try_get("description")?,
        address: row.try_get("address")?,
        photo_urls: row.try_get("photo_urls")?,
        urgency: parse_label(row, "urgency")?,
        status: parse_label(row, "status")?,
        preferred_time_slots: row.try_get("preferred_time_slots")?,
        bidding_start_time: row.try_get("bidding_start_time")?,
        bidding_end_time: row.try_get("bidding_end_time")?,
        suggested_price: row.try_get("suggested_price")?,
        estimated_duration_minutes: row.try_get("estimated_duration_minutes")?,
        service_radius_km: row.try_get("service_radius_km")?,
        winner_id: row.try_get("winner_id")?,
        winning_bid_id: row.try_get("winning_bid_id")?,
        winning_amount: row.try_get("winning_amount")?,
        awarded_at: row.try_get("awarded_at")?,
        deposit_amount: row.try_get("deposit_amount")?,
        deposit_status: parse_label(row, "deposit_status")?,
        reviewed_by: row.try_get("reviewed_by")?,
        review_note: row.try_get("review_note")?,
        rejection_reason: row.try_get("rejection_reason")?,
        created_at: row.try_get("created_at")?,
        version: row.try_get("version")?,
    })
}

fn bid_from_row(row: &PgRow) -> Result<Bid, StoreError> {
    Ok(Bid {
        id: row.try_get("id")?,
        job_id: row.try_get("job_id")?,
        plumber_id: row.try_get("plumber_id")?,
        bid_amount: row.try_get("bid_amount")?,
        estimated_duration_minutes: row.try_get("estimated_duration_minutes")?,
        selected_time_slot: row.try_get("selected_time_slot")?,
        message: row.try_get("message")?,
        status: parse_label(row, "status")?,
        submitted_at: row.try_get("submitted_at")?,
        distance_km: row.try_get("distance_km")?,
        eta_minutes: row.try_get("eta_minutes")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Binds $1..$24 in column order shared by INSERT_JOB and UPDATE_JOB.
fn bind_job<'q>(
    query: Query<'q, Postgres, PgArguments>,
    job: &'q Job,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(job.id)
        .bind(&job.client_id)
        .bind(&job.description)
        .bind(&job.address)
        .bind(&job.photo_urls)
        .bind(job.urgency.as_str())
        .bind(job.status.as_str())
        .bind(&job.preferred_time_slots)
        .bind(job.bidding_start_time)
        .bind(job.bidding_end_time)
        .bind(job.suggested_price)
        .bind(job.estimated_duration_minutes)
        .bind(job.service_radius_km)
        .bind(&job.winner_id)
        .bind(job.winning_bid_id)
        .bind(job.winning_amount)
        .bind(job.awarded_at)
        .bind(job.deposit_amount)
        .bind(job.deposit_status.as_str())
        .bind(&job.reviewed_by)
        .bind(&job.review_note)
        .bind(&job.rejection_reason)
        .bind(job.created_at)
        .bind(job.version)
}

fn bind_bid<'q>(
    query: Query<'q, Postgres, PgArguments>,
    bid: &'q Bid,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(bid.id)
        .bind(bid.job_id)
        .bind(&bid.plumber_id)
        .bind(bid.bid_amount)
        .bind(bid.estimated_duration_minutes)
        .bind(&bid.selected_time_slot)
        .bind(&bid.message)
        .bind(bid.status.as_str())
        .bind(bid.submitted_at)
        .bind(bid.distance_km)
        .bind(bid.eta_minutes)
        .bind(bid.created_at)
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        _ => StoreError::Database(e),
    }
}
// endregion: --- Row Mapping

// region:    --- Postgres Job Store
pub struct PostgresJobStore {
    db: Arc<DatabaseManager>,
}

impl PostgresJobStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        bind_job(sqlx::query(queries::INSERT_JOB), job)
            .execute(self.db.pool())
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(queries::GET_JOB)
            .bind(job_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn jobs_by_status(
        &self,
        status: JobStatus,
        ending_at_or_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(queries::GET_JOBS_BY_STATUS)
            .bind(status.as_str())
            .bind(ending_at_or_before)
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(job_from_row).collect()
    }

    async fn get_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, StoreError> {
        let row = sqlx::query(queries::GET_BID)
            .bind(bid_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(bid_from_row).transpose()
    }

    async fn bids_for_job(&self, job_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        let rows = sqlx::query(queries::GET_JOB_BIDS)
            .bind(job_id)
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(bid_from_row).collect()
    }

    async fn commit(
        &self,
        job: &Job,
        expected_version: i64,
        bids: &[Bid],
    ) -> Result<(), StoreError> {
        let job = job.clone();
        let bids = bids.to_vec();
        let job_id = job.id;

        let result = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let updated = bind_job(sqlx::query(queries::UPDATE_JOB), &job)
                        .bind(expected_version)
                        .execute(&mut **tx)
                        .await?;
                    if updated.rows_affected() == 0 {
                        return Err(StoreError::VersionConflict);
                    }

                    for bid in &bids {
                        bind_bid(sqlx::query(queries::UPSERT_BID), bid)
                            .execute(&mut **tx)
                            .await
                            .map_err(map_write_error)?;
                    }
                    Ok(())
                })
            })
            .await;

        if let Err(StoreError::Database(e)) = &result {
            error!("{:<12} --> commit failed for job {}: {:?}", "Store", job_id, e);
        }
        result
    }
}
// endregion: --- Postgres Job Store
