// region:    --- Imports
use crate::bidding::model::{Bid, BidStatus, Job, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod postgres;
pub mod queries;

pub use postgres::{DatabaseManager, PostgresJobStore};

// endregion: --- Imports

// region:    --- Job Store Trait
/// Persistence boundary of the engine: jobs and their bids, keyed by id.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store a brand new job; fails with `Duplicate` if the id exists.
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Jobs in `status`, optionally only those whose window ends at or before the instant.
    async fn jobs_by_status(
        &self,
        status: JobStatus,
        ending_at_or_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Job>, StoreError>;

    async fn get_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, StoreError>;

    /// All bids of a job in insertion order.
    async fn bids_for_job(&self, job_id: Uuid) -> Result<Vec<Bid>, StoreError>;

    /// Atomically write `job` and upsert `bids`, provided the stored job still carries
    /// `expected_version`. `job.version` is the new version.
    async fn commit(
        &self,
        job: &Job,
        expected_version: i64,
        bids: &[Bid],
    ) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("version conflict")]
    VersionConflict,
    #[error("record already exists")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}
// endregion: --- Job Store Trait

// region:    --- In-Memory Store
/// Process-local store used when no database is configured, and by tests.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
    bids: RwLock<HashMap<Uuid, Vec<Bid>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate);
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn jobs_by_status(
        &self,
        status: JobStatus,
        ending_at_or_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<Job> = jobs
            .values()
            .filter(|job| job.status == status)
            .filter(|job| match ending_at_or_before {
                Some(limit) => job.bidding_end_time.is_some_and(|end| end <= limit),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by_key(|job| (job.bidding_end_time, job.created_at));
        Ok(matching)
    }

    async fn get_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, StoreError> {
        let bids = self.bids.read().await;
        Ok(bids
            .values()
            .flat_map(|job_bids| job_bids.iter())
            .find(|bid| bid.id == bid_id)
            .cloned())
    }

    async fn bids_for_job(&self, job_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        Ok(self
            .bids
            .read()
            .await
            .get(&job_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit(
        &self,
        job: &Job,
        expected_version: i64,
        bids: &[Bid],
    ) -> Result<(), StoreError> {
        // Lock order: jobs, then bids.
        let mut jobs = self.jobs.write().await;
        let mut all_bids = self.bids.write().await;

        match jobs.get(&job.id) {
            Some(stored) if stored.version == expected_version => {}
            Some(_) => return Err(StoreError::VersionConflict),
            None => return Err(StoreError::Corrupt(format!("job {} missing", job.id))),
        }

        // One submitted bid per plumber, judged on the statuses this commit leaves behind.
        let job_bids = all_bids.entry(job.id).or_default();
        let status_after = |other: &Bid| {
            bids.iter()
                .find(|bid| bid.id == other.id)
                .unwrap_or(other)
                .status
        };
        for bid in bids {
            if bid.status == BidStatus::Submitted
                && job_bids.iter().any(|other| {
                    other.id != bid.id
                        && other.plumber_id == bid.plumber_id
                        && status_after(other) == BidStatus::Submitted
                })
            {
                return Err(StoreError::Duplicate);
            }
        }
        for bid in bids {
            match job_bids.iter_mut().find(|stored| stored.id == bid.id) {
                Some(stored) => *stored = bid.clone(),
                None => job_bids.push(bid.clone()),
            }
        }

        jobs.insert(job.id, job.clone());
        Ok(())
    }
}
// endregion: --- In-Memory Store
