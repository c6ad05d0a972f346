use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per job. Writers to the same job queue up; jobs never contend.
#[derive(Default)]
pub struct JobLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, job_id: Uuid) -> JobLockGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(job_id).or_default())
        };
        let guard = lock.lock_owned().await;
        JobLockGuard {
            owner: self,
            job_id,
            guard: Some(guard),
        }
    }

    /// Number of jobs with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, job_id: Uuid) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map holds the mutex once nobody owns or awaits it.
        if locks
            .get(&job_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&job_id);
        }
    }
}

pub struct JobLockGuard<'a> {
    owner: &'a JobLocks,
    job_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for JobLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.owner.release(self.job_id);
    }
}
