//! Bidding engine
//! Drives a job from review through bidding to resolution. Every write to a job runs under
//! that job's lock and is committed with an optimistic version check, so concurrent
//! acceptances resolve to exactly one winner even across processes.
// region:    --- Imports
use crate::bidding::commands::{
    ApproveJobCommand, AssessArrivalCommand, CloseBiddingCommand, RejectJobCommand,
    UpdateDepositCommand,
};
use crate::bidding::ledger::BidLedger;
use crate::bidding::model::{Bid, BidOffer, Job, JobDraft, JobStatus};
use crate::bidding::policy::{self, ArrivalAssessment, Resolution};
use crate::bidding::window;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::BetError;
use crate::events::{BetEvent, EventEnvelope, EventPublisher};
use crate::intake;
use crate::store::{JobStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

mod locks;

pub use locks::{JobLockGuard, JobLocks};

// endregion: --- Imports

// Reload-and-reapply attempts after a version conflict
const MAX_RETRIES: usize = 5;

// region:    --- Job Context
/// A job and its ledger loaded for one operation, plus the events it produced.
pub struct JobContext {
    pub job: Job,
    pub ledger: BidLedger,
    job_dirty: bool,
    events: Vec<BetEvent>,
}

impl JobContext {
    fn new(job: Job, bids: Vec<Bid>) -> Self {
        let ledger = BidLedger::new(job.id, bids);
        Self {
            job,
            ledger,
            job_dirty: false,
            events: Vec::new(),
        }
    }

    fn is_dirty(&self) -> bool {
        self.job_dirty || self.ledger.is_dirty()
    }

    fn mark_job_dirty(&mut self) {
        self.job_dirty = true;
    }

    fn emit(&mut self, event: BetEvent) {
        self.events.push(event);
    }
}
// endregion: --- Job Context

// region:    --- Bidding Engine
pub struct BiddingEngine {
    store: Arc<dyn JobStore>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    locks: JobLocks,
    config: EngineConfig,
}

impl BiddingEngine {
    pub fn new(
        store: Arc<dyn JobStore>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            locks: JobLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // region:    --- Intake & Review

    /// Register a client submission in the review queue.
    pub async fn submit_job(&self, draft: JobDraft) -> Result<Job, BetError> {
        let now = self.clock.now();
        let job = intake::new_job(draft, Uuid::new_v4(), now);
        self.store.insert_job(&job).await?;
        info!(
            "{:<12} --> job {} submitted ({}) by {}",
            "Engine", job.id, job.urgency, job.client_id
        );

        let event = BetEvent::JobSubmitted {
            job_id: job.id,
            client_id: job.client_id.clone(),
            urgency: job.urgency,
            timestamp: now,
        };
        self.publish(&[event], job.version).await;
        Ok(job)
    }

    pub async fn approve(&self, job_id: Uuid, cmd: ApproveJobCommand) -> Result<Job, BetError> {
        let (_, job) = self
            .with_job(job_id, |ctx, now| {
                intake::approve(&mut ctx.job, &cmd, now)?;
                ctx.mark_job_dirty();
                let bidding_end_time = ctx
                    .job
                    .bidding_end_time
                    .ok_or_else(|| BetError::InvalidState("window not opened".to_string()))?;
                ctx.emit(BetEvent::JobApproved {
                    job_id: ctx.job.id,
                    client_id: ctx.job.client_id.clone(),
                    admin_id: cmd.admin_id.clone(),
                    bidding_end_time,
                    timestamp: now,
                });
                Ok(())
            })
            .await
            .map_err(|e| log_rejected("approve", job_id, e))?;
        Ok(job)
    }

    pub async fn reject(&self, job_id: Uuid, cmd: RejectJobCommand) -> Result<Job, BetError> {
        let (_, job) = self
            .with_job(job_id, |ctx, now| {
                intake::reject(&mut ctx.job, &cmd)?;
                ctx.mark_job_dirty();
                ctx.emit(BetEvent::JobRejected {
                    job_id: ctx.job.id,
                    client_id: ctx.job.client_id.clone(),
                    admin_id: cmd.admin_id.clone(),
                    reason: ctx.job.rejection_reason.clone().unwrap_or_default(),
                    timestamp: now,
                });
                Ok(())
            })
            .await
            .map_err(|e| log_rejected("reject", job_id, e))?;
        Ok(job)
    }

    // endregion: --- Intake & Review

    // region:    --- Bid Ledger

    pub async fn submit_bid(&self, job_id: Uuid, offer: BidOffer) -> Result<Bid, BetError> {
        let (bid, _) = self
            .with_job(job_id, |ctx, now| {
                let bid = ctx.ledger.submit(&ctx.job, offer.clone(), now)?;
                ctx.emit(BetEvent::BidSubmitted {
                    job_id: ctx.job.id,
                    bid_id: bid.id,
                    plumber_id: bid.plumber_id.clone(),
                    bid_amount: bid.bid_amount,
                    timestamp: now,
                });
                Ok(bid)
            })
            .await
            .map_err(|e| log_rejected("submit_bid", job_id, e))?;

        info!(
            "{:<12} --> bid {} from {} on job {}: {}",
            "Engine", bid.id, bid.plumber_id, job_id, bid.bid_amount
        );
        Ok(bid)
    }

    pub async fn withdraw_bid(&self, bid_id: Uuid) -> Result<Bid, BetError> {
        let job_id = self.job_of_bid(bid_id).await?;
        let (bid, _) = self
            .with_job(job_id, |ctx, now| {
                let bid = ctx.ledger.withdraw(&ctx.job, bid_id)?;
                ctx.emit(BetEvent::BidWithdrawn {
                    job_id: ctx.job.id,
                    bid_id,
                    plumber_id: bid.plumber_id.clone(),
                    timestamp: now,
                });
                Ok(bid)
            })
            .await
            .map_err(|e| log_rejected("withdraw_bid", job_id, e))?;
        Ok(bid)
    }

    /// All bids of a job in insertion order.
    pub async fn list_bids(&self, job_id: Uuid) -> Result<Vec<Bid>, BetError> {
        let (bids, _) = self
            .with_job(job_id, |ctx, _| Ok(ctx.ledger.bids().to_vec()))
            .await?;
        Ok(bids)
    }

    /// Submitted bids, best first.
    pub async fn ranked_bids(&self, job_id: Uuid) -> Result<Vec<Bid>, BetError> {
        let (bids, _) = self
            .with_job(job_id, |ctx, _| {
                Ok(ctx
                    .ledger
                    .ranked(ctx.job.urgency)
                    .into_iter()
                    .cloned()
                    .collect())
            })
            .await?;
        Ok(bids)
    }

    // endregion: --- Bid Ledger

    // region:    --- Resolution

    /// Client/admin acceptance: the bid wins and every other live bid is rejected.
    pub async fn accept_bid(&self, bid_id: Uuid) -> Result<Job, BetError> {
        let job_id = self.job_of_bid(bid_id).await?;
        let (_, job) = self
            .with_job(job_id, |ctx, now| {
                let bid = policy::award(&mut ctx.job, &mut ctx.ledger, bid_id, now)?;
                ctx.mark_job_dirty();
                ctx.emit(awarded_event(&ctx.job, &bid, now));
                Ok(())
            })
            .await
            .map_err(|e| log_rejected("accept_bid", job_id, e))?;

        info!(
            "{:<12} --> job {} awarded to {:?}",
            "Engine", job.id, job.winner_id
        );
        Ok(job)
    }

    /// Admin early closure of an active window.
    pub async fn close_bidding(
        &self,
        job_id: Uuid,
        cmd: CloseBiddingCommand,
    ) -> Result<Job, BetError> {
        let auto_award = self.config.auto_award_on_expiry;
        let (_, job) = self
            .with_job(job_id, |ctx, now| {
                if ctx.job.status != JobStatus::InBet {
                    return Err(BetError::JobNotActive(ctx.job.id));
                }
                resolve(ctx, auto_award, now)?;
                Ok(())
            })
            .await
            .map_err(|e| log_rejected("close_bidding", job_id, e))?;

        info!(
            "{:<12} --> job {} closed early by {}: {}",
            "Engine", job_id, cmd.admin_id, job.status
        );
        Ok(job)
    }

    /// Resolve the job if its window has run out; returns the current job either way.
    pub async fn expire_if_needed(&self, job_id: Uuid) -> Result<Job, BetError> {
        let (_, job) = self.with_job(job_id, |_, _| Ok(())).await?;
        Ok(job)
    }

    /// Current state of a job, resolving it first if its window has passed.
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, BetError> {
        self.expire_if_needed(job_id).await
    }

    /// Resolve every `in_bet` job whose window has ended. Returns how many were resolved.
    pub async fn sweep_expired(&self) -> Result<usize, BetError> {
        let now = self.clock.now();
        let due = self
            .store
            .jobs_by_status(JobStatus::InBet, Some(now))
            .await?;

        let mut resolved = 0;
        for job in due {
            match self.expire_if_needed(job.id).await {
                Ok(job) if job.status != JobStatus::InBet => resolved += 1,
                Ok(_) => {}
                Err(e) => error!(
                    "{:<12} --> could not resolve job {}: {}",
                    "Engine", job.id, e
                ),
            }
        }

        if resolved > 0 {
            info!("{:<12} --> sweep resolved {} job(s)", "Engine", resolved);
        }
        Ok(resolved)
    }

    // endregion: --- Resolution

    /// Record the payment collaborator's pre-authorization state.
    pub async fn update_deposit(
        &self,
        job_id: Uuid,
        cmd: UpdateDepositCommand,
    ) -> Result<Job, BetError> {
        let (_, job) = self
            .with_job(job_id, |ctx, _| {
                let current = ctx.job.deposit_status;
                if current == cmd.status {
                    return Ok(());
                }
                if !current.can_transition_to(cmd.status) {
                    return Err(BetError::InvalidState(format!(
                        "deposit cannot move from {current} to {}",
                        cmd.status
                    )));
                }
                ctx.job.deposit_status = cmd.status;
                ctx.mark_job_dirty();
                Ok(())
            })
            .await
            .map_err(|e| log_rejected("update_deposit", job_id, e))?;
        Ok(job)
    }

    /// Advisory penalty assessment of the winner's arrival. Job state is left untouched.
    pub async fn assess_arrival(
        &self,
        job_id: Uuid,
        cmd: AssessArrivalCommand,
    ) -> Result<ArrivalAssessment, BetError> {
        let (assessment, _) = self
            .with_job(job_id, |ctx, now| {
                if ctx.job.status != JobStatus::Awarded {
                    return Err(BetError::InvalidState(format!(
                        "job {} is {} and has no winner to assess",
                        ctx.job.id, ctx.job.status
                    )));
                }
                let mut assessment =
                    policy::assess_arrival(&ctx.job, cmd.expected_arrival, cmd.arrived_at, now);
                // A cancellation replaces the no-show charge, it does not add to it.
                if cmd.winner_cancelled {
                    assessment.penalties = policy::cancellation_penalty(&ctx.job)
                        .into_iter()
                        .collect();
                }
                Ok(assessment)
            })
            .await
            .map_err(|e| log_rejected("assess_arrival", job_id, e))?;

        if assessment.urgent_deadline_missed {
            warn!(
                "{:<12} --> urgent job {} missed its arrival window",
                "Engine", job_id
            );
        }
        Ok(assessment)
    }

    // region:    --- Internals

    async fn job_of_bid(&self, bid_id: Uuid) -> Result<Uuid, BetError> {
        self.store
            .get_bid(bid_id)
            .await?
            .map(|bid| bid.job_id)
            .ok_or(BetError::BidNotFound(bid_id))
    }

    /// Load, lazily expire, apply `op`, commit, publish.
    ///
    /// `op` must validate before mutating: when it fails, only a lazy expiry (if one
    /// happened) is committed. Returns `op`'s value with the job as committed.
    async fn with_job<T, F>(&self, job_id: Uuid, mut op: F) -> Result<(T, Job), BetError>
    where
        F: FnMut(&mut JobContext, DateTime<Utc>) -> Result<T, BetError> + Send,
        T: Send,
    {
        let _guard = self.locks.acquire(job_id).await;

        for attempt in 1..=MAX_RETRIES {
            let now = self.clock.now();
            let job = self
                .store
                .get_job(job_id)
                .await?
                .ok_or(BetError::JobNotFound(job_id))?;
            let bids = self.store.bids_for_job(job_id).await?;
            let mut ctx = JobContext::new(job, bids);

            if window::needs_expiry(&ctx.job, now) {
                resolve(&mut ctx, self.config.auto_award_on_expiry, now)?;
            }

            let outcome = op(&mut ctx, now);
            if !ctx.is_dirty() {
                return outcome.map(|value| (value, ctx.job));
            }

            let expected = ctx.job.version;
            ctx.job.version = expected + 1;
            let touched = ctx.ledger.touched();
            match self.store.commit(&ctx.job, expected, &touched).await {
                Ok(()) => {
                    self.publish(&ctx.events, ctx.job.version).await;
                    return outcome.map(|value| (value, ctx.job));
                }
                Err(StoreError::VersionConflict | StoreError::Duplicate) => {
                    warn!(
                        "{:<12} --> version conflict on job {} (attempt {}/{}), retrying",
                        "Engine", job_id, attempt, MAX_RETRIES
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(BetError::Contention(job_id))
    }

    async fn publish(&self, events: &[BetEvent], version: i64) {
        for event in events {
            let envelope = match EventEnvelope::wrap(event, version) {
                Ok(envelope) => envelope,
                Err(e) => {
                    error!("{:<12} --> cannot encode {}: {}", "Engine", event.event_type(), e);
                    continue;
                }
            };
            if let Err(e) = self.publisher.publish(&envelope).await {
                error!(
                    "{:<12} --> publish {} for job {} failed: {}",
                    "Engine", envelope.event_type, envelope.aggregate_id, e
                );
            } else {
                debug!("{:<12} --> published {}", "Engine", envelope.event_type);
            }
        }
    }

    // endregion: --- Internals
}

fn resolve(ctx: &mut JobContext, auto_award: bool, now: DateTime<Utc>) -> Result<(), BetError> {
    let resolution = policy::resolve_closed_window(&mut ctx.job, &mut ctx.ledger, auto_award, now)?;
    ctx.mark_job_dirty();
    let event = match resolution {
        Resolution::Awarded(bid) => awarded_event(&ctx.job, &bid, now),
        Resolution::Expired => {
            info!("{:<12} --> job {} expired", "Engine", ctx.job.id);
            BetEvent::JobExpired {
                job_id: ctx.job.id,
                client_id: ctx.job.client_id.clone(),
                timestamp: now,
            }
        }
    };
    ctx.emit(event);
    Ok(())
}

fn awarded_event(job: &Job, bid: &Bid, now: DateTime<Utc>) -> BetEvent {
    BetEvent::JobAwarded {
        job_id: job.id,
        client_id: job.client_id.clone(),
        winner_id: bid.plumber_id.clone(),
        bid_id: bid.id,
        amount: bid.bid_amount,
        timestamp: now,
    }
}

fn log_rejected(operation: &str, job_id: Uuid, e: BetError) -> BetError {
    match &e {
        BetError::Store(_) | BetError::Contention(_) => {
            error!("{:<12} --> {} on job {} failed: {}", "Engine", operation, job_id, e)
        }
        _ => warn!("{:<12} --> {} on job {} rejected: {}", "Engine", operation, job_id, e),
    }
    e
}
// endregion: --- Bidding Engine
