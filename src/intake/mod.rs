//! Job intake & review queue
//! Submitted jobs wait in `pending_review` until an administrator approves them into the
//! marketplace or rejects them outright.
// region:    --- Imports
use crate::bidding::commands::{ApproveJobCommand, RejectJobCommand};
use crate::bidding::model::{DepositStatus, Job, JobDraft, JobStatus};
use crate::bidding::window::{self, BiddingRules};
use crate::error::BetError;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Intake
/// Build a `pending_review` job from a client submission.
///
/// Required-field checks belong to the intake form; the only thing decided here is the
/// service radius, which never exceeds the urgency maximum.
pub fn new_job(draft: JobDraft, id: Uuid, now: DateTime<Utc>) -> Job {
    let max_radius = BiddingRules::for_urgency(draft.urgency).max_radius_km;
    let service_radius_km = draft
        .service_radius_km
        .filter(|radius| *radius > 0.0)
        .map_or(max_radius, |radius| radius.min(max_radius));

    Job {
        id,
        client_id: draft.client_id,
        description: draft.description,
        address: draft.address,
        photo_urls: draft.photo_urls,
        urgency: draft.urgency,
        status: JobStatus::PendingReview,
        preferred_time_slots: draft.preferred_time_slots,
        bidding_start_time: None,
        bidding_end_time: None,
        suggested_price: draft.suggested_price,
        estimated_duration_minutes: draft.estimated_duration_minutes,
        service_radius_km,
        winner_id: None,
        winning_bid_id: None,
        winning_amount: None,
        awarded_at: None,
        deposit_amount: draft.deposit_amount,
        deposit_status: DepositStatus::Pending,
        reviewed_by: None,
        review_note: None,
        rejection_reason: None,
        created_at: now,
        version: 0,
    }
}

fn ensure_pending(job: &Job) -> Result<(), BetError> {
    if job.status != JobStatus::PendingReview {
        return Err(BetError::InvalidState(format!(
            "job {} is {}, not pending_review",
            job.id, job.status
        )));
    }
    Ok(())
}

/// Approve a pending job and open its bidding window at `now`.
pub fn approve(job: &mut Job, cmd: &ApproveJobCommand, now: DateTime<Utc>) -> Result<(), BetError> {
    ensure_pending(job)?;

    job.reviewed_by = Some(cmd.admin_id.clone());
    job.review_note = cmd.note.clone();
    window::activate(job, now);

    info!(
        "{:<12} --> job {} approved by {}, bidding until {:?}",
        "Intake", job.id, cmd.admin_id, job.bidding_end_time
    );
    Ok(())
}

/// Reject a pending job; it never reaches the marketplace.
pub fn reject(job: &mut Job, cmd: &RejectJobCommand) -> Result<(), BetError> {
    let reason = cmd.reason.trim();
    if reason.is_empty() {
        return Err(BetError::Validation(
            "a rejection reason is required".to_string(),
        ));
    }
    ensure_pending(job)?;

    job.reviewed_by = Some(cmd.admin_id.clone());
    job.rejection_reason = Some(reason.to_string());
    job.status = JobStatus::Cancelled;

    info!(
        "{:<12} --> job {} rejected by {}: {}",
        "Intake", job.id, cmd.admin_id, reason
    );
    Ok(())
}
// endregion: --- Intake
