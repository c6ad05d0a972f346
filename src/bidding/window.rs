//! Bidding window controller
//! Owns the timing contract of the active bidding phase: fixed durations per urgency class,
//! the open-window predicate and the expiry predicate the scheduler tick evaluates.
// region:    --- Imports
use super::model::{Job, JobStatus, Urgency};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

// endregion: --- Imports

// region:    --- Bidding Rules
/// Fixed per-urgency rules; not configurable per job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BiddingRules {
    pub window_minutes: i64,
    pub max_radius_km: f64,
    pub required_eta_minutes: Option<i32>,
}

impl BiddingRules {
    pub const URGENT: BiddingRules = BiddingRules {
        window_minutes: 5,
        max_radius_km: 50.0,
        required_eta_minutes: Some(60),
    };

    pub const NORMAL: BiddingRules = BiddingRules {
        window_minutes: 2 * 60,
        max_radius_km: 100.0,
        required_eta_minutes: None,
    };

    pub const QUOTE: BiddingRules = BiddingRules {
        window_minutes: 24 * 60,
        max_radius_km: 100.0,
        required_eta_minutes: None,
    };

    pub fn for_urgency(urgency: Urgency) -> BiddingRules {
        match urgency {
            Urgency::Urgent => Self::URGENT,
            Urgency::Normal => Self::NORMAL,
            Urgency::Quote => Self::QUOTE,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::minutes(self.window_minutes)
    }
}

/// Length of the bidding window for an urgency class.
pub fn window_duration(urgency: Urgency) -> Duration {
    BiddingRules::for_urgency(urgency).window()
}
// endregion: --- Bidding Rules

// region:    --- Window Controller
/// Open the bidding window at `now` and move the job to `in_bet`.
pub fn activate(job: &mut Job, now: DateTime<Utc>) {
    job.bidding_start_time = Some(now);
    job.bidding_end_time = Some(now + window_duration(job.urgency));
    job.status = JobStatus::InBet;
}

/// `true` while the job accepts bids at `at`; the window is half-open `[start, end)`.
pub fn is_open(job: &Job, at: DateTime<Utc>) -> bool {
    match (job.status, job.bidding_start_time, job.bidding_end_time) {
        (JobStatus::InBet, Some(start), Some(end)) => start <= at && at < end,
        _ => false,
    }
}

/// `true` when the job is still `in_bet` but its window has run out at `at`.
pub fn needs_expiry(job: &Job, at: DateTime<Utc>) -> bool {
    job.status == JobStatus::InBet && job.bidding_end_time.is_some_and(|end| at >= end)
}
// endregion: --- Window Controller
