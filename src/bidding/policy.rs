//! Resolution & penalty policy
//! Picks the outcome when a bidding window closes and publishes the penalty schedule that
//! downstream billing enforces.
// region:    --- Imports
use super::ledger::BidLedger;
use super::model::{Bid, Job, JobStatus, Urgency};
use crate::error::BetError;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Resolution
/// Outcome of resolving a job.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Awarded(Bid),
    Expired,
}

/// Accept `bid_id` as the winner and move the job to `awarded`.
pub fn award(
    job: &mut Job,
    ledger: &mut BidLedger,
    bid_id: Uuid,
    at: DateTime<Utc>,
) -> Result<Bid, BetError> {
    let bid = ledger.accept(job, bid_id)?;
    job.status = JobStatus::Awarded;
    job.winner_id = Some(bid.plumber_id.clone());
    job.winning_bid_id = Some(bid.id);
    job.winning_amount = Some(bid.bid_amount);
    job.awarded_at = Some(at);
    Ok(bid)
}

/// Resolve a job whose window closed without a client acceptance.
///
/// Without auto-award the job expires and outstanding bids are rejected. With auto-award
/// the top-ranked submitted bid wins; an empty ledger always expires.
pub fn resolve_closed_window(
    job: &mut Job,
    ledger: &mut BidLedger,
    auto_award: bool,
    at: DateTime<Utc>,
) -> Result<Resolution, BetError> {
    if job.status != JobStatus::InBet {
        return Err(BetError::JobNotActive(job.id));
    }

    let best = if auto_award {
        ledger.ranked(job.urgency).first().map(|bid| bid.id)
    } else {
        None
    };

    match best {
        Some(bid_id) => award(job, ledger, bid_id, at).map(Resolution::Awarded),
        None => {
            ledger.reject_outstanding();
            job.status = JobStatus::Expired;
            job.winner_id = None;
            job.winning_bid_id = None;
            job.winning_amount = None;
            Ok(Resolution::Expired)
        }
    }
}
// endregion: --- Resolution

// region:    --- Penalty Schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    NoShow,
    CancellationAfterAcceptance,
    LateArrival,
}

/// Amounts in cents (CAD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PenaltySchedule {
    pub no_show_cents: i64,
    pub cancellation_after_acceptance_cents: i64,
    pub late_arrival_cents: i64,
    pub late_grace_minutes: i64,
    pub urgent_arrival_window_minutes: i64,
}

pub const PENALTY_SCHEDULE: PenaltySchedule = PenaltySchedule {
    no_show_cents: 100_00,
    cancellation_after_acceptance_cents: 50_00,
    late_arrival_cents: 25_00,
    late_grace_minutes: 15,
    urgent_arrival_window_minutes: 60,
};

impl PenaltyKind {
    pub fn amount_cents(self) -> i64 {
        match self {
            PenaltyKind::NoShow => PENALTY_SCHEDULE.no_show_cents,
            PenaltyKind::CancellationAfterAcceptance => {
                PENALTY_SCHEDULE.cancellation_after_acceptance_cents
            }
            PenaltyKind::LateArrival => PENALTY_SCHEDULE.late_arrival_cents,
        }
    }
}

/// Penalty owed when the winning plumber cancels; nothing is owed before acceptance.
pub fn cancellation_penalty(job: &Job) -> Option<PenaltyKind> {
    (job.status == JobStatus::Awarded).then_some(PenaltyKind::CancellationAfterAcceptance)
}

/// Advisory arrival assessment handed to billing. Never changes job state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalAssessment {
    pub penalties: Vec<PenaltyKind>,
    pub minutes_late: i64,
    /// Urgent job not reached within the arrival window after acceptance.
    pub urgent_deadline_missed: bool,
}

impl ArrivalAssessment {
    pub fn total_cents(&self) -> i64 {
        self.penalties.iter().map(|kind| kind.amount_cents()).sum()
    }
}

/// Assess the winner's arrival against `expected_arrival`.
///
/// `arrived_at == None` is a no-show once the grace period has passed at `now`.
pub fn assess_arrival(
    job: &Job,
    expected_arrival: DateTime<Utc>,
    arrived_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ArrivalAssessment {
    let grace = Duration::minutes(PENALTY_SCHEDULE.late_grace_minutes);
    let mut penalties = Vec::new();

    let minutes_late = match arrived_at {
        Some(arrived) => {
            let late = arrived - expected_arrival;
            if late > grace {
                penalties.push(PenaltyKind::LateArrival);
            }
            late.num_minutes().max(0)
        }
        None => {
            if now > expected_arrival + grace {
                penalties.push(PenaltyKind::NoShow);
            }
            (now - expected_arrival).num_minutes().max(0)
        }
    };

    let urgent_deadline_missed = match (job.urgency, job.awarded_at) {
        (Urgency::Urgent, Some(awarded_at)) => {
            let deadline =
                awarded_at + Duration::minutes(PENALTY_SCHEDULE.urgent_arrival_window_minutes);
            arrived_at.unwrap_or(now) > deadline
        }
        _ => false,
    };

    ArrivalAssessment {
        penalties,
        minutes_late,
        urgent_deadline_missed,
    }
}
// endregion: --- Penalty Schedule

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::fixtures::{offer, pending_job};
    use crate::bidding::model::BidStatus;
    use crate::bidding::window;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn closing_empty_window_expires_even_with_auto_award() {
        let mut job = pending_job(Urgency::Urgent);
        window::activate(&mut job, t0());
        let mut ledger = BidLedger::new(job.id, vec![]);

        let outcome =
            resolve_closed_window(&mut job, &mut ledger, true, t0() + Duration::minutes(5))
                .unwrap();

        assert_eq!(outcome, Resolution::Expired);
        assert_eq!(job.status, JobStatus::Expired);
        assert_eq!(job.winner_id, None);
    }

    #[test]
    fn closing_without_auto_award_rejects_outstanding_bids() {
        let mut job = pending_job(Urgency::Normal);
        window::activate(&mut job, t0());
        let mut ledger = BidLedger::new(job.id, vec![]);
        let bid = ledger.submit(&job, offer("plumber-a", 150_00), t0()).unwrap();

        let outcome =
            resolve_closed_window(&mut job, &mut ledger, false, t0() + Duration::hours(2))
                .unwrap();

        assert_eq!(outcome, Resolution::Expired);
        assert_eq!(ledger.get(bid.id).unwrap().status, BidStatus::Rejected);
    }

    #[test]
    fn auto_award_picks_top_ranked_bid() {
        let mut job = pending_job(Urgency::Normal);
        window::activate(&mut job, t0());
        let mut ledger = BidLedger::new(job.id, vec![]);
        ledger.submit(&job, offer("plumber-a", 150_00), t0()).unwrap();
        let cheapest = ledger.submit(&job, offer("plumber-b", 110_00), t0()).unwrap();

        let closed_at = t0() + Duration::hours(2);
        let outcome = resolve_closed_window(&mut job, &mut ledger, true, closed_at).unwrap();

        match outcome {
            Resolution::Awarded(bid) => assert_eq!(bid.id, cheapest.id),
            other => panic!("expected award, got {other:?}"),
        }
        assert_eq!(job.status, JobStatus::Awarded);
        assert_eq!(job.winner_id.as_deref(), Some("plumber-b"));
        assert_eq!(job.winning_amount, Some(110_00));
        assert_eq!(job.awarded_at, Some(closed_at));
    }

    #[test]
    fn penalty_amounts_match_schedule() {
        assert_eq!(PenaltyKind::NoShow.amount_cents(), 100_00);
        assert_eq!(PenaltyKind::CancellationAfterAcceptance.amount_cents(), 50_00);
        assert_eq!(PenaltyKind::LateArrival.amount_cents(), 25_00);
    }

    #[test]
    fn cancellation_only_penalised_after_acceptance() {
        let mut job = pending_job(Urgency::Normal);
        assert_eq!(cancellation_penalty(&job), None);
        job.status = JobStatus::Awarded;
        assert_eq!(
            cancellation_penalty(&job),
            Some(PenaltyKind::CancellationAfterAcceptance)
        );
    }

    #[test]
    fn arrival_within_grace_is_free() {
        let job = pending_job(Urgency::Normal);
        let expected = t0();
        let assessment = assess_arrival(
            &job,
            expected,
            Some(expected + Duration::minutes(15)),
            expected + Duration::hours(1),
        );
        assert!(assessment.penalties.is_empty());
        assert_eq!(assessment.minutes_late, 15);
    }

    #[test]
    fn late_arrival_and_no_show_are_penalised() {
        let job = pending_job(Urgency::Normal);
        let expected = t0();

        let late = assess_arrival(
            &job,
            expected,
            Some(expected + Duration::minutes(16)),
            expected + Duration::hours(1),
        );
        assert_eq!(late.penalties, vec![PenaltyKind::LateArrival]);
        assert_eq!(late.total_cents(), 25_00);

        let waiting = assess_arrival(&job, expected, None, expected + Duration::minutes(10));
        assert!(waiting.penalties.is_empty());

        let no_show = assess_arrival(&job, expected, None, expected + Duration::minutes(40));
        assert_eq!(no_show.penalties, vec![PenaltyKind::NoShow]);
    }

    #[test]
    fn urgent_arrival_window_is_flagged() {
        let mut job = pending_job(Urgency::Urgent);
        job.status = JobStatus::Awarded;
        job.awarded_at = Some(t0());

        let on_time = assess_arrival(&job, t0(), Some(t0() + Duration::minutes(55)), t0());
        assert!(!on_time.urgent_deadline_missed);

        let breach = assess_arrival(
            &job,
            t0() + Duration::minutes(30),
            Some(t0() + Duration::minutes(61)),
            t0() + Duration::minutes(61),
        );
        assert!(breach.urgent_deadline_missed);
        assert_eq!(breach.penalties, vec![PenaltyKind::LateArrival]);
    }
}
