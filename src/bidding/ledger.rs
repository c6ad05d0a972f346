//! Bid ledger
//! Append-only record of the bids placed on one job. The engine loads one ledger per job,
//! applies a single operation and commits the bids it touched.
// region:    --- Imports
use super::model::{Bid, BidOffer, BidStatus, Job, JobStatus, Urgency};
use super::window::{self, BiddingRules};
use crate::error::BetError;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Offer Validation
/// Check an offer against the job's urgency rules. The window itself is checked by the caller.
pub fn validate_offer(job: &Job, offer: &BidOffer) -> Result<(), BetError> {
    if offer.bid_amount <= 0 {
        return Err(BetError::Validation(
            "bid amount must be greater than zero".to_string(),
        ));
    }

    if matches!(offer.estimated_duration_minutes, Some(minutes) if minutes <= 0) {
        return Err(BetError::Validation(
            "estimated duration must be greater than zero".to_string(),
        ));
    }

    if job.urgency == Urgency::Normal {
        if offer.estimated_duration_minutes.is_none() {
            return Err(BetError::Validation(
                "estimated duration is required for normal jobs".to_string(),
            ));
        }
        match offer.selected_time_slot.as_deref() {
            None => {
                return Err(BetError::Validation(
                    "a time slot is required for normal jobs".to_string(),
                ))
            }
            Some(slot) if !job.preferred_time_slots.iter().any(|s| s == slot) => {
                return Err(BetError::Validation(format!(
                    "time slot {slot} is not one of the client's preferred slots"
                )))
            }
            Some(_) => {}
        }
    }

    if offer.distance_km > job.service_radius_km {
        return Err(BetError::Eligibility(format!(
            "distance {:.1} km exceeds the {:.0} km service radius",
            offer.distance_km, job.service_radius_km
        )));
    }

    if let Some(required) = BiddingRules::for_urgency(job.urgency).required_eta_minutes {
        match offer.eta_minutes {
            Some(eta) if eta <= required => {}
            Some(eta) => {
                return Err(BetError::Eligibility(format!(
                    "ETA of {eta} minutes exceeds the {required} minute limit"
                )))
            }
            None => {
                return Err(BetError::Eligibility(
                    "an ETA is required for urgent jobs".to_string(),
                ))
            }
        }
    }

    Ok(())
}
// endregion: --- Offer Validation

// region:    --- Bid Ledger
#[derive(Debug, Clone)]
pub struct BidLedger {
    job_id: Uuid,
    bids: Vec<Bid>,
    touched: Vec<Uuid>,
}

impl BidLedger {
    pub fn new(job_id: Uuid, bids: Vec<Bid>) -> Self {
        Self {
            job_id,
            bids,
            touched: Vec::new(),
        }
    }

    /// All bids, insertion order.
    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn get(&self, bid_id: Uuid) -> Option<&Bid> {
        self.bids.iter().find(|bid| bid.id == bid_id)
    }

    pub fn submitted(&self) -> impl Iterator<Item = &Bid> {
        self.bids
            .iter()
            .filter(|bid| bid.status == BidStatus::Submitted)
    }

    /// Bids created or changed since the ledger was loaded.
    pub fn touched(&self) -> Vec<Bid> {
        self.bids
            .iter()
            .filter(|bid| self.touched.contains(&bid.id))
            .cloned()
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.touched.is_empty()
    }

    fn touch(&mut self, bid_id: Uuid) {
        if !self.touched.contains(&bid_id) {
            self.touched.push(bid_id);
        }
    }

    /// Place a bid. A plumber keeps at most one live bid per job: resubmitting
    /// overwrites the previous submitted bid in place.
    pub fn submit(
        &mut self,
        job: &Job,
        offer: BidOffer,
        at: DateTime<Utc>,
    ) -> Result<Bid, BetError> {
        if !window::is_open(job, at) {
            return Err(BetError::JobNotActive(job.id));
        }
        validate_offer(job, &offer)?;

        // Urgent jobs are dispatched immediately, the slot is meaningless there.
        let selected_time_slot = match job.urgency {
            Urgency::Urgent => None,
            _ => offer.selected_time_slot,
        };

        let existing = self
            .bids
            .iter()
            .position(|bid| bid.plumber_id == offer.plumber_id && bid.status == BidStatus::Submitted);

        let bid = match existing {
            Some(index) => {
                let bid = &mut self.bids[index];
                bid.bid_amount = offer.bid_amount;
                bid.estimated_duration_minutes = offer.estimated_duration_minutes;
                bid.selected_time_slot = selected_time_slot;
                bid.message = offer.message;
                bid.submitted_at = at;
                bid.distance_km = offer.distance_km;
                bid.eta_minutes = offer.eta_minutes;
                bid.clone()
            }
            None => {
                let bid = Bid {
                    id: Uuid::new_v4(),
                    job_id: self.job_id,
                    plumber_id: offer.plumber_id,
                    bid_amount: offer.bid_amount,
                    estimated_duration_minutes: offer.estimated_duration_minutes,
                    selected_time_slot,
                    message: offer.message,
                    status: BidStatus::Submitted,
                    submitted_at: at,
                    distance_km: offer.distance_km,
                    eta_minutes: offer.eta_minutes,
                    created_at: at,
                };
                self.bids.push(bid.clone());
                bid
            }
        };

        self.touch(bid.id);
        Ok(bid)
    }

    pub fn withdraw(&mut self, job: &Job, bid_id: Uuid) -> Result<Bid, BetError> {
        if job.status != JobStatus::InBet {
            return Err(BetError::JobNotActive(job.id));
        }
        let bid = self
            .bids
            .iter_mut()
            .find(|bid| bid.id == bid_id)
            .ok_or(BetError::BidNotFound(bid_id))?;
        if bid.status != BidStatus::Submitted {
            return Err(BetError::InvalidState(format!(
                "bid {bid_id} is {} and cannot be withdrawn",
                bid.status
            )));
        }

        bid.status = BidStatus::Withdrawn;
        let bid = bid.clone();
        self.touch(bid_id);
        Ok(bid)
    }

    /// Mark `bid_id` accepted and reject every other bid of the job, withdrawn ones included.
    pub fn accept(&mut self, job: &Job, bid_id: Uuid) -> Result<Bid, BetError> {
        if job.status != JobStatus::InBet {
            return Err(BetError::JobNotActive(job.id));
        }
        let index = self
            .bids
            .iter()
            .position(|bid| bid.id == bid_id && bid.status == BidStatus::Submitted)
            .ok_or(BetError::BidNotFound(bid_id))?;

        let mut changed = Vec::new();
        for (i, bid) in self.bids.iter_mut().enumerate() {
            if i == index {
                bid.status = BidStatus::Accepted;
                changed.push(bid.id);
            } else if bid.status != BidStatus::Rejected {
                bid.status = BidStatus::Rejected;
                changed.push(bid.id);
            }
        }
        for id in changed {
            self.touch(id);
        }

        Ok(self.bids[index].clone())
    }

    /// Reject every bid still in `submitted`; returns how many were closed out.
    pub fn reject_outstanding(&mut self) -> usize {
        let mut changed = Vec::new();
        for bid in self.bids.iter_mut() {
            if bid.status == BidStatus::Submitted {
                bid.status = BidStatus::Rejected;
                changed.push(bid.id);
            }
        }
        let count = changed.len();
        for id in changed {
            self.touch(id);
        }
        count
    }

    /// Submitted bids, best first.
    pub fn ranked(&self, urgency: Urgency) -> Vec<&Bid> {
        let mut bids: Vec<&Bid> = self.submitted().collect();
        bids.sort_by(|a, b| compare_bids(urgency, a, b));
        bids
    }
}

/// Urgent jobs rank by arrival time first; everything else by price.
pub fn compare_bids(urgency: Urgency, a: &Bid, b: &Bid) -> Ordering {
    let by_price = a
        .bid_amount
        .cmp(&b.bid_amount)
        .then(a.submitted_at.cmp(&b.submitted_at));
    match urgency {
        Urgency::Urgent => {
            let eta_a = a.eta_minutes.unwrap_or(i32::MAX);
            let eta_b = b.eta_minutes.unwrap_or(i32::MAX);
            eta_a.cmp(&eta_b).then(by_price)
        }
        Urgency::Normal | Urgency::Quote => by_price,
    }
}
// endregion: --- Bid Ledger
