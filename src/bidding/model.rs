use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// region:    --- Enums

/// Urgency class of a service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Urgent,
    Normal,
    Quote,
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    PendingReview,
    InBet,
    Awarded,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Submitted,
    Accepted,
    Rejected,
    Withdrawn,
}

/// Payment pre-authorization state reported by the payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Authorized,
    Captured,
    Failed,
}

impl DepositStatus {
    pub fn can_transition_to(self, next: DepositStatus) -> bool {
        use DepositStatus::*;
        matches!(
            (self, next),
            (Pending, Authorized) | (Pending, Failed) | (Authorized, Captured) | (Authorized, Failed)
        )
    }
}

/// Error returned when a stored label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} label: {label}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub label: String,
}

/// Text labels used in storage and logs, mirroring the serde names.
macro_rules! labelled_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownLabel;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($label => Ok($ty::$variant),)+
                    other => Err(UnknownLabel {
                        kind: $kind,
                        label: other.to_string(),
                    }),
                }
            }
        }
    };
}

labelled_enum!(Urgency, "urgency", {
    Urgent => "URGENT",
    Normal => "NORMAL",
    Quote => "QUOTE",
});

labelled_enum!(JobStatus, "job status", {
    PendingReview => "pending_review",
    InBet => "in_bet",
    Awarded => "awarded",
    Cancelled => "cancelled",
    Expired => "expired",
});

labelled_enum!(BidStatus, "bid status", {
    Submitted => "submitted",
    Accepted => "accepted",
    Rejected => "rejected",
    Withdrawn => "withdrawn",
});

labelled_enum!(DepositStatus, "deposit status", {
    Pending => "pending",
    Authorized => "authorized",
    Captured => "captured",
    Failed => "failed",
});

// endregion: --- Enums

// region:    --- Job

/// Client submission as received from the intake form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDraft {
    pub client_id: String,
    pub description: String,
    pub address: String,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    pub urgency: Urgency,
    #[serde(default)]
    pub preferred_time_slots: Vec<String>,
    #[serde(default)]
    pub suggested_price: Option<i64>,
    #[serde(default)]
    pub estimated_duration_minutes: Option<i32>,
    /// Narrower radius requested by the client; clamped to the urgency maximum.
    #[serde(default)]
    pub service_radius_km: Option<f64>,
    #[serde(default)]
    pub deposit_amount: i64,
}

/// A service request moving through review, bidding and resolution.
///
/// `winner_id` is set iff `status == Awarded`; the bidding window bounds are set iff the
/// job reached `InBet` at some point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub client_id: String,
    pub description: String,
    pub address: String,
    pub photo_urls: Vec<String>,
    pub urgency: Urgency,
    pub status: JobStatus,
    pub preferred_time_slots: Vec<String>,
    pub bidding_start_time: Option<DateTime<Utc>>,
    pub bidding_end_time: Option<DateTime<Utc>>,
    pub suggested_price: Option<i64>,
    pub estimated_duration_minutes: Option<i32>,
    pub service_radius_km: f64,
    pub winner_id: Option<String>,
    pub winning_bid_id: Option<Uuid>,
    pub winning_amount: Option<i64>,
    pub awarded_at: Option<DateTime<Utc>>,
    pub deposit_amount: i64,
    pub deposit_status: DepositStatus,
    pub reviewed_by: Option<String>,
    pub review_note: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every committed change.
    pub version: i64,
}

// endregion: --- Job

// region:    --- Bid

/// Bid payload from a plumber, with the matching collaborator's distance/ETA figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidOffer {
    pub plumber_id: String,
    /// Amount in cents.
    pub bid_amount: i64,
    #[serde(default)]
    pub estimated_duration_minutes: Option<i32>,
    #[serde(default)]
    pub selected_time_slot: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub distance_km: f64,
    #[serde(default)]
    pub eta_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub job_id: Uuid,
    pub plumber_id: String,
    pub bid_amount: i64,
    pub estimated_duration_minutes: Option<i32>,
    pub selected_time_slot: Option<String>,
    pub message: Option<String>,
    pub status: BidStatus,
    pub submitted_at: DateTime<Utc>,
    pub distance_km: f64,
    pub eta_minutes: Option<i32>,
    /// First submission time; resubmissions keep it so listings stay in insertion order.
    pub created_at: DateTime<Utc>,
}

// endregion: --- Bid
