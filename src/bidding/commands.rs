/// Request payloads accepted by the engine and the HTTP layer
/// 1. review queue: approve / reject
/// 2. bidding: submit bid, close bidding
/// 3. payment collaborator: deposit status update
/// 4. dispatch follow-up: arrival report for penalty assessment
// region:    --- Imports
use super::model::DepositStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Commands
/// Admin approval of a job waiting in the review queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveJobCommand {
    pub admin_id: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Admin rejection; `reason` must be non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectJobCommand {
    pub admin_id: String,
    pub reason: String,
}

/// Early closure of an active bidding window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseBiddingCommand {
    pub admin_id: String,
}

/// Pre-authorization status reported by the payment collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDepositCommand {
    pub status: DepositStatus,
}

/// Winner arrival report; `arrived_at` is absent while the plumber has not shown up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessArrivalCommand {
    pub expected_arrival: DateTime<Utc>,
    #[serde(default)]
    pub arrived_at: Option<DateTime<Utc>>,
    /// The winner called the job off instead of showing up.
    #[serde(default)]
    pub winner_cancelled: bool,
}
// endregion: --- Commands
