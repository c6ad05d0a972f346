// region:    --- Imports
use crate::bidding::model::Urgency;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Bet Events
/// Outcome events consumed by the notification and billing collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BetEvent {
    #[serde(rename = "job.submitted")]
    JobSubmitted {
        job_id: Uuid,
        client_id: String,
        urgency: Urgency,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "job.approved")]
    JobApproved {
        job_id: Uuid,
        client_id: String,
        admin_id: String,
        bidding_end_time: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "job.rejected")]
    JobRejected {
        job_id: Uuid,
        client_id: String,
        admin_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "bid.submitted")]
    BidSubmitted {
        job_id: Uuid,
        bid_id: Uuid,
        plumber_id: String,
        bid_amount: i64,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "bid.withdrawn")]
    BidWithdrawn {
        job_id: Uuid,
        bid_id: Uuid,
        plumber_id: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "job.awarded")]
    JobAwarded {
        job_id: Uuid,
        client_id: String,
        winner_id: String,
        bid_id: Uuid,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "job.expired")]
    JobExpired {
        job_id: Uuid,
        client_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl BetEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            BetEvent::JobSubmitted { .. } => "job.submitted",
            BetEvent::JobApproved { .. } => "job.approved",
            BetEvent::JobRejected { .. } => "job.rejected",
            BetEvent::BidSubmitted { .. } => "bid.submitted",
            BetEvent::BidWithdrawn { .. } => "bid.withdrawn",
            BetEvent::JobAwarded { .. } => "job.awarded",
            BetEvent::JobExpired { .. } => "job.expired",
        }
    }

    pub fn job_id(&self) -> Uuid {
        match self {
            BetEvent::JobSubmitted { job_id, .. }
            | BetEvent::JobApproved { job_id, .. }
            | BetEvent::JobRejected { job_id, .. }
            | BetEvent::BidSubmitted { job_id, .. }
            | BetEvent::BidWithdrawn { job_id, .. }
            | BetEvent::JobAwarded { job_id, .. }
            | BetEvent::JobExpired { job_id, .. } => *job_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            BetEvent::JobSubmitted { timestamp, .. }
            | BetEvent::JobApproved { timestamp, .. }
            | BetEvent::JobRejected { timestamp, .. }
            | BetEvent::BidSubmitted { timestamp, .. }
            | BetEvent::BidWithdrawn { timestamp, .. }
            | BetEvent::JobAwarded { timestamp, .. }
            | BetEvent::JobExpired { timestamp, .. } => *timestamp,
        }
    }
}

/// Wire envelope published to the broker, keyed by job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    /// Job version the event was committed at.
    pub version: i64,
}

impl EventEnvelope {
    pub fn wrap(event: &BetEvent, version: i64) -> Result<Self, PublishError> {
        Ok(Self {
            aggregate_id: event.job_id(),
            event_type: event.event_type().to_string(),
            data: serde_json::to_value(event)?,
            timestamp: event.timestamp(),
            version,
        })
    }
}
// endregion: --- Bet Events

// region:    --- Event Publisher
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("event transport failed: {0}")]
    Transport(String),
}

/// Publisher that only logs; used when no broker is configured.
#[derive(Debug, Default)]
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError> {
        info!(
            "{:<12} --> {} job={} version={}",
            "Events", envelope.event_type, envelope.aggregate_id, envelope.version
        );
        Ok(())
    }
}

/// Publisher that keeps every envelope in memory.
#[derive(Debug, Default)]
pub struct InMemoryEventPublisher {
    published: Mutex<Vec<EventEnvelope>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<EventEnvelope> {
        self.published.lock().await.clone()
    }

    pub async fn event_types(&self) -> Vec<String> {
        self.published
            .lock()
            .await
            .iter()
            .map(|envelope| envelope.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError> {
        self.published.lock().await.push(envelope.clone());
        Ok(())
    }
}
// endregion: --- Event Publisher

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn envelope_carries_dotted_event_type() {
        let event = BetEvent::JobExpired {
            job_id: Uuid::new_v4(),
            client_id: "client-1".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 6, 9, 5, 0).unwrap(),
        };

        let envelope = EventEnvelope::wrap(&event, 3).unwrap();

        assert_eq!(envelope.event_type, "job.expired");
        assert_eq!(envelope.aggregate_id, event.job_id());
        assert_eq!(envelope.data["type"], "job.expired");
        assert_eq!(envelope.version, 3);
    }
}
