#![allow(dead_code)]

use bet_dispatch::bidding::commands::ApproveJobCommand;
use bet_dispatch::bidding::model::{BidOffer, Job, JobDraft, Urgency};
use bet_dispatch::clock::ManualClock;
use bet_dispatch::config::EngineConfig;
use bet_dispatch::engine::BiddingEngine;
use bet_dispatch::events::InMemoryEventPublisher;
use bet_dispatch::store::InMemoryJobStore;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub const MORNING_SLOT: &str = "2025-01-07T08:00/12:00";
pub const AFTERNOON_SLOT: &str = "2025-01-07T13:00/17:00";

pub struct Harness {
    pub engine: Arc<BiddingEngine>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<InMemoryEventPublisher>,
    pub store: Arc<InMemoryJobStore>,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
}

pub fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

pub fn harness_with(config: EngineConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let events = Arc::new(InMemoryEventPublisher::new());
    let store = Arc::new(InMemoryJobStore::new());
    let engine = Arc::new(BiddingEngine::new(
        store.clone(),
        events.clone(),
        clock.clone(),
        config,
    ));
    Harness {
        engine,
        clock,
        events,
        store,
    }
}

pub fn draft(urgency: Urgency) -> JobDraft {
    JobDraft {
        client_id: "client-42".into(),
        description: "Clogged kitchen drain".into(),
        address: "3450 rue Drummond, Montréal".into(),
        photo_urls: vec!["https://photos.example/drain.jpg".into()],
        urgency,
        preferred_time_slots: vec![MORNING_SLOT.into(), AFTERNOON_SLOT.into()],
        suggested_price: Some(175_00),
        estimated_duration_minutes: Some(60),
        service_radius_km: None,
        deposit_amount: 50_00,
    }
}

pub fn offer(plumber_id: &str, bid_amount: i64) -> BidOffer {
    BidOffer {
        plumber_id: plumber_id.into(),
        bid_amount,
        estimated_duration_minutes: Some(75),
        selected_time_slot: Some(MORNING_SLOT.into()),
        message: Some("Available with a camera snake".into()),
        distance_km: 8.0,
        eta_minutes: Some(30),
    }
}

pub fn approval() -> ApproveJobCommand {
    ApproveJobCommand {
        admin_id: "admin-7".into(),
        note: None,
    }
}

/// Submit and approve a job at the current clock time.
pub async fn open_job(h: &Harness, urgency: Urgency) -> Job {
    let job = h.engine.submit_job(draft(urgency)).await.expect("job submitted");
    h.engine.approve(job.id, approval()).await.expect("job approved")
}
