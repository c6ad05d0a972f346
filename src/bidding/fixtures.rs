use super::model::{BidOffer, DepositStatus, Job, JobStatus, Urgency};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

pub(crate) fn pending_job(urgency: Urgency) -> Job {
    Job {
        id: Uuid::new_v4(),
        client_id: "client-1".into(),
        description: "Leaking pipe under sink".into(),
        address: "1200 rue Sherbrooke O, Montréal".into(),
        photo_urls: vec!["https://photos.example/sink.jpg".into()],
        urgency,
        status: JobStatus::PendingReview,
        preferred_time_slots: vec!["2025-01-07T08:00/12:00".into(), "2025-01-07T13:00/17:00".into()],
        bidding_start_time: None,
        bidding_end_time: None,
        suggested_price: Some(180_00),
        estimated_duration_minutes: Some(90),
        service_radius_km: 50.0,
        winner_id: None,
        winning_bid_id: None,
        winning_amount: None,
        awarded_at: None,
        deposit_amount: 50_00,
        deposit_status: DepositStatus::Pending,
        reviewed_by: None,
        review_note: None,
        rejection_reason: None,
        created_at: Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap(),
        version: 0,
    }
}

pub(crate) fn offer(plumber_id: &str, bid_amount: i64) -> BidOffer {
    BidOffer {
        plumber_id: plumber_id.to_string(),
        bid_amount,
        estimated_duration_minutes: Some(60),
        selected_time_slot: Some("2025-01-07T08:00/12:00".into()),
        message: None,
        distance_km: 12.5,
        eta_minutes: Some(30),
    }
}
