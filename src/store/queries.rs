/// Job lookup
pub const GET_JOB: &str = r#"
    SELECT id, client_id, description, address, photo_urls, urgency, status,
           preferred_time_slots, bidding_start_time, bidding_end_time, suggested_price,
           estimated_duration_minutes, service_radius_km, winner_id, winning_bid_id,
           winning_amount, awarded_at, deposit_amount, deposit_status, reviewed_by,
           review_note, rejection_reason, created_at, version
    FROM jobs
    WHERE id = $1
"#;

/// Jobs by status, optionally bounded by window end (served by jobs_status_end_idx)
pub const GET_JOBS_BY_STATUS: &str = r#"
    SELECT id, client_id, description, address, photo_urls, urgency, status,
           preferred_time_slots, bidding_start_time, bidding_end_time, suggested_price,
           estimated_duration_minutes, service_radius_km, winner_id, winning_bid_id,
           winning_amount, awarded_at, deposit_amount, deposit_status, reviewed_by,
           review_note, rejection_reason, created_at, version
    FROM jobs
    WHERE status = $1
      AND ($2::timestamptz IS NULL OR bidding_end_time <= $2)
    ORDER BY bidding_end_time ASC NULLS LAST, created_at ASC
"#;

pub const INSERT_JOB: &str = r#"
    INSERT INTO jobs (
        id, client_id, description, address, photo_urls, urgency, status,
        preferred_time_slots, bidding_start_time, bidding_end_time, suggested_price,
        estimated_duration_minutes, service_radius_km, winner_id, winning_bid_id,
        winning_amount, awarded_at, deposit_amount, deposit_status, reviewed_by,
        review_note, rejection_reason, created_at, version
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
            $18, $19, $20, $21, $22, $23, $24)
"#;

/// Optimistic update: affects zero rows when the stored version moved on
pub const UPDATE_JOB: &str = r#"
    UPDATE jobs SET
        client_id = $2, description = $3, address = $4, photo_urls = $5, urgency = $6,
        status = $7, preferred_time_slots = $8, bidding_start_time = $9,
        bidding_end_time = $10, suggested_price = $11, estimated_duration_minutes = $12,
        service_radius_km = $13, winner_id = $14, winning_bid_id = $15,
        winning_amount = $16, awarded_at = $17, deposit_amount = $18, deposit_status = $19,
        reviewed_by = $20, review_note = $21, rejection_reason = $22, created_at = $23,
        version = $24
    WHERE id = $1 AND version = $25
"#;

/// Bid lookup
pub const GET_BID: &str = r#"
    SELECT id, job_id, plumber_id, bid_amount, estimated_duration_minutes, selected_time_slot,
           message, status, submitted_at, distance_km, eta_minutes, created_at
    FROM bids
    WHERE id = $1
"#;

/// Bids of a job, insertion order
pub const GET_JOB_BIDS: &str = r#"
    SELECT id, job_id, plumber_id, bid_amount, estimated_duration_minutes, selected_time_slot,
           message, status, submitted_at, distance_km, eta_minutes, created_at
    FROM bids
    WHERE job_id = $1
    ORDER BY created_at ASC, seq ASC
"#;

pub const UPSERT_BID: &str = r#"
    INSERT INTO bids (
        id, job_id, plumber_id, bid_amount, estimated_duration_minutes, selected_time_slot,
        message, status, submitted_at, distance_km, eta_minutes, created_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (id) DO UPDATE SET
        bid_amount = EXCLUDED.bid_amount,
        estimated_duration_minutes = EXCLUDED.estimated_duration_minutes,
        selected_time_slot = EXCLUDED.selected_time_slot,
        message = EXCLUDED.message,
        status = EXCLUDED.status,
        submitted_at = EXCLUDED.submitted_at,
        distance_km = EXCLUDED.distance_km,
        eta_minutes = EXCLUDED.eta_minutes
"#;
