// region:    --- Imports
use crate::bidding::commands::{
    ApproveJobCommand, AssessArrivalCommand, CloseBiddingCommand, RejectJobCommand,
    UpdateDepositCommand,
};
use crate::bidding::model::{Bid, BidOffer, Job, JobDraft, Urgency};
use crate::bidding::policy::{ArrivalAssessment, PenaltySchedule, PENALTY_SCHEDULE};
use crate::bidding::window::BiddingRules;
use crate::engine::BiddingEngine;
use crate::error::BetError;
use crate::extract::{ApiJson, ApiPath};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

pub type AppState = Arc<BiddingEngine>;

/// HTTP surface of the engine; cross-cutting layers are added by the caller.
pub fn router(engine: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/jobs", post(handle_submit_job))
        .route("/jobs/:id", get(handle_get_job))
        .route("/jobs/:id/approve", post(handle_approve))
        .route("/jobs/:id/reject", post(handle_reject))
        .route("/jobs/:id/close", post(handle_close_bidding))
        .route("/jobs/:id/deposit", put(handle_update_deposit))
        .route(
            "/jobs/:id/bids",
            post(handle_submit_bid).get(handle_list_bids),
        )
        .route("/jobs/:id/bids/ranked", get(handle_ranked_bids))
        .route("/bids/:id", delete(handle_withdraw_bid))
        .route("/bids/:id/accept", post(handle_accept_bid))
        .route("/jobs/:id/arrival", post(handle_assess_arrival))
        .route("/policy/penalties", get(handle_penalty_policy))
        .with_state(engine)
}

// region:    --- Review Queue Handlers

pub async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Client submission into the review queue
pub async fn handle_submit_job(
    State(engine): State<AppState>,
    ApiJson(draft): ApiJson<JobDraft>,
) -> Result<impl IntoResponse, BetError> {
    info!("{:<12} --> submit job for client {}", "Handler", draft.client_id);
    let job = engine.submit_job(draft).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn handle_get_job(
    State(engine): State<AppState>,
    ApiPath(job_id): ApiPath<Uuid>,
) -> Result<Json<Job>, BetError> {
    Ok(Json(engine.get_job(job_id).await?))
}

pub async fn handle_approve(
    State(engine): State<AppState>,
    ApiPath(job_id): ApiPath<Uuid>,
    ApiJson(cmd): ApiJson<ApproveJobCommand>,
) -> Result<Json<Job>, BetError> {
    info!("{:<12} --> approve job {} by {}", "Handler", job_id, cmd.admin_id);
    Ok(Json(engine.approve(job_id, cmd).await?))
}

pub async fn handle_reject(
    State(engine): State<AppState>,
    ApiPath(job_id): ApiPath<Uuid>,
    ApiJson(cmd): ApiJson<RejectJobCommand>,
) -> Result<Json<Job>, BetError> {
    info!("{:<12} --> reject job {} by {}", "Handler", job_id, cmd.admin_id);
    Ok(Json(engine.reject(job_id, cmd).await?))
}

pub async fn handle_update_deposit(
    State(engine): State<AppState>,
    ApiPath(job_id): ApiPath<Uuid>,
    ApiJson(cmd): ApiJson<UpdateDepositCommand>,
) -> Result<Json<Job>, BetError> {
    Ok(Json(engine.update_deposit(job_id, cmd).await?))
}

// endregion: --- Review Queue Handlers

// region:    --- Bidding Handlers

pub async fn handle_submit_bid(
    State(engine): State<AppState>,
    ApiPath(job_id): ApiPath<Uuid>,
    ApiJson(offer): ApiJson<BidOffer>,
) -> Result<impl IntoResponse, BetError> {
    info!(
        "{:<12} --> bid on job {} from {}",
        "Handler", job_id, offer.plumber_id
    );
    let bid = engine.submit_bid(job_id, offer).await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

pub async fn handle_list_bids(
    State(engine): State<AppState>,
    ApiPath(job_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Bid>>, BetError> {
    Ok(Json(engine.list_bids(job_id).await?))
}

pub async fn handle_ranked_bids(
    State(engine): State<AppState>,
    ApiPath(job_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Bid>>, BetError> {
    Ok(Json(engine.ranked_bids(job_id).await?))
}

pub async fn handle_withdraw_bid(
    State(engine): State<AppState>,
    ApiPath(bid_id): ApiPath<Uuid>,
) -> Result<Json<Bid>, BetError> {
    info!("{:<12} --> withdraw bid {}", "Handler", bid_id);
    Ok(Json(engine.withdraw_bid(bid_id).await?))
}

pub async fn handle_accept_bid(
    State(engine): State<AppState>,
    ApiPath(bid_id): ApiPath<Uuid>,
) -> Result<Json<Job>, BetError> {
    info!("{:<12} --> accept bid {}", "Handler", bid_id);
    Ok(Json(engine.accept_bid(bid_id).await?))
}

pub async fn handle_close_bidding(
    State(engine): State<AppState>,
    ApiPath(job_id): ApiPath<Uuid>,
    ApiJson(cmd): ApiJson<CloseBiddingCommand>,
) -> Result<Json<Job>, BetError> {
    Ok(Json(engine.close_bidding(job_id, cmd).await?))
}

// endregion: --- Bidding Handlers

// region:    --- Policy Handlers

#[derive(Debug, Serialize)]
pub struct UrgencyRules {
    pub urgency: Urgency,
    #[serde(flatten)]
    pub rules: BiddingRules,
}

#[derive(Debug, Serialize)]
pub struct PolicyView {
    pub penalties: PenaltySchedule,
    pub bidding: Vec<UrgencyRules>,
    pub auto_award_on_expiry: bool,
}

/// Late arrival / no-show assessment for billing; nothing is charged here
pub async fn handle_assess_arrival(
    State(engine): State<AppState>,
    ApiPath(job_id): ApiPath<Uuid>,
    ApiJson(cmd): ApiJson<AssessArrivalCommand>,
) -> Result<Json<ArrivalAssessment>, BetError> {
    Ok(Json(engine.assess_arrival(job_id, cmd).await?))
}

/// Penalty schedule and bidding rules, for reference by clients and billing
pub async fn handle_penalty_policy(State(engine): State<AppState>) -> Json<PolicyView> {
    let bidding = [Urgency::Urgent, Urgency::Normal, Urgency::Quote]
        .into_iter()
        .map(|urgency| UrgencyRules {
            urgency,
            rules: BiddingRules::for_urgency(urgency),
        })
        .collect();

    Json(PolicyView {
        penalties: PENALTY_SCHEDULE,
        bidding,
        auto_award_on_expiry: engine.config().auto_award_on_expiry,
    })
}

// endregion: --- Policy Handlers
