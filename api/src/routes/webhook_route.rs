//! POST /webhook — vendor detection, signature verification, ack-first
//! pipeline dispatch.
//!
//! The acknowledgment goes out before the review pipeline starts so the
//! vendor never retries on slow LLM backends; the pipeline runs in its own
//! spawned task owning the full review for this event.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::Json,
};
use serde::Serialize;
use tracing::{error, info};

use pr_reviewer::{run_review, PrEvent, ReviewOutcome};

use crate::core::app_state::AppState;
use crate::error_handler::AppError;
use crate::webhook::events::{parse_event, ParsedEvent, WebhookVendor};
use crate::webhook::signature::verify;

#[derive(Serialize)]
pub struct WebhookResponse {
    pub message: &'static str,
}

pub async fn webhook(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<WebhookResponse>, AppError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| AppError::BadRequest("unreadable body".into()))?;

    let vendor = WebhookVendor::detect(&parts.headers)
        .ok_or_else(|| AppError::BadRequest("unknown webhook vendor".into()))?;

    verify(vendor, &parts.headers, &bytes, &state.config.webhook_secret)
        .map_err(|reason| AppError::BadRequest(reason.to_string()))?;

    let event_name = vendor.event_name(&parts.headers);
    info!("received {vendor:?} event: {event_name}");

    match parse_event(vendor, &event_name, &bytes)
        .map_err(|reason| AppError::BadRequest(reason.to_string()))?
    {
        ParsedEvent::Ping => Ok(Json(WebhookResponse { message: "pong" })),
        ParsedEvent::Ignored(why) => {
            info!("ignoring event: {why}");
            Ok(Json(WebhookResponse { message: "ignored" }))
        }
        ParsedEvent::PullRequest(event) => {
            // Ack first; the review owns its own task from here.
            tokio::spawn(dispatch_review(state, event));
            Ok(Json(WebhookResponse { message: "accepted" }))
        }
    }
}

async fn dispatch_review(state: Arc<AppState>, event: PrEvent) {
    let provider_cfg = state.config.provider_config();
    let review_cfg = state.config.review_config(state.max_chunk_tokens);
    let target = format!("{}/{}#{}", event.owner, event.repo, event.number);

    match run_review(
        provider_cfg,
        event,
        review_cfg,
        state.chain.clone(),
        state.index.clone(),
    )
    .await
    {
        Ok(ReviewOutcome::Posted {
            files_reviewed,
            lgtm,
        }) => info!("review posted for {target}: {files_reviewed} files, lgtm={lgtm}"),
        Ok(ReviewOutcome::Skipped(reason)) => info!("review of {target} skipped: {reason}"),
        Err(e) => error!("review of {target} failed: {e}"),
    }
}
