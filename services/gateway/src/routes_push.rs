use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{error::ApiError, push::PushRequest, state::SharedState};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSentResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
}

pub async fn send_push(
    State(state): State<SharedState>,
    body: Result<Json<PushRequest>, JsonRejection>,
) -> Result<Json<PushSentResponse>, ApiError> {
    let Json(req) = body.map_err(|e| {
        warn!(detail = %e.body_text(), "push: unreadable request body");
        ApiError::BadRequest("Request body must be a JSON object".to_string())
    })?;
    let message = req.into_message()?;

    let ticket = state.push.send(&message).await?;
    info!(ticket_id = ?ticket.id, "push: notification accepted");

    Ok(Json(PushSentResponse {
        success: true,
        message: "Notification sent successfully",
        ticket_id: ticket.id,
    }))
}
