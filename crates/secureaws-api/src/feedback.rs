use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use secureaws_types::api::{FeedbackRequest, FeedbackResponse};
use secureaws_types::models::MessageId;

use crate::error::ApiError;
use crate::state::AppState;

/// Last write wins; the store does not refuse a second rating.
pub async fn set_feedback(
    State(state): State<AppState>,
    Path(message_id): Path<MessageId>,
    Json(req): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let feedback = req.feedback;

    state
        .run_store(move |store| store.update_message_feedback(message_id, feedback))
        .await
        .map_err(ApiError::internal("Failed to update feedback"))?
        .ok_or(ApiError::NotFound("message"))?;

    info!("feedback {} on message {}", feedback.as_str(), message_id);
    Ok(Json(FeedbackResponse { success: true }))
}
