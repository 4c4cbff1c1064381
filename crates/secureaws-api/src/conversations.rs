use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use secureaws_types::api::CreateConversationRequest;
use secureaws_types::models::ConversationId;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_USER_ID: &str = "anonymous";
const DEFAULT_TITLE: &str = "New Conversation";

pub async fn create_conversation(
    State(state): State<AppState>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = req
        .user_id
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
    let title = req
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let conversation = state
        .run_store(move |store| store.create_conversation(&user_id, Some(title.as_str())))
        .await
        .map_err(ApiError::internal("Failed to create conversation"))?;

    info!("conversation {} created for {}", conversation.id, conversation.user_id);
    Ok(Json(conversation))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<ConversationId>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state
        .run_store(move |store| {
            if store.get_conversation(conversation_id)?.is_none() {
                return Ok(None);
            }
            store.get_conversation_messages(conversation_id).map(Some)
        })
        .await
        .map_err(ApiError::internal("Failed to fetch messages"))?
        .ok_or(ApiError::NotFound("conversation"))?;

    Ok(Json(messages))
}
