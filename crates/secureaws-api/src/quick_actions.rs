use axum::{Json, response::IntoResponse};

pub async fn list_quick_actions() -> impl IntoResponse {
    Json(secureaws_assistant::quick_actions())
}
