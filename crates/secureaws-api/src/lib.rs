pub mod conversations;
pub mod error;
pub mod feedback;
pub mod quick_actions;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};

pub use state::{AppState, AppStateInner};

/// Request-style endpoints, mounted under `/api`.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/conversations", post(conversations::create_conversation))
        .route("/api/conversations/{conversation_id}/messages", get(conversations::get_messages))
        .route("/api/quick-actions", get(quick_actions::list_quick_actions))
        .route("/api/feedback/{message_id}", post(feedback::set_feedback))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use secureaws_db::{ConversationStore, Database};
    use secureaws_types::models::{NewMessage, Role};

    use super::*;

    fn app() -> (Router, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let state: AppState = Arc::new(AppStateInner { store: db.clone() });
        (routes(state), db)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    #[tokio::test]
    async fn create_conversation_applies_defaults() {
        let (app, _db) = app();
        let (status, body) = call(&app, "POST", "/api/conversations", Some(json!({}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], "anonymous");
        assert_eq!(body["title"], "New Conversation");
        assert!(body["id"].as_i64().unwrap() > 0);
        assert!(body["createdAt"].is_string());
    }

    #[tokio::test]
    async fn create_conversation_keeps_supplied_fields() {
        let (app, _db) = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/conversations",
            Some(json!({ "userId": "u-42", "title": "VPC review" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], "u-42");
        assert_eq!(body["title"], "VPC review");
    }

    #[tokio::test]
    async fn messages_come_back_in_order() {
        let (app, db) = app();
        let conv = db.create_conversation("u", None).unwrap();
        for (role, content) in [(Role::User, "hi"), (Role::Bot, "<p>hello</p>")] {
            db.create_message(NewMessage {
                conversation_id: conv.id,
                role,
                content: content.into(),
                sources: None,
            })
            .unwrap();
        }

        let uri = format!("/api/conversations/{}/messages", conv.id);
        let (status, body) = call(&app, "GET", &uri, None).await;

        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["type"], "user");
        assert_eq!(list[1]["type"], "bot");
        assert_eq!(list[1]["content"], "<p>hello</p>");
    }

    #[tokio::test]
    async fn unknown_conversation_is_404() {
        let (app, _db) = app();
        let (status, body) = call(&app, "GET", "/api/conversations/999/messages", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Conversation not found");
    }

    #[tokio::test]
    async fn quick_actions_list_three_topics() {
        let (app, _db) = app();
        let (status, body) = call(&app, "GET", "/api/quick-actions", None).await;

        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.iter().all(|a| a["label"].is_string() && a["query"].is_string()));
    }

    #[tokio::test]
    async fn feedback_is_recorded() {
        let (app, db) = app();
        let conv = db.create_conversation("u", None).unwrap();
        let msg = db
            .create_message(NewMessage {
                conversation_id: conv.id,
                role: Role::Bot,
                content: "<p>answer</p>".into(),
                sources: None,
            })
            .unwrap();

        let uri = format!("/api/feedback/{}", msg.id);
        let (status, body) = call(&app, "POST", &uri, Some(json!({ "feedback": "positive" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let stored = db.get_conversation_messages(conv.id).unwrap();
        assert_eq!(stored[0].feedback.map(|f| f.as_str()), Some("positive"));
    }

    #[tokio::test]
    async fn feedback_for_missing_message_is_404() {
        let (app, _db) = app();
        let (status, body) =
            call(&app, "POST", "/api/feedback/7", Some(json!({ "feedback": "negative" }))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Message not found");
    }

    #[tokio::test]
    async fn invalid_feedback_value_is_rejected() {
        let (app, _db) = app();
        let (status, _) =
            call(&app, "POST", "/api/feedback/1", Some(json!({ "feedback": "meh" }))).await;
        assert!(status.is_client_error());
    }
}
