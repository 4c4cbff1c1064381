/// Database row types. These map directly to SQLite rows.
/// Conversion into `secureaws_types::models` happens in `queries`.

pub struct ConversationRow {
    pub id: i64,
    pub user_id: String,
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub conversation_id: i64,
    pub role: String,
    pub content: String,
    /// JSON-encoded `Vec<Source>`
    pub sources: Option<String>,
    pub feedback: Option<String>,
    pub created_at: String,
}
