use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::Connection;

use secureaws_types::models::{
    Conversation, ConversationId, Feedback, Message, MessageId, NewMessage, Role, Source,
};

use crate::Database;
use crate::models::{ConversationRow, MessageRow};

impl Database {
    // -- Conversations --

    pub fn create_conversation(&self, user_id: &str, title: Option<&str>) -> Result<Conversation> {
        let now = current_timestamp();
        let stamp = format_timestamp(&now);

        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (user_id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                rusqlite::params![user_id, title, stamp],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(Conversation {
            id,
            user_id: user_id.to_string(),
            title: title.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_conversation(&self, id: ConversationId) -> Result<Option<Conversation>> {
        self.with_conn(|conn| query_conversation(conn, id))?
            .map(conversation_from_row)
            .transpose()
    }

    // -- Messages --

    /// Append a message and touch the owning conversation's `updated_at`.
    /// Fails if the conversation does not exist.
    /// The timestamp is taken under the connection lock, so `created_at`
    /// never runs backwards against id order.
    pub fn insert_message(&self, new: &NewMessage) -> Result<Message> {
        let sources = new
            .sources
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let (id, now) = self.with_conn(|conn| {
            let now = current_timestamp();
            let stamp = format_timestamp(&now);
            conn.execute(
                "INSERT INTO messages (conversation_id, role, content, sources, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![new.conversation_id, new.role.as_str(), new.content, sources, stamp],
            )?;
            let id = conn.last_insert_rowid();
            conn.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                rusqlite::params![stamp, new.conversation_id],
            )?;
            Ok((id, now))
        })?;

        Ok(Message {
            id,
            conversation_id: new.conversation_id,
            role: new.role,
            content: new.content.clone(),
            sources: new.sources.clone(),
            feedback: None,
            created_at: now,
        })
    }

    /// All messages of a conversation, oldest first.
    pub fn get_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
        self.with_conn(|conn| query_messages(conn, conversation_id))?
            .into_iter()
            .map(message_from_row)
            .collect()
    }

    /// Overwrites any previous value. Returns `None` if the message doesn't exist.
    pub fn set_feedback(&self, message_id: MessageId, feedback: Feedback) -> Result<Option<Message>> {
        let row = self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET feedback = ?1 WHERE id = ?2",
                rusqlite::params![feedback.as_str(), message_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_message(conn, message_id)
        })?;

        row.map(message_from_row).transpose()
    }
}

fn query_conversation(conn: &Connection, id: ConversationId) -> Result<Option<ConversationRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, title, created_at, updated_at FROM conversations WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(ConversationRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                title: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, sources, feedback, created_at";

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        sources: row.get(4)?,
        feedback: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_message(conn: &Connection, id: MessageId) -> Result<Option<MessageRow>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_message_row).optional()?;
    Ok(row)
}

fn query_messages(conn: &Connection, conversation_id: ConversationId) -> Result<Vec<MessageRow>> {
    // id is AUTOINCREMENT, so id order is insertion order even when two
    // messages share a timestamp
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 ORDER BY id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map([conversation_id], map_message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn conversation_from_row(row: ConversationRow) -> Result<Conversation> {
    Ok(Conversation {
        id: row.id,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
        user_id: row.user_id,
        title: row.title,
    })
}

fn message_from_row(row: MessageRow) -> Result<Message> {
    let role = Role::parse(&row.role)
        .ok_or_else(|| anyhow!("Corrupt role '{}' on message {}", row.role, row.id))?;

    let feedback = match row.feedback.as_deref() {
        Some(raw) => Some(
            Feedback::parse(raw)
                .ok_or_else(|| anyhow!("Corrupt feedback '{}' on message {}", raw, row.id))?,
        ),
        None => None,
    };

    let sources = row
        .sources
        .as_deref()
        .map(serde_json::from_str::<Vec<Source>>)
        .transpose()
        .with_context(|| format!("Corrupt sources on message {}", row.id))?;

    Ok(Message {
        id: row.id,
        conversation_id: row.conversation_id,
        role,
        content: row.content,
        sources,
        feedback,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

/// Current time at the precision we store, so returned records compare equal
/// to what a later read yields.
fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_message(conversation_id: ConversationId, content: &str) -> NewMessage {
        NewMessage {
            conversation_id,
            role: Role::User,
            content: content.to_string(),
            sources: None,
        }
    }

    #[test]
    fn conversation_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_conversation("anonymous", Some("AWS Security Chat")).unwrap();

        let fetched = db.get_conversation(created.id).unwrap().unwrap();
        assert_eq!(fetched.user_id, "anonymous");
        assert_eq!(fetched.title.as_deref(), Some("AWS Security Chat"));
        assert_eq!(fetched.created_at, created.created_at);

        assert!(db.get_conversation(created.id + 100).unwrap().is_none());
    }

    #[test]
    fn messages_come_back_in_append_order() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.create_conversation("anonymous", None).unwrap();

        let first = db.insert_message(&user_message(conv.id, "first")).unwrap();
        let second = db
            .insert_message(&NewMessage {
                conversation_id: conv.id,
                role: Role::Bot,
                content: "<p>second</p>".into(),
                sources: Some(vec![Source::aws_waf(), Source::general()]),
            })
            .unwrap();
        let third = db.insert_message(&user_message(conv.id, "third")).unwrap();

        assert!(first.id < second.id && second.id < third.id);
        assert!(first.created_at <= second.created_at && second.created_at <= third.created_at);

        let messages = db.get_messages(conv.id).unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "<p>second</p>", "third"]);
        assert_eq!(messages[1].role, Role::Bot);
        assert_eq!(
            messages[1].sources.as_deref(),
            Some(&[Source::aws_waf(), Source::general()][..])
        );
        assert_eq!(messages[0].sources, None);
    }

    #[test]
    fn concurrent_appends_keep_timestamps_in_id_order() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.create_conversation("anonymous", None).unwrap();

        std::thread::scope(|s| {
            for t in 0..4 {
                let db = &db;
                s.spawn(move || {
                    for i in 0..25 {
                        db.insert_message(&user_message(conv.id, &format!("t{t} m{i}"))).unwrap();
                    }
                });
            }
        });

        let messages = db.get_messages(conv.id).unwrap();
        assert_eq!(messages.len(), 100);
        assert!(messages.windows(2).all(|w| w[0].id < w[1].id && w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn messages_are_scoped_to_their_conversation() {
        let db = Database::open_in_memory().unwrap();
        let a = db.create_conversation("alice", None).unwrap();
        let b = db.create_conversation("bob", None).unwrap();

        db.insert_message(&user_message(a.id, "for a")).unwrap();
        db.insert_message(&user_message(b.id, "for b")).unwrap();

        let a_messages = db.get_messages(a.id).unwrap();
        assert_eq!(a_messages.len(), 1);
        assert_eq!(a_messages[0].content, "for a");
    }

    #[test]
    fn insert_touches_conversation_updated_at() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.create_conversation("anonymous", None).unwrap();
        let msg = db.insert_message(&user_message(conv.id, "hi")).unwrap();

        let fetched = db.get_conversation(conv.id).unwrap().unwrap();
        assert_eq!(fetched.updated_at, msg.created_at);
        assert_eq!(fetched.created_at, conv.created_at);
    }

    #[test]
    fn insert_into_missing_conversation_fails() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_message(&user_message(42, "orphan")).is_err());
    }

    #[test]
    fn feedback_roundtrip_and_overwrite() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.create_conversation("anonymous", None).unwrap();
        let msg = db.insert_message(&user_message(conv.id, "hi")).unwrap();

        let updated = db.set_feedback(msg.id, Feedback::Positive).unwrap().unwrap();
        assert_eq!(updated.feedback, Some(Feedback::Positive));
        assert_eq!(db.get_messages(conv.id).unwrap()[0].feedback, Some(Feedback::Positive));

        // The store accepts a second write; only the client refuses to send one.
        let again = db.set_feedback(msg.id, Feedback::Negative).unwrap().unwrap();
        assert_eq!(again.feedback, Some(Feedback::Negative));
    }

    #[test]
    fn feedback_for_missing_message_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.set_feedback(999, Feedback::Positive).unwrap().is_none());
    }
}
