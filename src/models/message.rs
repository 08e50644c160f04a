use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message row as persisted and as serialized to clients.
///
/// Exactly one payload shape is populated: `content` for text, or the
/// `file_*` columns (with `is_file = true`) for a file transfer. Rows are
/// immutable after append except for `seen`, which only flips false -> true.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
    pub is_file: bool,
    pub seen: bool,
    pub sequence_number: i64,
    pub timestamp: DateTime<Utc>,
}

/// Payload of a message being appended.
#[derive(Debug, Clone)]
pub enum MessageBody {
    Text {
        content: String,
    },
    File {
        file_name: String,
        file_type: String,
        file_data: String,
    },
}

/// A message before the store assigns id, sequence and timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub body: MessageBody,
}

impl NewMessage {
    pub fn text(sender_id: Uuid, receiver_id: Uuid, content: String) -> Self {
        Self {
            sender_id,
            receiver_id: Some(receiver_id),
            body: MessageBody::Text { content },
        }
    }

    pub fn file(
        sender_id: Uuid,
        receiver_id: Uuid,
        file_name: String,
        file_type: String,
        file_data: String,
    ) -> Self {
        Self {
            sender_id,
            receiver_id: Some(receiver_id),
            body: MessageBody::File {
                file_name,
                file_type,
                file_data,
            },
        }
    }
}
