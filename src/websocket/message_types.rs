use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::StoredMessage;

/// Inbound WebSocket events, client to server.
///
/// Wire names and field casing follow the client protocol (camelCase).
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing { receiver_id: Uuid },

    #[serde(rename = "stopTyping", rename_all = "camelCase")]
    StopTyping { receiver_id: Uuid },

    #[serde(rename = "sendFile", rename_all = "camelCase")]
    SendFile {
        receiver_id: Uuid,
        #[serde(default)]
        file_name: Option<String>,
        #[serde(default)]
        file_type: Option<String>,
        #[serde(default)]
        file_data: Option<String>,
    },

    #[serde(rename = "markAsSeen", rename_all = "camelCase")]
    MarkAsSeen { sender_id: Uuid },
}

/// Outbound WebSocket events, server to client.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsOutboundEvent {
    /// Presence snapshot, sent once right after authentication.
    #[serde(rename = "onlineUsers")]
    OnlineUsers { users: Vec<Uuid> },

    #[serde(rename = "userOnline", rename_all = "camelCase")]
    UserOnline { user_id: Uuid },

    #[serde(rename = "userOffline", rename_all = "camelCase")]
    UserOffline { user_id: Uuid },

    #[serde(rename = "newMessage", rename_all = "camelCase")]
    NewMessage {
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "receiveFile", rename_all = "camelCase")]
    ReceiveFile {
        sender_id: Uuid,
        receiver_id: Uuid,
        file_name: String,
        file_type: String,
        file_data: String,
        is_file: bool,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "messageSeen", rename_all = "camelCase")]
    MessageSeen { sender_id: Uuid },

    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing { sender_id: Uuid, receiver_id: Uuid },

    #[serde(rename = "stopTyping", rename_all = "camelCase")]
    StopTyping { sender_id: Uuid, receiver_id: Uuid },

    /// Explicit failure acknowledgment for a rejected inbound event.
    #[serde(rename = "error")]
    Error { event: String, message: String },
}

impl WsOutboundEvent {
    pub fn new_message(msg: &StoredMessage) -> Option<Self> {
        Some(Self::NewMessage {
            sender_id: msg.sender_id,
            receiver_id: msg.receiver_id?,
            content: msg.content.clone()?,
            timestamp: msg.timestamp,
        })
    }

    pub fn receive_file(msg: &StoredMessage) -> Option<Self> {
        Some(Self::ReceiveFile {
            sender_id: msg.sender_id,
            receiver_id: msg.receiver_id?,
            file_name: msg.file_name.clone()?,
            file_type: msg.file_type.clone()?,
            file_data: msg.file_data.clone()?,
            is_file: true,
            timestamp: msg.timestamp,
        })
    }

    /// Serialize for fan-out. Serialization of these enums cannot fail;
    /// fall back to a bare error object just in case.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","event":"serialize","message":"internal"}"#.into())
    }
}
