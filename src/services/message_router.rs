use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{NewMessage, PairKey, StoredMessage};
use crate::services::session_store::SessionStore;
use crate::services::user_directory::UserDirectory;
use crate::websocket::message_types::WsOutboundEvent;
use crate::websocket::ConnectionRegistry;

/// Business logic for sending messages and marking them seen.
///
/// Every mutation persists first, then fans the event out to both
/// participants' broadcast groups. The sender gets the echo too: the text
/// path is invoked over REST, so the echo is what reconciles optimistic UI
/// and other devices of the same user.
pub struct MessageRouter;

impl MessageRouter {
    pub async fn send_text(
        db: &Pool,
        registry: &ConnectionRegistry,
        sender_id: Uuid,
        receiver_username: &str,
        content: String,
    ) -> AppResult<StoredMessage> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("content must not be empty".into()));
        }

        let receiver_id = UserDirectory::resolve_username(db, receiver_username).await?;
        ensure_distinct(sender_id, receiver_id)?;
        let handle = SessionStore::resolve(db, sender_id, receiver_id).await?;
        let stored = SessionStore::append(
            db,
            &handle,
            NewMessage::text(sender_id, receiver_id, content),
        )
        .await?;

        if let Some(event) = WsOutboundEvent::new_message(&stored) {
            fan_out_to_pair(registry, handle.pair, &event.to_json()).await;
        }

        Ok(stored)
    }

    pub async fn send_file(
        db: &Pool,
        registry: &ConnectionRegistry,
        sender_id: Uuid,
        receiver_id: Uuid,
        file_name: Option<String>,
        file_type: Option<String>,
        file_data: Option<String>,
    ) -> AppResult<StoredMessage> {
        ensure_distinct(sender_id, receiver_id)?;
        let file_name = require_field(file_name, "fileName")?;
        let file_type = require_field(file_type, "fileType")?;
        let file_data = require_field(file_data, "fileData")?;

        let handle = SessionStore::resolve(db, sender_id, receiver_id).await?;
        let stored = SessionStore::append(
            db,
            &handle,
            NewMessage::file(sender_id, receiver_id, file_name, file_type, file_data),
        )
        .await?;

        tracing::debug!(
            %sender_id,
            %receiver_id,
            file_name = stored.file_name.as_deref().unwrap_or_default(),
            "file message stored"
        );

        if let Some(event) = WsOutboundEvent::receive_file(&stored) {
            fan_out_to_pair(registry, handle.pair, &event.to_json()).await;
        }

        Ok(stored)
    }

    /// Mark everything `counterpart_id` sent to `viewer_id` as seen, then
    /// tell both sides so the original sender's UI shows the receipt.
    pub async fn mark_seen(
        db: &Pool,
        registry: &ConnectionRegistry,
        viewer_id: Uuid,
        counterpart_id: Uuid,
    ) -> AppResult<u64> {
        let pair = PairKey::new(viewer_id, counterpart_id);
        let counterpart = pair.counterpart_of(viewer_id);
        let updated = match SessionStore::find(db, pair).await? {
            Some(handle) => SessionStore::mark_seen(db, &handle, counterpart).await?,
            // No conversation yet: nothing to flip, nothing to announce.
            None => return Ok(0),
        };

        let event = WsOutboundEvent::MessageSeen {
            sender_id: counterpart,
        };
        fan_out_to_pair(registry, pair, &event.to_json()).await;

        Ok(updated)
    }

    /// Full conversation with `counterpart_username`, oldest first. An empty
    /// list, not an error, when the pair has never exchanged a message.
    pub async fn list_conversation(
        db: &Pool,
        viewer_id: Uuid,
        counterpart_username: &str,
    ) -> AppResult<Vec<StoredMessage>> {
        let counterpart_id = UserDirectory::resolve_username(db, counterpart_username).await?;
        SessionStore::list_messages(db, PairKey::new(viewer_id, counterpart_id)).await
    }
}

async fn fan_out_to_pair(registry: &ConnectionRegistry, pair: PairKey, msg: &str) {
    registry.send_to_user(pair.low(), msg).await;
    registry.send_to_user(pair.high(), msg).await;
}

fn ensure_distinct(sender_id: Uuid, receiver_id: Uuid) -> AppResult<()> {
    if sender_id == receiver_id {
        return Err(AppError::Validation(
            "sender and receiver must be different users".into(),
        ));
    }
    Ok(())
}

fn require_field(value: Option<String>, name: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{name} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_field_rejects_missing_and_empty() {
        assert!(require_field(None, "fileName").is_err());
        assert!(require_field(Some(String::new()), "fileName").is_err());
        assert_eq!(
            require_field(Some("a.png".into()), "fileName").unwrap(),
            "a.png"
        );
    }

    #[test]
    fn missing_field_error_names_the_field() {
        let err = require_field(None, "fileType").unwrap_err();
        assert!(err.to_string().contains("fileType"));
    }

    #[test]
    fn same_sender_and_receiver_is_a_validation_error() {
        let id = Uuid::new_v4();
        assert!(matches!(
            ensure_distinct(id, id),
            Err(AppError::Validation(_))
        ));
        assert!(ensure_distinct(id, Uuid::new_v4()).is_ok());
    }
}
