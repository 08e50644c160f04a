use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{MessageBody, NewMessage, PairKey, SessionHandle, StoredMessage};

/// Durable store of one chat session per unordered user pair.
///
/// The unique constraint on `(user_low, user_high)` is the only
/// cross-process concurrency guard in the system: concurrent first contact
/// resolves through insert-if-absent plus one conflict re-read, never
/// find-then-save.
pub struct SessionStore;

impl SessionStore {
    /// Find or create the session for an unordered pair.
    pub async fn resolve(db: &Pool, a: Uuid, b: Uuid) -> AppResult<SessionHandle> {
        let pair = PairKey::new(a, b);
        let client = db.get().await?;

        let inserted = client
            .query_opt(
                r#"
                INSERT INTO chat_sessions (id, user_low, user_high)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_low, user_high) DO NOTHING
                RETURNING id
                "#,
                &[&Uuid::new_v4(), &pair.low(), &pair.high()],
            )
            .await?;

        if let Some(row) = inserted {
            return Ok(SessionHandle { id: row.get(0), pair });
        }

        // Lost the insert race (or the session already existed): re-read.
        let row = client
            .query_opt(
                "SELECT id FROM chat_sessions WHERE user_low = $1 AND user_high = $2",
                &[&pair.low(), &pair.high()],
            )
            .await?
            .ok_or_else(|| AppError::Database("session vanished after conflict".into()))?;

        Ok(SessionHandle { id: row.get(0), pair })
    }

    /// Non-creating lookup, used by the read paths.
    pub async fn find(db: &Pool, pair: PairKey) -> AppResult<Option<SessionHandle>> {
        let client = db.get().await?;
        let row = client
            .query_opt(
                "SELECT id FROM chat_sessions WHERE user_low = $1 AND user_high = $2",
                &[&pair.low(), &pair.high()],
            )
            .await?;
        Ok(row.map(|r| SessionHandle { id: r.get(0), pair }))
    }

    /// Append a message, assigning id, sequence number and timestamp.
    ///
    /// The counter CTE serializes appends per session, so sequence numbers
    /// are strictly increasing. The timestamp is `clock_timestamp()`, read
    /// after the counter lock is acquired; `now()` would be the statement
    /// start time and could run backwards relative to sequence order when
    /// an append blocks on the lock.
    pub async fn append(
        db: &Pool,
        handle: &SessionHandle,
        message: NewMessage,
    ) -> AppResult<StoredMessage> {
        let (content, file_name, file_type, file_data, is_file) = match &message.body {
            MessageBody::Text { content } => (Some(content.as_str()), None, None, None, false),
            MessageBody::File {
                file_name,
                file_type,
                file_data,
            } => (
                None,
                Some(file_name.as_str()),
                Some(file_type.as_str()),
                Some(file_data.as_str()),
                true,
            ),
        };

        let client = db.get().await?;
        let row = client
            .query_one(
                r#"
                WITH next AS (
                    INSERT INTO session_counters (session_id, last_seq)
                    VALUES ($2, 1)
                    ON CONFLICT (session_id)
                    DO UPDATE SET last_seq = session_counters.last_seq + 1
                    RETURNING last_seq
                )
                INSERT INTO messages (
                    id, session_id, sender_id, receiver_id,
                    content, file_name, file_type, file_data,
                    is_file, sequence_number, timestamp
                )
                SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, next.last_seq,
                       clock_timestamp()
                FROM next
                RETURNING id, sender_id, receiver_id, content,
                          file_name, file_type, file_data,
                          is_file, seen, sequence_number, timestamp
                "#,
                &[
                    &Uuid::new_v4(),
                    &handle.id,
                    &message.sender_id,
                    &message.receiver_id,
                    &content,
                    &file_name,
                    &file_type,
                    &file_data,
                    &is_file,
                ],
            )
            .await?;

        Ok(row_to_message(&row))
    }

    /// Full conversation for a pair, in append order. Empty when no session
    /// exists yet.
    pub async fn list_messages(db: &Pool, pair: PairKey) -> AppResult<Vec<StoredMessage>> {
        let client = db.get().await?;
        let rows = client
            .query(
                r#"
                SELECT m.id, m.sender_id, m.receiver_id, m.content,
                       m.file_name, m.file_type, m.file_data,
                       m.is_file, m.seen, m.sequence_number, m.timestamp
                FROM messages m
                JOIN chat_sessions s ON s.id = m.session_id
                WHERE s.user_low = $1 AND s.user_high = $2
                ORDER BY m.sequence_number
                "#,
                &[&pair.low(), &pair.high()],
            )
            .await?;

        Ok(rows.iter().map(row_to_message).collect())
    }

    /// Flip `seen` for all still-unseen messages authored by `counterpart_id`.
    ///
    /// Idempotent: the `NOT seen` predicate makes re-invocation a no-op, and
    /// nothing ever flips seen back to false.
    pub async fn mark_seen(
        db: &Pool,
        handle: &SessionHandle,
        counterpart_id: Uuid,
    ) -> AppResult<u64> {
        let client = db.get().await?;
        let updated = client
            .execute(
                "UPDATE messages SET seen = TRUE
                 WHERE session_id = $1 AND sender_id = $2 AND NOT seen",
                &[&handle.id, &counterpart_id],
            )
            .await?;
        Ok(updated)
    }
}

fn row_to_message(row: &Row) -> StoredMessage {
    StoredMessage {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        content: row.get("content"),
        file_name: row.get("file_name"),
        file_type: row.get("file_type"),
        file_data: row.get("file_data"),
        is_file: row.get("is_file"),
        seen: row.get("seen"),
        sequence_number: row.get("sequence_number"),
        timestamp: row.get("timestamp"),
    }
}
