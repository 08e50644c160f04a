//! Postgres-backed tests for the session store and message router.
//!
//! Run with a disposable database:
//!   TEST_DATABASE_URL=postgres://localhost/pairchat_test \
//!     cargo test -- --ignored

use deadpool_postgres::Pool;
use futures::future::join_all;
use uuid::Uuid;

use pairchat_service::db;
use pairchat_service::error::AppError;
use pairchat_service::models::{NewMessage, PairKey};
use pairchat_service::services::{MessageRouter, SessionStore};
use pairchat_service::websocket::ConnectionRegistry;

async fn test_pool() -> Pool {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a disposable database");
    db::init_pool(&url).await.expect("connect test database")
}

async fn create_user(pool: &Pool, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    let client = pool.get().await.unwrap();
    client
        .execute(
            "INSERT INTO users (id, username) VALUES ($1, $2)",
            &[&id, &username],
        )
        .await
        .unwrap();
    id
}

fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn resolve_is_order_independent() {
    let pool = test_pool().await;
    let a = create_user(&pool, &unique_name("alice")).await;
    let b = create_user(&pool, &unique_name("bob")).await;

    let ab = SessionStore::resolve(&pool, a, b).await.unwrap();
    let ba = SessionStore::resolve(&pool, b, a).await.unwrap();
    assert_eq!(ab.id, ba.id);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn concurrent_first_contact_creates_one_session() {
    let pool = test_pool().await;
    let a = create_user(&pool, &unique_name("alice")).await;
    let b = create_user(&pool, &unique_name("bob")).await;

    let resolves = (0..10).map(|i| {
        let pool = pool.clone();
        async move {
            // Alternate argument order across racers.
            let (x, y) = if i % 2 == 0 { (a, b) } else { (b, a) };
            SessionStore::resolve(&pool, x, y).await
        }
    });
    let handles: Vec<_> = join_all(resolves)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let first = handles[0].id;
    assert!(handles.iter().all(|h| h.id == first));

    let pair = PairKey::new(a, b);
    let client = pool.get().await.unwrap();
    let row = client
        .query_one(
            "SELECT COUNT(*) FROM chat_sessions WHERE user_low = $1 AND user_high = $2",
            &[&pair.low(), &pair.high()],
        )
        .await
        .unwrap();
    let count: i64 = row.get(0);
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn appends_are_ordered_and_timestamps_non_decreasing() {
    let pool = test_pool().await;
    let a = create_user(&pool, &unique_name("alice")).await;
    let b = create_user(&pool, &unique_name("bob")).await;

    let handle = SessionStore::resolve(&pool, a, b).await.unwrap();
    for i in 0..5 {
        SessionStore::append(&pool, &handle, NewMessage::text(a, b, format!("msg {i}")))
            .await
            .unwrap();
    }

    let messages = SessionStore::list_messages(&pool, handle.pair).await.unwrap();
    assert_eq!(messages.len(), 5);
    for pair in messages.windows(2) {
        assert!(pair[0].sequence_number < pair[1].sequence_number);
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn concurrent_appends_keep_timestamps_non_decreasing() {
    let pool = test_pool().await;
    let a = create_user(&pool, &unique_name("alice")).await;
    let b = create_user(&pool, &unique_name("bob")).await;

    let handle = SessionStore::resolve(&pool, a, b).await.unwrap();

    // Racing appends serialize on the session counter lock; the blocked
    // ones must not keep a pre-wait timestamp.
    let appends = (0..10).map(|i| {
        let pool = pool.clone();
        async move {
            SessionStore::append(&pool, &handle, NewMessage::text(a, b, format!("racing {i}")))
                .await
                .unwrap()
        }
    });
    join_all(appends).await;

    let messages = SessionStore::list_messages(&pool, handle.pair).await.unwrap();
    assert_eq!(messages.len(), 10);
    for pair in messages.windows(2) {
        assert!(pair[0].sequence_number < pair[1].sequence_number);
        assert!(
            pair[0].timestamp <= pair[1].timestamp,
            "timestamp ran backwards across sequence numbers {} -> {}",
            pair[0].sequence_number,
            pair[1].sequence_number
        );
    }
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn mark_seen_is_monotonic_and_idempotent() {
    let pool = test_pool().await;
    let a = create_user(&pool, &unique_name("alice")).await;
    let b = create_user(&pool, &unique_name("bob")).await;

    let handle = SessionStore::resolve(&pool, a, b).await.unwrap();
    SessionStore::append(&pool, &handle, NewMessage::text(a, b, "one".into()))
        .await
        .unwrap();
    SessionStore::append(&pool, &handle, NewMessage::text(a, b, "two".into()))
        .await
        .unwrap();

    // B marks A's messages seen.
    assert_eq!(SessionStore::mark_seen(&pool, &handle, a).await.unwrap(), 2);
    // Re-invocation has no additional effect.
    assert_eq!(SessionStore::mark_seen(&pool, &handle, a).await.unwrap(), 0);

    let messages = SessionStore::list_messages(&pool, handle.pair).await.unwrap();
    assert!(messages.iter().all(|m| m.seen));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn send_text_to_offline_receiver_is_listed_unseen() {
    let pool = test_pool().await;
    let registry = ConnectionRegistry::new();
    let alice_name = unique_name("alice");
    let a = create_user(&pool, &alice_name).await;
    let bob_name = unique_name("bob");
    let b = create_user(&pool, &bob_name).await;

    // B has no live connection; the send must still persist.
    MessageRouter::send_text(&pool, &registry, a, &bob_name, "hi bob".into())
        .await
        .unwrap();

    let conversation = MessageRouter::list_conversation(&pool, b, &alice_name)
        .await
        .unwrap();
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].sender_id, a);
    assert_eq!(conversation[0].content.as_deref(), Some("hi bob"));
    assert!(!conversation[0].seen);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn send_file_missing_field_appends_nothing() {
    let pool = test_pool().await;
    let registry = ConnectionRegistry::new();
    let a = create_user(&pool, &unique_name("alice")).await;
    let b = create_user(&pool, &unique_name("bob")).await;

    let result = MessageRouter::send_file(
        &pool,
        &registry,
        a,
        b,
        None, // fileName omitted
        Some("image/png".into()),
        Some("AAAA".into()),
    )
    .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let messages = SessionStore::list_messages(&pool, PairKey::new(a, b))
        .await
        .unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn unknown_receiver_is_not_found() {
    let pool = test_pool().await;
    let registry = ConnectionRegistry::new();
    let a = create_user(&pool, &unique_name("alice")).await;

    let result =
        MessageRouter::send_text(&pool, &registry, a, "nobody-here", "hello".into()).await;
    assert!(matches!(result, Err(AppError::ReceiverNotFound)));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn self_send_is_rejected_as_validation() {
    let pool = test_pool().await;
    let registry = ConnectionRegistry::new();
    let alice_name = unique_name("alice");
    let a = create_user(&pool, &alice_name).await;

    let result =
        MessageRouter::send_text(&pool, &registry, a, &alice_name, "note to self".into()).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let result = MessageRouter::send_file(
        &pool,
        &registry,
        a,
        a,
        Some("a.png".into()),
        Some("image/png".into()),
        Some("AAAA".into()),
    )
    .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn list_conversation_is_empty_before_first_contact() {
    let pool = test_pool().await;
    let a = create_user(&pool, &unique_name("alice")).await;
    let bob_name = unique_name("bob");
    let _b = create_user(&pool, &bob_name).await;

    let conversation = MessageRouter::list_conversation(&pool, a, &bob_name)
        .await
        .unwrap();
    assert!(conversation.is_empty());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn mark_seen_fans_out_to_both_groups() {
    let pool = test_pool().await;
    let registry = ConnectionRegistry::new();
    let alice_name = unique_name("alice");
    let a = create_user(&pool, &alice_name).await;
    let bob_name = unique_name("bob");
    let b = create_user(&pool, &bob_name).await;

    MessageRouter::send_text(&pool, &registry, a, &bob_name, "hello".into())
        .await
        .unwrap();

    let (_sa, mut rx_a) = registry.add_subscriber(a).await;
    let (_sb, mut rx_b) = registry.add_subscriber(b).await;

    let updated = MessageRouter::mark_seen(&pool, &registry, b, a).await.unwrap();
    assert_eq!(updated, 1);

    for rx in [&mut rx_a, &mut rx_b] {
        let raw = rx.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["type"], "messageSeen");
        assert_eq!(json["senderId"], a.to_string());
    }
}
