use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::AuthedUser;
use crate::services::MessageRouter;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_username: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub username: String,
}

/// Send a text message over the request/response channel.
///
/// The `newMessage` fan-out includes the sender's own group so optimistic
/// UIs and other devices reconcile against the persisted row.
#[post("/api/messages")]
pub async fn send_message(
    user: AuthedUser,
    state: web::Data<AppState>,
    body: web::Json<SendMessageRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let stored = MessageRouter::send_text(
        &state.db,
        &state.registry,
        user.id,
        &body.receiver_username,
        body.content,
    )
    .await?;

    Ok(HttpResponse::Created().json(stored))
}

/// Full conversation with the named user, oldest first. 404 when the
/// username is unknown; an empty array when there is no conversation yet.
#[get("/api/messages")]
pub async fn get_messages(
    user: AuthedUser,
    state: web::Data<AppState>,
    query: web::Query<MessagesQuery>,
) -> AppResult<HttpResponse> {
    let messages =
        MessageRouter::list_conversation(&state.db, user.id, &query.username).await?;
    Ok(HttpResponse::Ok().json(messages))
}
