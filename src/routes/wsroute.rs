use crate::error::{AppError, AppResult};
use crate::middleware::auth::bearer_token;
use crate::services::{MessageRouter, TypingCoordinator};
use crate::state::AppState;
use crate::websocket::message_types::{WsInboundEvent, WsOutboundEvent};
use crate::websocket::SubscriberId;
use actix::{
    Actor, ActorContext, Addr, AsyncContext, Handler, Message as ActixMessage, StreamHandler,
};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Text frame pushed into the connection from a broadcast group.
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct Fanout(String);

/// One authenticated WebSocket connection.
///
/// The connection is bound to the user's broadcast group before the actor
/// starts; the actor only relays frames and keeps the heartbeat. Cleanup in
/// `stopped` unregisters exactly this connection and walks presence back.
struct WsSession {
    user_id: Uuid,
    subscriber_id: SubscriberId,
    state: AppState,
    hb: Instant,
}

impl WsSession {
    fn new(user_id: Uuid, subscriber_id: SubscriberId, state: AppState) -> Self {
        Self {
            user_id,
            subscriber_id,
            state,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let interval = self.state.config.heartbeat_interval;
        let timeout = self.state.config.client_timeout;
        ctx.run_interval(interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                tracing::warn!(user_id = %act.user_id, "heartbeat timeout, dropping connection");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "websocket session started");
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "websocket session stopped");

        let state = self.state.clone();
        let user_id = self.user_id;
        let subscriber_id = self.subscriber_id;

        tokio::spawn(async move {
            state.registry.remove_subscriber(user_id, subscriber_id).await;

            if state.presence.connection_closed(user_id).await {
                let event = WsOutboundEvent::UserOffline { user_id };
                state.registry.broadcast_all(&event.to_json()).await;
            }
        });
    }
}

impl Handler<Fanout> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Fanout, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<WsInboundEvent>(&text) {
                Ok(evt) => {
                    let state = self.state.clone();
                    let user_id = self.user_id;
                    let addr = ctx.address();
                    tokio::spawn(async move {
                        handle_ws_event(state, user_id, evt, addr).await;
                    });
                }
                Err(e) => {
                    tracing::warn!(user_id = %self.user_id, error = %e, "unparseable ws event");
                    let event = WsOutboundEvent::Error {
                        event: "parse".into(),
                        message: "malformed event".into(),
                    };
                    ctx.text(event.to_json());
                }
            },
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!(user_id = %self.user_id, "binary frames not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(user_id = %self.user_id, ?reason, "close frame received");
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, error = %e, "ws protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}

fn inbound_event_name(evt: &WsInboundEvent) -> &'static str {
    match evt {
        WsInboundEvent::Typing { .. } => "typing",
        WsInboundEvent::StopTyping { .. } => "stopTyping",
        WsInboundEvent::SendFile { .. } => "sendFile",
        WsInboundEvent::MarkAsSeen { .. } => "markAsSeen",
    }
}

/// Route one inbound event. Failures are answered with an `error` event on
/// the originating connection instead of being logged and dropped.
async fn handle_ws_event(
    state: AppState,
    user_id: Uuid,
    evt: WsInboundEvent,
    addr: Addr<WsSession>,
) {
    let event_name = inbound_event_name(&evt);

    let result: AppResult<()> = match evt {
        WsInboundEvent::Typing { receiver_id } => {
            TypingCoordinator::typing_started(&state.registry, user_id, receiver_id).await;
            Ok(())
        }
        WsInboundEvent::StopTyping { receiver_id } => {
            TypingCoordinator::typing_stopped(&state.registry, user_id, receiver_id).await;
            Ok(())
        }
        WsInboundEvent::SendFile {
            receiver_id,
            file_name,
            file_type,
            file_data,
        } => MessageRouter::send_file(
            &state.db,
            &state.registry,
            user_id,
            receiver_id,
            file_name,
            file_type,
            file_data,
        )
        .await
        .map(|_| ()),
        WsInboundEvent::MarkAsSeen { sender_id } => {
            MessageRouter::mark_seen(&state.db, &state.registry, user_id, sender_id)
                .await
                .map(|_| ())
        }
    };

    if let Err(e) = result {
        tracing::warn!(%user_id, event = event_name, error = %e, "ws event rejected");
        let message = match &e {
            AppError::Database(_) | AppError::Internal | AppError::StartServer(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let event = WsOutboundEvent::Error {
            event: event_name.into(),
            message,
        };
        addr.do_send(Fanout(event.to_json()));
    }
}

/// WebSocket entry point.
///
/// The token is verified before the upgrade; a connection that fails
/// authentication is answered 401 with no detail and never reaches the
/// event loop.
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let token = query.into_inner().token.or_else(|| bearer_token(&req));
    let user_id = match token {
        Some(t) => match state.verifier.verify(&t).await {
            Ok(id) => id,
            Err(_) => return Ok(HttpResponse::Unauthorized().finish()),
        },
        None => return Ok(HttpResponse::Unauthorized().finish()),
    };

    // Bind to the user's broadcast group and walk presence forward before
    // the actor starts, so no fan-out can slip between auth and binding.
    let (subscriber_id, mut rx) = state.registry.add_subscriber(user_id).await;

    if state.presence.connection_opened(user_id).await {
        let event = WsOutboundEvent::UserOnline { user_id };
        state.registry.broadcast_all(&event.to_json()).await;
    }

    let snapshot = WsOutboundEvent::OnlineUsers {
        users: state.presence.snapshot().await,
    };

    let session = WsSession::new(user_id, subscriber_id, state.as_ref().clone());
    let started = ws::WsResponseBuilder::new(session, &req, stream)
        .frame_size(state.config.max_frame_bytes)
        .start_with_addr();

    let (addr, resp) = match started {
        Ok(ok) => ok,
        Err(e) => {
            // Roll the binding back; `stopped` will never run for this one.
            state.registry.remove_subscriber(user_id, subscriber_id).await;
            if state.presence.connection_closed(user_id).await {
                let event = WsOutboundEvent::UserOffline { user_id };
                state.registry.broadcast_all(&event.to_json()).await;
            }
            return Err(e);
        }
    };

    // Presence snapshot goes to this connection only.
    addr.do_send(Fanout(snapshot.to_json()));

    // Bridge the broadcast group into the actor. The loop ends when the
    // subscriber is removed in `stopped`, which drops the sender.
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            addr.do_send(Fanout(msg));
        }
    });

    Ok(resp)
}
