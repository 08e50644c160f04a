use uuid::Uuid;

use crate::websocket::message_types::WsOutboundEvent;
use crate::websocket::ConnectionRegistry;

/// Relays typing signals to the receiver's broadcast group.
///
/// Deliberately stateless: expiry is the sending client's 2000 ms keystroke
/// timer, which emits the stop signal itself. Nothing is persisted and
/// nothing is echoed back to the sender, so a crash can at worst leave a
/// stale indicator until the client's timer fires.
pub struct TypingCoordinator;

impl TypingCoordinator {
    pub async fn typing_started(
        registry: &ConnectionRegistry,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) {
        let event = WsOutboundEvent::Typing {
            sender_id,
            receiver_id,
        };
        registry.send_to_user(receiver_id, &event.to_json()).await;
    }

    pub async fn typing_stopped(
        registry: &ConnectionRegistry,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) {
        let event = WsOutboundEvent::StopTyping {
            sender_id,
            receiver_id,
        };
        registry.send_to_user(receiver_id, &event.to_json()).await;
    }
}
