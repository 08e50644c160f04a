pub mod message_router;
pub mod presence;
pub mod session_store;
pub mod typing;
pub mod user_directory;

pub use message_router::MessageRouter;
pub use presence::PresenceTracker;
pub use session_store::SessionStore;
pub use typing::TypingCoordinator;
pub use user_directory::UserDirectory;
