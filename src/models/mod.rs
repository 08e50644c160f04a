pub mod message;
pub mod session;

pub use message::{MessageBody, NewMessage, StoredMessage};
pub use session::{PairKey, SessionHandle};
