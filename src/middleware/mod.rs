pub mod auth;
pub mod request_id;

pub use auth::{AuthedUser, JwtVerifier, TokenVerifier};
pub use request_id::RequestId;
