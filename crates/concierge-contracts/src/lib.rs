// Public contracts for the concierge chat gateway
// This crate defines the wire DTOs shared by the API surface, the turn
// pipeline, and the session store document format.

pub mod chat;
pub mod error;
pub mod session;

pub use chat::*;
pub use error::*;
pub use session::*;
