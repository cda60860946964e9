// Concierge gateway HTTP surface
//
// The library exposes the router and the turn controller so integration
// tests can drive the full pipeline with scripted collaborators; the binary
// in main.rs wires the production clients.

pub mod error;
pub mod routes;
pub mod tts;
pub mod turn;

pub use error::ApiError;
pub use routes::{routes, ApiDoc, AppState};
pub use tts::{HttpTtsClient, TtsAudio, TtsClient, TtsError};
pub use turn::TurnController;
