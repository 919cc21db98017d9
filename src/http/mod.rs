//! Local HTTP API for controlling a session and reading its state
//!
//! - POST /session/start - Start a session (optionally choosing a voice)
//! - POST /session/stop - Stop it and return final stats
//! - GET /session/status - Connection state, AI speaking flag, loudness, stats
//! - GET /session/transcript - Turns flushed so far
//! - GET /voices - Known voice identities
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
