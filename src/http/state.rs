use crate::display::SharedDisplay;
use crate::session::{SessionConfig, SessionHandle};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Settings every new session starts from
    pub base_config: Arc<SessionConfig>,

    /// Presentation state of the current (or last) session
    pub display: Arc<SharedDisplay>,

    /// The running session, if any (one at a time)
    pub active: Arc<Mutex<Option<SessionHandle>>>,
}

impl AppState {
    pub fn new(base_config: SessionConfig) -> Self {
        Self {
            base_config: Arc::new(base_config),
            display: Arc::new(SharedDisplay::new()),
            active: Arc::new(Mutex::new(None)),
        }
    }
}
