use std::sync::{Arc, Mutex};

/// Connection status derived from real transport events. `Open -> Closed`
/// is reachable from explicit disconnect, remote close, or transport error;
/// a closed client stays closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Shared handle the send/recv tasks use to publish transport events.
#[derive(Clone, Default)]
pub(crate) struct SharedState(Arc<Mutex<ConnectionState>>);

impl SharedState {
    pub fn get(&self) -> ConnectionState {
        self.0
            .lock()
            .map(|guard| *guard)
            .unwrap_or(ConnectionState::Closed)
    }

    pub fn set(&self, state: ConnectionState) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = state;
        }
    }
}
