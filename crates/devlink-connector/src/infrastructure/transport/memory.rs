//! In-memory transport for the simulator and for tests.
//!
//! Records every accepted message instead of sending it anywhere.  Tests
//! toggle it offline or cap how many publishes it accepts to exercise the
//! store-and-forward path without a broker.

use std::sync::{Mutex, MutexGuard, PoisonError};

use devlink_core::WireMessage;

use crate::application::ports::{Transport, TransportError};

#[derive(Debug, Default)]
struct State {
    connected: bool,
    refuse_connect: bool,
    offline: bool,
    /// Remaining publishes to accept; `None` means unlimited.
    publish_budget: Option<usize>,
    published: Vec<WireMessage>,
    connect_attempts: u32,
}

/// A [`Transport`] that keeps published messages in memory.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    state: Mutex<State>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, publishes are refused even when connected and new
    /// connections fail with [`TransportError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Makes subsequent `connect` calls fail.
    pub fn set_refuse_connect(&self, refuse: bool) {
        self.lock().refuse_connect = refuse;
    }

    /// Accepts only the next `budget` publishes, then refuses.  `None`
    /// removes the limit.
    pub fn set_publish_budget(&self, budget: Option<usize>) {
        self.lock().publish_budget = budget;
    }

    /// Messages accepted so far, oldest first.
    pub fn published(&self) -> Vec<WireMessage> {
        self.lock().published.clone()
    }

    pub fn published_topics(&self) -> Vec<String> {
        self.lock()
            .published
            .iter()
            .map(|msg| msg.topic().to_string())
            .collect()
    }

    /// Drains and returns the recorded messages.
    pub fn take_published(&self) -> Vec<WireMessage> {
        std::mem::take(&mut self.lock().published)
    }

    pub fn connect_attempts(&self) -> u32 {
        self.lock().connect_attempts
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for InMemoryTransport {
    fn connect(&self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.connect_attempts += 1;
        if state.refuse_connect {
            return Err(TransportError::ConnectionRefused(
                "in-memory transport set to refuse connections".to_string(),
            ));
        }
        if state.offline {
            return Err(TransportError::Unavailable("in-memory link is down".to_string()));
        }
        state.connected = true;
        Ok(())
    }

    fn disconnect(&self) {
        self.lock().connected = false;
    }

    fn connected(&self) -> bool {
        self.lock().connected
    }

    fn publish(&self, message: &WireMessage) -> bool {
        let mut state = self.lock();
        if !state.connected || state.offline {
            return false;
        }
        if let Some(remaining) = state.publish_budget.as_mut() {
            if *remaining == 0 {
                return false;
            }
            *remaining -= 1;
        }
        state.published.push(message.clone());
        true
    }
}
