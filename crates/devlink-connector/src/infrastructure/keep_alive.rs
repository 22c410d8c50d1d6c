//! Periodic keep-alive pings on a tokio interval.
//!
//! Pings go straight to the transport and are never queued: a ping that
//! cannot be sent now is worthless later.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use devlink_core::WireMessage;

use crate::application::ports::{KeepAlive, Transport};

/// Interval between pings when none is configured.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// Publishes a ping every `interval` while the transport is connected.
pub struct KeepAliveService {
    transport: Arc<dyn Transport>,
    ping: WireMessage,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl KeepAliveService {
    /// `ping` is the device's keep-alive message, from
    /// [`Codec::encode_keep_alive`](devlink_core::Codec::encode_keep_alive).
    pub fn new(transport: Arc<dyn Transport>, ping: WireMessage, interval: Duration) -> Self {
        Self {
            transport,
            ping,
            interval,
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task_slot()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn task_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeepAlive for KeepAliveService {
    /// Spawns the ping task on the current tokio runtime.  Calling `start`
    /// while already running does nothing.
    fn start(&self) {
        let mut slot = self.task_slot();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime available, keep-alive not started");
            return;
        };

        let transport = Arc::clone(&self.transport);
        let ping = self.ping.clone();
        let period = self.interval;
        *slot = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if !transport.connected() {
                    continue;
                }
                if !transport.publish(&ping) {
                    debug!(topic = ping.topic(), "keep-alive ping refused");
                }
            }
        }));
        info!(interval_secs = period.as_secs(), "keep-alive started");
    }

    fn stop(&self) {
        if let Some(task) = self.task_slot().take() {
            task.abort();
            info!("keep-alive stopped");
        }
    }
}

impl Drop for KeepAliveService {
    fn drop(&mut self) {
        if let Some(task) = self.task_slot().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::InMemoryTransport;

    fn service(transport: &Arc<InMemoryTransport>) -> KeepAliveService {
        KeepAliveService::new(
            Arc::clone(transport) as Arc<dyn Transport>,
            WireMessage::empty("ping/dev1"),
            DEFAULT_KEEP_ALIVE_INTERVAL,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_pings_once_per_interval_while_connected() {
        // Arrange
        let transport = Arc::new(InMemoryTransport::new());
        transport.connect().expect("connect should succeed");
        let keep_alive = service(&transport);

        // Act
        keep_alive.start();
        tokio::time::sleep(Duration::from_secs(125)).await;

        // Assert: ticks at 0s, 60s and 120s
        assert_eq!(transport.published_topics(), vec!["ping/dev1"; 3]);
        assert!(keep_alive.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_pings() {
        // Arrange
        let transport = Arc::new(InMemoryTransport::new());
        transport.connect().expect("connect should succeed");
        let keep_alive = service(&transport);
        keep_alive.start();
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Act
        keep_alive.stop();
        tokio::time::sleep(Duration::from_secs(300)).await;

        // Assert
        assert_eq!(transport.published().len(), 1);
        assert!(!keep_alive.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pings_while_disconnected() {
        let transport = Arc::new(InMemoryTransport::new());
        let keep_alive = service(&transport);

        keep_alive.start();
        tokio::time::sleep(Duration::from_secs(130)).await;

        assert!(transport.published().is_empty());
    }

    #[test]
    fn test_start_without_runtime_does_not_panic() {
        let transport = Arc::new(InMemoryTransport::new());
        let keep_alive = service(&transport);

        keep_alive.start();

        assert!(!keep_alive.is_running());
    }
}
