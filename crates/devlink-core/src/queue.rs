//! Bounded store-and-forward buffer for outbound messages.
//!
//! # Overflow policy
//!
//! When the queue is full the *incoming* message is dropped and the messages
//! already buffered are kept.  Older data is preserved because it is already
//! ordered ahead of anything new and the platform reconstructs time series
//! from it; the drop is logged at `warn` so it is never silent.
//!
//! The queue itself is not thread-safe.  The connector owns it exclusively
//! and callers serialise access through the connector.

use std::collections::VecDeque;

use tracing::warn;

use crate::protocol::messages::WireMessage;

/// Capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// A FIFO of [`WireMessage`]s holding at most `capacity` entries.
///
/// # Examples
///
/// ```rust
/// use devlink_core::{OutboundQueue, WireMessage};
///
/// let mut queue = OutboundQueue::new(1);
/// assert!(queue.enqueue(WireMessage::empty("ping/dev1")));
/// assert!(!queue.enqueue(WireMessage::empty("ping/dev1")));
/// assert_eq!(queue.len(), 1);
/// ```
#[derive(Debug)]
pub struct OutboundQueue {
    messages: VecDeque<WireMessage>,
    capacity: usize,
}

impl OutboundQueue {
    /// Creates an empty queue.  A capacity of zero drops every message.
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY)),
            capacity,
        }
    }

    /// Appends `message` at the tail.
    ///
    /// Returns `false`, leaving the queue unchanged, if it is already full.
    pub fn enqueue(&mut self, message: WireMessage) -> bool {
        if self.is_full() {
            warn!(
                topic = message.topic(),
                capacity = self.capacity,
                "outbound queue full, dropping message"
            );
            return false;
        }
        self.messages.push_back(message);
        true
    }

    /// The oldest message, without removing it.
    pub fn peek_front(&self) -> Option<&WireMessage> {
        self.messages.front()
    }

    /// Removes and returns the oldest message.
    pub fn pop_front(&mut self) -> Option<WireMessage> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() >= self.capacity
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(n: usize) -> WireMessage {
        WireMessage::text(format!("d2p/sensor_reading/d/dev1/r/R{n}"), "{}")
    }

    #[test]
    fn test_messages_leave_in_arrival_order() {
        // Arrange
        let mut queue = OutboundQueue::new(4);
        for n in 0..3 {
            queue.enqueue(message(n));
        }

        // Act
        let drained: Vec<WireMessage> = std::iter::from_fn(|| queue.pop_front()).collect();

        // Assert
        assert_eq!(drained, vec![message(0), message(1), message(2)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_drops_newest_and_keeps_oldest() {
        // Arrange
        let mut queue = OutboundQueue::new(2);
        assert!(queue.enqueue(message(0)));
        assert!(queue.enqueue(message(1)));

        // Act
        let accepted = queue.enqueue(message(2));

        // Assert
        assert!(!accepted);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek_front(), Some(&message(0)));
        queue.pop_front();
        assert_eq!(queue.pop_front(), Some(message(1)));
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut queue = OutboundQueue::new(2);
        queue.enqueue(message(7));

        assert_eq!(queue.peek_front(), Some(&message(7)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut queue = OutboundQueue::new(0);

        assert!(queue.is_full());
        assert!(!queue.enqueue(message(0)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_default_capacity() {
        let queue = OutboundQueue::default();

        assert_eq!(queue.capacity(), DEFAULT_QUEUE_CAPACITY);
        assert!(queue.peek_front().is_none());
    }
}
