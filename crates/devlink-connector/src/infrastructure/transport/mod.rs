//! Transport adapters.
//!
//! Only an in-memory adapter ships here; a broker-backed transport
//! implements [`Transport`](crate::application::ports::Transport) in the
//! embedding application.

pub mod memory;

pub use memory::InMemoryTransport;
