//! Application layer of the connector.
//!
//! Nothing here touches sockets, timers, or storage directly.  Every
//! device- or network-facing concern is a trait in [`ports`], injected when
//! the [`connector::Connector`] is built, so the whole layer is unit-testable
//! with in-memory doubles.
//!
//! # Sub-modules
//!
//! - **`connector`** – Publish-or-queue for outbound events and the inbound
//!   command router.
//!
//! - **`firmware_update`** – The firmware update state machine, including
//!   chunk hash-chain verification.
//!
//! - **`ports`** – Transport, handler, provider, and keep-alive traits.

pub mod connector;
pub mod firmware_update;
pub mod ports;
