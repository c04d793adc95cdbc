//! Broker consumer, delivery loop, and store adapter for Carrot.
//!
//! The crate wires the extraction core into its two collaborators: an AMQP
//! consumer delivering raw message bodies with acknowledgment handles, and an
//! InfluxDB write endpoint receiving the extracted metrics. The [`Relay`]
//! delivery loop in between enforces the acknowledgment discipline: a message
//! is acknowledged if and only if every metric extracted from it was
//! forwarded to the store.

#![warn(missing_docs)]

mod consumer;
mod relay;
mod store;

pub use consumer::*;
pub use relay::*;
pub use store::*;
