//! Metric protocol and message extraction for Carrot.
//!
//! This crate implements the normalization contract of the relay: turning an
//! opaque JSON message body into a sequence of canonical [`Metric`] records.
//! A message is a flat JSON object carrying string-valued tag fields plus a
//! `metrics` array of embedded measurements:
//!
//! ```json
//! {
//!   "host": "s1",
//!   "region": "eu-1",
//!   "_trace": "ignored",
//!   "metrics": [
//!     {"name": "cpu", "value": 0.75, "time": "2023-10-15T14:30:45Z"}
//!   ]
//! }
//! ```
//!
//! Keys prefixed with an underscore are reserved for transport metadata and
//! dropped. All other top-level keys must hold strings and become the tag set
//! shared by every metric in the message. See [`extract`] for the full set of
//! rules and failure modes.

#![warn(missing_docs)]

mod extract;
mod protocol;
mod timestamp;

pub use extract::*;
pub use protocol::*;
pub use timestamp::*;
