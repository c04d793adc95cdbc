//! Logging facade for Carrot.
//!
//! # Setup
//!
//! To enable logging, invoke the [`init`] function with a [`LogConfig`]. The
//! configuration implements `serde` traits, so it can be obtained from the
//! configuration file.
//!
//! ```
//! let config = carrot_log::LogConfig::default();
//! carrot_log::init(&config);
//! ```
//!
//! # Conventions
//!
//! Log messages should start lowercase and end without punctuation. Prefer
//! short and precise log messages over verbose text. Choose the log level
//! according to these rules:
//!
//! - [`error!`] for bugs and invalid behavior.
//! - [`warn!`] for undesirable behavior.
//! - [`info!`] for messages relevant to the average user.
//! - [`debug!`] for messages usually relevant to debugging.
//! - [`trace!`] for full auxiliary information.
//!
//! # Logging error types
//!
//! To log errors with their full cause chain, use the [`LogError`] wrapper:
//!
//! ```
//! use carrot_log::LogError;
//!
//! if let Err(error) = std::env::var("FOO") {
//!     carrot_log::error!("env failed: {}", LogError(&error));
//! }
//! ```

#![warn(missing_docs)]

mod setup;
pub use setup::*;

mod utils;
pub use utils::*;

// Expose the minimal tracing facade.
#[doc(inline)]
pub use tracing::{debug, error, info, trace, warn};
