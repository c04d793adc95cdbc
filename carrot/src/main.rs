//! Carrot is a metric relay between RabbitMQ and InfluxDB.
//!
//! It consumes JSON event messages from a fanout exchange, extracts the named
//! measurements and dimensional tags embedded in each message, and forwards
//! every measurement as a timestamped, tagged point to an InfluxDB v2 bucket.
//!
//! # Workspace Crates
//!
//! Carrot is split into the following workspace crates:
//!
//!  - `carrot`: Main entry point and command line interface.
//!  - `carrot-config`: Static configuration for the CLI and relay.
//!  - `carrot-log`: Logging facade and setup.
//!  - `carrot-metrics`: Metric protocol and message extraction.
//!  - `carrot-server`: Broker consumer, delivery loop, and store adapter.

mod cli;
mod setup;

use std::process;

use carrot_log::LogError;

pub fn main() {
    let exit_code = match cli::execute() {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {}", LogError(&*error));
            1
        }
    };

    process::exit(exit_code);
}
