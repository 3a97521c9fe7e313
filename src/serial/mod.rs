//! Serial link to the elevator controller
//!
//! This module provides:
//! - Opening the controller port with fixed framing
//! - Blocking line reads, forwarded to the async side by a reader thread
//! - Listing available serial ports

pub mod port;

pub use port::{PortConfig, SerialConnection};

use std::thread;

use log::debug;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use crate::error::HarnessError;

/// Inbound lines, or the error that ended reading
pub type LineStream = UnboundedReceiver<Result<String, HarnessError>>;

/// Read lines from `conn` on a dedicated thread
///
/// The thread forwards the first read error and then exits. It also exits
/// quietly once the receiving side is dropped.
pub fn spawn_line_reader(mut conn: SerialConnection) -> LineStream {
    let (tx, rx) = unbounded_channel();

    thread::spawn(move || loop {
        let result = conn.read_line();
        let failed = result.is_err();
        if tx.send(result).is_err() || failed {
            debug!("line reader for {} stopped", conn.config().port_path);
            break;
        }
    });

    rx
}
