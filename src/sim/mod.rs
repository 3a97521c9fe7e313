//! Discrete-event load simulation
//!
//! Two tasks share the link: the generator sends hall calls on a random
//! timer, and the reader reacts to controller status lines. Every trace line
//! that belongs with a serial write is emitted under the same lock as that
//! write, so neither the trace nor the wire ever interleaves mid-event.
//! Simulated travel and door dwell sleep outside the lock.

pub mod generator;
pub mod reader;

pub use reader::{Reader, Step};

use std::io;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tokio::sync::Mutex;

use crate::error::HarnessError;
use crate::protocol::Command;
use crate::serial::{LineStream, SerialConnection};
use crate::trace::{Event, TraceLog};

/// Floors served by the controller, numbered from 1
pub const FLOORS: u32 = 10;

/// One simulation time unit in wall-clock time
pub const TIME_UNIT: Duration = Duration::from_secs(1);

/// Pause after opening the port while the board resets
pub const RESET_PAUSE_UNITS: u32 = 1;

/// Gap between consecutive hall calls
pub const SERVICE_INTERVAL_UNITS: RangeInclusive<u32> = 1..=5;

/// How long the doors stay open
pub const DOOR_DWELL_UNITS: u32 = 2;

/// Passengers boarding at each door opening
pub const PASSENGERS_PER_OPEN: RangeInclusive<usize> = 1..=2;

pub fn units(n: u32) -> Duration {
    TIME_UNIT * n
}

/// Somewhere commands can be written
pub trait CommandSink: Send {
    fn send(&mut self, command: &Command) -> Result<(), HarnessError>;
}

impl CommandSink for SerialConnection {
    fn send(&mut self, command: &Command) -> Result<(), HarnessError> {
        debug!("-> {}", command);
        self.send_command(command)
    }
}

/// The trace and the command sink, guarded together
pub struct Wire {
    sink: Box<dyn CommandSink>,
    trace: TraceLog,
}

pub type SharedWire = Arc<Mutex<Wire>>;

impl Wire {
    pub fn new(sink: Box<dyn CommandSink>, trace: TraceLog) -> Self {
        Self { sink, trace }
    }

    pub fn shared(self) -> SharedWire {
        Arc::new(Mutex::new(self))
    }

    pub fn emit(&mut self, event: Event) -> Result<(), HarnessError> {
        self.trace.emit(event)
    }

    /// Trace `event`, then write `command`
    pub fn emit_and_send(&mut self, event: Event, command: Command) -> Result<(), HarnessError> {
        self.trace.emit(event)?;
        self.sink.send(&command)
    }

    pub fn raw(&mut self, line: &str) -> Result<(), HarnessError> {
        self.trace.raw(line)
    }
}

/// Generator and reader wired to one link
pub struct Harness {
    wire: SharedWire,
    generator_rng: Pcg64,
    reader_rng: Pcg64,
}

impl Harness {
    pub fn new(sink: Box<dyn CommandSink>, trace: TraceLog) -> Self {
        Self {
            wire: Wire::new(sink, trace).shared(),
            generator_rng: Pcg64::from_entropy(),
            reader_rng: Pcg64::from_entropy(),
        }
    }

    #[cfg(test)]
    pub fn with_seed(sink: Box<dyn CommandSink>, trace: TraceLog, seed: u64) -> Self {
        Self {
            wire: Wire::new(sink, trace).shared(),
            generator_rng: Pcg64::seed_from_u64(seed),
            reader_rng: Pcg64::seed_from_u64(seed.wrapping_add(1)),
        }
    }

    /// Run until either task fails
    ///
    /// Neither task ends on its own, so the returned value is always the
    /// first fatal error.
    pub async fn run(self, lines: LineStream) -> Result<(), HarnessError> {
        let mut generator = tokio::spawn(generator::run(self.wire.clone(), self.generator_rng));
        let mut reader = Reader::new(self.wire, self.reader_rng);

        let result = tokio::select! {
            result = reader.run(lines) => result,
            joined = &mut generator => match joined {
                Ok(result) => result,
                Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string()).into()),
            },
        };

        generator.abort();
        result
    }
}
