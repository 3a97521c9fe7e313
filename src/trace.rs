//! Timestamped event trace
//!
//! Every observed or generated event becomes one JSON object per line, e.g.
//! `{"tag":"arrive","flr":5,"time":5012.4}`. `time` is milliseconds since the
//! trace origin, which is taken once the controller has finished resetting.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tokio::time::Instant;

use crate::error::HarnessError;
use crate::protocol::Direction;

/// One entry of the trace, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum Event {
    /// A hall call was sent
    Service { dir: Direction, flr: u32 },
    /// The controller ordered a move; `from` is the floor being left
    Move { from: u32 },
    /// Simulated travel finished
    Arrive { flr: u32 },
    /// Doors opened
    Open,
    /// A passenger picked a destination
    Request { flr: u32 },
    /// Doors closed
    Close,
}

impl Serialize for Direction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.as_char())
    }
}

#[derive(Serialize)]
struct Record<'a> {
    #[serde(flatten)]
    event: &'a Event,
    time: f64,
}

/// Writes trace lines to stdout and any extra sinks
pub struct TraceLog {
    origin: Instant,
    outputs: Vec<Box<dyn Write + Send>>,
}

impl TraceLog {
    /// Start a trace whose clock reads zero now
    pub fn new(output: Box<dyn Write + Send>) -> Self {
        Self {
            origin: Instant::now(),
            outputs: vec![output],
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Also copy every line into `path`, truncating it first
    pub fn with_file(mut self, path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        self.outputs.push(Box::new(BufWriter::new(file)));
        Ok(self)
    }

    /// Milliseconds since the origin
    pub fn elapsed_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    pub fn emit(&mut self, event: Event) -> Result<(), HarnessError> {
        let record = Record {
            event: &event,
            time: self.elapsed_ms(),
        };
        let line = serde_json::to_string(&record).map_err(io::Error::from)?;
        self.write_line(&line)
    }

    /// Write an inbound line exactly as received
    pub fn raw(&mut self, line: &str) -> Result<(), HarnessError> {
        self.write_line(line)
    }

    fn write_line(&mut self, line: &str) -> Result<(), HarnessError> {
        for out in &mut self.outputs {
            writeln!(out, "{}", line)?;
            out.flush()?;
        }
        Ok(())
    }
}
