//! Error types for the harness
//!
//! Nothing here is recovered locally. Every variant travels up to `main`
//! and ends the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// The serial device could not be opened.
    #[error("failed to open serial port {path}")]
    Connection {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// The controller sent a line that is neither `f<digits>` nor `o<digits>`.
    #[error("unrecognized controller line: {line:?}")]
    Protocol { line: String },

    /// The port reported end of input.
    #[error("serial link closed")]
    LinkClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub fn protocol(line: &str) -> Self {
        Self::Protocol {
            line: line.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_message_quotes_line() {
        let err = HarnessError::protocol("xyz");
        assert_eq!(err.to_string(), "unrecognized controller line: \"xyz\"");
    }

    #[test]
    fn test_io_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: HarnessError = io.into();
        assert!(matches!(err, HarnessError::Io(_)));
    }
}
