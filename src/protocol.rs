//! Line protocol spoken with the elevator controller
//!
//! Outbound commands are a letter plus an optional floor, terminated by `\r`.
//! Inbound status lines start with `f` (move to floor) or `o` (doors open)
//! followed by digits. Anything after the digits is ignored.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::HarnessError;

/// Terminator appended to every outbound command
pub const COMMAND_TERMINATOR: char = '\r';

static STATUS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(f|o)([0-9]+)").expect("status pattern is valid"));

/// Travel direction of a service request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_char(self) -> char {
        match self {
            Direction::Up => 'u',
            Direction::Down => 'd',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A command written to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Hall call: someone at `floor` wants to go in `direction`
    Service { direction: Direction, floor: u32 },
    /// Acknowledge that the car reached `floor`
    Arrive(u32),
    /// Passenger inside the car pressed `floor`
    Request(u32),
    /// Close the doors
    Close,
}

impl Command {
    /// Full wire form including the terminator
    pub fn to_wire(&self) -> String {
        format!("{}{}", self, COMMAND_TERMINATOR)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Service { direction, floor } => write!(f, "{}{}", direction, floor),
            Command::Arrive(floor) => write!(f, "a{}", floor),
            Command::Request(floor) => write!(f, "r{}", floor),
            Command::Close => write!(f, "c"),
        }
    }
}

/// A status line received from the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Controller sends the car to a floor
    MoveTo(u32),
    /// Doors opened. The digits that follow are ignored.
    DoorsOpen,
}

impl Status {
    pub fn parse(line: &str) -> Result<Self, HarnessError> {
        let caps = STATUS_PATTERN
            .captures(line)
            .ok_or_else(|| HarnessError::protocol(line))?;

        match &caps[1] {
            "f" => {
                let floor: u32 = caps[2].parse().map_err(|_| HarnessError::protocol(line))?;
                Ok(Status::MoveTo(floor))
            }
            _ => Ok(Status::DoorsOpen),
        }
    }
}
