//! Controller status reader
//!
//! Handles one inbound line at a time:
//! - `f<floor>`: trace the move, sleep one unit per floor travelled, then
//!   acknowledge arrival
//! - `o<digits>`: trace the opening, board one or two passengers with random
//!   destinations, hold the doors, then close them
//! - anything else: copy the line to the trace and fail

use log::debug;
use rand::Rng;
use rand_pcg::Pcg64;
use tokio::time::sleep;

use super::{units, SharedWire, DOOR_DWELL_UNITS, FLOORS, PASSENGERS_PER_OPEN};
use crate::error::HarnessError;
use crate::protocol::{Command, Status};
use crate::serial::LineStream;
use crate::trace::Event;

/// What a handled line resulted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Arrived(u32),
    DoorsCycled { requests: usize },
}

pub struct Reader {
    wire: SharedWire,
    current_floor: u32,
    rng: Pcg64,
}

impl Reader {
    /// The car is assumed to start below the first floor.
    pub fn new(wire: SharedWire, rng: Pcg64) -> Self {
        Self {
            wire,
            current_floor: 0,
            rng,
        }
    }

    pub fn current_floor(&self) -> u32 {
        self.current_floor
    }

    /// Consume lines until the stream fails or a line is rejected
    pub async fn run(&mut self, mut lines: LineStream) -> Result<(), HarnessError> {
        loop {
            let line = lines.recv().await.ok_or(HarnessError::LinkClosed)??;
            let step = self.handle_line(&line).await?;
            debug!("{:?}, car at {}", step, self.current_floor());
        }
    }

    pub async fn handle_line(&mut self, line: &str) -> Result<Step, HarnessError> {
        debug!("<- {}", line);

        let status = match Status::parse(line) {
            Ok(status) => status,
            Err(e) => {
                self.wire.lock().await.raw(line)?;
                return Err(e);
            }
        };

        match status {
            Status::MoveTo(target) => self.travel(target).await,
            Status::DoorsOpen => self.cycle_doors().await,
        }
    }

    async fn travel(&mut self, target: u32) -> Result<Step, HarnessError> {
        self.wire.lock().await.emit(Event::Move {
            from: self.current_floor,
        })?;

        sleep(units(self.current_floor.abs_diff(target))).await;

        let mut wire = self.wire.lock().await;
        self.current_floor = target;
        wire.emit_and_send(Event::Arrive { flr: target }, Command::Arrive(target))?;

        Ok(Step::Arrived(target))
    }

    async fn cycle_doors(&mut self) -> Result<Step, HarnessError> {
        let requests = self.rng.gen_range(PASSENGERS_PER_OPEN);
        {
            let mut wire = self.wire.lock().await;
            wire.emit(Event::Open)?;
            for _ in 0..requests {
                let floor = self.rng.gen_range(1..=FLOORS);
                wire.emit_and_send(Event::Request { flr: floor }, Command::Request(floor))?;
            }
        }

        sleep(units(DOOR_DWELL_UNITS)).await;

        // Close is traced and sent as one unit so a hall call cannot land between them.
        self.wire
            .lock()
            .await
            .emit_and_send(Event::Close, Command::Close)?;

        Ok(Step::DoorsCycled { requests })
    }
}
