//! Hall call generator
//!
//! Sleeps a random number of units, then sends a call for a random floor and
//! direction. Runs until a write fails.

use rand::Rng;
use rand_pcg::Pcg64;
use tokio::time::sleep;

use super::{units, SharedWire, FLOORS, SERVICE_INTERVAL_UNITS};
use crate::error::HarnessError;
use crate::protocol::{Command, Direction};
use crate::trace::Event;

/// Pick a uniformly random direction and floor
pub fn next_call<R: Rng>(rng: &mut R) -> (Direction, u32) {
    let direction = if rng.gen_bool(0.5) {
        Direction::Up
    } else {
        Direction::Down
    };
    (direction, rng.gen_range(1..=FLOORS))
}

pub async fn run(wire: SharedWire, mut rng: Pcg64) -> Result<(), HarnessError> {
    loop {
        sleep(units(rng.gen_range(SERVICE_INTERVAL_UNITS))).await;

        let mut wire = wire.lock().await;
        let (direction, floor) = next_call(&mut rng);
        wire.emit_and_send(
            Event::Service {
                dir: direction,
                flr: floor,
            },
            Command::Service { direction, floor },
        )?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::testing::recording_wire;
    use rand::SeedableRng;
    use tokio::time::timeout;

    #[test]
    fn test_next_call_covers_range() {
        let mut rng = Pcg64::seed_from_u64(42);
        let mut floors = [0usize; FLOORS as usize + 1];
        let mut ups = 0;

        for _ in 0..2000 {
            let (direction, floor) = next_call(&mut rng);
            assert!((1..=FLOORS).contains(&floor));
            floors[floor as usize] += 1;
            if direction == Direction::Up {
                ups += 1;
            }
        }

        assert_eq!(floors[0], 0);
        assert!(floors[1..].iter().all(|&n| n > 0));
        assert!(ups > 800 && ups < 1200, "ups = {}", ups);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced_one_to_five_units() {
        let (wire, sink, buffer) = recording_wire();

        let outcome = timeout(units(60), run(wire, Pcg64::seed_from_u64(9))).await;
        assert!(outcome.is_err());

        let records = buffer.records();
        let sent = sink.sent();
        assert!(!records.is_empty());
        assert_eq!(records.len(), sent.len());

        let mut previous = 0.0;
        for (record, wire_text) in records.iter().zip(&sent) {
            assert_eq!(record["tag"], "service");
            let expected = format!(
                "{}{}\r",
                record["dir"].as_str().unwrap(),
                record["flr"].as_u64().unwrap()
            );
            assert_eq!(&expected, wire_text);

            let time = record["time"].as_f64().unwrap();
            let gap = time - previous;
            assert!(gap >= 999.0 && gap <= 5001.0, "gap {} ms", gap);
            previous = time;
        }
    }
}
