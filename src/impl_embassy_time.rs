use crate::TickSource;
use core::cell::Cell;
use critical_section::Mutex;

/// The unit one tick of an [`EmbassyTimeTicks`] counts.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickUnit {
    /// Native `embassy_time` ticks, see [`embassy_time::TICK_HZ`].
    Ticks,
    Micros,
    #[default]
    Millis,
}

/// A wrapping 32-bit tick counter on top of `embassy_time::Instant`.
///
/// The counter reads `offset` at its origin and counts up in `unit` from there.
pub struct EmbassyTimeTicks {
    origin: Mutex<Cell<u64>>,
    unit: TickUnit,
    offset: u32,
}

impl EmbassyTimeTicks {
    pub fn new(unit: TickUnit) -> Self {
        Self::with_offset(unit, 0)
    }

    /// A counter reading `offset` now. An offset close to `u32::MAX` makes the counter
    /// wrap around soon.
    pub fn with_offset(unit: TickUnit, offset: u32) -> Self {
        Self {
            origin: Mutex::new(Cell::new(embassy_time::Instant::now().as_ticks())),
            unit,
            offset,
        }
    }

    pub fn unit(&self) -> TickUnit {
        self.unit
    }

    /// Move the origin to now, so the counter reads the offset again.
    pub fn restart(&self) {
        let now = embassy_time::Instant::now();
        critical_section::with(|cs| self.origin.borrow(cs).set(now.as_ticks()));
    }

    fn get_instant(&self) -> embassy_time::Instant {
        let ticks = critical_section::with(|cs| self.origin.borrow(cs).get());
        embassy_time::Instant::from_ticks(ticks)
    }
}

impl TickSource for EmbassyTimeTicks {
    fn now_ticks(&self) -> u32 {
        let elapsed = self.get_instant().elapsed();
        let count = match self.unit {
            TickUnit::Ticks => elapsed.as_ticks(),
            TickUnit::Micros => elapsed.as_micros(),
            TickUnit::Millis => elapsed.as_millis(),
        };
        // Truncation is the wraparound of the counter.
        (count as u32).wrapping_add(self.offset)
    }

    fn tickrate(&self) -> u32 {
        match self.unit {
            TickUnit::Ticks => embassy_time::TICK_HZ.try_into().unwrap_or(u32::MAX),
            TickUnit::Micros => 1_000_000,
            TickUnit::Millis => 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SmartDelay, Status};
    use embassy_time::{Duration, MockDriver};

    // The mock driver is global, so everything that advances it lives in this one test.
    #[test]
    fn counts_wraps_and_restarts() {
        let driver = MockDriver::get();

        let millis = EmbassyTimeTicks::new(TickUnit::Millis);
        let micros = EmbassyTimeTicks::new(TickUnit::Micros);
        let wrapping = EmbassyTimeTicks::with_offset(TickUnit::Millis, u32::MAX - 2_999);
        assert_eq!(millis.now_ticks(), 0);
        assert_eq!(wrapping.now_ticks(), u32::MAX - 2_999);

        let mut sd = SmartDelay::new();
        assert_eq!(sd.poll_source(1, 6_000, &wrapping, 0), Status::Waiting);

        driver.advance(Duration::from_millis(1_500));
        assert_eq!(millis.now_ticks(), 1_500);
        assert_eq!(micros.now_ticks(), 1_500_000);
        assert_eq!(sd.poll_source(1, 6_000, &wrapping, 0), Status::Waiting);

        driver.advance(Duration::from_millis(3_000));
        assert_eq!(wrapping.now_ticks(), 1_500);
        assert_eq!(sd.poll_source(1, 6_000, &wrapping, 0), Status::Waiting);

        driver.advance(Duration::from_millis(1_500));
        assert_eq!(sd.poll_source(1, 6_000, &wrapping, 0), Status::Elapsed);

        millis.restart();
        assert_eq!(millis.now_ticks(), 0);
        driver.advance(Duration::from_millis(10));
        assert_eq!(millis.now_ticks(), 10);
    }

    #[test]
    fn tickrate_follows_unit() {
        assert_eq!(EmbassyTimeTicks::new(TickUnit::Millis).tickrate(), 1_000);
        assert_eq!(EmbassyTimeTicks::new(TickUnit::Micros).tickrate(), 1_000_000);
        assert_eq!(
            EmbassyTimeTicks::new(TickUnit::Ticks).tickrate() as u64,
            embassy_time::TICK_HZ
        );
    }
}
