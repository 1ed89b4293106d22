//! Timed phases on a single delay.
//!
//! A [`Sequencer`] owns one [`SmartDelay`] and the index of the phase that is live. Only
//! the live phase is ever polled against the delay, so phase changes never collide with a
//! delay still armed for the previous phase.

use crate::{SmartDelay, Status, TickSource};

/// What happened on a [`Sequencer::poll`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// The phase `step` was armed by this poll and is now waiting.
    Started { step: i32 },
    /// The phase `step` is still waiting.
    Waiting { step: i32 },
    /// The phase `step` elapsed. If it was the last phase, `wrapped` is set and the next
    /// poll starts again at phase 0.
    Elapsed { step: i32, wrapped: bool },
    /// The delay is armed for another identity or step.
    Invalid,
}

/// Runs `steps` timed phases in order, repeating forever.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sequencer {
    delay: SmartDelay,
    id: i32,
    step: i32,
    steps: i32,
}

impl Sequencer {
    /// A sequencer for `steps` phases. A count below one is treated as one phase.
    pub const fn new(id: i32, steps: i32) -> Self {
        Self {
            delay: SmartDelay::new(),
            id,
            step: 0,
            steps: if steps < 1 { 1 } else { steps },
        }
    }

    /// The live phase.
    pub fn step(&self) -> i32 {
        self.step
    }

    pub fn steps(&self) -> i32 {
        self.steps
    }

    pub fn delay(&self) -> &SmartDelay {
        &self.delay
    }

    /// Poll the live phase with its `duration`. Advances to the next phase when it elapses.
    pub fn poll(&mut self, duration: u32, now: u32) -> Phase {
        let step = self.step;
        let arming = !self.delay.is_active();

        match self.delay.poll(self.id, duration, now, step) {
            Status::Invalid => Phase::Invalid,
            Status::Waiting if arming => Phase::Started { step },
            Status::Waiting => Phase::Waiting { step },
            Status::Elapsed => {
                self.step = (step + 1) % self.steps;
                Phase::Elapsed {
                    step,
                    wrapped: self.step == 0,
                }
            }
        }
    }

    /// Poll the live phase with the duration `durations` gives for it.
    pub fn poll_with(&mut self, durations: impl Fn(i32) -> u32, now: u32) -> Phase {
        let duration = durations(self.step);
        self.poll(duration, now)
    }

    pub fn poll_source(&mut self, duration: u32, source: &impl TickSource) -> Phase {
        self.poll(duration, source.now_ticks())
    }

    /// Back to phase 0 with a disarmed delay.
    pub fn restart(&mut self) {
        self.delay.reset();
        self.step = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duration_for(step: i32) -> u32 {
        if step % 2 == 0 { 1000 } else { 2000 }
    }

    #[test]
    fn runs_phases_in_order_and_wraps() {
        let mut seq = Sequencer::new(4, 3);
        let mut now = 0u32;
        let mut finished = [0u32; 3];
        let mut wrapped_at = None;

        assert_eq!(seq.poll_with(duration_for, now), Phase::Started { step: 0 });
        while wrapped_at.is_none() {
            now += 100;
            match seq.poll_with(duration_for, now) {
                Phase::Elapsed { step, wrapped } => {
                    finished[step as usize] = now;
                    if wrapped {
                        wrapped_at = Some(now);
                    } else {
                        assert_eq!(
                            seq.poll_with(duration_for, now),
                            Phase::Started { step: step + 1 }
                        );
                    }
                }
                Phase::Waiting { .. } => {}
                other => panic!("unexpected {other:?}"),
            }
        }

        assert_eq!(finished, [1000, 3000, 4000]);
        assert_eq!(wrapped_at, Some(4000));
        assert_eq!(seq.step(), 0);
        assert!(!seq.delay().is_active());
    }

    #[test]
    fn zero_duration_phase_elapses_on_arming() {
        let mut seq = Sequencer::new(1, 2);
        assert_eq!(
            seq.poll(0, 10),
            Phase::Elapsed {
                step: 0,
                wrapped: false
            }
        );
        assert_eq!(seq.step(), 1);
        assert_eq!(seq.poll(5, 10), Phase::Started { step: 1 });
    }

    #[test]
    fn restart_discards_running_phase() {
        let mut seq = Sequencer::new(1, 4);
        seq.poll(0, 0);
        seq.poll(50, 0);
        assert_eq!(seq.step(), 1);
        assert!(seq.delay().is_active());

        seq.restart();
        assert_eq!(seq.step(), 0);
        assert!(!seq.delay().is_active());
        assert_eq!(seq.poll(10, 100), Phase::Started { step: 0 });
    }

    #[test]
    fn at_least_one_phase() {
        let mut seq = Sequencer::new(1, 0);
        assert_eq!(seq.steps(), 1);
        seq.poll(10, 0);
        assert_eq!(
            seq.poll(10, 10),
            Phase::Elapsed {
                step: 0,
                wrapped: true
            }
        );
    }
}
