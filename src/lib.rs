#![cfg_attr(not(test), no_std)]

//! Non-blocking delays for polling loops.
//!
//! A [`SmartDelay`] is armed by the first poll, reports [`Status::Waiting`] while the
//! requested number of ticks has not passed and reports [`Status::Elapsed`] exactly once
//! when it has. The caller supplies the current tick on every poll; ticks are `u32`
//! and may wrap around.

#[cfg(feature = "embassy-stm32")]
pub mod impl_embassy_stm32;
#[cfg(feature = "embassy-time")]
pub mod impl_embassy_time;
pub mod sequence;

use core::fmt;

/// The result of polling a delay.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// No state was given, or the state is armed for another identity or step.
    #[default]
    Invalid,
    /// The delay is armed and has not elapsed yet.
    Waiting,
    /// The delay has elapsed. The state is disarmed and will re-arm on the next poll.
    Elapsed,
}

impl Status {
    pub fn is_invalid(self) -> bool {
        self == Status::Invalid
    }

    pub fn is_waiting(self) -> bool {
        self == Status::Waiting
    }

    pub fn is_elapsed(self) -> bool {
        self == Status::Elapsed
    }

    /// Turn the status into `Ok(elapsed)`, or an error for invalid usage.
    pub fn check(self) -> Result<bool, InvalidUsage> {
        match self {
            Status::Invalid => Err(InvalidUsage),
            Status::Waiting => Ok(false),
            Status::Elapsed => Ok(true),
        }
    }
}

/// A delay was polled without state, or with an identity or step it was not armed with
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidUsage;

impl fmt::Display for InvalidUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("delay polled with missing state or mismatched identity/step")
    }
}

/// State of one logical delay.
///
/// The zero value (see [`SmartDelay::new`]) is not armed. The fields describing the
/// armed delay are only meaningful while [`SmartDelay::is_active`] returns true.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmartDelay {
    id: i32,
    step: i32,
    active: bool,
    duration: u32,
    start_time: u32,
}

impl SmartDelay {
    pub const fn new() -> Self {
        Self {
            id: 0,
            step: 0,
            active: false,
            duration: 0,
            start_time: 0,
        }
    }

    /// Poll the delay at tick `now` for phase `step`.
    ///
    /// A disarmed delay is armed with `id`, `step` and `duration`; a zero duration elapses
    /// on the arming call and leaves the delay disarmed. An armed delay only accepts the
    /// `id` and `step` it was armed with and is left untouched otherwise.
    pub fn poll(&mut self, id: i32, duration: u32, now: u32, step: i32) -> Status {
        if !self.active {
            self.id = id;
            self.step = step;
            self.duration = duration;
            self.start_time = now;
            if duration == 0 {
                return Status::Elapsed;
            }
            self.active = true;
            return Status::Waiting;
        }

        if self.id != id || self.step != step {
            return Status::Invalid;
        }

        if now.wrapping_sub(self.start_time) >= self.duration {
            self.active = false;
            Status::Elapsed
        } else {
            Status::Waiting
        }
    }

    /// Single phase poll, see [`is_elapsed`].
    pub fn is_elapsed(&mut self, id: i32, duration: u32, now: u32) -> bool {
        self.poll(id, duration, now, 0).is_elapsed()
    }

    /// Poll with the current tick of `source`.
    pub fn poll_source(
        &mut self,
        id: i32,
        duration: u32,
        source: &impl TickSource,
        step: i32,
    ) -> Status {
        self.poll(id, duration, source.now_ticks(), step)
    }

    pub fn is_elapsed_source(&mut self, id: i32, duration: u32, source: &impl TickSource) -> bool {
        self.is_elapsed(id, duration, source.now_ticks())
    }

    /// The step this delay was last armed for, also after it elapsed.
    pub fn step(&self) -> i32 {
        self.step
    }

    pub fn identity(&self) -> i32 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn start_time(&self) -> u32 {
        self.start_time
    }

    /// Ticks since arming, or `None` if the delay is not armed.
    pub fn elapsed(&self, now: u32) -> Option<u32> {
        self.active.then(|| now.wrapping_sub(self.start_time))
    }

    /// Ticks left until the delay elapses, or `None` if the delay is not armed.
    pub fn remaining(&self, now: u32) -> Option<u32> {
        self.elapsed(now)
            .map(|elapsed| self.duration.saturating_sub(elapsed))
    }

    /// Disarm the delay, dropping any running wait.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Poll `state` at tick `now` for phase `step`. Returns [`Status::Invalid`] if `state` is `None`.
pub fn stepped_delay(
    id: i32,
    state: Option<&mut SmartDelay>,
    duration: u32,
    now: u32,
    step: i32,
) -> Status {
    match state {
        Some(state) => state.poll(id, duration, now, step),
        None => Status::Invalid,
    }
}

/// Poll `state` as step 0 and return whether the delay elapsed.
///
/// Invalid usage is reported as `false`, the same as a delay that is still waiting.
/// Use [`stepped_delay`] to tell the two apart.
pub fn is_elapsed(id: i32, state: Option<&mut SmartDelay>, duration: u32, now: u32) -> bool {
    stepped_delay(id, state, duration, now, 0).is_elapsed()
}

/// The step `state` was last armed for, or -1 if there is no state.
pub fn current_step(state: Option<&SmartDelay>) -> i32 {
    state.map_or(-1, SmartDelay::step)
}

/// A free running tick counter that wraps around at `u32::MAX`.
pub trait TickSource {
    /// Return the current tick.
    fn now_ticks(&self) -> u32;
    /// Get the amount of ticks per second.
    fn tickrate(&self) -> u32;

    /// Convert milliseconds to ticks, saturating at `u32::MAX`.
    fn millis_to_ticks(&self, millis: u32) -> u32 {
        (millis as u64 * self.tickrate() as u64 / 1000)
            .try_into()
            .unwrap_or(u32::MAX)
    }
}
