use std::time::{Duration, Instant};

use crate::config::PlaybackConfig;

/// Source of the current time, injected so tests can drive it
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// The engine's timers. At most one of each kind is ever armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Samples the playback position while playing
    PositionPoll,
    /// Re-asserts playback while hidden
    Watchdog,
    /// One-shot play after becoming visible again
    Resume,
}

impl TimerKind {
    const ALL: [TimerKind; 3] = [TimerKind::PositionPoll, TimerKind::Watchdog, TimerKind::Resume];

    fn index(self) -> usize {
        match self {
            TimerKind::PositionPoll => 0,
            TimerKind::Watchdog => 1,
            TimerKind::Resume => 2,
        }
    }

    pub fn repeats(self) -> bool {
        !matches!(self, TimerKind::Resume)
    }
}

/// Deadline table for the three timer kinds
#[derive(Debug, Clone)]
pub struct TimerSet {
    deadlines: [Option<Instant>; 3],
    periods: [Duration; 3],
}

impl TimerSet {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            deadlines: [None; 3],
            periods: [
                config.position_poll_interval,
                config.watchdog_interval,
                config.resume_delay,
            ],
        }
    }

    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.deadlines[kind.index()].is_some()
    }

    /// Arm `kind`. Returns false if it was already armed.
    pub fn start(&mut self, kind: TimerKind, now: Instant) -> bool {
        let slot = &mut self.deadlines[kind.index()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(now + self.periods[kind.index()]);
        true
    }

    /// Disarm `kind`. Returns false if it was not armed.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.deadlines[kind.index()].take().is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Pop the earliest timer due at `now`. Repeating timers are re-armed one
    /// period after `now`, one-shots are disarmed.
    pub fn take_due(&mut self, now: Instant) -> Option<TimerKind> {
        let kind = TimerKind::ALL
            .into_iter()
            .filter(|kind| matches!(self.deadlines[kind.index()], Some(at) if at <= now))
            .min_by_key(|kind| self.deadlines[kind.index()])?;

        let period = self.periods[kind.index()];
        self.deadlines[kind.index()] = kind.repeats().then(|| now + period);
        Some(kind)
    }
}
