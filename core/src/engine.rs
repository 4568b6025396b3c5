pub mod machine;
pub mod state;
pub mod timers;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

use std::time::Instant;

use log::trace;

pub use machine::{Command, Effect, Input, Machine, PlayerCall};
pub use state::{IntendedPlayState, PlaybackState, Visibility};
pub use timers::{Clock, SystemClock, TimerKind, TimerSet};

use crate::config::PlaybackConfig;
use crate::media::{EmbeddedPlayer, MediaId, PlayerEvent};

/// Point-in-time view of the engine, compared by consumers to detect changes
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub state: PlaybackState,
    pub intent: IntendedPlayState,
    pub visibility: Visibility,
    /// Position in seconds
    pub position: f64,
    /// Duration in seconds, 0 while unknown
    pub duration: f64,
    pub volume: u8,
    pub active_id: Option<MediaId>,
    pub ready: bool,
}

/// Owns the embedded player and mediates every command and event.
///
/// The engine is driven from a single event loop: commands are method
/// calls, player events and timers are processed by [`PlaybackEngine::pump`].
pub struct PlaybackEngine<P: EmbeddedPlayer, C: Clock = SystemClock> {
    machine: Machine,
    player: P,
    clock: C,
    timers: TimerSet,
}

impl<P: EmbeddedPlayer> PlaybackEngine<P, SystemClock> {
    pub fn new(player: P, config: &PlaybackConfig) -> Self {
        Self::with_clock(player, SystemClock, config)
    }
}

impl<P: EmbeddedPlayer, C: Clock> PlaybackEngine<P, C> {
    pub fn with_clock(player: P, clock: C, config: &PlaybackConfig) -> Self {
        Self {
            machine: Machine::default(),
            player,
            clock,
            timers: TimerSet::new(config),
        }
    }

    /// Load `id`, playing it right away if `autoplay` and visible
    pub fn load(&mut self, id: MediaId, autoplay: bool) {
        self.dispatch(Input::Command(Command::Load { id, autoplay }));
    }

    pub fn play(&mut self) {
        self.dispatch(Input::Command(Command::Play));
    }

    pub fn pause(&mut self) {
        self.dispatch(Input::Command(Command::Pause));
    }

    /// Play if the user currently intends to pause, pause otherwise
    pub fn toggle(&mut self) {
        match self.machine.intent() {
            IntendedPlayState::Playing => self.pause(),
            IntendedPlayState::Paused => self.play(),
        }
    }

    pub fn seek(&mut self, seconds: f64) {
        self.dispatch(Input::Command(Command::Seek(seconds)));
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.dispatch(Input::Command(Command::SetVolume(volume)));
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.dispatch(Input::Visibility(visibility));
    }

    /// Process pending player events and due timers. Returns whether anything
    /// was handled.
    pub fn pump(&mut self) -> bool {
        let mut handled = false;

        while let Some(event) = self.player.poll_event() {
            handled = true;
            let input = match event {
                PlayerEvent::Ready => Input::Ready,
                PlayerEvent::StateChange(raw) => Input::PlayerState {
                    raw,
                    duration: self.player.duration(),
                },
            };
            self.dispatch(input);
        }

        let now = self.clock.now();
        while let Some(kind) = self.timers.take_due(now) {
            handled = true;
            let input = match kind {
                TimerKind::PositionPoll => Input::PositionTick(self.player.current_time()),
                TimerKind::Watchdog => Input::WatchdogTick(self.player.player_state()),
                TimerKind::Resume => Input::ResumeDue,
            };
            self.dispatch(input);
        }

        handled
    }

    /// When the next timer is due, so the host loop knows how long to sleep
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn is_timer_active(&self, kind: TimerKind) -> bool {
        self.timers.is_active(kind)
    }

    pub fn state(&self) -> PlaybackState {
        self.machine.state()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            state: self.machine.state(),
            intent: self.machine.intent(),
            visibility: self.machine.visibility(),
            position: self.machine.position(),
            duration: self.machine.duration(),
            volume: self.machine.volume(),
            active_id: self.machine.active_id().cloned(),
            ready: self.machine.is_ready(),
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    fn dispatch(&mut self, input: Input) {
        trace!("engine input: {:?}", input);
        for effect in self.machine.handle(input) {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Player(call) => match call {
                PlayerCall::Load(id) => self.player.load_video_by_id(&id),
                PlayerCall::Cue(id) => self.player.cue_video_by_id(&id),
                PlayerCall::Play => self.player.play_video(),
                PlayerCall::Pause => self.player.pause_video(),
                PlayerCall::SeekTo {
                    seconds,
                    allow_seek_ahead,
                } => self.player.seek_to(seconds, allow_seek_ahead),
                PlayerCall::SetVolume(volume) => self.player.set_volume(volume),
            },
            Effect::StartTimer(kind) => {
                self.timers.start(kind, self.clock.now());
            }
            Effect::CancelTimer(kind) => {
                self.timers.cancel(kind);
            }
        }
    }
}
