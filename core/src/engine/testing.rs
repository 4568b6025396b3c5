//! Fakes for the engine's capabilities

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::machine::PlayerCall;
use super::timers::Clock;
use crate::media::{EmbeddedPlayer, MediaId, PlayerEvent, RawPlayerState};

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<Instant>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(Instant::now())))
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

/// Player that records calls and replays scripted events
#[derive(Debug)]
pub struct FakePlayer {
    pub calls: Vec<PlayerCall>,
    pub events: VecDeque<PlayerEvent>,
    pub state: RawPlayerState,
    pub time: f64,
    pub duration: f64,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            events: VecDeque::new(),
            state: RawPlayerState::Unstarted,
            time: 0.0,
            duration: 0.0,
        }
    }

    /// A player that has already announced readiness
    pub fn ready() -> Self {
        let mut player = Self::new();
        player.events.push_back(PlayerEvent::Ready);
        player
    }

    /// Queue a raw state change and make the player report it
    pub fn report(&mut self, state: RawPlayerState) {
        self.state = state;
        self.events.push_back(PlayerEvent::StateChange(state));
    }

    pub fn take_calls(&mut self) -> Vec<PlayerCall> {
        std::mem::take(&mut self.calls)
    }
}

impl EmbeddedPlayer for FakePlayer {
    fn load_video_by_id(&mut self, id: &MediaId) {
        self.calls.push(PlayerCall::Load(id.clone()));
    }

    fn cue_video_by_id(&mut self, id: &MediaId) {
        self.calls.push(PlayerCall::Cue(id.clone()));
    }

    fn play_video(&mut self) {
        self.calls.push(PlayerCall::Play);
    }

    fn pause_video(&mut self) {
        self.calls.push(PlayerCall::Pause);
    }

    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool) {
        self.calls.push(PlayerCall::SeekTo {
            seconds,
            allow_seek_ahead,
        });
    }

    fn set_volume(&mut self, volume: u8) {
        self.calls.push(PlayerCall::SetVolume(volume));
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn player_state(&self) -> RawPlayerState {
        self.state
    }

    fn poll_event(&mut self) -> Option<PlayerEvent> {
        self.events.pop_front()
    }
}
