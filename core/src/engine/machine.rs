//! Pure transition table of the playback engine.
//!
//! [`Machine::handle`] maps `(snapshot, input)` to the next snapshot plus a
//! list of [`Effect`]s. It never touches a player or a clock, which is what
//! makes the reconciliation rules testable in isolation.
//!
//! Background policy: a raw pause reported while hidden with intent
//! `playing` is treated as a side effect of the host suspending us. It is
//! suppressed, and the watchdog keeps reissuing play until the page is
//! visible again or the user pauses.

use log::{debug, info};

use super::state::{IntendedPlayState, PlaybackState, Visibility};
use super::timers::TimerKind;
use crate::media::{MediaId, RawPlayerState};

/// Commands from the UI or the transport bridge
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load { id: MediaId, autoplay: bool },
    Play,
    Pause,
    Seek(f64),
    SetVolume(f64),
}

/// Everything that can move the machine
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    /// The embedded player finished initializing
    Ready,
    /// Raw state change, with the duration sampled at the same moment
    PlayerState { raw: RawPlayerState, duration: f64 },
    Visibility(Visibility),
    /// Position sampled by the poll timer
    PositionTick(f64),
    /// Raw state sampled by the watchdog
    WatchdogTick(RawPlayerState),
    /// The deferred resume after becoming visible is due
    ResumeDue,
}

/// Calls into the embedded player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Load(MediaId),
    Cue(MediaId),
    Play,
    Pause,
    SeekTo { seconds: f64, allow_seek_ahead: bool },
    SetVolume(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Player(PlayerCall),
    StartTimer(TimerKind),
    CancelTimer(TimerKind),
}

#[derive(Debug, Clone)]
pub struct Machine {
    state: PlaybackState,
    intent: IntendedPlayState,
    visibility: Visibility,
    ready: bool,
    active_id: Option<MediaId>,
    /// Load queued until the player is ready (last write wins)
    pending_load: Option<MediaId>,
    /// Seek queued until the player is ready
    pending_seek: Option<f64>,
    position: f64,
    duration: f64,
    volume: u8,
    polling: bool,
    watchdog: bool,
    resume: bool,
}

impl Default for Machine {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            intent: IntendedPlayState::Paused,
            visibility: Visibility::Visible,
            ready: false,
            active_id: None,
            pending_load: None,
            pending_seek: None,
            position: 0.0,
            duration: 0.0,
            volume: 100,
            polling: false,
            watchdog: false,
            resume: false,
        }
    }
}

impl Machine {
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn intent(&self) -> IntendedPlayState {
        self.intent
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn active_id(&self) -> Option<&MediaId> {
        self.active_id.as_ref()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let mut effects = Vec::new();
        match input {
            Input::Command(command) => self.on_command(command, &mut effects),
            Input::Ready => self.on_ready(&mut effects),
            Input::PlayerState { raw, duration } => self.on_player_state(raw, duration, &mut effects),
            Input::Visibility(visibility) => self.on_visibility(visibility, &mut effects),
            Input::PositionTick(position) => {
                if self.polling {
                    self.position = position;
                }
            }
            Input::WatchdogTick(raw) => self.on_watchdog(raw, &mut effects),
            Input::ResumeDue => self.on_resume(&mut effects),
        }
        effects
    }

    fn on_command(&mut self, command: Command, effects: &mut Vec<Effect>) {
        match command {
            Command::Load { id, autoplay } => self.on_load(id, autoplay, effects),
            Command::Play => {
                debug!("play requested (ready: {})", self.ready);
                self.intent = IntendedPlayState::Playing;
                if self.visibility.is_hidden() {
                    self.arm(TimerKind::Watchdog, effects);
                }
                if self.ready {
                    effects.push(Effect::Player(PlayerCall::Play));
                }
            }
            Command::Pause => {
                debug!("pause requested (ready: {})", self.ready);
                self.intent = IntendedPlayState::Paused;
                self.disarm(TimerKind::Watchdog, effects);
                self.disarm(TimerKind::Resume, effects);
                if matches!(self.state, PlaybackState::Playing | PlaybackState::Buffering) {
                    self.state = PlaybackState::Paused;
                    self.disarm(TimerKind::PositionPoll, effects);
                }
                if self.ready {
                    effects.push(Effect::Player(PlayerCall::Pause));
                }
            }
            Command::Seek(seconds) => {
                let mut target = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
                if self.duration > 0.0 {
                    target = target.min(self.duration);
                }
                // Optimistic: the next poll tick supersedes this value
                self.position = target;
                if self.ready {
                    effects.push(Effect::Player(PlayerCall::SeekTo {
                        seconds: target,
                        allow_seek_ahead: true,
                    }));
                } else {
                    self.pending_seek = Some(target);
                }
            }
            Command::SetVolume(volume) => {
                let volume = if volume.is_finite() {
                    volume.clamp(0.0, 100.0).round() as u8
                } else {
                    0
                };
                self.volume = volume;
                if self.ready {
                    effects.push(Effect::Player(PlayerCall::SetVolume(volume)));
                }
            }
        }
    }

    fn on_load(&mut self, id: MediaId, autoplay: bool, effects: &mut Vec<Effect>) {
        if self.active_id.as_ref() == Some(&id) {
            debug!("{} is already loaded, ignoring load", id);
            return;
        }

        // A hidden client only preloads
        let autoplay = autoplay && !self.visibility.is_hidden();
        info!("loading {} (autoplay: {}, ready: {})", id, autoplay, self.ready);

        self.intent = if autoplay {
            IntendedPlayState::Playing
        } else {
            IntendedPlayState::Paused
        };
        self.active_id = Some(id.clone());
        self.position = 0.0;
        self.duration = 0.0;
        self.pending_seek = None;
        self.disarm(TimerKind::PositionPoll, effects);
        if !autoplay {
            self.disarm(TimerKind::Watchdog, effects);
        }

        if self.ready {
            effects.push(Effect::Player(Self::load_call(id, autoplay)));
        } else {
            self.pending_load = Some(id);
        }
    }

    fn on_ready(&mut self, effects: &mut Vec<Effect>) {
        if self.ready {
            return;
        }
        self.ready = true;
        info!("embedded player ready");

        if self.volume != 100 {
            effects.push(Effect::Player(PlayerCall::SetVolume(self.volume)));
        }
        if let Some(id) = self.pending_load.take() {
            let autoplay = self.intent == IntendedPlayState::Playing;
            debug!("applying queued load of {} (autoplay: {})", id, autoplay);
            effects.push(Effect::Player(Self::load_call(id, autoplay)));
        }
        if let Some(seconds) = self.pending_seek.take() {
            effects.push(Effect::Player(PlayerCall::SeekTo {
                seconds,
                allow_seek_ahead: true,
            }));
        }
    }

    fn on_player_state(&mut self, raw: RawPlayerState, duration: f64, effects: &mut Vec<Effect>) {
        let next = PlaybackState::from_raw(raw);

        if next == PlaybackState::Paused
            && self.visibility.is_hidden()
            && self.intent == IntendedPlayState::Playing
        {
            info!("suppressing background pause, holding {}", self.state);
            self.arm(TimerKind::Watchdog, effects);
            return;
        }

        debug!("player state {} -> {}", self.state, next);
        self.state = next;

        if next == PlaybackState::Playing {
            self.duration = duration;
            self.arm(TimerKind::PositionPoll, effects);
            return;
        }

        self.disarm(TimerKind::PositionPoll, effects);
        match next {
            PlaybackState::Ended => {
                self.position = 0.0;
                self.intent = IntendedPlayState::Paused;
                self.disarm(TimerKind::Watchdog, effects);
            }
            // Visible pauses are genuine user actions
            PlaybackState::Paused if !self.visibility.is_hidden() => {
                self.intent = IntendedPlayState::Paused;
            }
            _ => {}
        }
    }

    fn on_visibility(&mut self, visibility: Visibility, effects: &mut Vec<Effect>) {
        if visibility == self.visibility {
            return;
        }
        self.visibility = visibility;
        debug!("visibility changed to {:?} (intent {:?})", visibility, self.intent);

        match visibility {
            Visibility::Hidden => {
                self.disarm(TimerKind::Resume, effects);
                if self.intent == IntendedPlayState::Playing {
                    self.arm(TimerKind::Watchdog, effects);
                }
            }
            Visibility::Visible => {
                self.disarm(TimerKind::Watchdog, effects);
                if self.intent == IntendedPlayState::Playing {
                    self.arm(TimerKind::Resume, effects);
                }
            }
        }
    }

    fn on_watchdog(&mut self, raw: RawPlayerState, effects: &mut Vec<Effect>) {
        if !self.watchdog {
            return;
        }
        if !self.visibility.is_hidden() || self.intent != IntendedPlayState::Playing {
            self.disarm(TimerKind::Watchdog, effects);
            return;
        }
        if self.ready && raw != RawPlayerState::Playing {
            debug!("watchdog: player reports {:?}, reissuing play", raw);
            effects.push(Effect::Player(PlayerCall::Play));
        }
    }

    fn on_resume(&mut self, effects: &mut Vec<Effect>) {
        if !self.resume {
            return;
        }
        self.resume = false;
        if self.ready
            && !self.visibility.is_hidden()
            && self.intent == IntendedPlayState::Playing
        {
            debug!("resynchronizing playback after becoming visible");
            effects.push(Effect::Player(PlayerCall::Play));
        }
    }

    fn load_call(id: MediaId, autoplay: bool) -> PlayerCall {
        if autoplay {
            PlayerCall::Load(id)
        } else {
            PlayerCall::Cue(id)
        }
    }

    fn flag(&mut self, kind: TimerKind) -> &mut bool {
        match kind {
            TimerKind::PositionPoll => &mut self.polling,
            TimerKind::Watchdog => &mut self.watchdog,
            TimerKind::Resume => &mut self.resume,
        }
    }

    fn arm(&mut self, kind: TimerKind, effects: &mut Vec<Effect>) {
        let flag = self.flag(kind);
        if !*flag {
            *flag = true;
            effects.push(Effect::StartTimer(kind));
        }
    }

    fn disarm(&mut self, kind: TimerKind, effects: &mut Vec<Effect>) {
        let flag = self.flag(kind);
        if *flag {
            *flag = false;
            effects.push(Effect::CancelTimer(kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(token: &str) -> MediaId {
        MediaId::parse(token).unwrap()
    }

    fn ready_machine() -> Machine {
        let mut machine = Machine::default();
        machine.handle(Input::Ready);
        machine
    }

    fn raw(machine: &mut Machine, raw: RawPlayerState) -> Vec<Effect> {
        machine.handle(Input::PlayerState { raw, duration: 200.0 })
    }

    #[test]
    fn load_before_ready_is_queued_last_write_wins() {
        let mut machine = Machine::default();
        let first = machine.handle(Input::Command(Command::Load {
            id: id("aaaaaaaaaaa"),
            autoplay: true,
        }));
        let second = machine.handle(Input::Command(Command::Load {
            id: id("bbbbbbbbbbb"),
            autoplay: true,
        }));
        assert!(first.is_empty());
        assert!(second.is_empty());

        let effects = machine.handle(Input::Ready);
        assert_eq!(effects, vec![Effect::Player(PlayerCall::Load(id("bbbbbbbbbbb")))]);
    }

    #[test]
    fn reloading_the_active_id_is_a_no_op() {
        let mut machine = ready_machine();
        let load = Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true });
        assert_eq!(machine.handle(load.clone()).len(), 1);
        assert!(machine.handle(load).is_empty());
    }

    #[test]
    fn hidden_load_only_cues() {
        let mut machine = ready_machine();
        machine.handle(Input::Visibility(Visibility::Hidden));
        let effects = machine.handle(Input::Command(Command::Load {
            id: id("aaaaaaaaaaa"),
            autoplay: true,
        }));
        assert_eq!(effects, vec![Effect::Player(PlayerCall::Cue(id("aaaaaaaaaaa")))]);
        assert_eq!(machine.intent(), IntendedPlayState::Paused);
    }

    #[test]
    fn playing_arms_poll_and_leaving_it_disarms() {
        let mut machine = ready_machine();
        machine.handle(Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true }));

        assert!(raw(&mut machine, RawPlayerState::Buffering).is_empty());
        assert_eq!(
            raw(&mut machine, RawPlayerState::Playing),
            vec![Effect::StartTimer(TimerKind::PositionPoll)]
        );
        assert_eq!(machine.duration(), 200.0);
        // Already armed
        assert!(raw(&mut machine, RawPlayerState::Playing).is_empty());
        assert_eq!(
            raw(&mut machine, RawPlayerState::Buffering),
            vec![Effect::CancelTimer(TimerKind::PositionPoll)]
        );
    }

    #[test]
    fn hidden_pause_with_play_intent_is_suppressed() {
        let mut machine = ready_machine();
        machine.handle(Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true }));
        raw(&mut machine, RawPlayerState::Playing);

        assert_eq!(
            machine.handle(Input::Visibility(Visibility::Hidden)),
            vec![Effect::StartTimer(TimerKind::Watchdog)]
        );
        assert!(raw(&mut machine, RawPlayerState::Paused).is_empty());
        assert_eq!(machine.state(), PlaybackState::Playing);
        assert_eq!(machine.intent(), IntendedPlayState::Playing);

        assert_eq!(
            machine.handle(Input::WatchdogTick(RawPlayerState::Paused)),
            vec![Effect::Player(PlayerCall::Play)]
        );
        assert!(machine.handle(Input::WatchdogTick(RawPlayerState::Playing)).is_empty());
    }

    #[test]
    fn visible_pause_downgrades_intent() {
        let mut machine = ready_machine();
        machine.handle(Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true }));
        raw(&mut machine, RawPlayerState::Playing);
        raw(&mut machine, RawPlayerState::Paused);
        assert_eq!(machine.state(), PlaybackState::Paused);
        assert_eq!(machine.intent(), IntendedPlayState::Paused);
    }

    #[test]
    fn hidden_pause_without_play_intent_is_reported() {
        let mut machine = ready_machine();
        machine.handle(Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true }));
        raw(&mut machine, RawPlayerState::Playing);
        machine.handle(Input::Command(Command::Pause));
        machine.handle(Input::Visibility(Visibility::Hidden));
        raw(&mut machine, RawPlayerState::Paused);
        assert_eq!(machine.state(), PlaybackState::Paused);
    }

    #[test]
    fn ended_resets_position_and_intent() {
        let mut machine = ready_machine();
        machine.handle(Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true }));
        raw(&mut machine, RawPlayerState::Playing);
        machine.handle(Input::PositionTick(199.0));
        assert_eq!(machine.position(), 199.0);

        let effects = raw(&mut machine, RawPlayerState::Ended);
        assert_eq!(effects, vec![Effect::CancelTimer(TimerKind::PositionPoll)]);
        assert_eq!(machine.position(), 0.0);
        assert_eq!(machine.intent(), IntendedPlayState::Paused);
        assert_eq!(machine.state(), PlaybackState::Ended);
    }

    #[test]
    fn returning_visible_schedules_one_resume() {
        let mut machine = ready_machine();
        machine.handle(Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true }));
        machine.handle(Input::Visibility(Visibility::Hidden));

        let effects = machine.handle(Input::Visibility(Visibility::Visible));
        assert_eq!(
            effects,
            vec![
                Effect::CancelTimer(TimerKind::Watchdog),
                Effect::StartTimer(TimerKind::Resume),
            ]
        );
        assert_eq!(machine.handle(Input::ResumeDue), vec![Effect::Player(PlayerCall::Play)]);
        assert!(machine.handle(Input::ResumeDue).is_empty());
    }

    #[test]
    fn pause_cancels_background_timers() {
        let mut machine = ready_machine();
        machine.handle(Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true }));
        raw(&mut machine, RawPlayerState::Playing);
        machine.handle(Input::Visibility(Visibility::Hidden));

        let effects = machine.handle(Input::Command(Command::Pause));
        assert_eq!(
            effects,
            vec![
                Effect::CancelTimer(TimerKind::Watchdog),
                Effect::CancelTimer(TimerKind::PositionPoll),
                Effect::Player(PlayerCall::Pause),
            ]
        );
        assert_eq!(machine.state(), PlaybackState::Paused);
        assert!(machine.handle(Input::WatchdogTick(RawPlayerState::Paused)).is_empty());
    }

    #[test]
    fn seek_is_optimistic_and_clamped() {
        let mut machine = ready_machine();
        machine.handle(Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true }));
        raw(&mut machine, RawPlayerState::Playing);

        let effects = machine.handle(Input::Command(Command::Seek(500.0)));
        assert_eq!(
            effects,
            vec![Effect::Player(PlayerCall::SeekTo { seconds: 200.0, allow_seek_ahead: true })]
        );
        assert_eq!(machine.position(), 200.0);

        machine.handle(Input::Command(Command::Seek(-3.0)));
        assert_eq!(machine.position(), 0.0);

        machine.handle(Input::PositionTick(12.5));
        assert_eq!(machine.position(), 12.5);
    }

    #[test]
    fn volume_is_clamped_and_applied_on_ready() {
        let mut machine = Machine::default();
        assert!(machine.handle(Input::Command(Command::SetVolume(140.0))).is_empty());
        assert_eq!(machine.volume(), 100);
        machine.handle(Input::Command(Command::SetVolume(-5.0)));
        assert_eq!(machine.volume(), 0);
        machine.handle(Input::Command(Command::SetVolume(42.4)));

        assert_eq!(
            machine.handle(Input::Ready),
            vec![Effect::Player(PlayerCall::SetVolume(42))]
        );
    }

    #[test]
    fn queued_seek_follows_queued_load() {
        let mut machine = Machine::default();
        machine.handle(Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true }));
        machine.handle(Input::Command(Command::Seek(30.0)));
        assert_eq!(
            machine.handle(Input::Ready),
            vec![
                Effect::Player(PlayerCall::Load(id("aaaaaaaaaaa"))),
                Effect::Player(PlayerCall::SeekTo { seconds: 30.0, allow_seek_ahead: true }),
            ]
        );
    }

    #[test]
    fn pause_before_ready_turns_queued_load_into_cue() {
        let mut machine = Machine::default();
        machine.handle(Input::Command(Command::Load { id: id("aaaaaaaaaaa"), autoplay: true }));
        machine.handle(Input::Command(Command::Pause));
        assert_eq!(
            machine.handle(Input::Ready),
            vec![Effect::Player(PlayerCall::Cue(id("aaaaaaaaaaa")))]
        );
    }
}
