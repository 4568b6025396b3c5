use std::time::Duration;

use super::testing::{FakePlayer, ManualClock};
use super::*;
use crate::media::{PlayerEvent, RawPlayerState};

fn id() -> MediaId {
    MediaId::parse("dQw4w9WgXcQ").unwrap()
}

fn engine() -> (PlaybackEngine<FakePlayer, ManualClock>, ManualClock) {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = ManualClock::new();
    let mut engine =
        PlaybackEngine::with_clock(FakePlayer::ready(), clock.clone(), &PlaybackConfig::default());
    assert!(engine.pump());
    (engine, clock)
}

/// Load, then let the player report buffering followed by playing
fn start_playing(engine: &mut PlaybackEngine<FakePlayer, ManualClock>, duration: f64) {
    engine.load(id(), true);
    let player = engine.player_mut();
    player.duration = duration;
    player.report(RawPlayerState::Buffering);
    player.report(RawPlayerState::Playing);
    engine.pump();
    engine.player_mut().take_calls();
}

#[test]
fn autoplay_load_then_pause() {
    let (mut engine, clock) = engine();

    engine.load(id(), true);
    assert_eq!(engine.player_mut().take_calls(), vec![PlayerCall::Load(id())]);
    assert_eq!(engine.state(), PlaybackState::Idle);

    engine.player_mut().duration = 212.0;
    engine.player_mut().report(RawPlayerState::Buffering);
    engine.pump();
    assert_eq!(engine.state(), PlaybackState::Buffering);

    engine.player_mut().report(RawPlayerState::Playing);
    engine.pump();
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert_eq!(snapshot.duration, 212.0);
    assert!(engine.is_timer_active(TimerKind::PositionPoll));

    engine.player_mut().time = 1.2;
    clock.advance(Duration::from_secs(1));
    assert!(engine.pump());
    assert_eq!(engine.snapshot().position, 1.2);

    engine.pause();
    assert_eq!(engine.state(), PlaybackState::Paused);
    assert_eq!(engine.snapshot().intent, IntendedPlayState::Paused);
    assert!(!engine.is_timer_active(TimerKind::PositionPoll));
    assert_eq!(engine.player_mut().take_calls(), vec![PlayerCall::Pause]);
}

#[test]
fn background_pause_is_suppressed_and_fought() {
    let (mut engine, clock) = engine();
    start_playing(&mut engine, 100.0);

    engine.set_visibility(Visibility::Hidden);
    assert!(engine.is_timer_active(TimerKind::Watchdog));

    engine.player_mut().report(RawPlayerState::Paused);
    engine.pump();
    assert_eq!(engine.state(), PlaybackState::Playing);
    assert_eq!(engine.snapshot().intent, IntendedPlayState::Playing);

    clock.advance(Duration::from_millis(500));
    engine.pump();
    assert_eq!(engine.player_mut().take_calls(), vec![PlayerCall::Play]);

    clock.advance(Duration::from_millis(500));
    engine.pump();
    assert_eq!(engine.player_mut().take_calls(), vec![PlayerCall::Play]);

    // Once the player is playing again the watchdog stays quiet
    engine.player_mut().state = RawPlayerState::Playing;
    clock.advance(Duration::from_millis(500));
    engine.pump();
    assert!(engine.player_mut().take_calls().is_empty());
    assert!(engine.is_timer_active(TimerKind::Watchdog));
}

#[test]
fn becoming_visible_stops_watchdog_and_resumes_once() {
    let (mut engine, clock) = engine();
    start_playing(&mut engine, 100.0);

    engine.set_visibility(Visibility::Hidden);
    engine.set_visibility(Visibility::Visible);
    assert!(!engine.is_timer_active(TimerKind::Watchdog));
    assert!(engine.is_timer_active(TimerKind::Resume));

    clock.advance(Duration::from_millis(50));
    engine.pump();
    assert!(engine.player_mut().take_calls().is_empty());

    clock.advance(Duration::from_millis(50));
    engine.pump();
    assert_eq!(engine.player_mut().take_calls(), vec![PlayerCall::Play]);
    assert!(!engine.is_timer_active(TimerKind::Resume));

    clock.advance(Duration::from_secs(5));
    engine.pump();
    assert!(!engine.player_mut().calls.contains(&PlayerCall::Play));
}

#[test]
fn explicit_pause_while_hidden_wins_over_watchdog() {
    let (mut engine, clock) = engine();
    start_playing(&mut engine, 100.0);

    engine.set_visibility(Visibility::Hidden);
    engine.pause();
    assert!(!engine.is_timer_active(TimerKind::Watchdog));

    engine.player_mut().report(RawPlayerState::Paused);
    clock.advance(Duration::from_secs(2));
    engine.pump();
    assert_eq!(engine.state(), PlaybackState::Paused);
    assert_eq!(engine.player_mut().take_calls(), vec![PlayerCall::Pause]);
}

#[test]
fn commands_queue_until_ready() {
    let clock = ManualClock::new();
    let mut engine =
        PlaybackEngine::with_clock(FakePlayer::new(), clock, &PlaybackConfig::default());

    engine.set_volume(30.0);
    engine.load(id(), true);
    engine.play();
    assert!(engine.player().calls.is_empty());
    assert!(!engine.snapshot().ready);

    engine.player_mut().events.push_back(PlayerEvent::Ready);
    engine.pump();
    assert_eq!(
        engine.player_mut().take_calls(),
        vec![PlayerCall::SetVolume(30), PlayerCall::Load(id())]
    );
}

#[test]
fn ended_resets_position_and_stops_polling() {
    let (mut engine, clock) = engine();
    start_playing(&mut engine, 100.0);

    engine.player_mut().time = 99.0;
    clock.advance(Duration::from_secs(1));
    engine.pump();
    assert_eq!(engine.snapshot().position, 99.0);

    engine.player_mut().report(RawPlayerState::Ended);
    engine.pump();
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Ended);
    assert_eq!(snapshot.position, 0.0);
    assert_eq!(snapshot.intent, IntendedPlayState::Paused);
    assert!(!engine.is_timer_active(TimerKind::PositionPoll));
    assert_eq!(engine.next_deadline(), None);

    // Replaying from ended
    engine.play();
    assert_eq!(engine.player_mut().take_calls(), vec![PlayerCall::Play]);
    engine.player_mut().report(RawPlayerState::Playing);
    engine.pump();
    assert_eq!(engine.state(), PlaybackState::Playing);
}

#[test]
fn seek_updates_position_before_confirmation() {
    let (mut engine, clock) = engine();
    start_playing(&mut engine, 100.0);

    engine.seek(42.0);
    assert_eq!(engine.snapshot().position, 42.0);
    assert_eq!(
        engine.player_mut().take_calls(),
        vec![PlayerCall::SeekTo { seconds: 42.0, allow_seek_ahead: true }]
    );

    // The player's actual position supersedes on the next tick
    engine.player_mut().time = 41.5;
    clock.advance(Duration::from_secs(1));
    engine.pump();
    assert_eq!(engine.snapshot().position, 41.5);
}

#[test]
fn toggle_follows_intent() {
    let (mut engine, _clock) = engine();
    start_playing(&mut engine, 100.0);

    engine.toggle();
    assert_eq!(engine.player_mut().take_calls(), vec![PlayerCall::Pause]);
    engine.toggle();
    assert_eq!(engine.player_mut().take_calls(), vec![PlayerCall::Play]);
}

#[test]
fn idle_pump_reports_nothing() {
    let (mut engine, _clock) = engine();
    assert!(!engine.pump());
    assert_eq!(engine.next_deadline(), None);
}
