//! Playback session integration tests
//!
//! Plays regions through the simulated engine frame by frame and checks the
//! gain that reaches the engine, the UI events and the speed fallback.

use mymusic_cutter::{
    CustomGains, EditorConfig, EditorSession, EventConsumer, ManualClock, OutputFormat,
    PlaybackEngine, SimulatedEngine, SyncOutcome, UiEvent, VolumeProfile, drain_events,
};
use std::sync::Arc;

const FRAME_MS: u64 = 50;

fn session_with_region(start: f64, end: f64) -> (ManualClock, EditorSession<SimulatedEngine>, EventConsumer) {
    let clock = ManualClock::new();
    let (mut session, mut events) = EditorSession::new(
        SimulatedEngine::new(120.0),
        EditorConfig::default(),
        Arc::new(clock.clone()),
    )
    .unwrap();
    assert!(session.set_region_bounds(start, end));
    clock.advance_ms(100);
    session.poll();
    drain_events(&mut events);
    (clock, session, events)
}

/// Play until the engine stops at the region end, returning the gain after each frame
fn play_through(clock: &ManualClock, session: &mut EditorSession<SimulatedEngine>) -> Vec<f32> {
    let mut gains = Vec::new();
    session.play().unwrap();
    while session.engine().is_playing() {
        clock.advance_ms(FRAME_MS);
        let position = session.engine_mut().advance(FRAME_MS as f64 / 1000.0);
        session.on_position_tick(position).unwrap();
        session.poll();
        gains.push(session.engine().volume());
    }
    gains
}

#[test]
fn test_fade_in_profile_rises_over_the_region() {
    let (clock, mut session, _events) = session_with_region(5.0, 9.0);
    session.set_profile(VolumeProfile::FadeIn);
    session.set_volume(0.7).unwrap();
    session.seek(5.0).unwrap();

    let gains = play_through(&clock, &mut session);
    assert!(gains.len() >= 70);
    for pair in gains.windows(2) {
        assert!(pair[1] + 1e-6 >= pair[0], "gain dropped: {:?}", pair);
    }
    assert!((gains.last().copied().unwrap() - 0.7).abs() < 1e-4);
    assert!((session.engine().current_time() - 9.0).abs() < 1e-9);
}

#[test]
fn test_custom_profile_fade_scenario() {
    let (_clock, mut session, _events) = session_with_region(2.0, 10.0);
    session.set_profile(VolumeProfile::Custom(CustomGains::flat(1.0)));
    session.set_volume(0.8).unwrap();
    session.set_fade_in_duration(3.0).unwrap();

    session.seek(3.5).unwrap();
    assert!((session.engine().volume() - 0.4).abs() < 1e-5);
}

#[test]
fn test_parameter_changes_reach_engine_while_paused() {
    let (clock, mut session, mut events) = session_with_region(0.0, 10.0);
    session.seek(5.0).unwrap();
    drain_events(&mut events);

    session.set_volume(0.25).unwrap();
    clock.advance_ms(40);
    session.poll();
    assert!((session.engine().volume() - 0.25).abs() < 1e-6);

    clock.advance_ms(20);
    session.poll();
    let received = drain_events(&mut events);
    assert!(received.contains(&UiEvent::VolumeDisplay(session.engine().volume())));
    assert!(received.contains(&UiEvent::RedrawRequested));
}

#[test]
fn test_volume_failure_is_retried_on_next_tick() {
    let (clock, mut session, _events) = session_with_region(0.0, 10.0);
    session.set_volume(0.5).unwrap();
    session.engine_mut().fail_volume_changes(1);

    session.on_position_tick(4.0).unwrap();
    assert_eq!(session.controller().last_gain(), Some(1.0));

    clock.advance_ms(20);
    session.on_position_tick(4.1).unwrap();
    assert!((session.engine().volume() - 0.5).abs() < 1e-6);
}

#[test]
fn test_ticks_faster_than_sync_interval_are_dropped() {
    let (clock, mut session, mut events) = session_with_region(0.0, 10.0);

    assert_eq!(session.on_position_tick(1.0).unwrap(), SyncOutcome::Applied);
    clock.advance_ms(5);
    assert_eq!(session.on_position_tick(1.005).unwrap(), SyncOutcome::RateLimited);
    clock.advance_ms(11);
    assert_eq!(session.on_position_tick(1.016).unwrap(), SyncOutcome::Applied);

    let times: Vec<f64> = drain_events(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            UiEvent::TimeDisplay(position) => Some(position),
            _ => None,
        })
        .collect();
    assert_eq!(times, vec![1.0, 1.016]);
}

#[test]
fn test_speed_change_keeps_playing_through_fallback() {
    let (clock, mut session, _events) = session_with_region(0.0, 60.0);
    session.play().unwrap();
    clock.advance_ms(1000);
    let position = session.engine_mut().advance(1.0);
    session.on_position_tick(position).unwrap();

    session.engine_mut().fail_rate_changes(1);
    assert_eq!(session.set_speed(2.0).unwrap(), 2.0);
    assert!(session.engine().is_playing());
    assert_eq!(session.engine().playback_rate(), 2.0);
    assert!((session.engine().current_time() - position).abs() < 1e-9);

    // Twice the rate: one second of wall time covers two of audio
    let next = session.engine_mut().advance(1.0);
    assert!((next - (position + 2.0)).abs() < 1e-9);

    assert_eq!(session.set_speed(0.01).unwrap(), 0.25);
}

#[test]
fn test_render_job_matches_preview_state() {
    let (_clock, mut session, _events) = session_with_region(4.0, 6.0);
    session.set_volume(0.9).unwrap();
    session.set_fade_in(true);
    session.set_fade_in_duration(5.0).unwrap();
    session.set_speed(1.25).unwrap();

    let job = session.render_job(OutputFormat::Aac).unwrap();
    assert_eq!(job.duration, 2.0);
    assert_eq!(job.fade_in_duration, 2.0);
    assert!(job.fade);
    assert_eq!(job.speed, 1.25);
    assert_eq!(job.file_name("track"), "track_cut.aac");

    let value: serde_json::Value = serde_json::from_str(&job.to_json().unwrap()).unwrap();
    assert_eq!(value["volumeProfile"], "uniform");
    assert_eq!(value["outputFormat"], "aac");
}
