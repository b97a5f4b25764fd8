// MyMusic Cutter - Headless preview of the cut/volume pipeline
//
// Usage: mymusic_cutter [config.ron] [profile]
// Plays a demo region through the simulated engine and prints the gain
// applied on every frame, then the render job the backend would receive.

use mymusic_cutter::{
    EditorConfig, EditorSession, ManualClock, OutputFormat, PlaybackEngine, SimulatedEngine,
    UiEvent, VolumeProfile, drain_events,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEMO_DURATION_SECS: f64 = 180.0;
const DEMO_REGION: (f64, f64) = (30.0, 42.0);
const FRAME: Duration = Duration::from_millis(250);
const BAR_WIDTH: f32 = 40.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from).or_else(EditorConfig::default_path);
    let profile = args
        .next()
        .map(|name| VolumeProfile::from_name(&name, None))
        .unwrap_or(VolumeProfile::FadeIn);

    let config = match &config_path {
        Some(path) => EditorConfig::load_or_default(path)?,
        None => EditorConfig::default(),
    };

    println!("=== MyMusic Cutter ===");
    println!("Headless preview, profile '{}'\n", profile);

    // Manual clock: one frame = one clock step, so no tick is rate limited
    let clock = ManualClock::new();
    let (mut session, mut events) = EditorSession::new(
        SimulatedEngine::new(DEMO_DURATION_SECS),
        config,
        Arc::new(clock.clone()),
    )?;

    let (start, end) = DEMO_REGION;
    if !session.set_region_bounds(start, end) {
        return Err(format!("demo region {}..{} refused", start, end).into());
    }
    session.set_profile(profile);
    session.set_volume(0.8)?;
    session.set_fade_in(true);
    session.set_fade_out(true);
    session.set_fade_in_duration(2.0)?;
    session.set_fade_out_duration(3.0)?;

    session.seek(start)?;
    session.play()?;

    println!("{:>8}  {:>6}", "time", "gain");
    while session.engine().is_playing() {
        clock.advance(FRAME);
        let position = session.engine_mut().advance(FRAME.as_secs_f64());
        session.on_position_tick(position)?;
        session.poll();

        let gain = session.controller().display_gain().get();
        let bar = "#".repeat((gain * BAR_WIDTH).round() as usize);
        println!("{:>7.2}s  {:>6.3}  {}", position, gain, bar);
    }
    session.pause()?;

    let received = drain_events(&mut events);
    let redraws = received
        .iter()
        .filter(|event| matches!(event, UiEvent::RedrawRequested))
        .count();
    println!(
        "\n{} UI events ({} redraws), {} gain changes sent to the engine",
        received.len(),
        redraws,
        session.engine().volume_history().len()
    );

    let job = session.render_job(OutputFormat::Mp3)?;
    println!("\nRender job for {}:", job.file_name("demo"));
    println!("{}", job.to_json()?);

    session.teardown();
    Ok(())
}
