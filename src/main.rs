//! FormFusion entry point
//!
//! Runs one puzzle session against the simulated headset and writes the
//! telemetry CSVs. Usage: `form-fusion [settings.json]`

use std::path::PathBuf;
use std::process;

use form_fusion::consts::COMPLETION_TAIL_SECS;
use form_fusion::platform::{LogDisplay, Participant, PuzzleBoard, SharedBoard, SimulatedEyeTracker};
use form_fusion::sim::{Session, SessionWorld};
use form_fusion::{Settings, TelemetryResult};

fn main() {
    env_logger::init();
    log::info!("FormFusion (native) starting...");

    if let Err(e) = run() {
        log::error!("Session failed: {}", e);
        process::exit(1);
    }
}

fn run() -> TelemetryResult<()> {
    let settings = match std::env::args_os().nth(1) {
        Some(path) => Settings::load(&PathBuf::from(path))?,
        None => Settings::default(),
    };
    settings.validate()?;

    let board = SharedBoard::new(PuzzleBoard::generate(settings.stage_count, settings.seed));
    let tracker = SimulatedEyeTracker::new(board.clone(), settings.seed.wrapping_add(1));
    let mut participant = Participant::new(
        board.clone(),
        settings.seed.wrapping_add(2),
        settings.frame_rate,
        settings.stage_duration,
    );

    let world = SessionWorld {
        sensor: Box::new(tracker),
        scene: Box::new(board.clone()),
        content: Box::new(board),
        display: Some(Box::new(LogDisplay::default())),
    };
    let mut session = Session::init(&settings, world)?;

    let dt = settings.frame_dt();
    let mut completed_at: Option<f64> = None;
    while session.now() < settings.session_length {
        let input = participant.next_input();
        let ended = session.tick(dt, &input);
        if !ended.is_empty() {
            participant.restart();
        }

        if session.is_finished() {
            let done = *completed_at.get_or_insert(session.now());
            if session.now() - done >= COMPLETION_TAIL_SECS {
                break;
            }
        }
    }

    session.shutdown()?;

    let events = session.sequencer().events();
    let correct = events.iter().filter(|e| e.is_correct).count();
    log::info!(
        "Session finished at {:.1}s: {}/{} stages correct, {} gaze samples",
        session.now(),
        correct,
        events.len(),
        session.recorder().flushed_samples()
    );
    Ok(())
}
