//! Session host
//!
//! Owns the clock, the recorder, the stage sequencer and the hover selector
//! and drives them from explicit `init` / `tick` / `shutdown` calls.

use std::path::PathBuf;

use super::blink::BlinkEvent;
use super::recorder::{GazeRecorder, GazeSample};
use super::selection::{HoverSelector, Interactable};
use super::sensor::{GazeSensor, SceneQuery};
use super::stage::{StageContent, StageDisplay, StageEvent, StageSequencer};
use super::timer::{IntervalTimer, SessionClock};
use crate::error::TelemetryResult;
use crate::persistence::{AppendLog, ensure_dir, render_header};
use crate::settings::Settings;

/// Input events for a single frame (one-shot)
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// Pointer stopped hovering this object
    pub hover_exit: Option<u32>,
    /// Pointer started hovering this object
    pub hover_enter: Option<Interactable>,
    /// Trigger went down this frame
    pub trigger_pressed: bool,
}

/// External collaborators a session is built around
pub struct SessionWorld {
    pub sensor: Box<dyn GazeSensor>,
    pub scene: Box<dyn SceneQuery>,
    pub content: Box<dyn StageContent>,
    pub display: Option<Box<dyn StageDisplay>>,
}

pub struct Session {
    clock: SessionClock,
    recorder: GazeRecorder,
    sequencer: StageSequencer,
    selector: HoverSelector,
    flush_timer: IntervalTimer,
    sensor: Box<dyn GazeSensor>,
    scene: Box<dyn SceneQuery>,
    summary_path: Option<PathBuf>,
    shut_down: bool,
}

impl Session {
    /// Create the data files and start stage 0 at t = 0
    pub fn init(settings: &Settings, world: SessionWorld) -> TelemetryResult<Self> {
        settings.validate()?;
        ensure_dir(&settings.data_dir)?;

        let gaze_log = AppendLog::create(settings.gaze_log_path(), &render_header::<GazeSample>()?)?;
        let blink_log =
            AppendLog::create(settings.blink_log_path(), &render_header::<BlinkEvent>()?)?;

        let mut recorder = GazeRecorder::new(Box::new(gaze_log), Box::new(blink_log));
        recorder.set_recording(settings.recording);

        let mut sequencer = StageSequencer::new(world.content, settings.stage_duration);
        if let Some(display) = world.display {
            sequencer = sequencer.with_display(display);
        }

        let mut session = Self::from_parts(
            recorder,
            sequencer,
            world.sensor,
            world.scene,
            settings.flush_interval,
        )
        .with_summary_path(settings.level_log_path());

        log::info!(
            "Session started: {} stages of {:.1}s, flushing every {:.1}s to {}",
            session.sequencer.stage_count(),
            session.sequencer.stage_duration(),
            settings.flush_interval,
            settings.data_dir.display()
        );
        session.start();
        Ok(session)
    }

    /// Assemble a session from prebuilt parts. The sequencer is not started.
    pub fn from_parts(
        recorder: GazeRecorder,
        sequencer: StageSequencer,
        sensor: Box<dyn GazeSensor>,
        scene: Box<dyn SceneQuery>,
        flush_interval: f64,
    ) -> Self {
        let clock = SessionClock::new();
        Self {
            flush_timer: IntervalTimer::new(clock.now(), flush_interval),
            clock,
            recorder,
            sequencer,
            selector: HoverSelector::new(),
            sensor,
            scene,
            summary_path: None,
            shut_down: false,
        }
    }

    /// Where `shutdown` writes the stage summary
    pub fn with_summary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_path = Some(path.into());
        self
    }

    pub fn start(&mut self) {
        self.sequencer.start(self.clock.now());
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn recorder(&self) -> &GazeRecorder {
        &self.recorder
    }

    pub fn sequencer(&self) -> &StageSequencer {
        &self.sequencer
    }

    pub fn selector(&self) -> &HoverSelector {
        &self.selector
    }

    /// All stages are done or the session was shut down
    pub fn is_finished(&self) -> bool {
        self.shut_down || self.sequencer.is_completed()
    }

    /// Advance one frame. Returns the stages that ended during it.
    pub fn tick(&mut self, dt: f64, input: &FrameInput) -> Vec<StageEvent> {
        let mut ended = Vec::new();
        if self.shut_down {
            return ended;
        }

        let now = self.clock.advance(dt);

        // Input before the countdown: a press on the expiry frame ends the
        // stage with its selection and cancels the timeout.
        if let Some(id) = input.hover_exit {
            self.selector.on_hover_exit(id);
        }
        if let Some(target) = &input.hover_enter {
            self.selector.on_hover_enter(target.clone());
        }
        if input.trigger_pressed {
            if let Some(event) = self.selector.on_trigger_pressed(&mut self.sequencer, now) {
                ended.push(event);
            }
        }

        if let Some(event) = self.sequencer.tick(now) {
            ended.push(event);
        }

        // The ended stage's pieces are hidden, so nothing stays hovered
        if !ended.is_empty() {
            self.selector.clear();
        }

        let level = Some(self.sequencer.level_index());
        self.recorder
            .sample(now, level, self.sensor.as_mut(), self.scene.as_ref());

        if self.flush_timer.poll(now) {
            self.flush(now);
        }

        ended
    }

    fn flush(&mut self, now: f64) {
        match self.recorder.flush() {
            Ok(report) => {
                if !report.is_empty() {
                    log::debug!(
                        "Telemetry appended at {:.3}s: {} samples, {} blinks",
                        now,
                        report.samples,
                        report.blinks
                    );
                }
            }
            Err(e) => {
                log::warn!(
                    "Telemetry flush failed at {:.3}s, {} samples kept for retry: {}",
                    now,
                    self.recorder.pending_samples().len(),
                    e
                );
            }
        }
    }

    /// Final flush and stage summary. Safe to call more than once; only the
    /// first call does anything.
    pub fn shutdown(&mut self) -> TelemetryResult<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        let now = self.clock.now();
        self.flush(now);
        log::info!(
            "Session shut down: {} gaze samples, {} blink events written, {} stages",
            self.recorder.flushed_samples(),
            self.recorder.flushed_blinks(),
            self.sequencer.events().len()
        );

        if let Some(path) = &self.summary_path {
            self.sequencer.save_summary(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemorySink;
    use crate::sim::sensor::{EmptyScene, EyeTrackingData, GazeRay};
    use glam::Vec3;
    use std::fs;

    struct SteadyGaze;

    impl GazeSensor for SteadyGaze {
        fn read(&mut self) -> EyeTrackingData {
            EyeTrackingData {
                gaze_ray: GazeRay::new(Vec3::new(0.0, 1.6, 0.0), Vec3::Z),
                is_left_eye_blinking: false,
                is_right_eye_blinking: false,
            }
        }
    }

    struct Slots(usize);

    impl StageContent for Slots {
        fn stage_count(&self) -> usize {
            self.0
        }
        fn set_active(&mut self, _stage: usize, _active: bool) {}
    }

    const DT: f64 = 0.1;

    fn memory_session(stages: usize, duration: f64) -> (Session, MemorySink) {
        let gaze = MemorySink::new();
        let recorder = GazeRecorder::new(Box::new(gaze.clone()), Box::new(MemorySink::new()));
        let sequencer = StageSequencer::new(Box::new(Slots(stages)), duration);
        let mut session =
            Session::from_parts(recorder, sequencer, Box::new(SteadyGaze), Box::new(EmptyScene), 10.0);
        session.start();
        (session, gaze)
    }

    fn run(session: &mut Session, frames: usize) {
        for _ in 0..frames {
            session.tick(DT, &FrameInput::default());
        }
    }

    #[test]
    fn test_periodic_flush() {
        let (mut session, gaze) = memory_session(3, 100.0);

        run(&mut session, 99);
        assert_eq!(gaze.append_count(), 0);
        assert_eq!(session.recorder().pending_samples().len(), 99);

        // 100 * 0.1 crosses the 10s boundary (within float error)
        run(&mut session, 2);
        assert_eq!(gaze.append_count(), 1);
        assert!(session.recorder().flushed_samples() >= 100);
    }

    #[test]
    fn test_shutdown_flushes_remainder_once() {
        let (mut session, gaze) = memory_session(3, 100.0);
        run(&mut session, 125);
        let flushed = session.recorder().flushed_samples();
        assert!(flushed > 0 && flushed < 125);

        session.shutdown().unwrap();
        assert_eq!(gaze.contents().lines().count(), 125);
        session.shutdown().unwrap();
        assert_eq!(gaze.contents().lines().count(), 125);

        // Ticks after shutdown are ignored
        run(&mut session, 10);
        assert_eq!(session.recorder().total_samples(), 125);
        assert!(session.is_finished());
    }

    #[test]
    fn test_samples_tagged_with_stage() {
        let (mut session, gaze) = memory_session(2, 1.0);
        run(&mut session, 25);
        session.shutdown().unwrap();

        let levels: Vec<String> = gaze
            .contents()
            .lines()
            .map(|line| line.rsplit(';').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(levels.first().map(String::as_str), Some("0"));
        assert!(levels.iter().any(|l| l == "1"));
        // Completed sessions tag samples with the stage count
        assert_eq!(levels.last().map(String::as_str), Some("2"));
    }

    #[test]
    fn test_trigger_while_hovering_advances() {
        let (mut session, _) = memory_session(2, 15.0);
        let hover = FrameInput {
            hover_enter: Some(Interactable::new(3, "cone", "correct")),
            ..Default::default()
        };
        assert!(session.tick(DT, &hover).is_empty());

        let press = FrameInput {
            trigger_pressed: true,
            ..Default::default()
        };
        let ended = session.tick(DT, &press);
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].selected_object, "cone");
        assert!(ended[0].is_correct);
        assert_eq!(session.sequencer().current_stage(), Some(1));

        let leave = FrameInput {
            hover_exit: Some(3),
            ..Default::default()
        };
        session.tick(DT, &leave);
        assert!(session.selector().hovered().is_none());
        assert!(session.tick(DT, &press).is_empty());
    }

    #[test]
    fn test_flush_failure_is_retried() {
        let (mut session, gaze) = memory_session(1, 100.0);
        gaze.set_fail_writes(true);
        run(&mut session, 105);
        assert_eq!(session.recorder().flushed_samples(), 0);

        gaze.set_fail_writes(false);
        session.shutdown().unwrap();
        assert_eq!(gaze.contents().lines().count(), 105);
    }

    #[test]
    fn test_init_writes_files() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("form_fusion_session_{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();

        let settings = Settings {
            data_dir: dir.clone(),
            stage_count: 2,
            stage_duration: 1.0,
            ..Default::default()
        };
        let world = SessionWorld {
            sensor: Box::new(SteadyGaze),
            scene: Box::new(EmptyScene),
            content: Box::new(Slots(2)),
            display: None,
        };

        let mut session = Session::init(&settings, world).unwrap();
        assert_eq!(
            fs::read_to_string(settings.blink_log_path()).unwrap(),
            "time;eye;level\n"
        );
        while !session.is_finished() {
            session.tick(DT, &FrameInput::default());
        }
        session.shutdown().unwrap();

        let gaze = fs::read_to_string(settings.gaze_log_path()).unwrap();
        assert!(gaze.starts_with("time;gazeOrigin_x;"));
        assert_eq!(gaze.lines().count(), session.recorder().flushed_samples() + 1);

        let levels = fs::read_to_string(settings.level_log_path()).unwrap();
        assert_eq!(levels.lines().count(), 3);
        assert!(levels.lines().nth(1).unwrap().starts_with("0;0.0000;"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_trigger_on_deadline_frame_ends_stage_once() {
        let (mut session, _) = memory_session(3, 1.0);
        let hover = FrameInput {
            hover_enter: Some(Interactable::new(1, "stage0_cube", "correct")),
            ..Default::default()
        };
        assert!(session.tick(0.5, &hover).is_empty());

        let press = FrameInput {
            trigger_pressed: true,
            ..Default::default()
        };
        // now == 1.0, exactly the countdown deadline
        let ended = session.tick(0.5, &press);
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].stage, 0);
        assert_eq!(ended[0].end_time, 1.0);
        assert_eq!(ended[0].selected_object, "stage0_cube");
        assert!(ended[0].is_correct);

        assert_eq!(session.sequencer().events().len(), 1);
        assert_eq!(session.sequencer().current_stage(), Some(1));
        assert!(session.selector().hovered().is_none());
    }

    #[test]
    fn test_hover_does_not_survive_timeout() {
        let (mut session, _) = memory_session(3, 1.0);
        let hover = FrameInput {
            hover_enter: Some(Interactable::new(1, "stage0_cube", "correct")),
            ..Default::default()
        };
        session.tick(DT, &hover);

        // Stage 0 times out without a press
        let mut ended = Vec::new();
        while ended.is_empty() {
            ended = session.tick(DT, &FrameInput::default());
        }
        assert_eq!(ended[0].selected_object, "");
        assert!(session.selector().hovered().is_none());

        let press = FrameInput {
            trigger_pressed: true,
            ..Default::default()
        };
        assert!(session.tick(DT, &press).is_empty());
        assert_eq!(session.sequencer().events().len(), 1);
        assert_eq!(session.sequencer().current_stage(), Some(1));
    }
}
