//! Stage sequencer
//!
//! Walks the puzzle stages in order. Each stage is bounded by a countdown;
//! a stage ends when the countdown expires or when `advance` is called after
//! a selection. Every ended stage produces exactly one `StageEvent`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::timer::Timer;
use crate::error::TelemetryResult;
use crate::persistence::{render_header, render_rows, write_atomic};

/// Sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StagePhase {
    /// Not started yet
    Inactive,
    /// Stage `stage` running since `start_time`
    Active { stage: usize, start_time: f64 },
    /// All stages done
    Completed,
}

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    pub stage: usize,
    pub start_time: f64,
    pub end_time: f64,
    /// Empty when the stage timed out
    pub selected_object: String,
    pub is_correct: bool,
}

impl StageEvent {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Per-stage visual content (one puzzle per stage)
pub trait StageContent {
    fn stage_count(&self) -> usize;
    fn set_active(&mut self, stage: usize, active: bool);
}

/// Timer and level widgets. All optional for the sequencer.
pub trait StageDisplay {
    fn set_level(&mut self, stage: usize);
    fn set_progress(&mut self, elapsed: f64, max: f64);
    fn set_countdown(&mut self, text: &str);
    fn hide_timer(&mut self);
}

#[derive(Debug, Clone, Default)]
struct PendingSelection {
    object_name: String,
    is_correct: bool,
}

pub struct StageSequencer {
    phase: StagePhase,
    stage_count: usize,
    stage_duration: f64,
    countdown: Timer,
    pending: PendingSelection,
    events: Vec<StageEvent>,
    content: Box<dyn StageContent>,
    display: Option<Box<dyn StageDisplay>>,
}

impl std::fmt::Debug for StageSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSequencer")
            .field("phase", &self.phase)
            .field("stage_count", &self.stage_count)
            .field("stage_duration", &self.stage_duration)
            .field("countdown", &self.countdown)
            .field("events", &self.events.len())
            .finish()
    }
}

impl StageSequencer {
    pub fn new(content: Box<dyn StageContent>, stage_duration: f64) -> Self {
        let stage_count = content.stage_count();
        Self {
            phase: StagePhase::Inactive,
            stage_count,
            stage_duration,
            countdown: Timer::new(),
            pending: PendingSelection::default(),
            events: Vec::new(),
            content,
            display: None,
        }
    }

    /// Attach timer/level widgets
    pub fn with_display(mut self, display: Box<dyn StageDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn phase(&self) -> StagePhase {
        self.phase
    }

    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    pub fn stage_duration(&self) -> f64 {
        self.stage_duration
    }

    pub fn is_completed(&self) -> bool {
        self.phase == StagePhase::Completed
    }

    /// Current stage while active
    pub fn current_stage(&self) -> Option<usize> {
        match self.phase {
            StagePhase::Active { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Level tag for telemetry: 0 before start, the stage while active, the
    /// stage count once completed.
    pub fn level_index(&self) -> usize {
        match self.phase {
            StagePhase::Inactive => 0,
            StagePhase::Active { stage, .. } => stage,
            StagePhase::Completed => self.stage_count,
        }
    }

    /// Ended stages, in order
    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    /// Begin stage 0. Ignored unless inactive.
    pub fn start(&mut self, now: f64) {
        if self.phase != StagePhase::Inactive {
            log::debug!("start() ignored in phase {:?}", self.phase);
            return;
        }

        for stage in 0..self.stage_count {
            self.content.set_active(stage, false);
        }

        if self.stage_count == 0 {
            log::warn!("No stages configured, session completes immediately");
            self.complete();
            return;
        }

        self.enter_stage(0, now);
    }

    /// Seconds left on the current countdown
    pub fn remaining_time(&self, now: f64) -> f64 {
        match self.phase {
            StagePhase::Active { start_time, .. } => {
                (self.stage_duration - (now - start_time)).max(0.0)
            }
            _ => 0.0,
        }
    }

    /// Per-frame update: expire the countdown, then refresh the widgets.
    /// Returns the event of a stage that timed out this frame.
    pub fn tick(&mut self, now: f64) -> Option<StageEvent> {
        let timed_out = if self.countdown.poll(now) {
            log::info!("Stage {} timed out", self.level_index());
            self.finish_stage(now)
        } else {
            None
        };

        if let StagePhase::Active { .. } = self.phase {
            let remaining = self.remaining_time(now);
            let elapsed = self.stage_duration - remaining;
            let max = self.stage_duration;
            if let Some(display) = self.display.as_mut() {
                display.set_progress(elapsed, max);
                display.set_countdown(&format!("{}s", remaining.ceil()));
            }
        }

        timed_out
    }

    /// Remember the player's pick for the next `advance`
    pub fn record_selection(&mut self, object_name: &str, is_correct: bool) {
        self.pending = PendingSelection {
            object_name: object_name.to_string(),
            is_correct,
        };
    }

    /// End the current stage now. No-op unless a stage is active.
    pub fn advance(&mut self, now: f64) -> Option<StageEvent> {
        self.finish_stage(now)
    }

    /// Write all stage events to `path`, replacing any previous file
    pub fn save_summary(&self, path: &Path) -> TelemetryResult<()> {
        let mut csv = render_header::<StageEvent>()?;
        csv.push_str(&render_rows(&self.events)?);
        write_atomic(path, &csv)?;
        log::info!("Level event data saved to: {}", path.display());
        Ok(())
    }

    fn enter_stage(&mut self, stage: usize, now: f64) {
        self.phase = StagePhase::Active {
            stage,
            start_time: now,
        };
        self.content.set_active(stage, true);
        self.countdown.arm(now, self.stage_duration);

        if let Some(display) = self.display.as_mut() {
            display.set_level(stage);
            display.set_progress(0.0, self.stage_duration);
        }
        log::info!("Stage {} started at {:.3}s", stage, now);
    }

    fn finish_stage(&mut self, now: f64) -> Option<StageEvent> {
        let StagePhase::Active { stage, start_time } = self.phase else {
            log::debug!("advance() ignored in phase {:?}", self.phase);
            return None;
        };

        self.countdown.cancel();
        let pending = std::mem::take(&mut self.pending);
        let event = StageEvent {
            stage,
            start_time,
            end_time: now,
            selected_object: pending.object_name,
            is_correct: pending.is_correct,
        };
        self.events.push(event.clone());
        self.content.set_active(stage, false);

        if stage + 1 < self.stage_count {
            self.enter_stage(stage + 1, now);
        } else {
            self.complete();
        }

        Some(event)
    }

    fn complete(&mut self) {
        self.phase = StagePhase::Completed;
        self.countdown.cancel();
        if let Some(display) = self.display.as_mut() {
            display.hide_timer();
        }
        log::info!("All {} stages completed", self.stage_count);
    }
}
