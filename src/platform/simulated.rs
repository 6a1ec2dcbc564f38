//! Deterministic simulated devices
//!
//! Everything here is driven by seeded `Pcg32` streams, so the same seed
//! produces the same telemetry files.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::sim::scene::{SceneObject, SdfScene, Shape};
use crate::sim::selection::{CORRECT_TAG, Interactable};
use crate::sim::sensor::{EyeTrackingData, GazeRay, GazeSensor, RayHit, SceneQuery};
use crate::sim::session::FrameInput;
use crate::sim::stage::{StageContent, StageDisplay};

/// Viewer eye height (meters)
pub const EYE_HEIGHT: f32 = 1.6;
/// Pieces per stage
pub const PIECES_PER_STAGE: usize = 3;

/// One selectable piece on the board
#[derive(Debug, Clone)]
pub struct Piece {
    pub stage: usize,
    pub interactable: Interactable,
    /// Index into the board's scene
    pub scene_index: usize,
}

/// All stages' pieces, laid out in a row in front of the viewer
#[derive(Debug, Clone, Default)]
pub struct PuzzleBoard {
    stage_count: usize,
    scene: SdfScene,
    pieces: Vec<Piece>,
}

impl PuzzleBoard {
    /// Build `stage_count` stages of three pieces, one tagged correct
    pub fn generate(stage_count: usize, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut board = Self {
            stage_count,
            ..Default::default()
        };

        let mut next_id = 1;
        for stage in 0..stage_count {
            let correct = rng.random_range(0..PIECES_PER_STAGE);
            for slot in 0..PIECES_PER_STAGE {
                let x = (slot as f32 - 1.0) * 0.6;
                let shape = if rng.random_bool(0.5) {
                    Shape::Sphere { radius: 0.2 }
                } else {
                    Shape::Cube { half_extent: 0.15 }
                };
                let kind = match shape {
                    Shape::Sphere { .. } => "sphere",
                    Shape::Cube { .. } => "cube",
                };
                let name = format!("stage{}_{}_{}", stage, kind, slot);
                let tag = if slot == correct { CORRECT_TAG } else { "Untagged" };

                board.scene.push(SceneObject {
                    name: name.clone(),
                    center: Vec3::new(x, EYE_HEIGHT - 0.1, 2.0),
                    shape,
                    active: false,
                });
                board.pieces.push(Piece {
                    stage,
                    interactable: Interactable::new(next_id, name, tag),
                    scene_index: board.scene.objects.len() - 1,
                });
                next_id += 1;
            }
        }
        board
    }

    pub fn scene(&self) -> &SdfScene {
        &self.scene
    }

    /// Pieces currently shown
    pub fn active_pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces
            .iter()
            .filter(|p| self.scene.objects[p.scene_index].active)
    }

    pub fn center_of(&self, piece: &Piece) -> Vec3 {
        self.scene.objects[piece.scene_index].center
    }
}

impl StageContent for PuzzleBoard {
    fn stage_count(&self) -> usize {
        self.stage_count
    }

    fn set_active(&mut self, stage: usize, active: bool) {
        for piece in self.pieces.iter().filter(|p| p.stage == stage) {
            self.scene.objects[piece.scene_index].active = active;
        }
    }
}

/// The board shared between the sequencer (content) and the recorder
/// (scene) and read by the simulated tracker and participant.
#[derive(Debug, Clone, Default)]
pub struct SharedBoard(Rc<RefCell<PuzzleBoard>>);

impl SharedBoard {
    pub fn new(board: PuzzleBoard) -> Self {
        Self(Rc::new(RefCell::new(board)))
    }

    /// Centers and interactables of the pieces currently shown
    pub fn active_targets(&self) -> Vec<(Vec3, Interactable)> {
        let board = self.0.borrow();
        board
            .active_pieces()
            .map(|p| (board.center_of(p), p.interactable.clone()))
            .collect()
    }
}

impl StageContent for SharedBoard {
    fn stage_count(&self) -> usize {
        self.0.borrow().stage_count()
    }

    fn set_active(&mut self, stage: usize, active: bool) {
        self.0.borrow_mut().set_active(stage, active);
    }
}

impl SceneQuery for SharedBoard {
    fn raycast(&self, ray: &GazeRay) -> Option<RayHit> {
        self.0.borrow().scene().raycast(ray)
    }
}

/// Eye tracker that fixates on the visible pieces with saccades, jitter,
/// blinks and occasional tracking loss
#[derive(Debug)]
pub struct SimulatedEyeTracker {
    rng: Pcg32,
    board: SharedBoard,
    fixation: Vec3,
    fixation_frames: u32,
    left_closed_frames: u32,
    right_closed_frames: u32,
}

impl SimulatedEyeTracker {
    /// Chance per frame that a blink starts
    const BLINK_CHANCE: f64 = 0.006;
    /// Chance per frame of a lost sample
    const DROPOUT_CHANCE: f64 = 0.01;

    pub fn new(board: SharedBoard, seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            board,
            fixation: Vec3::new(0.0, EYE_HEIGHT, 2.0),
            fixation_frames: 0,
            left_closed_frames: 0,
            right_closed_frames: 0,
        }
    }

    fn next_fixation(&mut self) {
        let targets = self.board.active_targets();
        self.fixation = if targets.is_empty() || self.rng.random_bool(0.2) {
            // Look somewhere off the board
            Vec3::new(
                self.rng.random_range(-1.5..1.5),
                self.rng.random_range(0.8..2.4),
                2.5,
            )
        } else {
            targets[self.rng.random_range(0..targets.len())].0
        };
        // 200-800 ms at 90 Hz
        self.fixation_frames = self.rng.random_range(18..72);
    }

    fn update_blinks(&mut self) {
        self.left_closed_frames = self.left_closed_frames.saturating_sub(1);
        self.right_closed_frames = self.right_closed_frames.saturating_sub(1);
        if self.left_closed_frames > 0 || self.right_closed_frames > 0 {
            return;
        }
        if self.rng.random_bool(Self::BLINK_CHANCE) {
            let frames = self.rng.random_range(8..20);
            match self.rng.random_range(0..10) {
                0 => self.left_closed_frames = frames,
                1 => self.right_closed_frames = frames,
                _ => {
                    self.left_closed_frames = frames;
                    self.right_closed_frames = frames;
                }
            }
        }
    }
}

impl GazeSensor for SimulatedEyeTracker {
    fn read(&mut self) -> EyeTrackingData {
        if self.fixation_frames == 0 {
            self.next_fixation();
        }
        self.fixation_frames -= 1;
        self.update_blinks();

        let left = self.left_closed_frames > 0;
        let right = self.right_closed_frames > 0;

        let gaze_ray = if (left && right) || self.rng.random_bool(Self::DROPOUT_CHANCE) {
            GazeRay::invalid()
        } else {
            let origin = Vec3::new(0.0, EYE_HEIGHT, 0.0);
            let jitter = Vec3::new(
                self.rng.random_range(-0.01..0.01),
                self.rng.random_range(-0.01..0.01),
                0.0,
            );
            GazeRay::new(origin, (self.fixation + jitter - origin).normalize_or_zero())
        };

        EyeTrackingData {
            gaze_ray,
            is_left_eye_blinking: left,
            is_right_eye_blinking: right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParticipantStep {
    Thinking { frames_left: u32 },
    Hovering { frames_left: u32 },
    Release,
}

/// Scripted player: thinks, points at a piece, pulls the trigger.
/// Picks the correct piece with probability `accuracy`; sometimes never
/// answers so the stage times out.
#[derive(Debug)]
pub struct Participant {
    rng: Pcg32,
    board: SharedBoard,
    accuracy: f64,
    frame_rate: f64,
    stage_duration: f64,
    step: ParticipantStep,
    target: Option<Interactable>,
}

impl Participant {
    pub fn new(board: SharedBoard, seed: u64, frame_rate: f64, stage_duration: f64) -> Self {
        let mut participant = Self {
            rng: Pcg32::seed_from_u64(seed),
            board,
            accuracy: 0.7,
            frame_rate,
            stage_duration,
            step: ParticipantStep::Release,
            target: None,
        };
        participant.restart();
        participant
    }

    /// New stage: start thinking again
    pub fn restart(&mut self) {
        // Thinks for 20%..130% of the stage; beyond 100% the stage times out
        let fraction = self.rng.random_range(0.2..1.3);
        let frames = (self.stage_duration * fraction * self.frame_rate).max(1.0) as u32;
        self.step = ParticipantStep::Thinking { frames_left: frames };
    }

    /// Input for the next frame
    pub fn next_input(&mut self) -> FrameInput {
        let mut input = FrameInput::default();
        match self.step {
            ParticipantStep::Thinking { frames_left } if frames_left > 0 => {
                self.step = ParticipantStep::Thinking {
                    frames_left: frames_left - 1,
                };
            }
            ParticipantStep::Thinking { .. } => {
                let targets = self.board.active_targets();
                let wants_correct = self.rng.random_bool(self.accuracy);
                let pick = targets
                    .iter()
                    .find(|(_, t)| t.is_correct() == wants_correct)
                    .or_else(|| targets.first())
                    .map(|(_, t)| t.clone());
                if let Some(target) = pick {
                    input.hover_enter = Some(target.clone());
                    self.target = Some(target);
                    let dwell = (0.3 * self.frame_rate).max(1.0) as u32;
                    self.step = ParticipantStep::Hovering { frames_left: dwell };
                } else {
                    self.step = ParticipantStep::Release;
                }
            }
            ParticipantStep::Hovering { frames_left } if frames_left > 0 => {
                self.step = ParticipantStep::Hovering {
                    frames_left: frames_left - 1,
                };
            }
            ParticipantStep::Hovering { .. } => {
                input.trigger_pressed = true;
                self.step = ParticipantStep::Release;
            }
            ParticipantStep::Release => {
                if let Some(target) = self.target.take() {
                    input.hover_exit = Some(target.id);
                }
            }
        }
        input
    }
}

/// Timer widgets rendered as log lines
#[derive(Debug, Default)]
pub struct LogDisplay {
    countdown: String,
}

impl StageDisplay for LogDisplay {
    fn set_level(&mut self, stage: usize) {
        log::info!("Level: {}", stage);
    }

    fn set_progress(&mut self, _elapsed: f64, _max: f64) {}

    fn set_countdown(&mut self, text: &str) {
        if text != self.countdown {
            log::trace!("Countdown {}", text);
            self.countdown = text.to_string();
        }
    }

    fn hide_timer(&mut self) {
        log::info!("Timer hidden");
    }
}
