//! Session simulation module
//!
//! All telemetry and stage logic lives here. Everything runs on the host's
//! frame loop:
//! - Time only advances through `Session::tick`
//! - Timers are polled deadlines, never callbacks
//! - No engine or headset dependencies (those sit behind traits)

pub mod blink;
pub mod recorder;
pub mod scene;
pub mod selection;
pub mod sensor;
pub mod session;
pub mod stage;
pub mod timer;

pub use blink::{BlinkEdgeDetector, BlinkEvent, BlinkEye};
pub use recorder::{FlushReport, GazeRecorder, GazeSample};
pub use scene::{SceneObject, SdfScene, Shape, sd_box, sd_sphere};
pub use selection::{CORRECT_TAG, HoverSelector, Interactable};
pub use sensor::{EmptyScene, EyeTrackingData, GazeRay, GazeSensor, RayHit, SceneQuery};
pub use session::{FrameInput, Session, SessionWorld};
pub use stage::{StageContent, StageDisplay, StageEvent, StagePhase, StageSequencer};
pub use timer::{IntervalTimer, SessionClock, Timer};
