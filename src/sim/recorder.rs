//! Gaze and blink recorder
//!
//! Samples the eye tracker once per frame and buffers the result. `flush`
//! appends everything not yet written to the gaze and blink logs. Flushed
//! samples leave memory; only a count is kept, so a long session holds at
//! most one flush interval of samples.
//!
//! A failed write leaves the batch buffered for the next flush. Sinks roll
//! back partial writes, so a retried batch is never duplicated.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::blink::{BlinkEdgeDetector, BlinkEvent};
use super::sensor::{GazeSensor, SceneQuery};
use crate::error::TelemetryResult;
use crate::persistence::{LogSink, render_rows};

/// One frame of gaze telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub time: f64,
    pub gaze_origin: Vec3,
    pub gaze_direction: Vec3,
    pub gaze_is_valid: bool,
    pub is_left_eye_blinking: bool,
    pub is_right_eye_blinking: bool,
    /// Zero when nothing was hit
    pub gaze_hit_point: Vec3,
    /// Empty when nothing was hit
    pub object_name: String,
    /// Stage index, `None` when no sequencer is attached
    pub level: Option<usize>,
}

/// Rows written by one `flush`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub samples: usize,
    pub blinks: usize,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.samples == 0 && self.blinks == 0
    }
}

pub struct GazeRecorder {
    recording: bool,
    blink_detector: BlinkEdgeDetector,
    /// Samples not yet written
    pending_samples: Vec<GazeSample>,
    /// Blink events not yet written
    pending_blinks: Vec<BlinkEvent>,
    flushed_samples: usize,
    flushed_blinks: usize,
    gaze_log: Box<dyn LogSink>,
    blink_log: Box<dyn LogSink>,
}

impl std::fmt::Debug for GazeRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GazeRecorder")
            .field("recording", &self.recording)
            .field("pending_samples", &self.pending_samples.len())
            .field("pending_blinks", &self.pending_blinks.len())
            .field("flushed_samples", &self.flushed_samples)
            .field("flushed_blinks", &self.flushed_blinks)
            .finish()
    }
}

impl GazeRecorder {
    pub fn new(gaze_log: Box<dyn LogSink>, blink_log: Box<dyn LogSink>) -> Self {
        Self {
            recording: true,
            blink_detector: BlinkEdgeDetector::new(),
            pending_samples: Vec::new(),
            pending_blinks: Vec::new(),
            flushed_samples: 0,
            flushed_blinks: 0,
            gaze_log,
            blink_log,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn set_recording(&mut self, recording: bool) {
        if recording != self.recording {
            log::info!("Gaze recording {}", if recording { "enabled" } else { "disabled" });
        }
        self.recording = recording;
    }

    /// Record one frame. Returns the sample, or `None` while recording is off.
    pub fn sample(
        &mut self,
        now: f64,
        level: Option<usize>,
        sensor: &mut dyn GazeSensor,
        scene: &dyn SceneQuery,
    ) -> Option<&GazeSample> {
        if !self.recording {
            return None;
        }

        let data = sensor.read();
        let left = data.is_left_eye_blinking;
        let right = data.is_right_eye_blinking;

        if let Some(eye) = self.blink_detector.update(left, right) {
            self.pending_blinks.push(BlinkEvent {
                time: now,
                eye,
                level,
            });
        }

        let ray = data.gaze_ray;
        let mut sample = GazeSample {
            time: now,
            gaze_origin: ray.origin,
            gaze_direction: ray.direction,
            gaze_is_valid: ray.is_valid,
            is_left_eye_blinking: left,
            is_right_eye_blinking: right,
            gaze_hit_point: Vec3::ZERO,
            object_name: String::new(),
            level,
        };

        if ray.is_valid {
            if let Some(hit) = scene.raycast(&ray) {
                sample.gaze_hit_point = hit.point;
                sample.object_name = hit.object_name;
            }
        }

        self.pending_samples.push(sample);
        self.pending_samples.last()
    }

    /// Write all pending rows. Both logs are attempted even if the first
    /// fails; the first error is returned and its batch stays pending.
    pub fn flush(&mut self) -> TelemetryResult<FlushReport> {
        let samples = self.flush_samples();
        let blinks = self.flush_blinks();
        Ok(FlushReport {
            samples: samples?,
            blinks: blinks?,
        })
    }

    fn flush_samples(&mut self) -> TelemetryResult<usize> {
        if self.pending_samples.is_empty() {
            return Ok(0);
        }
        let chunk = render_rows(&self.pending_samples)?;
        self.gaze_log.append(&chunk)?;

        let written = self.pending_samples.len();
        self.pending_samples.clear();
        self.flushed_samples += written;
        Ok(written)
    }

    fn flush_blinks(&mut self) -> TelemetryResult<usize> {
        if self.pending_blinks.is_empty() {
            return Ok(0);
        }
        let chunk = render_rows(&self.pending_blinks)?;
        self.blink_log.append(&chunk)?;

        let written = self.pending_blinks.len();
        self.pending_blinks.clear();
        self.flushed_blinks += written;
        Ok(written)
    }

    pub fn pending_samples(&self) -> &[GazeSample] {
        &self.pending_samples
    }

    pub fn pending_blinks(&self) -> &[BlinkEvent] {
        &self.pending_blinks
    }

    /// Samples written to the gaze log so far
    pub fn flushed_samples(&self) -> usize {
        self.flushed_samples
    }

    /// Blink events written to the blink log so far
    pub fn flushed_blinks(&self) -> usize {
        self.flushed_blinks
    }

    /// Samples recorded this session, written or not
    pub fn total_samples(&self) -> usize {
        self.flushed_samples + self.pending_samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemorySink;
    use crate::sim::blink::BlinkEye;
    use crate::sim::scene::{SceneObject, SdfScene, Shape};
    use crate::sim::sensor::{EmptyScene, EyeTrackingData, GazeRay};
    use proptest::prelude::*;
    use std::collections::VecDeque;

    /// Plays back a fixed list of frames, then repeats the last one
    struct ScriptedSensor {
        frames: VecDeque<EyeTrackingData>,
        last: EyeTrackingData,
    }

    impl ScriptedSensor {
        fn new(frames: Vec<EyeTrackingData>) -> Self {
            Self {
                frames: frames.into(),
                last: EyeTrackingData::default(),
            }
        }
    }

    impl GazeSensor for ScriptedSensor {
        fn read(&mut self) -> EyeTrackingData {
            if let Some(frame) = self.frames.pop_front() {
                self.last = frame;
            }
            self.last
        }
    }

    fn frame(valid: bool, left: bool, right: bool) -> EyeTrackingData {
        EyeTrackingData {
            gaze_ray: if valid {
                GazeRay::new(Vec3::new(0.0, 1.6, 0.0), Vec3::Z)
            } else {
                GazeRay::invalid()
            },
            is_left_eye_blinking: left,
            is_right_eye_blinking: right,
        }
    }

    fn recorder() -> (GazeRecorder, MemorySink, MemorySink) {
        let gaze = MemorySink::new();
        let blinks = MemorySink::new();
        let rec = GazeRecorder::new(Box::new(gaze.clone()), Box::new(blinks.clone()));
        (rec, gaze, blinks)
    }

    fn target_scene() -> SdfScene {
        let mut scene = SdfScene::new();
        scene.push(SceneObject {
            name: "target".to_string(),
            center: Vec3::new(0.0, 1.6, 3.0),
            shape: Shape::Sphere { radius: 0.5 },
            active: true,
        });
        scene
    }

    #[test]
    fn test_sample_records_hit() {
        let (mut rec, _, _) = recorder();
        let mut sensor = ScriptedSensor::new(vec![frame(true, false, false)]);
        let scene = target_scene();

        let sample = rec.sample(0.5, Some(1), &mut sensor, &scene).cloned().unwrap();
        assert_eq!(sample.object_name, "target");
        assert!((sample.gaze_hit_point.z - 2.5).abs() < 0.01);
        assert_eq!(sample.level, Some(1));
        assert!(sample.gaze_is_valid);
    }

    #[test]
    fn test_invalid_gaze_skips_raycast_but_is_logged() {
        let (mut rec, gaze, _) = recorder();
        let mut sensor = ScriptedSensor::new(vec![frame(false, false, false)]);
        let scene = target_scene();

        let sample = rec.sample(0.0, Some(0), &mut sensor, &scene).cloned().unwrap();
        assert!(!sample.gaze_is_valid);
        assert_eq!(sample.object_name, "");
        assert_eq!(sample.gaze_hit_point, Vec3::ZERO);

        rec.flush().unwrap();
        assert!(gaze.contents().contains(";False;False;False;0;0;0;;0\n"));
    }

    #[test]
    fn test_recording_disabled_buffers_nothing() {
        let (mut rec, _, _) = recorder();
        let mut sensor = ScriptedSensor::new(vec![frame(true, true, true)]);
        rec.set_recording(false);
        assert!(rec.sample(0.0, None, &mut sensor, &EmptyScene).is_none());
        assert!(rec.pending_samples().is_empty());
        assert!(rec.pending_blinks().is_empty());
    }

    #[test]
    fn test_blinks_buffered_and_cleared_on_flush() {
        let (mut rec, _, blinks) = recorder();
        let mut sensor = ScriptedSensor::new(vec![
            frame(true, false, false),
            frame(true, true, true),
            frame(true, false, false),
            frame(true, true, false),
        ]);
        for i in 0..4 {
            rec.sample(i as f64 * 0.1, Some(0), &mut sensor, &EmptyScene);
        }
        let eyes: Vec<BlinkEye> = rec.pending_blinks().iter().map(|b| b.eye).collect();
        assert_eq!(eyes, vec![BlinkEye::Both, BlinkEye::Left]);

        let report = rec.flush().unwrap();
        assert_eq!(report, FlushReport { samples: 4, blinks: 2 });
        assert!(rec.pending_blinks().is_empty());
        assert_eq!(blinks.contents(), "0.1000;Both;0\n0.3000;Left;0\n");
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let (mut rec, gaze, blinks) = recorder();
        assert!(rec.flush().unwrap().is_empty());
        assert!(rec.flush().unwrap().is_empty());
        assert_eq!(gaze.append_count(), 0);
        assert_eq!(blinks.append_count(), 0);
    }

    #[test]
    fn test_shutdown_flush_writes_only_pending() {
        let (mut rec, gaze, _) = recorder();
        let mut sensor = ScriptedSensor::new(vec![frame(true, false, false)]);

        for i in 0..7 {
            rec.sample(i as f64, Some(0), &mut sensor, &EmptyScene);
        }
        rec.flush().unwrap();
        for i in 7..10 {
            rec.sample(i as f64, Some(0), &mut sensor, &EmptyScene);
        }

        let report = rec.flush().unwrap();
        assert_eq!(report.samples, 3);
        assert_eq!(rec.flushed_samples(), 10);
        assert_eq!(gaze.contents().lines().count(), 10);

        // Back-to-back flush writes nothing more
        assert!(rec.flush().unwrap().is_empty());
        assert_eq!(gaze.contents().lines().count(), 10);
    }

    #[test]
    fn test_failed_flush_retries_without_loss() {
        let (mut rec, gaze, blinks) = recorder();
        let mut sensor = ScriptedSensor::new(vec![frame(true, true, false), frame(true, false, false)]);

        rec.sample(0.0, Some(0), &mut sensor, &EmptyScene);
        gaze.set_fail_writes(true);
        assert!(rec.flush().is_err());
        assert_eq!(rec.pending_samples().len(), 1);
        // Blink log was still flushed
        assert_eq!(blinks.contents().lines().count(), 1);

        rec.sample(1.0, Some(0), &mut sensor, &EmptyScene);
        gaze.set_fail_writes(false);
        let report = rec.flush().unwrap();
        assert_eq!(report.samples, 2);
        assert_eq!(gaze.contents().lines().count(), 2);
        assert!(gaze.contents().starts_with("0.0000;"));
    }

    proptest! {
        /// Rows written across any flush schedule, including failed flushes,
        /// equal the rows of a single flush of the same samples.
        #[test]
        fn prop_flush_batching_is_invisible(
            frames in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()), 1..120)
        ) {
            let scene = target_scene();
            let data: Vec<EyeTrackingData> = frames.iter().map(|&(v, l, r, _, _)| frame(v, l, r)).collect();

            let (mut batched, gaze, blinks) = recorder();
            let mut sensor = ScriptedSensor::new(data.clone());
            for (i, &(_, _, _, flush_now, fail)) in frames.iter().enumerate() {
                batched.sample(i as f64 * 0.01, Some(i / 40), &mut sensor, &scene);
                if flush_now {
                    gaze.set_fail_writes(fail);
                    blinks.set_fail_writes(fail);
                    let _ = batched.flush();
                    gaze.set_fail_writes(false);
                    blinks.set_fail_writes(false);
                }
            }
            batched.flush().unwrap();

            let (mut single, gaze_ref, blinks_ref) = recorder();
            let mut sensor = ScriptedSensor::new(data);
            for i in 0..frames.len() {
                single.sample(i as f64 * 0.01, Some(i / 40), &mut sensor, &scene);
            }
            single.flush().unwrap();

            prop_assert_eq!(gaze.contents(), gaze_ref.contents());
            prop_assert_eq!(blinks.contents(), blinks_ref.contents());
            prop_assert_eq!(batched.flushed_samples(), frames.len());
            prop_assert!(batched.pending_samples().is_empty());
        }
    }
}
