//! CSV row layout for the three telemetry files

use csv::WriterBuilder;

use crate::consts::CSV_DELIMITER;
use crate::error::TelemetryResult;
use crate::sim::blink::BlinkEvent;
use crate::sim::recorder::GazeSample;
use crate::sim::stage::StageEvent;

/// A record with a fixed column layout
pub trait CsvRecord {
    /// Column names, in order
    const HEADER: &'static [&'static str];

    /// Field values, in header order
    fn fields(&self) -> Vec<String>;
}

/// Timestamps are written in seconds with four decimals
pub fn format_time(t: f64) -> String {
    format!("{:.4}", t)
}

/// Booleans are written as `True` / `False`
pub fn format_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

/// Level index, or -1 when no stage sequencer was attached
pub fn format_level(level: Option<usize>) -> String {
    match level {
        Some(level) => level.to_string(),
        None => "-1".to_string(),
    }
}

fn writer() -> csv::Writer<Vec<u8>> {
    WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .has_headers(false)
        .from_writer(Vec::new())
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> TelemetryResult<String> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    // Every field we write is built from Rust strings, so this cannot fail
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// The header row for `T`, newline-terminated
pub fn render_header<T: CsvRecord>() -> TelemetryResult<String> {
    let mut wtr = writer();
    wtr.write_record(T::HEADER)?;
    finish(wtr)
}

/// Render `rows` as newline-terminated CSV lines (no header)
pub fn render_rows<'a, T, I>(rows: I) -> TelemetryResult<String>
where
    T: CsvRecord + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut wtr = writer();
    for row in rows {
        wtr.write_record(row.fields())?;
    }
    finish(wtr)
}

impl CsvRecord for GazeSample {
    const HEADER: &'static [&'static str] = &[
        "time",
        "gazeOrigin_x",
        "gazeOrigin_y",
        "gazeOrigin_z",
        "gazeDirection_x",
        "gazeDirection_y",
        "gazeDirection_z",
        "gazeIsValid",
        "isLeftEyeBlinking",
        "isRightEyeBlinking",
        "gaze_hit_x",
        "gaze_hit_y",
        "gaze_hit_z",
        "object_name",
        "level",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            format_time(self.time),
            self.gaze_origin.x.to_string(),
            self.gaze_origin.y.to_string(),
            self.gaze_origin.z.to_string(),
            self.gaze_direction.x.to_string(),
            self.gaze_direction.y.to_string(),
            self.gaze_direction.z.to_string(),
            format_bool(self.gaze_is_valid).to_string(),
            format_bool(self.is_left_eye_blinking).to_string(),
            format_bool(self.is_right_eye_blinking).to_string(),
            self.gaze_hit_point.x.to_string(),
            self.gaze_hit_point.y.to_string(),
            self.gaze_hit_point.z.to_string(),
            self.object_name.clone(),
            format_level(self.level),
        ]
    }
}

impl CsvRecord for BlinkEvent {
    const HEADER: &'static [&'static str] = &["time", "eye", "level"];

    fn fields(&self) -> Vec<String> {
        vec![
            format_time(self.time),
            self.eye.as_str().to_string(),
            format_level(self.level),
        ]
    }
}

impl CsvRecord for StageEvent {
    const HEADER: &'static [&'static str] = &[
        "level",
        "startTime",
        "endTime",
        "duration",
        "selectedObject",
        "isCorrect",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.stage.to_string(),
            format_time(self.start_time),
            format_time(self.end_time),
            format_time(self.duration()),
            self.selected_object.clone(),
            format_bool(self.is_correct).to_string(),
        ]
    }
}
