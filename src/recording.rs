//! focus.frame.v1 recorded landmark stream
//!
//! A recording is one JSON object per processed frame, carrying the face
//! regions and 68-point landmarks an external detector produced. Recordings
//! can be replayed through the same session loop as a live camera, which is
//! how the CLI's `replay` and `run` commands work.
//!
//! ```json
//! {"schema_version":"focus.frame.v1","frame":0,"t":0.033,
//!  "faces":[{"region":{"x":10,"y":20,"width":100,"height":100},
//!            "landmarks":[[x,y], ...68 pairs]}]}
//! ```

use serde::{Deserialize, Serialize};

use crate::clock::ManualClock;
use crate::error::FocusError;
use crate::runner::{FaceDetector, FrameSource, LandmarkPredictor};
use crate::types::{FaceLandmarks, FaceRegion, Point2};

/// Current recording schema version
pub const SCHEMA_VERSION: &str = "focus.frame.v1";

/// One detected face in a recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFace {
    /// Detector bounding box; derived from the landmarks when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<FaceRegion>,
    pub landmarks: Vec<Point2>,
}

impl RecordedFace {
    /// The detector region, or the landmarks' bounding box
    pub fn region(&self) -> FaceRegion {
        self.region.unwrap_or_else(|| bounding_box(&self.landmarks))
    }
}

/// One recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub schema_version: String,
    /// Optional frame counter from the producer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    /// Seconds since session start
    pub t: f64,
    #[serde(default)]
    pub faces: Vec<RecordedFace>,
}

impl RecordedFrame {
    pub fn new(t: f64, faces: Vec<RecordedFace>) -> Self {
        RecordedFrame {
            schema_version: SCHEMA_VERSION.to_string(),
            frame: None,
            t,
            faces,
        }
    }

    /// Validate a single frame in isolation
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }
        if !self.t.is_finite() || self.t < 0.0 {
            return Err(ValidationError::InvalidTimestamp(self.t));
        }
        for (face, recorded) in self.faces.iter().enumerate() {
            let count = recorded.landmarks.len();
            if count != crate::types::FACE_LANDMARK_COUNT {
                return Err(ValidationError::LandmarkCount { face, count });
            }
            if let Some(point) = recorded.landmarks.iter().position(|p| !p.is_finite()) {
                return Err(ValidationError::NonFiniteLandmark { face, point });
            }
        }
        Ok(())
    }

    /// Landmarks of every recorded face
    pub fn face_landmarks(&self) -> Result<Vec<FaceLandmarks>, FocusError> {
        self.faces
            .iter()
            .map(|face| FaceLandmarks::new(face.landmarks.clone()))
            .collect()
    }
}

/// Validation errors for recorded frames
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    #[error("Timestamp {current} does not follow {previous}")]
    OutOfOrder { previous: f64, current: f64 },

    #[error("Face {face} has {count} landmarks, expected 68")]
    LandmarkCount { face: usize, count: usize },

    #[error("Face {face} landmark {point} is not finite")]
    NonFiniteLandmark { face: usize, point: usize },
}

/// A frame of a stream that failed validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub frame: Option<u64>,
    pub error: ValidationError,
}

/// Parsing and validation for recorded streams
pub struct RecordingAdapter;

impl RecordingAdapter {
    /// Parse a JSON array of frames
    pub fn parse_array(json: &str) -> Result<Vec<RecordedFrame>, FocusError> {
        let frames: Vec<RecordedFrame> = serde_json::from_str(json)?;
        Ok(frames)
    }

    /// Parse NDJSON, one frame per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RecordedFrame>, FocusError> {
        let mut frames = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            if let Some(frame) = Self::parse_line(line).map_err(|e| {
                FocusError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
            })? {
                frames.push(frame);
            }
        }
        Ok(frames)
    }

    /// Parse one NDJSON line; blank lines yield `None`
    pub fn parse_line(line: &str) -> Result<Option<RecordedFrame>, serde_json::Error> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(trimmed).map(Some)
    }

    /// Validate every frame, including ordering across the stream.
    /// Only failing frames are returned.
    pub fn validate_frames(frames: &[RecordedFrame]) -> Vec<ValidationResult> {
        let mut previous: Option<f64> = None;
        frames
            .iter()
            .enumerate()
            .filter_map(|(index, frame)| {
                let mut result = frame.validate().err();
                if result.is_none() {
                    if let Some(prev) = previous {
                        if frame.t <= prev {
                            result = Some(ValidationError::OutOfOrder {
                                previous: prev,
                                current: frame.t,
                            });
                        }
                    }
                    previous = Some(frame.t);
                }
                result.map(|error| ValidationResult {
                    index,
                    frame: frame.frame,
                    error,
                })
            })
            .collect()
    }
}

/// In-memory frames adapted to the fallible stream [`ReplaySource`] expects
pub type FrameList = std::iter::Map<
    std::vec::IntoIter<RecordedFrame>,
    fn(RecordedFrame) -> Result<RecordedFrame, FocusError>,
>;

/// Replays recorded frames as a [`FrameSource`], moving a shared
/// [`ManualClock`] to each frame's timestamp
pub struct ReplaySource<I> {
    frames: I,
    clock: ManualClock,
    last_t: Option<f64>,
}

impl ReplaySource<FrameList> {
    pub fn from_frames(frames: Vec<RecordedFrame>) -> Self {
        let wrap: fn(RecordedFrame) -> Result<RecordedFrame, FocusError> = Ok;
        Self::new(frames.into_iter().map(wrap))
    }
}

impl<I> ReplaySource<I>
where
    I: Iterator<Item = Result<RecordedFrame, FocusError>>,
{
    /// Replay a fallible stream, such as lines read from stdin
    pub fn new(frames: I) -> Self {
        Self {
            frames,
            clock: ManualClock::new(),
            last_t: None,
        }
    }

    /// Clock that follows the replayed timestamps
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }
}

impl<I> FrameSource for ReplaySource<I>
where
    I: Iterator<Item = Result<RecordedFrame, FocusError>>,
{
    type Frame = RecordedFrame;

    fn next_frame(&mut self) -> Result<Option<RecordedFrame>, FocusError> {
        let frame = match self.frames.next() {
            Some(frame) => frame?,
            None => return Ok(None),
        };
        frame.validate()?;
        // the clock never moves backwards, so finishing after a rejected frame
        // still uses the last accepted time
        if let Some(previous) = self.last_t.filter(|&previous| frame.t <= previous) {
            return Err(ValidationError::OutOfOrder {
                previous,
                current: frame.t,
            }
            .into());
        }
        self.last_t = Some(frame.t);
        self.clock.set(frame.t);
        Ok(Some(frame))
    }
}

/// Detector and predictor that read back what was recorded
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordedModel;

impl FaceDetector<RecordedFrame> for RecordedModel {
    fn detect(&mut self, frame: &RecordedFrame) -> Result<Vec<FaceRegion>, FocusError> {
        Ok(frame.faces.iter().map(RecordedFace::region).collect())
    }
}

impl LandmarkPredictor<RecordedFrame> for RecordedModel {
    fn predict(&mut self, frame: &RecordedFrame, region: &FaceRegion) -> Result<FaceLandmarks, FocusError> {
        let face = frame
            .faces
            .iter()
            .find(|face| face.region() == *region)
            .ok_or_else(|| FocusError::Capture(format!("no recorded face for region {:?}", region)))?;
        FaceLandmarks::new(face.landmarks.clone())
    }
}

fn bounding_box(points: &[Point2]) -> FaceRegion {
    if points.is_empty() {
        return FaceRegion { x: 0, y: 0, width: 0, height: 0 };
    }
    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    FaceRegion {
        x: min_x.floor() as i32,
        y: min_y.floor() as i32,
        width: (max_x - min_x).ceil() as i32,
        height: (max_y - min_y).ceil() as i32,
    }
}
