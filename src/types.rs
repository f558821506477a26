//! Core types for focus-meter
//!
//! This module defines the data that flows through a session: landmark
//! geometry coming from the predictor, per-frame focus state, timeline
//! samples and the end-of-session report.

use serde::{Deserialize, Serialize};

use crate::error::FocusError;

/// Number of points in the standard facial landmark layout
pub const FACE_LANDMARK_COUNT: usize = 68;

/// Number of points describing one eye
pub const EYE_LANDMARK_COUNT: usize = 6;

/// Left eye slice of the 68-point layout
pub const LEFT_EYE_RANGE: std::ops::Range<usize> = 36..42;

/// Right eye slice of the 68-point layout
pub const RIGHT_EYE_RANGE: std::ops::Range<usize> = 42..48;

/// A 2D image-space point, serialized as `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Point2 { x, y }
    }
}

impl From<Point2> for [f64; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

/// The six ordered points of one eye.
///
/// Order: left corner, two upper-lid points, right corner, two lower-lid
/// points. Index pairs (1,5) and (2,4) are vertical, (0,3) is horizontal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeLandmarks(pub [Point2; EYE_LANDMARK_COUNT]);

impl EyeLandmarks {
    pub fn points(&self) -> &[Point2; EYE_LANDMARK_COUNT] {
        &self.0
    }
}

impl TryFrom<&[Point2]> for EyeLandmarks {
    type Error = FocusError;

    fn try_from(points: &[Point2]) -> Result<Self, Self::Error> {
        let array: [Point2; EYE_LANDMARK_COUNT] =
            points.try_into().map_err(|_| FocusError::InvalidLandmarkCount {
                expected: EYE_LANDMARK_COUNT,
                actual: points.len(),
            })?;
        Ok(EyeLandmarks(array))
    }
}

/// The full 68-point landmark set for one face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point2>", into = "Vec<Point2>")]
pub struct FaceLandmarks(Vec<Point2>);

impl FaceLandmarks {
    pub fn new(points: Vec<Point2>) -> Result<Self, FocusError> {
        if points.len() != FACE_LANDMARK_COUNT {
            return Err(FocusError::InvalidLandmarkCount {
                expected: FACE_LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        Ok(FaceLandmarks(points))
    }

    pub fn points(&self) -> &[Point2] {
        &self.0
    }

    pub fn left_eye(&self) -> EyeLandmarks {
        self.eye(LEFT_EYE_RANGE)
    }

    pub fn right_eye(&self) -> EyeLandmarks {
        self.eye(RIGHT_EYE_RANGE)
    }

    fn eye(&self, range: std::ops::Range<usize>) -> EyeLandmarks {
        let mut eye = [Point2::default(); EYE_LANDMARK_COUNT];
        eye.copy_from_slice(&self.0[range]);
        EyeLandmarks(eye)
    }
}

impl TryFrom<Vec<Point2>> for FaceLandmarks {
    type Error = FocusError;

    fn try_from(points: Vec<Point2>) -> Result<Self, Self::Error> {
        FaceLandmarks::new(points)
    }
}

impl From<FaceLandmarks> for Vec<Point2> {
    fn from(face: FaceLandmarks) -> Self {
        face.0
    }
}

/// Axis-aligned face bounding region in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Per-frame focus classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusState {
    #[default]
    Distracted,
    Focused,
}

impl FocusState {
    pub fn is_focused(&self) -> bool {
        matches!(self, FocusState::Focused)
    }

    /// Binary flag used by the timeline and chart
    pub fn as_flag(&self) -> u8 {
        match self {
            FocusState::Distracted => 0,
            FocusState::Focused => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FocusState::Distracted => "distracted",
            FocusState::Focused => "focused",
        }
    }
}

/// One timeline entry: elapsed session time and the frame's focus flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineSample {
    /// Seconds since session start
    pub t: f64,
    /// 1 when the frame classified as focused, else 0
    pub focused: u8,
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Frame counts by classification outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCounts {
    pub total: u64,
    pub focused: u64,
    pub no_face: u64,
    pub degenerate: u64,
}

/// End-of-session report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub session_id: String,
    pub started_at_utc: String,
    pub ended_at_utc: String,
    /// EAR threshold the session classified with
    pub threshold: f64,
    /// Total focused wall-clock time (seconds)
    pub total_focus_seconds: f64,
    /// Session length (seconds)
    pub session_seconds: f64,
    /// Focused time over session time (0-1)
    pub focus_ratio: f64,
    pub frames: FrameCounts,
    /// Number of completed focused intervals
    pub focus_runs: u32,
    /// Longest single focused interval (seconds)
    pub longest_focus_seconds: f64,
    pub timeline: Vec<TimelineSample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_with(fill: impl Fn(usize) -> Point2) -> FaceLandmarks {
        FaceLandmarks::new((0..FACE_LANDMARK_COUNT).map(fill).collect()).unwrap()
    }

    #[test]
    fn test_eye_slices_follow_68_point_layout() {
        let face = face_with(|i| Point2::new(i as f64, 0.0));

        assert_eq!(face.left_eye().points()[0].x, 36.0);
        assert_eq!(face.left_eye().points()[5].x, 41.0);
        assert_eq!(face.right_eye().points()[0].x, 42.0);
        assert_eq!(face.right_eye().points()[5].x, 47.0);
    }

    #[test]
    fn test_face_landmarks_reject_wrong_count() {
        let result = FaceLandmarks::new(vec![Point2::default(); 5]);
        assert!(matches!(
            result,
            Err(FocusError::InvalidLandmarkCount { expected: 68, actual: 5 })
        ));
    }

    #[test]
    fn test_eye_landmarks_reject_wrong_count() {
        let points = vec![Point2::default(); 7];
        let result = EyeLandmarks::try_from(points.as_slice());
        assert!(matches!(
            result,
            Err(FocusError::InvalidLandmarkCount { expected: 6, actual: 7 })
        ));
    }

    #[test]
    fn test_face_landmarks_deserialize_from_pairs() {
        let pairs: Vec<[f64; 2]> = (0..68).map(|i| [i as f64, 1.0]).collect();
        let json = serde_json::to_string(&pairs).unwrap();

        let face: FaceLandmarks = serde_json::from_str(&json).unwrap();
        assert_eq!(face.points()[67], Point2::new(67.0, 1.0));

        let short = serde_json::to_string(&pairs[..10]).unwrap();
        assert!(serde_json::from_str::<FaceLandmarks>(&short).is_err());
    }

    #[test]
    fn test_focus_state_flags() {
        assert_eq!(FocusState::Focused.as_flag(), 1);
        assert_eq!(FocusState::Distracted.as_flag(), 0);
        assert_eq!(FocusState::default(), FocusState::Distracted);
        assert_eq!(
            serde_json::to_string(&FocusState::Focused).unwrap(),
            "\"focused\""
        );
    }
}
