//! Eye aspect ratio
//!
//! EAR = (|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)
//!
//! Low values mean a closed eye, higher values an open one. The ratio is
//! undefined when the eye corners coincide; that case is reported as
//! [`FocusError::DegenerateEye`] instead of producing NaN or infinity.

use serde::{Deserialize, Serialize};

use crate::error::FocusError;
use crate::types::{EyeLandmarks, FaceLandmarks};

/// Compute the eye aspect ratio of one eye
pub fn eye_aspect_ratio(eye: &EyeLandmarks) -> Result<f64, FocusError> {
    let p = eye.points();

    let vertical_a = p[1].distance(&p[5]);
    let vertical_b = p[2].distance(&p[4]);
    let horizontal = p[0].distance(&p[3]);

    if !horizontal.is_finite() || horizontal <= f64::EPSILON {
        return Err(FocusError::DegenerateEye);
    }

    let ear = (vertical_a + vertical_b) / (2.0 * horizontal);
    if !ear.is_finite() {
        return Err(FocusError::DegenerateEye);
    }
    Ok(ear)
}

/// EAR values for both eyes of one face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarReading {
    pub left: f64,
    pub right: f64,
    pub average: f64,
}

impl EarReading {
    /// Measure both eyes of a 68-point face
    pub fn from_face(face: &FaceLandmarks) -> Result<Self, FocusError> {
        let left = eye_aspect_ratio(&face.left_eye())?;
        let right = eye_aspect_ratio(&face.right_eye())?;
        Ok(EarReading {
            left,
            right,
            average: (left + right) / 2.0,
        })
    }
}
