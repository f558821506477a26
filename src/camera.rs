//! Live camera collaborators backed by OpenCV
//!
//! A `VideoCapture` frame source, a Haar cascade face detector, an LBF
//! facemark landmark predictor and a `highgui` window. Every handle is
//! released on drop.
//!
//! Frames carry their grayscale copy, converted once at capture and shared by
//! the detector and the predictor.

use log::{debug, info};
use opencv::core::{Mat, Point, Point2f, Rect, Scalar, Size, Vector};
use opencv::prelude::*;
use opencv::{face, highgui, imgproc, objdetect, videoio};

use crate::error::FocusError;
use crate::runner::{DisplaySink, FaceDetector, FrameOverlay, FrameSource, LandmarkPredictor};
use crate::types::{FaceLandmarks, FaceRegion, Point2};

/// Window title for the live view
pub const WINDOW_NAME: &str = "Focus Meter";

const KEY_ESC: i32 = 27;

/// A captured BGR frame and its grayscale conversion
pub struct CameraFrame {
    pub color: Mat,
    pub gray: Mat,
}

impl CameraFrame {
    pub fn from_color(color: Mat) -> Result<Self, FocusError> {
        let mut gray = Mat::default();
        imgproc::cvt_color(&color, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
        Ok(Self { color, gray })
    }
}

/// Webcam frame source
pub struct CameraSource {
    capture: videoio::VideoCapture,
}

impl CameraSource {
    /// Open the capture device at `index`
    pub fn open(index: i32) -> Result<Self, FocusError> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(FocusError::Capture(format!(
                "unable to open camera device {}",
                index
            )));
        }
        info!("opened camera device {}", index);
        Ok(Self { capture })
    }
}

impl FrameSource for CameraSource {
    type Frame = CameraFrame;

    fn next_frame(&mut self) -> Result<Option<CameraFrame>, FocusError> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        CameraFrame::from_color(frame).map(Some)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            debug!("camera release failed: {}", e);
        }
    }
}

fn to_rect(region: &FaceRegion) -> Rect {
    Rect::new(region.x, region.y, region.width, region.height)
}

/// Haar cascade face detector
pub struct CascadeFaceDetector {
    cascade: objdetect::CascadeClassifier,
}

impl CascadeFaceDetector {
    pub fn load(path: &str) -> Result<Self, FocusError> {
        let cascade = objdetect::CascadeClassifier::new(path)?;
        if cascade.empty()? {
            return Err(FocusError::Capture(format!(
                "face cascade {} could not be loaded",
                path
            )));
        }
        Ok(Self { cascade })
    }
}

impl FaceDetector<CameraFrame> for CascadeFaceDetector {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Vec<FaceRegion>, FocusError> {
        let mut faces = Vector::<Rect>::new();
        self.cascade.detect_multi_scale(
            &frame.gray,
            &mut faces,
            1.1,
            3,
            0,
            Size::new(30, 30),
            Size::new(0, 0),
        )?;
        Ok(faces
            .iter()
            .map(|r| FaceRegion {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
            })
            .collect())
    }
}

/// 68-point LBF facemark predictor
pub struct LbfLandmarkPredictor {
    facemark: opencv::core::Ptr<face::Facemark>,
}

impl LbfLandmarkPredictor {
    pub fn load(model_path: &str) -> Result<Self, FocusError> {
        let mut facemark = face::create_facemark_lbf()?;
        facemark.load_model(model_path)?;
        Ok(Self { facemark })
    }
}

impl LandmarkPredictor<CameraFrame> for LbfLandmarkPredictor {
    fn predict(&mut self, frame: &CameraFrame, region: &FaceRegion) -> Result<FaceLandmarks, FocusError> {
        let faces = Vector::<Rect>::from_iter([to_rect(region)]);
        let mut landmarks = Vector::<Vector<Point2f>>::new();
        if !self.facemark.fit(&frame.gray, &faces, &mut landmarks)? || landmarks.is_empty() {
            return Err(FocusError::Capture("landmark fit failed".to_string()));
        }
        let points = landmarks
            .get(0)?
            .iter()
            .map(|p| Point2::new(f64::from(p.x), f64::from(p.y)))
            .collect();
        FaceLandmarks::new(points)
    }
}

/// On-screen view with eye contours and the live focus readout
pub struct HighguiDisplay {
    last_key: i32,
}

impl HighguiDisplay {
    pub fn open() -> Result<Self, FocusError> {
        highgui::named_window(WINDOW_NAME, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self { last_key: -1 })
    }
}

impl DisplaySink<CameraFrame> for HighguiDisplay {
    fn render(&mut self, frame: &CameraFrame, overlay: &FrameOverlay) -> Result<(), FocusError> {
        let mut canvas = frame.color.try_clone()?;
        let green = Scalar::new(0.0, 255.0, 0.0, 0.0);

        for eye in &overlay.eyes {
            for p in eye.points() {
                imgproc::circle(
                    &mut canvas,
                    Point::new(p.x.round() as i32, p.y.round() as i32),
                    2,
                    green,
                    -1,
                    imgproc::LINE_8,
                    0,
                )?;
            }
        }

        imgproc::put_text(
            &mut canvas,
            &overlay.label(),
            Point::new(10, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.7,
            Scalar::new(0.0, 0.0, 255.0, 0.0),
            2,
            imgproc::LINE_8,
            false,
        )?;

        highgui::imshow(WINDOW_NAME, &canvas)?;
        self.last_key = highgui::wait_key(1)?;
        Ok(())
    }

    fn poll_stop(&mut self) -> Result<bool, FocusError> {
        let key = self.last_key & 0xFF;
        Ok(self.last_key >= 0 && (key == i32::from(b'q') || key == KEY_ESC))
    }
}

impl Drop for HighguiDisplay {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            debug!("closing display windows failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::CV_8UC3;

    #[test]
    fn test_frame_converts_to_single_channel_once() {
        let color = Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::all(128.0)).unwrap();
        let frame = CameraFrame::from_color(color).unwrap();

        assert_eq!(frame.color.channels(), 3);
        assert_eq!(frame.gray.channels(), 1);
        assert_eq!((frame.gray.rows(), frame.gray.cols()), (48, 64));
        assert_eq!(*frame.gray.at_2d::<u8>(10, 10).unwrap(), 128);
    }
}
