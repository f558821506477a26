//! Focus Meter - eye-aspect-ratio focus estimation
//!
//! Focus Meter estimates whether a person in front of a camera is focused by
//! measuring eye openness from 68-point facial landmarks. Each frame runs
//! through a deterministic pipeline: landmarks → eye aspect ratio →
//! classification → focus-time accumulation → timeline, and a finished
//! session produces a report and an attentiveness chart.
//!
//! ## Modules
//!
//! - **Core**: EAR computation, per-frame classification and the focus-time state machine
//! - **Session loop**: collaborator traits for capture, detection and display, driven by [`SessionRunner`]
//! - **Recordings**: `focus.frame.v1` landmark streams that replay through the same loop
//! - **Camera** (feature `camera`): OpenCV-backed live collaborators

pub mod classifier;
pub mod clock;
pub mod config;
pub mod ear;
pub mod error;
pub mod recording;
pub mod report;
pub mod runner;
pub mod session;
pub mod timeline;
pub mod tracker;
pub mod types;

#[cfg(feature = "camera")]
pub mod camera;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{ClassificationOutcome, FocusClassifier, FrameClassification};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{FocusConfig, DEFAULT_EAR_THRESHOLD};
pub use ear::{eye_aspect_ratio, EarReading};
pub use error::FocusError;
pub use session::{FocusSession, FrameUpdate, SessionSummary};
pub use tracker::{FocusTotals, FocusTracker, Transition};

// Recording exports
pub use recording::{RecordedFrame, RecordingAdapter, ReplaySource, SCHEMA_VERSION};

// Loop and report exports
pub use report::{console_summary, render_chart_svg, write_chart_svg, ReportEncoder, REPORT_VERSION};
pub use runner::{CancelToken, RunOutcome, SessionRunner, StopReason};

/// Library version embedded in every report
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for session reports
pub const PRODUCER_NAME: &str = "focus-meter";
