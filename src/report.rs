//! Session report encoding
//!
//! Turns a finished [`SessionSummary`] into the serializable
//! [`SessionReport`], the console summary line and the attentiveness chart.

use std::path::Path;

use chrono::SecondsFormat;
use plotters::coord::Shift;
use plotters::prelude::*;
use uuid::Uuid;

use crate::error::FocusError;
use crate::session::SessionSummary;
use crate::types::{ReportProducer, SessionReport, TimelineSample};
use crate::{PRODUCER_NAME, VERSION};

/// Current report schema version
pub const REPORT_VERSION: &str = "focus.report.v1";

const CHART_SIZE: (u32, u32) = (1200, 600);
const LINE_COLOR: RGBColor = RGBColor(30, 144, 255);
const AREA_COLOR: RGBColor = RGBColor(144, 238, 144);
const GRID_COLOR: RGBColor = RGBColor(200, 200, 200);

/// Encoder for session reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create an encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Build the report for a finished session
    pub fn encode(&self, summary: &SessionSummary) -> SessionReport {
        let focus_ratio = if summary.session_seconds > 0.0 {
            (summary.totals.total_focus_seconds / summary.session_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        };

        SessionReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            session_id: summary.session_id.to_string(),
            started_at_utc: summary.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ended_at_utc: summary.ended_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            threshold: summary.config.ear_threshold,
            total_focus_seconds: summary.totals.total_focus_seconds,
            session_seconds: summary.session_seconds,
            focus_ratio,
            frames: summary.frames,
            focus_runs: summary.totals.focus_runs,
            longest_focus_seconds: summary.totals.longest_focus_seconds,
            timeline: summary.timeline.samples().to_vec(),
        }
    }

    /// Encode to a compact JSON string
    pub fn encode_to_json(&self, summary: &SessionSummary) -> Result<String, FocusError> {
        Ok(serde_json::to_string(&self.encode(summary))?)
    }
}

/// The console line printed when a session ends
pub fn console_summary(report: &SessionReport) -> String {
    format!("Total Focus Time: {:.2} seconds", report.total_focus_seconds)
}

/// Render the attentiveness chart as an SVG document
pub fn render_chart_svg(timeline: &[TimelineSample]) -> Result<String, FocusError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        draw_chart(&root, timeline).map_err(|e| FocusError::Render(e.to_string()))?;
        root.present().map_err(|e| FocusError::Render(e.to_string()))?;
    }
    Ok(svg)
}

/// Render the attentiveness chart to an SVG file
pub fn write_chart_svg(timeline: &[TimelineSample], path: &Path) -> Result<(), FocusError> {
    let svg = render_chart_svg(timeline)?;
    std::fs::write(path, svg)?;
    Ok(())
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    timeline: &[TimelineSample],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let x_max = timeline.last().map(|s| s.t).unwrap_or(0.0).max(1.0);
    let mut chart = ChartBuilder::on(root)
        .caption(
            "Focus Analysis Over Time",
            ("sans-serif", 32).into_font().style(FontStyle::Bold),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(110)
        .build_cartesian_2d(0f64..x_max, -0.1f64..1.1f64)?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Attentiveness")
        .axis_desc_style(("sans-serif", 28).into_font().style(FontStyle::Bold))
        .y_labels(13)
        .y_label_formatter(&|v| y_tick_label(*v).to_string())
        .light_line_style(GRID_COLOR.mix(0.5))
        .draw()?;

    let points: Vec<(f64, f64)> = timeline
        .iter()
        .map(|s| (s.t, f64::from(s.focused)))
        .collect();

    chart.draw_series(AreaSeries::new(
        points.iter().copied(),
        0.0,
        AREA_COLOR.mix(0.2),
    ))?;
    chart.draw_series(LineSeries::new(
        points.iter().copied(),
        LINE_COLOR.stroke_width(2),
    ))?;
    chart.draw_series(
        points
            .iter()
            .map(|&p| Circle::new(p, 4, LINE_COLOR.filled())),
    )?;

    Ok(())
}

/// Binary y axis: only 0 and 1 carry labels
fn y_tick_label(v: f64) -> &'static str {
    if v.abs() < 1e-6 {
        "Distracted"
    } else if (v - 1.0).abs() < 1e-6 {
        "Focused"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::FocusConfig;
    use crate::session::FocusSession;
    use crate::classifier::tests::face_with_ear;
    use approx::assert_relative_eq;

    fn summary() -> SessionSummary {
        let clock = ManualClock::new();
        let mut session = FocusSession::with_clock(FocusConfig::default(), clock.clone()).unwrap();
        for (t, ear) in [(0.0, 0.3), (1.0, 0.3), (2.0, 0.1), (3.0, 0.3)] {
            clock.set(t);
            session.process_faces(t, &[face_with_ear(ear)]).unwrap();
        }
        clock.set(4.0);
        session.finish()
    }

    #[test]
    fn test_encode_report() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(&summary());

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_relative_eq!(report.total_focus_seconds, 3.0, epsilon = 1e-9);
        assert_relative_eq!(report.session_seconds, 4.0);
        assert_relative_eq!(report.focus_ratio, 0.75, epsilon = 1e-9);
        assert_eq!(report.focus_runs, 2);
        assert_eq!(report.frames.total, 4);
        assert_eq!(report.timeline.len(), 4);
    }

    #[test]
    fn test_report_json_shape() {
        let json = ReportEncoder::new().encode_to_json(&summary()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["report_version"], "focus.report.v1");
        assert_eq!(value["threshold"], 0.25);
        assert_eq!(value["timeline"][2]["focused"], 0);
        assert_eq!(value["frames"]["focused"], 3);
        assert!(value["session_id"].as_str().unwrap().len() == 36);
    }

    #[test]
    fn test_console_summary() {
        let report = ReportEncoder::new().encode(&summary());
        assert_eq!(console_summary(&report), "Total Focus Time: 3.00 seconds");
    }

    #[test]
    fn test_chart_contains_labels() {
        let report = ReportEncoder::new().encode(&summary());
        let svg = render_chart_svg(&report.timeline).unwrap();

        assert!(svg.contains("<svg"));
        for label in ["Focus Analysis Over Time", "Time (s)", "Attentiveness", "Focused", "Distracted"] {
            assert!(svg.contains(label), "missing {label}");
        }
    }

    #[test]
    fn test_chart_for_empty_timeline() {
        assert!(render_chart_svg(&[]).is_ok());
    }

    #[test]
    fn test_write_chart_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focus.svg");
        write_chart_svg(&summary().timeline.into_samples(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("</svg>"));
    }

    #[test]
    fn test_y_tick_labels() {
        assert_eq!(y_tick_label(0.0), "Distracted");
        assert_eq!(y_tick_label(1.0000000001), "Focused");
        assert_eq!(y_tick_label(0.5), "");
    }
}
