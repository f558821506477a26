//! Focus CLI - Command-line interface for Focus Meter
//!
//! Commands:
//! - replay: Replay a recorded landmark stream and report focus time (batch mode)
//! - run: Process recorded frames streamed on stdin (streaming mode)
//! - camera: Live webcam session (requires the `camera` feature)
//! - ear: Compute the eye aspect ratio of one eye
//! - validate: Validate a recorded landmark stream
//! - doctor: Diagnose configuration and environment
//! - schema: Print schema information

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use focus_meter::recording::{RecordedFrame, RecordedModel, RecordingAdapter, ReplaySource, ValidationError};
use focus_meter::runner::{DisplaySink, FrameOverlay, NullDisplay, RunOutcome, StopReason};
use focus_meter::types::{EyeLandmarks, Point2, SessionReport};
use focus_meter::{
    console_summary, eye_aspect_ratio, write_chart_svg, CancelToken, FocusClassifier, FocusConfig,
    FocusError, FocusSession, ReportEncoder, SessionRunner, DEFAULT_EAR_THRESHOLD, PRODUCER_NAME,
    REPORT_VERSION, SCHEMA_VERSION, VERSION,
};

/// Focus - eye-aspect-ratio focus estimation from facial landmarks
#[derive(Parser)]
#[command(name = "focus")]
#[command(author = "Synheart AI Inc")]
#[command(version = VERSION)]
#[command(about = "Estimate focused time from eye landmarks", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded landmark stream (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// EAR threshold above which a frame counts as focused
        #[arg(long, default_value_t = DEFAULT_EAR_THRESHOLD)]
        threshold: f64,

        /// Report output path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        report: PathBuf,

        /// Report format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Write the attentiveness chart as SVG
        #[arg(long)]
        chart: Option<PathBuf>,
    },

    /// Process frames streamed on stdin (streaming mode)
    Run {
        /// EAR threshold above which a frame counts as focused
        #[arg(long, default_value_t = DEFAULT_EAR_THRESHOLD)]
        threshold: f64,

        /// Report format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Write the attentiveness chart as SVG
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Flush output after each frame
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Live webcam session; press q or Esc to stop
    #[cfg(feature = "camera")]
    Camera {
        /// Camera device index
        #[arg(long, default_value = "0")]
        device: i32,

        /// Haar cascade for face detection
        #[arg(long, default_value = "haarcascade_frontalface_default.xml")]
        cascade: PathBuf,

        /// LBF facemark model for 68-point landmarks
        #[arg(long, default_value = "lbfmodel.yaml")]
        facemark: PathBuf,

        /// EAR threshold above which a frame counts as focused
        #[arg(long, default_value_t = DEFAULT_EAR_THRESHOLD)]
        threshold: f64,

        /// Report output path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        report: PathBuf,

        /// Report format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Write the attentiveness chart as SVG
        #[arg(long, default_value = "focus_chart.svg")]
        chart: PathBuf,
    },

    /// Compute the eye aspect ratio of one eye
    Ear {
        /// Six points as "x,y x,y ...": left corner, two upper lid, right corner, two lower lid
        #[arg(long)]
        points: String,

        /// EAR threshold above which the eye counts as open
        #[arg(long, default_value_t = DEFAULT_EAR_THRESHOLD)]
        threshold: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a recorded landmark stream
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a face cascade file
        #[arg(long)]
        cascade: Option<PathBuf>,

        /// Check a facemark model file
        #[arg(long)]
        facemark: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Single-line JSON
    Ndjson,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (focus.frame.v1)
    Input,
    /// Output schema (focus.report.v1)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn run(cli: Cli) -> Result<(), FocusCliError> {
    match cli.command {
        Commands::Replay {
            input,
            input_format,
            threshold,
            report,
            output_format,
            chart,
        } => cmd_replay(&input, input_format, threshold, &report, output_format, chart.as_deref()),

        Commands::Run {
            threshold,
            output_format,
            chart,
            flush,
        } => cmd_run(threshold, output_format, chart.as_deref(), flush),

        #[cfg(feature = "camera")]
        Commands::Camera {
            device,
            cascade,
            facemark,
            threshold,
            report,
            output_format,
            chart,
        } => cmd_camera(device, &cascade, &facemark, threshold, &report, output_format, &chart),

        Commands::Ear {
            points,
            threshold,
            json,
        } => cmd_ear(&points, threshold, json),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor {
            cascade,
            facemark,
            json,
        } => cmd_doctor(cascade.as_deref(), facemark.as_deref(), json),

        Commands::Schema { schema_type, json_schema } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_replay(
    input: &Path,
    input_format: InputFormat,
    threshold: f64,
    report_path: &Path,
    output_format: OutputFormat,
    chart: Option<&Path>,
) -> Result<(), FocusCliError> {
    let config = FocusConfig::with_threshold(threshold)?;
    let frames = read_frames(input, input_format)?;

    if frames.is_empty() {
        return Err(FocusCliError::NoFrames);
    }

    // Replay is all-or-nothing: a bad frame would otherwise end the session early
    let failures = RecordingAdapter::validate_frames(&frames);
    if let Some(first) = failures.into_iter().next() {
        return Err(FocusCliError::Validation(first.index, first.error));
    }

    let source = ReplaySource::from_frames(frames);
    let session = FocusSession::with_clock(config, source.clock())?;
    let runner = SessionRunner::new(source, RecordedModel, RecordedModel, NullDisplay)
        .with_cancel_token(install_interrupt_handler()?);

    let outcome = runner.run(session);
    let failure = run_failure(&outcome.stop_reason, false);
    finish_outcome(outcome, report_path, &output_format, chart)?;

    match failure {
        Some(msg) => Err(FocusCliError::SessionAborted(msg)),
        None => Ok(()),
    }
}

fn cmd_run(
    threshold: f64,
    output_format: OutputFormat,
    chart: Option<&Path>,
    flush: bool,
) -> Result<(), FocusCliError> {
    let config = FocusConfig::with_threshold(threshold)?;

    let stdin = io::stdin();
    let frames = stdin.lock().lines().filter_map(|line| match line {
        Ok(line) => RecordingAdapter::parse_line(&line)
            .map_err(FocusError::from)
            .transpose(),
        Err(e) => Some(Err(FocusError::from(e))),
    });

    let source = ReplaySource::new(frames);
    let session = FocusSession::with_clock(config, source.clock())?;
    let status = StatusLineDisplay {
        out: io::stdout(),
        flush,
    };
    let runner = SessionRunner::new(source, RecordedModel, RecordedModel, status)
        .with_cancel_token(install_interrupt_handler()?);

    let outcome = runner.run(session);
    let aborted = run_failure(&outcome.stop_reason, false);

    finish_outcome(outcome, Path::new("-"), &output_format, chart)?;

    match aborted {
        Some(msg) => Err(FocusCliError::StreamAborted(msg)),
        None => Ok(()),
    }
}

#[cfg(feature = "camera")]
fn cmd_camera(
    device: i32,
    cascade: &Path,
    facemark: &Path,
    threshold: f64,
    report_path: &Path,
    output_format: OutputFormat,
    chart: &Path,
) -> Result<(), FocusCliError> {
    use focus_meter::camera::{CameraSource, CascadeFaceDetector, HighguiDisplay, LbfLandmarkPredictor};

    let config = FocusConfig::with_threshold(threshold)?;
    let detector = CascadeFaceDetector::load(&cascade.to_string_lossy())?;
    let predictor = LbfLandmarkPredictor::load(&facemark.to_string_lossy())?;
    let source = CameraSource::open(device)?;
    let display = HighguiDisplay::open()?;

    let session = FocusSession::start(config)?;
    let runner = SessionRunner::new(source, detector, predictor, display)
        .with_cancel_token(install_interrupt_handler()?);

    let outcome = runner.run(session);
    // a camera that stops delivering frames ends the session normally
    let failure = run_failure(&outcome.stop_reason, true);
    finish_outcome(outcome, report_path, &output_format, Some(chart))?;

    match failure {
        Some(msg) => Err(FocusCliError::SessionAborted(msg)),
        None => Ok(()),
    }
}

fn cmd_ear(points: &str, threshold: f64, json: bool) -> Result<(), FocusCliError> {
    let config = FocusConfig::with_threshold(threshold)?;
    let points = parse_points(points)?;
    let eye = EyeLandmarks::try_from(points.as_slice())?;
    let ear = eye_aspect_ratio(&eye)?;
    let state = FocusClassifier::new(&config).classify_ear(ear);

    if json {
        let output = serde_json::json!({
            "ear": ear,
            "threshold": config.ear_threshold,
            "state": state.as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("EAR: {:.4} ({} at threshold {})", ear, state.as_str(), config.ear_threshold);
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), FocusCliError> {
    let frames = read_frames(input, input_format)?;
    let results = RecordingAdapter::validate_frames(&frames);

    let report = ValidationReport {
        total_frames: frames.len(),
        valid_frames: frames.len() - results.len(),
        invalid_frames: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                frame: r.frame,
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total frames:   {}", report.total_frames);
        println!("Valid frames:   {}", report.valid_frames);
        println!("Invalid frames: {}", report.invalid_frames);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                let frame = err.frame.map(|f| f.to_string()).unwrap_or_else(|| "unknown".to_string());
                println!("  - Frame {} (index {}): {}", frame, err.index, err.error);
            }
        }
    }

    if report.invalid_frames > 0 {
        Err(FocusCliError::ValidationFailed(report.invalid_frames))
    } else {
        Ok(())
    }
}

fn cmd_doctor(cascade: Option<&Path>, facemark: Option<&Path>, json: bool) -> Result<(), FocusCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Focus Meter version {}", VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}, report: {}", SCHEMA_VERSION, REPORT_VERSION),
        },
    ];

    let config = FocusConfig::default();
    checks.push(match config.validate() {
        Ok(()) => DoctorCheck {
            name: "threshold".to_string(),
            status: CheckStatus::Ok,
            message: format!("Default EAR threshold {}", config.ear_threshold),
        },
        Err(e) => DoctorCheck {
            name: "threshold".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    });

    checks.push(DoctorCheck {
        name: "camera".to_string(),
        status: if cfg!(feature = "camera") {
            CheckStatus::Ok
        } else {
            CheckStatus::Warning
        },
        message: if cfg!(feature = "camera") {
            "Live camera support enabled".to_string()
        } else {
            "Built without the camera feature; only recorded streams are supported".to_string()
        },
    });

    if let Some(path) = cascade {
        checks.push(model_file_check("cascade", path));
    }
    if let Some(path) = facemark {
        checks.push(model_file_check("facemark", path));
    }

    // Check stdin is available (for streaming mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Focus Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FocusCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn model_file_check(name: &str, path: &Path) -> DoctorCheck {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: format!("{} ({} bytes)", path.display(), meta.len()),
        },
        Ok(_) => DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: format!("{} is empty or not a file", path.display()),
        },
        Err(e) => DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read {}: {}", path.display(), e),
        },
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), FocusCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One JSON object per processed frame:");
                println!();
                println!("- schema_version: \"{}\"", SCHEMA_VERSION);
                println!("- frame: optional frame counter");
                println!("- t: seconds since session start, strictly increasing");
                println!("- faces: detected faces (may be empty)");
                println!("  - region: optional {{ x, y, width, height }} bounding box");
                println!("  - landmarks: 68 [x, y] pairs (36-41 left eye, 42-47 right eye)");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", REPORT_VERSION);
                println!();
                println!("Session report contains:");
                println!();
                println!("- report_version: Schema version");
                println!("- producer: {{ name, version, instance_id }}");
                println!("- session_id, started_at_utc, ended_at_utc");
                println!("- threshold: EAR threshold used for classification");
                println!("- total_focus_seconds, session_seconds, focus_ratio");
                println!("- frames: {{ total, focused, no_face, degenerate }}");
                println!("- focus_runs, longest_focus_seconds");
                println!("- timeline: Array of {{ t, focused }} samples, focused is 0 or 1");
            }
        }
    }

    Ok(())
}

// Helper functions

/// Prints one status line per frame for streaming mode
struct StatusLineDisplay {
    out: io::Stdout,
    flush: bool,
}

impl DisplaySink<RecordedFrame> for StatusLineDisplay {
    fn render(&mut self, frame: &RecordedFrame, overlay: &FrameOverlay) -> Result<(), FocusError> {
        let line = serde_json::json!({
            "t": frame.t,
            "focused": overlay.state.as_flag(),
            "focus_seconds": overlay.live_focus_seconds,
        });
        writeln!(self.out, "{}", line)?;
        if self.flush {
            self.out.flush()?;
        }
        Ok(())
    }
}

fn install_interrupt_handler() -> Result<CancelToken, FocusCliError> {
    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| FocusCliError::Signal(e.to_string()))?;
    Ok(token)
}

fn read_frames(input: &Path, input_format: InputFormat) -> Result<Vec<RecordedFrame>, FocusCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let frames = match input_format {
        InputFormat::Ndjson => RecordingAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => RecordingAdapter::parse_array(&input_data)?,
    };
    Ok(frames)
}

fn parse_points(text: &str) -> Result<Vec<Point2>, FocusCliError> {
    text.split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| FocusCliError::ParseError(format!("Expected x,y but got '{}'", pair)))?;
            let x = x
                .trim()
                .parse::<f64>()
                .map_err(|e| FocusCliError::ParseError(format!("Bad x in '{}': {}", pair, e)))?;
            let y = y
                .trim()
                .parse::<f64>()
                .map_err(|e| FocusCliError::ParseError(format!("Bad y in '{}': {}", pair, e)))?;
            Ok(Point2::new(x, y))
        })
        .collect()
}

/// Message for a run that ended on an error, reported after the session report
fn run_failure(stop_reason: &StopReason, capture_ends_session: bool) -> Option<String> {
    match stop_reason {
        StopReason::Aborted(msg) => Some(msg.clone()),
        StopReason::CaptureFailed(msg) if !capture_ends_session => Some(msg.clone()),
        StopReason::CaptureFailed(msg) => {
            warn!("capture ended the session: {}", msg);
            None
        }
        StopReason::EndOfStream | StopReason::UserStop => None,
    }
}

fn finish_outcome(
    outcome: RunOutcome,
    report_path: &Path,
    output_format: &OutputFormat,
    chart: Option<&Path>,
) -> Result<(), FocusCliError> {
    info!("session ended: {:?}", outcome.stop_reason);
    let report = ReportEncoder::new().encode(&outcome.summary);
    let output_data = format_output(&report, output_format)?;

    let to_stdout = report_path.to_string_lossy() == "-";
    if to_stdout {
        print!("{}", output_data);
        eprintln!("{}", console_summary(&report));
    } else {
        fs::write(report_path, output_data)?;
        println!("{}", console_summary(&report));
    }

    if let Some(chart_path) = chart {
        if report.timeline.is_empty() {
            warn!("no frames were processed; chart will be empty");
        }
        write_chart_svg(&report.timeline, chart_path)?;
        info!("chart written to {}", chart_path.display());
    }

    Ok(())
}

fn format_output(report: &SessionReport, format: &OutputFormat) -> Result<String, FocusCliError> {
    match format {
        OutputFormat::Ndjson => Ok(serde_json::to_string(report)? + "\n"),
        OutputFormat::Json => Ok(serde_json::to_string(report)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)? + "\n"),
    }
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/focus.frame.v1.json",
        "title": "focus.frame.v1",
        "description": "Recorded face landmarks for one video frame",
        "type": "object",
        "required": ["schema_version", "t"],
        "properties": {
            "schema_version": {
                "type": "string",
                "const": "focus.frame.v1"
            },
            "frame": { "type": "integer", "minimum": 0 },
            "t": { "type": "number", "minimum": 0 },
            "faces": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["landmarks"],
                    "properties": {
                        "region": {
                            "type": "object",
                            "required": ["x", "y", "width", "height"],
                            "properties": {
                                "x": { "type": "integer" },
                                "y": { "type": "integer" },
                                "width": { "type": "integer" },
                                "height": { "type": "integer" }
                            }
                        },
                        "landmarks": {
                            "type": "array",
                            "minItems": 68,
                            "maxItems": 68,
                            "items": {
                                "type": "array",
                                "minItems": 2,
                                "maxItems": 2,
                                "items": { "type": "number" }
                            }
                        }
                    }
                }
            }
        }
    }).to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/focus.report.v1.json",
        "title": "focus.report.v1",
        "description": "Focus Meter session report",
        "type": "object",
        "required": ["report_version", "producer", "session_id", "total_focus_seconds", "timeline"],
        "properties": {
            "report_version": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "session_id": { "type": "string", "format": "uuid" },
            "started_at_utc": { "type": "string", "format": "date-time" },
            "ended_at_utc": { "type": "string", "format": "date-time" },
            "threshold": { "type": "number" },
            "total_focus_seconds": { "type": "number", "minimum": 0 },
            "session_seconds": { "type": "number", "minimum": 0 },
            "focus_ratio": { "type": "number", "minimum": 0, "maximum": 1 },
            "frames": {
                "type": "object",
                "properties": {
                    "total": { "type": "integer" },
                    "focused": { "type": "integer" },
                    "no_face": { "type": "integer" },
                    "degenerate": { "type": "integer" }
                }
            },
            "focus_runs": { "type": "integer" },
            "longest_focus_seconds": { "type": "number" },
            "timeline": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "t": { "type": "number" },
                        "focused": { "type": "integer", "enum": [0, 1] }
                    }
                }
            }
        }
    }).to_string()
}

// Error types

#[derive(Debug)]
enum FocusCliError {
    Io(io::Error),
    Focus(FocusError),
    Json(serde_json::Error),
    Validation(usize, ValidationError),
    NoFrames,
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
    StreamAborted(String),
    SessionAborted(String),
    Signal(String),
}

impl From<io::Error> for FocusCliError {
    fn from(e: io::Error) -> Self {
        FocusCliError::Io(e)
    }
}

impl From<FocusError> for FocusCliError {
    fn from(e: FocusError) -> Self {
        FocusCliError::Focus(e)
    }
}

impl From<serde_json::Error> for FocusCliError {
    fn from(e: serde_json::Error) -> Self {
        FocusCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FocusCliError> for CliError {
    fn from(e: FocusCliError) -> Self {
        match e {
            FocusCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FocusCliError::Focus(e) => {
                let (code, hint) = match &e {
                    FocusError::InvalidThreshold(_) => ("INVALID_THRESHOLD", "Use a threshold between 0 and 1"),
                    FocusError::InvalidLandmarkCount { .. } | FocusError::DegenerateEye => {
                        ("INVALID_LANDMARKS", "Provide six distinct eye points")
                    }
                    FocusError::Capture(_) => ("CAPTURE_ERROR", "Run 'focus doctor' to check the camera setup"),
                    FocusError::Render(_) => ("RENDER_ERROR", "Check the chart output path"),
                    FocusError::NonMonotonicTimestamp { .. } => {
                        ("OUT_OF_ORDER", "Frame timestamps must strictly increase")
                    }
                    FocusError::Validation(_) => ("VALIDATION_ERROR", "Run 'focus validate' for details"),
                    FocusError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    FocusError::ParseError(_) | FocusError::JsonError(_) => {
                        ("PARSE_ERROR", "Ensure input matches focus.frame.v1 schema")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FocusCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FocusCliError::Validation(index, e) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: format!("Frame at index {}: {}", index, e),
                hint: Some("Run 'focus validate' for details".to_string()),
            },
            FocusCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            FocusCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} frames failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            FocusCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            FocusCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
            FocusCliError::StreamAborted(msg) => CliError {
                code: "STREAM_ABORTED".to_string(),
                message: msg,
                hint: Some("The report covers frames up to the bad line".to_string()),
            },
            FocusCliError::SessionAborted(msg) => CliError {
                code: "SESSION_ABORTED".to_string(),
                message: msg,
                hint: Some("The report covers frames processed before the failure".to_string()),
            },
            FocusCliError::Signal(msg) => CliError {
                code: "SIGNAL_ERROR".to_string(),
                message: msg,
                hint: None,
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_frames: usize,
    valid_frames: usize,
    invalid_frames: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    frame: Option<u64>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn code_of(e: FocusError) -> String {
        CliError::from(FocusCliError::from(e)).code
    }

    #[test]
    fn test_library_errors_get_specific_codes() {
        assert_eq!(code_of(FocusError::InvalidThreshold(2.0)), "INVALID_THRESHOLD");
        assert_eq!(code_of(FocusError::DegenerateEye), "INVALID_LANDMARKS");
        assert_eq!(code_of(FocusError::Capture("no device".into())), "CAPTURE_ERROR");
        assert_eq!(code_of(FocusError::Render("disk full".into())), "RENDER_ERROR");
        assert_eq!(
            code_of(FocusError::NonMonotonicTimestamp { previous: 1.0, current: 0.5 }),
            "OUT_OF_ORDER"
        );
        assert_eq!(
            code_of(FocusError::Validation(ValidationError::InvalidTimestamp(-1.0))),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            code_of(FocusError::Io(io::Error::new(io::ErrorKind::NotFound, "missing"))),
            "IO_ERROR"
        );
        assert_eq!(code_of(FocusError::ParseError("line 3".into())), "PARSE_ERROR");
    }

    #[test]
    fn test_failed_runs_are_reported_after_the_session() {
        let aborted = StopReason::Aborted("window closed".into());
        let capture = StopReason::CaptureFailed("unplugged".into());

        assert_eq!(run_failure(&aborted, true), Some("window closed".to_string()));
        assert_eq!(run_failure(&capture, false), Some("unplugged".to_string()));
        assert_eq!(run_failure(&capture, true), None);
        assert_eq!(run_failure(&StopReason::UserStop, false), None);
        assert_eq!(run_failure(&StopReason::EndOfStream, false), None);
    }
}
