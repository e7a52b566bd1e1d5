use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
#[cfg(not(feature = "tracing"))]
use log::LevelFilter;
use scouter::report::{load_json, write_json, DetectionReport, MatchReport};
use scouter::{imaging, pipeline, Detector, MatchParams, Rect, ScouterError, Tracker};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

#[derive(Parser, Debug)]
#[command(name = "scouter", version, about = "Multi-camera object detection and matching")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit structured JSON logs (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect objects in one camera image and write a JSON report.
    Detect(DetectArgs),
    /// Match detection reports from several cameras into multi-view objects.
    Match(MatchArgs),
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// Detector configuration (JSON).
    #[arg(long)]
    config: PathBuf,
    /// Camera calibration (JSON); replaces any `camera` entry in the config.
    #[arg(long)]
    camera: Option<PathBuf>,
    /// Input image.
    #[arg(long)]
    image: PathBuf,
    #[arg(long, default_value_t = 0)]
    camera_id: i32,
    /// Position of the image in the camera's full frame.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    offset_x: i32,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    offset_y: i32,
    /// Report path; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Write an annotated JPEG here.
    #[arg(long)]
    draw: Option<PathBuf>,
    #[arg(long, default_value_t = 90)]
    jpeg_quality: u8,
    /// Rects from an external detector (JSON array); skips the ACF scan.
    #[arg(long)]
    rects: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Minimum correspondence score for two detections to merge.
    #[arg(long, default_value_t = 0.5)]
    threshold: f32,
    /// Detection reports, one per camera.
    #[arg(long = "input", required = true)]
    inputs: Vec<PathBuf>,
    /// Matcher parameters (JSON); defaults when omitted.
    #[arg(long)]
    params: Option<PathBuf>,
    /// Output path; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn init_logging(verbose: u8, json: bool) {
    #[cfg(feature = "tracing")]
    {
        let _ = verbose;
        let _ = LogTracer::init();
        scouter::core::init_tracing(json);
    }
    #[cfg(not(feature = "tracing"))]
    {
        if json {
            eprintln!("--json-logs needs the `tracing` feature; using plain logs");
        }
        let level = match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        let _ = scouter::core::init_with_level(level);
    }
}

fn emit<T: serde::Serialize>(value: &T, output: Option<&PathBuf>) -> Result<(), ScouterError> {
    match output {
        Some(path) => {
            write_json(value, path)?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn run_detect(args: &DetectArgs) -> Result<(), ScouterError> {
    let detector = Detector::from_files(&args.config, args.camera.as_deref())?;
    let img = imaging::decode_image(&fs::read(&args.image)?)?;
    let view = img.view();

    let candidates = match &args.rects {
        Some(path) => {
            let rects: Vec<Rect> = load_json(path)?;
            pipeline::process_rects(&detector, &rects, args.offset_x, args.offset_y)?
        }
        None => pipeline::process_view(&detector, &view, args.offset_x, args.offset_y)?,
    };

    if let Some(path) = &args.draw {
        let annotated = imaging::draw_candidates(&view, &candidates)?;
        fs::write(path, imaging::encode_jpeg(&annotated.view(), args.jpeg_quality)?)?;
        log::info!("wrote {}", path.display());
    }

    let report = DetectionReport {
        camera_id: args.camera_id,
        offset: [args.offset_x, args.offset_y],
        image_size: [img.width, img.height],
        candidates,
    };
    emit(&report, args.output.as_ref())
}

fn run_match(args: &MatchArgs) -> Result<(), ScouterError> {
    let params = match &args.params {
        Some(path) => load_json::<MatchParams>(path)?,
        None => MatchParams::default(),
    };
    let tracker = Tracker::new(args.threshold, params)?;

    let mut regions = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let report: DetectionReport = load_json(path)?;
        regions.push(report.regions());
    }

    let objects = tracker.process(&regions)?;
    log::info!(
        "{} object(s) from {} report(s)",
        objects.len(),
        regions.len()
    );
    let report = MatchReport {
        threshold: tracker.threshold(),
        objects,
    };
    emit(&report, args.output.as_ref())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let result = match &cli.command {
        Command::Detect(args) => run_detect(args),
        Command::Match(args) => run_match(args),
    };
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
