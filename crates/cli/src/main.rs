mod settings;

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{Receiver, RecvTimeoutError};

use livecheck_core::detection::domain::landmark_detector::LandmarkDetector;
use livecheck_core::detection::infrastructure::onnx_face_mesh_detector::OnnxFaceMeshDetector;
use livecheck_core::detection::infrastructure::recorded_landmark_detector::RecordedLandmarkDetector;
use livecheck_core::kyc::domain::submission::{DocumentType, ImageUpload, SubmissionRequest};
use livecheck_core::kyc::infrastructure::fs_upload_store::FsUploadStore;
use livecheck_core::kyc::infrastructure::http_verification_service::HttpVerificationService;
use livecheck_core::kyc::infrastructure::sqlite_submission_repository::SqliteSubmissionRepository;
use livecheck_core::liveness::domain::nose_marker_overlay::Overlay;
use livecheck_core::liveness::domain::session_phase::SessionPhase;
use livecheck_core::pipeline::infrastructure::session_worker::{self, SessionEvent};
use livecheck_core::pipeline::list_submissions_use_case::{ListSubmissionsUseCase, SubmissionListing};
use livecheck_core::pipeline::liveness_pipeline::{LivenessPipeline, SessionHandle, SessionOutcome};
use livecheck_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use livecheck_core::pipeline::submit_kyc_use_case::{SubmitKycUseCase, VerificationFailurePolicy};
use livecheck_core::shared::constants::{FACE_MESH_MODEL_NAME, SELFIE_FILE_NAME};
use livecheck_core::shared::model_resolver::{self, ModelLocation};
use livecheck_core::video::domain::video_source::VideoSource;
use livecheck_core::video::infrastructure::ffmpeg_video_source::FfmpegVideoSource;
use livecheck_core::video::infrastructure::image_sequence_source::ImageSequenceSource;
use livecheck_core::video::infrastructure::png_frame_encoder::PngFrameEncoder;

use settings::Settings;

const EVENT_POLL: Duration = Duration::from_millis(50);

/// Head-turn liveness capture and KYC submission.
#[derive(Parser)]
#[command(name = "livecheck")]
struct Cli {
    /// Settings file (default: per-user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the head-turn challenge on a video source and save the selfie.
    Liveness(LivenessArgs),
    /// Submit a document and selfie for AI verification.
    Submit(SubmitArgs),
    /// List all submissions, newest first, with status counts.
    List(ListArgs),
}

#[derive(Args)]
struct LivenessArgs {
    /// Video file, stream URL, capture device URL, or a directory of frames.
    source: String,

    /// Where to write the captured selfie.
    #[arg(long, default_value = SELFIE_FILE_NAME)]
    out: PathBuf,

    /// Replay recorded landmarks (JSON) instead of running the face-mesh model.
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Face-mesh ONNX model file.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Save nose-marker overlays as PNG files into this directory.
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Nose offset a frame must exceed to count as a turn (0.0-1.0).
    #[arg(long)]
    turn_threshold: Option<f64>,

    /// Delay between passing the challenge and the capture.
    #[arg(long)]
    capture_delay_ms: Option<u64>,

    /// Give up if the source is not ready after this long.
    #[arg(long)]
    ready_timeout_ms: Option<u64>,

    /// Pace frames read from a directory.
    #[arg(long)]
    frame_interval_ms: Option<u64>,
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    /// PAN or AADHAAR.
    #[arg(long)]
    document_type: Option<DocumentType>,

    /// Identity document image.
    #[arg(long)]
    document: PathBuf,

    /// Selfie image, usually the output of `livecheck liveness`.
    #[arg(long, default_value = SELFIE_FILE_NAME)]
    selfie: PathBuf,

    /// Base URL of the AI verification service.
    #[arg(long, env = "AI_SERVICE_URL")]
    ai_url: Option<String>,

    /// Directory holding submissions and uploads.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// What to do with the record if verification fails:
    /// leave-pending, mark-rejected or delete.
    #[arg(long)]
    on_failure: Option<VerificationFailurePolicy>,
}

#[derive(Args)]
struct ListArgs {
    /// Directory holding submissions and uploads.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Print the listing as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref());

    match cli.command {
        Command::Liveness(args) => run_liveness(args, &settings),
        Command::Submit(args) => run_submit(args, &settings),
        Command::List(args) => run_list(args, &settings),
    }
}

fn run_liveness(args: LivenessArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = settings.liveness_config();
    if let Some(threshold) = args.turn_threshold {
        config.challenge.turn_threshold = threshold;
    }
    if let Some(ms) = args.capture_delay_ms {
        config.capture_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = args.ready_timeout_ms {
        config.ready_timeout = Some(Duration::from_millis(ms));
    }
    config.validate()?;

    if let Some(dir) = &args.overlay_dir {
        fs::create_dir_all(dir)?;
    }

    let source = open_source(&args.source, args.frame_interval_ms)?;
    let detector = build_detector(&args, settings)?;
    let pipeline = LivenessPipeline::new(source, detector, Box::new(PngFrameEncoder::new()), config)
        .with_logger(Box::new(StdoutPipelineLogger::default()));

    let worker = if args.overlay_dir.is_some() {
        session_worker::spawn_with_overlays(pipeline)
    } else {
        session_worker::spawn(pipeline)
    };
    spawn_operator_input(worker.handle.clone());
    eprintln!("Press Enter to capture now, or type q and Enter to quit.");

    let mut last_phase = None;
    let result = loop {
        let event = match worker.events.recv_timeout(EVENT_POLL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => {
                save_overlays(&worker.overlays, args.overlay_dir.as_deref())?;
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                break Err("liveness session ended unexpectedly".into());
            }
        };
        save_overlays(&worker.overlays, args.overlay_dir.as_deref())?;
        match event {
            SessionEvent::Update(snapshot) => {
                if last_phase != Some(snapshot.phase) {
                    eprintln!("{}", snapshot.phase);
                    last_phase = Some(snapshot.phase);
                }
            }
            SessionEvent::Captured(image) => {
                fs::write(&args.out, &image.bytes)?;
                log::info!(
                    "Selfie written to {} ({}x{})",
                    args.out.display(),
                    image.width,
                    image.height
                );
            }
            SessionEvent::Finished(outcome) => break finish(outcome, last_phase),
            SessionEvent::Error(e) => break Err(e.into()),
            SessionEvent::Overlay(_) => {}
        }
    };

    if worker.thread.join().is_err() {
        return Err("liveness session thread panicked".into());
    }
    result
}

fn finish(
    outcome: SessionOutcome,
    last_phase: Option<SessionPhase>,
) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        SessionOutcome::Captured => Ok(()),
        SessionOutcome::Cancelled => {
            log::info!("Liveness session cancelled");
            Ok(())
        }
        SessionOutcome::SourceEnded => Err(format!(
            "Video source ended before a selfie was captured (last status: {})",
            last_phase.unwrap_or(SessionPhase::WaitingForSource)
        )
        .into()),
    }
}

/// Enter requests a manual capture, `q` cancels. Runs until stdin closes.
fn spawn_operator_input(handle: SessionHandle) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("q") {
                handle.cancel();
                break;
            }
            handle.request_capture();
        }
    });
}

fn open_source(
    source: &str,
    frame_interval_ms: Option<u64>,
) -> Result<Box<dyn VideoSource>, Box<dyn std::error::Error>> {
    let path = Path::new(source);
    if path.is_dir() {
        let mut sequence = ImageSequenceSource::new(path);
        if let Some(ms) = frame_interval_ms {
            sequence = sequence.with_frame_interval(Duration::from_millis(ms));
        }
        return Ok(Box::new(sequence));
    }
    if frame_interval_ms.is_some() {
        return Err("--frame-interval-ms only applies to a directory of frames".into());
    }
    Ok(Box::new(FfmpegVideoSource::new(source)))
}

fn build_detector(
    args: &LivenessArgs,
    settings: &Settings,
) -> Result<Box<dyn LandmarkDetector>, Box<dyn std::error::Error>> {
    if let Some(recording) = &args.landmarks {
        log::info!("Replaying landmarks from {}", recording.display());
        return Ok(Box::new(RecordedLandmarkDetector::from_file(recording)?));
    }

    log::info!("Resolving model: {FACE_MESH_MODEL_NAME}");
    let bundled_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")));
    let location = ModelLocation {
        name: FACE_MESH_MODEL_NAME,
        explicit: args.model.as_deref(),
        bundled_dir: bundled_dir.as_deref(),
        url: settings.model_url.as_deref(),
    };
    let model_path = model_resolver::resolve(&location, Some(Box::new(download_progress)))?;

    Ok(Box::new(OnnxFaceMeshDetector::new(
        &model_path,
        settings.detector_options(),
    )?))
}

/// Drains pending overlays, writing them out when a directory is set.
fn save_overlays(
    overlays: &Receiver<SessionEvent>,
    dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    for event in overlays.try_iter() {
        if let (SessionEvent::Overlay(overlay), Some(dir)) = (event, dir) {
            save_overlay(&overlay, dir)?;
        }
    }
    Ok(())
}

fn save_overlay(overlay: &Overlay, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let image = image::RgbaImage::from_raw(overlay.width, overlay.height, overlay.rgba.clone())
        .ok_or("overlay buffer does not match its dimensions")?;
    image.save(dir.join(format!("overlay_{:06}.png", overlay.frame_index)))?;
    Ok(())
}

fn run_submit(args: SubmitArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let ai_url = args
        .ai_url
        .or_else(|| settings.ai_service_url.clone())
        .ok_or("AI service URL not set (use --ai-url or AI_SERVICE_URL)")?;
    let data_dir = args.data_dir.unwrap_or_else(|| settings.data_dir());

    let request = SubmissionRequest {
        full_name: args.name,
        email: args.email,
        document_type: args.document_type,
        document: Some(read_upload(&args.document)?),
        selfie: Some(read_upload(&args.selfie)?),
    };

    let mut use_case = SubmitKycUseCase::new(
        Box::new(SqliteSubmissionRepository::open(&data_dir)?),
        Box::new(FsUploadStore::new(data_dir.join("uploads"))),
        Box::new(HttpVerificationService::new(&ai_url)?),
        args.on_failure.unwrap_or(settings.failure_policy),
    );
    let record = use_case.execute(request)?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn read_upload(path: &Path) -> Result<ImageUpload, Box<dyn std::error::Error>> {
    ImageUpload::from_path(path)
        .map_err(|e| format!("Cannot read {}: {e}", path.display()).into())
}

fn run_list(args: ListArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = args.data_dir.unwrap_or_else(|| settings.data_dir());
    let use_case = ListSubmissionsUseCase::new(Box::new(SqliteSubmissionRepository::open(&data_dir)?));
    let listing = use_case.execute()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print!("{}", format_listing(&listing));
    }
    Ok(())
}

fn format_listing(listing: &SubmissionListing) -> String {
    let stats = listing.stats;
    let mut out = format!(
        "Total {}  Verified {}  Rejected {}  Pending {}\n",
        stats.total, stats.verified, stats.rejected, stats.pending
    );
    for record in &listing.submissions {
        let risk = record
            .ai_result
            .risk_score
            .map(|r| format!("{r:.0}"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:>5}  {:<8}  {:<7}  {:>4}  {}  <{}>  {}\n",
            record.id,
            record.status.to_string(),
            record.document_type.as_str(),
            risk,
            record.full_name,
            record.email,
            record.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    out
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face-mesh model... {pct}%");
    } else {
        eprint!("\rDownloading face-mesh model... {downloaded} bytes");
    }
}
