use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use eyewatch_core::aggregation::domain::position_signal::{
    OscillatingPositionFinder, PositionFinder, StreamPositionFinder,
};
use eyewatch_core::capture::domain::frame_source::FrameSource;
use eyewatch_core::capture::infrastructure::camera_source::CameraSource;
use eyewatch_core::capture::infrastructure::image_file_source::{
    is_image, read_image, ImageFileSource,
};
use eyewatch_core::capture::infrastructure::video_file_source::VideoFileSource;
use eyewatch_core::detection::domain::composite_detector::CompositeDetector;
use eyewatch_core::detection::domain::region_detector::RegionDetector;
use eyewatch_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_CONFIDENCE,
};
use eyewatch_core::pipeline::assign_profiles_use_case::AssignProfilesUseCase;
use eyewatch_core::pipeline::detector_stream_processor::DetectorStreamProcessor;
use eyewatch_core::pipeline::enroll_face_use_case::EnrollFaceUseCase;
use eyewatch_core::pipeline::import_faces_use_case::ImportFacesUseCase;
use eyewatch_core::pipeline::infrastructure::analysis_worker::{self, AnalysisMessage};
use eyewatch_core::pipeline::location_source::LocationSource;
use eyewatch_core::pipeline::pipeline_logger::{
    NullPipelineLogger, PipelineLogger, StdoutPipelineLogger,
};
use eyewatch_core::pipeline::recognition_stream_processor::RecognitionStreamProcessor;
use eyewatch_core::pipeline::shared_location_source::SharedLocationSource;
use eyewatch_core::pipeline::similar_faces_use_case::SimilarFacesUseCase;
use eyewatch_core::pipeline::tick_status::TickStatus;
use eyewatch_core::pipeline::tracking_stream_processor::TrackingStreamProcessor;
use eyewatch_core::profile::infrastructure::category_config::CategoryConfig;
use eyewatch_core::profile::infrastructure::description_store::DescriptionStore;
use eyewatch_core::recognition::domain::identity_matcher::IdentityMatcher;
use eyewatch_core::recognition::infrastructure::face_database::FaceDatabase;
use eyewatch_core::recognition::infrastructure::onnx_face_encoder::OnnxFaceEncoder;
use eyewatch_core::shared::clock::MonotonicClock;
use eyewatch_core::shared::config::PipelineConfig;
use eyewatch_core::shared::constants::{FACE_DETECTOR_MODEL, FACE_EMBEDDING_MODEL};
use eyewatch_core::shared::model_resolver::{self, ModelSpec};
use eyewatch_core::tracking::domain::region_tracker::{RegionTracker, TrackerFactory};
use eyewatch_core::tracking::infrastructure::correlation_tracker::CorrelationTracker;

/// Face tracking and recognition for interactive installations.
#[derive(Parser)]
#[command(name = "eyewatch")]
struct Cli {
    /// JSON pipeline configuration; flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Face database directory.
    #[arg(long, global = true, default_value = "faces")]
    database: PathBuf,

    /// Face detector ONNX model(s). Several models are combined; by
    /// default the bundled face model is downloaded and cached.
    #[arg(long, global = true)]
    detector_model: Vec<PathBuf>,

    /// Face embedding ONNX model (downloaded and cached by default).
    #[arg(long, global = true)]
    embedding_model: Option<PathBuf>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, global = true, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Number of trackers kept alive at once.
    #[arg(long, global = true)]
    tracker_capacity: Option<usize>,

    /// Frames a tracker survives without a fresh detection.
    #[arg(long, global = true)]
    tracking_time: Option<usize>,

    /// Frames are shrunk by this factor before detection.
    #[arg(long, global = true)]
    resize_factor: Option<f64>,

    /// Detect every Nth frame in detector-only and recognition modes.
    #[arg(long, global = true)]
    process_every: Option<usize>,

    /// Maximum encoding distance accepted as a match.
    #[arg(long, global = true)]
    tolerance: Option<f64>,

    /// Number of analysed frames the identity vote looks back on.
    #[arg(long, global = true)]
    window: Option<usize>,

    /// Print per-stage timings when the stream ends.
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Track faces and print the horizontal position signal (-1 left, 1 right).
    Eyes {
        #[command(flatten)]
        source: SourceArgs,
        /// Stop after this many polls.
        #[arg(long)]
        frames: Option<usize>,
        /// Detect without trackers.
        #[arg(long)]
        detector_only: bool,
    },
    /// Print the oscillating demo signal.
    Demo {
        #[arg(long, default_value_t = 4.0)]
        frequency: f64,
        #[arg(long, default_value_t = 100)]
        samples: usize,
        #[arg(long, default_value_t = 50)]
        interval_ms: u64,
    },
    /// Name the faces of a stream against the database. Press Enter to
    /// reject the current name.
    Recognize {
        #[command(flatten)]
        source: SourceArgs,
        /// Stop after this many frames.
        #[arg(long)]
        frames: Option<usize>,
    },
    /// Add a photo holding exactly one face under NAME.
    Enroll {
        image: PathBuf,
        name: String,
        /// Add to a name that is already enrolled.
        #[arg(long)]
        allow_existing: bool,
    },
    /// Forget an enrolled photo.
    Remove {
        image_path: PathBuf,
        /// Keep the image file on disk.
        #[arg(long)]
        soft: bool,
    },
    /// List the enrolled people who look most like the face in IMAGE.
    Similar {
        image: PathBuf,
        #[arg(short, default_value_t = 3)]
        n: usize,
    },
    /// Classify people from their descriptions and store their profile.
    Profile {
        /// Person to classify; see --all.
        #[arg(required_unless_present = "all")]
        name: Option<String>,
        /// Classify every enrolled person.
        #[arg(long)]
        all: bool,
        /// Folder of `<name>.txt` descriptions.
        #[arg(long)]
        descriptions: PathBuf,
        /// JSON category configuration (built-in categories by default).
        #[arg(long)]
        categories: Option<PathBuf>,
    },
    /// Enroll every photo of a `<dir>/<name>/<photo>` folder tree.
    Import {
        dir: PathBuf,
        /// Also classify the imported people from this description folder.
        #[arg(long)]
        descriptions: Option<PathBuf>,
        #[arg(long)]
        categories: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Camera device index.
    #[arg(long, default_value_t = 0)]
    camera: u32,
    /// Read frames from a video file instead of the camera.
    #[arg(long, conflicts_with = "image")]
    video: Option<PathBuf>,
    /// Serve a still image as the stream.
    #[arg(long)]
    image: Option<PathBuf>,
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
    let config = load_config(&cli)?;

    match &cli.command {
        Command::Eyes {
            source,
            frames,
            detector_only,
        } => run_eyes(&cli, &config, source, *frames, *detector_only),
        Command::Demo {
            frequency,
            samples,
            interval_ms,
        } => run_demo(*frequency, *samples, *interval_ms),
        Command::Recognize { source, frames } => run_recognize(&cli, &config, source, *frames),
        Command::Enroll {
            image,
            name,
            allow_existing,
        } => run_enroll(&cli, &config, image, name, !allow_existing),
        Command::Remove { image_path, soft } => run_remove(&cli, image_path, !soft),
        Command::Similar { image, n } => run_similar(&cli, &config, image, *n),
        Command::Profile {
            name,
            all,
            descriptions,
            categories,
        } => run_profile(&cli, name.as_deref(), *all, descriptions, categories.as_deref()),
        Command::Import {
            dir,
            descriptions,
            categories,
        } => run_import(&cli, &config, dir, descriptions.as_deref(), categories.as_deref()),
    }
}

fn run_eyes(
    cli: &Cli,
    config: &PipelineConfig,
    source: &SourceArgs,
    frames: Option<usize>,
    detector_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame_source = open_source(source)?;
    let detector = build_detector(cli)?;
    if detector_only {
        let processor = DetectorStreamProcessor::new(frame_source, detector, config)?
            .with_logger(build_logger(cli));
        poll_positions(
            processor,
            frames,
            |p| p.last_status() == Some(TickStatus::Ended),
            |p| p.logger().summary(),
        )
    } else {
        let factory: TrackerFactory =
            Box::new(|| Box::new(CorrelationTracker::default()) as Box<dyn RegionTracker>);
        let processor = TrackingStreamProcessor::new(frame_source, detector, &factory, config)?
            .with_logger(build_logger(cli));
        poll_positions(
            processor,
            frames,
            |p| p.last_status() == Some(TickStatus::Ended),
            |p| p.logger().summary(),
        )
    }
}

/// Prints one position per poll until `frames` polls or the stream ends.
fn poll_positions<P: LocationSource>(
    processor: P,
    frames: Option<usize>,
    ended: impl Fn(&P) -> bool,
    finish: impl Fn(&P),
) -> Result<(), Box<dyn std::error::Error>> {
    let shared = SharedLocationSource::new(processor);
    let mut finder = StreamPositionFinder::new(shared.clone());
    let mut polls = 0;
    while frames.map_or(true, |limit| polls < limit) {
        let position = finder.current_position();
        if shared.with(|p| ended(p)) {
            break;
        }
        println!("{position:.3}");
        polls += 1;
    }
    shared.with(|p| finish(p));
    Ok(())
}

fn run_demo(
    frequency: f64,
    samples: usize,
    interval_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut finder = OscillatingPositionFinder::with_frequency(MonotonicClock::new(), frequency);
    for _ in 0..samples {
        println!("{:.3}", finder.current_position());
        thread::sleep(Duration::from_millis(interval_ms));
    }
    Ok(())
}

fn run_recognize(
    cli: &Cli,
    config: &PipelineConfig,
    source: &SourceArgs,
    frames: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let database = Arc::new(RwLock::new(FaceDatabase::open(&cli.database)?));
    let matcher = build_matcher(cli, config)?;
    let processor = RecognitionStreamProcessor::new(open_source(source)?, matcher, config)?
        .with_logger(build_logger(cli));

    let (rx, control) = analysis_worker::spawn(processor, Arc::clone(&database));
    let rejecter = control.clone();
    thread::spawn(move || {
        for _ in io::stdin().lock().lines().map_while(Result::ok) {
            rejecter.reset_name();
        }
    });
    let mut seen = 0;
    let mut latched: Option<String> = None;
    for message in rx.iter() {
        match message {
            AnalysisMessage::Update { analysis, name, .. } => {
                let names: Vec<&str> = analysis.iter().map(|a| a.display_name()).collect();
                log::debug!("faces: {names:?}");
                if name != latched {
                    match &name {
                        Some(n) => {
                            let profile = database
                                .read()
                                .map(|db| db.profile_for(n).to_string())
                                .unwrap_or_default();
                            println!("{n}: {profile}");
                        }
                        None => println!("(nobody)"),
                    }
                    latched = name;
                }
                seen += 1;
                if frames.is_some_and(|limit| seen >= limit) {
                    control.stop();
                }
            }
            AnalysisMessage::Ended | AnalysisMessage::Stopped => break,
            AnalysisMessage::Error(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn run_enroll(
    cli: &Cli,
    config: &PipelineConfig,
    image: &Path,
    name: &str,
    check_name: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = read_image(image)?;
    let file_name = image
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or("image path has no file name")?;
    let mut database = FaceDatabase::open(&cli.database)?;
    let mut use_case = EnrollFaceUseCase::new(build_matcher(cli, config)?);

    let status = use_case.execute(&mut database, &frame, name, file_name, check_name)?;
    if !status.one_face_detected {
        return Err(format!("{} must show exactly one face", image.display()).into());
    }
    if status.name_already_exists {
        return Err(format!("{name} is already enrolled (use --allow-existing)").into());
    }
    println!("Enrolled {name}");
    Ok(())
}

fn run_remove(cli: &Cli, image_path: &Path, hard: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut database = FaceDatabase::open(&cli.database)?;
    if !database.remove(image_path, hard)? {
        eprintln!("Record removed but {} could not be deleted", image_path.display());
    }
    Ok(())
}

fn run_similar(
    cli: &Cli,
    config: &PipelineConfig,
    image: &Path,
    n: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = read_image(image)?;
    let database = FaceDatabase::open(&cli.database)?;
    let mut use_case = SimilarFacesUseCase::new(build_matcher(cli, config)?);
    for (name, distance) in use_case.execute(&frame, database.records(), n)? {
        println!("{name}\t{distance:.3}");
    }
    Ok(())
}

fn run_profile(
    cli: &Cli,
    name: Option<&str>,
    all: bool,
    descriptions: &Path,
    categories: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut database = FaceDatabase::open(&cli.database)?;
    let use_case = AssignProfilesUseCase::new(
        &load_categories(categories)?,
        DescriptionStore::new(descriptions),
    )?;
    if all {
        let assigned = use_case.execute_all(&mut database)?;
        println!("Assigned {assigned} profile(s)");
    } else if let Some(name) = name {
        match use_case.execute(&mut database, name)? {
            Some(profile) => println!("{name}: {profile}"),
            None => println!("No description for {name}"),
        }
    }
    Ok(())
}

fn run_import(
    cli: &Cli,
    config: &PipelineConfig,
    dir: &Path,
    descriptions: Option<&Path>,
    categories: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut database = FaceDatabase::open(&cli.database)?;
    let mut use_case = ImportFacesUseCase::new(build_matcher(cli, config)?);
    let summary = use_case.execute(&mut database, dir)?;
    println!("Imported {} photo(s), skipped {}", summary.added, summary.skipped);

    if let Some(descriptions) = descriptions {
        let profiles = AssignProfilesUseCase::new(
            &load_categories(categories)?,
            DescriptionStore::new(descriptions),
        )?;
        let assigned = profiles.execute_all(&mut database)?;
        println!("Assigned {assigned} profile(s)");
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(v) = cli.tracker_capacity {
        config.tracker_capacity = v;
    }
    if let Some(v) = cli.tracking_time {
        config.tracking_time = v;
    }
    if let Some(v) = cli.resize_factor {
        config.resize_factor = v;
    }
    if let Some(v) = cli.process_every {
        config.process_every = v;
    }
    if let Some(v) = cli.tolerance {
        config.tolerance = v;
    }
    if let Some(v) = cli.window {
        config.window = v;
    }
    config.validate()?;
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    Ok(config)
}

fn load_categories(path: Option<&Path>) -> Result<CategoryConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => CategoryConfig::load(path)?,
        None => CategoryConfig::builtin(),
    })
}

fn open_source(source: &SourceArgs) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if let Some(video) = &source.video {
        return Ok(Box::new(VideoFileSource::open(video)?));
    }
    if let Some(image) = &source.image {
        if !is_image(image) {
            return Err(format!("Not a supported image: {}", image.display()).into());
        }
        return Ok(Box::new(ImageFileSource::open(image)?));
    }
    Ok(Box::new(CameraSource::open(source.camera)?))
}

fn build_detector(cli: &Cli) -> Result<Box<dyn RegionDetector>, Box<dyn std::error::Error>> {
    let paths = if cli.detector_model.is_empty() {
        vec![resolve_model(&FACE_DETECTOR_MODEL, None)?]
    } else {
        cli.detector_model
            .iter()
            .map(|p| resolve_model(&FACE_DETECTOR_MODEL, Some(p)))
            .collect::<Result<Vec<_>, _>>()?
    };
    let mut detectors: Vec<Box<dyn RegionDetector>> = Vec::with_capacity(paths.len());
    for path in &paths {
        detectors.push(Box::new(OnnxYoloDetector::new(path, cli.confidence, 0)?));
    }
    if detectors.len() == 1 {
        Ok(detectors.remove(0))
    } else {
        Ok(Box::new(CompositeDetector::new(detectors)?))
    }
}

fn build_matcher(
    cli: &Cli,
    config: &PipelineConfig,
) -> Result<IdentityMatcher, Box<dyn std::error::Error>> {
    let embedding = resolve_model(&FACE_EMBEDDING_MODEL, cli.embedding_model.as_deref())?;
    let encoder = OnnxFaceEncoder::new(&embedding)?;
    Ok(IdentityMatcher::new(
        build_detector(cli)?,
        Box::new(encoder),
        config.tolerance,
    )?)
}

fn build_logger(cli: &Cli) -> Box<dyn PipelineLogger> {
    if cli.stats {
        Box::new(StdoutPipelineLogger::default())
    } else {
        Box::new(NullPipelineLogger)
    }
}

fn resolve_model(
    spec: &ModelSpec,
    explicit: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", spec.name);
    let path = model_resolver::resolve(spec, explicit, Some(Box::new(download_progress)))?;
    Ok(path)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
