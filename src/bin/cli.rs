//! CLI for face-shape classification and overlay compositing.
//!
//! Usage:
//!   mirror-face classify <landmarks.json>            # Human-readable output
//!   mirror-face classify <landmarks.json> --json     # JSON output
//!   mirror-face stabilize <recording.json>           # Replay a recorded session
//!   mirror-face composite --frame f.png --landmarks l.json --overlay hair.png -o out.jpg

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mirror_face::{
    capture_composite, classify, render_frame, shape_info, AssetSlot, CaptureFormat, ClassificationResult, FileSource,
    Landmark, LandmarkFeed, LandmarkSet, MirrorConfig, OverlayAsset, RenderOptions, ReplayDetector, RgbaImage,
    ShapeCategory, Stabilizer,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "mirror-face")]
#[command(author, version, about = "Face-shape classification and hairstyle overlays", long_about = None)]
struct Cli {
    /// Config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a single landmark frame
    Classify {
        /// JSON array of landmarks
        landmarks: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replay recorded frames through the stabilizer
    Stabilize {
        /// JSON array of frames, each null or a landmark array
        recording: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Render a mirrored composite with an overlay
    Composite {
        /// Source video frame
        #[arg(long)]
        frame: PathBuf,

        /// Landmarks for the frame (JSON array)
        #[arg(long)]
        landmarks: Option<PathBuf>,

        /// Overlay image, typically a transparent PNG
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// Output image; .png writes PNG, anything else JPEG
        #[arg(short, long)]
        output: PathBuf,

        /// Overlay opacity
        #[arg(long)]
        opacity: Option<f32>,

        /// Mark anchor landmarks
        #[arg(long)]
        debug: bool,
    },
}

#[derive(Serialize)]
struct FrameOutput {
    frame: usize,
    face_detected: bool,
    instant: Option<ShapeCategory>,
    stable: Option<ShapeCategory>,
    window: usize,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map(MirrorConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_target(true)
        .init();

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, config: &MirrorConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Classify { landmarks, json, output } => {
            let points = read_landmarks(&landmarks)?;
            let result = classify(&points).ok_or("not enough landmarks for a full face mesh")?;

            let text = if json {
                serde_json::to_string_pretty(&result)?
            } else {
                format_human_readable(&result)
            };
            match output {
                Some(path) => std::fs::write(path, text)?,
                None => println!("{}", text),
            }
        }
        Command::Stabilize { recording, json } => {
            let detector = ReplayDetector::load(&recording)?;
            let total = detector.remaining();
            let mut feed = LandmarkFeed::new(detector);
            let mut stabilizer = Stabilizer::new();
            let blank = RgbaImage::new(1, 1);

            let frames: Vec<FrameOutput> = (0..total)
                .map(|index| replay_frame(&mut feed, &mut stabilizer, &blank, index))
                .collect();
            feed.close();

            if json {
                println!("{}", serde_json::to_string_pretty(&frames)?);
            } else {
                for f in &frames {
                    println!(
                        "{:>4}  {:<8} {:<8} window {:>2}",
                        f.frame,
                        f.instant.map_or("-", |s| s.as_str()),
                        f.stable.map_or("-", |s| s.as_str()),
                        f.window,
                    );
                }
            }
        }
        Command::Composite {
            frame,
            landmarks,
            overlay,
            output,
            opacity,
            debug,
        } => {
            let source = image::open(&frame)?.to_rgba8();
            let points = landmarks.as_deref().map(read_landmarks).transpose()?;
            let asset = match overlay.as_deref() {
                Some(path) => Some(load_overlay(path).await?),
                None => None,
            };
            let opacity = opacity.unwrap_or(config.render.opacity);

            if debug {
                let mut surface = RgbaImage::new(source.width(), source.height());
                let options = RenderOptions { opacity, debug: true };
                render_frame(&mut surface, &source, points.as_deref(), asset.as_ref(), &options)?;
                surface.save(&output)?;
                return Ok(());
            }

            let mut settings = config.capture;
            settings.opacity = opacity;
            settings.format = match output.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("png") => CaptureFormat::Png,
                _ => CaptureFormat::Jpeg,
            };

            let (width, height) = source.dimensions();
            let landmark_set = points.and_then(LandmarkSet::new);
            let encoded = capture_composite(Arc::new(source), landmark_set, asset, width, height, settings).await?;
            std::fs::write(&output, &encoded.data)?;
            eprintln!("Wrote {} ({}, {} bytes)", output.display(), encoded.content_type(), encoded.data.len());
        }
    }
    Ok(())
}

/// Load the overlay the same way a session does, through an asset slot.
async fn load_overlay(path: &Path) -> Result<OverlayAsset, Box<dyn std::error::Error>> {
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("overlay path has no file name")?;

    let slot = AssetSlot::new();
    slot.request(Arc::new(FileSource::new(root)), name)?.finished().await?;
    Ok(slot.current().ok_or("overlay was superseded before it loaded")?)
}

fn read_landmarks(path: &Path) -> Result<Vec<Landmark>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn replay_frame(
    feed: &mut LandmarkFeed<ReplayDetector>,
    stabilizer: &mut Stabilizer,
    blank: &RgbaImage,
    index: usize,
) -> FrameOutput {
    let frame = feed.next_frame(blank);
    let instant = frame.landmarks.as_deref().and_then(classify);
    let stable = instant.as_ref().and_then(|r| stabilizer.push(r));

    FrameOutput {
        frame: index,
        face_detected: frame.face_detected(),
        instant: instant.map(|r| r.shape),
        stable: stable.map(|s| s.shape),
        window: stabilizer.window_len(),
    }
}

fn format_human_readable(result: &ClassificationResult) -> String {
    let info = shape_info(result.shape);
    let m = &result.measurements;
    let mut s = String::new();

    s.push_str(&format!("Face shape: {} ({:.0}% confidence)\n", info.label, result.confidence * 100.0));
    s.push_str(&format!("{}\n", info.description));

    s.push_str("\nMeasurements (normalized):\n");
    s.push_str(&format!("  Face length:     {:.3}\n", m.face_length));
    s.push_str(&format!("  Forehead width:  {:.3}\n", m.forehead_width));
    s.push_str(&format!("  Cheekbone width: {:.3}\n", m.cheekbone_width));
    s.push_str(&format!("  Jaw width:       {:.3}\n", m.jaw_width));

    s.push_str("\nScores:\n");
    for shape in ShapeCategory::ALL {
        s.push_str(&format!("  {:<8} {:>3}\n", shape.as_str(), result.scores.get(shape)));
    }

    s.push_str(&format!("\nBest styles: {}\n", info.best_styles.join(", ")));
    s.push_str(&format!("Avoid:       {}\n", info.avoid_styles.join(", ")));
    s
}
