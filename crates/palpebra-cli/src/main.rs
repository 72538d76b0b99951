use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use palpebra_core::{
    AnalysisPipeline, CancelFlag, FaceDetector, FaceEncoder, LandmarkPredictor,
    DEFAULT_MATCH_THRESHOLD,
};
use palpebra_media::VideoFile;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "palpebra", about = "Palpebra analytics CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis on a video against a reference image
    Analyze {
        /// Video file to scan for a closed-eye frame
        #[arg(short, long)]
        video: PathBuf,
        /// Reference face image
        #[arg(short, long)]
        reference: PathBuf,
        /// Directory containing the ONNX models
        #[arg(short, long, default_value = "./models")]
        models: PathBuf,
        /// Euclidean match threshold
        #[arg(short, long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
        threshold: f32,
    },
    /// Print a video file's stream information
    Probe {
        /// Video file to probe
        video: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            video,
            reference,
            models,
            threshold,
        } => {
            let detector =
                FaceDetector::load(&models.join("det_10g.onnx").to_string_lossy())
                    .context("loading face detector")?;
            let landmarks =
                LandmarkPredictor::load(&models.join("pfld_68.onnx").to_string_lossy())
                    .context("loading landmark predictor")?;
            let encoder =
                FaceEncoder::load(&models.join("w600k_r50.onnx").to_string_lossy())
                    .context("loading face encoder")?;
            let mut pipeline = AnalysisPipeline::new(detector, landmarks, encoder, threshold);

            let reference_frame =
                palpebra_media::still::load_frame(&reference).context("loading reference image")?;
            let mut video_file = VideoFile::open(&video).context("opening video")?;

            let analysis =
                pipeline.analyze(video_file.frames()?, &reference_frame, &CancelFlag::new())?;

            println!(
                "selected frame: {} (of {} scanned, {} with a face)",
                analysis.selected_index, analysis.frames_scanned, analysis.faces_seen
            );
            println!("blinks observed: {}", analysis.total_blinks);
            println!(
                "match: {} (distance {:.4}, threshold {:.2})",
                analysis.result.matched, analysis.result.distance, threshold
            );
        }
        Commands::Probe { video } => {
            let video_file = VideoFile::open(&video).context("opening video")?;
            let info = video_file.info();
            println!("{}x{} @ {:.2} fps", info.width, info.height, info.fps);
            println!("container frame count: {}", info.total_frames);
        }
    }

    Ok(())
}
