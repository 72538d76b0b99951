use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// HTTP listen address (default: 0.0.0.0:5000).
    pub listen_addr: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Fixed local video file every agent analyzes.
    pub video_path: PathBuf,
    /// Fixed reference face image.
    pub reference_path: PathBuf,
    /// Datalake root directory for inputs and session-scoped outputs.
    pub datalake_root: PathBuf,
    /// Euclidean-distance threshold for a positive face match.
    pub match_threshold: f32,
    /// Debug mode, from the `DEBUG` environment variable ("1" or "true").
    pub debug: bool,
}

impl Config {
    /// Load configuration from `PALPEBRA_*` environment variables with
    /// defaults. `DEBUG` follows the service's historical contract.
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("PALPEBRA_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            model_dir: env_path("PALPEBRA_MODEL_DIR", "./models"),
            video_path: env_path("PALPEBRA_VIDEO_PATH", "./data/input.mp4"),
            reference_path: env_path("PALPEBRA_REFERENCE_PATH", "./data/reference.png"),
            datalake_root: env_path("PALPEBRA_DATALAKE_ROOT", "./data/datalake"),
            match_threshold: env_f32(
                "PALPEBRA_MATCH_THRESHOLD",
                palpebra_core::DEFAULT_MATCH_THRESHOLD,
            ),
            debug: is_debug(std::env::var("DEBUG").ok().as_deref()),
        }
    }

    /// Path to the SCRFD face detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("det_10g.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the 68-point landmark model.
    pub fn landmark_model_path(&self) -> String {
        self.model_dir
            .join("pfld_68.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the face encoder model.
    pub fn encoder_model_path(&self) -> String {
        self.model_dir
            .join("w600k_r50.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

/// `DEBUG` is on for exactly "1" and "true".
pub fn is_debug(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true"))
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
