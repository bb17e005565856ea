use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Directory containing the ONNX face model.
    pub model_dir: PathBuf,
    /// Cosine similarity threshold for a positive match (inclusive).
    pub similarity_threshold: f32,
}

impl Config {
    /// Load configuration from `TALLY_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("TALLY_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| tally_model::default_model_dir());

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("tally");

        let db_path = std::env::var("TALLY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("attendance.db"));

        Self {
            db_path,
            model_dir,
            similarity_threshold: env_f32("TALLY_SIMILARITY_THRESHOLD", 0.5),
        }
    }

    /// Path to the face pipeline model.
    pub fn model_path(&self) -> String {
        self.model_dir
            .join(tally_model::model_file_name())
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
