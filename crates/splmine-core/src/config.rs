//! Configuration and working directory management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Section code of "INDICATIONS & USAGE" in SPL documents.
pub const DEFAULT_INDICATION_CODE: &str = "34067-9";

/// Cosine similarity at or above which two indication texts are near-duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Payloads parsed per parallel batch.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Paths under the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Working directory (e.g., `data/`).
    pub root: PathBuf,
    /// Downloaded release archives (`data/download/`), the default input.
    pub download: PathBuf,
    /// Extraction results (`data/results/`).
    pub results: PathBuf,
}

impl DataPaths {
    /// Create data paths from a working directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            download: root.join("download"),
            results: root.join("results"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.download)?;
        std::fs::create_dir_all(&self.results)?;
        Ok(())
    }

    /// Default destination of the indications table.
    pub fn indications_csv(&self) -> PathBuf {
        self.results.join("indications.csv")
    }
}

/// How near-duplicate pairs are grouped before dropping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterPolicy {
    /// Each retained record drops the later records directly similar to it.
    /// Dropped records never anchor further drops.
    #[default]
    FirstAnchor,
    /// Transitive single-link clusters; only the first record of each survives.
    ConnectedComponent,
}

impl std::fmt::Display for ClusterPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstAnchor => write!(f, "first-anchor"),
            Self::ConnectedComponent => write!(f, "connected-component"),
        }
    }
}

impl std::str::FromStr for ClusterPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first-anchor" => Ok(Self::FirstAnchor),
            "connected-component" => Ok(Self::ConnectedComponent),
            other => Err(Error::Config(format!(
                "unknown cluster policy {:?} (expected first-anchor or connected-component)",
                other
            ))),
        }
    }
}

/// Top-level run configuration (persisted as JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplMineConfig {
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub cluster_policy: ClusterPolicy,
    /// Section codes treated as indication sections.
    #[serde(default = "default_section_codes")]
    pub section_codes: Vec<String>,
    /// Remove the leading "1 INDICATIONS AND USAGE" heading from extracted text.
    #[serde(default)]
    pub strip_heading: bool,
    /// Stem tokens before TF-IDF weighting.
    #[serde(default = "default_true")]
    pub stem_tokens: bool,
    #[serde(default = "default_true")]
    pub dedup: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_section_codes() -> Vec<String> {
    vec![DEFAULT_INDICATION_CODE.to_string()]
}
fn default_true() -> bool {
    true
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for SplMineConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            cluster_policy: ClusterPolicy::default(),
            section_codes: default_section_codes(),
            strip_heading: false,
            stem_tokens: true,
            dedup: true,
            batch_size: DEFAULT_BATCH_SIZE,
            min_length: None,
            max_length: None,
        }
    }
}

impl SplMineConfig {
    /// Load config from a JSON file, then apply environment overrides.
    /// A missing file yields the defaults; an unparsable one is an error.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)?;
                let config: SplMineConfig = serde_json::from_str(&raw)?;
                info!("Loaded config from {}", path.display());
                config
            }
            _ => SplMineConfig::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Environment variables override file values.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("SPLMINE_WORKING_DIR") {
            self.working_dir = PathBuf::from(dir);
        }
        if let Some(t) = std::env::var("SPLMINE_THRESHOLD")
            .ok()
            .and_then(|t| t.parse().ok())
        {
            self.similarity_threshold = t;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Config(format!(
                "similarity threshold must be within 0.0..=1.0, got {}",
                self.similarity_threshold
            )));
        }
        if self.section_codes.is_empty() {
            return Err(Error::Config("at least one section code is required".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be positive".into()));
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(Error::Config(format!(
                    "min length {} exceeds max length {}",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Resolve (and create) the working directory layout.
    pub fn data_paths(&self) -> std::io::Result<DataPaths> {
        DataPaths::new(&self.working_dir)
    }
}
