//! Configuration loader - YAML defaults + .env overrides

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::curve::MAX_SUBDIVISIONS;
use crate::params::VisualizationParameters;

/// Main configuration loaded from spiral.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parameters a fresh journal starts with
    pub initial: VisualizationParameters,
    pub segment_count: usize,
    /// Top of the spiral; period labels count backward from here
    pub epoch: NaiveDate,
    /// Year stamped on the initial nodes
    pub node_year: i32,
    pub viewer: ViewerConfig,
}

/// Native viewer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub width: f32,
    pub height: f32,
    pub point_size: f32,
    /// Catmull-Rom steps between curve samples when drawing
    pub smoothing: usize,
    pub auto_rotate: bool,
    /// Degrees per second
    pub rotate_speed: f64,
}

/// Paths loaded from .env
#[derive(Debug, Clone)]
pub struct Env {
    pub log_dir: String,
    pub session: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial: VisualizationParameters::default(),
            segment_count: 400,
            epoch: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default(),
            node_year: 2024,
            viewer: ViewerConfig::default(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 900.0,
            point_size: 3.0,
            smoothing: 2,
            auto_rotate: false,
            rotate_speed: 12.0,
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config.sanitized())
    }

    /// Load from file if present, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!("Config file not found: {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    fn sanitized(mut self) -> Self {
        self.initial = self.initial.sanitized();
        self.segment_count = self.segment_count.max(1);
        self.viewer.smoothing = self.viewer.smoothing.clamp(1, MAX_SUBDIVISIONS);
        self
    }
}

impl Env {
    /// Load overrides from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Env {
            log_dir: std::env::var("SPIRAL_LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            session: std::env::var("SPIRAL_SESSION")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("journal.json")),
        }
    }
}
