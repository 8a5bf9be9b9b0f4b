//! Streaming configuration

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::points::MAX_POINTS_PER_MESH;

/// Configuration for the out-of-core streaming engine
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Folder holding the converted point cloud (`Octants/` lives below it)
    pub data_dir: PathBuf,
    /// Maximum number of points visible in one frame
    pub point_threshold: u64,
    /// Octants loaded per loader batch
    pub load_batch_size: usize,
    /// Minimum time between scene reconciliations, in milliseconds
    pub update_interval_ms: u64,
    /// Octants smaller on screen than `root size * ratio` are culled
    pub min_projected_size_ratio: f64,
    /// Width of the hierarchy texture in texels
    pub hierarchy_texture_width: u32,
    /// Vertex limit per generated point mesh
    pub max_points_per_mesh: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("assets/pointcloud"),
            point_threshold: 1_000_000,
            load_batch_size: 5,
            update_interval_ms: 200,
            min_projected_size_ratio: 1.0 / 3.0,
            hierarchy_texture_width: 4096,
            max_points_per_mesh: MAX_POINTS_PER_MESH,
        }
    }
}

impl StreamingConfig {
    /// Default config reading octants from `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.load_batch_size == 0 {
            return Err(Error::Config("load_batch_size must be at least 1".into()));
        }
        if self.update_interval_ms == 0 {
            return Err(Error::Config("update_interval_ms must be at least 1".into()));
        }
        if self.hierarchy_texture_width == 0 {
            return Err(Error::Config("hierarchy_texture_width must be at least 1".into()));
        }
        if !(self.min_projected_size_ratio > 0.0 && self.min_projected_size_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "min_projected_size_ratio {} outside (0, 1]",
                self.min_projected_size_ratio
            )));
        }
        if self.max_points_per_mesh == 0 {
            return Err(Error::Config("max_points_per_mesh must be at least 1".into()));
        }
        Ok(())
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from file (sync); missing fields fall back to defaults
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }
}
