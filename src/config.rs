//! Pipeline configuration format.

use crate::dataset::common_structs::{TargetSize, Task};
use crate::dataset::data_loaders::voc_batch_loader::BatchLoaderOptions;
use crate::metrics::IntersectionPolicy;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything needed to go from an annotation file to batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub annotations_file: PathBuf,
    /// Directory holding the files named in the images table
    pub image_dir: PathBuf,
    #[serde(default = "default_target_dim")]
    pub target_height: u32,
    #[serde(default = "default_target_dim")]
    pub target_width: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_true")]
    pub shuffle: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub task: Task,
    /// Only feed the largest object of each image
    #[serde(default = "default_true")]
    pub primary_only: bool,
    #[serde(default)]
    pub iou_policy: IntersectionPolicy,
}

fn default_target_dim() -> u32 {
    224
}

fn default_batch_size() -> usize {
    32
}

fn default_true() -> bool {
    true
}

impl PipelineConfig {
    /// Configuration with default settings for the given annotation file and image directory
    pub fn new<P, Q>(annotations_file: P, image_dir: Q) -> Self
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        PipelineConfig {
            annotations_file: annotations_file.into(),
            image_dir: image_dir.into(),
            target_height: default_target_dim(),
            target_width: default_target_dim(),
            batch_size: default_batch_size(),
            shuffle: true,
            seed: None,
            task: Task::default(),
            primary_only: true,
            iou_policy: IntersectionPolicy::default(),
        }
    }

    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: PipelineConfig = json5::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(
            self.target_height > 0 && self.target_width > 0,
            "target size must be non zero, got {}x{}",
            self.target_width,
            self.target_height
        );
        Ok(())
    }

    pub fn target(&self) -> TargetSize {
        TargetSize {
            height: self.target_height,
            width: self.target_width,
        }
    }

    pub fn loader_options(&self) -> BatchLoaderOptions {
        BatchLoaderOptions {
            target: self.target(),
            batch_size: self.batch_size,
            shuffle: self.shuffle,
            task: self.task,
            seed: self.seed,
        }
    }
}
