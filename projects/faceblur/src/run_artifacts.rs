// Run artifact definitions
//
// The JSON report optionally written at the end of a run.

use crate::config::FaceBlurConfig;
use crate::pipeline::types::{FrameRecord, RunSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Debug, Clone)]
pub struct RunReport {
    pub created_at: DateTime<Utc>,
    pub input: PathBuf,
    pub output: PathBuf,
    pub model: PathBuf,
    pub detector: String,
    pub scale: f64,
    pub frame_skip: usize,
    pub blur_sigma: f64,
    pub summary: RunSummary,
    pub frames: Vec<FrameRecord>,
}

impl RunReport {
    pub fn new(config: &FaceBlurConfig, summary: RunSummary, frames: Vec<FrameRecord>) -> Self {
        Self {
            created_at: Utc::now(),
            input: config.input.clone(),
            output: config.output.clone(),
            model: config.detector.model_path.clone(),
            detector: config.detector.kind.name().to_string(),
            scale: config.scale,
            frame_skip: config.frame_skip.interval(),
            blur_sigma: config.blur_sigma,
            summary,
            frames,
        }
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(report)?;
    fs::write(path, content).with_context(|| format!("Failed to write report {:?}", path))?;
    Ok(())
}
