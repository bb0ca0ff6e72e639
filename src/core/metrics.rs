//! Hand-off point between a pipeline and the engine that computes QC metrics.
use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::params::OptionValue;
use crate::error::Result;
use crate::io::writers::write_json_sidecar;
use crate::types::{DataFormat, Phantom, QcOption};

pub const REQUEST_FILE: &str = "qc_request.json";

/// Everything a metrics engine needs to analyse one phantom session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcRequest {
    pub study: String,
    pub project_id: String,
    pub pipeline: String,
    pub phantom: Phantom,
    pub subject_id: String,
    pub visit_id: String,
    pub session_label: String,
    pub input_key: String,
    pub scan: String,
    pub format: DataFormat,
    /// Overrides only; the engine applies its own defaults for the rest
    pub options: BTreeMap<QcOption, OptionValue>,
    /// Staged input files
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub created: DateTime<Utc>,
}

pub trait MetricsBackend {
    fn compute(&self, request: &QcRequest) -> Result<()>;
}

/// Writes each request as `qc_request.json` in its output directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestBackend;

impl MetricsBackend for ManifestBackend {
    fn compute(&self, request: &QcRequest) -> Result<()> {
        let path = request.output_dir.join(REQUEST_FILE);
        write_json_sidecar(&path, request)?;
        info!(
            "Queued {} for {} / {}: {:?}",
            request.pipeline, request.subject_id, request.visit_id, path
        );
        Ok(())
    }
}
