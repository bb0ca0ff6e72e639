//! The phantom QC study: an archive, the scans to analyse, and one pipeline
//! factory per phantom type.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::metrics::{ManifestBackend, MetricsBackend};
use crate::core::params::{PhantomInput, PipelineOptions};
use crate::core::pipeline::QcPipeline;
use crate::error::{Error, Result};
use crate::io::archive::Archive;
use crate::io::dataset::Dataset;
use crate::types::{Phantom, QcOption};

pub const STUDY_NAME: &str = "qc";
pub const PROJECT_ID: &str = "INSTRUMENT";

/// Directory under the system temp dir used when a run names no working directory.
pub const DEFAULT_WORK_DIR: &str = "phantom-qc";

/// Persistent default working directory, shared by every run on this machine
/// so provenance left by earlier runs is found again.
pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_WORK_DIR)
}

/// Builds the pipeline for one phantom from its option overrides.
pub type PipelineFactory =
    for<'a> fn(&'a PhantomStudy, &PipelineOptions) -> Result<QcPipeline<'a>>;

pub struct PhantomStudy {
    name: String,
    project_id: String,
    archive: Box<dyn Archive>,
    inputs: BTreeMap<String, Dataset>,
    backend: Box<dyn MetricsBackend>,
    default_work_dir: PathBuf,
}

impl PhantomStudy {
    pub fn new(
        name: &str,
        project_id: &str,
        archive: Box<dyn Archive>,
        inputs: BTreeMap<String, Dataset>,
    ) -> Self {
        Self {
            name: name.to_string(),
            project_id: project_id.to_string(),
            archive,
            inputs,
            backend: Box::new(ManifestBackend),
            default_work_dir: default_work_dir(),
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn MetricsBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Where pipelines write when `run` is given no working directory.
    pub fn with_default_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_work_dir = dir.into();
        self
    }

    /// Study inputs for the given phantoms, keyed `<phantom>_saline`, all DICOM.
    /// A phantom given twice keeps its last scan.
    pub fn inputs_from(phantoms: &[PhantomInput]) -> BTreeMap<String, Dataset> {
        phantoms
            .iter()
            .map(|p| (p.phantom.input_key(), Dataset::dicom(p.scan.clone())))
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn archive(&self) -> &dyn Archive {
        self.archive.as_ref()
    }

    pub fn backend(&self) -> &dyn MetricsBackend {
        self.backend.as_ref()
    }

    pub fn default_work_dir(&self) -> &Path {
        &self.default_work_dir
    }

    pub fn input(&self, key: &str) -> Option<&Dataset> {
        self.inputs.get(key)
    }

    pub fn pipeline_factory(phantom: Phantom) -> PipelineFactory {
        match phantom {
            Phantom::T1Coil32 => PhantomStudy::t1_32ch_qc_metrics_pipeline,
            Phantom::T2Coil32 => PhantomStudy::t2_32ch_qc_metrics_pipeline,
            Phantom::DmriCoil32 => PhantomStudy::dmri_32ch_qc_metrics_pipeline,
        }
    }

    /// Resolve and invoke the factory for `phantom`.
    pub fn pipeline(&self, phantom: Phantom, options: &PipelineOptions) -> Result<QcPipeline<'_>> {
        (Self::pipeline_factory(phantom))(self, options)
    }

    pub fn t1_32ch_qc_metrics_pipeline(&self, options: &PipelineOptions) -> Result<QcPipeline<'_>> {
        self.qc_metrics_pipeline(Phantom::T1Coil32, options)
    }

    pub fn t2_32ch_qc_metrics_pipeline(&self, options: &PipelineOptions) -> Result<QcPipeline<'_>> {
        self.qc_metrics_pipeline(Phantom::T2Coil32, options)
    }

    pub fn dmri_32ch_qc_metrics_pipeline(
        &self,
        options: &PipelineOptions,
    ) -> Result<QcPipeline<'_>> {
        self.qc_metrics_pipeline(Phantom::DmriCoil32, options)
    }

    fn qc_metrics_pipeline(
        &self,
        phantom: Phantom,
        options: &PipelineOptions,
    ) -> Result<QcPipeline<'_>> {
        let key = phantom.input_key();
        let input = self
            .inputs
            .get(&key)
            .cloned()
            .ok_or(Error::MissingInput { key })?;

        let mut typed = BTreeMap::new();
        for (name, value) in options {
            let option = QcOption::from_name(name).ok_or_else(|| Error::UnknownOption {
                pipeline: phantom.pipeline_name(),
                name: name.clone(),
                available: QcOption::available(),
            })?;
            typed.insert(option, value.clone());
        }

        debug!(
            "Built {} on '{}' with {} option override(s)",
            phantom.pipeline_name(),
            input.name,
            typed.len()
        );
        Ok(QcPipeline::new(self, phantom, input, typed))
    }
}
