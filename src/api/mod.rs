//! High-level library API: list archive projects, build the phantom study from
//! run parameters, and run the requested QC pipelines in order. Prefer these
//! entrypoints over the lower-level `core` modules when embedding phantom-qc.
use tracing::info;

use crate::core::params::QcRunParams;
use crate::core::study::{PROJECT_ID, PhantomStudy, STUDY_NAME};
use crate::error::Result;
use crate::io::archive::Archive;
use crate::io::xnat::XnatArchive;

/// Totals over every pipeline in a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QcReport {
    pub pipelines: usize,
    pub processed: usize,
    pub skipped: usize,
}

/// Open a session just long enough to list the visible projects.
pub fn list_projects(archive: &dyn Archive) -> Result<Vec<String>> {
    let session = archive.connect()?;
    session.projects()
}

/// The `qc` study over the `INSTRUMENT` project on the configured XNAT server.
pub fn build_study(params: &QcRunParams) -> PhantomStudy {
    PhantomStudy::new(
        STUDY_NAME,
        PROJECT_ID,
        Box::new(XnatArchive::new(&params.server, params.credentials.clone())),
        PhantomStudy::inputs_from(&params.phantoms),
    )
}

/// Build and run one pipeline per `params.phantoms` entry, in order. A
/// phantom listed twice runs twice. The first failure ends the run.
pub fn run_pipelines(study: &PhantomStudy, params: &QcRunParams) -> Result<QcReport> {
    let mut report = QcReport::default();

    for input in &params.phantoms {
        let options = params.options.for_phantom(input.phantom);
        let pipeline = study.pipeline(input.phantom, &options)?;
        info!("Running {} on scan '{}'", pipeline.name(), input.scan);

        let run = pipeline.run(
            params.subject_ids.as_deref(),
            params.visit_ids.as_deref(),
            params.reprocess,
            params.work_dir.as_deref(),
        )?;
        report.pipelines += 1;
        report.processed += run.processed;
        report.skipped += run.skipped;
    }

    Ok(report)
}

/// Run every requested pipeline against the XNAT server in `params`.
pub fn run_qc(params: &QcRunParams) -> Result<QcReport> {
    let study = build_study(params);
    run_pipelines(&study, params)
}
