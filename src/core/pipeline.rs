use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::metrics::QcRequest;
use crate::core::params::OptionValue;
use crate::core::study::PhantomStudy;
use crate::error::{Error, Result};
use crate::io::archive::SessionRef;
use crate::io::dataset::Dataset;
use crate::io::writers::{read_json_sidecar, write_json_sidecar};
use crate::types::{Phantom, QcOption, ReprocessMode};

pub const PROVENANCE_FILE: &str = "provenance.json";

/// What produced a session's results; compared on later runs to decide reprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub pipeline: String,
    pub phantom: Phantom,
    pub scan: String,
    pub options: BTreeMap<QcOption, OptionValue>,
    pub processed: DateTime<Utc>,
}

impl Provenance {
    /// Same pipeline, input and options; the timestamp is ignored.
    pub fn same_config(&self, other: &Provenance) -> bool {
        self.pipeline == other.pipeline
            && self.phantom == other.phantom
            && self.scan == other.scan
            && self.options == other.options
    }
}

/// Per-pipeline run report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub processed: usize,
    pub skipped: usize,
}

pub(crate) fn should_skip(
    existing: Option<&Provenance>,
    current: &Provenance,
    reprocess: ReprocessMode,
) -> bool {
    match (existing, reprocess) {
        (None, _) | (_, ReprocessMode::All) => false,
        (Some(_), ReprocessMode::Never) => true,
        (Some(prev), ReprocessMode::IfChanged) => prev.same_config(current),
    }
}

/// Check that an archive-supplied id names exactly one directory below its parent.
pub(crate) fn path_component<'s>(what: &'static str, id: &'s str) -> Result<&'s str> {
    let mut components = Path::new(id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(id),
        _ => Err(Error::UnsafeId {
            what,
            value: id.to_string(),
        }),
    }
}

fn selected(filter: Option<&[String]>, id: &str) -> bool {
    filter.is_none_or(|ids| ids.iter().any(|i| i == id))
}

/// QC metrics pipeline for one phantom, bound to its study.
pub struct QcPipeline<'a> {
    study: &'a PhantomStudy,
    phantom: Phantom,
    input: Dataset,
    options: BTreeMap<QcOption, OptionValue>,
}

impl std::fmt::Debug for QcPipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QcPipeline")
            .field("study", &self.study.name())
            .field("phantom", &self.phantom)
            .field("input", &self.input)
            .field("options", &self.options)
            .finish()
    }
}

impl<'a> QcPipeline<'a> {
    pub(crate) fn new(
        study: &'a PhantomStudy,
        phantom: Phantom,
        input: Dataset,
        options: BTreeMap<QcOption, OptionValue>,
    ) -> Self {
        Self {
            study,
            phantom,
            input,
            options,
        }
    }

    pub fn name(&self) -> String {
        self.phantom.pipeline_name()
    }

    pub fn phantom(&self) -> Phantom {
        self.phantom
    }

    pub fn input(&self) -> &Dataset {
        &self.input
    }

    pub fn options(&self) -> &BTreeMap<QcOption, OptionValue> {
        &self.options
    }

    /// Run over every session of the study's project that passes the subject
    /// and visit filters (`None` keeps all). Without `work_dir` the study's
    /// default working directory is used; it outlives the run.
    pub fn run(
        &self,
        subject_ids: Option<&[String]>,
        visit_ids: Option<&[String]>,
        reprocess: ReprocessMode,
        work_dir: Option<&Path>,
    ) -> Result<PipelineReport> {
        let root = match work_dir {
            Some(dir) => dir,
            None => {
                let dir = self.study.default_work_dir();
                info!("No working directory given, using {:?}", dir);
                dir
            }
        };
        fs::create_dir_all(root)?;

        let archive = self.study.archive();
        let session = archive.connect()?;
        let sessions = session.sessions(self.study.project_id())?;
        debug!(
            "{} sessions in project {} on {}",
            sessions.len(),
            self.study.project_id(),
            archive.location()
        );

        let mut report = PipelineReport::default();
        for entry in sessions.iter().filter(|s| {
            selected(subject_ids, &s.subject_id) && selected(visit_ids, &s.visit_id)
        }) {
            let output_dir = self.output_dir(root, entry)?;
            let provenance_path = output_dir.join(PROVENANCE_FILE);
            let current = self.provenance();
            let existing: Option<Provenance> = read_json_sidecar(&provenance_path)?;

            if should_skip(existing.as_ref(), &current, reprocess) {
                info!(
                    "Skipping {} / {}: {} already ran (reprocess={})",
                    entry.subject_id,
                    entry.visit_id,
                    self.name(),
                    reprocess
                );
                report.skipped += 1;
                continue;
            }

            info!(
                "Running {} on {} / {}",
                self.name(),
                entry.subject_id,
                entry.visit_id
            );
            let input_dir = output_dir.join("inputs").join(self.phantom.input_key());
            let inputs = session.download_dataset(entry, &self.input, &input_dir)?;

            let request = QcRequest {
                study: self.study.name().to_string(),
                project_id: self.study.project_id().to_string(),
                pipeline: self.name(),
                phantom: self.phantom,
                subject_id: entry.subject_id.clone(),
                visit_id: entry.visit_id.clone(),
                session_label: entry.label.clone(),
                input_key: self.phantom.input_key(),
                scan: self.input.name.clone(),
                format: self.input.format,
                options: self.options.clone(),
                inputs,
                output_dir: output_dir.clone(),
                created: Utc::now(),
            };
            self.study.backend().compute(&request)?;
            write_json_sidecar(&provenance_path, &current)?;
            report.processed += 1;
        }

        info!(
            "{} finished: {} processed, {} skipped",
            self.name(),
            report.processed,
            report.skipped
        );
        Ok(report)
    }

    fn output_dir(&self, root: &Path, session: &SessionRef) -> Result<PathBuf> {
        Ok(root
            .join(self.study.name())
            .join(path_component("subject id", &session.subject_id)?)
            .join(path_component("visit id", &session.visit_id)?)
            .join(self.name()))
    }

    fn provenance(&self) -> Provenance {
        Provenance {
            pipeline: self.name(),
            phantom: self.phantom,
            scan: self.input.name.clone(),
            options: self.options.clone(),
            processed: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::PhantomInput;
    use crate::core::study::{PROJECT_ID, STUDY_NAME};
    use crate::error::Error;
    use crate::testing::{FakeArchive, RecordingBackend, fake_session};

    fn t1_study(archive: FakeArchive, backend: RecordingBackend) -> PhantomStudy {
        PhantomStudy::new(
            STUDY_NAME,
            PROJECT_ID,
            Box::new(archive),
            PhantomStudy::inputs_from(&[PhantomInput {
                phantom: Phantom::T1Coil32,
                scan: "t1_scan".into(),
            }]),
        )
        .with_backend(Box::new(backend))
    }

    fn two_instrument_archive() -> FakeArchive {
        FakeArchive::with_sessions(vec![
            fake_session("E1", "INSTRUMENT_A", "20170101"),
            fake_session("E2", "INSTRUMENT_A", "20170201"),
            fake_session("E3", "INSTRUMENT_B", "20170101"),
        ])
    }

    fn provenance(options: BTreeMap<QcOption, OptionValue>) -> Provenance {
        Provenance {
            pipeline: "t1_32ch_qc_metrics_pipeline".into(),
            phantom: Phantom::T1Coil32,
            scan: "t1_scan".into(),
            options,
            processed: Utc::now(),
        }
    }

    #[test]
    fn reprocess_policy() {
        let current = provenance(BTreeMap::new());
        let mut changed_options = BTreeMap::new();
        changed_options.insert(QcOption::Threshold, OptionValue::Int(2));
        let changed = provenance(changed_options);

        assert!(!should_skip(None, &current, ReprocessMode::Never));
        assert!(should_skip(Some(&current), &current, ReprocessMode::Never));
        assert!(should_skip(Some(&changed), &current, ReprocessMode::Never));
        assert!(should_skip(Some(&current), &current, ReprocessMode::IfChanged));
        assert!(!should_skip(Some(&changed), &current, ReprocessMode::IfChanged));
        assert!(!should_skip(Some(&current), &current, ReprocessMode::All));
    }

    #[test]
    fn runs_every_session_without_filters() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RecordingBackend::default();
        let study = t1_study(two_instrument_archive(), backend.clone());
        let pipeline = study.pipeline(Phantom::T1Coil32, &Default::default()).unwrap();

        let report = pipeline
            .run(None, None, ReprocessMode::Never, Some(dir.path()))
            .unwrap();

        assert_eq!(report, PipelineReport { processed: 3, skipped: 0 });
        let requests = backend.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].session_label, "INSTRUMENT_A_20170101");
        assert_eq!(requests[0].inputs.len(), 1);
        assert!(requests[0].inputs[0].exists());
        assert!(
            dir.path()
                .join("qc/INSTRUMENT_A/20170101/t1_32ch_qc_metrics_pipeline")
                .join(PROVENANCE_FILE)
                .exists()
        );
    }

    #[test]
    fn subject_and_visit_filters_combine() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RecordingBackend::default();
        let study = t1_study(two_instrument_archive(), backend.clone());
        let pipeline = study.pipeline(Phantom::T1Coil32, &Default::default()).unwrap();

        let subjects = vec!["INSTRUMENT_A".to_string()];
        let visits = vec!["20170101".to_string()];
        let report = pipeline
            .run(
                Some(subjects.as_slice()),
                Some(visits.as_slice()),
                ReprocessMode::Never,
                Some(dir.path()),
            )
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(backend.requests()[0].session_label, "INSTRUMENT_A_20170101");
    }

    #[test]
    fn empty_filter_selects_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RecordingBackend::default();
        let study = t1_study(two_instrument_archive(), backend.clone());
        let pipeline = study.pipeline(Phantom::T1Coil32, &Default::default()).unwrap();

        let nobody: Vec<String> = Vec::new();
        let report = pipeline
            .run(Some(nobody.as_slice()), None, ReprocessMode::All, Some(dir.path()))
            .unwrap();
        assert_eq!(report, PipelineReport::default());
        assert!(backend.requests().is_empty());
    }

    #[test]
    fn second_run_skips_unless_reprocess_all() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RecordingBackend::default();
        let study = t1_study(two_instrument_archive(), backend.clone());
        let pipeline = study.pipeline(Phantom::T1Coil32, &Default::default()).unwrap();

        pipeline
            .run(None, None, ReprocessMode::Never, Some(dir.path()))
            .unwrap();
        let again = pipeline
            .run(None, None, ReprocessMode::Never, Some(dir.path()))
            .unwrap();
        assert_eq!(again, PipelineReport { processed: 0, skipped: 3 });

        let forced = pipeline
            .run(None, None, ReprocessMode::All, Some(dir.path()))
            .unwrap();
        assert_eq!(forced, PipelineReport { processed: 3, skipped: 0 });
        assert_eq!(backend.requests().len(), 6);
    }

    #[test]
    fn changed_options_reprocess_when_if_changed() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RecordingBackend::default();
        let study = t1_study(two_instrument_archive(), backend.clone());
        study
            .pipeline(Phantom::T1Coil32, &Default::default())
            .unwrap()
            .run(None, None, ReprocessMode::Never, Some(dir.path()))
            .unwrap();

        let mut options = crate::core::params::PipelineOptions::new();
        options.insert("threshold".into(), OptionValue::Float(0.3));
        let tuned = study.pipeline(Phantom::T1Coil32, &options).unwrap();
        let report = tuned
            .run(None, None, ReprocessMode::IfChanged, Some(dir.path()))
            .unwrap();
        assert_eq!(report.processed, 3);

        let unchanged = tuned
            .run(None, None, ReprocessMode::IfChanged, Some(dir.path()))
            .unwrap();
        assert_eq!(unchanged.skipped, 3);
    }

    #[test]
    fn missing_scan_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let archive = two_instrument_archive().without_scan("E2");
        let study = t1_study(archive, RecordingBackend::default());
        let pipeline = study.pipeline(Phantom::T1Coil32, &Default::default()).unwrap();

        let err = pipeline
            .run(None, None, ReprocessMode::Never, Some(dir.path()))
            .unwrap_err();
        assert!(matches!(err, Error::ScanNotFound { .. }));
    }

    #[test]
    fn session_is_released_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let archive = two_instrument_archive();
        let stats = archive.stats();
        let study = t1_study(archive, RecordingBackend::default());
        let pipeline = study.pipeline(Phantom::T1Coil32, &Default::default()).unwrap();

        pipeline
            .run(None, None, ReprocessMode::Never, Some(dir.path()))
            .unwrap();
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.released(), 1);
    }

    #[test]
    fn default_work_dir_keeps_results_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let default_dir = dir.path().join("default");
        let archive = FakeArchive::with_sessions(vec![fake_session("E1", "INSTRUMENT_A", "20170101")]);
        let study = PhantomStudy::new(
            STUDY_NAME,
            PROJECT_ID,
            Box::new(archive),
            PhantomStudy::inputs_from(&[PhantomInput {
                phantom: Phantom::T1Coil32,
                scan: "t1_scan".into(),
            }]),
        )
        .with_default_work_dir(&default_dir);
        let pipeline = study.pipeline(Phantom::T1Coil32, &Default::default()).unwrap();

        let first = pipeline.run(None, None, ReprocessMode::Never, None).unwrap();
        assert_eq!(first, PipelineReport { processed: 1, skipped: 0 });
        let output = default_dir.join("qc/INSTRUMENT_A/20170101/t1_32ch_qc_metrics_pipeline");
        assert!(output.join(crate::core::metrics::REQUEST_FILE).exists());
        assert!(output.join(PROVENANCE_FILE).exists());

        let second = pipeline.run(None, None, ReprocessMode::Never, None).unwrap();
        assert_eq!(second, PipelineReport { processed: 0, skipped: 1 });
    }

    #[test]
    fn ids_that_leave_the_work_dir_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let escaping = outside.path().to_str().unwrap().to_string();
        let archive = FakeArchive::with_sessions(vec![
            fake_session("E1", "INSTRUMENT_A", &escaping),
            fake_session("E2", "..", "20170101"),
        ]);
        let backend = RecordingBackend::default();
        let study = t1_study(archive, backend.clone());
        let pipeline = study.pipeline(Phantom::T1Coil32, &Default::default()).unwrap();

        let err = pipeline
            .run(None, None, ReprocessMode::Never, Some(dir.path()))
            .unwrap_err();
        assert!(matches!(err, Error::UnsafeId { what: "visit id", .. }));
        assert!(backend.requests().is_empty());
        assert_eq!(fs::read_dir(outside.path()).unwrap().count(), 0);
    }

    #[test]
    fn path_components_must_be_single_names() {
        assert!(path_component("visit id", "20170503").is_ok());
        assert!(path_component("visit id", "INSTRUMENT_MRH_qc").is_ok());
        for bad in ["", ".", "..", "a/b", "/tmp", "../x"] {
            assert!(path_component("visit id", bad).is_err(), "{bad:?} accepted");
        }
    }
}
