#![doc = r#"
phantom-qc — run phantom quality-control pipelines against an XNAT archive.

This crate drives the QC metric pipelines for MRI calibration phantoms (T1, T2 and
diffusion scans on the 32-channel head coil). For each requested phantom it finds the
matching sessions in the archive's `INSTRUMENT` project, stages the phantom's DICOM
scan in a working directory and hands an analysis request to a metrics backend. It
powers the `phantom-qc` CLI and can be embedded in your own Rust applications.

Add dependency
--------------
```toml
[dependencies]
phantom-qc = "0.1"
```

Quick start: run pipelines against a server
-------------------------------------------
```rust,no_run
use std::path::PathBuf;
use phantom_qc::{
    run_qc, Credentials, OptionValue, Phantom, PhantomInput, PhantomOptions, QcRunParams,
    ReprocessMode,
};

fn main() -> phantom_qc::Result<()> {
    let mut options = PhantomOptions::default();
    options.set(Phantom::T1Coil32, "threshold", OptionValue::parse("0.25"));

    let params = QcRunParams {
        server: "https://xnat.example.org".to_string(),
        credentials: Some(Credentials {
            user: "qc".to_string(),
            password: "secret".to_string(),
        }),
        phantoms: vec![PhantomInput {
            phantom: Phantom::T1Coil32,
            scan: Phantom::T1Coil32.default_scan().to_string(),
        }],
        subject_ids: Some(vec!["INSTRUMENT_MRH".to_string()]),
        visit_ids: None,
        reprocess: ReprocessMode::Never,
        options,
        work_dir: Some(PathBuf::from("/scratch/qc")),
    };

    let report = run_qc(&params)?;
    println!("processed={} skipped={}", report.processed, report.skipped);
    Ok(())
}
```

Custom archives and metrics engines
-----------------------------------
`PhantomStudy` takes any [`Archive`] implementation and any [`MetricsBackend`]; the
default backend writes a `qc_request.json` per session for an external engine.

```rust,no_run
use phantom_qc::{MetricsBackend, QcRequest, PhantomStudy, XnatArchive};

struct PrintBackend;

impl MetricsBackend for PrintBackend {
    fn compute(&self, request: &QcRequest) -> phantom_qc::Result<()> {
        println!("{} {} {:?}", request.subject_id, request.visit_id, request.inputs);
        Ok(())
    }
}

fn main() -> phantom_qc::Result<()> {
    let study = PhantomStudy::new(
        "qc",
        "INSTRUMENT",
        Box::new(XnatArchive::new("xnat.example.org", None)),
        Default::default(),
    )
    .with_backend(Box::new(PrintBackend));
    let _ = study;
    Ok(())
}
```

Error handling
--------------
All public functions return `phantom_qc::Result<T>`; match on `phantom_qc::Error` to
handle specific cases, e.g. XNAT failures or unknown pipeline options.

Useful modules
--------------
- [`api`] — high-level entry points.
- [`core`] — run parameters, the phantom study, pipelines and the metrics hand-off.
- [`io`] — the archive traits, the XNAT client and JSON sidecar writers.
- [`types`] — `Phantom`, `QcOption`, `ReprocessMode`, `DataFormat`.
- [`logging`] — the CLI's logging configuration.
- [`error`] — crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod logging;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Curated public API surface
// Types
pub use crate::core::metrics::{ManifestBackend, MetricsBackend, QcRequest};
pub use crate::core::params::{
    Credentials, OptionValue, PhantomInput, PhantomOptions, PipelineOptions, QcRunParams,
};
pub use crate::core::pipeline::{PipelineReport, QcPipeline};
pub use crate::core::study::PhantomStudy;
pub use error::{Error, Result};
pub use types::{DataFormat, Phantom, QcOption, ReprocessMode};

// Archive access
pub use io::archive::{Archive, ArchiveSession, SessionRef};
pub use io::dataset::Dataset;
pub use io::xnat::{XnatArchive, XnatConnection, XnatError};

// High-level API re-exports
pub use api::{QcReport, build_study, list_projects, run_pipelines, run_qc};
