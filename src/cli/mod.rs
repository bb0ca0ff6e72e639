//! Command Line Interface (CLI) layer for phantom-qc.
//!
//! This module defines argument parsing (`args`) and the orchestration
//! logic (`runner`): validate arguments into `QcRunParams`, list the
//! server's projects, then run one QC pipeline per requested phantom
//! through `phantom_qc::api`.
//!
//! If you are embedding phantom-qc into another application, prefer using
//! the high-level `phantom_qc::api` module instead of calling the CLI code.
pub mod args;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
