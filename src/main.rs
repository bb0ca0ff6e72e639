//! phantom-qc CLI entrypoint.
//!
//! Provides a thin wrapper over the `cli` module: parse args, run the
//! requested QC pipelines, and exit with appropriate status.
//! For programmatic use, prefer the library API (`phantom_qc::api`).

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
