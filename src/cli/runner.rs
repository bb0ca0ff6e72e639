use tracing::{debug, info};

use phantom_qc::api::{build_study, list_projects, run_pipelines};
use phantom_qc::core::params::{
    Credentials, OptionValue, PhantomInput, PhantomOptions, QcRunParams, instrument_subject_ids,
};
use phantom_qc::io::XnatArchive;
use phantom_qc::logging::LoggingConfig;
use phantom_qc::{Phantom, ReprocessMode};

use super::args::CliArgs;

/// Validate parsed arguments into run parameters. Unknown phantom types are
/// rejected here, before anything touches the network.
pub fn build_params(args: CliArgs) -> phantom_qc::Result<QcRunParams> {
    let phantoms = args
        .phantom
        .chunks_exact(2)
        .map(|pair| {
            Ok(PhantomInput {
                phantom: pair[0].parse::<Phantom>()?,
                scan: pair[1].clone(),
            })
        })
        .collect::<phantom_qc::Result<Vec<_>>>()?;

    let mut options = PhantomOptions::default();
    for triple in args.option.chunks_exact(3) {
        let phantom = triple[0].parse::<Phantom>()?;
        options.set(phantom, &triple[1], OptionValue::parse(&triple[2]));
    }

    let credentials = match args.auth.as_deref() {
        Some([user, password]) => Some(Credentials {
            user: user.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    Ok(QcRunParams {
        server: args.server,
        credentials,
        phantoms,
        subject_ids: instrument_subject_ids(args.instruments.as_deref()),
        visit_ids: args.dates,
        reprocess: ReprocessMode::from_flag(args.reprocess),
        options,
        work_dir: args.work_dir,
    })
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    LoggingConfig::default().init()?;
    debug!("phantom-qc version: {}", env!("CARGO_PKG_VERSION"));

    let params = build_params(args)?;
    match &params.credentials {
        Some(creds) => debug!("user: {}", creds.user),
        None => debug!("No credentials given, connecting anonymously"),
    }

    let archive = XnatArchive::new(&params.server, params.credentials.clone());
    let projects = list_projects(&archive)?;
    println!("Available projects: {}", projects.join(", "));

    let study = build_study(&params);
    let report = run_pipelines(&study, &params)?;

    info!(
        "QC run complete: {} pipeline(s), {} session(s) processed, {} skipped",
        report.pipelines, report.processed, report.skipped
    );
    Ok(())
}
