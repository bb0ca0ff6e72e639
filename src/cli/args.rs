use clap::{ArgAction, Parser};
use std::path::PathBuf;

const SCAN_HELP: &str = "\
Conventional scans on the 32-channel head coil:
  t1_32ch    t1_mprage_trans_p2_iso_0.9_32CH
  t2_32ch    t2_spc_tra_iso_32CH
  dmri_32ch  ep2d_diff_mddw_12_p2_32CH";

/// Analyse QC phantom data acquired according to the NIF TDRS SOP.
#[derive(Parser, Debug)]
#[command(name = "phantom-qc", version, after_help = SCAN_HELP)]
pub struct CliArgs {
    /// The XNAT server to analyse the QC data for
    pub server: String,

    /// Phantom to analyse and the scan it was acquired in
    /// (available: t1_32ch, t2_32ch, dmri_32ch)
    #[arg(
        short,
        long,
        num_args = 2,
        value_names = ["PHANTOM", "SCAN_NAME"],
        action = ArgAction::Append
    )]
    pub phantom: Vec<String>,

    /// Instruments to process QC data for (defaults to all)
    #[arg(short, long, num_args = 1..)]
    pub instruments: Option<Vec<String>>,

    /// Dates (in YYYYMMDD format) of the QC acquisitions to process (defaults to all)
    #[arg(short, long, num_args = 1..)]
    pub dates: Option<Vec<String>>,

    /// Reprocess the metrics even where results already exist
    #[arg(long, default_value_t = false)]
    pub reprocess: bool,

    /// Change a pipeline option from its default (available: threshold,
    /// signal_radius, ghost_radii, background_radius, z_extent)
    #[arg(
        short,
        long,
        num_args = 3,
        value_names = ["PHANTOM", "NAME", "VALUE"],
        action = ArgAction::Append,
        allow_negative_numbers = true
    )]
    pub option: Vec<String>,

    /// Working directory for the pipeline (defaults to phantom-qc under the system temp dir, kept between runs)
    #[arg(short, long = "work_dir", visible_alias = "work-dir")]
    pub work_dir: Option<PathBuf>,

    /// Username and password required to log into XNAT
    #[arg(long, num_args = 2, value_names = ["USER", "PASSWORD"])]
    pub auth: Option<Vec<String>>,
}
