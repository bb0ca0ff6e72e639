//! Shared types and enums used across phantom-qc.
//! Includes `Phantom`, `QcOption`, `ReprocessMode` and `DataFormat`.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Phantom scans that have a QC metrics pipeline.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Phantom {
    #[serde(rename = "t1_32ch")]
    T1Coil32,
    #[serde(rename = "t2_32ch")]
    T2Coil32,
    #[serde(rename = "dmri_32ch")]
    DmriCoil32,
}

impl Phantom {
    pub const ALL: [Phantom; 3] = [Phantom::T1Coil32, Phantom::T2Coil32, Phantom::DmriCoil32];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phantom::T1Coil32 => "t1_32ch",
            Phantom::T2Coil32 => "t2_32ch",
            Phantom::DmriCoil32 => "dmri_32ch",
        }
    }

    /// Study input key holding this phantom's saline scan.
    pub fn input_key(&self) -> String {
        format!("{}_saline", self.as_str())
    }

    /// Name of the pipeline factory on the study.
    pub fn pipeline_name(&self) -> String {
        format!("{}_qc_metrics_pipeline", self.as_str())
    }

    /// Scan type conventionally used for this phantom on the 32-channel coil.
    pub fn default_scan(&self) -> &'static str {
        match self {
            Phantom::T1Coil32 => "t1_mprage_trans_p2_iso_0.9_32CH",
            Phantom::T2Coil32 => "t2_spc_tra_iso_32CH",
            Phantom::DmriCoil32 => "ep2d_diff_mddw_12_p2_32CH",
        }
    }

    pub fn available() -> String {
        Phantom::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Phantom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phantom {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phantom::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownPhantom {
                name: s.to_string(),
                available: Phantom::available(),
            })
    }
}

/// Tunable parameters accepted by the QC metrics pipelines.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcOption {
    Threshold,
    SignalRadius,
    GhostRadii,
    BackgroundRadius,
    ZExtent,
}

impl QcOption {
    pub const ALL: [QcOption; 5] = [
        QcOption::Threshold,
        QcOption::SignalRadius,
        QcOption::GhostRadii,
        QcOption::BackgroundRadius,
        QcOption::ZExtent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QcOption::Threshold => "threshold",
            QcOption::SignalRadius => "signal_radius",
            QcOption::GhostRadii => "ghost_radii",
            QcOption::BackgroundRadius => "background_radius",
            QcOption::ZExtent => "z_extent",
        }
    }

    pub fn available() -> String {
        QcOption::ALL
            .iter()
            .map(|o| o.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn from_name(name: &str) -> Option<QcOption> {
        QcOption::ALL.into_iter().find(|o| o.as_str() == name)
    }
}

impl std::fmt::Display for QcOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether sessions with existing results are processed again.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum ReprocessMode {
    /// Keep any existing result (`false`).
    #[default]
    Never,
    /// Recompute when the recorded provenance differs (`true`).
    IfChanged,
    /// Recompute everything (`"all"`).
    All,
}

impl ReprocessMode {
    pub fn from_flag(reprocess: bool) -> Self {
        if reprocess {
            ReprocessMode::All
        } else {
            ReprocessMode::Never
        }
    }
}

impl std::fmt::Display for ReprocessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReprocessMode::Never => write!(f, "false"),
            ReprocessMode::IfChanged => write!(f, "true"),
            ReprocessMode::All => write!(f, "all"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum DataFormat {
    Dicom,
}

impl DataFormat {
    /// Resource label the archive files this format under.
    pub fn resource(&self) -> &'static str {
        match self {
            DataFormat::Dicom => "DICOM",
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormat::Dicom => write!(f, "dicom"),
        }
    }
}
