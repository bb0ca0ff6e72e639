use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{Phantom, ReprocessMode};

/// Prefix the archive gives instrument subjects.
pub const INSTRUMENT_PREFIX: &str = "INSTRUMENT_";

/// A pipeline option value, typed by the first parse that succeeds:
/// integer, then finite float, then the raw text. `nan` and `inf` stay text
/// since JSON has no spelling for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            OptionValue::Int(v)
        } else if let Some(v) = trimmed.parse::<f64>().ok().filter(|v| v.is_finite()) {
            OptionValue::Float(v)
        } else {
            OptionValue::Text(raw.to_string())
        }
    }
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Text(v) => write!(f, "'{}'", v),
        }
    }
}

/// Option overrides for one pipeline, keyed by option name.
pub type PipelineOptions = BTreeMap<String, OptionValue>;

/// Option overrides for every phantom in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhantomOptions {
    by_phantom: BTreeMap<Phantom, PipelineOptions>,
}

impl PhantomOptions {
    /// Record an override; a later value for the same phantom and name replaces the earlier one.
    pub fn set(&mut self, phantom: Phantom, name: &str, value: OptionValue) {
        self.by_phantom
            .entry(phantom)
            .or_default()
            .insert(name.to_string(), value);
    }

    /// Overrides for `phantom`, empty when none were given.
    pub fn for_phantom(&self, phantom: Phantom) -> PipelineOptions {
        self.by_phantom.get(&phantom).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_phantom.is_empty()
    }
}

/// One `--phantom` argument: which phantom, and the scan type holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhantomInput {
    pub phantom: Phantom,
    pub scan: String,
}

/// Login for the archive.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated configuration for one QC run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcRunParams {
    pub server: String,
    /// Never serialized; None means anonymous access
    #[serde(skip)]
    pub credentials: Option<Credentials>,
    pub phantoms: Vec<PhantomInput>,
    /// Subject (instrument) ids to process; None means all
    pub subject_ids: Option<Vec<String>>,
    /// Visit ids (YYYYMMDD dates) to process; None means all
    pub visit_ids: Option<Vec<String>>,
    pub reprocess: ReprocessMode,
    pub options: PhantomOptions,
    pub work_dir: Option<PathBuf>,
}

/// Turn instrument names into archive subject ids. `None` stays "no restriction".
pub fn instrument_subject_ids(instruments: Option<&[String]>) -> Option<Vec<String>> {
    instruments.map(|names| {
        names
            .iter()
            .map(|name| format!("{}{}", INSTRUMENT_PREFIX, name))
            .collect()
    })
}
