use serde::{Deserialize, Serialize};

use crate::types::DataFormat;

/// Reference to a scan in the archive by its type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub format: DataFormat,
}

impl Dataset {
    pub fn new(name: impl Into<String>, format: DataFormat) -> Self {
        Self {
            name: name.into(),
            format,
        }
    }

    pub fn dicom(name: impl Into<String>) -> Self {
        Self::new(name, DataFormat::Dicom)
    }
}
