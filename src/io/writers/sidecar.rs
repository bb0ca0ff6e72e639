use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Result;

/// Write `value` as pretty-printed JSON to `path`, creating parent directories.
pub fn write_json_sidecar<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json_string = serde_json::to_string_pretty(value)?;
    fs::write(path, json_string)?;
    debug!("Wrote sidecar: {:?}", path);
    Ok(())
}

/// Read a JSON sidecar. A missing file is `None`; so is one that no longer
/// parses, which is logged and treated as absent.
pub fn read_json_sidecar<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    match serde_json::from_str(&text) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("Ignoring unreadable sidecar {:?}: {}", path, e);
            Ok(None)
        }
    }
}
