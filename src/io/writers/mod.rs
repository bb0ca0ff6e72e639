//! Writers for the JSON sidecars a pipeline leaves in its output directory.
pub mod sidecar;

pub use sidecar::{read_json_sidecar, write_json_sidecar};
