//! Archive abstraction consumed by studies and pipelines.
//!
//! `Archive` is a cheap, cloneable description of where data lives;
//! `connect` opens an `ArchiveSession` which holds any server-side state
//! (login tokens) and releases it when dropped.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::dataset::Dataset;

/// One imaging session (subject + visit) in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRef {
    /// Archive-internal experiment id
    pub id: String,
    pub label: String,
    pub subject_id: String,
    pub visit_id: String,
}

pub trait Archive {
    /// Address shown in logs.
    fn location(&self) -> &str;

    /// Open a session; it is released when the returned value is dropped.
    fn connect(&self) -> Result<Box<dyn ArchiveSession + '_>>;
}

pub trait ArchiveSession {
    /// Ids of the projects visible to this session.
    fn projects(&self) -> Result<Vec<String>>;

    /// Imaging sessions in `project_id`, in archive order.
    fn sessions(&self, project_id: &str) -> Result<Vec<SessionRef>>;

    /// Download `dataset` from `session` into `dest`, returning the written files.
    fn download_dataset(
        &self,
        session: &SessionRef,
        dataset: &Dataset,
        dest: &Path,
    ) -> Result<Vec<PathBuf>>;
}
