//! In-memory archive and recording backend shared by unit tests.
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::metrics::{MetricsBackend, QcRequest};
use crate::error::{Error, Result};
use crate::io::archive::{Archive, ArchiveSession, SessionRef};
use crate::io::dataset::Dataset;

pub fn fake_session(id: &str, subject: &str, visit: &str) -> SessionRef {
    SessionRef {
        id: id.to_string(),
        label: format!("{}_{}", subject, visit),
        subject_id: subject.to_string(),
        visit_id: visit.to_string(),
    }
}

#[derive(Clone, Default)]
pub struct SessionStats {
    opened: Rc<Cell<usize>>,
    released: Rc<Cell<usize>>,
}

impl SessionStats {
    pub fn opened(&self) -> usize {
        self.opened.get()
    }

    pub fn released(&self) -> usize {
        self.released.get()
    }
}

#[derive(Clone, Default)]
pub struct FakeArchive {
    projects: Vec<String>,
    sessions: Vec<SessionRef>,
    missing_scans: BTreeSet<String>,
    stats: SessionStats,
}

impl FakeArchive {
    pub fn with_sessions(sessions: Vec<SessionRef>) -> Self {
        Self {
            projects: vec!["INSTRUMENT".to_string()],
            sessions,
            ..Default::default()
        }
    }

    pub fn with_projects(mut self, projects: &[&str]) -> Self {
        self.projects = projects.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Make downloads from session `id` fail as if the scan were absent.
    pub fn without_scan(mut self, id: &str) -> Self {
        self.missing_scans.insert(id.to_string());
        self
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.clone()
    }
}

impl Archive for FakeArchive {
    fn location(&self) -> &str {
        "memory://fake"
    }

    fn connect(&self) -> Result<Box<dyn ArchiveSession + '_>> {
        self.stats.opened.set(self.stats.opened.get() + 1);
        Ok(Box::new(FakeSession { archive: self }))
    }
}

struct FakeSession<'a> {
    archive: &'a FakeArchive,
}

impl ArchiveSession for FakeSession<'_> {
    fn projects(&self) -> Result<Vec<String>> {
        Ok(self.archive.projects.clone())
    }

    fn sessions(&self, _project_id: &str) -> Result<Vec<SessionRef>> {
        Ok(self.archive.sessions.clone())
    }

    fn download_dataset(
        &self,
        session: &SessionRef,
        dataset: &Dataset,
        dest: &Path,
    ) -> Result<Vec<PathBuf>> {
        if self.archive.missing_scans.contains(&session.id) {
            return Err(Error::ScanNotFound {
                session: session.label.clone(),
                scan: dataset.name.clone(),
            });
        }
        fs::create_dir_all(dest)?;
        let path = dest.join(format!("{}.dcm", dataset.name));
        fs::write(&path, b"DICM")?;
        Ok(vec![path])
    }
}

impl Drop for FakeSession<'_> {
    fn drop(&mut self) {
        let released = &self.archive.stats.released;
        released.set(released.get() + 1);
    }
}

/// Backend that keeps every request it is handed.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    requests: Rc<RefCell<Vec<QcRequest>>>,
}

impl RecordingBackend {
    pub fn requests(&self) -> Vec<QcRequest> {
        self.requests.borrow().clone()
    }
}

impl MetricsBackend for RecordingBackend {
    fn compute(&self, request: &QcRequest) -> Result<()> {
        self.requests.borrow_mut().push(request.clone());
        Ok(())
    }
}
