//! XNAT REST client: login/logout, project and session listing, and scan
//! download. `XnatArchive` implements [`Archive`]; every `connect` logs in
//! (unless anonymous) and the returned `XnatConnection` logs out on drop.
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::params::Credentials;
use crate::error::{Error, Result};
use crate::io::archive::{Archive, ArchiveSession, SessionRef};
use crate::io::dataset::Dataset;

/// Errors raised while talking to an XNAT server
#[derive(Debug, Error)]
pub enum XnatError {
    #[error("request to {url} failed with HTTP {status} {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("reading response from {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl XnatError {
    fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => XnatError::Status {
                url: url.to_string(),
                status,
                reason: response.status_text().to_string(),
            },
            ureq::Error::Transport(transport) => XnatError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        }
    }
}

// XNAT wraps every listing in {"ResultSet": {"Result": [...]}}
#[derive(Debug, Deserialize)]
struct ResultSet<T> {
    #[serde(rename = "ResultSet")]
    result_set: Rows<T>,
}

#[derive(Debug, Deserialize)]
struct Rows<T> {
    #[serde(rename = "Result", default = "Vec::new")]
    result: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ProjectRow {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct ExperimentRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    subject_label: String,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
struct ScanRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "type", default)]
    scan_type: String,
    #[serde(default)]
    series_description: String,
}

#[derive(Debug, Deserialize)]
struct FileRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "URI")]
    uri: String,
}

/// Normalize a server address: default to https and drop trailing slashes.
pub fn normalize_server(server: &str) -> String {
    let trimmed = server.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Visit id of a session: its label minus the `<subject>_` prefix, else its date as YYYYMMDD.
pub fn visit_id(label: &str, subject_id: &str, date: &str) -> String {
    if let Some(rest) = label
        .strip_prefix(subject_id)
        .and_then(|r| r.strip_prefix('_'))
    {
        if !rest.is_empty() {
            return rest.to_string();
        }
    }
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d.format("%Y%m%d").to_string(),
        Err(_) => label.to_string(),
    }
}

fn basic_auth(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.user, credentials.password);
    format!("Basic {}", BASE64.encode(raw.as_bytes()))
}

/// Address and login for an XNAT server; connects on demand
#[derive(Debug, Clone)]
pub struct XnatArchive {
    server: String,
    credentials: Option<Credentials>,
}

impl XnatArchive {
    pub fn new(server: &str, credentials: Option<Credentials>) -> Self {
        Self {
            server: normalize_server(server),
            credentials,
        }
    }
}

impl Archive for XnatArchive {
    fn location(&self) -> &str {
        &self.server
    }

    fn connect(&self) -> Result<Box<dyn ArchiveSession + '_>> {
        Ok(Box::new(connect(&self.server, self.credentials.as_ref())?))
    }
}

/// Live XNAT session. Logs out when dropped.
pub struct XnatConnection {
    agent: ureq::Agent,
    server: String,
    jsession: Option<String>,
}

/// Connect to `server`, logging in when credentials are given.
pub fn connect(server: &str, credentials: Option<&Credentials>) -> Result<XnatConnection> {
    let server = normalize_server(server);
    let agent = ureq::Agent::new();

    let jsession = match credentials {
        Some(creds) => {
            let url = format!("{}/data/JSESSION", server);
            debug!("Logging in to {} as {}", server, creds.user);
            let response = agent
                .post(&url)
                .set("Authorization", &basic_auth(creds))
                .call()
                .map_err(|e| XnatError::from_ureq(&url, e))?;
            let token = response
                .into_string()
                .map_err(|source| XnatError::Body {
                    url: url.clone(),
                    source,
                })?;
            Some(token.trim().to_string())
        }
        None => {
            debug!("Connecting to {} anonymously", server);
            None
        }
    };

    Ok(XnatConnection {
        agent,
        server,
        jsession,
    })
}

impl XnatConnection {
    pub fn server(&self) -> &str {
        &self.server
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let request = self.agent.request(method, url);
        match &self.jsession {
            Some(token) => request.set("Cookie", &format!("JSESSIONID={}", token)),
            None => request,
        }
    }

    fn get_rows<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let url = format!("{}{}", self.server, path);
        let response = self
            .request("GET", &url)
            .call()
            .map_err(|e| XnatError::from_ureq(&url, e))?;
        let body = response.into_string().map_err(|source| XnatError::Body {
            url: url.clone(),
            source,
        })?;
        let parsed: ResultSet<T> =
            serde_json::from_str(&body).map_err(|source| XnatError::Decode {
                url: url.clone(),
                source,
            })?;
        Ok(parsed.result_set.result)
    }

    fn download(&self, uri: &str, dest: &Path) -> Result<()> {
        let url = format!("{}{}", self.server, uri);
        let response = self
            .request("GET", &url)
            .call()
            .map_err(|e| XnatError::from_ureq(&url, e))?;
        let mut reader = response.into_reader();
        let mut file = File::create(dest)?;
        std::io::copy(&mut reader, &mut file).map_err(|source| XnatError::Body { url, source })?;
        Ok(())
    }

    fn find_scan(&self, session: &SessionRef, dataset: &Dataset) -> Result<ScanRow> {
        let scans: Vec<ScanRow> =
            self.get_rows(&format!("/data/experiments/{}/scans?format=json", session.id))?;
        let mut matching = scans
            .into_iter()
            .filter(|s| s.scan_type == dataset.name || s.series_description == dataset.name);
        let scan = matching.next().ok_or_else(|| Error::ScanNotFound {
            session: session.label.clone(),
            scan: dataset.name.clone(),
        })?;
        if matching.next().is_some() {
            warn!(
                "Several '{}' scans in {}, using scan {}",
                dataset.name, session.label, scan.id
            );
        }
        Ok(scan)
    }
}

impl ArchiveSession for XnatConnection {
    fn projects(&self) -> Result<Vec<String>> {
        let rows: Vec<ProjectRow> = self.get_rows("/data/projects?format=json")?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    fn sessions(&self, project_id: &str) -> Result<Vec<SessionRef>> {
        let rows: Vec<ExperimentRow> = self.get_rows(&format!(
            "/data/projects/{}/experiments?format=json&columns=ID,label,subject_label,date",
            project_id
        ))?;
        Ok(rows
            .into_iter()
            .map(|r| SessionRef {
                visit_id: visit_id(&r.label, &r.subject_label, &r.date),
                id: r.id,
                label: r.label,
                subject_id: r.subject_label,
            })
            .collect())
    }

    fn download_dataset(
        &self,
        session: &SessionRef,
        dataset: &Dataset,
        dest: &Path,
    ) -> Result<Vec<PathBuf>> {
        let scan = self.find_scan(session, dataset)?;
        let files: Vec<FileRow> = self.get_rows(&format!(
            "/data/experiments/{}/scans/{}/resources/{}/files?format=json",
            session.id,
            scan.id,
            dataset.format.resource()
        ))?;

        fs::create_dir_all(dest)?;
        let mut written = Vec::with_capacity(files.len());
        for file in files {
            // Only keep the final path component of archive-supplied names
            let Some(name) = Path::new(&file.name).file_name() else {
                warn!("Skipping file with unusable name: {:?}", file.name);
                continue;
            };
            let path = dest.join(name);
            self.download(&file.uri, &path)?;
            written.push(path);
        }
        info!(
            "Downloaded {} {} files for scan {} of {}",
            written.len(),
            dataset.format,
            scan.id,
            session.label
        );
        Ok(written)
    }
}

impl Drop for XnatConnection {
    fn drop(&mut self) {
        if self.jsession.is_none() {
            return;
        }
        let url = format!("{}/data/JSESSION", self.server);
        match self.request("DELETE", &url).call() {
            Ok(_) => debug!("Logged out of {}", self.server),
            Err(e) => warn!("Logout from {} failed: {}", self.server, e),
        }
    }
}
