//! I/O layer: the archive abstraction, the XNAT REST client, dataset
//! references, and `writers` for the JSON sidecars pipelines leave behind.
pub mod archive;
pub use archive::{Archive, ArchiveSession, SessionRef};

pub mod dataset;
pub use dataset::Dataset;

pub mod xnat;
pub use xnat::{XnatArchive, XnatConnection, XnatError};

pub mod writers;
