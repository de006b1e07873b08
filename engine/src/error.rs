//! Error types for the Outpost engine.

use crate::{DocId, MemberId, ProjectId};
use thiserror::Error;

/// Coarse classification of an [`Error`].
///
/// Remote callers usually only care which of these four buckets a failure
/// falls into; the variants of [`Error`] carry the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidState,
    InvalidArgument,
}

/// All possible errors from the Outpost engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("document not found: {0}")]
    DocumentNotFound(DocId),

    #[error("version not found: {0}")]
    VersionNotFound(String),

    #[error("member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    // Conflict errors
    #[error("member already exists: {0}")]
    MemberAlreadyExists(MemberId),

    // State errors
    #[error("cannot update a deleted lineage: {0}")]
    DeletedLineage(String),

    // Argument errors
    #[error("version arrays are not supported (got {0} versions)")]
    VersionArrayUnsupported(usize),

    #[error("invalid version identifier: {0}")]
    InvalidVersion(String),
}

impl Error {
    /// Which failure bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DocumentNotFound(_)
            | Error::VersionNotFound(_)
            | Error::MemberNotFound(_)
            | Error::ProjectNotFound(_) => ErrorKind::NotFound,
            Error::MemberAlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::DeletedLineage(_) => ErrorKind::InvalidState,
            Error::VersionArrayUnsupported(_) | Error::InvalidVersion(_) => {
                ErrorKind::InvalidArgument
            }
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
