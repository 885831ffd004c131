//! Error types shared by the builder, the extractor and the coordinator.

use std::path::PathBuf;

use thiserror::Error;

use crate::template::TemplateError;
use crate::walker::DocumentError;
use crate::zip::ZipError;

/// Result alias used across the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The requested render/save format has no implementation.
    #[error("format '{0}' is not available")]
    UnsupportedFormat(String),

    #[error("template '{name}' not found in {dir}")]
    TemplateNotFound { name: String, dir: PathBuf },

    /// The template handle cannot render a report's bindings.
    #[error("template does not satisfy the report render contract: {0}")]
    InvalidTemplateCapability(#[source] TemplateError),

    #[error("archive {path} is unreadable: {source}")]
    ArchiveUnreadable {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("failed to write archive: {0}")]
    ArchiveWrite(#[source] ZipError),

    #[error("malformed document {entry} in {archive}: {source}")]
    MalformedDocument {
        archive: PathBuf,
        entry: String,
        #[source]
        source: DocumentError,
    },

    /// The template name is known but nothing parses its documents.
    #[error("no parser is implemented for template '{0}'")]
    UnimplementedTemplateParser(String),

    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: u32, max: u32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("extraction worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
