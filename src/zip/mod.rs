//! ZIP container reading and writing.
//!
//! Report archives are plain single-disk ZIP files. Writing happens fully in
//! memory ([`ZipWriter`]) and the sealed buffer is flushed to disk by the
//! archive builder. Reading goes through any [`ReadAt`](crate::io::ReadAt)
//! source:
//!
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. Read the Central Directory to get metadata for all entries
//! 3. For each entry, read its Local File Header and payload
//!
//! ## Supported Features
//!
//! - STORED and DEFLATE compression methods, CRC-32 verified on read
//! - UTF-8 entry names
//!
//! ## Limitations
//!
//! - No ZIP64, encryption or multi-disk archives

mod extractor;
mod parser;
mod structures;
mod writer;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
pub use writer::ZipWriter;

use thiserror::Error;

/// Faults in the ZIP container itself, independent of what the entries hold.
#[derive(Debug, Error)]
pub enum ZipError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("not a valid ZIP file")]
    NotAZip,

    #[error("invalid {0}")]
    InvalidRecord(&'static str),

    #[error("multi-disk archives are not supported")]
    MultiDisk,

    #[error("ZIP64 archives are not supported")]
    Zip64Unsupported,

    #[error("unsupported compression method {0}")]
    UnsupportedCompression(u16),

    #[error("CRC mismatch in {name}: expected {expected:08x}, got {actual:08x}")]
    CrcMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("duplicate entry name {0}")]
    DuplicateEntry(String),

    #[error("{0} exceeds the limits of a non-ZIP64 archive")]
    TooLarge(String),
}
