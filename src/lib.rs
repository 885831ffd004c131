//! # reportzip
//!
//! Generates synthetic report archives and extracts them concurrently into
//! typed row slices.
//!
//! Each report has a random UUID, a random level and a random number of
//! objects, and is rendered through a [`Template`] into a ZIP archive. The
//! extraction side parses every entry back with the parser registered for
//! that template and produces two slices joined by report id:
//!
//! - [`FirstRow`]: one `(id, level)` per report
//! - [`SecondRow`]: one `(id, object_name)` per object
//!
//! ## Features
//!
//! - In-memory archive building with atomic save (temp file + rename)
//! - STORED and DEFLATE entries, CRC-32 checked on read
//! - Chunked extraction on a bounded worker pool with all-or-nothing results
//! - CSV output for both slices
//!
//! ## Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use reportzip::{ArchiveOptions, BuiltinLoader, ExtractOptions, ReportArchive, extract_all};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let archive = ReportArchive::make(&BuiltinLoader, "report.xml", "xml", &ArchiveOptions::default())?;
//!     let saved = archive.save(&PathBuf::from("data/archive_0.zip")).await?;
//!
//!     let slices = extract_all(&[saved.path], "report.xml", ExtractOptions::for_archives(1)).await?;
//!     println!("{} reports, {} objects", slices.first.len(), slices.second.len());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod io;
pub mod markup;
pub mod sink;
pub mod template;
pub mod walker;
pub mod zip;

pub use archive::{ArchiveOptions, ReportArchive, SavedArchive};
pub use cli::Cli;
pub use coordinator::{ExtractOptions, discover_archives, extract_all};
pub use entity::{FileFormat, FirstRow, LeafObject, Report, ReportSettings, SecondRow, Slice, Slices, ValueRange};
pub use error::{Error, Result};
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use template::{BuiltinLoader, FileSystemLoader, Template, TemplateLoader, TextTemplate};
pub use walker::{ArchiveWalker, ReportParser, extract_one};
pub use zip::{CompressionMethod, ZipExtractor, ZipFileEntry, ZipWriter};
