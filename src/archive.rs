//! Report archive builder.
//!
//! A [`ReportArchive`] is built entirely in memory and sealed by
//! [`ReportArchive::save`], which writes it next to its destination and
//! renames it into place so a half-written archive is never visible.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use tokio::fs;
use tracing::{debug, info};

use crate::entity::{FileFormat, Report, ReportSettings};
use crate::error::{Error, Result};
use crate::io::atomic::{temp_path, write_synced};
use crate::template::{Template, TemplateLoader};
use crate::zip::{CompressionMethod, ZipWriter};

/// How many reports go into an archive and how they are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    pub documents: usize,
    pub compression: CompressionMethod,
    pub settings: ReportSettings,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            documents: 100,
            compression: CompressionMethod::Deflate,
            settings: ReportSettings::default(),
        }
    }
}

/// An unsealed archive of rendered reports
#[derive(Debug)]
pub struct ReportArchive {
    writer: ZipWriter,
}

/// A sealed archive on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArchive {
    pub path: PathBuf,
    pub documents: usize,
    pub size: u64,
}

impl ReportArchive {
    /// Resolve `template_name` through `loader` and build an archive in the
    /// format named by `format`.
    pub fn make(
        loader: &dyn TemplateLoader,
        template_name: &str,
        format: &str,
        options: &ArchiveOptions,
    ) -> Result<Self> {
        let format: FileFormat = format.parse()?;
        let template = loader.load(template_name)?;
        Self::build(template, format, options)
    }

    pub fn build(template: Arc<dyn Template>, format: FileFormat, options: &ArchiveOptions) -> Result<Self> {
        Self::build_with_rng(template, format, options, &mut rand::thread_rng())
    }

    /// Render `options.documents` reports as `report_<i>.<format>` entries.
    pub fn build_with_rng<R: Rng + ?Sized>(
        template: Arc<dyn Template>,
        format: FileFormat,
        options: &ArchiveOptions,
        rng: &mut R,
    ) -> Result<Self> {
        let mut writer = ZipWriter::new(options.compression);

        for i in 0..options.documents {
            let report = Report::with_rng(template.clone(), &options.settings, rng)?;
            let body = report.render(format)?;
            let name = format!("report_{i}.{format}");
            writer.add_entry(&name, &body).map_err(Error::ArchiveWrite)?;
        }

        debug!(documents = writer.len(), %format, template = template.name(), "archive built");
        Ok(Self { writer })
    }

    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.writer.entries().iter().map(|entry| entry.file_name.as_str())
    }

    /// Seal the archive and write it to `path`, releasing the in-memory buffer.
    ///
    /// The bytes go to a temporary file in the same directory first, which is
    /// then renamed over `path`; on failure the temporary file is removed.
    pub async fn save(self, path: &Path) -> Result<SavedArchive> {
        let tmp_path = temp_path(path).map_err(|err| Error::InvalidArgument(err.to_string()))?;

        let documents = self.writer.len();
        let bytes = self.writer.finish().map_err(Error::ArchiveWrite)?;

        write_synced(&tmp_path, &bytes).await?;
        if let Err(err) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }

        info!(path = %path.display(), documents, bytes = bytes.len(), "archive saved");
        Ok(SavedArchive {
            path: path.to_path_buf(),
            documents,
            size: bytes.len() as u64,
        })
    }
}
