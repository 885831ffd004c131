//! Batch extraction over a bounded worker pool.
//!
//! Archive paths are split into consecutive chunks and each chunk is walked
//! by one task on the blocking thread pool. At most `workers` chunks run at
//! a time. Chunk results are
//! merged only after every task has returned, in completion order, so the
//! row order across chunks is not fixed. The first failing chunk fails the
//! whole batch and nothing is returned.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Semaphore;
use tokio::runtime::Handle;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, warn};

use crate::entity::Slices;
use crate::error::{Error, Result};
use crate::walker::{ArchiveWalker, ReportParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Archives per chunk
    pub chunk_size: usize,
    /// Chunks extracted in parallel
    pub workers: usize,
}

impl ExtractOptions {
    /// Options for `archives` paths with one chunk per worker, as evenly as
    /// the integer split allows.
    pub fn for_archives(archives: usize) -> Self {
        let workers = available_workers();
        Self {
            chunk_size: default_chunk_size(archives, workers),
            workers,
        }
    }
}

/// Hardware parallelism, or 1 when it cannot be determined.
pub fn available_workers() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// `archives / workers`, never less than one.
pub fn default_chunk_size(archives: usize, workers: usize) -> usize {
    (archives / workers.max(1)).max(1)
}

/// Split `paths` into consecutive chunks of `chunk_size`; the last may be shorter.
pub fn partition(paths: &[PathBuf], chunk_size: usize) -> Result<Vec<Vec<PathBuf>>> {
    if chunk_size == 0 {
        return Err(Error::InvalidArgument("chunk size must be at least 1".to_string()));
    }
    Ok(paths.chunks(chunk_size).map(<[PathBuf]>::to_vec).collect())
}

/// Extract every archive in `paths` and concatenate the rows of all chunks.
pub async fn extract_all(paths: &[PathBuf], template_name: &str, options: ExtractOptions) -> Result<Slices> {
    let parser = ReportParser::for_template(template_name)?;
    if options.workers == 0 {
        return Err(Error::InvalidArgument("worker count must be at least 1".to_string()));
    }
    let chunks = partition(paths, options.chunk_size)?;

    info!(
        archives = paths.len(),
        chunks = chunks.len(),
        workers = options.workers,
        template = template_name,
        "extraction started"
    );

    let permits = Arc::new(Semaphore::new(options.workers));
    let mut tasks = JoinSet::new();
    for (index, chunk) in chunks.into_iter().enumerate() {
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|err| Error::Worker(err.to_string()))?;

            // Reads and parsing block; walk the chunk on the blocking pool.
            let runtime = Handle::current();
            let archives = chunk.len();
            let slices = task::spawn_blocking(move || {
                let _permit = permit;
                let mut walker = ArchiveWalker::new(chunk, parser);
                runtime.block_on(walker.walk())?;
                Ok::<_, Error>(walker.into_slices())
            })
            .await
            .map_err(|err| Error::Worker(err.to_string()))??;

            debug!(chunk = index, archives, "chunk extracted");
            Ok::<_, Error>(slices)
        });
    }

    // Dropping `tasks` on an early return aborts chunks still waiting for a
    // permit; chunks already walking finish and their rows are discarded.
    let mut merged = Slices::new();
    while let Some(joined) = tasks.join_next().await {
        let chunk_result = joined.map_err(|err| Error::Worker(err.to_string())).and_then(|r| r);
        match chunk_result {
            Ok(slices) => merged.extend(slices),
            Err(err) => {
                warn!(error = %err, "extraction failed");
                return Err(err);
            }
        }
    }

    info!(
        reports = merged.first.len(),
        objects = merged.second.len(),
        "extraction finished"
    );
    Ok(merged)
}

/// `*.zip` files directly inside `dir`, sorted by path.
pub async fn discover_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut archives = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_zip = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip && entry.file_type().await?.is_file() {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveOptions, ReportArchive};
    use crate::template::{BuiltinLoader, REPORT_XML_NAME};

    fn paths(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("archive_{i}.zip"))).collect()
    }

    #[test]
    fn partition_keeps_order_and_short_tail() {
        let chunks = partition(&paths(5), 2).unwrap();
        let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, [2, 2, 1]);
        assert_eq!(chunks.concat(), paths(5));
        assert!(partition(&[], 3).unwrap().is_empty());
        assert!(matches!(partition(&paths(1), 0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn chunk_size_never_drops_to_zero() {
        assert_eq!(default_chunk_size(50, 8), 6);
        assert_eq!(default_chunk_size(3, 8), 1);
        assert_eq!(default_chunk_size(0, 0), 1);
        assert!(ExtractOptions::for_archives(10).workers >= 1);
    }

    #[tokio::test]
    async fn empty_batch_yields_no_rows() {
        let options = ExtractOptions {
            chunk_size: 4,
            workers: 2,
        };
        let slices = extract_all(&[], "report.xml", options).await.unwrap();
        assert_eq!(slices, Slices::new());
    }

    #[tokio::test]
    async fn unknown_template_fails_before_reading() {
        let options = ExtractOptions {
            chunk_size: 1,
            workers: 1,
        };
        let err = extract_all(&paths(2), "report.json", options).await.unwrap_err();
        assert!(matches!(err, Error::UnimplementedTemplateParser(_)));
    }

    #[tokio::test]
    async fn zero_workers_is_rejected() {
        let options = ExtractOptions {
            chunk_size: 1,
            workers: 0,
        };
        let err = extract_all(&paths(1), "report.xml", options).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn chunks_run_off_a_single_threaded_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let options = ArchiveOptions {
            documents: 2,
            ..ArchiveOptions::default()
        };
        let mut archives = Vec::new();
        for i in 0..4 {
            let path = dir.path().join(format!("archive_{i}.zip"));
            let archive = ReportArchive::make(&BuiltinLoader, REPORT_XML_NAME, "xml", &options).unwrap();
            archives.push(archive.save(&path).await.unwrap().path);
        }

        let options = ExtractOptions {
            chunk_size: 1,
            workers: 4,
        };
        let slices = extract_all(&archives, REPORT_XML_NAME, options).await.unwrap();
        assert_eq!(slices.first.len(), 8);
        for row in slices.first.rows() {
            assert!(slices.second.rows().iter().any(|r| r.id == row.id));
        }
    }

    #[tokio::test]
    async fn discovers_only_zip_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.zip", "a.zip", "first.csv", "c.ZIP"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.zip")).unwrap();

        let found = discover_archives(dir.path()).await.unwrap();
        let names: Vec<_> = found.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, ["a.zip", "b.zip", "c.ZIP"]);
    }
}
