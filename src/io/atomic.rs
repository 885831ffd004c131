use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Hidden sibling of `path` used while its contents are being written.
pub fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not a file path", path.display()))
    })?;
    Ok(path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy())))
}

/// Create `path`, write `bytes` and flush them to disk.
///
/// On failure the partially written file is removed.
pub async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let result = async {
        let mut file = fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;
    if result.is_err() {
        let _ = fs::remove_file(path).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_is_a_hidden_sibling() {
        let tmp = temp_path(Path::new("data/first.csv")).unwrap();
        assert_eq!(tmp, Path::new("data/.first.csv.tmp"));
        assert!(temp_path(Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("out.bin");
        assert!(write_synced(&path, b"data").await.is_err());
        assert!(!path.exists());
    }
}
