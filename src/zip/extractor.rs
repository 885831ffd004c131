use std::io::Read;
use std::sync::Arc;

use flate2::Crc;
use flate2::read::DeflateDecoder;

use crate::io::ReadAt;

use super::ZipError;
use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// ZIP entry extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>, ZipError> {
        self.parser.list_files().await
    }

    /// Extract an entry's decompressed payload, verifying its CRC-32
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>, ZipError> {
        let data_offset = self.parser.get_data_offset(entry).await?;
        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.reader().read_exact_at(data_offset, &mut raw).await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
                out
            }
            CompressionMethod::Unknown(method) => {
                return Err(ZipError::UnsupportedCompression(method));
            }
        };

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            return Err(ZipError::CrcMismatch {
                name: entry.file_name.clone(),
                expected: entry.crc32,
                actual: crc.sum(),
            });
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use crate::zip::ZipWriter;

    async fn roundtrip(method: CompressionMethod) {
        let payload = "<report>".repeat(64);
        let mut writer = ZipWriter::new(method);
        writer.add_entry("report_0.xml", payload.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap();

        let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(bytes)));
        let entries = extractor.list_files().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].compression_method, method);
        let data = extractor.extract_to_memory(&entries[0]).await.unwrap();
        assert_eq!(data, payload.as_bytes());
    }

    #[tokio::test]
    async fn extracts_stored_entries() {
        roundtrip(CompressionMethod::Stored).await;
    }

    #[tokio::test]
    async fn extracts_deflated_entries() {
        roundtrip(CompressionMethod::Deflate).await;
    }

    #[tokio::test]
    async fn detects_corrupted_payload() {
        let mut writer = ZipWriter::new(CompressionMethod::Stored);
        writer.add_entry("a.xml", b"payload").unwrap();
        let mut bytes = writer.finish().unwrap();
        // Payload starts right after the 30-byte LFH and the 5-byte name.
        bytes[35] ^= 0xFF;

        let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(bytes)));
        let entries = extractor.list_files().await.unwrap();
        let err = extractor.extract_to_memory(&entries[0]).await.unwrap_err();
        assert!(matches!(err, ZipError::CrcMismatch { .. }));
    }
}
