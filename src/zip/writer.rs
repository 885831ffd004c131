use std::collections::HashSet;
use std::io::Write;

use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;

use super::ZipError;
use super::structures::{CompressionMethod, EndOfCentralDirectory, ZipFileEntry};

/// Append-only ZIP writer backed by an in-memory buffer.
///
/// Entries are written in call order; the Central Directory and EOCD are
/// appended by [`finish`](Self::finish), which seals the archive.
#[derive(Debug)]
pub struct ZipWriter {
    buf: Vec<u8>,
    method: CompressionMethod,
    entries: Vec<ZipFileEntry>,
    names: HashSet<String>,
}

impl ZipWriter {
    pub fn new(method: CompressionMethod) -> Self {
        Self {
            buf: Vec::new(),
            method,
            entries: Vec::new(),
            names: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    /// Append one entry. Names must be unique within the archive.
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> Result<(), ZipError> {
        if self.names.contains(name) {
            return Err(ZipError::DuplicateEntry(name.to_string()));
        }
        if name.len() > u16::MAX as usize || self.entries.len() >= u16::MAX as usize - 1 {
            return Err(ZipError::TooLarge(name.to_string()));
        }

        let mut crc = Crc::new();
        crc.update(data);

        let compressed = match self.method {
            CompressionMethod::Stored => data.to_vec(),
            CompressionMethod::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()?
            }
            CompressionMethod::Unknown(method) => {
                return Err(ZipError::UnsupportedCompression(method));
            }
        };

        let lfh_offset = self.buf.len() as u64;
        if data.len() as u64 >= u32::MAX as u64
            || compressed.len() as u64 >= u32::MAX as u64
            || lfh_offset >= u32::MAX as u64
        {
            return Err(ZipError::TooLarge(name.to_string()));
        }

        let entry = ZipFileEntry {
            file_name: name.to_string(),
            compression_method: self.method,
            compressed_size: compressed.len() as u64,
            uncompressed_size: data.len() as u64,
            crc32: crc.sum(),
            lfh_offset,
            is_directory: false,
        };
        entry.write_local_header(&mut self.buf)?;
        self.buf.extend_from_slice(&compressed);

        self.names.insert(entry.file_name.clone());
        self.entries.push(entry);
        Ok(())
    }

    /// Write the Central Directory and EOCD and return the archive bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, ZipError> {
        let cd_offset = self.buf.len();
        for entry in &self.entries {
            entry.write_central_header(&mut self.buf)?;
        }
        let cd_size = self.buf.len() - cd_offset;
        if self.buf.len() as u64 >= u32::MAX as u64 {
            return Err(ZipError::TooLarge("archive".to_string()));
        }

        let eocd = EndOfCentralDirectory {
            disk_entries: self.entries.len() as u16,
            total_entries: self.entries.len() as u16,
            cd_size: cd_size as u32,
            cd_offset: cd_offset as u32,
            comment_len: 0,
        };
        eocd.write_to(&mut self.buf)?;
        Ok(self.buf)
    }
}
