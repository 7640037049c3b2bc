use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::DeflateDecoder;

use crate::error::TabError;
use crate::types::Result;

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const CENTRAL_SIGNATURE: u32 = 0x0201_4b50;
const LOCAL_SIGNATURE: u32 = 0x0403_4b50;

const EOCD_SIZE: usize = 22;
// EOCD plus the maximum trailing comment length.
const EOCD_SEARCH_LIMIT: u64 = EOCD_SIZE as u64 + 65_535;
const CENTRAL_ENTRY_SIZE: usize = 46;
const LOCAL_HEADER_SIZE: usize = 30;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

/// One central-directory record.
#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: String,
    method: u16,
    compressed_size: u64,
    uncompressed_size: u64,
    header_offset: u64,
}

/// Minimal read-only ZIP archive: enough of the format to pull workbook parts
/// out of an XLSX file. Stored and deflate entries are supported; ZIP64
/// archives are rejected.
pub struct ZipArchive {
    file: File,
    entries: Vec<ZipEntry>,
}

impl ZipArchive {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if file_len < EOCD_SIZE as u64 {
            return Err(TabError::InvalidFormat("file too small for a zip archive"));
        }

        let tail_len = file_len.min(EOCD_SEARCH_LIMIT);
        file.seek(SeekFrom::Start(file_len - tail_len))?;
        let mut tail = vec![0u8; tail_len as usize];
        file.read_exact(&mut tail)?;

        let eocd_at = find_eocd(&tail)
            .ok_or(TabError::InvalidFormat("zip end-of-central-directory not found"))?;
        let eocd = &tail[eocd_at..];
        let entry_count = read_u16(eocd, 10)? as usize;
        let directory_size = read_u32(eocd, 12)? as u64;
        let directory_offset = read_u32(eocd, 16)? as u64;
        if entry_count == u16::MAX as usize || directory_offset == u32::MAX as u64 {
            return Err(TabError::InvalidFormat("zip64 archives are not supported"));
        }
        if directory_offset + directory_size > file_len {
            return Err(TabError::InvalidFormat("zip central directory out of bounds"));
        }

        file.seek(SeekFrom::Start(directory_offset))?;
        let mut directory = vec![0u8; directory_size as usize];
        file.read_exact(&mut directory)?;

        let mut entries = Vec::with_capacity(entry_count);
        let mut at = 0usize;
        for _ in 0..entry_count {
            if read_u32(&directory, at)? != CENTRAL_SIGNATURE {
                return Err(TabError::InvalidFormat("bad zip central directory entry"));
            }
            let method = read_u16(&directory, at + 10)?;
            let compressed_size = read_u32(&directory, at + 20)? as u64;
            let uncompressed_size = read_u32(&directory, at + 24)? as u64;
            let name_len = read_u16(&directory, at + 28)? as usize;
            let extra_len = read_u16(&directory, at + 30)? as usize;
            let comment_len = read_u16(&directory, at + 32)? as usize;
            let header_offset = read_u32(&directory, at + 42)? as u64;
            let name_start = at + CENTRAL_ENTRY_SIZE;
            let name_bytes = directory
                .get(name_start..name_start + name_len)
                .ok_or(TabError::InvalidFormat("zip entry name out of bounds"))?;
            entries.push(ZipEntry {
                name: String::from_utf8_lossy(name_bytes).into_owned(),
                method,
                compressed_size,
                uncompressed_size,
                header_offset,
            });
            at = name_start + name_len + extra_len + comment_len;
        }

        Ok(Self { file, entries })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Extracts one entry fully into memory.
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.name == name)
            .cloned()
            .ok_or_else(|| TabError::Workbook(format!("zip entry not found: {name}")))?;

        self.file.seek(SeekFrom::Start(entry.header_offset))?;
        let mut header = [0u8; LOCAL_HEADER_SIZE];
        self.file.read_exact(&mut header)?;
        if read_u32(&header, 0)? != LOCAL_SIGNATURE {
            return Err(TabError::InvalidFormat("bad zip local header"));
        }
        let name_len = read_u16(&header, 26)? as u64;
        let extra_len = read_u16(&header, 28)? as u64;
        self.file.seek(SeekFrom::Current((name_len + extra_len) as i64))?;

        let mut compressed = vec![0u8; entry.compressed_size as usize];
        self.file.read_exact(&mut compressed)?;

        let data = match entry.method {
            METHOD_STORED => compressed,
            METHOD_DEFLATE => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(compressed.as_slice()).read_to_end(&mut out)?;
                out
            }
            _ => return Err(TabError::InvalidFormat("unsupported zip compression method")),
        };
        if data.len() as u64 != entry.uncompressed_size {
            return Err(TabError::InvalidFormat("zip entry size mismatch"));
        }
        Ok(data)
    }
}

/// Scans backwards for the EOCD signature (the archive may end with a
/// comment).
fn find_eocd(tail: &[u8]) -> Option<usize> {
    if tail.len() < EOCD_SIZE {
        return None;
    }
    (0..=tail.len() - EOCD_SIZE)
        .rev()
        .find(|&at| read_u32(tail, at).is_ok_and(|sig| sig == EOCD_SIGNATURE))
}

fn read_u16(buf: &[u8], at: usize) -> Result<u16> {
    buf.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(TabError::InvalidFormat("zip record truncated"))
}

fn read_u32(buf: &[u8], at: usize) -> Result<u32> {
    buf.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(TabError::InvalidFormat("zip record truncated"))
}
