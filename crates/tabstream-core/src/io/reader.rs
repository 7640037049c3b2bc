use std::fs::File;
use std::io::Read;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::types::Result;

/// Default chunk size for buffered reads.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 256 * 1024;
const MIN_READ_BUFFER_SIZE: usize = 4 * 1024;
const MAX_READ_BUFFER_SIZE: usize = 64 * 1024 * 1024;

pub(crate) fn clamp_buffer_size(requested: usize) -> usize {
    requested.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE)
}

/// Reader configuration shared by every stream kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Map the whole file once instead of issuing buffered reads.
    pub use_mmap: bool,
    /// Buffered chunk size; clamped to [4 KiB, 64 MiB].
    pub buffer_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            use_mmap: false,
            buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

enum Mode {
    Buffered { file: File, buffer: Vec<u8> },
    // `None` when the file is empty; memmap2 cannot map zero bytes.
    Mapped { map: Option<Mmap>, returned: bool },
}

/// Sequential byte-span source over one file.
///
/// Buffered mode returns a span over an internal buffer, valid only until the
/// next `get_next` call. Mmap mode returns the whole file on the first call
/// and an empty span afterwards. An empty span from either mode means the
/// file is drained.
pub struct FileReader {
    mode: Mode,
    bytes_read: u64,
}

impl FileReader {
    /// Opens `path`. Open and map failures are reported here; `get_next`
    /// only fails on read errors in buffered mode.
    pub fn open(path: &Path, options: ReaderOptions) -> Result<Self> {
        let file = File::open(path)?;
        if options.use_mmap {
            let len = file.metadata()?.len();
            let map = if len == 0 {
                None
            } else {
                Some(unsafe { MmapOptions::new().map(&file)? })
            };
            debug!(path = %path.display(), len, mode = "mmap", "reader opened");
            return Ok(Self {
                mode: Mode::Mapped {
                    map,
                    returned: false,
                },
                bytes_read: len,
            });
        }

        let buffer_size = clamp_buffer_size(options.buffer_size);
        debug!(path = %path.display(), buffer_size, mode = "buffered", "reader opened");
        Ok(Self {
            mode: Mode::Buffered {
                file,
                buffer: vec![0u8; buffer_size],
            },
            bytes_read: 0,
        })
    }

    /// Yields the next byte span, or an empty span once the file is drained.
    pub fn get_next(&mut self) -> Result<&[u8]> {
        match &mut self.mode {
            Mode::Buffered { file, buffer } => {
                let n = file.read(buffer)?;
                self.bytes_read += n as u64;
                Ok(&buffer[..n])
            }
            Mode::Mapped { map, returned } => {
                if *returned {
                    return Ok(&[]);
                }
                *returned = true;
                match map {
                    Some(map) => Ok(&map[..]),
                    None => Ok(&[]),
                }
            }
        }
    }

    /// Total bytes handed out so far (the whole file length in mmap mode).
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}
