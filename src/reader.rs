//! Input acquisition strategies
//!
//! An [`InputReader`] hands the bytes of one target to a sink, either in
//! fixed-size chunks or as a single buffer. The reader owns its scratch buffer
//! and is reused for every target a worker claims.

use crate::error::CountError;
use crate::target::Target;

use memmap2::Mmap;
use std::collections::TryReserveError;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Default chunk size for streaming reads (160 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 160 * 1024;

/// Largest streaming chunk accepted from the command line (1 GiB).
/// Every worker zero-fills a buffer of this size before its first read.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024 * 1024;

/// How a target's bytes are acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Repeated reads into a reusable buffer of `chunk_size` bytes
    Streaming { chunk_size: usize },
    /// Stat, allocate exactly the file size, read it in one pass
    WholeBuffer,
    /// Map the file read-only
    Mapped,
}

impl ReadStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Streaming { .. } => "stream",
            Self::WholeBuffer => "whole",
            Self::Mapped => "mmap",
        }
    }

    /// Size of the per-worker scratch buffer this strategy needs.
    ///
    /// Buffered strategies still keep one for stdin and non-regular files,
    /// which they always stream.
    fn scratch_size(&self) -> usize {
        match *self {
            Self::Streaming { chunk_size } => chunk_size.max(1),
            Self::WholeBuffer | Self::Mapped => DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for ReadStrategy {
    fn default() -> Self {
        Self::Streaming {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Per-worker reader
pub struct InputReader {
    strategy: ReadStrategy,
    scratch: Vec<u8>,
}

impl InputReader {
    /// Allocate the scratch buffer. Fails only if the allocation does.
    pub fn new(strategy: ReadStrategy) -> Result<Self, TryReserveError> {
        let size = strategy.scratch_size();
        let mut scratch = Vec::new();
        scratch.try_reserve_exact(size)?;
        scratch.resize(size, 0);

        Ok(Self { strategy, scratch })
    }

    /// Feed every byte of `target` to `sink`, in one or more slices
    pub fn scan<F>(&mut self, target: &Target, mut sink: F) -> Result<(), CountError>
    where
        F: FnMut(&[u8]),
    {
        let path = match target {
            // Standard input has no size to stat and is never ours to close
            Target::Stdin => {
                let mut stdin = io::stdin().lock();
                return read_chunks(&mut stdin, &mut self.scratch, target, &mut sink);
            }
            Target::File(path) => path,
        };

        let file = open(target, path)?;
        match self.strategy {
            ReadStrategy::Streaming { .. } => {
                read_chunks(&mut &file, &mut self.scratch, target, &mut sink)
            }
            ReadStrategy::WholeBuffer => self.read_whole(&file, target, &mut sink),
            ReadStrategy::Mapped => self.read_mapped(&file, target, &mut sink),
        }
    }

    fn read_whole<F>(&mut self, file: &File, target: &Target, sink: &mut F) -> Result<(), CountError>
    where
        F: FnMut(&[u8]),
    {
        let meta = file.metadata().map_err(|e| read_failure(target, e))?;
        if !meta.is_file() {
            log::debug!("{} is not a regular file, streaming it", target);
            return read_chunks(&mut &*file, &mut self.scratch, target, sink);
        }

        let size = meta.len();
        let allocation_failure = || CountError::AllocationFailure {
            name: target.name(),
            size,
        };
        let len = usize::try_from(size).map_err(|_| allocation_failure())?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| allocation_failure())?;
        file.take(size)
            .read_to_end(&mut data)
            .map_err(|e| read_failure(target, e))?;

        sink(&data[..]);
        Ok(())
    }

    fn read_mapped<F>(&mut self, file: &File, target: &Target, sink: &mut F) -> Result<(), CountError>
    where
        F: FnMut(&[u8]),
    {
        let meta = file.metadata().map_err(|e| read_failure(target, e))?;
        if !meta.is_file() {
            log::debug!("{} is not a regular file, streaming it", target);
            return read_chunks(&mut &*file, &mut self.scratch, target, sink);
        }
        if meta.len() == 0 {
            sink(&[]);
            return Ok(());
        }

        // SAFETY: the map is read-only and dropped before this call returns
        let map = unsafe { Mmap::map(file) }.map_err(|e| read_failure(target, e))?;
        sink(&map[..]);
        Ok(())
    }
}

fn open(target: &Target, path: &Path) -> Result<File, CountError> {
    File::open(path).map_err(|source| CountError::TargetUnavailable {
        name: target.name(),
        source,
    })
}

fn read_failure(target: &Target, source: io::Error) -> CountError {
    CountError::ReadFailure {
        name: target.name(),
        source,
    }
}

/// Read until end of input, handing each filled prefix of `buf` to `sink`
fn read_chunks<R, F>(reader: &mut R, buf: &mut [u8], target: &Target, sink: &mut F) -> Result<(), CountError>
where
    R: Read + ?Sized,
    F: FnMut(&[u8]),
{
    loop {
        match reader.read(buf) {
            Ok(0) => return Ok(()),
            Ok(n) => sink(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_failure(target, e)),
        }
    }
}
