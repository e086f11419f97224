//! Backing storage for the shared-memory fabric region `S`.
//!
//! The fabric needs one contiguous, page-aligned byte buffer that every
//! worker in the process (and, for the file-backed variant, every process on
//! the host) can see at the same address range. Two constructors cover the
//! two deployments the spec calls out:
//!
//! - [`SharedRegion::create_anon`] — a single process owns `S`; backed by an
//!   anonymous `mmap`, never touches the filesystem.
//! - [`SharedRegion::create_file`] / [`SharedRegion::open_file`] — `S` is
//!   shared across processes (e.g. an external UI/embedding host); backed by
//!   a regular file mapped `MAP_SHARED`.

use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// A single contiguous, mutable byte region backing the fabric.
///
/// Owns the mapping for its lifetime. Never resized after creation — the
/// fabric's region table is computed once against a fixed `len()`.
pub struct SharedRegion {
    mmap: MmapMut,
}

impl SharedRegion {
    /// Creates an anonymous, process-private region of `size_bytes`.
    ///
    /// `size_bytes` should already be a multiple of the page size; the OS
    /// will round up silently otherwise, which would desync the caller's
    /// idea of `len()` from the mapping's actual length.
    pub fn create_anon(size_bytes: usize) -> io::Result<Self> {
        let mmap = MmapOptions::new().len(size_bytes).map_anon()?;
        Ok(Self { mmap })
    }

    /// Creates a new file of `size_bytes` and maps it read-write, shared.
    pub fn create_file<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size_bytes)?;
        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
        Ok(Self { mmap })
    }

    /// Opens an existing file and maps it read-write, shared.
    ///
    /// Callers are responsible for validating the region's contents (magic,
    /// version, size) before trusting it; this layer only maps bytes.
    pub fn open_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
        Ok(Self { mmap })
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap[..]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap[..]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}
