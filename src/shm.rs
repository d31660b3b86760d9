//! Shared-memory backing for window framebuffers
//!
//! Each window owns one file created in the runtime directory, sized
//! once at creation, mapped shared so the compositor can read the
//! pixels without copying them through the protocol channel. The file
//! is unlinked immediately (anonymous), so teardown is just dropping
//! the mapping and the descriptor. Decoration regions are carved off
//! the tail of the same allocation.

use std::fs::File;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::Path;

use memmap2::MmapMut;

use crate::error::BackendError;

/// One process-shared memory region backing a window and its
/// decoration buffers.
#[derive(Debug)]
pub struct ShmBacking {
    file: File,
    map: MmapMut,
    size: usize,
    carve_offset: usize,
}

impl ShmBacking {
    /// Create, size and map a backing file in `runtime_dir`.
    pub fn allocate(runtime_dir: &Path, size: usize) -> Result<Self, BackendError> {
        let file = tempfile::tempfile_in(runtime_dir)?;
        file.set_len(size as u64)?;
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            file,
            map,
            size,
            carve_offset: 0,
        })
    }

    /// Reserve `len` bytes and return their offset. Offsets are handed
    /// out in creation order: window pixels first, then decorations.
    pub fn carve(&mut self, len: usize) -> Result<usize, BackendError> {
        if self.carve_offset + len > self.size {
            return Err(BackendError::Shm(std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                "backing region exhausted",
            )));
        }
        let offset = self.carve_offset;
        self.carve_offset += len;
        Ok(offset)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }

    pub fn region_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.map[offset..offset + len]
    }

    pub fn region(&self, offset: usize, len: usize) -> &[u8] {
        &self.map[offset..offset + len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn allocate_and_carve_regions() {
        let dir = tempdir().unwrap();
        let mut backing = ShmBacking::allocate(dir.path(), 4096).unwrap();
        assert_eq!(backing.size(), 4096);

        let a = backing.carve(1024).unwrap();
        let b = backing.carve(512).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1024);

        backing.region_mut(b, 512).fill(0xAB);
        assert!(backing.region(a, 1024).iter().all(|&x| x == 0));
        assert!(backing.region(b, 512).iter().all(|&x| x == 0xAB));
    }

    #[test]
    fn carve_past_end_fails() {
        let dir = tempdir().unwrap();
        let mut backing = ShmBacking::allocate(dir.path(), 128).unwrap();
        assert!(backing.carve(100).is_ok());
        assert!(backing.carve(100).is_err());
    }
}
