use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use memmap2::{Mmap, MmapOptions};

use crate::archive::error::ArchiveError;

/// archive provider hold the bytes of an archive file
///
/// the file is memory mapped for the whole life of the provider, every read
/// borrow a bounds checked slice of the map so entries can be read from any
/// number of threads at once without sharing a file cursor.
pub struct ArchiveProvider {
    path: PathBuf,
    /// `None` for empty files, they can't be mapped on every platform
    mmap: Option<Mmap>,
}

impl ArchiveProvider {
    /// map the file at the given path
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mmap = map_file(&path)?;
        log::debug!(
            "mapped '{}' ({} bytes)",
            path.display(),
            mmap.as_ref().map_or(0, |m| m.len())
        );
        Ok(Self { path, mmap })
    }

    /// path of the mapped file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// the whole archive
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or_default()
    }

    /// size of the archive in bytes
    #[inline]
    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// get `size` bytes starting at `offset`, fails if the range isn't inside the archive
    pub fn get_bytes(&self, offset: u64, size: u64) -> Result<&[u8], ArchiveError> {
        log::trace!("getting bytes from offset {offset} with size {size}");
        offset
            .checked_add(size)
            .filter(|&end| end <= self.len())
            .map(|end| &self.bytes()[offset as usize..end as usize])
            .ok_or_else(|| {
                ArchiveError::corrupt(format!(
                    "range {offset}..{} is outside the archive ({} bytes)",
                    offset.saturating_add(size),
                    self.len()
                ))
            })
    }

    /// drop the mapping, must be done before resizing the file on some platforms
    pub(crate) fn unmap(&mut self) {
        self.mmap = None;
    }

    /// map the file again after it changed on disk
    pub(crate) fn remap(&mut self) -> io::Result<()> {
        self.mmap = None;
        self.mmap = map_file(&self.path)?;
        log::debug!("remapped '{}' ({} bytes)", self.path.display(), self.len());
        Ok(())
    }
}

fn map_file(path: &Path) -> io::Result<Option<Mmap>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    // SAFETY: the mapping is read only, callers must not truncate the file
    // behind our back while it's open
    unsafe { MmapOptions::new().map(&file) }.map(Some)
}
