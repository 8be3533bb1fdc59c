//! a single handle over every archive family

use std::{fmt::Debug, path::Path};

use crate::{
    ArchiveFormat, path,
    provider::ArchiveProvider,
    structures::{
        ba2::Kind,
        tes4::{VERSION_FO3, VERSION_TES4},
    },
    utils,
};

use ba2::Ba2Index;
use entry::{Compression, Entry, FileEntry, NameArena};
use error::ArchiveError;
use tes3::Tes3Index;
use tes4::Tes4Index;

pub use iter::Entries;

mod ba2;
mod dds;
mod decompress;
pub mod entry;
pub mod error;
mod iter;
mod tes3;
mod tes4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub format: ArchiveFormat,
    pub file_count: usize,
    /// folder buckets, zero for morrowind archives
    pub folder_count: usize,
    /// size of the archive file in bytes
    pub archive_size: u64,
}

/// the parsed directory of an archive
#[derive(Debug)]
pub(crate) enum ArchiveIndex {
    Tes3(Tes3Index),
    Tes4(Tes4Index),
    Ba2(Ba2Index),
}

impl ArchiveIndex {
    fn parse(bytes: &[u8], format: ArchiveFormat) -> Result<Self, ArchiveError> {
        match format {
            ArchiveFormat::Uncompressed => Tes3Index::parse(bytes).map(Self::Tes3),
            ArchiveFormat::CompressedV67
            | ArchiveFormat::CompressedV68
            | ArchiveFormat::CompressedV69 => Tes4Index::parse(bytes).map(Self::Tes4),
            ArchiveFormat::Ba2General | ArchiveFormat::Ba2Texture => {
                Ba2Index::parse(bytes).map(Self::Ba2)
            }
            ArchiveFormat::Unknown => Err(ArchiveError::UnrecognizedFormat),
        }
    }

    /// format of the archive as its header declares it
    fn format(&self) -> ArchiveFormat {
        match self {
            Self::Tes3(_) => ArchiveFormat::Uncompressed,
            Self::Tes4(index) => match index.version {
                VERSION_TES4 => ArchiveFormat::CompressedV67,
                VERSION_FO3 => ArchiveFormat::CompressedV68,
                _ => ArchiveFormat::CompressedV69,
            },
            Self::Ba2(index) => match index.kind {
                Kind::General => ArchiveFormat::Ba2General,
                Kind::Texture => ArchiveFormat::Ba2Texture,
            },
        }
    }

    #[inline]
    pub(crate) fn entries(&self) -> &[Entry] {
        match self {
            Self::Tes3(index) => &index.entries,
            Self::Tes4(index) => &index.entries,
            Self::Ba2(index) => &index.entries,
        }
    }

    #[inline]
    pub(crate) fn names(&self) -> &NameArena {
        match self {
            Self::Tes3(index) => &index.names,
            Self::Tes4(index) => &index.names,
            Self::Ba2(index) => &index.names,
        }
    }

    fn lookup(&self, path: &str) -> Option<&Entry> {
        match self {
            Self::Tes3(index) => index.lookup(path),
            Self::Tes4(index) => index.lookup(path),
            Self::Ba2(index) => index.lookup(path),
        }
    }

    fn folder_count(&self) -> usize {
        match self {
            Self::Tes3(_) => 0,
            Self::Tes4(index) => index.folder_count(),
            Self::Ba2(index) => index.folder_count(),
        }
    }
}

/// ## an open BSA or BA2 archive
///
/// the whole directory is parsed when the archive is opened, entries can then
/// be looked up and read from any number of threads at once. morrowind
/// archives can also be appended to, which needs exclusive access.
pub struct Archive {
    provider: ArchiveProvider,
    format: ArchiveFormat,
    pub(crate) index: ArchiveIndex,
}

impl Archive {
    /// open the archive at the given path, detecting its format
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let provider = ArchiveProvider::new(path)?;
        let bytes = provider.bytes();
        let format = utils::format_of(&bytes[..bytes.len().min(12)], provider.len());
        log::debug!("detected {format:?} for '{}'", provider.path().display());

        Self::with_provider(provider, format)
    }

    /// open the archive at the given path with the parser of the given format
    pub fn open_as(path: impl AsRef<Path>, format: ArchiveFormat) -> Result<Self, ArchiveError> {
        let provider = ArchiveProvider::new(path)?;
        Self::with_provider(provider, format)
    }

    /// write a new, empty morrowind archive at the given path and open it.
    /// fails if the file already exists.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        tes3::create_empty(path)?;
        log::info!("created empty archive '{}'", path.display());
        Self::open_as(path, ArchiveFormat::Uncompressed)
    }

    fn with_provider(provider: ArchiveProvider, format: ArchiveFormat) -> Result<Self, ArchiveError> {
        let index = ArchiveIndex::parse(provider.bytes(), format)?;
        let format = index.format();
        log::info!(
            "opened '{}' as {format:?} with {} entries",
            provider.path().display(),
            index.entries().len()
        );

        Ok(Self {
            provider,
            format,
            index,
        })
    }

    #[inline]
    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// path of the archive file
    #[inline]
    pub fn path(&self) -> &Path {
        self.provider.path()
    }

    pub fn metadata(&self) -> Metadata {
        Metadata {
            format: self.format,
            file_count: self.len(),
            folder_count: self.index.folder_count(),
            archive_size: self.provider.len(),
        }
    }

    /// number of files in the archive
    #[inline]
    pub fn len(&self) -> usize {
        self.index.entries().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// iterate over every file, morrowind archives list them by offset,
    /// the others in the order their directory declares them
    #[inline]
    pub fn entries(&self) -> Entries<'_> {
        Entries::new(self)
    }

    /// iterate over the files whose path match the given glob pattern,
    /// see [`path::matches_pattern`]
    pub fn find<'a>(&'a self, pattern: &'a str) -> impl Iterator<Item = FileEntry<'a>> {
        self.entries()
            .filter(move |entry| path::matches_pattern(pattern, entry.path()))
    }

    /// find a file by its virtual path, ignoring case and separator style
    pub fn lookup(&self, path: &str) -> Option<FileEntry<'_>> {
        let entry = self.index.lookup(path)?;
        Some(FileEntry {
            archive: self,
            entry,
        })
    }

    /// read the file at the given virtual path
    pub fn read_path(&self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        self.lookup(path)
            .ok_or_else(|| ArchiveError::EntryNotFound(path.to_owned()))?
            .read()
    }

    /// append a new file to the archive, only morrowind archives support it.
    ///
    /// on success the file on disk and the entries of this handle both hold the new
    /// file. when writing fails the archive is restored and the entries are left as they
    /// were. an error from mapping the grown archive again comes after the entries were
    /// updated, the handle then has to be reopened before reading.
    pub fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        match &mut self.index {
            ArchiveIndex::Tes3(index) => index.append(&mut self.provider, name, bytes),
            _ => Err(ArchiveError::UnsupportedOperation(self.format)),
        }
    }

    pub(crate) fn read_entry(&self, entry: &Entry) -> Result<Vec<u8>, ArchiveError> {
        log::trace!(
            "reading entry '{}' at {} ({} bytes)",
            self.index.names().get(entry.name),
            entry.offset,
            entry.decoded_size
        );

        if let Some(texture) = &entry.texture {
            let compression = entry.compression.unwrap_or(Compression::Zlib);
            return dds::assemble(texture, self.provider.bytes(), compression);
        }

        let (offset, size) = entry.payload_range();
        let payload = self.provider.get_bytes(offset, size)?;
        match entry.compression {
            Some(compression) => {
                let decoded_size = usize::try_from(entry.decoded_size)
                    .map_err(|_| ArchiveError::EntryTooLarge(entry.decoded_size))?;
                Ok(decompress::decompress_buf(payload, compression, decoded_size)?)
            }
            None => Ok(payload.to_vec()),
        }
    }
}

impl Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.provider.path())
            .field("format", &self.format)
            .field("entries", &format!("[Entry; {}]", self.len()))
            .finish()
    }
}
