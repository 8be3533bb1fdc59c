use std::fmt::Debug;

use super::{Archive, error::ArchiveError};

/// compression applied to a stored payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// zlib stream, used by oblivion, fallout 3 and most BA2 archives
    Zlib,
    /// lz4 frame, used by skyrim special edition
    Lz4Frame,
    /// raw lz4 block, used by starfield v3 BA2 archives
    Lz4Block,
}

/// the key an archive stores for an entry, depends on the archive family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKey {
    Tes3 { low: u32, high: u32 },
    Tes4 { folder: u64, file: u64 },
    Ba2 { folder: u32, name: u32, extension: u32 },
}

/// position of a name inside a [`NameArena`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NameSpan {
    pub offset: u32,
    pub len: u32,
}

/// one buffer holding the names of every entry in an archive
#[derive(Debug, Clone, Default)]
pub(crate) struct NameArena(String);

impl NameArena {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ArchiveError> {
        String::from_utf8(bytes)
            .map(Self)
            .map_err(|_| ArchiveError::corrupt("name table isn't valid utf-8"))
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(String::with_capacity(capacity))
    }

    /// span of an existing name, `offset..offset + len` must be inside the arena
    pub fn span(&self, offset: usize, len: usize) -> Option<NameSpan> {
        self.0.get(offset..offset + len)?;
        Some(NameSpan {
            offset: u32::try_from(offset).ok()?,
            len: u32::try_from(len).ok()?,
        })
    }

    pub fn push(&mut self, name: &str) -> NameSpan {
        let offset = self.0.len() as u32;
        self.0.push_str(name);
        NameSpan {
            offset,
            len: name.len() as u32,
        }
    }

    /// push a name followed by a NUL, the span doesn't cover the terminator
    pub fn push_terminated(&mut self, name: &str) -> NameSpan {
        let span = self.push(name);
        self.0.push('\0');
        span
    }

    pub fn get(&self, span: NameSpan) -> &str {
        let start = span.offset as usize;
        self.0.get(start..start + span.len as usize).unwrap_or_default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// one mip range of a BA2 texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureChunk {
    pub offset: u64,
    /// zero when the chunk is stored as is
    pub packed_size: u32,
    pub size: u32,
    pub mip_start: u16,
    pub mip_end: u16,
}

/// everything needed to rebuild the DDS file of a BA2 texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u16,
    pub height: u16,
    pub mip_count: u8,
    /// DXGI format code
    pub format: u8,
    pub cubemap_flags: u16,
    /// sorted by `mip_start`
    pub chunks: Vec<TextureChunk>,
}

/// an entry as the index keeps it, see [`FileEntry`] for the public view
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub name: NameSpan,
    /// start of the stored bytes, embedded name and size prefix included
    pub offset: u64,
    /// stored bytes, prefixes included
    pub stored_size: u64,
    /// bytes to skip before the payload
    pub prefix: u64,
    pub decoded_size: u64,
    pub compression: Option<Compression>,
    pub key: HashKey,
    pub texture: Option<Box<TextureInfo>>,
}

impl Entry {
    #[inline]
    pub fn payload_range(&self) -> (u64, u64) {
        (self.offset + self.prefix, self.stored_size - self.prefix)
    }

    pub fn packed_size(&self) -> u64 {
        match (&self.texture, self.compression) {
            (Some(texture), _) => texture.chunks.iter().map(|c| u64::from(c.packed_size)).sum(),
            (None, Some(_)) => self.payload_range().1,
            (None, None) => 0,
        }
    }
}

/// a view over a single file of an open [`Archive`]
#[derive(Clone, Copy)]
pub struct FileEntry<'a> {
    pub(crate) archive: &'a Archive,
    pub(crate) entry: &'a Entry,
}

impl<'a> FileEntry<'a> {
    /// full virtual path of the file, as stored in the archive
    pub fn path(&self) -> &'a str {
        self.archive.index.names().get(self.entry.name)
    }

    /// size of the bytes [`FileEntry::read`] returns
    pub fn decoded_size(&self) -> u64 {
        self.entry.decoded_size
    }

    /// size of the compressed payload, zero if the file isn't compressed
    pub fn packed_size(&self) -> u64 {
        self.entry.packed_size()
    }

    /// absolute offset of the file record in the archive
    pub fn offset(&self) -> u64 {
        self.entry.offset
    }

    pub fn is_compressed(&self) -> bool {
        self.entry.compression.is_some()
    }

    pub fn compression(&self) -> Option<Compression> {
        self.entry.compression
    }

    pub fn hash_key(&self) -> HashKey {
        self.entry.key
    }

    /// texture description of entries of a BA2 texture archive
    pub fn texture(&self) -> Option<&'a TextureInfo> {
        self.entry.texture.as_deref()
    }

    /// read the file, decompressing it (and rebuilding its DDS header) if needed
    pub fn read(&self) -> Result<Vec<u8>, ArchiveError> {
        self.archive.read_entry(self.entry)
    }
}

impl Debug for FileEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEntry")
            .field("path", &self.path())
            .field("offset", &self.entry.offset)
            .field("decoded_size", &self.entry.decoded_size)
            .field("compression", &self.entry.compression)
            .field("key", &self.entry.key)
            .finish()
    }
}
