//! oblivion, fallout 3/new vegas and skyrim (compressed) archive structure

use binrw::{BinRead, BinResult, binread, parser};

pub const HEADER_SIZE: u32 = 36;

pub const VERSION_TES4: u32 = 0x67;
pub const VERSION_FO3: u32 = 0x68;
pub const VERSION_SSE: u32 = 0x69;

pub const ARCHIVE_FOLDER_NAMES: u32 = 0x1;
pub const ARCHIVE_FILE_NAMES: u32 = 0x2;
pub const ARCHIVE_COMPRESSED: u32 = 0x4;
pub const ARCHIVE_EMBEDDED_NAMES: u32 = 0x100;

/// set in a file size to invert the archive default compression
pub const FILE_SIZE_COMPRESSION: u32 = 1 << 30;

#[binread]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little, magic = b"BSA\0")]
pub struct Header {
    #[br(assert(
        matches!(version, VERSION_TES4 | VERSION_FO3 | VERSION_SSE),
        "unsupported compressed archive version {:#x}", version
    ))]
    pub version: u32,
    #[br(assert(
        folders_offset == HEADER_SIZE,
        "unexpected header size {}", folders_offset
    ))]
    pub folders_offset: u32,
    pub archive_flags: u32,
    pub folder_count: u32,
    pub file_count: u32,
    pub folder_names_length: u32,
    pub file_names_length: u32,
    pub file_flags: u32,
}

impl Header {
    #[inline]
    pub fn has_folder_names(&self) -> bool {
        self.archive_flags & ARCHIVE_FOLDER_NAMES != 0
    }

    #[inline]
    pub fn has_file_names(&self) -> bool {
        self.archive_flags & ARCHIVE_FILE_NAMES != 0
    }

    #[inline]
    pub fn compressed_by_default(&self) -> bool {
        self.archive_flags & ARCHIVE_COMPRESSED != 0
    }

    /// oblivion use the same bit for something else, so it's only honored from fallout 3 on
    #[inline]
    pub fn has_embedded_names(&self) -> bool {
        self.version != VERSION_TES4 && self.archive_flags & ARCHIVE_EMBEDDED_NAMES != 0
    }

    /// size of a single folder record in this version
    #[inline]
    pub fn folder_record_size(&self) -> u64 {
        if self.version == VERSION_SSE { 24 } else { 16 }
    }
}

#[binread]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little, import(version: u32))]
pub struct FolderRecord {
    pub hash: u64,
    pub file_count: u32,
    #[br(parse_with = read_folder_offset, args(version))]
    pub offset: u64,
}

pub const FILE_RECORD_SIZE: u64 = 16;

#[binread]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
pub struct FileRecord {
    pub hash: u64,
    /// size on disk, with [`FILE_SIZE_COMPRESSION`] possibly set
    pub size: u32,
    pub offset: u32,
}

/// skyrim special edition widened the offset, after some padding
#[parser(reader, endian)]
fn read_folder_offset(version: u32) -> BinResult<u64> {
    if version == VERSION_SSE {
        let _padding = u32::read_options(reader, endian, ())?;
        u64::read_options(reader, endian, ())
    } else {
        u32::read_options(reader, endian, ()).map(u64::from)
    }
}
