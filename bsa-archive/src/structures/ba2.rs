//! fallout 4 / starfield BA2 archive structure

use binrw::{BinRead, BinResult, binread, parser};

use super::common;

pub const SENTINEL: u32 = 0xBAAD_F00D;
pub const CHUNK_HEADER_SIZE: u16 = 24;
/// chunks are compressed with raw lz4 blocks instead of zlib
pub const COMPRESSION_LZ4: u32 = 3;

#[binread]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
pub enum Kind {
    #[br(magic = b"GNRL")]
    General,
    #[br(magic = b"DX10")]
    Texture,
}

#[binread]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little, magic = b"BTDX")]
pub struct Header {
    #[br(assert(
        matches!(version, 1 | 2 | 3 | 7 | 8),
        "unsupported BA2 version {}", version
    ))]
    pub version: u32,
    pub kind: Kind,
    pub file_count: u32,
    pub name_table_offset: u64,
    #[br(if(version == 2 || version == 3))]
    pub _reserved: Option<u64>,
    #[br(if(version == 3))]
    pub compression_method: Option<u32>,
}

impl Header {
    /// size of the header in this version
    pub fn size(&self) -> u64 {
        match self.version {
            2 => 32,
            3 => 36,
            _ => 24,
        }
    }

    #[inline]
    pub fn uses_lz4(&self) -> bool {
        self.compression_method == Some(COMPRESSION_LZ4)
    }
}

pub const GENERAL_RECORD_SIZE: u64 = 36;

#[binread]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
pub struct GeneralRecord {
    pub name_hash: u32,
    pub extension: u32,
    pub dir_hash: u32,
    pub flags: u32,
    pub offset: u64,
    /// zero when the file is stored as is
    pub packed_size: u32,
    pub size: u32,
    #[br(assert(sentinel == SENTINEL, "invalid file record sentinel {:#x}", sentinel))]
    pub sentinel: u32,
}

pub const TEXTURE_RECORD_SIZE: u64 = 24;

#[binread]
#[derive(Debug, Clone, PartialEq, Eq)]
#[br(little)]
pub struct TextureRecord {
    pub name_hash: u32,
    pub extension: u32,
    pub dir_hash: u32,
    pub _unknown: u8,
    pub chunk_count: u8,
    #[br(assert(
        chunk_header_size == CHUNK_HEADER_SIZE,
        "unexpected texture chunk header size {}", chunk_header_size
    ))]
    pub chunk_header_size: u16,
    pub height: u16,
    pub width: u16,
    pub mip_count: u8,
    pub format: u8,
    pub cubemap_flags: u16,
    #[br(count = chunk_count)]
    pub chunks: Vec<TextureChunk>,
}

#[binread]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
pub struct TextureChunk {
    pub offset: u64,
    pub packed_size: u32,
    pub size: u32,
    pub mip_start: u16,
    pub mip_end: u16,
    #[br(assert(sentinel == SENTINEL, "invalid texture chunk sentinel {:#x}", sentinel))]
    pub sentinel: u32,
}

/// the name table at the end of the archive, one name per file in record order
#[binread]
#[derive(Debug, Clone)]
#[br(little, import(file_count: u32))]
pub struct NameTable {
    #[br(parse_with = read_names, args(file_count))]
    pub names: Vec<Vec<u8>>,
}

#[parser(reader, endian)]
fn read_names(count: u32) -> BinResult<Vec<Vec<u8>>> {
    (0..count)
        .map(|_| common::read_wstring(reader, endian, ()))
        .collect()
}

#[cfg(test)]
mod tests {
    use binrw::io::Cursor;

    use super::*;

    #[test]
    fn header_versions() {
        let mut bytes = b"BTDX\x01\0\0\0GNRL\x02\0\0\0".to_vec();
        bytes.extend_from_slice(&100_u64.to_le_bytes());
        let header = Header::read(&mut Cursor::new(&bytes)).expect("v1 header");
        assert_eq!(header.kind, Kind::General);
        assert_eq!(header.file_count, 2);
        assert_eq!(header.name_table_offset, 100);
        assert_eq!(header.size(), 24);
        assert!(!header.uses_lz4());

        let mut bytes = b"BTDX\x03\0\0\0DX10\x00\0\0\0".to_vec();
        bytes.extend_from_slice(&0_u64.to_le_bytes());
        bytes.extend_from_slice(&0_u64.to_le_bytes());
        bytes.extend_from_slice(&COMPRESSION_LZ4.to_le_bytes());
        let header = Header::read(&mut Cursor::new(&bytes)).expect("v3 header");
        assert_eq!(header.kind, Kind::Texture);
        assert_eq!(header.size(), 36);
        assert!(header.uses_lz4());
    }

    #[test]
    fn header_rejects_unknown_version_and_kind() {
        let mut bytes = b"BTDX\x04\0\0\0GNRL\0\0\0\0".to_vec();
        bytes.extend_from_slice(&0_u64.to_le_bytes());
        assert!(Header::read(&mut Cursor::new(&bytes)).is_err());

        let mut bytes = b"BTDX\x01\0\0\0GNRX\0\0\0\0".to_vec();
        bytes.extend_from_slice(&0_u64.to_le_bytes());
        assert!(Header::read(&mut Cursor::new(&bytes)).is_err());
    }

    #[test]
    fn general_record_sentinel() {
        let mut bytes = Vec::new();
        for word in [1_u32, 2, 3, 0] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.extend_from_slice(&64_u64.to_le_bytes());
        bytes.extend_from_slice(&0_u32.to_le_bytes());
        bytes.extend_from_slice(&10_u32.to_le_bytes());
        bytes.extend_from_slice(&SENTINEL.to_le_bytes());
        assert_eq!(bytes.len() as u64, GENERAL_RECORD_SIZE);

        let record = GeneralRecord::read(&mut Cursor::new(&bytes)).expect("valid record");
        assert_eq!(record.offset, 64);
        assert_eq!(record.size, 10);

        let len = bytes.len();
        bytes[len - 1] = 0;
        assert!(GeneralRecord::read(&mut Cursor::new(&bytes)).is_err());
    }
}
