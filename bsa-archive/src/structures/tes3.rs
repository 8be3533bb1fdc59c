//! morrowind (uncompressed) archive structure

use binrw::binrw;

pub const MAGIC: u32 = 0x100;
pub const HEADER_SIZE: u64 = 12;
/// size record + name offset + hash of a single file
pub const FILE_RECORD_SIZE: u64 = 8 + 4 + 8;

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little, magic = 0x100u32)]
pub struct Header {
    /// size of everything between the header and the hash table
    pub directory_size: u32,
    pub file_count: u32,
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct FileRecord {
    pub size: u32,
    /// relative to the start of the data region
    pub offset: u32,
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[brw(little)]
pub struct NameHash {
    pub low: u32,
    pub high: u32,
}

/// everything after the header, the hash table included
#[binrw]
#[derive(Debug, Clone)]
#[brw(little, import(file_count: u32, names_len: u32))]
pub struct Directory {
    #[br(count = file_count)]
    pub records: Vec<FileRecord>,
    #[br(count = file_count)]
    pub name_offsets: Vec<u32>,
    #[br(count = names_len)]
    pub names: Vec<u8>,
    #[br(count = file_count)]
    pub hashes: Vec<NameHash>,
}
