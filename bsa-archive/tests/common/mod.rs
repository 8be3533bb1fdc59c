//! builders for small synthetic archives, written byte by byte
#![allow(dead_code)]

use std::{io::Write, path::PathBuf};

use bsa_archive::{hash, path};

pub const SENTINEL: u32 = 0xBAAD_F00D;

fn put_u16(bytes: &mut Vec<u8>, value: u16) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(bytes: &mut Vec<u8>, value: u64) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

/// write `bytes` to a new file inside a fresh temporary directory
pub fn write_temp(name: &str, bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).expect("write archive");
    (dir, path)
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    encoder.write_all(data).expect("write to vec");
    encoder.finish().expect("finish zlib stream")
}

pub fn lz4_frame(data: &[u8]) -> Vec<u8> {
    let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
    encoder.write_all(data).expect("write to vec");
    encoder.finish().expect("finish lz4 frame")
}

pub fn lz4_block(data: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress(data)
}

/// some bytes that compress well but aren't trivial
pub fn sample_data(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i / 7) as u8 ^ seed.wrapping_mul(31))
        .collect()
}

/// a morrowind archive, payloads stored in the given order
pub fn tes3_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let names_len: usize = files.iter().map(|(name, _)| name.len() + 1).sum();
    let file_count = files.len() as u32;
    let directory_size = 12 * file_count + names_len as u32;

    let mut bytes = Vec::new();
    put_u32(&mut bytes, 0x100);
    put_u32(&mut bytes, directory_size);
    put_u32(&mut bytes, file_count);

    let mut offset = 0;
    for (_, data) in files {
        put_u32(&mut bytes, data.len() as u32);
        put_u32(&mut bytes, offset);
        offset += data.len() as u32;
    }

    let mut name_offset = 0;
    for (name, _) in files {
        put_u32(&mut bytes, name_offset);
        name_offset += name.len() as u32 + 1;
    }
    for (name, _) in files {
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
    }
    for (name, _) in files {
        let (low, high) = hash::tes3_hash(name);
        put_u32(&mut bytes, low);
        put_u32(&mut bytes, high);
    }
    for (_, data) in files {
        bytes.extend_from_slice(data);
    }

    bytes
}

pub const TES4_FOLDER_NAMES: u32 = 0x1;
pub const TES4_FILE_NAMES: u32 = 0x2;
pub const TES4_COMPRESSED: u32 = 0x4;
pub const TES4_EMBEDDED_NAMES: u32 = 0x100;

/// a file of a compressed family archive, `payload` is written as is
pub struct Tes4File<'a> {
    pub name: &'a str,
    pub payload: Vec<u8>,
    /// set the bit that inverts the archive default compression
    pub flip_compression: bool,
}

impl<'a> Tes4File<'a> {
    pub fn stored(name: &'a str, payload: Vec<u8>) -> Self {
        Self {
            name,
            payload,
            flip_compression: false,
        }
    }
}

/// `decoded size` prefix followed by the packed bytes
pub fn sized_payload(decoded_len: usize, packed: Vec<u8>) -> Vec<u8> {
    let mut bytes = (decoded_len as u32).to_le_bytes().to_vec();
    bytes.extend(packed);
    bytes
}

/// prefix a payload with its embedded full path
pub fn embedded_payload(full_path: &str, payload: Vec<u8>) -> Vec<u8> {
    let mut bytes = vec![full_path.len() as u8];
    bytes.extend_from_slice(full_path.as_bytes());
    bytes.extend(payload);
    bytes
}

/// an oblivion family archive, folders and files in the given order
pub fn tes4_archive(version: u32, flags: u32, folders: &[(&str, Vec<Tes4File>)]) -> Vec<u8> {
    let folder_record_size = if version == 0x69 { 24 } else { 16 };
    let folder_names = flags & TES4_FOLDER_NAMES != 0;
    let file_names = flags & TES4_FILE_NAMES != 0;

    let folder_count = folders.len() as u32;
    let file_count: u32 = folders.iter().map(|(_, files)| files.len() as u32).sum();
    let folder_names_length: u32 = folders.iter().map(|(name, _)| name.len() as u32 + 1).sum();
    let file_names_length: u32 = folders
        .iter()
        .flat_map(|(_, files)| files.iter().map(|f| f.name.len() as u32 + 1))
        .sum();

    let mut tables_len = 36 + folder_count * folder_record_size + file_count * 16;
    if folder_names {
        tables_len += folder_count + folder_names_length;
    }
    if file_names {
        tables_len += file_names_length;
    }

    let mut bytes = b"BSA\0".to_vec();
    for word in [
        version,
        36,
        flags,
        folder_count,
        file_count,
        folder_names_length,
        file_names_length,
        0,
    ] {
        put_u32(&mut bytes, word);
    }

    let mut block_offset = 36 + folder_count * folder_record_size + file_names_length;
    for (folder, files) in folders {
        put_u64(&mut bytes, hash::tes4_folder_hash(&path::normalize(folder)));
        put_u32(&mut bytes, files.len() as u32);
        if version == 0x69 {
            put_u32(&mut bytes, 0);
            put_u64(&mut bytes, u64::from(block_offset));
        } else {
            put_u32(&mut bytes, block_offset);
        }
        block_offset += files.len() as u32 * 16 + if folder_names { folder.len() as u32 + 2 } else { 0 };
    }

    let mut data_offset = tables_len;
    for (folder, files) in folders {
        if folder_names {
            bytes.push(folder.len() as u8 + 1);
            bytes.extend_from_slice(folder.as_bytes());
            bytes.push(0);
        }
        for file in files {
            let normalized = path::normalize(file.name);
            let split = path::split(&normalized);
            put_u64(&mut bytes, hash::tes4_hash(split.stem, split.extension));

            let flag = if file.flip_compression { 1 << 30 } else { 0 };
            put_u32(&mut bytes, file.payload.len() as u32 | flag);
            put_u32(&mut bytes, data_offset);
            data_offset += file.payload.len() as u32;
        }
    }

    if file_names {
        for (_, files) in folders {
            for file in files {
                bytes.extend_from_slice(file.name.as_bytes());
                bytes.push(0);
            }
        }
    }
    assert_eq!(bytes.len() as u32, tables_len, "table layout");

    for (_, files) in folders {
        for file in files {
            bytes.extend_from_slice(&file.payload);
        }
    }

    bytes
}

fn ba2_header(version: u32, kind: &[u8; 4], file_count: u32, compression_method: u32) -> Vec<u8> {
    let mut bytes = b"BTDX".to_vec();
    put_u32(&mut bytes, version);
    bytes.extend_from_slice(kind);
    put_u32(&mut bytes, file_count);
    // name table offset, patched once the data is written
    put_u64(&mut bytes, 0);
    if version == 2 || version == 3 {
        put_u64(&mut bytes, 0);
    }
    if version == 3 {
        put_u32(&mut bytes, compression_method);
    }
    bytes
}

fn ba2_keys(full_path: &str) -> (u32, u32, u32) {
    let normalized = path::normalize(full_path);
    let split = path::split(&normalized);
    (
        hash::ba2_hash(split.stem),
        hash::ba2_extension_hash(split.extension),
        hash::ba2_hash(split.folder),
    )
}

fn ba2_name_table(bytes: &mut Vec<u8>, names: impl Iterator<Item = String>) {
    let offset = bytes.len() as u64;
    bytes[16..24].copy_from_slice(&offset.to_le_bytes());
    for name in names {
        put_u16(bytes, name.len() as u16);
        bytes.extend_from_slice(name.as_bytes());
    }
}

/// a file of a BA2 general archive
pub struct Ba2File<'a> {
    pub name: &'a str,
    /// bytes written to the archive
    pub stored: Vec<u8>,
    pub size: u32,
    pub packed: bool,
}

impl<'a> Ba2File<'a> {
    pub fn stored(name: &'a str, data: &[u8]) -> Self {
        Self {
            name,
            stored: data.to_vec(),
            size: data.len() as u32,
            packed: false,
        }
    }

    pub fn packed(name: &'a str, data: &[u8], packed: Vec<u8>) -> Self {
        Self {
            name,
            stored: packed,
            size: data.len() as u32,
            packed: true,
        }
    }
}

/// a BA2 general archive, `with_names` controls the name table
pub fn ba2_general(
    version: u32,
    compression_method: u32,
    files: &[Ba2File],
    with_names: bool,
) -> Vec<u8> {
    let mut bytes = ba2_header(version, b"GNRL", files.len() as u32, compression_method);
    let mut offset = (bytes.len() + files.len() * 36) as u64;

    for file in files {
        let (name, extension, folder) = ba2_keys(file.name);
        for word in [name, extension, folder, 0x0010_0100] {
            put_u32(&mut bytes, word);
        }
        put_u64(&mut bytes, offset);
        put_u32(&mut bytes, if file.packed { file.stored.len() as u32 } else { 0 });
        put_u32(&mut bytes, file.size);
        put_u32(&mut bytes, SENTINEL);
        offset += file.stored.len() as u64;
    }
    for file in files {
        bytes.extend_from_slice(&file.stored);
    }

    if with_names {
        ba2_name_table(&mut bytes, files.iter().map(|f| f.name.to_owned()));
    }
    bytes
}

/// a mip range of a texture
pub struct Ba2Chunk {
    pub stored: Vec<u8>,
    pub size: u32,
    pub packed: bool,
    pub mip_start: u16,
    pub mip_end: u16,
}

/// a texture of a BA2 texture archive
pub struct Ba2Texture<'a> {
    pub name: &'a str,
    pub width: u16,
    pub height: u16,
    pub mip_count: u8,
    pub format: u8,
    pub cubemap_flags: u16,
    pub chunks: Vec<Ba2Chunk>,
}

/// a BA2 texture archive
pub fn ba2_textures(version: u32, compression_method: u32, textures: &[Ba2Texture]) -> Vec<u8> {
    let mut bytes = ba2_header(version, b"DX10", textures.len() as u32, compression_method);
    let records_len: usize = textures.iter().map(|t| 24 + 24 * t.chunks.len()).sum();
    let mut offset = (bytes.len() + records_len) as u64;

    for texture in textures {
        let (name, extension, folder) = ba2_keys(texture.name);
        for word in [name, extension, folder] {
            put_u32(&mut bytes, word);
        }
        bytes.push(0);
        bytes.push(texture.chunks.len() as u8);
        put_u16(&mut bytes, 24);
        put_u16(&mut bytes, texture.height);
        put_u16(&mut bytes, texture.width);
        bytes.push(texture.mip_count);
        bytes.push(texture.format);
        put_u16(&mut bytes, texture.cubemap_flags);

        for chunk in &texture.chunks {
            put_u64(&mut bytes, offset);
            put_u32(&mut bytes, if chunk.packed { chunk.stored.len() as u32 } else { 0 });
            put_u32(&mut bytes, chunk.size);
            put_u16(&mut bytes, chunk.mip_start);
            put_u16(&mut bytes, chunk.mip_end);
            put_u32(&mut bytes, SENTINEL);
            offset += chunk.stored.len() as u64;
        }
    }
    for texture in textures {
        for chunk in &texture.chunks {
            bytes.extend_from_slice(&chunk.stored);
        }
    }

    ba2_name_table(&mut bytes, textures.iter().map(|t| t.name.to_owned()));
    bytes
}
