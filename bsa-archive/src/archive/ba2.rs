//! fallout 4 and starfield BA2 archives, both general and texture ones

use ahash::HashMap;
use binrw::{BinRead, Endian, VecArgs, io::Cursor};

use super::{
    dds,
    entry::{Compression, Entry, HashKey, NameArena, TextureChunk, TextureInfo},
    error::ArchiveError,
};
use crate::{
    hash, path,
    structures::ba2::{
        GENERAL_RECORD_SIZE, GeneralRecord, Header, Kind, NameTable, TEXTURE_RECORD_SIZE,
        TextureRecord,
    },
};

/// key of an entry inside its folder bucket
type NameKey = (u32, u32);

/// index of a BA2 archive, entries are kept in declaration order
#[derive(Debug, Clone)]
pub(crate) struct Ba2Index {
    pub kind: Kind,
    pub entries: Vec<Entry>,
    pub names: NameArena,
    /// folder hash -> (name hash, extension) -> position in `entries`
    folders: HashMap<u32, HashMap<NameKey, usize>>,
}

impl Ba2Index {
    pub fn parse(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let len = bytes.len() as u64;
        let mut reader = Cursor::new(bytes);
        let header = Header::read(&mut reader)?;
        log::debug!("BA2 archive header: {header:?}");

        let compression = if header.uses_lz4() {
            Compression::Lz4Block
        } else {
            Compression::Zlib
        };

        let record_size = match header.kind {
            Kind::General => GENERAL_RECORD_SIZE,
            Kind::Texture => TEXTURE_RECORD_SIZE,
        };
        if u64::from(header.file_count) * record_size > len - header.size() {
            return Err(ArchiveError::corrupt(
                "file table is larger than the entire archive",
            ));
        }

        let entries = match header.kind {
            Kind::General => {
                let records = Vec::<GeneralRecord>::read_options(
                    &mut reader,
                    Endian::Little,
                    VecArgs {
                        count: header.file_count as usize,
                        inner: (),
                    },
                )?;
                records
                    .iter()
                    .map(|record| general_entry(record, len, compression))
                    .collect::<Result<Vec<_>, _>>()?
            }
            Kind::Texture => {
                let mut entries = Vec::with_capacity(header.file_count as usize);
                for _ in 0..header.file_count {
                    let record = TextureRecord::read(&mut reader)?;
                    entries.push(texture_entry(record, len, compression)?);
                }
                entries
            }
        };

        let names = read_names(bytes, &header)?;
        let mut index = Self {
            kind: header.kind,
            entries: Vec::with_capacity(entries.len()),
            names: NameArena::with_capacity(
                names.as_ref().map_or(0, |n| n.iter().map(Vec::len).sum()),
            ),
            folders: HashMap::default(),
        };

        let mut names = names.into_iter().flatten();
        for mut entry in entries {
            let HashKey::Ba2 {
                folder,
                name,
                extension,
            } = entry.key
            else {
                continue;
            };

            let full_path = match names.next() {
                Some(stored) => std::str::from_utf8(&stored)
                    .map_err(|_| ArchiveError::corrupt("file name isn't valid utf-8"))?
                    .to_owned(),
                None => fallback_name(folder, name, extension),
            };
            entry.name = index.names.push(&full_path);

            let bucket = index.folders.entry(folder).or_default();
            if bucket.insert((name, extension), index.entries.len()).is_some() {
                return Err(ArchiveError::corrupt(format!(
                    "duplicate entry hash for '{full_path}' in folder {folder:#010x}"
                )));
            }
            index.entries.push(entry);
        }

        log::debug!(
            "loaded {} {:?} entries in {} folders",
            index.entries.len(),
            index.kind,
            index.folders.len()
        );
        Ok(index)
    }

    pub fn lookup(&self, path: &str) -> Option<&Entry> {
        if !path.is_ascii() {
            return None;
        }

        let normalized = path::normalize(path);
        let split = path::split(&normalized);
        let folder = hash::ba2_hash(split.folder);
        let name = hash::ba2_hash(split.stem);
        let extension = hash::ba2_extension_hash(split.extension);

        let idx = *self.folders.get(&folder)?.get(&(name, extension))?;
        self.entries.get(idx)
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }
}

fn general_entry(
    record: &GeneralRecord,
    len: u64,
    compression: Compression,
) -> Result<Entry, ArchiveError> {
    let stored_size = if record.packed_size != 0 {
        record.packed_size
    } else {
        record.size
    };
    check_bounds(record.offset, stored_size, len)?;

    Ok(Entry {
        name: Default::default(),
        offset: record.offset,
        stored_size: u64::from(stored_size),
        prefix: 0,
        decoded_size: u64::from(record.size),
        compression: (record.packed_size != 0).then_some(compression),
        key: HashKey::Ba2 {
            folder: record.dir_hash,
            name: record.name_hash,
            extension: record.extension,
        },
        texture: None,
    })
}

fn texture_entry(
    record: TextureRecord,
    len: u64,
    compression: Compression,
) -> Result<Entry, ArchiveError> {
    let mut chunks = record
        .chunks
        .iter()
        .map(|chunk| {
            let stored = if chunk.packed_size != 0 {
                chunk.packed_size
            } else {
                chunk.size
            };
            check_bounds(chunk.offset, stored, len)?;

            Ok(TextureChunk {
                offset: chunk.offset,
                packed_size: chunk.packed_size,
                size: chunk.size,
                mip_start: chunk.mip_start,
                mip_end: chunk.mip_end,
            })
        })
        .collect::<Result<Vec<_>, ArchiveError>>()?;
    chunks.sort_by_key(|chunk| chunk.mip_start);

    let texture = TextureInfo {
        width: record.width,
        height: record.height,
        mip_count: record.mip_count,
        format: record.format,
        cubemap_flags: record.cubemap_flags,
        chunks,
    };

    let offset = texture.chunks.first().map_or(0, |chunk| chunk.offset);
    let stored_size = texture
        .chunks
        .iter()
        .map(|chunk| {
            u64::from(if chunk.packed_size != 0 {
                chunk.packed_size
            } else {
                chunk.size
            })
        })
        .sum();
    let packed = texture.chunks.iter().any(|chunk| chunk.packed_size != 0);

    Ok(Entry {
        name: Default::default(),
        offset,
        stored_size,
        prefix: 0,
        decoded_size: dds::dds_len(&texture),
        compression: packed.then_some(compression),
        key: HashKey::Ba2 {
            folder: record.dir_hash,
            name: record.name_hash,
            extension: record.extension,
        },
        texture: Some(Box::new(texture)),
    })
}

/// the names at the end of the archive, `None` when the archive doesn't have them
fn read_names(bytes: &[u8], header: &Header) -> Result<Option<Vec<Vec<u8>>>, ArchiveError> {
    let offset = header.name_table_offset;
    if offset == 0 {
        log::warn!("archive has no name table, entries are named after their hashes");
        return Ok(None);
    }
    if offset > bytes.len() as u64 {
        return Err(ArchiveError::corrupt(format!(
            "name table at {offset} is outside the archive"
        )));
    }
    // every name takes at least its two length bytes
    if u64::from(header.file_count) * 2 > bytes.len() as u64 - offset {
        return Err(ArchiveError::corrupt(
            "name table is larger than the rest of the archive",
        ));
    }

    let mut reader = Cursor::new(bytes);
    reader.set_position(offset);
    let table = NameTable::read_args(&mut reader, (header.file_count,))?;
    Ok(Some(table.names))
}

/// name of an entry of an archive without name table
fn fallback_name(folder: u32, name: u32, extension: u32) -> String {
    let extension: String = extension
        .to_le_bytes()
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as char)
        .collect();
    format!("{folder:08x}\\{name:08x}.{extension}")
}

fn check_bounds(offset: u64, size: u32, len: u64) -> Result<(), ArchiveError> {
    match offset.checked_add(u64::from(size)) {
        Some(end) if end <= len => Ok(()),
        _ => Err(ArchiveError::corrupt(format!(
            "data at offset {offset} with size {size} is outside the archive"
        ))),
    }
}
