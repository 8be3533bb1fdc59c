//! oblivion, fallout 3 / new vegas, skyrim and skyrim special edition archives

use ahash::HashMap;
use binrw::{BinRead, Endian, VecArgs, io::Cursor};

use super::{
    entry::{Compression, Entry, HashKey, NameArena},
    error::ArchiveError,
};
use crate::{
    hash, path,
    structures::{
        common::{self, MAX_FILE_NAME_LEN},
        tes4::{
            FILE_RECORD_SIZE, FILE_SIZE_COMPRESSION, FileRecord, FolderRecord, HEADER_SIZE, Header,
            VERSION_SSE,
        },
    },
};

/// index of a compressed family archive, entries are kept in declaration order
#[derive(Debug, Clone)]
pub(crate) struct Tes4Index {
    pub version: u32,
    pub entries: Vec<Entry>,
    pub names: NameArena,
    /// folder hash -> file hash -> position in `entries`
    folders: HashMap<u64, HashMap<u64, usize>>,
}

/// a folder and its file records, before names are known
struct FolderBlock {
    hash: u64,
    name: Option<Vec<u8>>,
    files: Vec<FileRecord>,
}

impl Tes4Index {
    pub fn parse(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let len = bytes.len() as u64;
        let mut reader = Cursor::new(bytes);
        let header = Header::read(&mut reader)?;
        log::debug!("compressed archive header: {header:?}");

        let tables = u64::from(header.folder_count) * header.folder_record_size()
            + u64::from(header.file_count) * FILE_RECORD_SIZE;
        if tables > len - u64::from(HEADER_SIZE) {
            return Err(ArchiveError::corrupt(
                "folder and file tables are larger than the entire archive",
            ));
        }

        let folder_records = Vec::<FolderRecord>::read_options(
            &mut reader,
            Endian::Little,
            VecArgs {
                count: header.folder_count as usize,
                inner: (header.version,),
            },
        )?;

        let declared_files: u64 = folder_records.iter().map(|f| u64::from(f.file_count)).sum();
        if declared_files != u64::from(header.file_count) {
            return Err(ArchiveError::corrupt(format!(
                "folders declare {declared_files} files but the header declares {}",
                header.file_count
            )));
        }

        let mut folder_names_left = header.folder_names_length;
        let mut blocks = Vec::with_capacity(folder_records.len());
        for record in &folder_records {
            let name = if header.has_folder_names() {
                let start = reader.position();
                let name = common::read_bzstring(&mut reader, Endian::Little, ())?;
                // the declared length, not counting its own byte
                let declared = (reader.position() - start - 1) as u32;
                folder_names_left = folder_names_left
                    .checked_sub(declared)
                    .ok_or_else(|| {
                        ArchiveError::corrupt("folder names are longer than the header declares")
                    })?;
                Some(name)
            } else {
                None
            };

            let files = Vec::<FileRecord>::read_options(
                &mut reader,
                Endian::Little,
                VecArgs {
                    count: record.file_count as usize,
                    inner: (),
                },
            )?;

            blocks.push(FolderBlock {
                hash: record.hash,
                name,
                files,
            });
        }

        let file_names = if header.has_file_names() {
            Some(read_file_names(&mut reader, &header)?)
        } else {
            None
        };

        let mut index = Self {
            version: header.version,
            entries: Vec::with_capacity(header.file_count as usize),
            names: NameArena::with_capacity(bytes.len().min(header.file_names_length as usize) * 2),
            folders: HashMap::default(),
        };

        let mut file_names = file_names.into_iter().flatten();
        for block in blocks {
            let folder = match &block.name {
                Some(name) => ascii_name(name)?.to_owned(),
                None => format!("{:016x}", block.hash),
            };

            if index.folders.contains_key(&block.hash) {
                return Err(ArchiveError::corrupt(format!(
                    "duplicate folder hash {:#018x}",
                    block.hash
                )));
            }
            let bucket = index.folders.entry(block.hash).or_default();

            for record in block.files {
                let mut entry = resolve_entry(bytes, &header, &record)?;

                let name = match file_names.next() {
                    Some(name) => Some(ascii_name(&name)?.to_owned()),
                    None if header.has_embedded_names() => embedded_name(bytes, &entry)?,
                    None => None,
                };
                let full_path = match name {
                    // embedded names already carry their folder
                    Some(name) if !header.has_file_names() => name,
                    Some(name) if folder.is_empty() => name,
                    Some(name) => format!("{folder}\\{name}"),
                    None => {
                        log::warn!(
                            "file {:#018x} in '{folder}' has no name, using its hash",
                            record.hash
                        );
                        format!("{folder}\\{:016x}", record.hash)
                    }
                };

                entry.name = index.names.push(&full_path);
                entry.key = HashKey::Tes4 {
                    folder: block.hash,
                    file: record.hash,
                };

                if bucket.insert(record.hash, index.entries.len()).is_some() {
                    return Err(ArchiveError::corrupt(format!(
                        "duplicate file hash {:#018x} in folder '{folder}'",
                        record.hash
                    )));
                }
                index.entries.push(entry);
            }
        }

        log::debug!(
            "loaded {} entries in {} folders",
            index.entries.len(),
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
        let folder = hash::tes4_folder_hash(split.folder);
        let file = hash::tes4_hash(split.stem, split.extension);

        let idx = *self.folders.get(&folder)?.get(&file)?;
        self.entries.get(idx)
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }
}

/// the file name block, one NUL terminated name per file in declaration order
fn read_file_names(
    reader: &mut Cursor<&[u8]>,
    header: &Header,
) -> Result<Vec<Vec<u8>>, ArchiveError> {
    let mut left = header.file_names_length;
    let mut names = Vec::with_capacity(header.file_count as usize);

    for idx in 0..header.file_count {
        let name = common::read_zstring(&mut *reader, Endian::Little, (MAX_FILE_NAME_LEN,))?;
        if name.is_empty() {
            return Err(ArchiveError::corrupt(format!("file {idx} has an empty name")));
        }

        left = left.checked_sub(name.len() as u32 + 1).ok_or_else(|| {
            ArchiveError::corrupt("file names are longer than the header declares")
        })?;
        names.push(name);
    }

    if left != 0 {
        log::debug!("{left} unused bytes after the file name block");
    }
    Ok(names)
}

/// work out where the payload of a file starts and how big it is once decoded
fn resolve_entry(bytes: &[u8], header: &Header, record: &FileRecord) -> Result<Entry, ArchiveError> {
    let compressed =
        header.compressed_by_default() != (record.size & FILE_SIZE_COMPRESSION != 0);
    let offset = u64::from(record.offset);
    let stored_size = u64::from(record.size & !FILE_SIZE_COMPRESSION);

    let stored = offset
        .checked_add(stored_size)
        .and_then(|end| bytes.get(offset as usize..end as usize))
        .ok_or_else(|| {
            ArchiveError::corrupt(format!(
                "file at offset {offset} with size {stored_size} is outside the archive"
            ))
        })?;

    let mut prefix = 0_u64;
    if header.has_embedded_names() {
        let name_len = stored.first().copied().ok_or_else(|| {
            ArchiveError::corrupt(format!("file at offset {offset} has no embedded name"))
        })?;
        prefix += 1 + u64::from(name_len);
    }

    let (decoded_size, compression) = if compressed {
        let decoded_size = stored
            .get(prefix as usize..prefix as usize + 4)
            .and_then(|size| size.try_into().ok())
            .map(u32::from_le_bytes)
            .ok_or_else(|| {
                ArchiveError::corrupt(format!("file at offset {offset} has no decoded size"))
            })?;
        prefix += 4;

        let compression = if header.version == VERSION_SSE {
            Compression::Lz4Frame
        } else {
            Compression::Zlib
        };
        (u64::from(decoded_size), Some(compression))
    } else {
        let decoded_size = stored_size.checked_sub(prefix).ok_or_else(|| {
            ArchiveError::corrupt(format!("embedded name of file at offset {offset} is too long"))
        })?;
        (decoded_size, None)
    };

    Ok(Entry {
        name: Default::default(),
        offset,
        stored_size,
        prefix,
        decoded_size,
        compression,
        key: HashKey::Tes4 { folder: 0, file: 0 },
        texture: None,
    })
}

/// the full path stored in front of the payload of archives with embedded names
fn embedded_name(bytes: &[u8], entry: &Entry) -> Result<Option<String>, ArchiveError> {
    let start = entry.offset as usize;
    let name_len = bytes.get(start).copied().unwrap_or_default() as usize;
    let name = bytes
        .get(start + 1..start + 1 + name_len)
        .ok_or_else(|| ArchiveError::corrupt("embedded name is outside the archive"))?;

    if name.is_empty() {
        return Ok(None);
    }
    Ok(Some(ascii_name(name)?.to_owned()))
}

fn ascii_name(name: &[u8]) -> Result<&str, ArchiveError> {
    if !name.is_ascii() {
        return Err(ArchiveError::corrupt(format!(
            "name {:?} isn't ascii",
            String::from_utf8_lossy(name)
        )));
    }
    std::str::from_utf8(name).map_err(|_| ArchiveError::corrupt("name isn't valid utf-8"))
}
