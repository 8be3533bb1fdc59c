//! morrowind archives, the only family that can be written to

use std::{
    fs::{File, OpenOptions},
    io::{Seek, SeekFrom, Write},
    path::Path,
};

use binrw::{BinRead, BinWrite, io::Cursor};

use super::{
    entry::{Entry, HashKey, NameArena},
    error::ArchiveError,
};
use crate::{
    hash, path,
    provider::ArchiveProvider,
    structures::tes3::{Directory, FILE_RECORD_SIZE, FileRecord, HEADER_SIZE, Header, NameHash},
};

/// flat index of a morrowind archive, entries are kept sorted by offset
#[derive(Debug, Clone, Default)]
pub(crate) struct Tes3Index {
    pub entries: Vec<Entry>,
    pub names: NameArena,
}

impl Tes3Index {
    pub fn parse(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let len = bytes.len() as u64;
        let mut reader = Cursor::new(bytes);
        let header = Header::read(&mut reader)?;
        log::debug!("morrowind archive header: {header:?}");

        let file_count = u64::from(header.file_count);
        let directory_size = u64::from(header.directory_size);
        let body = len - HEADER_SIZE;

        // every file needs at least a record, a one char name and a hash
        if file_count * 21 > body || directory_size + 8 * file_count > body {
            return Err(ArchiveError::corrupt(
                "directory information is larger than the entire archive",
            ));
        }

        let names_len = directory_size.checked_sub(12 * file_count).ok_or_else(|| {
            ArchiveError::corrupt("directory is too small for the number of files")
        })?;

        let Directory {
            records,
            name_offsets,
            mut names,
            hashes,
        } = Directory::read_args(&mut reader, (header.file_count, names_len as u32))?;

        let mut names_end = 0;
        let mut spans = Vec::with_capacity(name_offsets.len());
        for (idx, &name_offset) in name_offsets.iter().enumerate() {
            let start = name_offset as usize;
            let tail = names.get(start..).filter(|tail| !tail.is_empty()).ok_or_else(|| {
                ArchiveError::corrupt(format!("name of file {idx} starts outside the name table"))
            })?;
            let name_len = memchr_nul(tail).ok_or_else(|| {
                ArchiveError::corrupt(format!("name of file {idx} isn't NUL terminated"))
            })?;

            names_end = names_end.max(start + name_len + 1);
            spans.push((start, name_len));
        }

        // what's left after the last name is only padding
        names.truncate(names_end);
        let names = NameArena::from_bytes(names)?;

        let data_offset = HEADER_SIZE + directory_size + 8 * file_count;
        let mut entries = Vec::with_capacity(records.len());

        for ((record, (start, name_len)), key) in records.iter().zip(spans).zip(&hashes) {
            let offset = data_offset + u64::from(record.offset);
            let size = u64::from(record.size);
            if offset + size > len {
                return Err(ArchiveError::corrupt(format!(
                    "file at offset {offset} with size {size} is outside the archive"
                )));
            }

            let name = names.span(start, name_len).ok_or_else(|| {
                ArchiveError::corrupt(format!("name at {start} isn't on a character boundary"))
            })?;

            entries.push(Entry {
                name,
                offset,
                stored_size: size,
                prefix: 0,
                decoded_size: size,
                compression: None,
                key: HashKey::Tes3 {
                    low: key.low,
                    high: key.high,
                },
                texture: None,
            });
        }

        entries.sort_by_key(|entry| entry.offset);
        log::debug!("loaded {} morrowind entries", entries.len());

        Ok(Self { entries, names })
    }

    /// linear, case insensitive scan of the names, the stored hashes aren't used for lookups
    pub fn lookup(&self, path: &str) -> Option<&Entry> {
        let path = path.trim_matches(['/', '\\']);
        self.entries
            .iter()
            .find(|entry| path::eq_ignore_case(self.names.get(entry.name), path))
    }

    /// append a new file, moving the first payloads out of the way of the bigger directory.
    ///
    /// every payload is written past the end of the archive before the directory is
    /// rewritten. if either step fails the old directory is written back and the archive
    /// is truncated to its original size. the index is replaced as soon as the file holds
    /// the new directory, before the archive is mapped again.
    pub fn append(
        &mut self,
        provider: &mut ArchiveProvider,
        name: &str,
        data: &[u8],
    ) -> Result<(), ArchiveError> {
        validate_name(name)?;
        if self.lookup(name).is_some() {
            return Err(ArchiveError::InvalidName {
                name: name.to_owned(),
                reason: "already in the archive",
            });
        }

        let size = data.len() as u64;
        let file_count = self.entries.len() as u64 + 1;
        let names_len = (self.names.len() + name.len() + 1) as u64;
        let data_start = HEADER_SIZE + FILE_RECORD_SIZE * file_count + names_len;

        // payloads the new directory would overwrite
        let relocated = self
            .entries
            .iter()
            .take_while(|entry| entry.offset < data_start)
            .count();
        let moved = self.entries[..relocated]
            .iter()
            .map(|entry| provider.get_bytes(entry.offset, entry.stored_size).map(<[u8]>::to_vec))
            .collect::<Result<Vec<_>, _>>()?;

        let original_len = provider.len();
        let payload_start = original_len.max(data_start);
        let new_len = payload_start + moved.iter().map(|m| m.len() as u64).sum::<u64>() + size;
        if new_len > u64::from(u32::MAX) {
            return Err(ArchiveError::EntryTooLarge(size));
        }

        log::info!(
            "appending '{name}' ({size} bytes), relocating {relocated} entries past offset {payload_start}"
        );

        // the moved entries and then the new one all land at the end
        let mut entries = self.entries.clone();
        entries.rotate_left(relocated);
        let mut names = self.names.clone();
        let (low, high) = hash::tes3_hash(name);
        entries.push(Entry {
            name: names.push_terminated(name),
            offset: 0,
            stored_size: size,
            prefix: 0,
            decoded_size: size,
            compression: None,
            key: HashKey::Tes3 { low, high },
            texture: None,
        });

        let tail = entries.len() - relocated - 1;
        let mut offset = payload_start;
        let payloads = moved.iter().map(Vec::as_slice).chain([data]);
        for (entry, bytes) in entries[tail..].iter_mut().zip(payloads) {
            entry.offset = offset;
            offset += bytes.len() as u64;
        }

        let directory = directory_bytes(&entries, &names)?;
        let backup = provider
            .get_bytes(0, (directory.len() as u64).min(original_len))?
            .to_vec();

        provider.unmap();
        let result = write_archive(
            provider.path(),
            Rollback {
                original_len,
                directory: &backup,
            },
            payload_start,
            moved.iter().map(Vec::as_slice).chain([data]),
            &directory,
        );
        if result.is_ok() {
            self.entries = entries;
            self.names = names;
        }

        let remapped = provider.remap();
        result?;
        remapped?;
        Ok(())
    }
}

/// write a new, empty archive at the given path, fails if the file already exists
pub(crate) fn create_empty(path: &Path) -> Result<(), ArchiveError> {
    let mut writer = Cursor::new(Vec::with_capacity(HEADER_SIZE as usize));
    Header {
        directory_size: 0,
        file_count: 0,
    }
    .write(&mut writer)?;

    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(&writer.into_inner())?;
    file.sync_all()?;
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ArchiveError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if !name.is_ascii() {
        "name isn't ascii"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else {
        return Ok(());
    };

    Err(ArchiveError::InvalidName {
        name: name.to_owned(),
        reason,
    })
}

/// header, records sorted by hash, names and hashes of the given entries
fn directory_bytes(entries: &[Entry], names: &NameArena) -> Result<Vec<u8>, ArchiveError> {
    let data_offset = entries.first().map_or(HEADER_SIZE, |entry| entry.offset);
    let file_count = entries.len() as u64;
    let directory_size = data_offset - HEADER_SIZE - 8 * file_count;
    let names_len = directory_size - 12 * file_count;

    let name_hash = |entry: &Entry| match entry.key {
        HashKey::Tes3 { low, high } => NameHash { low, high },
        _ => NameHash { low: 0, high: 0 },
    };

    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_by_key(|entry| name_hash(entry));

    let mut name_buffer = names.as_bytes().to_vec();
    name_buffer.resize(names_len as usize, 0);

    let directory = Directory {
        records: sorted
            .iter()
            .map(|entry| FileRecord {
                size: entry.stored_size as u32,
                offset: (entry.offset - data_offset) as u32,
            })
            .collect(),
        name_offsets: sorted.iter().map(|entry| entry.name.offset).collect(),
        names: name_buffer,
        hashes: sorted.iter().map(|entry| name_hash(entry)).collect(),
    };

    let mut writer = Cursor::new(Vec::with_capacity(data_offset as usize));
    Header {
        directory_size: directory_size as u32,
        file_count: file_count as u32,
    }
    .write(&mut writer)?;
    directory.write_args(&mut writer, (file_count as u32, names_len as u32))?;

    Ok(writer.into_inner())
}

/// what it takes to put an archive back the way it was before an append
struct Rollback<'a> {
    original_len: u64,
    /// the bytes the new directory overwrites
    directory: &'a [u8],
}

impl Rollback<'_> {
    fn restore(&self, file: &mut File) {
        log::warn!(
            "append failed, restoring the directory and truncating archive back to {} bytes",
            self.original_len
        );

        let restored = file
            .seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(self.directory))
            .and_then(|_| file.set_len(self.original_len))
            .and_then(|_| file.sync_all());
        if let Err(err) = restored {
            log::error!("failed to restore archive: {err}");
        }
    }
}

fn write_archive<'d>(
    path: &Path,
    rollback: Rollback,
    payload_start: u64,
    payloads: impl Iterator<Item = &'d [u8]>,
    directory: &[u8],
) -> Result<(), ArchiveError> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;

    let written = write_payloads(&mut file, payload_start, payloads).and_then(|_| {
        file.seek(SeekFrom::Start(0))?;
        file.write_all(directory)?;
        file.sync_all()
    });

    if let Err(err) = written {
        rollback.restore(&mut file);
        return Err(err.into());
    }

    Ok(())
}

fn write_payloads<'d>(
    file: &mut File,
    start: u64,
    payloads: impl Iterator<Item = &'d [u8]>,
) -> std::io::Result<()> {
    if file.metadata()?.len() < start {
        file.set_len(start)?;
    }

    file.seek(SeekFrom::Start(start))?;
    for payload in payloads {
        file.write_all(payload)?;
    }
    file.flush()
}

#[inline]
fn memchr_nul(bytes: &[u8]) -> Option<usize> {
    bytes.iter().position(|&c| c == 0)
}
