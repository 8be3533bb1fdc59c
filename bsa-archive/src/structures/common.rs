//! string readers shared between the archive families

use std::io::Seek;

use binrw::{BinRead, BinResult, Error, VecArgs, parser};

/// longest file name the oblivion family accepts, terminator included
pub const MAX_FILE_NAME_LEN: usize = 256;

/// a string prefixed by a single length byte, the length count a trailing NUL
/// that must be the only NUL of the string
#[parser(reader, endian)]
pub fn read_bzstring() -> BinResult<Vec<u8>> {
    let count = u8::read_options(reader, endian, ())? as usize;
    let pos = reader.stream_position()?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut bytes = Vec::<u8>::read_options(reader, endian, VecArgs { count, inner: () })?;
    if bytes.iter().position(|&c| c == 0) != Some(count - 1) {
        return Err(Error::AssertFail {
            pos,
            message: format!("string isn't terminated at its declared length {count}"),
        });
    }

    bytes.pop();
    Ok(bytes)
}

/// a NUL terminated string that can't be longer than `max` bytes (terminator included)
#[parser(reader, endian)]
pub fn read_zstring(max: usize) -> BinResult<Vec<u8>> {
    let pos = reader.stream_position()?;
    let mut bytes = Vec::new();
    loop {
        match u8::read_options(reader, endian, ())? {
            0 => return Ok(bytes),
            c if bytes.len() + 1 < max => bytes.push(c),
            _ => {
                return Err(Error::AssertFail {
                    pos,
                    message: format!("string is longer than {} bytes", max - 1),
                });
            }
        }
    }
}

/// a string prefixed by its length as u16, without terminator
#[parser(reader, endian)]
pub fn read_wstring() -> BinResult<Vec<u8>> {
    let count = u16::read_options(reader, endian, ())? as usize;
    Vec::<u8>::read_options(reader, endian, VecArgs { count, inner: () })
}
