use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

use crate::{
    ArchiveFormat,
    structures::{ba2, tes3, tes4},
};

/// smallest header of a BA2 archive
const BA2_MIN_HEADER: u64 = 24;

/// detect the format of the archive at the given path.
///
/// files that are too short to hold a header are [`ArchiveFormat::Unknown`].
pub fn detect_format(path: impl AsRef<Path>) -> io::Result<ArchiveFormat> {
    let mut file = File::open(path)?;
    try_detect_format(&mut file)
}

/// try to detect the archive format from the given reader.
/// this function will restore reader position after trying to detect the format.
pub fn try_detect_format<R: Read + Seek>(reader: &mut R) -> io::Result<ArchiveFormat> {
    let pos = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let mut buf = [0_u8; 12];
    let read = len.min(buf.len() as u64) as usize;
    reader.read_exact(&mut buf[..read])?;
    reader.seek(SeekFrom::Start(pos))?;

    Ok(format_of(&buf[..read], len))
}

/// detect the format from the first bytes of an archive of `len` bytes
pub(crate) fn format_of(head: &[u8], len: u64) -> ArchiveFormat {
    let word = |idx: usize| {
        head.get(idx * 4..idx * 4 + 4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
    };

    match (head.get(..4), word(1)) {
        (Some(b"BSA\0"), Some(version)) if len >= u64::from(tes4::HEADER_SIZE) => match version {
            tes4::VERSION_TES4 => ArchiveFormat::CompressedV67,
            tes4::VERSION_FO3 => ArchiveFormat::CompressedV68,
            tes4::VERSION_SSE => ArchiveFormat::CompressedV69,
            _ => ArchiveFormat::Unknown,
        },
        (Some(b"BTDX"), _) if len >= BA2_MIN_HEADER => match head.get(8..12) {
            Some(b"GNRL") => ArchiveFormat::Ba2General,
            Some(b"DX10") => ArchiveFormat::Ba2Texture,
            _ => ArchiveFormat::Unknown,
        },
        _ if word(0) == Some(tes3::MAGIC) && len >= tes3::HEADER_SIZE => {
            ArchiveFormat::Uncompressed
        }
        _ => ArchiveFormat::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use binrw::io::Cursor;

    use super::*;

    fn detect(bytes: &[u8]) -> ArchiveFormat {
        let mut reader = Cursor::new(bytes);
        try_detect_format(&mut reader).expect("cursor never fails")
    }

    fn padded(head: &[u8], len: usize) -> Vec<u8> {
        let mut bytes = head.to_vec();
        bytes.resize(len, 0);
        bytes
    }

    #[test]
    fn detect_every_format() {
        assert_eq!(detect(&padded(b"\x00\x01\0\0", 12)), ArchiveFormat::Uncompressed);
        assert_eq!(detect(&padded(b"BSA\0\x67\0\0\0", 36)), ArchiveFormat::CompressedV67);
        assert_eq!(detect(&padded(b"BSA\0\x68\0\0\0", 36)), ArchiveFormat::CompressedV68);
        assert_eq!(detect(&padded(b"BSA\0\x69\0\0\0", 36)), ArchiveFormat::CompressedV69);
        assert_eq!(detect(&padded(b"BTDX\x01\0\0\0GNRL", 24)), ArchiveFormat::Ba2General);
        assert_eq!(detect(&padded(b"BTDX\x01\0\0\0DX10", 24)), ArchiveFormat::Ba2Texture);
    }

    #[test]
    fn unknown_formats() {
        assert_eq!(detect(b""), ArchiveFormat::Unknown);
        assert_eq!(detect(b"\x00\x01\0\0"), ArchiveFormat::Unknown);
        assert_eq!(detect(&padded(b"BSA\0\x6A\0\0\0", 36)), ArchiveFormat::Unknown);
        assert_eq!(detect(&padded(b"BSA\0\x68\0\0\0", 20)), ArchiveFormat::Unknown);
        assert_eq!(detect(&padded(b"BTDX\x01\0\0\0XXXX", 24)), ArchiveFormat::Unknown);
        assert_eq!(detect(&padded(b"PK\x03\x04", 64)), ArchiveFormat::Unknown);
    }

    #[test]
    fn reader_position_is_restored() {
        let bytes = padded(b"\x00\x01\0\0", 32);
        let mut reader = Cursor::new(&bytes);
        reader.set_position(7);
        try_detect_format(&mut reader).expect("cursor never fails");
        assert_eq!(reader.position(), 7);
    }
}
