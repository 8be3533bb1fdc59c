use std::io;

use crate::ArchiveFormat;

/// errors that can happen while opening, reading or appending to an archive
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("unrecognized archive format")]
    UnrecognizedFormat,
    #[error("archive is truncated or corrupt: {0}")]
    TruncatedOrCorrupt(String),
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    #[error("failed to decompress entry")]
    DecompressionFailure(#[from] DecompressError),
    #[error("operation isn't supported by {0:?} archives")]
    UnsupportedOperation(ArchiveFormat),
    #[error("invalid entry name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("entry of {0} bytes doesn't fit in the archive")]
    EntryTooLarge(u64),
}

impl ArchiveError {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::TruncatedOrCorrupt(message.into())
    }
}

impl From<binrw::Error> for ArchiveError {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(err) if err.kind() != io::ErrorKind::UnexpectedEof => Self::Io(err),
            binrw::Error::BadMagic { .. } => Self::UnrecognizedFormat,
            err if err.is_eof() => Self::corrupt("unexpected end of archive"),
            err => Self::corrupt(err.to_string()),
        }
    }
}

/// errors of the payload decoders
#[derive(Debug, thiserror::Error)]
pub enum DecompressError {
    #[error("failed to decompress using zlib")]
    Zlib(#[from] flate2::DecompressError),
    #[error("failed to decompress lz4 frame")]
    Lz4Frame(#[from] lz4_flex::frame::Error),
    #[error("failed to decompress lz4 block")]
    Lz4Block(#[from] lz4_flex::block::DecompressError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("decompressed data doesn't fit in the declared {0} bytes")]
    Overflow(u64),
    #[error("decompressed {actual} bytes but the entry declares {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
}
