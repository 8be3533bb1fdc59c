//! payload decoders, every call owns its own codec state

use std::io::Read;

use super::{entry::Compression, error::DecompressError};

/// decode `input` into a buffer of exactly `decoded_size` bytes
pub(crate) fn decompress_buf(
    input: &[u8],
    compression: Compression,
    decoded_size: usize,
) -> Result<Vec<u8>, DecompressError> {
    let output = match compression {
        Compression::Zlib => {
            let mut output = vec![0_u8; decoded_size];
            let written = inflate(input, &mut output)?;
            output.truncate(written);
            output
        }
        Compression::Lz4Frame => {
            let mut output = Vec::with_capacity(decoded_size);
            lz4_flex::frame::FrameDecoder::new(input)
                .take(decoded_size as u64 + 1)
                .read_to_end(&mut output)
                .map_err(|err| match err.into_inner() {
                    Some(inner) => match inner.downcast::<lz4_flex::frame::Error>() {
                        Ok(err) => DecompressError::Lz4Frame(*err),
                        Err(inner) => DecompressError::Io(std::io::Error::other(inner)),
                    },
                    None => DecompressError::Io(std::io::ErrorKind::InvalidData.into()),
                })?;
            output
        }
        Compression::Lz4Block => lz4_flex::block::decompress(input, decoded_size)?,
    };

    if output.len() != decoded_size {
        return Err(DecompressError::SizeMismatch {
            expected: decoded_size as u64,
            actual: output.len() as u64,
        });
    }

    Ok(output)
}

/// decode `input` straight into `output`, which must be exactly the decoded size
pub(crate) fn decompress_into(
    input: &[u8],
    compression: Compression,
    output: &mut [u8],
) -> Result<(), DecompressError> {
    let written = match compression {
        Compression::Zlib => inflate(input, output)?,
        Compression::Lz4Block => lz4_flex::block::decompress_into(input, output)?,
        Compression::Lz4Frame => {
            let bytes = decompress_buf(input, compression, output.len())?;
            output.copy_from_slice(&bytes);
            bytes.len()
        }
    };

    if written != output.len() {
        return Err(DecompressError::SizeMismatch {
            expected: output.len() as u64,
            actual: written as u64,
        });
    }

    Ok(())
}

/// inflate a whole zlib stream, the stream must end inside `output`
fn inflate(input: &[u8], output: &mut [u8]) -> Result<usize, DecompressError> {
    let mut decompress = flate2::Decompress::new(true);
    let status = decompress.decompress(input, output, flate2::FlushDecompress::Finish)?;
    let written = decompress.total_out() as usize;

    // a stream that didn't end with every output byte used has more to give
    if status != flate2::Status::StreamEnd && written == output.len() {
        return Err(DecompressError::Overflow(output.len() as u64));
    }

    Ok(written)
}
