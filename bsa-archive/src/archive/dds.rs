//! rebuild the DDS file of a BA2 texture from its record and chunks
//!
//! BA2 texture archives only store the pixel data, the DDS header is
//! synthesized from the record the same way the game tools do it.

use binrw::{BinWrite, io::Cursor};

use super::{
    decompress,
    entry::{Compression, TextureInfo},
    error::ArchiveError,
};

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PITCH: u32 = 0x8;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x20000;
const DDSD_LINEARSIZE: u32 = 0x80000;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;

/// cubemap flag plus all six faces
const DDSCAPS2_CUBEMAP_ALL_FACES: u32 = 0xFE00;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_ALPHA: u32 = 0x2;
const DDPF_FOURCC: u32 = 0x4;
const DDPF_RGB: u32 = 0x40;
const DDPF_LUMINANCE: u32 = 0x2_0000;

const DDS_DIMENSION_TEXTURE2D: u32 = 3;
const DDS_RESOURCE_MISC_TEXTURECUBE: u32 = 0x4;

/// value of the cubemap field of texture records that hold a cubemap
const BA2_CUBEMAP: u16 = 2049;

const HEADER_SIZE: u32 = 124;
const PIXEL_FORMAT_SIZE: u32 = 32;
const DX10_HEADER_SIZE: usize = 20;

/// DXGI format codes the header synthesis knows about
mod dxgi {
    pub const R8G8B8A8_UNORM: u8 = 28;
    pub const R8G8B8A8_UNORM_SRGB: u8 = 29;
    pub const R8G8B8A8_UINT: u8 = 30;
    pub const R8G8B8A8_SINT: u8 = 32;
    pub const R8G8_UNORM: u8 = 49;
    pub const R8G8_UINT: u8 = 50;
    pub const R8G8_SINT: u8 = 52;
    pub const R8_UNORM: u8 = 61;
    pub const R8_UINT: u8 = 62;
    pub const R8_SNORM: u8 = 63;
    pub const R8_SINT: u8 = 64;
    pub const A8_UNORM: u8 = 65;
    pub const BC1_UNORM: u8 = 71;
    pub const BC1_UNORM_SRGB: u8 = 72;
    pub const BC2_UNORM: u8 = 74;
    pub const BC2_UNORM_SRGB: u8 = 75;
    pub const BC3_UNORM: u8 = 77;
    pub const BC3_UNORM_SRGB: u8 = 78;
    pub const BC4_UNORM: u8 = 80;
    pub const BC4_SNORM: u8 = 81;
    pub const BC5_UNORM: u8 = 83;
    pub const BC5_SNORM: u8 = 84;
    pub const B5G6R5_UNORM: u8 = 85;
    pub const B5G5R5A1_UNORM: u8 = 86;
    pub const B8G8R8A8_UNORM: u8 = 87;
    pub const B8G8R8X8_UNORM: u8 = 88;
    pub const B8G8R8A8_UNORM_SRGB: u8 = 91;
    pub const B8G8R8X8_UNORM_SRGB: u8 = 93;
    pub const BC6H_UF16: u8 = 95;
    pub const BC6H_SF16: u8 = 96;
    pub const BC7_UNORM: u8 = 98;
    pub const BC7_UNORM_SRGB: u8 = 99;
}

#[derive(BinWrite, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[bw(little)]
pub(crate) struct PixelFormat {
    pub size: u32,
    pub flags: u32,
    pub four_cc: u32,
    pub rgb_bit_count: u32,
    pub r_mask: u32,
    pub g_mask: u32,
    pub b_mask: u32,
    pub a_mask: u32,
}

#[derive(BinWrite, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[bw(little)]
pub(crate) struct Dx10Header {
    pub dxgi_format: u32,
    pub resource_dimension: u32,
    pub misc_flags: u32,
    pub array_size: u32,
    pub misc_flags2: u32,
}

/// `DDS ` magic, the legacy header and the DX10 extension when the format needs one
#[derive(BinWrite, Debug, Clone, Default, PartialEq, Eq)]
#[bw(little, magic = b"DDS ")]
pub(crate) struct DdsHeader {
    pub size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mip_map_count: u32,
    pub reserved1: [u32; 11],
    pub pixel_format: PixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,
    pub dx10: Option<Dx10Header>,
}

#[inline]
const fn four_cc(code: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*code)
}

impl DdsHeader {
    /// synthesize the header of the given texture
    pub fn for_texture(texture: &TextureInfo) -> Self {
        let width = u32::from(texture.width);
        let height = u32::from(texture.height);

        let mut header = DdsHeader {
            size: HEADER_SIZE,
            flags: DDSD_CAPS | DDSD_PIXELFORMAT | DDSD_WIDTH | DDSD_HEIGHT | DDSD_MIPMAPCOUNT,
            height,
            width,
            mip_map_count: u32::from(texture.mip_count),
            caps: DDSCAPS_TEXTURE,
            pixel_format: PixelFormat {
                size: PIXEL_FORMAT_SIZE,
                ..Default::default()
            },
            ..Default::default()
        };

        if texture.mip_count > 1 {
            header.caps |= DDSCAPS_MIPMAP | DDSCAPS_COMPLEX;
        }

        let mut misc_flags = 0;
        if texture.cubemap_flags == BA2_CUBEMAP {
            header.caps |= DDSCAPS_COMPLEX;
            header.caps2 = DDSCAPS2_CUBEMAP_ALL_FACES;
            misc_flags = DDS_RESOURCE_MISC_TEXTURECUBE;
        }

        let pf = &mut header.pixel_format;
        let mut dx10 = false;

        use dxgi::*;
        match texture.format {
            // block compressed formats with a legacy four cc
            BC1_UNORM | BC2_UNORM | BC3_UNORM | BC4_SNORM | BC4_UNORM | BC5_SNORM | BC5_UNORM => {
                let (code, linear_size) = match texture.format {
                    BC1_UNORM => (b"DXT1", width * height / 2),
                    BC2_UNORM => (b"DXT3", width * height),
                    BC3_UNORM => (b"DXT5", width * height),
                    BC4_SNORM => (b"BC4S", width * height / 2),
                    BC4_UNORM => (b"BC4U", width * height / 2),
                    BC5_SNORM => (b"BC5S", width * height),
                    _ => (b"BC5U", width * height),
                };
                header.flags |= DDSD_LINEARSIZE;
                pf.flags = DDPF_FOURCC;
                pf.four_cc = four_cc(code);
                header.pitch_or_linear_size = linear_size;
            }
            // block compressed formats that need the DX10 extension
            BC1_UNORM_SRGB | BC2_UNORM_SRGB | BC3_UNORM_SRGB | BC6H_UF16 | BC6H_SF16
            | BC7_UNORM | BC7_UNORM_SRGB => {
                header.flags |= DDSD_LINEARSIZE;
                header.pitch_or_linear_size = if texture.format == BC1_UNORM_SRGB {
                    width * height / 2
                } else {
                    width * height
                };
                dx10 = true;
            }
            // uncompressed formats that need the DX10 extension
            B8G8R8A8_UNORM_SRGB | B8G8R8X8_UNORM_SRGB | R8G8B8A8_SINT | R8G8B8A8_UINT
            | R8G8B8A8_UNORM_SRGB | R8G8_SINT | R8G8_UINT | R8_SINT | R8_SNORM | R8_UINT => {
                header.flags |= DDSD_PITCH;
                header.pitch_or_linear_size = match texture.format {
                    R8G8_SINT | R8G8_UINT => width * 2,
                    R8_SINT | R8_SNORM | R8_UINT => width,
                    _ => width * 4,
                };
                dx10 = true;
            }
            // uncompressed formats described by bit masks
            R8G8B8A8_UNORM => {
                header.flags |= DDSD_PITCH;
                header.pitch_or_linear_size = width * 4;
                *pf = masks(pf.size, DDPF_RGB | DDPF_ALPHAPIXELS, 32, [0xFF, 0xFF00, 0xFF_0000, 0xFF00_0000]);
            }
            B8G8R8A8_UNORM => {
                header.flags |= DDSD_PITCH;
                header.pitch_or_linear_size = width * 4;
                *pf = masks(pf.size, DDPF_RGB | DDPF_ALPHAPIXELS, 32, [0xFF_0000, 0xFF00, 0xFF, 0xFF00_0000]);
            }
            B8G8R8X8_UNORM => {
                header.flags |= DDSD_PITCH;
                header.pitch_or_linear_size = width * 4;
                *pf = masks(pf.size, DDPF_RGB, 32, [0xFF_0000, 0xFF00, 0xFF, 0]);
            }
            B5G6R5_UNORM => {
                header.flags |= DDSD_PITCH;
                header.pitch_or_linear_size = width * 2;
                *pf = masks(pf.size, DDPF_RGB, 16, [0xF800, 0x07E0, 0x001F, 0]);
            }
            B5G5R5A1_UNORM => {
                header.flags |= DDSD_PITCH;
                header.pitch_or_linear_size = width * 2;
                *pf = masks(pf.size, DDPF_RGB | DDPF_ALPHAPIXELS, 16, [0x7C00, 0x03E0, 0x001F, 0x8000]);
            }
            R8G8_UNORM => {
                header.flags |= DDSD_PITCH;
                header.pitch_or_linear_size = width * 2;
                *pf = masks(pf.size, DDPF_LUMINANCE | DDPF_ALPHAPIXELS, 16, [0xFF, 0, 0, 0xFF00]);
            }
            A8_UNORM => {
                header.flags |= DDSD_PITCH;
                header.pitch_or_linear_size = width;
                *pf = masks(pf.size, DDPF_ALPHA, 8, [0, 0, 0, 0xFF]);
            }
            R8_UNORM => {
                header.flags |= DDSD_PITCH;
                header.pitch_or_linear_size = width;
                *pf = masks(pf.size, DDPF_LUMINANCE, 8, [0xFF, 0, 0, 0]);
            }
            code => log::warn!("unknown DXGI format {code}, writing an empty pixel format"),
        }

        if dx10 {
            let pf = &mut header.pixel_format;
            pf.flags = DDPF_FOURCC;
            pf.four_cc = four_cc(b"DX10");
            header.dx10 = Some(Dx10Header {
                dxgi_format: u32::from(texture.format),
                resource_dimension: DDS_DIMENSION_TEXTURE2D,
                misc_flags,
                array_size: 1,
                misc_flags2: 0,
            });
        }

        header
    }

    /// size of the encoded header, magic included
    pub fn encoded_len(&self) -> usize {
        4 + HEADER_SIZE as usize + self.dx10.map_or(0, |_| DX10_HEADER_SIZE)
    }
}

fn masks(size: u32, flags: u32, rgb_bit_count: u32, [r, g, b, a]: [u32; 4]) -> PixelFormat {
    PixelFormat {
        size,
        flags,
        four_cc: 0,
        rgb_bit_count,
        r_mask: r,
        g_mask: g,
        b_mask: b,
        a_mask: a,
    }
}

/// size of the whole DDS file of a texture
pub(crate) fn dds_len(texture: &TextureInfo) -> u64 {
    let pixels: u64 = texture.chunks.iter().map(|c| u64::from(c.size)).sum();
    DdsHeader::for_texture(texture).encoded_len() as u64 + pixels
}

/// write the DDS file of `texture`, `bytes` is the whole archive
pub(crate) fn assemble(
    texture: &TextureInfo,
    bytes: &[u8],
    compression: Compression,
) -> Result<Vec<u8>, ArchiveError> {
    let header = DdsHeader::for_texture(texture);
    let header_len = header.encoded_len();
    let pixels: usize = texture.chunks.iter().map(|c| c.size as usize).sum();

    let mut writer = Cursor::new(Vec::with_capacity(header_len + pixels));
    header.write(&mut writer)?;
    let mut output = writer.into_inner();
    debug_assert_eq!(output.len(), header_len);
    output.resize(header_len + pixels, 0);

    let mut cursor = header_len;
    for chunk in &texture.chunks {
        let stored = if chunk.packed_size != 0 { chunk.packed_size } else { chunk.size };
        let input = chunk_bytes(bytes, chunk.offset, stored)?;
        let target = &mut output[cursor..cursor + chunk.size as usize];

        if chunk.packed_size != 0 {
            decompress::decompress_into(input, compression, target)?;
        } else {
            target.copy_from_slice(input);
        }

        cursor += chunk.size as usize;
    }

    Ok(output)
}

fn chunk_bytes(bytes: &[u8], offset: u64, size: u32) -> Result<&[u8], ArchiveError> {
    usize::try_from(offset)
        .ok()
        .and_then(|start| bytes.get(start..start.checked_add(size as usize)?))
        .ok_or_else(|| ArchiveError::corrupt(format!("texture chunk at {offset} is outside the archive")))
}
