use std::{fs::File, io::BufWriter, path::PathBuf};

use anstream::{print, println};
use anyhow::Context;
use bsa_archive::{
    Archive, FileEntry,
    archive::entry::{Compression, HashKey},
};
use clap::{Parser, ValueHint};
use owo_colors::OwoColorize;
use serde::Serialize;

use super::utils;

#[derive(Parser)]
#[command(arg_required_else_help = true)]
pub struct Commands {
    /// path to input archive
    #[arg(value_hint = ValueHint::FilePath, value_parser = utils::is_file)]
    pub input: PathBuf,
    /// output json file, if empty a json file with the same name of input archive will be created
    pub output: Option<PathBuf>,
}

impl Commands {
    /// handle the user command
    pub fn start(self, archive: Archive) -> anyhow::Result<()> {
        let metadata = archive.metadata();
        utils::print_metadata(metadata);

        let output = self
            .output
            .unwrap_or_else(|| self.input.with_extension("json"));

        println!("{} output file: {}", "[+]".green(), output.display());
        print!("{} serializing entries to json", "[+]".green());

        let dump = Dump {
            format: format!("{:?}", metadata.format),
            archive_size: metadata.archive_size,
            folder_count: metadata.folder_count,
            entries: archive.entries().map(DumpEntry::from).collect(),
        };

        let writer =
            BufWriter::new(File::create(output).context("failed to create output json file")?);

        serde_json::to_writer_pretty(writer, &dump).context("failed to serialize entries")?;

        println!(": Done");

        Ok(())
    }
}

#[derive(Serialize)]
struct Dump<'a> {
    format: String,
    archive_size: u64,
    folder_count: usize,
    entries: Vec<DumpEntry<'a>>,
}

#[derive(Serialize)]
struct DumpEntry<'a> {
    path: &'a str,
    offset: u64,
    size: u64,
    packed_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    compression: Option<&'static str>,
    hash: DumpHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    texture: Option<DumpTexture>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DumpHash {
    Tes3 { low: u32, high: u32 },
    Tes4 { folder: u64, file: u64 },
    Ba2 { folder: u32, name: u32, extension: u32 },
}

#[derive(Serialize)]
struct DumpTexture {
    width: u16,
    height: u16,
    mip_count: u8,
    dxgi_format: u8,
    chunks: usize,
}

impl<'a> From<FileEntry<'a>> for DumpEntry<'a> {
    fn from(entry: FileEntry<'a>) -> Self {
        let compression = entry.compression().map(|compression| match compression {
            Compression::Zlib => "zlib",
            Compression::Lz4Frame => "lz4_frame",
            Compression::Lz4Block => "lz4_block",
        });

        let hash = match entry.hash_key() {
            HashKey::Tes3 { low, high } => DumpHash::Tes3 { low, high },
            HashKey::Tes4 { folder, file } => DumpHash::Tes4 { folder, file },
            HashKey::Ba2 {
                folder,
                name,
                extension,
            } => DumpHash::Ba2 {
                folder,
                name,
                extension,
            },
        };

        Self {
            path: entry.path(),
            offset: entry.offset(),
            size: entry.decoded_size(),
            packed_size: entry.packed_size(),
            compression,
            hash,
            texture: entry.texture().map(|texture| DumpTexture {
                width: texture.width,
                height: texture.height,
                mip_count: texture.mip_count,
                dxgi_format: texture.format,
                chunks: texture.chunks.len(),
            }),
        }
    }
}
