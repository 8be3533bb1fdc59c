use std::path::PathBuf;

use anstream::println;
use bsa_archive::{Archive, FileEntry, archive::entry::Compression};
use clap::{Parser, ValueHint};
use owo_colors::OwoColorize;

use super::utils;

#[derive(Parser)]
#[command(arg_required_else_help = true)]
pub struct Commands {
    /// path to input archive
    #[arg(value_hint = ValueHint::FilePath, value_parser = utils::is_file)]
    pub input: PathBuf,
    /// only list files matching this pattern, like `meshes\*.nif`
    pub pattern: Option<String>,
    /// print sizes, compression and offsets next to the names
    #[arg(long, short = 'l', default_value_t = false, required = false)]
    pub long: bool,
}

impl Commands {
    /// handle the user command
    pub fn start(self, archive: Archive) -> anyhow::Result<()> {
        if self.long {
            utils::print_metadata(archive.metadata());
        }

        let entries: Vec<FileEntry> = match &self.pattern {
            Some(pattern) => archive.find(pattern).collect(),
            None => archive.entries().collect(),
        };

        for entry in &entries {
            if self.long {
                print_long(entry);
            } else {
                println!("{}", entry.path());
            }
        }

        if self.long {
            println!("{} {} files listed", "[+]".green(), entries.len());
        }

        Ok(())
    }
}

fn print_long(entry: &FileEntry) {
    let compression = match entry.compression() {
        None => "stored",
        Some(Compression::Zlib) => "zlib",
        Some(Compression::Lz4Frame) => "lz4 frame",
        Some(Compression::Lz4Block) => "lz4 block",
    };

    println!(
        "{:>10} {:>10} {:<9} {:#010x} {}",
        entry.decoded_size(),
        entry.packed_size(),
        compression,
        entry.offset(),
        entry.path()
    );
}
