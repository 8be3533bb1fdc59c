use std::path::Path;

use anstream::println;
use anyhow::Context;
use bsa_archive::{Archive, ArchiveFormat};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;

pub mod add;
pub mod dump;
pub mod extract;
pub mod list;
mod utils;

#[derive(Parser)]
#[command(name = "bsatool", author, version, arg_required_else_help = true)]
pub struct Commands {
    #[command(subcommand)]
    pub operation: Operation,
    /// Which archive layout to expect
    #[arg(short = 'f', long, default_value_t = Format::Auto, value_enum, global = true)]
    pub format: Format,
    /// print more logs, can be repeated
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Commands {
    /// handle the user command
    pub fn start(self) -> anyhow::Result<()> {
        let format = self.format.into();

        match self.operation {
            Operation::List(commands) => {
                let archive = open_archive(&commands.input, format)?;
                commands.start(archive)
            }
            Operation::Extract(commands) => {
                let archive = open_archive(&commands.input, format)?;
                commands.start(archive)
            }
            Operation::Dump(commands) => {
                let archive = open_archive(&commands.input, format)?;
                commands.start(archive)
            }
            Operation::Add(commands) => commands.start(format),
        }
    }
}

#[derive(Subcommand)]
pub enum Operation {
    /// list the files inside an archive
    List(list::Commands),
    /// extract files from an archive
    Extract(extract::Commands),
    /// append files to a morrowind archive
    Add(add::Commands),
    /// dump the archive directory as json
    Dump(dump::Commands),
}

#[derive(ValueEnum, Copy, Clone, Debug, Default)]
pub enum Format {
    /// detect the layout from the archive header
    #[default]
    Auto,
    /// morrowind
    Tes3,
    /// oblivion
    Tes4,
    /// fallout 3, new vegas and skyrim
    Fo3,
    /// skyrim special edition
    Sse,
    /// fallout 4 and starfield general archives
    Ba2,
    /// fallout 4 and starfield texture archives
    Ba2Dx10,
}

impl From<Format> for Option<ArchiveFormat> {
    fn from(value: Format) -> Self {
        match value {
            Format::Auto => None,
            Format::Tes3 => Some(ArchiveFormat::Uncompressed),
            Format::Tes4 => Some(ArchiveFormat::CompressedV67),
            Format::Fo3 => Some(ArchiveFormat::CompressedV68),
            Format::Sse => Some(ArchiveFormat::CompressedV69),
            Format::Ba2 => Some(ArchiveFormat::Ba2General),
            Format::Ba2Dx10 => Some(ArchiveFormat::Ba2Texture),
        }
    }
}

fn open_archive(path: &Path, format: Option<ArchiveFormat>) -> anyhow::Result<Archive> {
    let archive = match format {
        Some(format) => Archive::open_as(path, format),
        None => Archive::open(path),
    }
    .with_context(|| format!("failed to load archive '{}'", path.display()))?;

    if format.is_some_and(|format| format != archive.format()) {
        println!(
            "{} archive header says {:?}, the {:?} parser was used",
            "[!]".yellow(),
            archive.format(),
            format.unwrap_or(ArchiveFormat::Unknown)
        );
    }

    Ok(archive)
}
