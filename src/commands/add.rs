use std::path::PathBuf;

use anstream::println;
use anyhow::Context;
use bsa_archive::{Archive, ArchiveFormat};
use clap::{Parser, ValueHint};
use owo_colors::OwoColorize;

use super::{open_archive, utils};

#[derive(Parser)]
#[command(arg_required_else_help = true)]
pub struct Commands {
    /// path to the morrowind archive
    #[arg(value_hint = ValueHint::FilePath)]
    pub archive: PathBuf,
    /// files or folders to append, folders are walked recursively
    #[arg(value_hint = ValueHint::AnyPath, required = true)]
    pub inputs: Vec<PathBuf>,
    /// folder the archive names are relative to, like `Data Files`
    #[arg(long, short = 'b', value_hint = ValueHint::DirPath)]
    pub base: Option<PathBuf>,
    /// create a new empty archive when it doesn't exist
    #[arg(long, short = 'c', default_value_t = false, required = false)]
    pub create: bool,
}

impl Commands {
    /// handle the user command
    pub fn start(self, format: Option<ArchiveFormat>) -> anyhow::Result<()> {
        let mut archive = if self.create && !self.archive.exists() {
            println!(
                "{} creating new archive: {}",
                "[+]".green(),
                self.archive.display()
            );
            Archive::create(&self.archive).context("failed to create archive")?
        } else {
            open_archive(&self.archive, format)?
        };

        utils::print_metadata(archive.metadata());

        if !archive.format().is_mutable() {
            anyhow::bail!(
                "only morrowind archives can be appended to, this one is {:?}",
                archive.format()
            );
        }

        let mut files = Vec::new();
        for input in &self.inputs {
            if input.is_dir() {
                // without a base, files of a folder are named relative to it
                let base = self.base.as_deref().unwrap_or(input);
                files.extend(
                    utils::list_files(input)
                        .into_iter()
                        .map(|path| (utils::archive_name(&path, Some(base)), path)),
                );
            } else if input.is_file() {
                let name = match &self.base {
                    Some(base) => utils::archive_name(input, Some(base)),
                    None => input
                        .file_name()
                        .and_then(|name| utils::archive_name(name.as_ref(), None)),
                };
                files.push((name, input.clone()));
            } else {
                anyhow::bail!("'{}' is not a file or a folder", input.display());
            }
        }

        if files.is_empty() {
            anyhow::bail!("no file found in the inputs, there is nothing to add");
        }

        println!("{} found {} files to add", "[+]".green(), files.len());

        let pb = utils::progress_bar(files.len() as _);

        for (name, path) in files {
            let name = name.with_context(|| {
                format!("can't make an archive name for '{}'", path.display())
            })?;

            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;

            archive
                .append(&name, &bytes)
                .with_context(|| format!("failed to append '{name}'"))?;

            log::info!("added {name} ({} bytes)", bytes.len());
            pb.set_message(name);
            pb.inc(1);
        }

        pb.finish_with_message(
            "append finished"
                .if_supports_color(owo_colors::Stream::Stdout, |t| t.green())
                .to_string(),
        );

        println!(
            "{} archive now holds {} files",
            "[+]".green(),
            archive.len()
        );

        Ok(())
    }
}
