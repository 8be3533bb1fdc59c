use std::path::PathBuf;

use anstream::println;
use anyhow::Context;
use bsa_archive::{Archive, ArchiveError, FileEntry};
use clap::{Parser, ValueHint};
use indicatif::ParallelProgressIterator;
use owo_colors::OwoColorize;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use super::utils;

#[derive(Parser)]
#[command(arg_required_else_help = true)]
pub struct Commands {
    /// path to input archive
    #[arg(value_hint = ValueHint::FilePath, value_parser = utils::is_file)]
    pub input: PathBuf,
    /// output folder, if empty a folder with the same name as input will be used
    #[arg(value_hint = ValueHint::DirPath)]
    pub output_folder: Option<PathBuf>,
    /// only extract files matching this pattern, like `textures\*.dds`
    #[arg(long, short = 'p')]
    pub pattern: Option<String>,
}

impl Commands {
    /// handle the user command
    pub fn start(self, archive: Archive) -> anyhow::Result<()> {
        utils::print_metadata(archive.metadata());

        let output = self
            .output_folder
            .unwrap_or_else(|| self.input.with_extension(""));

        println!("{} output folder: {}", "[+]".green(), output.display());

        if !output.is_dir() {
            println!("{} creating output folder", "[+]".green());
            std::fs::create_dir_all(&output).context("failed to create output folder")?;
        }

        // we collect everything in a vector so rayon can access them in random order
        let files: Vec<FileEntry> = match &self.pattern {
            Some(pattern) => archive.find(pattern).collect(),
            None => archive.entries().collect(),
        };

        if files.is_empty() {
            anyhow::bail!("no file in the archive matched, there is nothing to extract");
        }

        println!("{} starting the extraction", "[+]".green());

        let pb = utils::progress_bar(files.len() as _);

        let extracted = files
            .into_par_iter()
            .map_with(pb.clone(), |pb, entry| -> Result<usize, ExtractError> {
                let Some(path) = utils::output_path(&output, entry.path()) else {
                    pb.println(format!(
                        "{} skipping '{}' because it points outside of the output folder",
                        "[!]".yellow(),
                        entry.path()
                    ));
                    return Ok(0);
                };

                // create output dir if not exist
                if let Some(parent) = path.parent() {
                    if !parent.is_dir() {
                        std::fs::create_dir_all(parent)?;
                    }
                }

                let bytes = entry.read().map_err(|source| ExtractError::Entry {
                    path: entry.path().to_owned(),
                    source,
                })?;

                // write to disk
                std::fs::write(&path, &bytes)?;

                pb.set_message(entry.path().to_owned());

                Ok(1)
            })
            .progress_with(pb.clone())
            .try_reduce(|| 0_usize, |a, b| Ok(a + b))
            .context("extraction failed")?;

        pb.finish_with_message(
            "extraction finished"
                .if_supports_color(owo_colors::Stream::Stdout, |t| t.green())
                .to_string(),
        );

        println!(
            "{} extraction finished, {} files saved in '{}'",
            "[+]".green(),
            extracted,
            output.display()
        );

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
enum ExtractError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to read '{path}' from the archive")]
    Entry {
        path: String,
        #[source]
        source: ArchiveError,
    },
}
