use std::path::{Component, Path, PathBuf};

use anstream::println;
use bsa_archive::Metadata;
use owo_colors::OwoColorize;

pub fn is_file(path: &str) -> Result<PathBuf, String> {
    let path = Path::new(path);
    if !path.is_file() {
        return Err("You need to pass a valid file path.".to_owned());
    }
    Ok(path.to_path_buf())
}

pub fn list_files(input: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| {
            let f = e.ok()?;
            if f.path().is_dir() {
                return None;
            }
            Some(f.path().to_path_buf())
        })
        .collect()
}

/// turn a file on disk into the name it gets inside the archive
pub fn archive_name(path: &Path, base: Option<&Path>) -> Option<String> {
    let path = match base {
        Some(base) => path.strip_prefix(base).ok()?,
        None => path,
    };

    let parts = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    (!parts.is_empty()).then(|| parts.join("\\"))
}

/// turn an archive name into a path under `output`, `None` when it would escape it
pub fn output_path(output: &Path, name: &str) -> Option<PathBuf> {
    let mut path = output.to_path_buf();
    for part in name.split(['\\', '/']).filter(|part| !part.is_empty()) {
        if part == "." || part == ".." || part.contains(':') {
            return None;
        }
        path.push(part);
    }
    (path != output).then_some(path)
}

/// print the archive metadata to stdout
pub fn print_metadata(metadata: Metadata) {
    println!(
        concat!(
            "{} loaded archive metadata:\n",
            " {dot} format: {:?}\n",
            " {dot} folder count: {}\n",
            " {dot} file count: {}\n",
            " {dot} size: {} bytes",
        ),
        "[?]".green(),
        metadata.format,
        metadata.folder_count,
        metadata.file_count,
        metadata.archive_size,
        dot = "|>".cyan(),
    )
}

pub fn progress_bar(len: u64) -> indicatif::ProgressBar {
    let style = indicatif::ProgressStyle::with_template(
        "{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] [{pos:>4}/{len:4}] {msg}",
    )
    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
    .progress_chars("=> ");

    indicatif::ProgressBar::new(len).with_style(style).with_prefix(
        "[P]"
            .if_supports_color(owo_colors::Stream::Stdout, |t| t.green())
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_names_use_backslashes() {
        let base = Path::new("data");
        assert_eq!(
            archive_name(Path::new("data/meshes/a.nif"), Some(base)).as_deref(),
            Some("meshes\\a.nif")
        );
        assert_eq!(
            archive_name(Path::new("./meshes/a.nif"), None).as_deref(),
            Some("meshes\\a.nif")
        );
        assert_eq!(archive_name(Path::new("other/a.nif"), Some(base)), None);
        assert_eq!(archive_name(Path::new("data"), Some(base)), None);
    }

    #[test]
    fn output_paths_stay_inside_the_output_folder() {
        let output = Path::new("out");
        assert_eq!(
            output_path(output, "meshes\\m\\a.nif"),
            Some(PathBuf::from("out").join("meshes").join("m").join("a.nif"))
        );
        assert_eq!(
            output_path(output, "\\textures/b.dds"),
            Some(PathBuf::from("out").join("textures").join("b.dds"))
        );
        assert_eq!(output_path(output, "..\\..\\evil.txt"), None);
        assert_eq!(output_path(output, "c:\\windows\\a.dll"), None);
        assert_eq!(output_path(output, "\\\\"), None);
    }
}
