//! helpers to work with the virtual paths stored inside archives
//!
//! archives store paths with `\` separators and the engines look them up
//! case insensitively, so everything here treats `/` and `\` as the same
//! character and ignores ascii case.

/// a virtual path split into the pieces hashed formats key their entries on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPath<'a> {
    /// everything before the last separator, empty for top level files
    pub folder: &'a str,
    /// file name without its extension
    pub stem: &'a str,
    /// extension including the leading dot, empty if there is none
    pub extension: &'a str,
}

/// lowercase the path, use `\` as separator and drop leading/trailing separators
pub fn normalize(path: &str) -> String {
    path.trim_matches(is_separator)
        .chars()
        .map(|c| match c {
            '/' => '\\',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// split a path in folder, stem and extension.
///
/// a name that only starts with a dot (`.hidden`) has no extension, the same way
/// [`std::path::Path::extension`] treats it.
pub fn split(path: &str) -> SplitPath<'_> {
    let (folder, name) = match path.rfind(is_separator) {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    };

    let (stem, extension) = match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) => name.split_at(idx),
    };

    SplitPath {
        folder,
        stem,
        extension,
    }
}

/// compare two virtual paths, ignoring ascii case and separator style
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes()
            .zip(b.bytes())
            .all(|(a, b)| normalize_byte(a) == normalize_byte(b))
}

/// check whatever `path` match the given glob `pattern`.
///
/// - `*` match any run of characters inside a single path component
/// - `?` match exactly one character that isn't a separator
///
/// when the pattern has no separator it's matched against the file name only,
/// so `*.nif` finds every mesh no matter how deep it is.
pub fn matches_pattern(pattern: &str, path: &str) -> bool {
    let pattern = pattern.trim_matches(is_separator).as_bytes();
    let path = path.trim_matches(is_separator);

    let path = if pattern.iter().any(|&c| is_separator(c as char)) {
        path
    } else {
        path.rsplit(is_separator).next().unwrap_or(path)
    };

    glob(pattern, path.as_bytes())
}

fn glob(pattern: &[u8], input: &[u8]) -> bool {
    let (mut p, mut i) = (0, 0);
    // last `*` we can go back to, and the input position it's currently matched up to
    let mut backtrack: Option<(usize, usize)> = None;

    while i < input.len() {
        let c = normalize_byte(input[i]);
        match pattern.get(p).copied().map(normalize_byte) {
            Some(b'*') => {
                backtrack = Some((p, i));
                p += 1;
                continue;
            }
            Some(b'?') if c != b'\\' => {
                p += 1;
                i += 1;
                continue;
            }
            Some(expected) if expected != b'?' && expected == c => {
                p += 1;
                i += 1;
                continue;
            }
            _ => {}
        }

        // mismatch, let the last star eat one more char unless it would cross a separator
        match backtrack {
            Some((star, start)) if normalize_byte(input[start]) != b'\\' => {
                backtrack = Some((star, start + 1));
                p = star + 1;
                i = start + 1;
            }
            _ => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

#[inline]
fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

#[inline]
fn normalize_byte(c: u8) -> u8 {
    match c {
        b'/' => b'\\',
        c => c.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_paths() {
        assert_eq!(normalize("Meshes/Clutter/Bucket.NIF"), "meshes\\clutter\\bucket.nif");
        assert_eq!(normalize("\\textures\\sky\\"), "textures\\sky");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn split_paths() {
        let split_path = split("textures\\armor\\iron\\cuirass.dds");
        assert_eq!(split_path.folder, "textures\\armor\\iron");
        assert_eq!(split_path.stem, "cuirass");
        assert_eq!(split_path.extension, ".dds");

        let split_path = split("readme");
        assert_eq!(split_path.folder, "");
        assert_eq!(split_path.stem, "readme");
        assert_eq!(split_path.extension, "");

        let split_path = split("sound/.hidden");
        assert_eq!(split_path.folder, "sound");
        assert_eq!(split_path.stem, ".hidden");
        assert_eq!(split_path.extension, "");

        let split_path = split("a\\b.tar.gz");
        assert_eq!(split_path.stem, "b.tar");
        assert_eq!(split_path.extension, ".gz");
    }

    #[test]
    fn compare_paths() {
        assert!(eq_ignore_case("Meshes/a.NIF", "meshes\\a.nif"));
        assert!(!eq_ignore_case("meshes\\a.nif", "meshes\\b.nif"));
        assert!(!eq_ignore_case("meshes", "meshes\\"));
    }

    #[test]
    fn star_stays_inside_a_component() {
        assert!(matches_pattern("meshes\\*.nif", "meshes\\bucket.nif"));
        assert!(!matches_pattern("meshes\\*.nif", "meshes\\clutter\\bucket.nif"));
        assert!(matches_pattern("meshes/*/*.nif", "Meshes\\Clutter\\Bucket.NIF"));
        assert!(matches_pattern("meshes\\*", "meshes\\bucket.nif"));
    }

    #[test]
    fn pattern_without_separator_matches_file_name() {
        assert!(matches_pattern("*.nif", "meshes\\clutter\\bucket.nif"));
        assert!(matches_pattern("bucket.*", "meshes\\clutter\\bucket.nif"));
        assert!(!matches_pattern("*.dds", "meshes\\clutter\\bucket.nif"));
        assert!(matches_pattern("*", "a\\b\\c"));
    }

    #[test]
    fn question_mark_is_a_single_char() {
        assert!(matches_pattern("icon?.dds", "icons\\icon1.dds"));
        assert!(!matches_pattern("icon?.dds", "icons\\icon12.dds"));
        assert!(!matches_pattern("a?b", "a\\b"));
    }

    #[test]
    fn star_backtracks() {
        assert!(matches_pattern("*a*b", "xxaxxab"));
        assert!(matches_pattern("*.*.nif", "a.b.c.nif"));
        assert!(!matches_pattern("*ab", "xxaxxa"));
    }
}
