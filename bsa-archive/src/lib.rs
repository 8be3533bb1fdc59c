//! read Bethesda BSA and BA2 archives, and append to morrowind ones
//!
//! ```no_run
//! use bsa_archive::Archive;
//!
//! let archive = Archive::open("Morrowind.bsa")?;
//! for entry in archive.entries() {
//!     println!("{} ({} bytes)", entry.path(), entry.decoded_size());
//! }
//! let mesh = archive.read_path("meshes\\m\\probe_journeyman_01.nif")?;
//! # Ok::<(), bsa_archive::ArchiveError>(())
//! ```

pub use archive::{Archive, Metadata, entry::FileEntry, error::ArchiveError};
pub use utils::{detect_format, try_detect_format};

pub mod archive;
pub mod hash;
pub mod path;
pub mod provider;

mod structures;
mod utils;

/// every archive layout the crate can detect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// morrowind, the only format that can be appended to
    Uncompressed,
    /// oblivion
    CompressedV67,
    /// fallout 3, new vegas and skyrim
    CompressedV68,
    /// skyrim special edition
    CompressedV69,
    /// fallout 4 / starfield general files
    Ba2General,
    /// fallout 4 / starfield textures
    Ba2Texture,
    Unknown,
}

impl ArchiveFormat {
    /// whatever entries can be appended to archives of this format
    pub fn is_mutable(self) -> bool {
        self == Self::Uncompressed
    }
}
