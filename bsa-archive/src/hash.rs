//! name hashes used by the archive families to key their entries
//!
//! every function here is pure, they normalize their input the same way the
//! game engines do (lowercase, `/` becomes `\`) before hashing it.

/// hash stored next to every entry of a morrowind archive, returned as `(low, high)`.
///
/// the name is hashed as given, callers decide how it's spelled on disk.
pub fn tes3_hash(name: &str) -> (u32, u32) {
    // bytes are widened the way a signed `char` is, so names with
    // bytes >= 0x80 keep the hashes the original tools produced
    let widen = |c: u8| c as i8 as i32 as u32;

    let bytes = name.as_bytes();
    let (first, second) = bytes.split_at(bytes.len() >> 1);

    let mut low = 0_u32;
    for (i, &c) in first.iter().enumerate() {
        low ^= widen(c) << ((i as u32 * 8) & 0x1F);
    }

    let mut high = 0_u32;
    for (i, &c) in second.iter().enumerate() {
        let temp = widen(c) << ((i as u32 * 8) & 0x1F);
        high ^= temp;
        high = high.rotate_right(temp & 0x1F);
    }

    (low, high)
}

/// hash of a folder path inside the oblivion family of archives
pub fn tes4_folder_hash(folder: &str) -> u64 {
    tes4_hash(folder, "")
}

/// hash of a file name inside the oblivion family of archives.
///
/// `stem` is the name without its extension and `extension` include the leading dot.
pub fn tes4_hash(stem: &str, extension: &str) -> u64 {
    let stem = normalize(stem);
    let len = stem.len();
    if len == 0 {
        return 0;
    }

    let mut hash = u64::from(stem[len - 1]);
    if len >= 3 {
        hash |= u64::from(stem[len - 2]) << 8;
    }
    hash |= (len as u64) << 16;
    hash |= u64::from(stem[0]) << 24;

    if len >= 4 {
        hash = hash.wrapping_add(u64::from(rolling_hash(&stem[1..len - 2])) << 32);
    }

    if extension.is_empty() {
        return hash;
    }

    let extension = normalize(extension);
    hash |= match extension.as_slice() {
        b".kf" => 0x80,
        b".nif" => 0x8000,
        b".dds" => 0x8080,
        b".wav" => 0x8000_0000,
        _ => 0,
    };

    hash.wrapping_add(u64::from(rolling_hash(&extension)) << 32)
}

/// hash of a folder path or file stem inside a BA2 archive
pub fn ba2_hash(name: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(!0);
    for c in name.bytes().filter(u8::is_ascii) {
        hasher.update(&[normalize_byte(c)]);
    }
    // the game doesn't invert the crc on either end
    !hasher.finalize()
}

/// extension key inside a BA2 archive, the first four bytes after the dot packed little endian
pub fn ba2_extension_hash(extension: &str) -> u32 {
    let extension = extension.strip_prefix('.').unwrap_or(extension);
    let mut packed = [0_u8; 4];
    for (slot, c) in packed.iter_mut().zip(extension.bytes()) {
        *slot = normalize_byte(c);
    }
    u32::from_le_bytes(packed)
}

fn rolling_hash(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0_u32, |hash, &c| {
        hash.wrapping_mul(0x1003F).wrapping_add(u32::from(c))
    })
}

#[inline]
fn normalize_byte(c: u8) -> u8 {
    match c {
        b'/' => b'\\',
        c => c.to_ascii_lowercase(),
    }
}

fn normalize(s: &str) -> Vec<u8> {
    s.bytes().map(normalize_byte).collect()
}
