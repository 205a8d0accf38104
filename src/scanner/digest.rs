//! SHA-1 digests: the fixed 20-byte value and streaming file hashing.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Serialize, Serializer};
use sha1::{Digest as _, Sha1};

/// Length in bytes of a SHA-1 digest.
pub const DIGEST_LEN: usize = 20;

/// Number of hex characters that encode a digest.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// Default read size used when streaming files through the hasher.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Immutable 20-byte SHA-1 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Parse exactly 40 hex characters (either case).
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        if hex_str.len() != DIGEST_HEX_LEN {
            return None;
        }
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(hex_str, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Digest of an in-memory buffer.
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        finalize(hasher)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Stream a file through SHA-1 in `chunk_size` reads.
///
/// Memory use is bounded by the chunk buffer regardless of file size.
pub fn compute_file_digest(path: &Path, chunk_size: usize) -> io::Result<Digest> {
    let file = File::open(path)?;
    digest_reader(file, chunk_size)
}

/// Stream any reader through SHA-1 in `chunk_size` reads.
pub fn digest_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<Digest> {
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(finalize(hasher))
}

fn finalize(hasher: Sha1) -> Digest {
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&hasher.finalize());
    Digest(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // SHA-1("abc"), FIPS 180-1 test vector.
    const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    #[test]
    fn known_vector_matches() {
        assert_eq!(Digest::of_bytes(b"abc").to_hex(), ABC_SHA1);
    }

    #[test]
    fn file_digest_matches_buffer_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.jar");
        std::fs::write(&path, b"abc").unwrap();
        let digest = compute_file_digest(&path, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(digest.to_hex(), ABC_SHA1);
    }

    #[test]
    fn empty_file_has_well_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jar");
        std::fs::write(&path, b"").unwrap();
        let digest = compute_file_digest(&path, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(
            digest.to_hex(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = compute_file_digest(Path::new("/definitely/missing/lib.jar"), 16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn from_hex_accepts_uppercase() {
        let upper = ABC_SHA1.to_ascii_uppercase();
        assert_eq!(
            Digest::from_hex(&upper),
            Some(Digest::of_bytes(b"abc"))
        );
    }

    #[test]
    fn from_hex_rejects_wrong_length_and_non_hex() {
        assert_eq!(Digest::from_hex(&ABC_SHA1[..39]), None);
        assert_eq!(Digest::from_hex(&format!("{ABC_SHA1}0")), None);
        assert_eq!(Digest::from_hex(&"zz".repeat(20)), None);
    }

    #[test]
    fn display_and_serialize_use_lowercase_hex() {
        let digest = Digest::of_bytes(b"abc");
        assert_eq!(digest.to_string(), ABC_SHA1);
        assert_eq!(
            serde_json::to_string(&digest).unwrap(),
            format!("\"{ABC_SHA1}\"")
        );
    }

    proptest! {
        #[test]
        fn chunk_size_does_not_change_digest(
            data in proptest::collection::vec(any::<u8>(), 0..4096),
            chunk in 1usize..600,
        ) {
            let streamed = digest_reader(data.as_slice(), chunk).unwrap();
            prop_assert_eq!(streamed, Digest::of_bytes(&data));
        }

        #[test]
        fn hex_rendering_parses_back(bytes in any::<[u8; 20]>()) {
            let digest = Digest::from_bytes(bytes);
            prop_assert_eq!(Digest::from_hex(&digest.to_hex()), Some(digest));
        }
    }
}
