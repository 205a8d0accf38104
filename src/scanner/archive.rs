//! Structural validation of zip-format archives (`.jar` and friends).
//!
//! Every non-directory entry is decompressed to end-of-stream so the zip
//! reader runs its size and CRC-32 checks.

use std::fs::File;
use std::io;
use std::path::Path;

use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

/// Why an archive failed structural validation.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{0}")]
    Open(io::Error),

    #[error("{0}")]
    Container(ZipError),

    #[error("{name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("entry #{index}: {source}")]
    EntryHeader {
        index: usize,
        #[source]
        source: ZipError,
    },
}

/// Open `path` as a zip container and read every file entry to the end.
pub fn validate_archive(path: &Path) -> Result<(), ArchiveError> {
    let file = File::open(path).map_err(ArchiveError::Open)?;
    let mut archive = ZipArchive::new(file).map_err(ArchiveError::Container)?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source| ArchiveError::EntryHeader { index, source })?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        io::copy(&mut entry, &mut io::sink())
            .map_err(|source| ArchiveError::Entry { name, source })?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;
    use std::path::Path;

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Write a zip with the given `(name, contents)` entries plus one directory marker.
    pub fn write_zip(path: &Path, entries: &[(&str, &[u8])], method: CompressionMethod) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(method);
        zip.add_directory("META-INF/", options).unwrap();
        for (name, contents) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap();
    }

    /// Three-entry deflated jar used across tests.
    pub fn write_sample_jar(path: &Path) {
        write_zip(
            path,
            &[
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
                ("com/example/Lib.class", &[0xca, 0xfe, 0xba, 0xbe, 0, 0, 0, 52]),
                ("com/example/lib.properties", b"name=lib\nversion=1.0\n"),
            ],
            CompressionMethod::Deflated,
        );
    }
}
