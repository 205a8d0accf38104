//! Role classification of visited files by name suffix.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use crate::core::paths::{SIDECAR_EXTENSION, sidecar_path_for, target_path_for};

/// What a visited file is, as far as verification is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRole {
    /// A `.sha1` checksum file for `target`.
    Sidecar { target: PathBuf },
    /// An archive whose checksum, if any, lives at `sidecar`.
    Archive { sidecar: PathBuf },
    /// Anything else: counted, never given an outcome.
    Ignored,
}

/// Suffix-based classifier for a fixed set of archive extensions.
#[derive(Debug, Clone)]
pub struct Classifier {
    archive_suffixes: Vec<String>,
}

impl Classifier {
    /// Build from bare extensions such as `"jar"`.
    pub fn new<I, S>(archive_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            archive_suffixes: archive_extensions
                .into_iter()
                .map(|ext| format!(".{}", ext.as_ref()))
                .collect(),
        }
    }

    /// Classify `path`. Sidecars win over archives; matching is case-sensitive.
    pub fn classify(&self, path: &Path) -> FileRole {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return FileRole::Ignored;
        };

        if name.len() > SIDECAR_EXTENSION.len() + 1
            && name.ends_with(&format!(".{SIDECAR_EXTENSION}"))
            && let Some(target) = target_path_for(path)
        {
            return FileRole::Sidecar { target };
        }

        if self
            .archive_suffixes
            .iter()
            .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix.as_str()))
        {
            return FileRole::Archive {
                sidecar: sidecar_path_for(path),
            };
        }

        FileRole::Ignored
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(["jar"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_maps_to_target() {
        let role = Classifier::default().classify(Path::new("/repo/a/lib-1.0.jar.sha1"));
        assert_eq!(
            role,
            FileRole::Sidecar {
                target: PathBuf::from("/repo/a/lib-1.0.jar")
            }
        );
    }

    #[test]
    fn pom_sidecar_is_still_a_sidecar() {
        let role = Classifier::default().classify(Path::new("/repo/a/lib-1.0.pom.sha1"));
        assert_eq!(
            role,
            FileRole::Sidecar {
                target: PathBuf::from("/repo/a/lib-1.0.pom")
            }
        );
    }

    #[test]
    fn archive_maps_to_sidecar() {
        let role = Classifier::default().classify(Path::new("/repo/a/lib-1.0.jar"));
        assert_eq!(
            role,
            FileRole::Archive {
                sidecar: PathBuf::from("/repo/a/lib-1.0.jar.sha1")
            }
        );
    }

    #[test]
    fn other_files_are_ignored() {
        let classifier = Classifier::default();
        for name in [
            "/repo/a/lib-1.0.pom",
            "/repo/a/lib-1.0.jar.md5",
            "/repo/a/_remote.repositories",
            "/repo/a/lib-1.0.JAR",
            "/repo/a/lib-1.0.jar.lastUpdated",
        ] {
            assert_eq!(classifier.classify(Path::new(name)), FileRole::Ignored, "{name}");
        }
    }

    #[test]
    fn bare_suffix_names_are_ignored() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify(Path::new("/repo/.jar")), FileRole::Ignored);
        assert_eq!(classifier.classify(Path::new("/repo/.sha1")), FileRole::Ignored);
    }

    #[test]
    fn configured_extensions_are_archives() {
        let classifier = Classifier::new(["jar", "war", "aar"]);
        assert!(matches!(
            classifier.classify(Path::new("/repo/app.war")),
            FileRole::Archive { .. }
        ));
        assert!(matches!(
            classifier.classify(Path::new("/repo/ui.aar")),
            FileRole::Archive { .. }
        ));
        assert_eq!(
            classifier.classify(Path::new("/repo/app.ear")),
            FileRole::Ignored
        );
    }
}
