//! Shared path utilities: default roots, sidecar association, hidden entries.

use std::env;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// File extension (without the dot) of checksum sidecar files.
pub const SIDECAR_EXTENSION: &str = "sha1";

/// Repository location relative to the user's home directory.
pub const DEFAULT_REPOSITORY_RELATIVE: &str = ".m2/repository";

/// Resolve the user's home directory, falling back to `/tmp` when unset.
///
/// Resolved once per process, so the fallback warning is printed at most once
/// however many config defaults ask for it.
pub fn home_dir() -> PathBuf {
    static HOME: OnceLock<PathBuf> = OnceLock::new();
    HOME.get_or_init(|| resolve_home(env::var_os("HOME"))).clone()
}

fn resolve_home(raw: Option<OsString>) -> PathBuf {
    raw.filter(|home| !home.is_empty()).map_or_else(
        || {
            eprintln!("[RCV-CONFIG] WARNING: HOME not set, falling back to /tmp");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

/// Default root scanned when no directories are given.
pub fn default_repository_root() -> PathBuf {
    home_dir().join(DEFAULT_REPOSITORY_RELATIVE)
}

/// Sidecar path for an archive: `<archive>.sha1`.
pub fn sidecar_path_for(archive: &Path) -> PathBuf {
    let mut name: OsString = archive.as_os_str().to_owned();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// Target path for a sidecar: the sidecar path with its final extension removed.
///
/// Returns `None` when the path has no extension to strip.
pub fn target_path_for(sidecar: &Path) -> Option<PathBuf> {
    sidecar.extension()?;
    Some(sidecar.with_extension(""))
}

/// Whether a root-relative path is hidden (its first segment starts with `.`).
pub fn is_hidden_relative(relative: &Path) -> bool {
    match relative.components().next() {
        Some(Component::Normal(first)) => first.to_string_lossy().starts_with('.'),
        Some(Component::CurDir | Component::ParentDir) => true,
        _ => false,
    }
}

/// Make a root path absolute and normalized without resolving symlinks.
///
/// Relative paths are joined onto CWD; `..`/`.` are resolved syntactically so
/// reported paths keep the names the user typed.
pub fn absolutize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}
