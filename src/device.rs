use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const CLIPPINGS_FILE: &str = "my clippings.txt";

// Kindle keeps it under `documents/`; allow one extra level for odd mounts.
const MAX_DEPTH: usize = 3;

#[derive(Debug)]
pub enum DeviceError {
    DeviceNotMounted(PathBuf),
    ClippingsNotFound(PathBuf),
    CopyFailed { from: PathBuf, to: PathBuf, message: String },
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::DeviceNotMounted(path) => {
                write!(f, "Kindle is not mounted at '{}'", path.display())
            }
            DeviceError::ClippingsNotFound(path) => {
                write!(f, "Couldn't find \"My Clippings.txt\" under '{}'", path.display())
            }
            DeviceError::CopyFailed { from, to, message } => {
                write!(
                    f,
                    "Failed to copy '{}' to '{}': {}",
                    from.display(),
                    to.display(),
                    message
                )
            }
        }
    }
}

impl std::error::Error for DeviceError {}

pub fn find_clippings(mount_root: &Path) -> Result<PathBuf, DeviceError> {
    if !mount_root.is_dir() {
        return Err(DeviceError::DeviceNotMounted(mount_root.to_path_buf()));
    }

    WalkDir::new(mount_root)
        .max_depth(MAX_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| {
            e.file_type().is_file()
                && e.file_name().to_string_lossy().to_lowercase() == CLIPPINGS_FILE
        })
        .map(|e| e.path().to_path_buf())
        .ok_or_else(|| DeviceError::ClippingsNotFound(mount_root.to_path_buf()))
}

/// Copies the device's clippings file to `dest`, returning the bytes copied.
pub fn copy_from_device(mount_root: &Path, dest: &Path) -> Result<u64, DeviceError> {
    let source = find_clippings(mount_root)?;
    let copy_failed = |e: std::io::Error| DeviceError::CopyFailed {
        from: source.clone(),
        to: dest.to_path_buf(),
        message: e.to_string(),
    };

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(copy_failed)?;
    }
    let bytes = std::fs::copy(&source, dest).map_err(copy_failed)?;

    info!(from = %source.display(), to = %dest.display(), bytes, "copied clippings from device");
    Ok(bytes)
}
