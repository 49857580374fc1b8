//! File helpers for document loading and index snapshots.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Calculate SHA-256 checksum of raw bytes as lowercase hex.
pub fn calculate_checksum(content: &[u8]) -> String {
    let hash = Sha256::digest(content);
    hex::encode(hash)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Sibling path used while a file is being written, e.g. `vectors.bin.tmp`.
pub fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

/// Sibling path an existing file is parked at while it is being replaced.
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".bak")
}

/// Rename each `(staged, target)` pair into place as a group.
///
/// Existing targets are first parked at [`backup_path`]. If any rename fails,
/// targets installed so far are removed and the parked files are moved back,
/// so either every target is new or every target is as it was. Staged files
/// are left for the caller to clean up on error.
pub fn install_staged(pairs: &[(PathBuf, PathBuf)]) -> std::io::Result<()> {
    let mut parked: Vec<(PathBuf, &Path)> = Vec::new();
    let mut installed: Vec<&Path> = Vec::new();

    let result = park_and_install(pairs, &mut parked, &mut installed);

    match result {
        Ok(()) => {
            for (backup, _) in &parked {
                remove_if_exists(backup);
            }
        }
        Err(_) => {
            for target in installed.iter().rev() {
                remove_if_exists(target);
            }
            for (backup, target) in parked.iter().rev() {
                if let Err(e) = fs::rename(backup, target) {
                    tracing::error!(
                        backup = %backup.display(),
                        target = %target.display(),
                        error = %e,
                        "failed to restore parked file"
                    );
                }
            }
        }
    }

    result
}

fn park_and_install<'a>(
    pairs: &'a [(PathBuf, PathBuf)],
    parked: &mut Vec<(PathBuf, &'a Path)>,
    installed: &mut Vec<&'a Path>,
) -> std::io::Result<()> {
    for (_, target) in pairs {
        if fs::symlink_metadata(target).is_ok() {
            let backup = backup_path(target);
            fs::rename(target, &backup)?;
            parked.push((backup, target.as_path()));
        }
    }
    for (staged, target) in pairs {
        fs::rename(staged, target)?;
        installed.push(target.as_path());
    }
    Ok(())
}

/// Write `bytes` to `path` and flush them to disk before returning.
pub fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Best-effort removal; a missing file is not an error.
pub fn remove_if_exists(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary file");
    }
}

/// Read file content with size limit.
pub fn read_file_content(path: &Path, max_size: u64) -> std::io::Result<String> {
    check_file_size(path, max_size)?;
    fs::read_to_string(path)
}

/// Fail with `InvalidData` when the file is larger than `max_size` bytes.
pub fn check_file_size(path: &Path, max_size: u64) -> std::io::Result<()> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }
    Ok(())
}
