//! Hash-tracked backup of the game executable.
//!
//! A copy of the executable is taken before the first patch. Later runs
//! compare the live image against the recorded hashes so that re-patching
//! our own output never overwrites the pristine copy, while a replaced
//! executable (game update, manual reinstall) gets a fresh backup.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No backup found for {0}")]
    Missing(PathBuf),
}

/// Hashes recorded alongside the backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Hash of the executable when the backup was taken
    pub original_hash: String,

    /// Hash of the executable after our last patch
    pub patched_hash: String,
}

impl BackupMetadata {
    pub fn new(hash: String) -> Self {
        BackupMetadata {
            original_hash: hash.clone(),
            patched_hash: hash,
        }
    }
}

/// SHA-256 of a file, hex encoded
pub fn hash_file(path: &Path) -> Result<String, BackupError> {
    let data = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// `haloce.exe` -> (`haloce.exe.bak`, `haloce.exe.bak.json`)
pub fn backup_paths(exe: &Path) -> (PathBuf, PathBuf) {
    let mut backup = exe.as_os_str().to_owned();
    backup.push(".bak");
    let mut metadata = backup.clone();
    metadata.push(".json");
    (PathBuf::from(backup), PathBuf::from(metadata))
}

pub fn read_metadata(metadata_path: &Path) -> Result<Option<BackupMetadata>, BackupError> {
    if !metadata_path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(metadata_path)?;
    Ok(Some(serde_json::from_str(&data)?))
}

pub fn write_metadata(metadata_path: &Path, metadata: &BackupMetadata) -> Result<(), BackupError> {
    fs::write(metadata_path, serde_json::to_string_pretty(metadata)?)?;
    Ok(())
}

/// Whether the live executable needs a new backup.
///
/// A backup without metadata is never overwritten. Otherwise a backup is
/// due only when the executable matches neither recorded hash.
pub fn should_create_backup(
    exe: &Path,
    backup_path: &Path,
    metadata_path: &Path,
) -> Result<bool, BackupError> {
    if !backup_path.exists() {
        return Ok(true);
    }

    let Some(metadata) = read_metadata(metadata_path)? else {
        return Ok(false);
    };

    let current = hash_file(exe)?;
    Ok(current != metadata.original_hash && current != metadata.patched_hash)
}

pub fn create_backup(
    exe: &Path,
    backup_path: &Path,
    metadata_path: &Path,
) -> Result<(), BackupError> {
    fs::copy(exe, backup_path)?;
    write_metadata(metadata_path, &BackupMetadata::new(hash_file(exe)?))?;
    info!(path = %backup_path.display(), "Executable backed up");
    Ok(())
}

/// Record the hash of the executable as we left it after patching.
pub fn update_after_patch(exe: &Path) -> Result<(), BackupError> {
    let (_, metadata_path) = backup_paths(exe);
    let current = hash_file(exe)?;

    let mut metadata =
        read_metadata(&metadata_path)?.unwrap_or_else(|| BackupMetadata::new(current.clone()));
    metadata.patched_hash = current;
    write_metadata(&metadata_path, &metadata)
}

/// Back up `exe` if needed. Returns true when a new backup was written.
pub fn smart_backup(exe: &Path) -> Result<bool, BackupError> {
    let (backup_path, metadata_path) = backup_paths(exe);

    if should_create_backup(exe, &backup_path, &metadata_path)? {
        create_backup(exe, &backup_path, &metadata_path)?;
        Ok(true)
    } else {
        debug!(path = %exe.display(), "Existing backup kept");
        Ok(false)
    }
}

/// Copy the pristine executable back over `exe`.
pub fn restore_backup(exe: &Path) -> Result<(), BackupError> {
    let (backup_path, metadata_path) = backup_paths(exe);
    if !backup_path.exists() {
        return Err(BackupError::Missing(exe.to_path_buf()));
    }
    fs::copy(&backup_path, exe)?;
    let hash = hash_file(exe)?;
    write_metadata(&metadata_path, &BackupMetadata::new(hash))?;
    info!(path = %exe.display(), "Executable restored from backup");
    Ok(())
}
