//! Campaign progress record (`savegame.bin`).

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::campaign::{
    raw_token, symbolic_difficulty, symbolic_mission, Difficulty, Mission, Variant,
};
use crate::layout::{Blob, LayoutError};

/// Progress record file name, inside the profile directory
pub const FILE_NAME: &str = "savegame.bin";

/// Exact length of a progress record
pub const LENGTH: usize = 0x480000;

/// Offset of the difficulty byte
pub const DIFFICULTY_OFFSET: usize = 0x1E2;

/// Offset and width of the NUL-padded mission token
pub const MISSION_OFFSET: usize = 0x1E8;
pub const MISSION_WIDTH: usize = 32;

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Progress record {path} is {len:#x} bytes, expected {expected:#x}")]
    InvalidLength {
        path: PathBuf,
        len: usize,
        expected: usize,
    },
}

/// In-memory copy of a progress record
pub struct ProgressRecord {
    blob: Blob,
}

impl ProgressRecord {
    /// Blank record, as written for a new profile
    pub fn blank(path: impl Into<PathBuf>) -> Self {
        ProgressRecord {
            blob: Blob::new(path, LENGTH),
        }
    }

    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, ProgressError> {
        let blob = Blob::open_at(path)?;
        if blob.len() != LENGTH {
            return Err(ProgressError::InvalidLength {
                path: blob.path().to_path_buf(),
                len: blob.len(),
                expected: LENGTH,
            });
        }
        Ok(ProgressRecord { blob })
    }

    pub fn path(&self) -> &Path {
        self.blob.path()
    }

    /// Raw mission token, empty for a new save
    pub fn mission_token(&self) -> Result<String, ProgressError> {
        Ok(self.blob.read_str(MISSION_OFFSET, MISSION_WIDTH)?)
    }

    pub fn difficulty_byte(&self) -> Result<u8, ProgressError> {
        Ok(self.blob.read_u8(DIFFICULTY_OFFSET)?)
    }

    pub fn mission(&self, variant: Variant) -> Result<Mission, ProgressError> {
        Ok(symbolic_mission(&self.mission_token()?, variant))
    }

    pub fn difficulty(&self) -> Result<Difficulty, ProgressError> {
        Ok(symbolic_difficulty(self.difficulty_byte()?))
    }

    pub fn set_mission(&mut self, mission: Mission, variant: Variant) -> Result<(), ProgressError> {
        let token = raw_token(mission, variant);
        Ok(self.blob.write_str(MISSION_OFFSET, MISSION_WIDTH, token)?)
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<(), ProgressError> {
        Ok(self.blob.write_u8(DIFFICULTY_OFFSET, difficulty.value())?)
    }

    pub fn save(&self) -> Result<(), ProgressError> {
        self.blob.flush()?;
        Ok(())
    }
}

/// Read the campaign position stored at `path`.
pub fn load_progress(
    path: &Path,
    variant: Variant,
) -> Result<(Mission, Difficulty), ProgressError> {
    let record = ProgressRecord::open_at(path)?;
    let mission = record.mission(variant)?;
    let difficulty = record.difficulty()?;
    debug!(
        path = %path.display(),
        ?mission,
        ?difficulty,
        "Progress loaded"
    );
    Ok((mission, difficulty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_record(path: &Path, token: &[u8], difficulty: u8) {
        let mut data = vec![0u8; LENGTH];
        data[MISSION_OFFSET..MISSION_OFFSET + token.len()].copy_from_slice(token);
        data[DIFFICULTY_OFFSET] = difficulty;
        std::fs::write(path, data).unwrap();
    }

    #[test]
    fn test_blank_record_is_new_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("savegame.bin");
        ProgressRecord::blank(&path).save().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), LENGTH as u64);
        let (mission, difficulty) = load_progress(&path, Variant::Mod).unwrap();
        assert_eq!(mission, Mission::Spv3A10);
        assert_eq!(difficulty, Difficulty::Easy);

        let (mission, _) = load_progress(&path, Variant::Base).unwrap();
        assert_eq!(mission, Mission::PillarOfAutumn);
    }

    #[test]
    fn test_heroic_difficulty_base_variant() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("savegame.bin");
        write_record(&path, b"levels\\b40\\b40", 0x02);

        let (mission, difficulty) = load_progress(&path, Variant::Base).unwrap();
        assert_eq!(mission, Mission::AssaultOnTheControlRoom);
        assert_eq!(difficulty, Difficulty::Heroic);
    }

    #[test]
    fn test_unknown_difficulty_is_normal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("savegame.bin");
        write_record(&path, b"spv3c20", 0x09);

        let (mission, difficulty) = load_progress(&path, Variant::Mod).unwrap();
        assert_eq!(mission, Mission::Spv3C20);
        assert_eq!(difficulty, Difficulty::Normal);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("savegame.bin");
        std::fs::write(&path, vec![0u8; 0x1000]).unwrap();

        let err = load_progress(&path, Variant::Base).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidLength { len: 0x1000, .. }));
    }

    #[test]
    fn test_write_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("savegame.bin");
        write_record(&path, b"spv3d40_with_a_long_trailing_tok", 0);

        let mut record = ProgressRecord::open_at(&path).unwrap();
        record.set_mission(Mission::Spv3B30, Variant::Mod).unwrap();
        record.set_difficulty(Difficulty::Legendary).unwrap();
        record.save().unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), LENGTH);
        assert_eq!(&data[MISSION_OFFSET..MISSION_OFFSET + 8], b"spv3b30\0");
        assert!(data[MISSION_OFFSET + 7..MISSION_OFFSET + MISSION_WIDTH]
            .iter()
            .all(|&b| b == 0));
        assert_eq!(data[DIFFICULTY_OFFSET], 3);
    }
}
