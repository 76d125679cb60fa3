//! Data-driven executable patches.
//!
//! The catalog shipped with the launcher is embedded at compile time from
//! `share/patches.json`. Groups are enabled by their index in the
//! configuration's patch bitmask.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::PatchError;

const PATCHES_JSON: &str = include_str!("../../../../share/patches.json");

static EMBEDDED: Lazy<Result<PatchCatalog, String>> =
    Lazy::new(|| PatchCatalog::from_json(PATCHES_JSON).map_err(|e| e.to_string()));

/// A single byte toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSet {
    pub offset: usize,
    pub original: u8,
    pub patch: u8,
}

impl DataSet {
    /// Byte this data set should hold for the given toggle state
    pub fn desired(&self, enabled: bool) -> u8 {
        if enabled {
            self.patch
        } else {
            self.original
        }
    }
}

/// Named group of byte toggles for one executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchGroup {
    pub name: String,
    /// Executable file name the group applies to
    pub executable: String,
    #[serde(default)]
    pub enabled: bool,
    pub data_sets: Vec<DataSet>,
}

impl PatchGroup {
    /// Whether the group targets `exe`, compared by file name, ignoring case
    pub fn targets(&self, exe: &Path) -> bool {
        exe.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(&self.executable))
    }
}

/// Where a group stands in a given image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupState {
    Original,
    Patched,
    /// Some data sets patched, some not
    Mixed,
    /// At least one byte matches neither value, or lies past the image
    Unknown,
}

impl std::fmt::Display for GroupState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GroupState::Original => "original",
            GroupState::Patched => "patched",
            GroupState::Mixed => "mixed",
            GroupState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchCatalog {
    pub groups: Vec<PatchGroup>,
}

impl PatchCatalog {
    pub fn from_json(json: &str) -> Result<Self, PatchError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The catalog bundled with the launcher, all groups disabled.
    pub fn embedded() -> Result<Self, PatchError> {
        EMBEDDED
            .as_ref()
            .map(Clone::clone)
            .map_err(|e| PatchError::InvalidCatalog(e.clone()))
    }

    /// Copy of the catalog with group `i` enabled iff bit `i` of `mask` is set.
    pub fn select(&self, mask: u32) -> Self {
        let groups = self
            .groups
            .iter()
            .enumerate()
            .map(|(i, group)| PatchGroup {
                enabled: i < 32 && mask & (1 << i) != 0,
                ..group.clone()
            })
            .collect();
        PatchCatalog { groups }
    }

    /// Groups that target `exe`
    pub fn for_executable<'a>(
        &'a self,
        exe: &'a Path,
    ) -> impl Iterator<Item = &'a PatchGroup> + 'a {
        self.groups.iter().filter(move |g| g.targets(exe))
    }
}

/// Classify `group` against the bytes of an image.
pub fn group_state(group: &PatchGroup, image: &[u8]) -> GroupState {
    let mut original = 0;
    let mut patched = 0;
    for set in &group.data_sets {
        match image.get(set.offset) {
            Some(&b) if b == set.patch => patched += 1,
            Some(&b) if b == set.original => original += 1,
            _ => return GroupState::Unknown,
        }
    }
    match (original, patched) {
        (_, 0) => GroupState::Original,
        (0, _) => GroupState::Patched,
        _ => GroupState::Mixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_parses() {
        let catalog = PatchCatalog::embedded().unwrap();
        assert!(!catalog.groups.is_empty());
        assert!(catalog.groups.iter().all(|g| !g.enabled));
        assert!(catalog.groups.iter().all(|g| !g.data_sets.is_empty()));
    }

    #[test]
    fn test_select_by_mask() {
        let catalog = PatchCatalog::embedded().unwrap().select(0b101);
        let enabled: Vec<bool> = catalog.groups.iter().map(|g| g.enabled).collect();
        assert!(enabled[0]);
        assert!(!enabled[1]);
        assert!(enabled[2]);
        assert!(!enabled[3]);
    }

    #[test]
    fn test_targets_ignores_case() {
        let group = PatchGroup {
            name: "test".into(),
            executable: "haloce.exe".into(),
            enabled: true,
            data_sets: vec![],
        };
        assert!(group.targets(Path::new("C:/Games/Halo/HaloCE.EXE")));
        assert!(!group.targets(Path::new("C:/Games/Halo/halo.exe")));
    }

    #[test]
    fn test_group_state() {
        let group = PatchGroup {
            name: "test".into(),
            executable: "haloce.exe".into(),
            enabled: false,
            data_sets: vec![
                DataSet {
                    offset: 0,
                    original: 0x74,
                    patch: 0xEB,
                },
                DataSet {
                    offset: 1,
                    original: 0x75,
                    patch: 0xEB,
                },
            ],
        };
        assert_eq!(group_state(&group, &[0x74, 0x75]), GroupState::Original);
        assert_eq!(group_state(&group, &[0xEB, 0xEB]), GroupState::Patched);
        assert_eq!(group_state(&group, &[0xEB, 0x75]), GroupState::Mixed);
        assert_eq!(group_state(&group, &[0x90, 0x75]), GroupState::Unknown);
        assert_eq!(group_state(&group, &[0x74]), GroupState::Unknown);
    }
}
