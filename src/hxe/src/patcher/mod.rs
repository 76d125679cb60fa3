//! In-place executable patching.
//!
//! Every operation reads before it writes and only touches bytes that differ
//! from the desired value, so applying a patch twice leaves the image exactly
//! as applying it once.

mod catalog;

pub use catalog::{group_state, DataSet, GroupState, PatchCatalog, PatchGroup};

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::layout::{read_field, write_field, LayoutError};

/// Offset of the PE characteristics byte carrying the large-address-aware flag
pub const LAA_OFFSET: usize = 0x136;

/// Characteristics byte with the large-address-aware bit set
pub const LAA_VALUE: u8 = 0x2F;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("{path} is locked by another process")]
    SharingViolation { path: PathBuf },

    #[error(
        "Unexpected byte {found:#04x} at {offset:#x} (expected {original:#04x} or {patch:#04x})"
    )]
    UnexpectedByte {
        offset: usize,
        found: u8,
        original: u8,
        patch: u8,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid patch catalog: {0}")]
    InvalidCatalog(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatchOutcome {
    Applied,
    AlreadyPatched,
}

/// Counts from one catalog application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    pub groups: usize,
    /// Groups left alone because the image did not match them
    pub skipped: usize,
    pub written: usize,
    pub unchanged: usize,
}

#[cfg(windows)]
fn is_sharing_violation(e: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    matches!(e.raw_os_error(), Some(32) | Some(33))
}

#[cfg(not(windows))]
fn is_sharing_violation(e: &io::Error) -> bool {
    // ETXTBSY
    e.raw_os_error() == Some(26)
}

fn map_io(path: &Path, e: io::Error) -> PatchError {
    if is_sharing_violation(&e) {
        PatchError::SharingViolation {
            path: path.to_path_buf(),
        }
    } else {
        PatchError::Io(e)
    }
}

/// Open the image for read-modify-write, denying other openers on Windows.
fn open_image(path: &Path) -> Result<File, PatchError> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        options.share_mode(0);
    }
    options.open(path).map_err(|e| map_io(path, e))
}

/// Make sure byte `offset` of `exe` equals `desired`.
///
/// The whole image is read, compared and, only when the byte differs,
/// written back in full.
pub fn apply_single_flag(
    exe: &Path,
    offset: usize,
    desired: u8,
) -> Result<PatchOutcome, PatchError> {
    let mut file = open_image(exe)?;
    let mut image = Vec::new();
    file.read_to_end(&mut image).map_err(|e| map_io(exe, e))?;

    let current = read_field(&image, offset, 1)?[0];
    if current == desired {
        info!(path = %exe.display(), offset, "Executable already patched");
        return Ok(PatchOutcome::AlreadyPatched);
    }

    write_field(&mut image, offset, &[desired])?;
    file.seek(SeekFrom::Start(0)).map_err(|e| map_io(exe, e))?;
    file.write_all(&image).map_err(|e| map_io(exe, e))?;
    file.flush().map_err(|e| map_io(exe, e))?;

    info!(
        path = %exe.display(),
        offset,
        from = current,
        to = desired,
        "Executable patched"
    );
    Ok(PatchOutcome::Applied)
}

/// Set the large-address-aware flag.
pub fn apply_laa(exe: &Path) -> Result<PatchOutcome, PatchError> {
    let outcome = apply_single_flag(exe, LAA_OFFSET, LAA_VALUE)?;
    if outcome == PatchOutcome::Applied {
        info!(path = %exe.display(), "Applied LAA patch");
    }
    Ok(outcome)
}

fn apply_data_set(
    file: &mut File,
    exe: &Path,
    image: &mut [u8],
    set: &DataSet,
    enabled: bool,
) -> Result<PatchOutcome, PatchError> {
    let current = read_field(image, set.offset, 1)?[0];
    let desired = set.desired(enabled);

    if current == desired {
        return Ok(PatchOutcome::AlreadyPatched);
    }
    if current != set.original && current != set.patch {
        return Err(PatchError::UnexpectedByte {
            offset: set.offset,
            found: current,
            original: set.original,
            patch: set.patch,
        });
    }

    file.seek(SeekFrom::Start(set.offset as u64))
        .and_then(|_| file.write_all(&[desired]))
        .map_err(|e| map_io(exe, e))?;
    write_field(image, set.offset, &[desired])?;
    debug!(offset = set.offset, from = current, to = desired, "Data set written");
    Ok(PatchOutcome::Applied)
}

/// Bring every group of `catalog` that targets `exe` to its toggle state.
///
/// Enabled groups get their `patch` bytes, disabled groups their `original`
/// bytes. A group with any byte matching neither value is not touched at all.
/// Groups are written one at a time; a failure part way through leaves the
/// earlier ones applied.
pub fn apply_patch_catalog(
    catalog: &PatchCatalog,
    exe: &Path,
) -> Result<CatalogReport, PatchError> {
    let mut file = open_image(exe)?;
    let mut image = Vec::new();
    file.read_to_end(&mut image).map_err(|e| map_io(exe, e))?;
    let mut report = CatalogReport::default();

    for group in catalog.for_executable(exe) {
        if group_state(group, &image) == GroupState::Unknown {
            warn!(
                group = %group.name,
                path = %exe.display(),
                "Executable bytes not recognised, patch group skipped"
            );
            report.skipped += 1;
            continue;
        }

        report.groups += 1;
        for set in &group.data_sets {
            let outcome = apply_data_set(&mut file, exe, &mut image, set, group.enabled)
                .inspect_err(|e| {
                    warn!(
                        group = %group.name,
                        offset = set.offset,
                        error = %e,
                        "Patch group failed"
                    );
                })?;
            match outcome {
                PatchOutcome::Applied => report.written += 1,
                PatchOutcome::AlreadyPatched => report.unchanged += 1,
            }
        }
        debug!(group = %group.name, enabled = group.enabled, "Patch group applied");
    }

    file.flush().map_err(|e| map_io(exe, e))?;
    info!(
        path = %exe.display(),
        groups = report.groups,
        skipped = report.skipped,
        written = report.written,
        unchanged = report.unchanged,
        "Patch catalog applied"
    );
    Ok(report)
}

/// Where one catalog group stands in an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupStatus {
    /// Bit of the group in the configuration mask
    pub index: usize,
    pub name: String,
    pub enabled: bool,
    pub state: GroupState,
}

/// State of every group of `catalog` that targets `exe`, without writing.
pub fn inspect_catalog(
    catalog: &PatchCatalog,
    exe: &Path,
) -> Result<Vec<GroupStatus>, PatchError> {
    let image = std::fs::read(exe).map_err(|e| map_io(exe, e))?;
    Ok(catalog
        .groups
        .iter()
        .enumerate()
        .filter(|(_, group)| group.targets(exe))
        .map(|(index, group)| GroupStatus {
            index,
            name: group.name.clone(),
            enabled: group.enabled,
            state: group_state(group, &image),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn image(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        let mut data = vec![0u8; len];
        data[LAA_OFFSET] = 0x0F;
        data[0x200] = 0x74;
        data[0x201] = 0x75;
        data[0x300] = 0x00;
        fs::write(&path, data).unwrap();
        path
    }

    fn catalog() -> PatchCatalog {
        PatchCatalog {
            groups: vec![
                PatchGroup {
                    name: "jumps".into(),
                    executable: "haloce.exe".into(),
                    enabled: false,
                    data_sets: vec![
                        DataSet {
                            offset: 0x200,
                            original: 0x74,
                            patch: 0xEB,
                        },
                        DataSet {
                            offset: 0x201,
                            original: 0x75,
                            patch: 0xEB,
                        },
                    ],
                },
                PatchGroup {
                    name: "other exe".into(),
                    executable: "halo.exe".into(),
                    enabled: false,
                    data_sets: vec![DataSet {
                        offset: 0x300,
                        original: 0x00,
                        patch: 0x20,
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_single_flag_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exe = image(temp_dir.path(), "haloce.exe", 0x1000);

        assert_eq!(apply_laa(&exe).unwrap(), PatchOutcome::Applied);
        let once = fs::read(&exe).unwrap();
        assert_eq!(once[LAA_OFFSET], LAA_VALUE);

        assert_eq!(apply_laa(&exe).unwrap(), PatchOutcome::AlreadyPatched);
        assert_eq!(fs::read(&exe).unwrap(), once);
    }

    #[test]
    fn test_single_flag_past_end() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exe = temp_dir.path().join("tiny.exe");
        fs::write(&exe, [0u8; 0x10]).unwrap();

        assert!(matches!(apply_laa(&exe), Err(PatchError::Layout(_))));
        assert_eq!(fs::read(&exe).unwrap(), vec![0u8; 0x10]);
    }

    #[test]
    fn test_catalog_enable_disable_restores() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exe = image(temp_dir.path(), "HaloCE.exe", 0x1000);
        let pristine = fs::read(&exe).unwrap();

        let report = apply_patch_catalog(&catalog().select(0b11), &exe).unwrap();
        assert_eq!(
            report,
            CatalogReport {
                groups: 1,
                skipped: 0,
                written: 2,
                unchanged: 0,
            }
        );
        let patched = fs::read(&exe).unwrap();
        assert_eq!(&patched[0x200..0x202], &[0xEB, 0xEB]);
        // the halo.exe group does not apply
        assert_eq!(patched[0x300], 0x00);

        let report = apply_patch_catalog(&catalog().select(0b11), &exe).unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(fs::read(&exe).unwrap(), patched);

        apply_patch_catalog(&catalog().select(0), &exe).unwrap();
        assert_eq!(fs::read(&exe).unwrap(), pristine);
    }

    #[test]
    fn test_unrecognised_group_untouched() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exe = image(temp_dir.path(), "haloce.exe", 0x1000);
        let mut data = fs::read(&exe).unwrap();
        // first byte looks patched, second matches neither value
        data[0x200] = 0xEB;
        data[0x201] = 0x90;
        fs::write(&exe, &data).unwrap();

        let report = apply_patch_catalog(&catalog().select(0), &exe).unwrap();
        assert_eq!(report.groups, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.written, 0);
        assert_eq!(fs::read(&exe).unwrap(), data);
    }

    #[test]
    fn test_group_past_end_untouched() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exe = image(temp_dir.path(), "haloce.exe", 0x1000);
        fs::write(&exe, &fs::read(&exe).unwrap()[..0x201]).unwrap();
        let pristine = fs::read(&exe).unwrap();

        let report = apply_patch_catalog(&catalog().select(1), &exe).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(fs::read(&exe).unwrap(), pristine);
    }

    #[test]
    fn test_embedded_catalog_leaves_foreign_image_alone() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exe = temp_dir.path().join("haloce.exe");
        let mut data = vec![0u8; 0x20_0000];
        data[1_260_848] = 116;
        data[1_174_036] = 117;
        data[1_174_112] = 116;
        data[1_583_640] = 32;
        fs::write(&exe, &data).unwrap();

        let catalog = PatchCatalog::embedded().unwrap().select(0);
        let report = apply_patch_catalog(&catalog, &exe).unwrap();
        assert_eq!(report.written, 0);
        assert!(report.skipped >= 1);
        assert_eq!(fs::read(&exe).unwrap(), data);
    }

    #[test]
    fn test_data_set_unexpected_byte() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exe = image(temp_dir.path(), "haloce.exe", 0x1000);
        let mut file = open_image(&exe).unwrap();
        let mut data = fs::read(&exe).unwrap();
        data[0x200] = 0x90;
        let set = DataSet {
            offset: 0x200,
            original: 0x74,
            patch: 0xEB,
        };

        let err = apply_data_set(&mut file, &exe, &mut data, &set, true).unwrap_err();
        assert!(matches!(
            err,
            PatchError::UnexpectedByte {
                offset: 0x200,
                found: 0x90,
                ..
            }
        ));
        assert_eq!(fs::read(&exe).unwrap()[0x200], 0x74);
    }

    #[test]
    fn test_inspect_catalog() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exe = image(temp_dir.path(), "haloce.exe", 0x1000);

        let states = inspect_catalog(&catalog(), &exe).unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].index, 0);
        assert_eq!(states[0].state, GroupState::Original);

        apply_patch_catalog(&catalog().select(1), &exe).unwrap();
        let states = inspect_catalog(&catalog(), &exe).unwrap();
        assert_eq!(states[0].state, GroupState::Patched);
    }

    #[test]
    fn test_missing_image_is_io() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = apply_laa(&temp_dir.path().join("missing.exe")).unwrap_err();
        assert!(matches!(err, PatchError::Io(_)));
    }
}
