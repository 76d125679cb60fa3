//! Profile discovery and creation.

use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::lastprof::{self, LastProfile};
use super::{validate_name, ProfileError, ProfileRecord, BLAM};
use crate::host::{Resolution, ScreenResolution};
use crate::progress::{self, ProgressRecord};

/// Directory holding one subdirectory per profile
pub const SAVEGAMES: &str = "savegames";

/// Marker file written into every scaffolded profile
pub const WAYPOINT: &str = "waypoint";

/// `root/savegames/name`
pub fn profile_dir(root: &Path, name: &str) -> PathBuf {
    root.join(SAVEGAMES).join(name)
}

/// Names of the profiles under `root` that hold a `blam.sav`, sorted.
pub fn list_profiles(root: &Path) -> Result<Vec<String>, ProfileError> {
    let base = root.join(SAVEGAMES);
    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(&base)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() && path.join(BLAM).is_file() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Create the directory tree and default files for a new profile.
///
/// Writes the template `blam.sav` (with `name` and, when known, the screen
/// resolution), a blank `savegame.bin` and the `waypoint` marker.
pub fn scaffold(
    root: &Path,
    name: &str,
    resolution: Option<Resolution>,
) -> Result<ProfileRecord, ProfileError> {
    validate_name(name)?;
    let dir = profile_dir(root, name);
    fs::create_dir_all(&dir)?;

    let mut record = ProfileRecord::template(dir.join(BLAM), name)?;
    if let Some(resolution) = resolution {
        record.video.resolution = resolution;
    }
    record.save()?;

    ProgressRecord::blank(dir.join(progress::FILE_NAME)).save()?;

    let waypoint = dir.join(WAYPOINT);
    fs::write(&waypoint, waypoint.display().to_string())?;

    info!(profile = name, path = %dir.display(), "Scaffolded new profile");
    Ok(record)
}

const NEW_FIRST: u16 = 100;
const NEW_END: u16 = 1000;
const RANDOM_ATTEMPTS: usize = 32;

/// A free `NewNNN` name: a few random picks, then the lowest free number.
fn new_profile_name(root: &Path, rng: &mut impl Rng) -> Result<String, ProfileError> {
    let free = |n: u16| {
        let name = format!("New{n}");
        (!profile_dir(root, &name).exists()).then_some(name)
    };

    (0..RANDOM_ATTEMPTS)
        .find_map(|_| free(rng.gen_range(NEW_FIRST..NEW_END)))
        .or_else(|| (NEW_FIRST..NEW_END).find_map(free))
        .ok_or_else(|| ProfileError::NamesExhausted(root.join(SAVEGAMES)))
}

/// Open the profile `name`, rebuilding it from the template when its record
/// is unreadable. `None` when it can be neither read nor rebuilt under its
/// directory name.
fn open_or_rebuild(
    root: &Path,
    name: &str,
    screen: &dyn ScreenResolution,
) -> Result<Option<ProfileRecord>, ProfileError> {
    let e = match ProfileRecord::open_at(profile_dir(root, name).join(BLAM)) {
        Ok(record) => return Ok(Some(record)),
        Err(ProfileError::Layout(e)) => e,
        Err(e) => return Err(e),
    };

    warn!(profile = name, error = %e, "Profile record unreadable, rebuilding");
    match scaffold(root, name, screen.current()) {
        Ok(record) => Ok(Some(record)),
        Err(ProfileError::InvalidName(_)) => {
            warn!(profile = name, "Profile directory name cannot hold a profile, skipping");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Locate the active profile under `root`, creating one if necessary.
///
/// Resolution order: the profile named by `lastprof.txt`, then the first
/// usable existing profile, then a freshly scaffolded `NewNNN` profile.
/// Missing or malformed pointers are not errors; this only fails on I/O
/// trouble or when every `NewNNN` name is taken.
pub fn detect_profile(
    root: &Path,
    screen: &dyn ScreenResolution,
) -> Result<ProfileRecord, ProfileError> {
    let pointer_path = root.join(lastprof::FILE_NAME);
    let mut tried = None;

    match LastProfile::open_at(&pointer_path) {
        Ok(pointer) => {
            let name = pointer.name();
            if profile_dir(root, name).join(BLAM).is_file() {
                info!(profile = name, "Using last profile");
                if let Some(record) = open_or_rebuild(root, name, screen)? {
                    return Ok(record);
                }
                tried = Some(name.to_string());
            } else {
                warn!(profile = name, "Last profile no longer exists");
            }
        }
        Err(ProfileError::NotFound(_)) => {
            info!(path = %pointer_path.display(), "No last-profile pointer");
        }
        Err(ProfileError::MalformedPointer { reason, .. }) => {
            warn!(
                path = %pointer_path.display(),
                reason = %reason,
                "Ignoring malformed last-profile pointer"
            );
        }
        Err(e) => return Err(e),
    }

    let mut found = None;
    for name in list_profiles(root)? {
        if tried.as_deref() == Some(name.as_str()) {
            continue;
        }
        if let Some(record) = open_or_rebuild(root, &name, screen)? {
            info!(profile = %name, "Falling back to existing profile");
            found = Some(record);
            break;
        }
    }

    let record = match found {
        Some(record) => record,
        None => {
            let name = new_profile_name(root, &mut rand::thread_rng())?;
            scaffold(root, &name, screen.current())?
        }
    };

    LastProfile::write(&pointer_path, record.directory())?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FixedResolution;
    use crate::profile::template;

    #[test]
    fn test_scaffold_tree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();

        let record = scaffold(root, "Chief", Some(Resolution::new(1280, 720))).unwrap();
        let dir = profile_dir(root, "Chief");

        assert_eq!(record.path(), dir.join(BLAM));
        assert_eq!(
            fs::metadata(dir.join(BLAM)).unwrap().len(),
            template::LENGTH as u64
        );
        assert_eq!(
            fs::metadata(dir.join(progress::FILE_NAME)).unwrap().len(),
            progress::LENGTH as u64
        );

        let waypoint = dir.join(WAYPOINT);
        assert_eq!(
            fs::read_to_string(&waypoint).unwrap(),
            waypoint.display().to_string()
        );

        let loaded = ProfileRecord::open_at(dir.join(BLAM)).unwrap();
        assert_eq!(loaded.name, "Chief");
        assert_eq!(loaded.video.resolution, Resolution::new(1280, 720));
    }

    #[test]
    fn test_detect_fresh_root_scaffolds_new_profile() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();

        let record = detect_profile(root, &FixedResolution(None)).unwrap();

        assert!(record.name.starts_with("New"));
        assert_eq!(record.name.len(), 6);
        assert!(record.name[3..].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(list_profiles(root).unwrap(), vec![record.name.clone()]);

        let pointer = LastProfile::open_at(root.join(lastprof::FILE_NAME)).unwrap();
        assert_eq!(pointer.name(), record.name);
    }

    #[test]
    fn test_detect_follows_pointer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        scaffold(root, "Alpha", None).unwrap();
        scaffold(root, "Bravo", None).unwrap();
        LastProfile::write(root.join(lastprof::FILE_NAME), &profile_dir(root, "Bravo"))
            .unwrap();

        let record = detect_profile(root, &FixedResolution(None)).unwrap();
        assert_eq!(record.name, "Bravo");
    }

    #[test]
    fn test_detect_malformed_pointer_falls_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        scaffold(root, "Bravo", None).unwrap();
        scaffold(root, "Alpha", None).unwrap();
        fs::write(root.join(lastprof::FILE_NAME), b"nonsense").unwrap();

        let record = detect_profile(root, &FixedResolution(None)).unwrap();
        assert_eq!(record.name, "Alpha");

        let pointer = LastProfile::open_at(root.join(lastprof::FILE_NAME)).unwrap();
        assert_eq!(pointer.name(), "Alpha");
    }

    #[test]
    fn test_detect_rebuilds_corrupt_profile() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        scaffold(root, "Chief", None).unwrap();
        fs::write(profile_dir(root, "Chief").join(BLAM), [0u8; 16]).unwrap();

        let record = detect_profile(root, &FixedResolution(None)).unwrap();
        assert_eq!(record.name, "Chief");
        assert_eq!(
            fs::metadata(record.path()).unwrap().len(),
            template::LENGTH as u64
        );
    }

    #[test]
    fn test_detect_pointer_to_missing_profile() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        scaffold(root, "Alpha", None).unwrap();
        LastProfile::write(root.join(lastprof::FILE_NAME), &profile_dir(root, "Ghost"))
            .unwrap();

        let record = detect_profile(root, &FixedResolution(None)).unwrap();
        assert_eq!(record.name, "Alpha");
        assert!(!profile_dir(root, "Ghost").exists());

        let pointer = LastProfile::open_at(root.join(lastprof::FILE_NAME)).unwrap();
        assert_eq!(pointer.name(), "Alpha");
    }

    #[test]
    fn test_detect_skips_corrupt_profile_with_long_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let dir = profile_dir(root, "MasterChief117");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(BLAM), [0u8; 16]).unwrap();
        LastProfile::write(root.join(lastprof::FILE_NAME), &dir).unwrap();

        let record = detect_profile(root, &FixedResolution(None)).unwrap();
        assert!(record.name.starts_with("New"));
        assert!(record.path().is_file());
        assert_eq!(
            fs::metadata(record.path()).unwrap().len(),
            template::LENGTH as u64
        );
        // the unreadable profile is left as found
        assert_eq!(fs::read(dir.join(BLAM)).unwrap(), vec![0u8; 16]);

        let pointer = LastProfile::open_at(root.join(lastprof::FILE_NAME)).unwrap();
        assert_eq!(pointer.name(), record.name);
    }

    #[test]
    fn test_new_profile_name_exhausted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        for n in NEW_FIRST..NEW_END {
            fs::create_dir_all(profile_dir(root, &format!("New{n}"))).unwrap();
        }
        let mut rng = rand::thread_rng();
        assert!(matches!(
            new_profile_name(root, &mut rng),
            Err(ProfileError::NamesExhausted(_))
        ));

        fs::remove_dir(profile_dir(root, "New512")).unwrap();
        assert_eq!(new_profile_name(root, &mut rng).unwrap(), "New512");
    }

    #[test]
    fn test_scaffold_rejects_invalid_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();

        let err = scaffold(root, "MasterChief117", None).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidName(_)));
        assert!(!profile_dir(root, "MasterChief117").exists());
    }

    #[test]
    fn test_list_profiles_ignores_empty_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(profile_dir(root, "Empty")).unwrap();
        scaffold(root, "Chief", None).unwrap();

        assert_eq!(list_profiles(root).unwrap(), vec!["Chief".to_string()]);
    }
}
