//! Last-profile pointer (`lastprof.txt`).
//!
//! The game records the active profile as its directory path followed by a
//! backslash, a NUL byte and `lam.sav`. The profile name is the last path
//! segment before that marker.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::ProfileError;

/// Pointer file name, relative to the profile root
pub const FILE_NAME: &str = "lastprof.txt";

const SUFFIX: &str = "lam.sav";

/// Decoded pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastProfile {
    path: PathBuf,
    profile_dir: String,
    name: String,
}

impl LastProfile {
    /// Read the pointer at `path`.
    ///
    /// A missing file is [`ProfileError::NotFound`]; content that does not
    /// parse is [`ProfileError::MalformedPointer`].
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ProfileError::NotFound(path)),
            Err(e) => return Err(e.into()),
        };
        let (profile_dir, name) = parse(&data).map_err(|reason| ProfileError::MalformedPointer {
            path: path.clone(),
            reason: reason.to_string(),
        })?;
        Ok(LastProfile {
            path,
            profile_dir,
            name,
        })
    }

    /// Point `path` at the profile stored in `profile_dir`.
    pub fn write(path: impl Into<PathBuf>, profile_dir: &Path) -> Result<Self, ProfileError> {
        let path = path.into();
        let profile_dir = profile_dir.display().to_string();
        let data = encode(&profile_dir);
        fs::write(&path, &data)?;
        let (profile_dir, name) = parse(&data).map_err(|reason| ProfileError::MalformedPointer {
            path: path.clone(),
            reason: reason.to_string(),
        })?;
        Ok(LastProfile {
            path,
            profile_dir,
            name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory recorded in the pointer, as stored
    pub fn profile_dir(&self) -> &str {
        &self.profile_dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Serialize a pointer to `profile_dir`.
pub fn encode(profile_dir: &str) -> Vec<u8> {
    let dir = profile_dir.trim_end_matches(['\\', '/']);
    let mut data = Vec::with_capacity(dir.len() + SUFFIX.len() + 2);
    data.extend_from_slice(dir.as_bytes());
    data.push(b'\\');
    data.push(0);
    data.extend_from_slice(SUFFIX.as_bytes());
    data
}

/// Split pointer content into (profile directory, profile name).
pub fn parse(data: &[u8]) -> Result<(String, String), &'static str> {
    let text = String::from_utf8_lossy(data);
    let text = text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace());

    let body = text
        .strip_suffix(SUFFIX)
        .ok_or("missing lam.sav marker")?;
    // The byte before the suffix is a NUL (or the 'b' of blam.sav)
    let body = body
        .strip_suffix('\0')
        .or_else(|| body.strip_suffix('b'))
        .ok_or("missing marker separator")?;
    let dir = body.strip_suffix('\\').ok_or("missing path separator")?;

    let name = dir
        .rsplit(['\\', '/'])
        .next()
        .filter(|n| !n.is_empty())
        .ok_or("empty profile name")?;
    if name.len() == dir.len() {
        return Err("profile path has no parent directory");
    }

    Ok((dir.to_string(), name.to_string()))
}
