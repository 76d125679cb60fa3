//! Player profile record (`blam.sav`) and the profile directory tree.
//!
//! A profile is decoded into the fields this crate understands. Saving
//! never patches the existing file: the template is rendered again, the known
//! fields are written over it and the checksum is recomputed.

pub mod lastprof;
mod scaffold;
pub mod template;

pub use lastprof::LastProfile;
pub use scaffold::{detect_profile, list_profiles, profile_dir, scaffold};

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::Configuration;
use crate::host::Resolution;
use crate::layout::{read_utf16, Blob, FieldCursor, FieldReader, LayoutError};
use crate::progress::ProgressError;
use template::{BINDINGS_START, BINDING_SLOTS, UNBOUND};

/// Profile record file name
pub const BLAM: &str = "blam.sav";

/// Maximum profile name length in characters
pub const NAME_MAX: usize = 11;

mod offsets {
    pub const NAME: usize = 0x0002;
    pub const COLOUR: usize = 0x011A;
    pub const INVERT_VERTICAL: usize = 0x012F;
    pub const MOUSE_SENSITIVITY: usize = 0x0954;
    pub const RESOLUTION: usize = 0x0A68;
    pub const REFRESH_RATE: usize = 0x0A6C;
    pub const FRAME_RATE: usize = 0x0A6F;
    pub const TEXTURE_QUALITY: usize = 0x0A74;
    pub const GAMMA: usize = 0x0A76;
    pub const AUDIO: usize = 0x0B78;
    pub const AUDIO_VARIETY: usize = 0x0B7F;
    pub const CONNECTION: usize = 0x0FC0;
    pub const PORTS: usize = 0x1002;
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    #[error("Profile not found: {0}")]
    NotFound(PathBuf),

    #[error("Malformed last-profile pointer {path}: {reason}")]
    MalformedPointer { path: PathBuf, reason: String },

    #[error("Invalid profile name '{0}' (1-11 characters, no path separators)")]
    InvalidName(String),

    #[error("No free profile name left under {0}")]
    NamesExhausted(PathBuf),
}

/// Actions an input slot can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Jump = 0x00,
    SwitchGrenade = 0x01,
    Action = 0x02,
    SwitchWeapon = 0x03,
    Melee = 0x04,
    Flashlight = 0x05,
    ThrowGrenade = 0x06,
    Fire = 0x07,
    MenuAccept = 0x08,
    MenuBack = 0x09,
    Crouch = 0x0A,
    ScopeZoom = 0x0B,
    ShowScores = 0x0C,
    Reload = 0x0D,
    ExchangeWeapon = 0x0E,
    Say = 0x0F,
    MoveForward = 0x10,
    MoveBackward = 0x11,
    Screenshot = 0x12,
    ShowRules = 0x13,
    StrafeLeft = 0x14,
    SayToTeam = 0x15,
    StrafeRight = 0x16,
    LookUp = 0x17,
    LookDown = 0x18,
    LookLeft = 0x19,
    LookRight = 0x1A,
}

impl Action {
    const ALL: [Action; 27] = [
        Action::Jump,
        Action::SwitchGrenade,
        Action::Action,
        Action::SwitchWeapon,
        Action::Melee,
        Action::Flashlight,
        Action::ThrowGrenade,
        Action::Fire,
        Action::MenuAccept,
        Action::MenuBack,
        Action::Crouch,
        Action::ScopeZoom,
        Action::ShowScores,
        Action::Reload,
        Action::ExchangeWeapon,
        Action::Say,
        Action::MoveForward,
        Action::MoveBackward,
        Action::Screenshot,
        Action::ShowRules,
        Action::StrafeLeft,
        Action::SayToTeam,
        Action::StrafeRight,
        Action::LookUp,
        Action::LookDown,
        Action::LookLeft,
        Action::LookRight,
    ];

    /// `None` for unbound or unknown slot values.
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| *a as u16 == value)
    }
}

/// Input slot table, one entry per slot between 0x13C and 0x93A
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings(Vec<u16>);

impl Bindings {
    /// Bindings as rendered by the template
    pub fn defaults() -> Result<Self, LayoutError> {
        Self::decode(&template::render()?)
    }

    fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let mut reader = FieldReader::new(data, BINDINGS_START);
        let slots = (0..BINDING_SLOTS)
            .map(|_| reader.u16())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Bindings(slots))
    }

    fn encode(&self, data: &mut [u8]) -> Result<(), LayoutError> {
        let mut cursor = FieldCursor::new(data, BINDINGS_START);
        for slot in &self.0 {
            cursor.u16(*slot)?;
        }
        Ok(())
    }

    pub fn get(&self, slot: usize) -> Option<Action> {
        self.0.get(slot).copied().and_then(Action::from_u16)
    }

    pub fn raw(&self, slot: usize) -> Option<u16> {
        self.0.get(slot).copied()
    }

    /// Bind `slot` to `action`; `None` unbinds it. Out-of-range slots are ignored.
    pub fn set(&mut self, slot: usize, action: Option<Action>) {
        if let Some(entry) = self.0.get_mut(slot) {
            *entry = action.map_or(UNBOUND, |a| a as u16);
        }
    }

    /// Slots holding an action, in slot order
    pub fn bound(&self) -> impl Iterator<Item = (usize, Action)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(slot, raw)| Action::from_u16(*raw).map(|a| (slot, a)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mouse {
    pub invert_vertical: bool,
    pub sensitivity_horizontal: u8,
    pub sensitivity_vertical: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoSettings {
    pub resolution: Resolution,
    pub refresh_rate: u8,
    /// 0 = unlocked, 1 = vsync, 2 = 30 fps
    pub frame_rate: u8,
    pub specular: bool,
    pub shadows: bool,
    pub decals: bool,
    pub particles: u8,
    pub texture_quality: u8,
    pub gamma: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioSettings {
    pub master: u8,
    pub effects: u8,
    pub music: u8,
    pub eax: bool,
    pub hw_acceleration: bool,
    pub quality: u8,
    pub variety: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkSettings {
    pub connection: u8,
    pub server_port: u16,
    pub client_port: u16,
}

/// Decoded `blam.sav`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    #[serde(skip)]
    path: PathBuf,
    pub name: String,
    pub colour: u8,
    pub mouse: Mouse,
    pub video: VideoSettings,
    pub audio: AudioSettings,
    pub network: NetworkSettings,
    #[serde(skip)]
    pub bindings: Bindings,
}

impl ProfileRecord {
    /// Template defaults for a profile stored at `path`
    pub fn template(path: impl Into<PathBuf>, name: &str) -> Result<Self, ProfileError> {
        validate_name(name)?;
        let mut record = Self::decode(path.into(), &template::render()?)?;
        record.name = name.to_string();
        Ok(record)
    }

    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let path = path.into();
        if !path.exists() {
            return Err(ProfileError::NotFound(path));
        }
        let blob = Blob::open_sized(&path, template::LENGTH)?;
        let record = Self::decode(path, blob.as_bytes())?;
        debug!(path = %record.path.display(), name = %record.name, "Profile loaded");
        Ok(record)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the profile's files
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    fn decode(path: PathBuf, data: &[u8]) -> Result<Self, ProfileError> {
        let at = |offset| FieldReader::new(data, offset);

        let mut sensitivity = at(offsets::MOUSE_SENSITIVITY);
        let mouse = Mouse {
            invert_vertical: at(offsets::INVERT_VERTICAL).bool()?,
            sensitivity_horizontal: sensitivity.u8()?,
            sensitivity_vertical: sensitivity.u8()?,
        };

        let mut res = at(offsets::RESOLUTION);
        let resolution = Resolution::new(res.u16()?, res.u16()?);
        let mut frame = at(offsets::FRAME_RATE);
        let video = VideoSettings {
            resolution,
            refresh_rate: at(offsets::REFRESH_RATE).u8()?,
            frame_rate: frame.u8()?,
            specular: frame.bool()?,
            shadows: frame.bool()?,
            decals: frame.bool()?,
            particles: frame.u8()?,
            texture_quality: at(offsets::TEXTURE_QUALITY).u8()?,
            gamma: at(offsets::GAMMA).u8()?,
        };

        let mut sound = at(offsets::AUDIO);
        let audio = AudioSettings {
            master: sound.u8()?,
            effects: sound.u8()?,
            music: sound.u8()?,
            eax: sound.bool()?,
            hw_acceleration: sound.bool()?,
            quality: sound.u8()?,
            variety: at(offsets::AUDIO_VARIETY).u8()?,
        };

        let mut ports = at(offsets::PORTS);
        let network = NetworkSettings {
            connection: at(offsets::CONNECTION).u8()?,
            server_port: ports.u16()?,
            client_port: ports.u16()?,
        };

        Ok(ProfileRecord {
            name: read_utf16(data, offsets::NAME, NAME_MAX + 1)?,
            colour: at(offsets::COLOUR).u8()?,
            mouse,
            video,
            audio,
            network,
            bindings: Bindings::decode(data)?,
            path,
        })
    }

    /// Render the full record: template first, known fields over it, checksum last.
    pub fn encode(&self) -> Result<Vec<u8>, ProfileError> {
        validate_name(&self.name)?;
        let mut blob = Blob::from_bytes(&self.path, template::render()?);

        blob.write_utf16(offsets::NAME, NAME_MAX + 1, &self.name)?;
        blob.write_u8(offsets::COLOUR, self.colour)?;
        blob.write_bool(offsets::INVERT_VERTICAL, self.mouse.invert_vertical)?;
        {
            let mut c = blob.cursor(offsets::MOUSE_SENSITIVITY);
            c.u8(self.mouse.sensitivity_horizontal)?;
            c.u8(self.mouse.sensitivity_vertical)?;
        }
        {
            let mut c = blob.cursor(offsets::RESOLUTION);
            c.u16(self.video.resolution.width)?;
            c.u16(self.video.resolution.height)?;
            c.u8(self.video.refresh_rate)?;
        }
        {
            let mut c = blob.cursor(offsets::FRAME_RATE);
            c.u8(self.video.frame_rate)?;
            c.bool(self.video.specular)?;
            c.bool(self.video.shadows)?;
            c.bool(self.video.decals)?;
            c.u8(self.video.particles)?;
            c.u8(self.video.texture_quality)?;
        }
        blob.write_u8(offsets::GAMMA, self.video.gamma)?;
        {
            let mut c = blob.cursor(offsets::AUDIO);
            c.u8(self.audio.master)?;
            c.u8(self.audio.effects)?;
            c.u8(self.audio.music)?;
            c.bool(self.audio.eax)?;
            c.bool(self.audio.hw_acceleration)?;
            c.u8(self.audio.quality)?;
        }
        blob.write_u8(offsets::AUDIO_VARIETY, self.audio.variety)?;
        blob.write_u8(offsets::CONNECTION, self.network.connection)?;
        {
            let mut c = blob.cursor(offsets::PORTS);
            c.u16(self.network.server_port)?;
            c.u16(self.network.client_port)?;
        }
        self.bindings.encode(blob.as_bytes_mut())?;

        template::seal(blob.as_bytes_mut())?;
        Ok(blob.into_bytes())
    }

    /// Rewrite the whole file.
    pub fn save(&self) -> Result<(), ProfileError> {
        let blob = Blob::from_bytes(&self.path, self.encode()?);
        blob.flush()?;
        debug!(path = %self.path.display(), "Profile saved");
        Ok(())
    }

    /// Fold the kernel's launch options into the profile.
    pub fn apply(
        &mut self,
        config: &Configuration,
        screen: Option<Resolution>,
    ) -> Result<(), ProfileError> {
        if config.video.resolution {
            if let Some(resolution) = screen {
                self.video.resolution = resolution;
            }
        }

        if config.video.uncap {
            self.video.frame_rate = 0;
        }

        if config.video.quality {
            self.video.specular = true;
            self.video.shadows = true;
            self.video.decals = true;
            self.video.particles = 2;
            self.video.texture_quality = 2;
        }

        if config.video.gamma_enabled {
            self.video.gamma = config.video.gamma;
        }

        if config.audio.quality {
            self.audio.quality = 2;
            self.audio.variety = 2;
        }

        if config.audio.enhancements {
            self.audio.eax = true;
            self.audio.hw_acceleration = true;
        }

        if config.input.override_bindings {
            self.bindings = Bindings::defaults()?;
        }

        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), ProfileError> {
    let len = name.chars().count();
    if len == 0 || len > NAME_MAX || name.contains(['\\', '/', '\0']) {
        return Err(ProfileError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_decodes_to_defaults() {
        let record = ProfileRecord::template("blam.sav", "Chief").unwrap();
        assert_eq!(record.name, "Chief");
        assert_eq!(record.video.resolution, Resolution::new(800, 600));
        assert_eq!(record.video.refresh_rate, 60);
        assert_eq!(record.audio.master, 10);
        assert_eq!(record.network.server_port, 2302);
        assert_eq!(record.network.client_port, 2303);
        assert_eq!(record.bindings.get(0x18), Some(Action::MoveForward));
        assert_eq!(record.bindings.get(1), None);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(BLAM);

        let mut record = ProfileRecord::template(&path, "Chief").unwrap();
        record.colour = 4;
        record.mouse.invert_vertical = true;
        record.mouse.sensitivity_horizontal = 7;
        record.video.resolution = Resolution::new(1920, 1080);
        record.video.gamma = 2;
        record.audio.music = 3;
        record.network.server_port = 2400;
        record.bindings.set(3, Some(Action::Melee));
        record.save().unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), template::LENGTH);
        assert_eq!(&data[0x0A68..0x0A6C], &[0x80, 0x07, 0x38, 0x04]);

        let loaded = ProfileRecord::open_at(&path).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.bindings.get(3), Some(Action::Melee));
    }

    #[test]
    fn test_save_discards_unknown_bytes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(BLAM);

        let record = ProfileRecord::template(&path, "Chief").unwrap();
        record.save().unwrap();

        let mut data = std::fs::read(&path).unwrap();
        let pristine = data[0x1500];
        data[0x1500] = 0xAB;
        std::fs::write(&path, &data).unwrap();

        ProfileRecord::open_at(&path).unwrap().save().unwrap();
        let rewritten = std::fs::read(&path).unwrap();
        assert_eq!(rewritten[0x1500], pristine);
    }

    #[test]
    fn test_checksum_trailer() {
        let record = ProfileRecord::template("blam.sav", "Chief").unwrap();
        let data = record.encode().unwrap();
        let stored = u32::from_le_bytes(data[template::CHECKSUM_OFFSET..].try_into().unwrap());
        assert_eq!(stored, template::checksum(&data));
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = ProfileRecord::open_at(temp_dir.path().join(BLAM)).unwrap_err();
        assert!(matches!(err, ProfileError::NotFound(_)));
    }

    #[test]
    fn test_open_truncated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(BLAM);
        std::fs::write(&path, [0u8; 0x100]).unwrap();
        let err = ProfileRecord::open_at(&path).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::Layout(LayoutError::TruncatedRecord { .. })
        ));
    }

    #[test]
    fn test_invalid_names() {
        assert!(ProfileRecord::template("x", "").is_err());
        assert!(ProfileRecord::template("x", "TwelveLetter").is_err());
        assert!(ProfileRecord::template("x", "a\\b").is_err());
        assert!(ProfileRecord::template("x", "ElevenChars").is_ok());
    }

    #[test]
    fn test_apply_configuration() {
        let mut record = ProfileRecord::template("blam.sav", "Chief").unwrap();
        record.bindings.set(0x18, None);

        let mut config = Configuration::default();
        config.video.resolution = true;
        config.video.uncap = true;
        config.video.gamma_enabled = true;
        config.video.gamma = 3;
        config.audio.enhancements = true;
        config.input.override_bindings = true;

        record
            .apply(&config, Some(Resolution::new(2560, 1440)))
            .unwrap();
        assert_eq!(record.video.resolution, Resolution::new(2560, 1440));
        assert_eq!(record.video.frame_rate, 0);
        assert_eq!(record.video.gamma, 3);
        assert!(record.audio.eax);
        assert_eq!(record.bindings.get(0x18), Some(Action::MoveForward));
    }

    #[test]
    fn test_apply_without_screen_keeps_resolution() {
        let mut record = ProfileRecord::template("blam.sav", "Chief").unwrap();
        let mut config = Configuration::default();
        config.video.resolution = true;
        record.apply(&config, None).unwrap();
        assert_eq!(record.video.resolution, Resolution::new(800, 600));
    }
}
