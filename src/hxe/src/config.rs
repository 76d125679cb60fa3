//! Kernel configuration record.
//!
//! The configuration is a 256-byte blob: a UTF-16 signature, a version byte
//! and one section per option group, each at a 16-byte aligned offset.
//! Records written by another version are not migrated; they are replaced
//! with defaults.

use bitflags::bitflags;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::layout::{Blob, FieldCursor, FieldReader, LayoutError};

/// Total length of the configuration blob
pub const LENGTH: usize = 0x100;

/// Signature and version bytes
pub const HEADER_LENGTH: usize = 0x11;

/// Signature stored UTF-16LE at offset 0
pub const SIGNATURE: &str = "~hxekrnl";

/// Current record version
pub const VERSION: u8 = 0x14;

mod offsets {
    pub const SIGNATURE: usize = 0x00;
    pub const VERSION: usize = 0x10;
    pub const MODE: usize = 0x20;
    pub const MAIN: usize = 0x30;
    pub const VIDEO: usize = 0x40;
    pub const AUDIO: usize = 0x50;
    pub const INPUT: usize = 0x60;
    pub const TWEAKS: usize = 0x70;
    pub const PATCHES: usize = 0x80;
    pub const SHADERS: usize = 0xB0;
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Failed to create configuration directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown configuration option: {0}")]
    UnknownOption(String),

    #[error("Invalid value '{value}' for option {key}")]
    InvalidValue { key: String, value: String },
}

/// Installation the kernel drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Mode {
    #[default]
    Hce = 0,
    Spv3 = 1,
    Hxe = 2,
}

impl Mode {
    /// Unknown bytes fall back to [`Mode::Hce`].
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Mode::Spv3,
            2 => Mode::Hxe,
            _ => Mode::Hce,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl std::str::FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hce" => Ok(Mode::Hce),
            "spv3" => Ok(Mode::Spv3),
            "hxe" => Ok(Mode::Hxe),
            _ => Err(ConfigError::InvalidValue {
                key: "mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

bitflags! {
    /// Post-processing effects toggled through the initiation file.
    ///
    /// The bit index doubles as the effect instance index.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Shaders: u32 {
        const DOF_LOW = 1 << 0;
        const DOF_HIGH = 1 << 1;
        const MOTION_BLUR_BUILT_IN = 1 << 2;
        const MOTION_BLUR_POMB_LOW = 1 << 3;
        const MOTION_BLUR_POMB_HIGH = 1 << 4;
        const MXAO_LOW = 1 << 5;
        const MXAO_HIGH = 1 << 6;
        const DYNAMIC_LENS_FLARES = 1 << 7;
        const VOLUMETRIC_LIGHTING = 1 << 8;
        const LENS_DIRT = 1 << 9;
        const FILM_GRAIN = 1 << 10;
        const HUD_VISOR = 1 << 11;
        const _ = !0;
    }
}

impl Serialize for Shaders {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Main {
    /// Rewrite the initiation file from scratch
    pub reset: bool,
    /// Apply the large-address-aware flag and the patch catalog
    pub patch: bool,
    /// Launch the executable
    pub start: bool,
    /// Resume the campaign from the last save
    pub resume: bool,
    /// Hide the HUD
    pub blind: bool,
}

impl Default for Main {
    fn default() -> Self {
        Main {
            reset: true,
            patch: true,
            start: true,
            resume: true,
            blind: false,
        }
    }
}

impl Main {
    fn encode(&self, c: &mut FieldCursor<'_>) -> Result<(), LayoutError> {
        c.bool(self.reset)?;
        c.bool(self.patch)?;
        c.bool(self.start)?;
        c.bool(self.resume)?;
        c.bool(self.blind)
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self, LayoutError> {
        Ok(Main {
            reset: r.bool()?,
            patch: r.bool()?,
            start: r.bool()?,
            resume: r.bool()?,
            blind: r.bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Video {
    /// Write the native screen resolution into the profile
    pub resolution: bool,
    /// Unlock the frame rate
    pub uncap: bool,
    /// Force the highest quality profile settings
    pub quality: bool,
    pub gamma_enabled: bool,
    pub gamma: u8,
    /// Borderless window styling
    pub bless: bool,
}

impl Video {
    fn encode(&self, c: &mut FieldCursor<'_>) -> Result<(), LayoutError> {
        c.bool(self.resolution)?;
        c.bool(self.uncap)?;
        c.bool(self.quality)?;
        c.bool(self.gamma_enabled)?;
        c.u8(self.gamma)?;
        c.bool(self.bless)
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self, LayoutError> {
        Ok(Video {
            resolution: r.bool()?,
            uncap: r.bool()?,
            quality: r.bool()?,
            gamma_enabled: r.bool()?,
            gamma: r.u8()?,
            bless: r.bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Audio {
    pub quality: bool,
    pub enhancements: bool,
}

impl Audio {
    fn encode(&self, c: &mut FieldCursor<'_>) -> Result<(), LayoutError> {
        c.bool(self.quality)?;
        c.bool(self.enhancements)
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self, LayoutError> {
        Ok(Audio {
            quality: r.bool()?,
            enhancements: r.bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Input {
    /// Replace the profile bindings with the default layout on launch
    pub override_bindings: bool,
}

impl Input {
    fn encode(&self, c: &mut FieldCursor<'_>) -> Result<(), LayoutError> {
        c.bool(self.override_bindings)
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self, LayoutError> {
        Ok(Input {
            override_bindings: r.bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tweaks {
    pub cinematic: bool,
    pub sensor: bool,
    pub magnetism: bool,
    pub auto_aim: bool,
    pub acceleration: bool,
    pub unload: bool,
}

impl Tweaks {
    fn encode(&self, c: &mut FieldCursor<'_>) -> Result<(), LayoutError> {
        c.bool(self.cinematic)?;
        c.bool(self.sensor)?;
        c.bool(self.magnetism)?;
        c.bool(self.auto_aim)?;
        c.bool(self.acceleration)?;
        c.bool(self.unload)
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self, LayoutError> {
        Ok(Tweaks {
            cinematic: r.bool()?,
            sensor: r.bool()?,
            magnetism: r.bool()?,
            auto_aim: r.bool()?,
            acceleration: r.bool()?,
            unload: r.bool()?,
        })
    }
}

/// How [`Configuration::load_with_outcome`] obtained its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Record read as stored
    Loaded,
    /// No file existed; defaults were written
    Created,
    /// Stored record had a foreign signature or version; defaults were written
    Reset { found: u8 },
}

/// Kernel configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub mode: Mode,
    pub main: Main,
    pub video: Video,
    pub audio: Audio,
    pub input: Input,
    pub tweaks: Tweaks,
    /// Patch catalog groups enabled by index
    pub patches: u32,
    pub shaders: Shaders,
}

impl Configuration {
    /// Load the record at `path`.
    ///
    /// A missing file is created with defaults. A record with a different
    /// version (or signature) is silently replaced by defaults; use
    /// [`Configuration::load_with_outcome`] to find out whether that happened.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_outcome(path).map(|(config, _)| config)
    }

    pub fn load_with_outcome(path: &Path) -> Result<(Self, LoadOutcome), ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "Configuration absent, writing defaults");
            let config = Configuration::default();
            config.save(path)?;
            return Ok((config, LoadOutcome::Created));
        }

        // Only the header has to be present to tell a foreign record apart.
        let blob = Blob::open_sized(path, HEADER_LENGTH)?;
        let signature = blob.read_utf16(offsets::SIGNATURE, SIGNATURE.len())?;
        let version = blob.read_u8(offsets::VERSION)?;

        if signature != SIGNATURE || version != VERSION {
            warn!(
                path = %path.display(),
                found = version,
                expected = VERSION,
                "Configuration version mismatch, resetting to defaults"
            );
            let config = Configuration::default();
            config.save(path)?;
            return Ok((config, LoadOutcome::Reset { found: version }));
        }

        if blob.len() < LENGTH {
            return Err(LayoutError::TruncatedRecord {
                offset: 0,
                width: LENGTH,
                len: blob.len(),
            }
            .into());
        }

        let config = Self::decode(blob.as_bytes())?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok((config, LoadOutcome::Loaded))
    }

    /// Persist the record, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let blob = Blob::from_bytes(path, self.encode()?);
        blob.flush()?;
        debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Serialize into a complete record, header included.
    pub fn encode(&self) -> Result<Vec<u8>, LayoutError> {
        let mut blob = Blob::new(PathBuf::new(), LENGTH);
        blob.write_utf16(offsets::SIGNATURE, SIGNATURE.len(), SIGNATURE)?;
        blob.write_u8(offsets::VERSION, VERSION)?;
        blob.write_u8(offsets::MODE, self.mode.as_u8())?;
        self.main.encode(&mut blob.cursor(offsets::MAIN))?;
        self.video.encode(&mut blob.cursor(offsets::VIDEO))?;
        self.audio.encode(&mut blob.cursor(offsets::AUDIO))?;
        self.input.encode(&mut blob.cursor(offsets::INPUT))?;
        self.tweaks.encode(&mut blob.cursor(offsets::TWEAKS))?;
        blob.cursor(offsets::PATCHES).u32(self.patches)?;
        blob.cursor(offsets::SHADERS).i32(self.shaders.bits() as i32)?;
        Ok(blob.into_bytes())
    }

    /// Decode the sections of a record. The header is not checked here.
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let mode = Mode::from_u8(FieldReader::new(data, offsets::MODE).u8()?);
        let main = Main::decode(&mut FieldReader::new(data, offsets::MAIN))?;
        let video = Video::decode(&mut FieldReader::new(data, offsets::VIDEO))?;
        let audio = Audio::decode(&mut FieldReader::new(data, offsets::AUDIO))?;
        let input = Input::decode(&mut FieldReader::new(data, offsets::INPUT))?;
        let tweaks = Tweaks::decode(&mut FieldReader::new(data, offsets::TWEAKS))?;
        let patches = FieldReader::new(data, offsets::PATCHES).u32()?;
        let shaders = FieldReader::new(data, offsets::SHADERS).i32()?;

        Ok(Configuration {
            mode,
            main,
            video,
            audio,
            input,
            tweaks,
            patches,
            shaders: Shaders::from_bits_retain(shaders as u32),
        })
    }

    /// Set a single option by its dotted name, e.g. `video.gamma=180`.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let flag = || parse_bool(value).ok_or_else(invalid);

        match key {
            "mode" => self.mode = value.parse()?,
            "main.reset" => self.main.reset = flag()?,
            "main.patch" => self.main.patch = flag()?,
            "main.start" => self.main.start = flag()?,
            "main.resume" => self.main.resume = flag()?,
            "main.blind" => self.main.blind = flag()?,
            "video.resolution" => self.video.resolution = flag()?,
            "video.uncap" => self.video.uncap = flag()?,
            "video.quality" => self.video.quality = flag()?,
            "video.gamma_enabled" => self.video.gamma_enabled = flag()?,
            "video.gamma" => self.video.gamma = value.parse().map_err(|_| invalid())?,
            "video.bless" => self.video.bless = flag()?,
            "audio.quality" => self.audio.quality = flag()?,
            "audio.enhancements" => self.audio.enhancements = flag()?,
            "input.override" => self.input.override_bindings = flag()?,
            "tweaks.cinematic" => self.tweaks.cinematic = flag()?,
            "tweaks.sensor" => self.tweaks.sensor = flag()?,
            "tweaks.magnetism" => self.tweaks.magnetism = flag()?,
            "tweaks.auto_aim" => self.tweaks.auto_aim = flag()?,
            "tweaks.acceleration" => self.tweaks.acceleration = flag()?,
            "tweaks.unload" => self.tweaks.unload = flag()?,
            "patches" => self.patches = parse_mask(value).ok_or_else(invalid)?,
            "shaders" => {
                self.shaders = Shaders::from_bits_retain(parse_mask(value).ok_or_else(invalid)?)
            }
            _ => return Err(ConfigError::UnknownOption(key.to_string())),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_mask(value: &str) -> Option<u32> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
