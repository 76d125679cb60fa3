//! Host display information consumed by the profile codec.

use serde::Serialize;
use std::fmt;

/// Screen dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub width: u16,
    pub height: u16,
}

impl Resolution {
    pub const fn new(width: u16, height: u16) -> Self {
        Resolution { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w.trim().parse().map_err(|_| format!("invalid width '{}'", w))?;
        let height = h.trim().parse().map_err(|_| format!("invalid height '{}'", h))?;
        Ok(Resolution { width, height })
    }
}

/// Source of the current screen resolution
pub trait ScreenResolution {
    /// `None` when the host cannot tell
    fn current(&self) -> Option<Resolution>;
}

/// Resolution known up front (from the command line or a settings file)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedResolution(pub Option<Resolution>);

impl ScreenResolution for FixedResolution {
    fn current(&self) -> Option<Resolution> {
        self.0
    }
}
