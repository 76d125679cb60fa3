//! Campaign mission and difficulty symbols.
//!
//! Save files store the mission as a scenario token and the difficulty as a
//! raw byte. Both map onto symbolic enums scoped per product variant. Lookups
//! are permissive: anything unrecognised resolves to the variant's first
//! mission or to [`Difficulty::Normal`], so a blank or newer save never blocks
//! a launch.

use serde::Serialize;
use std::fmt;

use crate::config::Mode;

/// Product variant whose campaign tables apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Variant {
    /// Stock campaign
    Base,
    /// SPV3 campaign
    Mod,
}

impl From<Mode> for Variant {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Spv3 => Variant::Mod,
            Mode::Hce | Mode::Hxe => Variant::Base,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mission {
    // Stock campaign
    PillarOfAutumn,
    Halo,
    TruthAndReconciliation,
    SilentCartographer,
    AssaultOnTheControlRoom,
    GuiltySpark,
    Library,
    TwoBetrayals,
    Keyes,
    Maw,

    // SPV3 campaign
    Spv3A10,
    Spv3A30,
    Spv3A50,
    Spv3B30,
    Spv3B30Evolved,
    Spv3B40,
    Spv3C10,
    Spv3C20,
    Spv3C40,
    Spv3D20,
    Spv3D25,
    Spv3D30,
    Spv3D30Evolved,
    Spv3D40,
    LumoriaA,
    LumoriaB,
    LumoriaCd,
}

/// One row of a campaign symbol table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionEntry {
    pub token: &'static str,
    pub mission: Mission,
    /// Value written to the initiation file
    pub value: u8,
    pub title: &'static str,
}

const fn entry(
    token: &'static str,
    mission: Mission,
    value: u8,
    title: &'static str,
) -> MissionEntry {
    MissionEntry {
        token,
        mission,
        value,
        title,
    }
}

/// Stock campaign, in play order. Values count from 0.
pub const BASE_MISSIONS: &[MissionEntry] = &[
    entry("a10", Mission::PillarOfAutumn, 0, "The Pillar of Autumn"),
    entry("a30", Mission::Halo, 1, "Halo"),
    entry("a50", Mission::TruthAndReconciliation, 2, "The Truth and Reconciliation"),
    entry("b30", Mission::SilentCartographer, 3, "The Silent Cartographer"),
    entry("b40", Mission::AssaultOnTheControlRoom, 4, "Assault on the Control Room"),
    entry("c10", Mission::GuiltySpark, 5, "343 Guilty Spark"),
    entry("c20", Mission::Library, 6, "The Library"),
    entry("c40", Mission::TwoBetrayals, 7, "Two Betrayals"),
    entry("d20", Mission::Keyes, 8, "Keyes"),
    entry("d40", Mission::Maw, 9, "The Maw"),
];

/// SPV3 campaign, in play order. Values count from 1.
pub const MOD_MISSIONS: &[MissionEntry] = &[
    entry("spv3a10", Mission::Spv3A10, 1, "The Pillar of Autumn"),
    entry("spv3a30", Mission::Spv3A30, 2, "Halo"),
    entry("spv3a50", Mission::Spv3A50, 3, "The Truth and Reconciliation"),
    entry("spv3b30", Mission::Spv3B30, 4, "The Silent Cartographer"),
    entry("spv3b30_evolved", Mission::Spv3B30Evolved, 5, "The Silent Cartographer: Evolved"),
    entry("spv3b40", Mission::Spv3B40, 6, "Assault on the Control Room"),
    entry("spv3c10", Mission::Spv3C10, 7, "343 Guilty Spark"),
    entry("spv3c20", Mission::Spv3C20, 8, "The Library"),
    entry("spv3c40", Mission::Spv3C40, 9, "Two Betrayals"),
    entry("spv3d20", Mission::Spv3D20, 10, "Keyes"),
    entry("spv3d25", Mission::Spv3D25, 11, "The Flood"),
    entry("spv3d30", Mission::Spv3D30, 12, "The Maw"),
    entry("spv3d30_evolved", Mission::Spv3D30Evolved, 13, "The Maw: Evolved"),
    entry("spv3d40", Mission::Spv3D40, 14, "The Maw: Escape"),
    entry("lumoria_a", Mission::LumoriaA, 15, "Lumoria A"),
    entry("lumoria_b", Mission::LumoriaB, 16, "Lumoria B"),
    entry("lumoria_cd", Mission::LumoriaCd, 17, "Lumoria C&D"),
];

impl Variant {
    pub fn missions(self) -> &'static [MissionEntry] {
        match self {
            Variant::Base => BASE_MISSIONS,
            Variant::Mod => MOD_MISSIONS,
        }
    }

    /// Mission a new save starts at
    pub fn first_mission(self) -> &'static MissionEntry {
        &self.missions()[0]
    }
}

/// Entry for `mission` in whichever table holds it.
pub fn mission_entry(mission: Mission) -> &'static MissionEntry {
    BASE_MISSIONS
        .iter()
        .chain(MOD_MISSIONS)
        .find(|e| e.mission == mission)
        .unwrap_or(&BASE_MISSIONS[0])
}

impl Mission {
    /// Numeric value written to the initiation file
    pub fn value(self) -> u8 {
        mission_entry(self).value
    }

    pub fn title(self) -> &'static str {
        mission_entry(self).title
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Reduce a stored scenario reference (`levels\a10\a10`, `A10`) to its token.
fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Resolve a save-file token to its mission.
///
/// Unknown or empty tokens resolve to the variant's first mission.
pub fn symbolic_mission(token: &str, variant: Variant) -> Mission {
    let token = normalize_token(token);
    variant
        .missions()
        .iter()
        .find(|e| e.token == token)
        .unwrap_or_else(|| variant.first_mission())
        .mission
}

/// Save-file token for `mission`.
///
/// A mission from another variant's table yields the variant's first token.
pub fn raw_token(mission: Mission, variant: Variant) -> &'static str {
    variant
        .missions()
        .iter()
        .find(|e| e.mission == mission)
        .unwrap_or_else(|| variant.first_mission())
        .token
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Difficulty {
    Easy = 0,
    #[default]
    Normal = 1,
    Heroic = 2,
    Legendary = 3,
}

impl Difficulty {
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Heroic => "Heroic",
            Difficulty::Legendary => "Legendary",
        };
        f.write_str(name)
    }
}

/// Resolve a stored difficulty byte. Out-of-range values resolve to Normal.
///
/// The byte layout is shared by both variants.
pub fn symbolic_difficulty(value: u8) -> Difficulty {
    match value {
        0 => Difficulty::Easy,
        1 => Difficulty::Normal,
        2 => Difficulty::Heroic,
        3 => Difficulty::Legendary,
        _ => Difficulty::Normal,
    }
}
