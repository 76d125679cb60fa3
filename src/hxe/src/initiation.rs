//! Initiation file: console directives the game runs at startup.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::campaign::{Difficulty, Mission};
use crate::config::{Shaders, Tweaks};

/// Default file name, beside the executable
pub const FILE_NAME: &str = "initc.txt";

/// Directives that hide the HUD
pub const BLIND_DIRECTIVES: &[&str] = &[
    "hud_show_crosshair 0",
    "hud_show_health 0",
    "hud_show_shield 0",
    "hud_show_motion_sensor 0",
];

fn flag(value: bool) -> u8 {
    u8::from(value)
}

/// Hit sound volume scaled to the strongest motion blur in use
pub fn hit_sound_volume(shaders: Shaders) -> f32 {
    if shaders.contains(Shaders::MOTION_BLUR_POMB_HIGH) {
        1.4
    } else if shaders.contains(Shaders::MOTION_BLUR_POMB_LOW) {
        1.2
    } else if shaders.contains(Shaders::MOTION_BLUR_BUILT_IN) {
        1.1
    } else {
        1.0
    }
}

/// Directives for a launch, in the order the game must see them.
pub fn encode_directives(
    mission: Mission,
    difficulty: Difficulty,
    shaders: Shaders,
    tweaks: &Tweaks,
) -> Vec<String> {
    let mut lines = vec![
        format!("set f1 {}", mission.value()),
        format!("set f3 {}", difficulty.value()),
        format!("cinematic_show_letterbox {}", flag(tweaks.cinematic)),
        format!("hud_show_motion_sensor {}", flag(tweaks.sensor)),
        format!("player_magnetism {}", flag(tweaks.magnetism)),
        format!("player_autoaim {}", flag(tweaks.auto_aim)),
        format!("mouse_acceleration {}", flag(tweaks.acceleration)),
    ];

    if tweaks.unload {
        lines.push("pp_unload".to_string());
    }

    let bits = shaders.bits();
    lines.extend(
        (0..u32::BITS)
            .filter(|i| bits & (1 << i) != 0)
            .map(|i| format!("pp_set_effect_instance_active {i} 1")),
    );

    lines.push(format!(
        "set multiplayer_hit_sound_volume {:.1}",
        hit_sound_volume(shaders)
    ));
    lines
}

pub struct Initiation;

impl Initiation {
    /// Replace the file at `path` with `lines`, CRLF terminated.
    pub fn write(path: &Path, lines: &[String]) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\r\n")?;
        }
        writer.flush()?;
        debug!(path = %path.display(), lines = lines.len(), "Initiation file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_order() {
        let tweaks = Tweaks {
            cinematic: true,
            sensor: false,
            magnetism: true,
            auto_aim: false,
            acceleration: true,
            unload: true,
        };
        let shaders = Shaders::DOF_LOW | Shaders::MOTION_BLUR_POMB_LOW | Shaders::HUD_VISOR;

        let lines = encode_directives(Mission::Spv3B30, Difficulty::Legendary, shaders, &tweaks);
        assert_eq!(
            lines,
            vec![
                format!("set f1 {}", Mission::Spv3B30.value()),
                "set f3 3".to_string(),
                "cinematic_show_letterbox 1".to_string(),
                "hud_show_motion_sensor 0".to_string(),
                "player_magnetism 1".to_string(),
                "player_autoaim 0".to_string(),
                "mouse_acceleration 1".to_string(),
                "pp_unload".to_string(),
                "pp_set_effect_instance_active 0 1".to_string(),
                "pp_set_effect_instance_active 3 1".to_string(),
                "pp_set_effect_instance_active 11 1".to_string(),
                "set multiplayer_hit_sound_volume 1.2".to_string(),
            ]
        );
    }

    #[test]
    fn test_defaults_have_no_optional_lines() {
        let lines = encode_directives(
            Mission::PillarOfAutumn,
            Difficulty::Normal,
            Shaders::empty(),
            &Tweaks::default(),
        );
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "set f1 0");
        assert_eq!(lines[1], "set f3 1");
        assert!(!lines.iter().any(|l| l == "pp_unload"));
        assert_eq!(lines[7], "set multiplayer_hit_sound_volume 1.0");
    }

    #[test]
    fn test_hit_sound_priority() {
        let all = Shaders::MOTION_BLUR_BUILT_IN
            | Shaders::MOTION_BLUR_POMB_LOW
            | Shaders::MOTION_BLUR_POMB_HIGH;
        assert_eq!(hit_sound_volume(all), 1.4);
        assert_eq!(
            hit_sound_volume(Shaders::MOTION_BLUR_BUILT_IN | Shaders::MOTION_BLUR_POMB_LOW),
            1.2
        );
        assert_eq!(hit_sound_volume(Shaders::MOTION_BLUR_BUILT_IN), 1.1);
        assert_eq!(hit_sound_volume(Shaders::DOF_HIGH), 1.0);
    }

    #[test]
    fn test_write_crlf_and_truncate() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(FILE_NAME);
        std::fs::write(&path, "stale content that is longer than the new file\n").unwrap();

        Initiation::write(&path, &["set f1 3".to_string(), "set f3 2".to_string()]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "set f1 3\r\nset f3 2\r\n");
    }
}
