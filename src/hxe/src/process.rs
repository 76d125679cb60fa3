//! Game process control.

use std::io;
use std::path::Path;
use std::process::Command;
use sysinfo::System;
use tracing::{debug, info, warn};

/// Operations the kernel needs on running processes
pub trait ProcessControl {
    /// Pids of running processes whose image name equals `image`, ignoring case
    fn find(&self, image: &str) -> Vec<u32>;

    /// Kill every process named `image`. Returns how many were killed.
    fn kill(&self, image: &str) -> usize;

    /// Start `exe` with `args`, working directory set to its parent.
    fn spawn(&self, exe: &Path, args: &[String]) -> io::Result<u32>;
}

/// [`ProcessControl`] over the host's process table
#[derive(Debug, Default)]
pub struct SystemProcesses;

fn snapshot() -> System {
    let mut system = System::new_all();
    system.refresh_all();
    system
}

fn matches_image(name: &str, image: &str) -> bool {
    name.eq_ignore_ascii_case(image)
}

impl ProcessControl for SystemProcesses {
    fn find(&self, image: &str) -> Vec<u32> {
        let system = snapshot();
        let mut pids: Vec<u32> = system
            .processes()
            .values()
            .filter(|p| matches_image(&p.name().to_string_lossy(), image))
            .map(|p| p.pid().as_u32())
            .collect();
        pids.sort_unstable();
        pids
    }

    fn kill(&self, image: &str) -> usize {
        let system = snapshot();
        let mut killed = 0;
        for process in system.processes().values() {
            if !matches_image(&process.name().to_string_lossy(), image) {
                continue;
            }
            let pid = process.pid().as_u32();
            if process.kill() {
                info!(pid, image, "Killed running game process");
                killed += 1;
            } else {
                warn!(pid, image, "Failed to kill game process");
            }
        }
        killed
    }

    fn spawn(&self, exe: &Path, args: &[String]) -> io::Result<u32> {
        let mut command = Command::new(exe);
        command.args(args);
        if let Some(dir) = exe.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }
        let child = command.spawn()?;
        debug!(pid = child.id(), path = %exe.display(), "Game process started");
        Ok(child.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_image() {
        assert!(matches_image("haloce.exe", "haloce.exe"));
        assert!(matches_image("HaloCE.EXE", "haloce.exe"));
        assert!(!matches_image("halo.exe", "haloce.exe"));
        assert!(!matches_image("haloce", "haloce.exe"));
    }

    #[test]
    fn test_find_absent_image() {
        assert!(SystemProcesses
            .find("no-such-image-for-hxe-tests.exe")
            .is_empty());
    }
}
