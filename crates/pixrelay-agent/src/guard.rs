// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lock file preventing two bot instances from running at once.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pixrelay_core::RelayError;
use tracing::{debug, info, warn};

/// Exclusive lock file holding the owner's pid. Removed on release or drop.
#[derive(Debug)]
pub struct InstanceGuard {
    path: PathBuf,
    released: bool,
}

fn io_err(e: io::Error) -> RelayError {
    RelayError::Storage {
        source: Box::new(e),
    }
}

impl InstanceGuard {
    /// Takes the lock at `path`.
    ///
    /// A lock left behind by a process that no longer exists is replaced.
    /// A lock held by a live process fails with [`RelayError::Conflict`].
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, RelayError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        match create_lock(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if let Some(pid) = read_pid(&path).filter(|pid| pid_alive(*pid)) {
                    return Err(RelayError::Conflict(format!(
                        "another instance (pid {pid}) holds {}",
                        path.display()
                    )));
                }
                warn!(path = %path.display(), "removing stale instance lock");
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(io_err(e)),
                }
                create_lock(&path).map_err(|e| {
                    if e.kind() == io::ErrorKind::AlreadyExists {
                        RelayError::Conflict(format!("lost the race for {}", path.display()))
                    } else {
                        io_err(e)
                    }
                })?;
            }
            Err(e) => return Err(io_err(e)),
        }

        info!(path = %path.display(), pid = std::process::id(), "instance lock acquired");
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the lock file. Calling it again does nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "instance lock released"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove instance lock"),
        }
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        self.release();
    }
}

fn create_lock(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", std::process::id())
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> bool {
    pid == std::process::id() || Path::new("/proc").join(pid.to_string()).exists()
}

// Without procfs the holder cannot be checked, so every lock counts as live.
#[cfg(not(target_os = "linux"))]
fn pid_alive(_pid: u32) -> bool {
    true
}
