//! Runtime artefacts owned by a running daemon.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use filterd_config::RuntimePaths;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::Serialize;
use tracing::{info, warn};

use crate::files::atomic_write;

use super::PROCESS_TARGET;
use super::errors::GuardError;

/// Holds the singleton lock and removes every runtime artefact on drop.
#[derive(Debug)]
pub(super) struct ProcessGuard {
    paths: RuntimePaths,
    _lock: File,
    pid: Option<u32>,
}

impl ProcessGuard {
    /// Takes the lock, clearing artefacts left by a daemon that is no longer
    /// alive.
    pub(super) fn acquire(paths: RuntimePaths) -> Result<Self, GuardError> {
        let lock = acquire_lock(&paths)?;
        Ok(Self {
            paths,
            _lock: lock,
            pid: None,
        })
    }

    pub(super) fn write_pid(&mut self, pid: u32) -> Result<(), GuardError> {
        let path = self.paths.pid_path();
        let pid_error = |source| GuardError::Pid {
            path: path.to_path_buf(),
            source,
        };
        let mut file = owner_only()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(pid_error)?;
        writeln!(file, "{pid}").map_err(pid_error)?;
        file.sync_all().map_err(pid_error)?;
        self.pid = Some(pid);
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(())
    }

    pub(super) fn write_health(&self, status: HealthState) -> Result<(), GuardError> {
        let pid = self.pid.ok_or(GuardError::PidNotWritten)?;
        let path = self.paths.health_path();
        let snapshot = HealthSnapshot::new(status, pid)?;
        let mut contents = serde_json::to_vec(&snapshot)?;
        contents.push(b'\n');
        atomic_write(path, &contents).map_err(|source| GuardError::Health {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            target: PROCESS_TARGET,
            status = snapshot.status,
            file = %path.display(),
            "health snapshot updated"
        );
        Ok(())
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        for (path, artefact) in [
            (self.paths.health_path(), "health file"),
            (self.paths.pid_path(), "pid file"),
            (self.paths.lock_path(), "lock file"),
        ] {
            if let Err(error) = fs::remove_file(path)
                && error.kind() != io::ErrorKind::NotFound
            {
                warn!(
                    target: PROCESS_TARGET,
                    file = %path.display(),
                    error = %error,
                    "failed to remove {artefact}"
                );
            }
        }
    }
}

/// Lifecycle stage recorded in the health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HealthState {
    Starting,
    Ready,
    Stopping,
}

impl HealthState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthSnapshot {
    status: &'static str,
    pid: u32,
    timestamp: u64,
}

impl HealthSnapshot {
    fn new(state: HealthState, pid: u32) -> Result<Self, GuardError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)?
            .as_secs();
        Ok(Self {
            status: state.as_str(),
            pid,
            timestamp,
        })
    }
}

fn owner_only() -> OpenOptions {
    let mut options = OpenOptions::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

fn acquire_lock(paths: &RuntimePaths) -> Result<File, GuardError> {
    match owner_only()
        .write(true)
        .create_new(true)
        .open(paths.lock_path())
    {
        Ok(file) => {
            info!(
                target: PROCESS_TARGET,
                file = %paths.lock_path().display(),
                "acquired daemon lock"
            );
            Ok(file)
        }
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => handle_existing_lock(paths),
        Err(source) => Err(GuardError::Lock {
            path: paths.lock_path().to_path_buf(),
            source,
        }),
    }
}

fn handle_existing_lock(paths: &RuntimePaths) -> Result<File, GuardError> {
    if let Some(pid) = read_pid(paths.pid_path()) {
        if process_alive(pid)? {
            info!(
                target: PROCESS_TARGET,
                pid,
                "refusing to start: existing daemon alive"
            );
            return Err(GuardError::AlreadyRunning { pid });
        }
        warn!(
            target: PROCESS_TARGET,
            pid,
            "existing daemon not detected; cleaning stale files"
        );
    }
    remove_file(paths.lock_path())?;
    remove_file(paths.pid_path())?;
    acquire_lock(paths)
}

fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok()
}

fn remove_file(path: &Path) -> Result<(), GuardError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(GuardError::Stale {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn process_alive(pid: u32) -> Result<bool, GuardError> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    if raw == 0 {
        return Ok(false);
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH | Errno::ECHILD) => Ok(false),
        Err(source) => Err(GuardError::Liveness { pid, source }),
    }
}
