// ─── Executable Swap ───
// Replaces the running executable with a downloaded one. How depends on
// whether the OS lets us touch a file that is currently executing.

use std::path::{Path, PathBuf};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

use tracing::{debug, info, warn};

use crate::core::error::{SyncError, SyncResult};

/// Seconds the Windows helper waits for this process to exit.
const WINDOWS_SWAP_DELAY_SECS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystem {
    Linux,
    MacOs,
    Windows,
    Unknown,
}

impl OperatingSystem {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OperatingSystem::Windows
        } else if cfg!(target_os = "macos") {
            OperatingSystem::MacOs
        } else if cfg!(target_os = "linux") {
            OperatingSystem::Linux
        } else {
            OperatingSystem::Unknown
        }
    }

    pub fn is_supported(self) -> bool {
        self != OperatingSystem::Unknown
    }

    /// Name of a downloaded replacement binary.
    pub fn new_executable_name(self, stem: &str) -> String {
        match self {
            OperatingSystem::Windows => format!("{stem}-new.exe"),
            _ => format!("{stem}-new"),
        }
    }
}

impl std::fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatingSystem::Linux => write!(f, "Linux"),
            OperatingSystem::MacOs => write!(f, "macOS"),
            OperatingSystem::Windows => write!(f, "Windows"),
            OperatingSystem::Unknown => write!(f, "{}", std::env::consts::OS),
        }
    }
}

/// A downloaded update waiting to replace the running executable.
///
/// Commit it as the very last step before the process exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSwap {
    pub current_executable: PathBuf,
    pub new_executable: PathBuf,
    /// Scratch folder for the Windows helper scripts.
    pub work_dir: PathBuf,
    pub os: OperatingSystem,
}

impl PendingSwap {
    pub fn commit(self) -> SyncResult<()> {
        match self.os {
            OperatingSystem::Linux | OperatingSystem::MacOs => self.commit_unix(),
            OperatingSystem::Windows => self.commit_windows(),
            OperatingSystem::Unknown => {
                warn!("⚠ Auto update is not supported on {}", self.os);
                Err(SyncError::UnsupportedPlatform(self.os.to_string()))
            }
        }
    }

    /// Unix keeps the old inode alive for the running process, so the new
    /// file can be renamed over it right away. Best-effort: a crash between
    /// the two steps leaves the old binary in place.
    fn commit_unix(self) -> SyncResult<()> {
        set_executable(&self.new_executable)?;
        if let Err(e) = std::fs::rename(&self.new_executable, &self.current_executable) {
            // Typically EXDEV: the instance and the executable live on
            // different filesystems.
            debug!("Direct rename failed ({}), copying next to the executable", e);
            replace_by_copy(&self.new_executable, &self.current_executable)?;
        }
        info!(
            "Replaced {:?} with the new version",
            self.current_executable
        );
        Ok(())
    }

    /// Windows won't delete or rename a running executable; a detached
    /// batch script does it once this process is gone.
    fn commit_windows(self) -> SyncResult<()> {
        std::fs::create_dir_all(&self.work_dir).map_err(|e| SyncError::io(&self.work_dir, e))?;

        let script_path = self.work_dir.join("update.bat");
        let message_path = self.work_dir.join("updateMessage.vbs");
        let script = windows_update_script(
            &self.current_executable,
            &self.new_executable,
            &message_path,
            WINDOWS_SWAP_DELAY_SECS,
        );
        std::fs::write(&script_path, script).map_err(|e| SyncError::io(&script_path, e))?;

        let mut cmd = std::process::Command::new("cmd");
        cmd.arg("/C").arg(&script_path);
        configure_detached_spawn(&mut cmd);
        cmd.spawn()
            .map_err(|e| SyncError::io(&script_path, e))?;

        info!("Update helper launched from {:?}", script_path);
        Ok(())
    }
}

/// Copy `new` to a sibling of `current`, then rename it over `current` so the
/// replacement itself stays a same-directory rename.
fn replace_by_copy(new: &Path, current: &Path) -> SyncResult<()> {
    let file_name = current
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "packsync".to_string());
    let sibling = current.with_file_name(format!(".{file_name}.new"));

    std::fs::copy(new, &sibling).map_err(|e| SyncError::io(&sibling, e))?;
    set_executable(&sibling)?;
    if let Err(e) = std::fs::rename(&sibling, current) {
        let _ = std::fs::remove_file(&sibling);
        return Err(SyncError::io(current, e));
    }
    if let Err(e) = std::fs::remove_file(new) {
        warn!("Cannot delete downloaded update {:?}: {}", new, e);
    }
    Ok(())
}

/// Batch script that waits, swaps the executable, tells the user and deletes
/// itself.
pub fn windows_update_script(
    current_executable: &Path,
    new_executable: &Path,
    message_script: &Path,
    delay_secs: u32,
) -> String {
    let current = current_executable.display();
    let new = new_executable.display();
    let message = message_script.display();
    let text = "Packsync has been updated. Relaunch to use the new version.";
    let title = "Update Complete";

    [
        "@echo off".to_string(),
        format!("echo Waiting {delay_secs} second(s) for the application to close..."),
        format!("timeout /t {delay_secs} /nobreak > nul"),
        format!("del /f \"{current}\""),
        format!("move /y \"{new}\" \"{current}\""),
        format!("echo MsgBox \"{text}\", 64, \"{title}\" > \"{message}\""),
        format!("cscript //nologo \"{message}\""),
        format!("del \"{message}\""),
        "(goto) 2>nul & del \"%~f0\"".to_string(),
    ]
    .join("\r\n")
}

fn configure_detached_spawn(cmd: &mut std::process::Command) {
    #[cfg(target_os = "windows")]
    {
        const CREATE_NEW_CONSOLE: u32 = 0x00000010;
        cmd.creation_flags(CREATE_NEW_CONSOLE);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

#[cfg(unix)]
fn set_executable(path: &Path) -> SyncResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)
        .map_err(|e| SyncError::io(path, e))?
        .permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions).map_err(|e| SyncError::io(path, e))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> SyncResult<()> {
    Ok(())
}
