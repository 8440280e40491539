//! PID file handling.
//!
//! The file is created atomically with `create_new`, so an existing file
//! (another instance, or a stale file after a crash) is reported instead of
//! being overwritten.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use anyhow::Result;

/// Write the current process ID to `path`.
///
/// Missing parent directories are created (0o700 on unix) and the file
/// itself is restricted to 0o600.
///
/// # Errors
///
/// Returns an error if the file already exists, is not a regular file,
/// or cannot be written.
pub fn write_pid_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            fs::DirBuilder::new()
                .mode(0o700)
                .recursive(true)
                .create(parent)?;
        }
        #[cfg(not(unix))]
        fs::create_dir_all(parent)?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if !file.metadata()?.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    let pid = std::process::id();
    writeln!(file, "{pid}")?;

    tracing::info!(pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file. Failures are logged, never returned.
pub fn remove_pid_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "PID file removed"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file"),
    }
}
