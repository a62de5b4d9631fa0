//! Process replacement after a successful install.
//!
//! On Unix the new binary replaces the current process image via `exec`, so
//! the PID, argv and environment carry over and nothing needs to supervise
//! the restart. Windows has no equivalent: [`ExecRestarter`] spawns the new
//! binary as a child and exits the parent, which leaves a brief window where
//! both processes exist.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use tracing::info;

use crate::core::UpdateError;

/// Capability to restart into a freshly installed binary.
///
/// Implementations that succeed normally do not return (the process image is
/// gone). Tests substitute a recording implementation.
pub trait Restarter: Send + Sync {
    /// Restart into `path`, passing `args` (including `argv[0]`) and `env`.
    fn restart(
        &self,
        path: &Path,
        args: &[OsString],
        env: &[(OsString, OsString)],
    ) -> Result<(), UpdateError>;
}

/// The platform restart strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecRestarter;

impl Restarter for ExecRestarter {
    #[cfg(unix)]
    fn restart(
        &self,
        path: &Path,
        args: &[OsString],
        env: &[(OsString, OsString)],
    ) -> Result<(), UpdateError> {
        use std::os::unix::process::CommandExt;

        info!(path = %path.display(), "Restarting into new binary");

        let mut command = build_command(path, args, env);
        if let Some(arg0) = args.first() {
            command.arg0(arg0);
        }

        // exec only returns on failure
        let source = command.exec();
        Err(UpdateError::Restart {
            path: path.display().to_string(),
            source,
        })
    }

    #[cfg(not(unix))]
    fn restart(
        &self,
        path: &Path,
        args: &[OsString],
        env: &[(OsString, OsString)],
    ) -> Result<(), UpdateError> {
        info!(path = %path.display(), "Spawning new binary and exiting");

        build_command(path, args, env).spawn().map_err(|source| UpdateError::Restart {
            path: path.display().to_string(),
            source,
        })?;
        std::process::exit(0);
    }
}

fn build_command(path: &Path, args: &[OsString], env: &[(OsString, OsString)]) -> Command {
    let mut command = Command::new(path);
    command.args(args.iter().skip(1)).env_clear().envs(env.iter().cloned());
    command
}

/// Arguments and environment of the current process, for forwarding.
#[must_use]
pub fn current_invocation() -> (Vec<OsString>, Vec<(OsString, OsString)>) {
    (std::env::args_os().collect(), std::env::vars_os().collect())
}
