use std::io::ErrorKind;
use std::path::PathBuf;

/// Exit code when the render executable does not exist. Also covers a script
/// whose shebang interpreter is missing: the OS reports that as NotFound too.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code when the render executable exists but could not be started.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
/// Exit code when reading the child's output or reaping it failed.
pub const EXIT_IO: i32 = 125;
/// Exit code for invalid invocations (matches clap's usage-error code).
pub const EXIT_USAGE: i32 = 2;

/// Failures that prevent a verification from producing an outcome.
///
/// A digest mismatch is not an error: it is an [`Outcome`](crate::outcome::Outcome).
#[derive(Debug)]
pub enum VerifyError {
    /// The render executable could not be launched.
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    /// Reading the child's stdout or waiting for it failed after it started.
    Io {
        context: &'static str,
        source: std::io::Error,
    },
}

impl VerifyError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Spawn { source, .. } if source.kind() == ErrorKind::NotFound => EXIT_NOT_FOUND,
            Self::Spawn { .. } => EXIT_CANNOT_EXECUTE,
            Self::Io { .. } => EXIT_IO,
        }
    }
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn { program, source } => {
                write!(f, "failed to start {}: {source}", program.display())
            }
            Self::Io { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl std::error::Error for VerifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } | Self::Io { source, .. } => Some(source),
        }
    }
}
