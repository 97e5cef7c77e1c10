use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Flag that makes the render executable write its primary output to stdout
/// instead of a file.
pub const STDOUT_FLAG: &str = "--stdout";

/// The full command line for one render run: executable, [`STDOUT_FLAG`],
/// then the caller's extra arguments in order.
///
/// Immutable once built; [`Invocation::command`] produces a fresh
/// [`Command`] each time it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, extra_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut args = vec![OsString::from(STDOUT_FLAG)];
        args.extend(extra_args.into_iter().map(Into::into));
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to the program, starting with [`STDOUT_FLAG`].
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// All tokens, program first.
    pub fn tokens(&self) -> impl Iterator<Item = &OsStr> {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
    }

    /// Command with program and args set. Stdio is left to the caller.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Lossy, space-joined rendering for log lines.
    pub fn display(&self) -> String {
        self.tokens()
            .map(|t| t.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
