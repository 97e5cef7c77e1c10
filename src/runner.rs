use std::process::{Child, ExitStatus, Stdio};

use crate::digest::{ObservedDigest, hash_reader};
use crate::error::VerifyError;
use crate::invocation::Invocation;

/// What a completed render run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRun {
    pub digest: ObservedDigest,
    pub exit_code: i32,
}

/// Extract an exit code from a process status, mapping signals to 128+N on Unix.
pub fn exit_code_from_status(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status
            .code()
            .unwrap_or_else(|| status.signal().map_or(1, |s| 128 + s))
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(1)
    }
}

/// Owns a spawned child until it has been reaped. If dropped first (an
/// early return on a read error), the child is killed and waited on.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn wait(&mut self) -> std::io::Result<ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        tracing::debug!(pid = self.child.id(), "killing unreaped render process");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Run the render executable and hash its stdout.
///
/// Stdout is drained to end-of-stream before the child is waited on, so a
/// child producing more output than the pipe buffer holds cannot block.
/// Stdin and stderr are inherited.
///
/// # Errors
///
/// Returns [`VerifyError::Spawn`] if the executable cannot be started, or
/// [`VerifyError::Io`] if reading its output or waiting for it fails. The
/// child is reaped on every path.
pub fn run(invocation: &Invocation) -> Result<RenderRun, VerifyError> {
    tracing::debug!(command = %invocation.display(), "spawning render process");

    let child = invocation
        .command()
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| VerifyError::Spawn {
            program: invocation.program().to_path_buf(),
            source,
        })?;
    let mut guard = ChildGuard::new(child);

    let stdout = guard.child.stdout.take().ok_or_else(|| VerifyError::Io {
        context: "stdout not captured",
        source: std::io::Error::other("child has no stdout pipe"),
    })?;

    // The pipe is moved into hash_reader and closed when it returns.
    let digest = hash_reader(stdout).map_err(|source| VerifyError::Io {
        context: "failed to read render output",
        source,
    })?;
    tracing::debug!(bytes = digest.bytes, sha256 = %digest.hex, "render output hashed");

    let status = guard.wait().map_err(|source| VerifyError::Io {
        context: "failed to wait for render process",
        source,
    })?;
    let exit_code = exit_code_from_status(status);
    tracing::debug!(exit_code, "render process exited");

    Ok(RenderRun { digest, exit_code })
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;
    use crate::digest::{EMPTY_SHA256, to_hex};

    fn sha256_hex(data: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        to_hex(&Sha256::digest(data))
    }

    // Every test that spawns is #[serial]: exec'ing a script while another
    // thread's fork still holds its write fd fails with ETXTBSY.

    /// Write an executable `/bin/sh` script standing in for the render
    /// executable. It receives `--stdout` as `$1`.
    fn render_script(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("render.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn run_script(body: &str, extra: &[&str]) -> Result<RenderRun, VerifyError> {
        let dir = TempDir::new().unwrap();
        let exe = render_script(dir.path(), body);
        run(&Invocation::new(exe, extra.iter().copied()))
    }

    #[test]
    #[serial]
    fn run_hashes_stdout() {
        let run = run_script("printf hello", &[]).unwrap();
        assert_eq!(run.digest.hex, sha256_hex(b"hello"));
        assert_eq!(run.digest.bytes, 5);
        assert_eq!(run.exit_code, 0);
    }

    #[test]
    #[serial]
    fn run_empty_output() {
        let run = run_script("exit 0", &[]).unwrap();
        assert_eq!(run.digest.hex, EMPTY_SHA256);
        assert_eq!(run.digest.bytes, 0);
    }

    #[test]
    #[serial]
    fn run_propagates_exit_code() {
        let run = run_script("printf x; exit 7", &[]).unwrap();
        assert_eq!(run.exit_code, 7);
        assert_eq!(run.digest.hex, sha256_hex(b"x"));
    }

    #[test]
    #[serial]
    fn run_ignores_stderr() {
        let run = run_script("printf out; printf err >&2", &[]).unwrap();
        assert_eq!(run.digest.hex, sha256_hex(b"out"));
    }

    #[test]
    #[serial]
    fn run_drains_output_larger_than_pipe_buffer() {
        // 1 MiB of zeros, well past any default pipe capacity.
        let run = run_script("head -c 1048576 /dev/zero", &[]).unwrap();
        assert_eq!(run.digest.bytes, 1_048_576);
        assert_eq!(run.digest.hex, sha256_hex(&vec![0u8; 1_048_576]));
        assert_eq!(run.exit_code, 0);
    }

    #[test]
    #[serial]
    fn run_passes_stdout_flag_then_extra_args() {
        let run = run_script("printf '%s,' \"$@\"", &["--rom", "a b"]).unwrap();
        assert_eq!(run.digest.hex, sha256_hex(b"--stdout,--rom,a b,"));
    }

    #[test]
    #[serial]
    fn run_is_deterministic() {
        let a = run_script("printf frame; exit 3", &[]).unwrap();
        let b = run_script("printf frame; exit 3", &[]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    #[serial]
    fn run_signal_exit_code() {
        // SIGTERM = 15, expected exit code = 128 + 15 = 143
        let run = run_script("kill -TERM $$", &[]).unwrap();
        assert_eq!(run.exit_code, 143);
    }

    #[test]
    #[serial]
    fn run_missing_executable_is_spawn_error() {
        let inv = Invocation::new("/nonexistent/render_xyz_99", Vec::<String>::new());
        let err = run(&inv).unwrap_err();
        assert!(matches!(err, VerifyError::Spawn { .. }));
        assert_eq!(err.exit_code(), crate::error::EXIT_NOT_FOUND);
    }

    #[test]
    #[serial]
    fn run_missing_shebang_interpreter_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("render.sh");
        std::fs::write(&path, "#!/no/such/interp\nprintf never\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        let err = run(&Invocation::new(path, Vec::<String>::new())).unwrap_err();
        assert!(matches!(err, VerifyError::Spawn { .. }));
        assert_eq!(err.exit_code(), crate::error::EXIT_NOT_FOUND);
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn dropping_unreaped_guard_kills_and_reaps_child() {
        let child = std::process::Command::new("sleep").arg("100").spawn().unwrap();
        let pid = child.id();
        let proc_entry = std::path::PathBuf::from(format!("/proc/{pid}"));
        assert!(proc_entry.exists());
        drop(ChildGuard::new(child));
        assert!(!proc_entry.exists(), "pid {pid} still present after guard drop");
    }

    #[test]
    #[serial]
    fn run_non_executable_file_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("render.txt");
        std::fs::write(&path, "not a program").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let err = run(&Invocation::new(path, Vec::<String>::new())).unwrap_err();
        assert!(matches!(err, VerifyError::Spawn { .. }));
        assert_eq!(err.exit_code(), crate::error::EXIT_CANNOT_EXECUTE);
    }
}
