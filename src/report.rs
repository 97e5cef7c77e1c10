use std::io::Write;

use serde::Serialize;

use crate::error::VerifyError;
use crate::outcome::{Outcome, Verification};

/// Notice printed on stdout when the digest does not match.
pub const MISMATCH_NOTICE: &str = "hash mismatch";

#[derive(Serialize)]
struct ErrorReport<'a> {
    result: &'static str,
    exit_code: i32,
    error: &'a str,
}

/// Write a Serialize value as pretty JSON followed by a newline.
///
/// # Errors
///
/// Returns a serialization error or any error from writing to `out`.
pub fn write_json(
    value: &(impl Serialize + ?Sized),
    out: &mut impl Write,
) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()
}

/// Print a Serialize value as pretty JSON, logging errors to stderr.
pub fn print_json(value: &(impl Serialize + ?Sized)) {
    if let Err(e) = write_json(value, &mut std::io::stdout().lock()) {
        eprintln!("[render-verify] failed to write JSON report: {e}");
    }
}

/// Write the plain-text report. A match prints nothing; a mismatch prints
/// [`MISMATCH_NOTICE`] to `out` and both digests to `err`.
///
/// # Errors
///
/// Returns any error from writing to `out` or `err`.
pub fn write_plain(
    v: &Verification,
    out: &mut impl Write,
    err: &mut impl Write,
) -> std::io::Result<()> {
    if let Outcome::Mismatch { child_exit_code } = v.outcome {
        writeln!(out, "{MISMATCH_NOTICE}")?;
        writeln!(err, "[render-verify] expected {}", v.expected)?;
        writeln!(err, "[render-verify] actual   {} ({} bytes)", v.actual, v.bytes)?;
        if child_exit_code != 0 {
            writeln!(err, "[render-verify] render exited with {child_exit_code}")?;
        }
    }
    Ok(())
}

/// Report a verification on stdout/stderr.
pub fn print_verification(v: &Verification, json: bool) {
    if json {
        print_json(v);
        return;
    }
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    if let Err(e) = write_plain(v, &mut stdout.lock(), &mut stderr.lock()) {
        tracing::warn!("failed to write report: {e}");
    }
}

/// Report an error that prevented verification.
pub fn print_error(e: &VerifyError, json: bool) {
    eprintln!("[render-verify] error: {e}");
    if json {
        print_json(&ErrorReport {
            result: "error",
            exit_code: e.exit_code(),
            error: &e.to_string(),
        });
    }
}
