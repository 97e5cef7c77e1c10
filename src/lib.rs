//! Run a render executable and check the SHA-256 of what it writes to stdout.
//!
//! The child is always invoked as `<exe> --stdout <extra args...>`. Its stdout
//! is hashed as it streams in; once the stream ends the child is reaped and
//! the digest compared, case-insensitively, against the expected value.
//! See [`outcome::Outcome`] for how the result maps to an exit code.

pub mod config;
pub mod digest;
pub mod error;
pub mod invocation;
pub mod outcome;
pub mod report;
pub mod runner;

use digest::ExpectedDigest;
use error::VerifyError;
use invocation::Invocation;
use outcome::Verification;

/// Run `invocation` once and compare its stdout digest with `expected`.
///
/// # Errors
///
/// Returns [`VerifyError`] if the render executable cannot be started or its
/// output cannot be read. A digest mismatch is not an error.
pub fn verify(
    invocation: &Invocation,
    expected: &ExpectedDigest,
) -> Result<Verification, VerifyError> {
    let run = runner::run(invocation)?;
    Ok(Verification::new(expected, run))
}
