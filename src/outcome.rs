use serde::Serialize;

use crate::digest::{ExpectedDigest, ObservedDigest};
use crate::runner::RenderRun;

/// Exit code reported when the output digest does not match.
pub const EXIT_MISMATCH: i32 = 1;

/// Result of comparing a render run against the expected digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// Digests differ. The child's own exit code is kept for reporting only.
    Mismatch { child_exit_code: i32 },
    /// Digests agree; the child's exit code is what the verifier exits with.
    Match { exit_code: i32 },
}

impl Outcome {
    pub fn decide(expected: &ExpectedDigest, run: &RenderRun) -> Self {
        if expected.matches(&run.digest) {
            Self::Match {
                exit_code: run.exit_code,
            }
        } else {
            Self::Mismatch {
                child_exit_code: run.exit_code,
            }
        }
    }

    /// Process exit code for this outcome: [`EXIT_MISMATCH`] on mismatch,
    /// otherwise the child's exit code unchanged.
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Mismatch { .. } => EXIT_MISMATCH,
            Self::Match { exit_code } => exit_code,
        }
    }

    pub const fn is_match(self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Everything known about one completed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    #[serde(flatten)]
    pub outcome: Outcome,
    pub expected: String,
    pub actual: String,
    pub bytes: u64,
}

impl Verification {
    pub fn new(expected: &ExpectedDigest, run: RenderRun) -> Self {
        let outcome = Outcome::decide(expected, &run);
        let ObservedDigest { hex, bytes } = run.digest;
        Self {
            outcome,
            expected: expected.as_str().to_string(),
            actual: hex,
            bytes,
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}
