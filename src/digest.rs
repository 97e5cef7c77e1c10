use std::io::{ErrorKind, Read};

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const HEX_LEN: usize = 64;

/// SHA-256 of the empty byte sequence.
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const READ_BUF_SIZE: usize = 64 * 1024;

/// Error returned when an expected digest string is not 64 hex digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestParseError {
    Length(usize),
    NonHex { index: usize, ch: char },
}

impl std::fmt::Display for DigestParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Length(n) => write!(
                f,
                "expected a {HEX_LEN}-character SHA-256 hex digest, got {n} characters"
            ),
            Self::NonHex { index, ch } => {
                write!(f, "invalid hex digit {ch:?} at position {index}")
            }
        }
    }
}

impl std::error::Error for DigestParseError {}

/// The digest the caller expects the render output to hash to.
///
/// Stored lowercased; comparison against an [`ObservedDigest`] is
/// case-insensitive either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDigest(String);

impl ExpectedDigest {
    /// Parse a hex digest, ignoring surrounding whitespace and letter case.
    ///
    /// # Errors
    ///
    /// Returns [`DigestParseError`] if the trimmed input is not exactly
    /// [`HEX_LEN`] ASCII hex digits.
    pub fn parse(s: &str) -> Result<Self, DigestParseError> {
        let s = s.trim();
        let len = s.chars().count();
        if len != HEX_LEN {
            return Err(DigestParseError::Length(len));
        }
        if let Some((index, ch)) = s.chars().enumerate().find(|(_, c)| !c.is_ascii_hexdigit()) {
            return Err(DigestParseError::NonHex { index, ch });
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, observed: &ObservedDigest) -> bool {
        self.0.eq_ignore_ascii_case(&observed.hex)
    }
}

impl std::str::FromStr for ExpectedDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ExpectedDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A finalized digest of a fully consumed byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedDigest {
    /// Lowercase hex SHA-256.
    pub hex: String,
    /// Number of bytes that went into the hash.
    pub bytes: u64,
}

/// Incremental SHA-256 over a byte stream.
#[derive(Default)]
pub struct StreamDigest {
    hasher: Sha256,
    bytes: u64,
}

impl StreamDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Read `reader` to end-of-stream, hashing each chunk as it arrives.
    /// Memory use is bounded by the read buffer, not the stream length.
    ///
    /// # Errors
    ///
    /// Returns any read error other than [`ErrorKind::Interrupted`], which
    /// is retried.
    pub fn consume<R: Read>(&mut self, reader: &mut R) -> std::io::Result<()> {
        let mut buf = vec![0u8; READ_BUF_SIZE];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => self.update(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    pub fn finalize(self) -> ObservedDigest {
        ObservedDigest {
            hex: to_hex(&self.hasher.finalize()),
            bytes: self.bytes,
        }
    }
}

/// Hash everything `reader` yields until end-of-stream.
///
/// # Errors
///
/// Propagates read errors from [`StreamDigest::consume`].
pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<ObservedDigest> {
    let mut digest = StreamDigest::new();
    digest.consume(&mut reader)?;
    Ok(digest.finalize())
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
