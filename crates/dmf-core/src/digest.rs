//! # Content Checksums
//!
//! Defines `Checksum`, `DigestAlgorithm`, and the `ChecksumService` used
//! to decide whether uploaded content differs from the stored head
//! revision, and stored on every document as integrity metadata.
//!
//! ## Stream Invariant
//!
//! [`ChecksumService::digest_stream()`] reads the stream to its end and
//! then seeks it back to position zero, on success and on failure. A
//! caller can hand the same stream to the upload step without reopening
//! the file.

use std::io::{self, Read, Seek, SeekFrom};

use serde::{Deserialize, Serialize};
use sha2::Digest;

const READ_BLOCK: usize = 8 * 1024;

/// The hash algorithm behind a checksum.
///
/// SHA-1 is the default because stored repository metadata was written
/// with it. Comparing a SHA-256 checksum to a stored SHA-1 one always
/// reports a difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-1, 160-bit.
    #[default]
    Sha1,
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    /// The algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// Raw digest bytes.
    pub bytes: Vec<u8>,
}

impl Checksum {
    /// Render the digest as lowercase hex, the form stored on documents.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Compare against a stored hex checksum, ignoring ASCII case.
    pub fn matches_hex(&self, stored: &str) -> bool {
        self.to_hex().eq_ignore_ascii_case(stored.trim())
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Computes content checksums with a fixed algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecksumService {
    algorithm: DigestAlgorithm,
}

impl ChecksumService {
    /// A service using `algorithm`.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The configured algorithm.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Digest an in-memory buffer.
    pub fn digest_bytes(&self, data: &[u8]) -> Checksum {
        let bytes = match self.algorithm {
            DigestAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
        };
        Checksum {
            algorithm: self.algorithm,
            bytes,
        }
    }

    /// Digest a stream from its current position to the end, then rewind
    /// it to position zero.
    ///
    /// The rewind is attempted even when reading fails; the read error
    /// takes precedence over a seek error.
    pub fn digest_stream<R: Read + Seek>(&self, reader: &mut R) -> io::Result<Checksum> {
        let digest = match self.algorithm {
            DigestAlgorithm::Sha1 => stream_digest::<sha1::Sha1, _>(reader),
            DigestAlgorithm::Sha256 => stream_digest::<sha2::Sha256, _>(reader),
        };
        let rewind = reader.seek(SeekFrom::Start(0));
        let bytes = digest?;
        rewind?;
        Ok(Checksum {
            algorithm: self.algorithm,
            bytes,
        })
    }
}

fn stream_digest<D: Digest, R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut block = [0u8; READ_BLOCK];
    loop {
        match reader.read(&mut block) {
            Ok(0) => break,
            Ok(n) => hasher.update(&block[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(hasher.finalize().to_vec())
}
