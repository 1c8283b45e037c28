//! # Content Hashing
//!
//! SHA-256 is the content-addressing function of the ledger. A document's
//! identity *is* its digest: byte-identical content always lands on the
//! same [`ContentDigest`], and any single-bit change lands somewhere else.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::DIGEST_LENGTH;

/// Compute the SHA-256 hash of `data` as a heap-allocated vector.
///
/// # Example
///
/// ```
/// use docauth_protocol::crypto::sha256;
///
/// assert_eq!(sha256(b"hello-doc").len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    sha256_array(data).to_vec()
}

/// Compute the SHA-256 hash of `data` as a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; DIGEST_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut output = [0u8; DIGEST_LENGTH];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Error returned when a string is not a valid hex digest.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid content digest: expected {DIGEST_LENGTH} hex-encoded bytes")]
pub struct DigestParseError;

/// A fixed-width SHA-256 digest of document content.
///
/// Ordered and hashable so it can key both in-memory maps and the
/// big-endian-sorted keys of the persistent store. Serialized as hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentDigest([u8; DIGEST_LENGTH]);

impl ContentDigest {
    /// Digest arbitrary content.
    pub fn of(content: &[u8]) -> Self {
        Self(sha256_array(content))
    }

    pub fn from_bytes(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse a digest from a byte slice of exactly [`DIGEST_LENGTH`] bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, DigestParseError> {
        slice.try_into().map(Self).map_err(|_| DigestParseError)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for ContentDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|_| DigestParseError)?;
        Self::try_from_slice(&bytes)
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.to_hex()
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = DigestParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256("abc") from FIPS 180-2.
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            hex::encode(sha256_array(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn content_digest_matches_sha256() {
        let digest = ContentDigest::of(b"hello-doc");
        assert_eq!(digest.as_bytes().to_vec(), sha256(b"hello-doc"));
    }

    #[test]
    fn one_byte_change_moves_the_digest() {
        assert_ne!(ContentDigest::of(b"hello-doc"), ContentDigest::of(b"hello-doC"));
    }

    #[test]
    fn parse_from_hex() {
        let digest = ContentDigest::of(b"x");
        let parsed: ContentDigest = digest.to_hex().parse().unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!("zz".parse::<ContentDigest>(), Err(DigestParseError));
        assert_eq!("abcd".parse::<ContentDigest>(), Err(DigestParseError));
    }

    #[test]
    fn serde_uses_hex() {
        let digest = ContentDigest::of(b"serde");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", digest.to_hex()));
    }
}
