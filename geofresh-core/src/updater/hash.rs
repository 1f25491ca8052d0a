//! Content hashing for staleness detection
//!
//! A dataset version is identified by the SHA-256 digest of its raw bytes.
//! No sidecar metadata is kept on disk; the hash is recomputed from file
//! content on each run. The absent sentinel stands in for "no prior file"
//! and never compares equal to any real digest, so a first-ever fetch is
//! always treated as changed.

use ring::digest::{digest, SHA256};

/// Opaque content digest of a byte buffer, or the absent sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentHash(Option<[u8; 32]>);

impl ContentHash {
    /// Compute the digest of a byte buffer
    pub fn of(data: &[u8]) -> Self {
        let d = digest(&SHA256, data);
        let mut out = [0u8; 32];
        out.copy_from_slice(d.as_ref());
        ContentHash(Some(out))
    }

    /// Sentinel for "no prior file" / "unreadable prior file"
    pub fn absent() -> Self {
        ContentHash(None)
    }

    /// True if this is the absent sentinel
    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// Staleness comparison: false whenever either side is absent
    ///
    /// Note this is deliberately not `==`: two absent sentinels do not
    /// match each other, which keeps "no local file" on the always-fetch
    /// path even against a degenerate transport.
    pub fn matches(&self, other: &ContentHash) -> bool {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(bytes) => write!(f, "{}", hex::encode(bytes)),
            None => write!(f, "(absent)"),
        }
    }
}
