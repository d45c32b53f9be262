//! Identity types for MeshGuard
//!
//! Senders are opaque strings handed to us by the transport bridge; nothing
//! about their shape is trusted. Fingerprints are fixed 64-bit digests of
//! normalized message content.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::GuardError;

/// Sender identity - opaque node ID as reported by the relay
///
/// The empty string is a valid identity: messages whose origin could not
/// be resolved all share it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderId(String);

impl SenderId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        SenderId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the shared identity of unresolved senders
    #[inline]
    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SenderId {
    fn from(id: &str) -> Self {
        SenderId(id.to_owned())
    }
}

impl From<String> for SenderId {
    fn from(id: String) -> Self {
        SenderId(id)
    }
}

impl AsRef<str> for SenderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sender({:?})", self.0)
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<anonymous>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Digest prefix length in bytes (16 hex characters)
pub const FINGERPRINT_LEN: usize = 8;

/// Content fingerprint - truncated digest of normalized message text
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint(pub [u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub const LEN: usize = FINGERPRINT_LEN;

    #[inline]
    pub fn to_bytes(self) -> [u8; Self::LEN] {
        self.0
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, GuardError> {
        let mut bytes = [0u8; Self::LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| GuardError::InvalidFingerprint(s.to_owned()))?;
        Ok(Fingerprint(bytes))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fp({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = GuardError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Fingerprint::from_hex(&s)
    }
}
