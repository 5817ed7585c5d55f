//! BLAKE3-backed identifiers
//!
//! All opaque identifiers in KARMA (author ids, address material) are 32-byte
//! BLAKE3 outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id(pub [u8; 32]);

/// Identifier of a registered author
pub type AuthorId = Id;

/// Sequential post identifier, starting at 1
pub type PostId = u64;

/// Identifier of an in-flight randomness request
pub type RequestId = u64;

impl Id {
    /// Create a zero id (used as a placeholder in tests and defaults)
    pub const fn zero() -> Self {
        Id([0u8; 32])
    }

    /// Create id from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Id(bytes)
    }

    /// Create id from hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Id(arr))
    }

    /// Render as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix is enough to tell ids apart in logs
        write!(f, "Id({}...)", &self.to_hex()[..12])
    }
}

/// Hash arbitrary bytes into an `Id`
pub fn id_from_bytes(data: &[u8]) -> Id {
    Id(*blake3::hash(data).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_deterministic() {
        assert_eq!(id_from_bytes(b"alice"), id_from_bytes(b"alice"));
        assert_ne!(id_from_bytes(b"alice"), id_from_bytes(b"bob"));
    }

    #[test]
    fn test_hex_round_trip() {
        let id = id_from_bytes(b"round-trip");
        let parsed = Id::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_from_hex_rejects_bad_length() {
        assert!(Id::from_hex("abcd").is_err());
    }

    #[test]
    fn test_zero_is_all_zeroes() {
        assert_eq!(Id::zero().0, [0u8; 32]);
    }
}
