//! Registered users and payout addresses
//!
//! A user's payout address is derived from their author id at registration
//! time. The address does NOT affect eligibility or winner selection - bugs
//! here cannot bias a draw.

use crate::ids::{id_from_bytes, AuthorId};
use serde::{Deserialize, Serialize};

/// A registered author
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Author id (derived from the registered name)
    pub id: AuthorId,
    /// Display name, unique across the store
    pub name: String,
    /// Free-form bio
    pub bio: String,
    /// Address rewards are paid to
    pub payout_address: String,
    /// Registration timestamp (Unix seconds)
    pub registered_at: u64,
}

impl User {
    /// Register a new user, deriving id and payout address from the name
    pub fn new(name: &str, bio: &str, registered_at: u64) -> Self {
        let id = id_from_bytes(name.as_bytes());
        let payout_address = derive_payout_address(&id);

        Self {
            id,
            name: name.to_string(),
            bio: bio.to_string(),
            payout_address,
            registered_at,
        }
    }
}

/// Derive a payout address from an author id
///
/// Address = "KRM" + Base58Check(BLAKE3(id)[0:20])
pub fn derive_payout_address(id: &AuthorId) -> String {
    let hash = id_from_bytes(&id.0);
    let addr_bytes = &hash.0[0..20];

    // Checksum: 4 bytes of the double hash
    let checksum = id_from_bytes(&id_from_bytes(addr_bytes).0);

    let mut with_checksum = Vec::with_capacity(24);
    with_checksum.extend_from_slice(addr_bytes);
    with_checksum.extend_from_slice(&checksum.0[0..4]);

    format!("KRM{}", bs58::encode(&with_checksum).into_string())
}

/// Validate a payout address and return its 20-byte payload
pub fn decode_payout_address(address: &str) -> Result<[u8; 20], String> {
    let encoded = address
        .strip_prefix("KRM")
        .ok_or_else(|| "Address must start with KRM".to_string())?;

    let decoded = bs58::decode(encoded)
        .into_vec()
        .map_err(|_| "Invalid base58 encoding".to_string())?;

    if decoded.len() != 24 {
        return Err("Invalid address length".to_string());
    }

    let addr_bytes = &decoded[0..20];
    let checksum = &decoded[20..24];

    let expected = id_from_bytes(&id_from_bytes(addr_bytes).0);
    if checksum != &expected.0[0..4] {
        return Err("Checksum mismatch".to_string());
    }

    let mut out = [0u8; 20];
    out.copy_from_slice(addr_bytes);
    Ok(out)
}
