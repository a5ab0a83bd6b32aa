//! Credential attribute value encoding as practiced across the Aries
//! ecosystem: 32-bit integers encode as themselves, everything else as the
//! decimal form of the SHA-256 digest of the raw value.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};

pub fn encode_credential_attribute(raw: &str) -> String {
    if raw.parse::<i32>().is_ok() {
        raw.to_owned()
    } else {
        let digest = Sha256::digest(raw.as_bytes());
        BigUint::from_bytes_be(&digest).to_string()
    }
}

/// Whether a revealed attribute's claimed encoding matches its raw value.
pub fn is_valid_encoding(raw: &str, encoded: &str) -> bool {
    encode_credential_attribute(raw) == encoded
}
