//! A single fingerprint definition shared by cert issuance (`launcher`) and cert verification
//! (`aggregator`) so the two sides of SPEC_FULL.md §4.3's authentication check can never drift.

use sha2::{Digest, Sha256};

/// SHA-256 fingerprint of a DER-encoded X.509 certificate, upper-hex encoded.
pub fn fingerprint_der(der: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(der))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let der = b"not-a-real-certificate";
        assert_eq!(fingerprint_der(der), fingerprint_der(der));
    }

    #[test]
    fn different_input_different_fingerprint() {
        assert_ne!(fingerprint_der(b"a"), fingerprint_der(b"b"));
    }
}
