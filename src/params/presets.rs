use std::sync::Arc;
use crate::error::Result;
use crate::params::{EncryptionParameters, EncryptionParametersBuilder, SecurityLevel};

/// Factory default: n=2048, 128-bit profile (one 54-bit prime), t=2^8.
pub fn default_params() -> Result<Arc<EncryptionParameters>> {
    EncryptionParametersBuilder::new().build()
}

/// Room for two chained multiplications with a wider plaintext:
/// n=4096, 128-bit profile (55 + 54-bit primes), t=1024.
pub fn compact_params() -> Result<Arc<EncryptionParameters>> {
    EncryptionParametersBuilder::new()
        .poly_modulus_degree(4096)
        .security_level(SecurityLevel::Bits128)
        .plain_modulus(1024)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_build() {
        let d = default_params().unwrap();
        let c = compact_params().unwrap();
        assert_eq!(d.poly_modulus_degree(), 2048);
        assert_eq!(c.poly_modulus_degree(), 4096);
        assert_eq!(c.coeff_modulus().len(), 2);
        assert!(!d.compatible(&c));
    }
}
