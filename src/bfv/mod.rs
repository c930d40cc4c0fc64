pub mod keygen;
pub mod encrypt;
pub mod eval;
pub mod encoding;

pub use keygen::{SecretKey, PublicKey, KeyPair, generate_keypair, generate_keypair_with_rng};
pub use encrypt::{encrypt_pk, encrypt_pk_with_rng, decrypt};
pub use eval::{bfv_add, bfv_sub, bfv_neg, bfv_mul, bfv_square};
pub use encoding::IntegerCodec;

use std::sync::Arc;

use crate::backend::{HeCiphertext, WireObject};
use crate::error::{HeError, Result};
use crate::params::{EncryptionParameters, ParamsId};
use crate::ring::rns::RnsPoly;
use crate::serialize::{self, WireReader, WireTag, WireWriter};

/// A BFV ciphertext: (c0, c1, ..., c_k). Fresh ciphertexts have two
/// components; multiplying sizes s1 and s2 gives s1 + s2 - 1.
#[derive(Clone, Debug, PartialEq)]
pub struct Ciphertext {
    pub c: Vec<RnsPoly>,
    pub params_id: ParamsId,
    /// Heuristic remaining noise budget in bits.
    pub noise_estimate: f64,
}

impl Ciphertext {
    pub fn size(&self) -> usize {
        self.c.len()
    }

    pub fn degree(&self) -> usize {
        self.c.len() - 1
    }
}

impl WireObject for Ciphertext {
    fn params_id(&self) -> ParamsId {
        self.params_id
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::new(WireTag::Ciphertext);
        w.put_params_id(&self.params_id);
        w.put_f64(self.noise_estimate);
        w.put_polys(&self.c.iter().collect::<Vec<_>>());
        w.finish()
    }

    fn from_bytes(bytes: &[u8], params: &Arc<EncryptionParameters>) -> Result<Self> {
        let mut r = WireReader::new(bytes, WireTag::Ciphertext)?;
        let params_id = r.params_id()?;
        if params_id != params.params_id() {
            return Err(HeError::IncompatibleParameters);
        }
        let noise_estimate = r.f64()?;
        if !noise_estimate.is_finite() {
            return Err(HeError::Deserialization("noise estimate is not finite".into()));
        }
        let c = r.polys(params.ct_basis(), 2, serialize::MAX_COMPONENTS)?;
        r.finish()?;
        Ok(Self { c, params_id, noise_estimate })
    }
}

impl HeCiphertext for Ciphertext {
    fn size(&self) -> usize {
        Ciphertext::size(self)
    }

    fn noise_estimate(&self) -> f64 {
        self.noise_estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::presets::{compact_params, default_params};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_ciphertext_bytes_roundtrip() {
        for params in [default_params().unwrap(), compact_params().unwrap()] {
            let mut rng = ChaCha20Rng::seed_from_u64(9);
            let keys = generate_keypair_with_rng(&params, &mut rng).unwrap();
            let codec = IntegerCodec::new(&params);
            let a = encrypt_pk_with_rng(&codec.encode(-5), &keys.public_key, &params, &mut rng).unwrap();
            let b = encrypt_pk_with_rng(&codec.encode(7), &keys.public_key, &params, &mut rng).unwrap();
            let prod = bfv_mul(&a, &b, &params).unwrap();
            assert_eq!(prod.size(), 3);

            for ct in [a, prod] {
                let back = Ciphertext::from_bytes(&ct.to_bytes(), &params).unwrap();
                assert_eq!(back, ct);
                assert_eq!(back.to_bytes(), ct.to_bytes());
            }
        }
    }
}
