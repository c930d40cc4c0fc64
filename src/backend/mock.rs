//! Insecure plaintext-transparent back end.
//!
//! Ciphertexts carry the plaintext polynomial in the clear together with the
//! tag of the key that encrypted them. Decrypting with a different key, or a
//! sum of ciphertexts under different keys, measures a zero budget just as
//! the lattice back end would. Noise follows the same estimate model, so
//! exhaustion shows up after the same number of operations. Only for tests.

use std::sync::Arc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::backend::{Decryption, HeBackend, HeCiphertext, WireObject};
use crate::error::{HeError, Result};
use crate::noise;
use crate::params::{EncryptionParameters, ParamsId};
use crate::ring::poly::CoeffPoly;
use crate::serialize::{self, WireReader, WireTag, WireWriter};

#[derive(Clone, Copy, Debug, Default)]
pub struct MockBackend;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockPublicKey {
    pub tag: u64,
    pub params_id: ParamsId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockSecretKey {
    pub tag: u64,
    pub params_id: ParamsId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MockCiphertext {
    /// Key that can open this ciphertext; `None` once keys were mixed.
    pub key_tag: Option<u64>,
    pub plaintext: CoeffPoly,
    pub size: usize,
    pub noise_estimate: f64,
    pub params_id: ParamsId,
}

fn combine_tags(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(x), Some(y)) if x == y => Some(x),
        _ => None,
    }
}

impl HeBackend for MockBackend {
    type PublicKey = MockPublicKey;
    type SecretKey = MockSecretKey;
    type Ciphertext = MockCiphertext;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn generate_keypair(
        &self,
        params: &Arc<EncryptionParameters>,
    ) -> Result<(MockPublicKey, MockSecretKey)> {
        let tag: u64 = ChaCha20Rng::from_os_rng().random();
        let params_id = params.params_id();
        Ok((MockPublicKey { tag, params_id }, MockSecretKey { tag, params_id }))
    }

    fn encrypt(
        &self,
        plaintext: &CoeffPoly,
        public_key: &MockPublicKey,
        params: &Arc<EncryptionParameters>,
    ) -> Result<MockCiphertext> {
        if plaintext.modulus != params.plain_modulus() {
            return Err(HeError::ModulusMismatch);
        }
        if plaintext.len() != params.poly_modulus_degree() {
            return Err(HeError::DimensionMismatch {
                expected: params.poly_modulus_degree(),
                got: plaintext.len(),
            });
        }
        Ok(MockCiphertext {
            key_tag: Some(public_key.tag),
            plaintext: plaintext.clone(),
            size: 2,
            noise_estimate: noise::fresh_budget(params),
            params_id: params.params_id(),
        })
    }

    fn decrypt(
        &self,
        ciphertext: &MockCiphertext,
        secret_key: &MockSecretKey,
        params: &Arc<EncryptionParameters>,
    ) -> Result<Decryption> {
        if ciphertext.key_tag != Some(secret_key.tag) {
            return Ok(Decryption {
                plaintext: CoeffPoly::zero(params.poly_modulus_degree(), params.plain_modulus()),
                noise_budget: 0,
            });
        }
        Ok(Decryption {
            plaintext: ciphertext.plaintext.clone(),
            noise_budget: ciphertext.noise_estimate.max(0.0).floor() as u32,
        })
    }

    fn negate(&self, ct: &MockCiphertext, _params: &Arc<EncryptionParameters>) -> Result<MockCiphertext> {
        Ok(MockCiphertext {
            key_tag: ct.key_tag,
            plaintext: ct.plaintext.neg(),
            size: ct.size,
            noise_estimate: noise::negate_budget(ct.noise_estimate),
            params_id: ct.params_id,
        })
    }

    fn add(&self, a: &MockCiphertext, b: &MockCiphertext, _params: &Arc<EncryptionParameters>) -> Result<MockCiphertext> {
        Ok(MockCiphertext {
            key_tag: combine_tags(a.key_tag, b.key_tag),
            plaintext: a.plaintext.add(&b.plaintext)?,
            size: a.size.max(b.size),
            noise_estimate: noise::add_budget(a.noise_estimate, b.noise_estimate),
            params_id: a.params_id,
        })
    }

    fn sub(&self, a: &MockCiphertext, b: &MockCiphertext, _params: &Arc<EncryptionParameters>) -> Result<MockCiphertext> {
        Ok(MockCiphertext {
            key_tag: combine_tags(a.key_tag, b.key_tag),
            plaintext: a.plaintext.sub(&b.plaintext)?,
            size: a.size.max(b.size),
            noise_estimate: noise::add_budget(a.noise_estimate, b.noise_estimate),
            params_id: a.params_id,
        })
    }

    fn multiply(&self, a: &MockCiphertext, b: &MockCiphertext, params: &Arc<EncryptionParameters>) -> Result<MockCiphertext> {
        Ok(MockCiphertext {
            key_tag: combine_tags(a.key_tag, b.key_tag),
            plaintext: a.plaintext.mul_naive(&b.plaintext)?,
            size: a.size + b.size - 1,
            noise_estimate: noise::multiply_budget(params, a.noise_estimate, a.size, b.noise_estimate, b.size),
            params_id: a.params_id,
        })
    }
}

impl WireObject for MockPublicKey {
    fn params_id(&self) -> ParamsId {
        self.params_id
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::new(WireTag::MockPublicKey);
        w.put_params_id(&self.params_id);
        w.put_u64(self.tag);
        w.finish()
    }

    fn from_bytes(bytes: &[u8], params: &Arc<EncryptionParameters>) -> Result<Self> {
        let mut r = WireReader::new(bytes, WireTag::MockPublicKey)?;
        let params_id = r.params_id()?;
        if params_id != params.params_id() {
            return Err(HeError::KeyValidation("public"));
        }
        let tag = r.u64()?;
        r.finish()?;
        Ok(Self { tag, params_id })
    }
}

impl WireObject for MockSecretKey {
    fn params_id(&self) -> ParamsId {
        self.params_id
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::new(WireTag::MockSecretKey);
        w.put_params_id(&self.params_id);
        w.put_u64(self.tag);
        w.finish()
    }

    fn from_bytes(bytes: &[u8], params: &Arc<EncryptionParameters>) -> Result<Self> {
        let mut r = WireReader::new(bytes, WireTag::MockSecretKey)?;
        let params_id = r.params_id()?;
        if params_id != params.params_id() {
            return Err(HeError::KeyValidation("secret"));
        }
        let tag = r.u64()?;
        r.finish()?;
        Ok(Self { tag, params_id })
    }
}

impl WireObject for MockCiphertext {
    fn params_id(&self) -> ParamsId {
        self.params_id
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::new(WireTag::MockCiphertext);
        w.put_params_id(&self.params_id);
        match self.key_tag {
            Some(tag) => {
                w.put_u8(1);
                w.put_u64(tag);
            }
            None => w.put_u8(0),
        }
        w.put_u16(self.size as u16);
        w.put_f64(self.noise_estimate);
        w.put_u32(self.plaintext.len() as u32);
        for &c in &self.plaintext.coeffs {
            w.put_u64(c);
        }
        w.finish()
    }

    fn from_bytes(bytes: &[u8], params: &Arc<EncryptionParameters>) -> Result<Self> {
        let mut r = WireReader::new(bytes, WireTag::MockCiphertext)?;
        let params_id = r.params_id()?;
        if params_id != params.params_id() {
            return Err(HeError::IncompatibleParameters);
        }
        let key_tag = match r.u8()? {
            0 => None,
            1 => Some(r.u64()?),
            other => return Err(HeError::Deserialization(format!("bad key flag {other}"))),
        };
        let size = r.u16()? as usize;
        if !(2..=serialize::MAX_COMPONENTS).contains(&size) {
            return Err(HeError::Deserialization(format!("bad ciphertext size {size}")));
        }
        let noise_estimate = r.f64()?;
        if !noise_estimate.is_finite() {
            return Err(HeError::Deserialization("noise estimate is not finite".into()));
        }
        let n = r.u32()? as usize;
        if n != params.poly_modulus_degree() {
            return Err(HeError::Deserialization(format!(
                "expected {} coefficients, found {n}",
                params.poly_modulus_degree()
            )));
        }
        let t = params.plain_modulus();
        let coeffs = (0..n)
            .map(|_| {
                let c = r.u64()?;
                if c >= t {
                    return Err(HeError::Deserialization("plaintext coefficient out of range".into()));
                }
                Ok(c)
            })
            .collect::<Result<Vec<_>>>()?;
        r.finish()?;
        Ok(Self {
            key_tag,
            plaintext: CoeffPoly { coeffs, modulus: t },
            size,
            noise_estimate,
            params_id,
        })
    }
}

impl HeCiphertext for MockCiphertext {
    fn size(&self) -> usize {
        self.size
    }

    fn noise_estimate(&self) -> f64 {
        self.noise_estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfv::IntegerCodec;
    use crate::params::presets::default_params;

    #[test]
    fn test_mock_roundtrip_and_arithmetic() {
        let params = default_params().unwrap();
        let codec = IntegerCodec::new(&params);
        let backend = MockBackend;
        let (pk, sk) = backend.generate_keypair(&params).unwrap();

        let a = backend.encrypt(&codec.encode(6), &pk, &params).unwrap();
        let b = backend.encrypt(&codec.encode(-7), &pk, &params).unwrap();
        let prod = backend.multiply(&a, &b, &params).unwrap();
        assert_eq!(prod.size, 3);

        let out = backend.decrypt(&prod, &sk, &params).unwrap();
        assert_eq!(codec.decode(&out.plaintext).unwrap(), -42);

        let diff = backend.sub(&a, &backend.negate(&b, &params).unwrap(), &params).unwrap();
        let out = backend.decrypt(&diff, &sk, &params).unwrap();
        assert_eq!(codec.decode(&out.plaintext).unwrap(), -1);
        assert!(out.noise_budget > 0);
    }

    #[test]
    fn test_mock_wrong_key_has_no_budget() {
        let params = default_params().unwrap();
        let codec = IntegerCodec::new(&params);
        let backend = MockBackend;
        let (pk1, sk1) = backend.generate_keypair(&params).unwrap();
        let (pk2, _sk2) = backend.generate_keypair(&params).unwrap();

        let a = backend.encrypt(&codec.encode(1), &pk1, &params).unwrap();
        let b = backend.encrypt(&codec.encode(2), &pk2, &params).unwrap();
        let mixed = backend.add(&a, &b, &params).unwrap();
        assert_eq!(mixed.key_tag, None);
        assert_eq!(backend.decrypt(&mixed, &sk1, &params).unwrap().noise_budget, 0);
        assert_eq!(backend.decrypt(&b, &sk1, &params).unwrap().noise_budget, 0);
    }

    #[test]
    fn test_mock_wire_roundtrip() {
        let params = default_params().unwrap();
        let codec = IntegerCodec::new(&params);
        let backend = MockBackend;
        let (pk, sk) = backend.generate_keypair(&params).unwrap();
        let ct = backend.encrypt(&codec.encode(-99), &pk, &params).unwrap();

        assert_eq!(MockCiphertext::from_bytes(&ct.to_bytes(), &params).unwrap(), ct);
        assert_eq!(MockPublicKey::from_bytes(&pk.to_bytes(), &params).unwrap(), pk);
        assert_eq!(MockSecretKey::from_bytes(&sk.to_bytes(), &params).unwrap(), sk);
        assert!(MockSecretKey::from_bytes(&pk.to_bytes(), &params).is_err());
    }
}
