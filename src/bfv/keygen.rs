use std::fmt;
use std::sync::Arc;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroize;

use crate::backend::WireObject;
use crate::error::{HeError, Result};
use crate::params::{EncryptionParameters, ParamsId};
use crate::ring::rns::RnsPoly;
use crate::sampling::{sample_gaussian_coeffs, sample_uniform_rns, sample_ternary_coeffs};
use crate::serialize::{WireReader, WireTag, WireWriter};

/// BFV secret key: s ∈ R_q (ternary polynomial, stored in NTT/RNS form).
#[derive(Clone)]
pub struct SecretKey {
    /// s in RNS-NTT form.
    pub poly: RnsPoly,
    pub params_id: ParamsId,
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        // Zero out secret key material
        for comp in &mut self.poly.components {
            comp.evals.zeroize();
        }
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("params_id", &self.params_id)
            .finish_non_exhaustive()
    }
}

/// BFV public key: pk = (pk0, pk1) where pk0 = -(a·s + e), pk1 = a.
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey {
    pub pk0: RnsPoly,
    pub pk1: RnsPoly,
    pub params_id: ParamsId,
}

/// Freshly generated key material.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub secret_key: SecretKey,
}

/// Generate a key pair from the OS-seeded RNG.
pub fn generate_keypair(params: &Arc<EncryptionParameters>) -> Result<KeyPair> {
    let mut rng = ChaCha20Rng::from_os_rng();
    generate_keypair_with_rng(params, &mut rng)
}

/// Generate a key pair with a provided RNG.
pub fn generate_keypair_with_rng<R: rand::Rng>(
    params: &Arc<EncryptionParameters>,
    rng: &mut R,
) -> Result<KeyPair> {
    let secret_key = gen_secret_key_with_rng(params, rng)?;
    let public_key = gen_public_key_with_rng(&secret_key, params, rng)?;
    Ok(KeyPair { public_key, secret_key })
}

/// Generate a secret key (ternary distribution).
pub fn gen_secret_key_with_rng<R: rand::Rng>(
    params: &Arc<EncryptionParameters>,
    rng: &mut R,
) -> Result<SecretKey> {
    let mut s_coeffs = sample_ternary_coeffs(params.poly_modulus_degree(), rng);
    let poly = RnsPoly::from_signed(&s_coeffs, params.ct_basis());
    s_coeffs.zeroize();

    Ok(SecretKey {
        poly: poly?,
        params_id: params.params_id(),
    })
}

/// Generate a public key from a secret key.
pub fn gen_public_key_with_rng<R: rand::Rng>(
    sk: &SecretKey,
    params: &Arc<EncryptionParameters>,
    rng: &mut R,
) -> Result<PublicKey> {
    if sk.params_id != params.params_id() {
        return Err(HeError::IncompatibleParameters);
    }
    let basis = params.ct_basis();

    // Sample uniform a ∈ R_q
    let a = sample_uniform_rns(basis, rng)?;

    // Sample error e
    let e_coeffs = sample_gaussian_coeffs(params.poly_modulus_degree(), params.sigma(), rng);
    let e = RnsPoly::from_signed(&e_coeffs, basis)?;

    // pk0 = -(a·s + e) mod q
    let pk0 = a.mul(&sk.poly)?.add(&e)?.neg();

    Ok(PublicKey {
        pk0,
        pk1: a,
        params_id: params.params_id(),
    })
}

impl WireObject for PublicKey {
    fn params_id(&self) -> ParamsId {
        self.params_id
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::new(WireTag::PublicKey);
        w.put_params_id(&self.params_id);
        w.put_polys(&[&self.pk0, &self.pk1]);
        w.finish()
    }

    fn from_bytes(bytes: &[u8], params: &Arc<EncryptionParameters>) -> Result<Self> {
        let mut r = WireReader::new(bytes, WireTag::PublicKey)?;
        let params_id = r.params_id()?;
        if params_id != params.params_id() {
            return Err(HeError::KeyValidation("public"));
        }
        let mut polys = r.polys(params.ct_basis(), 2, 2)?;
        r.finish()?;
        let pk1 = polys.pop();
        let pk0 = polys.pop();
        match (pk0, pk1) {
            (Some(pk0), Some(pk1)) => Ok(Self { pk0, pk1, params_id }),
            _ => Err(HeError::KeyValidation("public")),
        }
    }
}

impl WireObject for SecretKey {
    fn params_id(&self) -> ParamsId {
        self.params_id
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::new(WireTag::SecretKey);
        w.put_params_id(&self.params_id);
        w.put_polys(&[&self.poly]);
        w.finish()
    }

    fn from_bytes(bytes: &[u8], params: &Arc<EncryptionParameters>) -> Result<Self> {
        let mut r = WireReader::new(bytes, WireTag::SecretKey)?;
        let params_id = r.params_id()?;
        if params_id != params.params_id() {
            return Err(HeError::KeyValidation("secret"));
        }
        let poly = r.polys(params.ct_basis(), 1, 1)?
            .pop()
            .ok_or(HeError::KeyValidation("secret"))?;
        r.finish()?;
        Ok(Self { poly, params_id })
    }
}
