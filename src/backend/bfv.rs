//! Lattice back end running the BFV arithmetic in [`crate::bfv`].

use std::sync::Arc;

use crate::backend::{Decryption, HeBackend};
use crate::bfv::{self, Ciphertext, PublicKey, SecretKey};
use crate::error::Result;
use crate::params::EncryptionParameters;
use crate::ring::poly::CoeffPoly;

#[derive(Clone, Copy, Debug, Default)]
pub struct BfvBackend;

impl HeBackend for BfvBackend {
    type PublicKey = PublicKey;
    type SecretKey = SecretKey;
    type Ciphertext = Ciphertext;

    fn name(&self) -> &'static str {
        "bfv"
    }

    fn generate_keypair(
        &self,
        params: &Arc<EncryptionParameters>,
    ) -> Result<(PublicKey, SecretKey)> {
        let keys = bfv::generate_keypair(params)?;
        Ok((keys.public_key, keys.secret_key))
    }

    fn encrypt(
        &self,
        plaintext: &CoeffPoly,
        public_key: &PublicKey,
        params: &Arc<EncryptionParameters>,
    ) -> Result<Ciphertext> {
        bfv::encrypt_pk(plaintext, public_key, params)
    }

    fn decrypt(
        &self,
        ciphertext: &Ciphertext,
        secret_key: &SecretKey,
        params: &Arc<EncryptionParameters>,
    ) -> Result<Decryption> {
        bfv::decrypt(ciphertext, secret_key, params)
    }

    fn negate(&self, ciphertext: &Ciphertext, _params: &Arc<EncryptionParameters>) -> Result<Ciphertext> {
        Ok(bfv::bfv_neg(ciphertext))
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext, _params: &Arc<EncryptionParameters>) -> Result<Ciphertext> {
        bfv::bfv_add(a, b)
    }

    fn sub(&self, a: &Ciphertext, b: &Ciphertext, _params: &Arc<EncryptionParameters>) -> Result<Ciphertext> {
        bfv::bfv_sub(a, b)
    }

    fn multiply(&self, a: &Ciphertext, b: &Ciphertext, params: &Arc<EncryptionParameters>) -> Result<Ciphertext> {
        bfv::bfv_mul(a, b, params)
    }

    fn square(&self, ciphertext: &Ciphertext, params: &Arc<EncryptionParameters>) -> Result<Ciphertext> {
        bfv::bfv_square(ciphertext, params)
    }
}
