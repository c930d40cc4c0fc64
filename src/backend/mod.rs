//! Pluggable ring-arithmetic back ends.
//!
//! [`HomomorphicContext`](crate::context::HomomorphicContext) drives a back end
//! through [`HeBackend`]; it owns validation, the integer codec and error
//! classification, while the back end owns key generation and the ciphertext
//! arithmetic.

pub mod bfv;
pub mod mock;

pub use self::bfv::BfvBackend;
pub use self::mock::MockBackend;

use std::sync::Arc;

use crate::error::Result;
use crate::params::{EncryptionParameters, ParamsId};
use crate::ring::poly::CoeffPoly;

/// Value with a binary wire form bound to one parameter set.
pub trait WireObject: Sized + Clone + Send + Sync + 'static {
    /// Parameters this object was produced under.
    fn params_id(&self) -> ParamsId;

    fn to_bytes(&self) -> Vec<u8>;

    /// Parse bytes produced by [`WireObject::to_bytes`] under `params`.
    fn from_bytes(bytes: &[u8], params: &Arc<EncryptionParameters>) -> Result<Self>;
}

/// Ciphertext metadata the context needs without a key.
pub trait HeCiphertext: WireObject {
    /// Number of polynomials; 2 when fresh.
    fn size(&self) -> usize;

    /// Heuristic remaining noise budget in bits.
    fn noise_estimate(&self) -> f64;
}

/// Result of running decryption.
#[derive(Clone, Debug)]
pub struct Decryption {
    /// Plaintext polynomial mod t.
    pub plaintext: CoeffPoly,
    /// Measured invariant noise budget in bits; zero means unreliable.
    pub noise_budget: u32,
}

/// Lattice back end capability.
///
/// Operands handed to these methods are already checked to carry the
/// parameters' [`ParamsId`].
pub trait HeBackend: Send + Sync + 'static {
    type PublicKey: WireObject;
    type SecretKey: WireObject;
    type Ciphertext: HeCiphertext;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn generate_keypair(
        &self,
        params: &Arc<EncryptionParameters>,
    ) -> Result<(Self::PublicKey, Self::SecretKey)>;

    fn encrypt(
        &self,
        plaintext: &CoeffPoly,
        public_key: &Self::PublicKey,
        params: &Arc<EncryptionParameters>,
    ) -> Result<Self::Ciphertext>;

    fn decrypt(
        &self,
        ciphertext: &Self::Ciphertext,
        secret_key: &Self::SecretKey,
        params: &Arc<EncryptionParameters>,
    ) -> Result<Decryption>;

    fn negate(
        &self,
        ciphertext: &Self::Ciphertext,
        params: &Arc<EncryptionParameters>,
    ) -> Result<Self::Ciphertext>;

    fn add(
        &self,
        a: &Self::Ciphertext,
        b: &Self::Ciphertext,
        params: &Arc<EncryptionParameters>,
    ) -> Result<Self::Ciphertext>;

    fn sub(
        &self,
        a: &Self::Ciphertext,
        b: &Self::Ciphertext,
        params: &Arc<EncryptionParameters>,
    ) -> Result<Self::Ciphertext>;

    fn multiply(
        &self,
        a: &Self::Ciphertext,
        b: &Self::Ciphertext,
        params: &Arc<EncryptionParameters>,
    ) -> Result<Self::Ciphertext>;

    fn square(
        &self,
        ciphertext: &Self::Ciphertext,
        params: &Arc<EncryptionParameters>,
    ) -> Result<Self::Ciphertext> {
        self.multiply(ciphertext, ciphertext, params)
    }
}
