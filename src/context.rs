//! The homomorphic context: parameters plus optional key material.
//!
//! A context created by [`HomomorphicContext::create_default`] or
//! [`HomomorphicContext::create`] generates its own key pair and can both
//! encrypt and decrypt. A context created from parameters alone starts
//! without keys; encryption needs an imported public key and decryption an
//! imported secret key. Any context holding a copy of the secret key can
//! decrypt.
//!
//! The operators need no key. Every operand must have been produced under
//! the context's parameters, but not necessarily under its keys.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::backend::{BfvBackend, HeBackend, HeCiphertext, WireObject};
use crate::bfv::IntegerCodec;
use crate::error::{HeError, Result};
use crate::noise;
use crate::params::{presets, EncryptionParameters, PlainModulus};
use crate::serialize;

pub struct HomomorphicContext<B: HeBackend = BfvBackend> {
    backend: B,
    params: Arc<EncryptionParameters>,
    codec: IntegerCodec,
    public_key: Option<B::PublicKey>,
    secret_key: Option<B::SecretKey>,
}

impl HomomorphicContext {
    /// Default parameters (n = 2048, 128-bit profile, t = 256) and a fresh
    /// key pair.
    pub fn create_default() -> Result<Self> {
        Self::create_default_with_backend(BfvBackend)
    }

    /// Bind `params` without any keys.
    pub fn with_params(params: Arc<EncryptionParameters>) -> Self {
        Self::with_params_and_backend(params, BfvBackend)
    }

    /// Bind parameters given in their base64 text form, without keys.
    pub fn from_serialized_params(text: &str) -> Result<Self> {
        Self::from_serialized_params_with_backend(text, BfvBackend)
    }

    /// Explicit parameters and a fresh key pair.
    pub fn create(
        poly_modulus_degree: usize,
        profile: &str,
        plain_modulus: impl Into<PlainModulus>,
    ) -> Result<Self> {
        Self::create_with_backend(poly_modulus_degree, profile, plain_modulus, BfvBackend)
    }
}

impl<B: HeBackend> HomomorphicContext<B> {
    pub fn create_default_with_backend(backend: B) -> Result<Self> {
        let params = presets::default_params()?;
        Self::with_fresh_keys(params, backend)
    }

    pub fn with_params_and_backend(params: Arc<EncryptionParameters>, backend: B) -> Self {
        debug!(
            backend = backend.name(),
            params_id = %params.params_id(),
            "created context without keys"
        );
        Self {
            codec: IntegerCodec::new(&params),
            backend,
            params,
            public_key: None,
            secret_key: None,
        }
    }

    pub fn from_serialized_params_with_backend(text: &str, backend: B) -> Result<Self> {
        let params = EncryptionParameters::from_base64(text)?;
        Ok(Self::with_params_and_backend(params, backend))
    }

    pub fn create_with_backend(
        poly_modulus_degree: usize,
        profile: &str,
        plain_modulus: impl Into<PlainModulus>,
        backend: B,
    ) -> Result<Self> {
        let params = EncryptionParameters::from_profile(poly_modulus_degree, profile, plain_modulus)?;
        Self::with_fresh_keys(params, backend)
    }

    fn with_fresh_keys(params: Arc<EncryptionParameters>, backend: B) -> Result<Self> {
        let (public_key, secret_key) = backend.generate_keypair(&params)?;
        debug!(
            backend = backend.name(),
            degree = params.poly_modulus_degree(),
            plain_modulus = params.plain_modulus(),
            params_id = %params.params_id(),
            "created context with fresh key pair"
        );
        Ok(Self {
            codec: IntegerCodec::new(&params),
            backend,
            params,
            public_key: Some(public_key),
            secret_key: Some(secret_key),
        })
    }

    pub fn params(&self) -> &Arc<EncryptionParameters> {
        &self.params
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn codec(&self) -> &IntegerCodec {
        &self.codec
    }

    /// Canonical base64 form of the parameters. Equal for any two contexts
    /// bound to compatible parameters.
    pub fn encryption_parameters(&self) -> String {
        self.params.to_base64()
    }

    pub fn has_public_key(&self) -> bool {
        self.public_key.is_some()
    }

    pub fn has_secret_key(&self) -> bool {
        self.secret_key.is_some()
    }

    // --- key management ---

    pub fn public_key(&self) -> Result<String> {
        Ok(serialize::to_text(&self.public_key_material()?.to_bytes()))
    }

    pub fn public_key_material(&self) -> Result<&B::PublicKey> {
        self.public_key.as_ref().ok_or(HeError::MissingKey("public"))
    }

    /// Import a public key in base64 text form.
    pub fn set_public_key(&mut self, text: &str) -> Result<()> {
        let key = serialize::from_text(text)
            .and_then(|bytes| B::PublicKey::from_bytes(&bytes, &self.params))
            .map_err(|_| HeError::KeyValidation("public"))?;
        self.set_public_key_material(key)
    }

    pub fn set_public_key_material(&mut self, key: B::PublicKey) -> Result<()> {
        if key.params_id() != self.params.params_id() {
            return Err(HeError::KeyValidation("public"));
        }
        debug!(params_id = %self.params.params_id(), "imported public key");
        self.public_key = Some(key);
        Ok(())
    }

    pub fn secret_key(&self) -> Result<String> {
        Ok(serialize::to_text(&self.secret_key_material()?.to_bytes()))
    }

    pub fn secret_key_material(&self) -> Result<&B::SecretKey> {
        self.secret_key.as_ref().ok_or(HeError::MissingKey("secret"))
    }

    /// Import a secret key in base64 text form.
    pub fn set_secret_key(&mut self, text: &str) -> Result<()> {
        let key = serialize::from_text(text)
            .and_then(|bytes| B::SecretKey::from_bytes(&bytes, &self.params))
            .map_err(|_| HeError::KeyValidation("secret"))?;
        self.set_secret_key_material(key)
    }

    pub fn set_secret_key_material(&mut self, key: B::SecretKey) -> Result<()> {
        if key.params_id() != self.params.params_id() {
            return Err(HeError::KeyValidation("secret"));
        }
        debug!(params_id = %self.params.params_id(), "imported secret key");
        self.secret_key = Some(key);
        Ok(())
    }

    // --- encryption ---

    pub fn encrypt(&self, value: i32) -> Result<B::Ciphertext> {
        let public_key = self.public_key_material()?;
        trace!(backend = self.backend.name(), "encrypt");
        self.backend.encrypt(&self.codec.encode(value), public_key, &self.params)
    }

    /// Encrypt a value held in a wider integer; it must fit in i32.
    pub fn encrypt_i64(&self, value: i64) -> Result<B::Ciphertext> {
        let narrow = i32::try_from(value).map_err(|_| HeError::Range(value))?;
        self.encrypt(narrow)
    }

    /// Decrypt and decode to i32.
    ///
    /// Fails with [`HeError::DecryptionRange`] when the key or parameters do
    /// not match the ciphertext, and with [`HeError::DecodeCast`] when the
    /// decoded value is outside i32 or the noise budget is exhausted.
    ///
    /// Both a foreign key and spent noise measure as a zero budget; the
    /// ciphertext's tracked estimate picks the error. A product of
    /// mixed-key ciphertexts that has gone through two or more
    /// multiplications therefore reports
    /// [`CastFailure::NoiseBudgetExhausted`](crate::error::CastFailure) rather than
    /// [`HeError::DecryptionRange`].
    pub fn decrypt(&self, ciphertext: &B::Ciphertext) -> Result<i32> {
        let secret_key = self.secret_key_material()?;
        if ciphertext.params_id() != self.params.params_id() {
            return Err(HeError::DecryptionRange);
        }
        let decryption = self.backend.decrypt(ciphertext, secret_key, &self.params)?;
        trace!(
            noise_budget = decryption.noise_budget,
            size = ciphertext.size(),
            "decrypt"
        );
        if decryption.noise_budget == 0 {
            return Err(noise::zero_budget_error(ciphertext.noise_estimate()));
        }
        self.codec.decode(&decryption.plaintext)
    }

    /// Measured invariant noise budget in bits; 0 means decryption would fail.
    pub fn noise_budget(&self, ciphertext: &B::Ciphertext) -> Result<u32> {
        let secret_key = self.secret_key_material()?;
        self.check_operand(ciphertext)?;
        Ok(self.backend.decrypt(ciphertext, secret_key, &self.params)?.noise_budget)
    }

    // --- operators ---

    fn check_operand(&self, ciphertext: &B::Ciphertext) -> Result<()> {
        if ciphertext.params_id() != self.params.params_id() {
            return Err(HeError::IncompatibleParameters);
        }
        Ok(())
    }

    pub fn negate(&self, ciphertext: &B::Ciphertext) -> Result<B::Ciphertext> {
        self.check_operand(ciphertext)?;
        trace!(size = ciphertext.size(), "negate");
        self.backend.negate(ciphertext, &self.params)
    }

    pub fn add(&self, a: &B::Ciphertext, b: &B::Ciphertext) -> Result<B::Ciphertext> {
        self.check_operand(a)?;
        self.check_operand(b)?;
        trace!(lhs = a.size(), rhs = b.size(), "add");
        self.backend.add(a, b, &self.params)
    }

    pub fn sub(&self, a: &B::Ciphertext, b: &B::Ciphertext) -> Result<B::Ciphertext> {
        self.check_operand(a)?;
        self.check_operand(b)?;
        trace!(lhs = a.size(), rhs = b.size(), "sub");
        self.backend.sub(a, b, &self.params)
    }

    /// Multiply without relinearization: the result has size
    /// `a.size() + b.size() - 1` and a smaller noise budget.
    pub fn multiply(&self, a: &B::Ciphertext, b: &B::Ciphertext) -> Result<B::Ciphertext> {
        self.check_operand(a)?;
        self.check_operand(b)?;
        trace!(lhs = a.size(), rhs = b.size(), "multiply");
        self.backend.multiply(a, b, &self.params)
    }

    pub fn square(&self, ciphertext: &B::Ciphertext) -> Result<B::Ciphertext> {
        self.check_operand(ciphertext)?;
        trace!(size = ciphertext.size(), "square");
        self.backend.square(ciphertext, &self.params)
    }

    // --- text surface ---

    pub fn serialize_ciphertext(&self, ciphertext: &B::Ciphertext) -> String {
        serialize::to_text(&ciphertext.to_bytes())
    }

    pub fn deserialize_ciphertext(&self, text: &str) -> Result<B::Ciphertext> {
        B::Ciphertext::from_bytes(&serialize::from_text(text)?, &self.params)
    }

    pub fn encrypt_text(&self, value: i32) -> Result<String> {
        Ok(self.serialize_ciphertext(&self.encrypt(value)?))
    }

    pub fn decrypt_text(&self, text: &str) -> Result<i32> {
        let ciphertext = B::Ciphertext::from_bytes(&serialize::from_text(text)?, &self.params)
            .map_err(|e| match e {
                HeError::IncompatibleParameters => HeError::DecryptionRange,
                other => other,
            })?;
        self.decrypt(&ciphertext)
    }

    pub fn negate_text(&self, text: &str) -> Result<String> {
        let ct = self.deserialize_ciphertext(text)?;
        Ok(self.serialize_ciphertext(&self.negate(&ct)?))
    }

    pub fn add_text(&self, a: &str, b: &str) -> Result<String> {
        let (a, b) = (self.deserialize_ciphertext(a)?, self.deserialize_ciphertext(b)?);
        Ok(self.serialize_ciphertext(&self.add(&a, &b)?))
    }

    pub fn sub_text(&self, a: &str, b: &str) -> Result<String> {
        let (a, b) = (self.deserialize_ciphertext(a)?, self.deserialize_ciphertext(b)?);
        Ok(self.serialize_ciphertext(&self.sub(&a, &b)?))
    }

    pub fn multiply_text(&self, a: &str, b: &str) -> Result<String> {
        let (a, b) = (self.deserialize_ciphertext(a)?, self.deserialize_ciphertext(b)?);
        Ok(self.serialize_ciphertext(&self.multiply(&a, &b)?))
    }

    pub fn square_text(&self, text: &str) -> Result<String> {
        let ct = self.deserialize_ciphertext(text)?;
        Ok(self.serialize_ciphertext(&self.square(&ct)?))
    }
}

impl<B: HeBackend + Clone> Clone for HomomorphicContext<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            params: self.params.clone(),
            codec: self.codec,
            public_key: self.public_key.clone(),
            secret_key: self.secret_key.clone(),
        }
    }
}

impl<B: HeBackend> fmt::Debug for HomomorphicContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomomorphicContext")
            .field("backend", &self.backend.name())
            .field("params_id", &self.params.params_id())
            .field("has_public_key", &self.has_public_key())
            .field("has_secret_key", &self.has_secret_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::error::CastFailure;

    type MockContext = HomomorphicContext<MockBackend>;

    fn mock() -> MockContext {
        MockContext::create_default_with_backend(MockBackend).unwrap()
    }

    #[test]
    fn test_fresh_context_roundtrip() {
        let ctx = mock();
        for v in [0, 7, -7, i32::MAX, i32::MIN] {
            assert_eq!(ctx.decrypt(&ctx.encrypt(v).unwrap()).unwrap(), v);
        }
    }

    #[test]
    fn test_keyless_context_needs_keys() {
        let master = mock();
        let mut ctx = MockContext::with_params_and_backend(master.params().clone(), MockBackend);

        assert!(matches!(ctx.encrypt(1), Err(HeError::MissingKey("public"))));
        assert!(matches!(ctx.public_key(), Err(HeError::MissingKey("public"))));
        let ct = master.encrypt(3).unwrap();
        assert!(matches!(ctx.decrypt(&ct), Err(HeError::MissingKey("secret"))));

        ctx.set_public_key(&master.public_key().unwrap()).unwrap();
        let ours = ctx.encrypt(4).unwrap();
        assert_eq!(master.decrypt(&ours).unwrap(), 4);
        assert!(ctx.decrypt(&ours).is_err());

        ctx.set_secret_key(&master.secret_key().unwrap()).unwrap();
        assert_eq!(ctx.decrypt(&ct).unwrap(), 3);
    }

    #[test]
    fn test_key_import_validates_parameters() {
        let ctx = mock();
        let mut other = MockContext::create_with_backend(4096, "128", 1024u64, MockBackend).unwrap();

        let err = other.set_public_key(&ctx.public_key().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "public key data is invalid");
        let err = other.set_secret_key(&ctx.secret_key().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "secret key data is invalid");
        assert!(matches!(other.set_public_key("not base64!"), Err(HeError::KeyValidation("public"))));
    }

    #[test]
    fn test_wrong_key_is_range_error() {
        let alice = mock();
        let bob = mock();
        let ct = alice.encrypt(5).unwrap();
        let err = bob.decrypt(&ct).unwrap_err();
        assert!(matches!(err, HeError::DecryptionRange));
        assert_eq!(err.to_string(), "output out of range");
    }

    #[test]
    fn test_foreign_parameters() {
        let ctx = mock();
        let other = MockContext::create_with_backend(4096, "128", 1024u64, MockBackend).unwrap();
        let foreign = other.encrypt(1).unwrap();
        let local = ctx.encrypt(1).unwrap();

        assert!(matches!(ctx.decrypt(&foreign), Err(HeError::DecryptionRange)));
        assert!(matches!(ctx.add(&local, &foreign), Err(HeError::IncompatibleParameters)));
        assert!(matches!(ctx.negate(&foreign), Err(HeError::IncompatibleParameters)));
        assert!(matches!(ctx.square(&foreign), Err(HeError::IncompatibleParameters)));
    }

    #[test]
    fn test_int32_boundary_asymmetry() {
        let ctx = mock();
        let min = ctx.encrypt(i32::MIN).unwrap();
        let max = ctx.encrypt(i32::MAX).unwrap();
        let one = ctx.encrypt(1).unwrap();

        assert_eq!(ctx.decrypt(&ctx.negate(&max).unwrap()).unwrap(), -i32::MAX);
        assert_eq!(ctx.decrypt(&ctx.add(&min, &max).unwrap()).unwrap(), -1);

        let err = ctx.decrypt(&ctx.negate(&min).unwrap()).unwrap_err();
        assert!(matches!(err, HeError::DecodeCast(CastFailure::Int32Overflow(2147483648))));
        let err = ctx.decrypt(&ctx.sub(&min, &one).unwrap()).unwrap_err();
        assert!(err.is_cast_failure());
    }

    #[test]
    fn test_encrypt_i64_range_check() {
        let ctx = mock();
        assert!(matches!(ctx.encrypt_i64(1 << 31), Err(HeError::Range(v)) if v == 1 << 31));
        assert_eq!(ctx.decrypt(&ctx.encrypt_i64(-12).unwrap()).unwrap(), -12);
    }

    #[test]
    fn test_repeated_multiplication_exhausts_budget() {
        let ctx = mock();
        let one = ctx.encrypt(1).unwrap();
        let mut acc = ctx.encrypt(2).unwrap();
        let mut failure = None;
        for _ in 0..8 {
            acc = ctx.multiply(&acc, &one).unwrap();
            if let Err(e) = ctx.decrypt(&acc) {
                failure = Some(e);
                break;
            }
        }
        assert!(matches!(
            failure,
            Some(HeError::DecodeCast(CastFailure::NoiseBudgetExhausted))
        ));
    }

    #[test]
    fn test_serialized_parameters_match() {
        let ctx = mock();
        let text = ctx.encryption_parameters();
        let a = MockContext::from_serialized_params_with_backend(&text, MockBackend).unwrap();
        let b = MockContext::from_serialized_params_with_backend(&text, MockBackend).unwrap();
        assert_eq!(a.encryption_parameters(), b.encryption_parameters());
        assert_eq!(a.encryption_parameters(), text);
        assert!(MockContext::from_serialized_params_with_backend("AAAA", MockBackend).is_err());
    }

    #[test]
    fn test_text_surface() {
        let ctx = mock();
        let c1 = ctx.encrypt_text(5).unwrap();
        let c2 = ctx.encrypt_text(-7).unwrap();
        let c02 = ctx.add_text(&ctx.negate_text(&c1).unwrap(), &c2).unwrap();
        let c03 = ctx.multiply_text(&c02, &c2).unwrap();
        let c05 = ctx.sub_text(&c03, &ctx.square_text(&c1).unwrap()).unwrap();
        assert_eq!(ctx.decrypt_text(&c05).unwrap(), 59);
        assert_eq!(ctx.decrypt_text(&ctx.negate_text(&c1).unwrap()).unwrap(), -5);
    }

    #[test]
    fn test_mixed_key_products_classified_by_estimate() {
        let (alice, bob) = (mock(), mock());
        let mixed = alice.add(&alice.encrypt(2).unwrap(), &bob.encrypt(3).unwrap()).unwrap();
        let one = alice.encrypt(1).unwrap();

        let once = alice.multiply(&mixed, &one).unwrap();
        assert!(matches!(alice.decrypt(&once), Err(HeError::DecryptionRange)));

        let twice = alice.multiply(&once, &one).unwrap();
        assert!(twice.noise_estimate <= 0.0);
        assert!(matches!(
            alice.decrypt(&twice),
            Err(HeError::DecodeCast(CastFailure::NoiseBudgetExhausted))
        ));
    }

    #[test]
    fn test_bfv_context_roundtrip() {
        let ctx = HomomorphicContext::create_default().unwrap();
        let a = ctx.encrypt(5).unwrap();
        let b = ctx.encrypt(-7).unwrap();
        assert_eq!(ctx.decrypt(&ctx.multiply(&a, &b).unwrap()).unwrap(), -35);
        assert!(ctx.noise_budget(&a).unwrap() > 20);
        let rendered = format!("{ctx:?}");
        assert!(rendered.contains("bfv"));
    }
}
