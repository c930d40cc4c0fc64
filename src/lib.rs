//! # he-context: integer BFV homomorphic encryption behind a context API
//!
//! A [`HomomorphicContext`](context::HomomorphicContext) binds encryption
//! parameters and optional key material. It encrypts signed 32-bit integers
//! and evaluates negation, addition, subtraction, multiplication and
//! squaring directly on ciphertexts. Keys, parameters and ciphertexts move
//! between contexts as base64 strings; a context holding only the public key
//! can encrypt, and any context holding the secret key can decrypt.
//!
//! ## Quick Start
//!
//! ```no_run
//! use he_context::prelude::*;
//!
//! let master = HomomorphicContext::create_default().unwrap();
//!
//! // A second context with the same parameters and the shared public key
//! let mut worker = HomomorphicContext::from_serialized_params(
//!     &master.encryption_parameters(),
//! ).unwrap();
//! worker.set_public_key(&master.public_key().unwrap()).unwrap();
//!
//! let a = worker.encrypt(5).unwrap();
//! let b = master.encrypt(-7).unwrap();
//! let product = worker.multiply(&a, &b).unwrap();
//!
//! assert_eq!(master.decrypt(&product).unwrap(), -35);
//! ```
//!
//! Multiplication does not relinearize: every product grows the ciphertext
//! and spends noise budget, and once the budget is gone decryption fails
//! with [`CastFailure::NoiseBudgetExhausted`](error::CastFailure).

pub mod error;
pub mod params;
pub mod ring;
pub mod sampling;
pub mod bfv;
pub mod noise;
pub mod serialize;
pub mod backend;
pub mod context;
pub mod deferred;

/// Convenient re-exports for common types and functions.
pub mod prelude {
    pub use crate::error::{CastFailure, HeError, Result};
    pub use crate::params::{
        EncryptionParameters, EncryptionParametersBuilder, ParamsId, PlainModulus, SecurityLevel,
        compatible,
    };
    pub use crate::params::presets::{compact_params, default_params};
    pub use crate::backend::{BfvBackend, HeBackend, HeCiphertext, MockBackend, WireObject};
    pub use crate::bfv::{Ciphertext, IntegerCodec, KeyPair, PublicKey, SecretKey};
    pub use crate::context::HomomorphicContext;
    pub use crate::deferred::AsyncContext;
}
