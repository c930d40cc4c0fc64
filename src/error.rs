use thiserror::Error;

/// Why a decrypted plaintext could not be turned into an `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CastFailure {
    /// The plaintext decodes to an integer outside the `i32` range.
    #[error("decoded value {0} does not fit in i32")]
    Int32Overflow(i64),

    /// The ciphertext ran out of noise budget; the plaintext is garbage.
    #[error("noise budget exhausted")]
    NoiseBudgetExhausted,
}

#[derive(Debug, Error)]
pub enum HeError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("ring degree must be a power of 2, got {0}")]
    InvalidRingDegree(usize),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("modulus mismatch")]
    ModulusMismatch,

    /// Imported key material was produced under other parameters or is malformed.
    #[error("{0} key data is invalid")]
    KeyValidation(&'static str),

    #[error("key not available: {0}")]
    MissingKey(&'static str),

    #[error("value {0} is out of the int32 range")]
    Range(i64),

    /// Key material or parameters do not match the ciphertext's provenance.
    #[error("output out of range")]
    DecryptionRange,

    #[error("cast failed: {0}")]
    DecodeCast(CastFailure),

    #[error("ciphertext was produced under incompatible encryption parameters")]
    IncompatibleParameters,

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl HeError {
    /// True for every flavour of `DecodeCast`.
    pub fn is_cast_failure(&self) -> bool {
        matches!(self, HeError::DecodeCast(_))
    }
}

pub type Result<T> = std::result::Result<T, HeError>;
