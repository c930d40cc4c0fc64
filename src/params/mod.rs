pub mod primes;
pub mod security;
pub mod presets;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use tracing::{debug, warn};

use crate::error::{HeError, Result};
use crate::ring::rns::RnsBasis;
use crate::serialize::{self, WireReader, WireTag, WireWriter};

/// Standard deviation of the error distribution.
pub const DEFAULT_SIGMA: f64 = 3.2;

/// Nominal security level selecting the coefficient-modulus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityLevel {
    Bits128,
    Bits192,
    Bits256,
}

impl SecurityLevel {
    pub fn bits(self) -> u16 {
        match self {
            SecurityLevel::Bits128 => 128,
            SecurityLevel::Bits192 => 192,
            SecurityLevel::Bits256 => 256,
        }
    }

    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            128 => Ok(SecurityLevel::Bits128),
            192 => Ok(SecurityLevel::Bits192),
            256 => Ok(SecurityLevel::Bits256),
            other => Err(HeError::InvalidParameter(format!("unknown security level {other}"))),
        }
    }
}

impl FromStr for SecurityLevel {
    type Err = HeError;

    /// Accepts `coeff_modulus_128`, `128-bit`, `128bit` and `128`
    /// (likewise for 192 and 256), case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let digits = lower
            .strip_prefix("coeff_modulus_")
            .or_else(|| lower.strip_suffix("-bit"))
            .or_else(|| lower.strip_suffix("bit"))
            .unwrap_or(&lower);
        match digits {
            "128" => Ok(SecurityLevel::Bits128),
            "192" => Ok(SecurityLevel::Bits192),
            "256" => Ok(SecurityLevel::Bits256),
            _ => Err(HeError::InvalidParameter(format!("unknown coefficient modulus profile {s:?}"))),
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "coeff_modulus_{}", self.bits())
    }
}

/// Plain modulus as given by the caller: a value or a power-of-two bit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlainModulus {
    Value(u64),
    Bits(u32),
}

impl PlainModulus {
    /// Canonical integer form.
    pub fn value(self) -> Result<u64> {
        match self {
            PlainModulus::Value(t) => Ok(t),
            PlainModulus::Bits(b) if (2..60).contains(&b) => Ok(1u64 << b),
            PlainModulus::Bits(b) => Err(HeError::InvalidParameter(format!(
                "plain modulus bit count must be in [2, 60), got {b}"
            ))),
        }
    }
}

impl From<u64> for PlainModulus {
    fn from(t: u64) -> Self {
        PlainModulus::Value(t)
    }
}

/// Digest identifying a parameter set; equal ids mean compatible parameters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamsId([u8; 32]);

impl ParamsId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ParamsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParamsId({self})")
    }
}

impl fmt::Display for ParamsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Immutable BFV encryption parameters.
///
/// The canonical fields are the degree, the security level and the plain
/// modulus; the coefficient-modulus primes are derived from them.
#[derive(Debug)]
pub struct EncryptionParameters {
    poly_modulus_degree: usize,
    security_level: SecurityLevel,
    plain_modulus: u64,
    sigma: f64,
    /// RNS basis for ciphertext modulus Q = ∏ q_i.
    ct_basis: Arc<RnsBasis>,
    /// ⌊Q/t⌋ mod q_i.
    delta_residues: Vec<u64>,
    /// Q ∪ P basis for exact tensor products, built on first multiplication.
    ext_basis: OnceLock<Arc<RnsBasis>>,
    params_id: ParamsId,
}

impl EncryptionParameters {
    /// Derive parameters for (degree, level, plain modulus).
    pub fn new(
        poly_modulus_degree: usize,
        security_level: SecurityLevel,
        plain_modulus: impl Into<PlainModulus>,
    ) -> Result<Arc<Self>> {
        let plain_modulus = plain_modulus.into().value()?;
        let primes = primes::coeff_modulus(poly_modulus_degree, security_level)?;
        Self::from_parts(poly_modulus_degree, security_level, plain_modulus, primes)
    }

    /// Like [`EncryptionParameters::new`] with the profile given as text,
    /// e.g. `"coeff_modulus_192"` or `"128-bit"`.
    pub fn from_profile(
        poly_modulus_degree: usize,
        profile: &str,
        plain_modulus: impl Into<PlainModulus>,
    ) -> Result<Arc<Self>> {
        Self::new(poly_modulus_degree, profile.parse()?, plain_modulus)
    }

    fn from_parts(
        poly_modulus_degree: usize,
        security_level: SecurityLevel,
        plain_modulus: u64,
        primes: Vec<u64>,
    ) -> Result<Arc<Self>> {
        if plain_modulus < 3 || plain_modulus >= 1u64 << 60 {
            return Err(HeError::InvalidParameter(format!(
                "plain modulus must be in [3, 2^60), got {plain_modulus}"
            )));
        }
        if let Some(&q) = primes.iter().find(|&&q| plain_modulus >= q || plain_modulus % q == 0) {
            return Err(HeError::InvalidParameter(format!(
                "plain modulus {plain_modulus} must be smaller than coefficient modulus prime {q}"
            )));
        }

        let ct_basis = RnsBasis::new(primes, poly_modulus_degree)?;
        let delta = &ct_basis.product / BigUint::from(plain_modulus);
        if delta.is_zero() {
            return Err(HeError::InvalidParameter(
                "coefficient modulus must exceed the plain modulus".into(),
            ));
        }
        let delta_residues = ct_basis.moduli.iter()
            .map(|&qi| {
                (&delta % BigUint::from(qi)).to_u64().ok_or_else(|| {
                    HeError::InvalidParameter("failed to reduce Δ modulo q_i".into())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut params = Self {
            poly_modulus_degree,
            security_level,
            plain_modulus,
            sigma: DEFAULT_SIGMA,
            ct_basis: Arc::new(ct_basis),
            delta_residues,
            ext_basis: OnceLock::new(),
            params_id: ParamsId([0u8; 32]),
        };
        params.params_id = ParamsId(*blake3::hash(&params.serialize()).as_bytes());

        debug!(
            degree = poly_modulus_degree,
            level = %security_level,
            plain_modulus,
            coeff_modulus_bits = params.ct_basis.modulus_bits(),
            primes = params.ct_basis.num_moduli(),
            params_id = %params.params_id,
            "derived encryption parameters"
        );
        let estimate = params.estimated_security_bits();
        if estimate < security_level.bits() as f64 {
            warn!(
                estimate,
                nominal = security_level.bits(),
                "estimated security is below the nominal level"
            );
        }

        Ok(Arc::new(params))
    }

    pub fn poly_modulus_degree(&self) -> usize {
        self.poly_modulus_degree
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    pub fn plain_modulus(&self) -> u64 {
        self.plain_modulus
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// The coefficient-modulus primes q_i.
    pub fn coeff_modulus(&self) -> &[u64] {
        &self.ct_basis.moduli
    }

    pub fn ct_basis(&self) -> &Arc<RnsBasis> {
        &self.ct_basis
    }

    pub fn delta_residues(&self) -> &[u64] {
        &self.delta_residues
    }

    pub fn params_id(&self) -> ParamsId {
        self.params_id
    }

    /// Extended basis Q ∪ P used to compute tensor products exactly.
    pub fn ext_basis(&self) -> Result<&Arc<RnsBasis>> {
        if let Some(basis) = self.ext_basis.get() {
            return Ok(basis);
        }
        let aux = primes::auxiliary_modulus(
            self.poly_modulus_degree,
            &self.ct_basis.moduli,
            self.ct_basis.modulus_bits(),
        )?;
        let aux_basis = RnsBasis::new(aux, self.poly_modulus_degree)?;
        let ext = Arc::new(self.ct_basis.extend(&aux_basis)?);
        debug!(aux_primes = aux_basis.num_moduli(), "built multiplication basis");
        Ok(self.ext_basis.get_or_init(|| ext))
    }

    /// Rough RLWE security estimate for these parameters.
    pub fn estimated_security_bits(&self) -> f64 {
        security::estimate_security_bits(
            self.poly_modulus_degree,
            self.ct_basis.modulus_bits() as f64,
        )
    }

    /// True when both parameter sets describe the same scheme instance.
    pub fn compatible(&self, other: &EncryptionParameters) -> bool {
        self.params_id == other.params_id
    }

    /// Canonical binary form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut w = WireWriter::new(WireTag::Parameters);
        w.put_u32(self.poly_modulus_degree as u32);
        w.put_u16(self.security_level.bits());
        w.put_u64(self.plain_modulus);
        w.put_u16(self.ct_basis.num_moduli() as u16);
        for &q in &self.ct_basis.moduli {
            w.put_u64(q);
        }
        w.finish()
    }

    /// Parse the canonical binary form. The primes are re-derived from the
    /// canonical fields and must match the payload.
    pub fn deserialize(bytes: &[u8]) -> Result<Arc<Self>> {
        let mut r = WireReader::new(bytes, WireTag::Parameters)?;
        let degree = r.u32()? as usize;
        let level = SecurityLevel::from_bits(r.u16()?)
            .map_err(|e| HeError::Deserialization(e.to_string()))?;
        let plain_modulus = r.u64()?;
        let count = r.u16()? as usize;
        if count > serialize::MAX_COMPONENTS {
            return Err(HeError::Deserialization(format!("implausible prime count {count}")));
        }
        let payload_primes = (0..count).map(|_| r.u64()).collect::<Result<Vec<_>>>()?;
        r.finish()?;

        let primes = primes::coeff_modulus(degree, level)
            .map_err(|e| HeError::Deserialization(e.to_string()))?;
        if primes != payload_primes {
            return Err(HeError::Deserialization(
                "coefficient modulus does not match the security profile".into(),
            ));
        }
        Self::from_parts(degree, level, plain_modulus, primes)
            .map_err(|e| HeError::Deserialization(e.to_string()))
    }

    pub fn to_base64(&self) -> String {
        serialize::to_text(&self.serialize())
    }

    pub fn from_base64(text: &str) -> Result<Arc<Self>> {
        Self::deserialize(&serialize::from_text(text)?)
    }
}

impl PartialEq for EncryptionParameters {
    fn eq(&self, other: &Self) -> bool {
        self.compatible(other)
    }
}

impl Eq for EncryptionParameters {}

/// Field-wise compatibility of two parameter sets.
pub fn compatible(a: &EncryptionParameters, b: &EncryptionParameters) -> bool {
    a.compatible(b)
}

/// Builder for EncryptionParameters.
pub struct EncryptionParametersBuilder {
    poly_modulus_degree: usize,
    security_level: SecurityLevel,
    plain_modulus: PlainModulus,
}

impl EncryptionParametersBuilder {
    /// Starts from the defaults: degree 2048, 128-bit level, plain modulus 2^8.
    pub fn new() -> Self {
        Self {
            poly_modulus_degree: 2048,
            security_level: SecurityLevel::Bits128,
            plain_modulus: PlainModulus::Bits(8),
        }
    }

    pub fn poly_modulus_degree(mut self, n: usize) -> Self {
        self.poly_modulus_degree = n;
        self
    }

    pub fn security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }

    pub fn plain_modulus(mut self, t: u64) -> Self {
        self.plain_modulus = PlainModulus::Value(t);
        self
    }

    pub fn plain_modulus_bits(mut self, bits: u32) -> Self {
        self.plain_modulus = PlainModulus::Bits(bits);
        self
    }

    pub fn build(self) -> Result<Arc<EncryptionParameters>> {
        EncryptionParameters::new(self.poly_modulus_degree, self.security_level, self.plain_modulus)
    }
}

impl Default for EncryptionParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}
