use crate::error::{CastFailure, HeError, Result};
use crate::params::EncryptionParameters;
use crate::ring::poly::CoeffPoly;

/// Balanced binary integer encoder.
///
/// A value `v >= 0` puts a 1 at the coefficient of every set bit of `v`; a
/// negative value puts `t - 1` (that is, -1 mod t) at the set bits of `|v|`.
/// Decoding evaluates the polynomial at X = 2 with coefficients read in
/// [-t/2, t/2) for even t and [-(t-1)/2, (t-1)/2] for odd t.
///
/// Products add up digits in each coefficient. A coefficient that leaves
/// that window wraps modulo t and decodes to the wrong value, or to
/// [`HeError::DecryptionRange`]. A wider plain modulus delays the wrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegerCodec {
    plain_modulus: u64,
    ring_degree: usize,
}

impl IntegerCodec {
    pub fn new(params: &EncryptionParameters) -> Self {
        Self {
            plain_modulus: params.plain_modulus(),
            ring_degree: params.poly_modulus_degree(),
        }
    }

    pub fn plain_modulus(&self) -> u64 {
        self.plain_modulus
    }

    pub fn encode(&self, value: i32) -> CoeffPoly {
        self.encode_i64(i64::from(value))
    }

    /// Encode any 64-bit value. Ring degrees are at least 1024, so all 64
    /// bits always fit.
    pub fn encode_i64(&self, value: i64) -> CoeffPoly {
        let t = self.plain_modulus;
        let digit = if value < 0 { t - 1 } else { 1 };
        let mut magnitude = value.unsigned_abs();
        let mut coeffs = vec![0u64; self.ring_degree];
        let mut i = 0;
        while magnitude != 0 {
            if magnitude & 1 == 1 {
                coeffs[i] = digit;
            }
            magnitude >>= 1;
            i += 1;
        }
        CoeffPoly { coeffs, modulus: t }
    }

    /// Evaluate the plaintext at X = 2 in checked 64-bit arithmetic.
    pub fn decode_i64(&self, plaintext: &CoeffPoly) -> Result<i64> {
        if plaintext.modulus != self.plain_modulus {
            return Err(HeError::ModulusMismatch);
        }
        let t = self.plain_modulus;
        let negative_from = t.div_ceil(2);

        let mut result: i64 = 0;
        for (i, &c) in plaintext.coeffs.iter().enumerate() {
            if c == 0 {
                continue;
            }
            if i >= 63 {
                return Err(HeError::DecryptionRange);
            }
            let coeff = if c >= negative_from {
                -((t - c) as i64)
            } else {
                c as i64
            };
            let term = coeff.checked_mul(1i64 << i).ok_or(HeError::DecryptionRange)?;
            result = result.checked_add(term).ok_or(HeError::DecryptionRange)?;
        }
        Ok(result)
    }

    pub fn decode(&self, plaintext: &CoeffPoly) -> Result<i32> {
        let value = self.decode_i64(plaintext)?;
        i32::try_from(value).map_err(|_| HeError::DecodeCast(CastFailure::Int32Overflow(value)))
    }
}
