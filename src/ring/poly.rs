use crate::error::{HeError, Result};
use crate::ring::modular::{mod_add, mod_sub, mod_neg, mod_mul, barrett_constant, reduce_signed};

/// Polynomial in coefficient representation over Z_q[X]/(X^n + 1).
///
/// Plaintexts live here with `modulus` = the plain modulus t.
#[derive(Clone, Debug)]
pub struct CoeffPoly {
    pub coeffs: Vec<u64>,
    pub modulus: u64,
}

impl CoeffPoly {
    pub fn zero(n: usize, modulus: u64) -> Self {
        Self {
            coeffs: vec![0u64; n],
            modulus,
        }
    }

    /// Create a polynomial from coefficients (reduced mod q).
    pub fn from_coeffs(coeffs: Vec<u64>, modulus: u64) -> Self {
        let mut p = Self { coeffs, modulus };
        p.reduce();
        p
    }

    /// Create a polynomial from signed coefficients, mapping negatives to q - |c|.
    pub fn from_signed(coeffs: &[i64], modulus: u64) -> Self {
        Self {
            coeffs: coeffs.iter().map(|&c| reduce_signed(c, modulus)).collect(),
            modulus,
        }
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn reduce(&mut self) {
        for c in self.coeffs.iter_mut() {
            *c %= self.modulus;
        }
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        if self.len() != other.len() {
            return Err(HeError::DimensionMismatch {
                expected: self.len(),
                got: other.len(),
            });
        }
        if self.modulus != other.modulus {
            return Err(HeError::ModulusMismatch);
        }
        Ok(())
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let coeffs = self.coeffs.iter()
            .zip(other.coeffs.iter())
            .map(|(&a, &b)| mod_add(a, b, self.modulus))
            .collect();
        Ok(Self { coeffs, modulus: self.modulus })
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let coeffs = self.coeffs.iter()
            .zip(other.coeffs.iter())
            .map(|(&a, &b)| mod_sub(a, b, self.modulus))
            .collect();
        Ok(Self { coeffs, modulus: self.modulus })
    }

    pub fn neg(&self) -> Self {
        let coeffs = self.coeffs.iter()
            .map(|&a| mod_neg(a, self.modulus))
            .collect();
        Self { coeffs, modulus: self.modulus }
    }

    /// Schoolbook multiply in Z_q[X]/(X^n+1).
    ///
    /// Skips zero coefficients, so it is cheap for the sparse plaintexts the
    /// integer encoder produces. Use NTT for dense operands.
    pub fn mul_naive(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let n = self.len();
        let q = self.modulus;
        let bk = barrett_constant(q);
        let mut result = vec![0u64; n];

        for (i, &a) in self.coeffs.iter().enumerate() {
            if a == 0 {
                continue;
            }
            for (j, &b) in other.coeffs.iter().enumerate() {
                if b == 0 {
                    continue;
                }
                let prod = mod_mul(a, b, q, bk);
                let idx = i + j;
                if idx < n {
                    result[idx] = mod_add(result[idx], prod, q);
                } else {
                    // X^n ≡ -1 in X^n+1, so wrap with negation
                    result[idx - n] = mod_sub(result[idx - n], prod, q);
                }
            }
        }

        Ok(Self { coeffs: result, modulus: q })
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    /// Number of coefficients up to and including the highest non-zero one.
    pub fn significant_len(&self) -> usize {
        self.coeffs.iter().rposition(|&c| c != 0).map_or(0, |i| i + 1)
    }

    /// Get centered representation: map [0, q) -> [-(q-1)/2, (q-1)/2]
    pub fn centered_coeffs(&self) -> Vec<i64> {
        let half = self.modulus / 2;
        self.coeffs.iter().map(|&c| {
            if c > half {
                c as i64 - self.modulus as i64
            } else {
                c as i64
            }
        }).collect()
    }
}

impl PartialEq for CoeffPoly {
    fn eq(&self, other: &Self) -> bool {
        self.modulus == other.modulus && self.coeffs == other.coeffs
    }
}

impl Eq for CoeffPoly {}
