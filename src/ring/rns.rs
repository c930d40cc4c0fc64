use std::sync::Arc;
use concrete_ntt::prime64::Plan;
use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, ToPrimitive, Zero};
use rayon::prelude::*;

use crate::error::{HeError, Result};
use crate::ring::modular::{mod_mul, mod_inv, barrett_constant, reduce_signed};
use crate::ring::ntt::{NttPoly, make_plan};
use crate::ring::poly::CoeffPoly;

/// Polynomial in RNS (Residue Number System) representation.
///
/// Stores one NttPoly per RNS prime. The actual polynomial lives in Z_Q[X]/(X^n+1)
/// where Q = ∏ q_i.
#[derive(Clone, Debug, PartialEq)]
pub struct RnsPoly {
    pub components: Vec<NttPoly>,
    pub ring_degree: usize,
}

/// Stores precomputed data for an RNS basis.
#[derive(Clone, Debug)]
pub struct RnsBasis {
    pub moduli: Vec<u64>,
    pub plans: Vec<Arc<Plan>>,
    pub ring_degree: usize,
    /// Barrett constants for each modulus.
    pub barrett_ks: Vec<u64>,
    /// q_star_inv_i = (Q/q_i)^{-1} mod q_i.
    pub q_star_inv: Vec<u64>,
    /// Q = ∏ q_i.
    pub product: BigUint,
    half_product: BigUint,
    /// (Q/q_i) · q_star_inv_i, so x = Σ r_i · crt_terms_i mod Q.
    crt_terms: Vec<BigUint>,
}

impl RnsBasis {
    /// Create a new RNS basis from a list of distinct NTT-friendly primes.
    pub fn new(moduli: Vec<u64>, ring_degree: usize) -> Result<Self> {
        if moduli.is_empty() {
            return Err(HeError::InvalidParameter("RNS basis needs at least one modulus".into()));
        }

        let plans: Vec<Arc<Plan>> = moduli.iter()
            .map(|&q| make_plan(ring_degree, q))
            .collect::<Result<Vec<_>>>()?;

        let barrett_ks: Vec<u64> = moduli.iter()
            .map(|&q| barrett_constant(q))
            .collect();

        // Compute q_star_inv_i = (Q/q_i)^{-1} mod q_i
        let q_star_inv: Vec<u64> = (0..moduli.len()).map(|i| {
            let mut prod = 1u64;
            let bk = barrett_ks[i];
            for (j, &qj) in moduli.iter().enumerate() {
                if i != j {
                    prod = mod_mul(prod, qj % moduli[i], moduli[i], bk);
                }
            }
            mod_inv(prod, moduli[i]).ok_or_else(|| HeError::InvalidParameter(
                format!("RNS modulus {} is not coprime to the rest of the basis", moduli[i])
            ))
        }).collect::<Result<Vec<_>>>()?;

        let product: BigUint = moduli.iter().map(|&q| BigUint::from(q)).product();
        let crt_terms = moduli.iter()
            .zip(q_star_inv.iter())
            .map(|(&qi, &inv)| (&product / BigUint::from(qi)) * BigUint::from(inv))
            .collect();
        let half_product = &product >> 1u32;

        Ok(Self {
            moduli,
            plans,
            ring_degree,
            barrett_ks,
            q_star_inv,
            product,
            half_product,
            crt_terms,
        })
    }

    pub fn num_moduli(&self) -> usize {
        self.moduli.len()
    }

    /// Bit length of Q.
    pub fn modulus_bits(&self) -> u64 {
        self.product.bits()
    }

    /// Basis over the primes of `self` followed by the primes of `other`.
    pub fn extend(&self, other: &RnsBasis) -> Result<Self> {
        if self.ring_degree != other.ring_degree {
            return Err(HeError::DimensionMismatch {
                expected: self.ring_degree,
                got: other.ring_degree,
            });
        }
        let moduli = self.moduli.iter().chain(other.moduli.iter()).copied().collect();
        Self::new(moduli, self.ring_degree)
    }

    /// CRT-reconstruct the value in [0, Q) with the given residues.
    pub fn reconstruct(&self, residues: &[u64]) -> BigUint {
        let mut x = BigUint::zero();
        for (term, &r) in self.crt_terms.iter().zip(residues.iter()) {
            x += term * BigUint::from(r);
        }
        x % &self.product
    }

    /// CRT-reconstruct into the centered range (-Q/2, Q/2].
    pub fn reconstruct_centered(&self, residues: &[u64]) -> BigInt {
        let x = self.reconstruct(residues);
        if x > self.half_product {
            BigInt::from(x) - BigInt::from(self.product.clone())
        } else {
            BigInt::from(x)
        }
    }

    fn reduce_bigint(&self, value: &BigInt, i: usize) -> Result<u64> {
        let qi = BigInt::from(self.moduli[i]);
        let mut r = value % &qi;
        if r.is_negative() {
            r += &qi;
        }
        r.to_u64().ok_or_else(|| HeError::InvalidParameter(
            "coefficient conversion to u64 failed".into()
        ))
    }
}

impl RnsPoly {
    /// Create a zero polynomial in RNS.
    pub fn zero(basis: &RnsBasis) -> Self {
        let components = basis.moduli.iter()
            .zip(basis.plans.iter())
            .map(|(&q, plan)| NttPoly::zero(basis.ring_degree, q, plan.clone()))
            .collect();
        Self {
            components,
            ring_degree: basis.ring_degree,
        }
    }

    /// Create an RnsPoly from a CoeffPoly with non-negative coefficients by
    /// reducing mod each RNS prime and NTT-ing.
    pub fn from_coeff_poly(poly: &CoeffPoly, basis: &RnsBasis) -> Result<Self> {
        if poly.len() != basis.ring_degree {
            return Err(HeError::DimensionMismatch {
                expected: basis.ring_degree,
                got: poly.len(),
            });
        }
        let components: Vec<NttPoly> = basis.moduli.iter()
            .zip(basis.plans.iter())
            .map(|(&q, plan)| {
                let reduced = CoeffPoly::from_coeffs(
                    poly.coeffs.iter().map(|&c| c % q).collect(),
                    q,
                );
                NttPoly::from_coeff_poly(&reduced, plan.clone())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            components,
            ring_degree: basis.ring_degree,
        })
    }

    /// Create an RnsPoly from small signed coefficients (secrets, errors).
    pub fn from_signed(coeffs: &[i64], basis: &RnsBasis) -> Result<Self> {
        if coeffs.len() != basis.ring_degree {
            return Err(HeError::DimensionMismatch {
                expected: basis.ring_degree,
                got: coeffs.len(),
            });
        }
        let components = basis.moduli.iter()
            .zip(basis.plans.iter())
            .map(|(&q, plan)| {
                let cp = CoeffPoly {
                    coeffs: coeffs.iter().map(|&c| reduce_signed(c, q)).collect(),
                    modulus: q,
                };
                NttPoly::from_coeff_poly(&cp, plan.clone())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            components,
            ring_degree: basis.ring_degree,
        })
    }

    /// Create an RnsPoly from arbitrary-precision signed coefficients.
    pub fn from_bigints(coeffs: &[BigInt], basis: &RnsBasis) -> Result<Self> {
        if coeffs.len() != basis.ring_degree {
            return Err(HeError::DimensionMismatch {
                expected: basis.ring_degree,
                got: coeffs.len(),
            });
        }
        let components = (0..basis.num_moduli())
            .map(|i| {
                let residues = coeffs.iter()
                    .map(|c| basis.reduce_bigint(c, i))
                    .collect::<Result<Vec<_>>>()?;
                let cp = CoeffPoly { coeffs: residues, modulus: basis.moduli[i] };
                NttPoly::from_coeff_poly(&cp, basis.plans[i].clone())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            components,
            ring_degree: basis.ring_degree,
        })
    }

    /// Inverse-NTT every component, giving one residue polynomial per prime.
    pub fn to_residue_polys(&self) -> Vec<CoeffPoly> {
        self.components.iter()
            .map(|ntt| ntt.to_coeff_poly())
            .collect()
    }

    /// Recover the centered integer coefficients in (-Q/2, Q/2].
    pub fn to_centered_bigints(&self, basis: &RnsBasis) -> Result<Vec<BigInt>> {
        self.check_basis(basis)?;
        let residue_polys = self.to_residue_polys();
        let coeffs = (0..self.ring_degree)
            .into_par_iter()
            .map(|j| {
                let residues: Vec<u64> = residue_polys.iter().map(|p| p.coeffs[j]).collect();
                basis.reconstruct_centered(&residues)
            })
            .collect();
        Ok(coeffs)
    }

    /// True when this polynomial is laid out over `basis`.
    pub fn check_basis(&self, basis: &RnsBasis) -> Result<()> {
        if self.ring_degree != basis.ring_degree {
            return Err(HeError::DimensionMismatch {
                expected: basis.ring_degree,
                got: self.ring_degree,
            });
        }
        if self.components.len() != basis.num_moduli() {
            return Err(HeError::DimensionMismatch {
                expected: basis.num_moduli(),
                got: self.components.len(),
            });
        }
        let same_primes = self.components.iter()
            .zip(basis.moduli.iter())
            .all(|(c, &q)| c.modulus == q);
        if !same_primes {
            return Err(HeError::ModulusMismatch);
        }
        Ok(())
    }

    /// Number of RNS components.
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    fn check_components(&self, other: &Self) -> Result<()> {
        if self.components.len() != other.components.len() {
            return Err(HeError::DimensionMismatch {
                expected: self.components.len(),
                got: other.components.len(),
            });
        }
        Ok(())
    }

    /// Component-wise addition in RNS.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_components(other)?;
        let components = self.components.iter()
            .zip(other.components.iter())
            .map(|(a, b)| a.add(b))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components, ring_degree: self.ring_degree })
    }

    /// Component-wise subtraction in RNS.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.check_components(other)?;
        let components = self.components.iter()
            .zip(other.components.iter())
            .map(|(a, b)| a.sub(b))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components, ring_degree: self.ring_degree })
    }

    pub fn neg(&self) -> Self {
        let components = self.components.iter()
            .map(|a| a.neg())
            .collect();
        Self { components, ring_degree: self.ring_degree }
    }

    /// Component-wise multiplication in RNS (= polynomial multiplication).
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.check_components(other)?;
        let components = self.components.iter()
            .zip(other.components.iter())
            .map(|(a, b)| a.mul(b))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components, ring_degree: self.ring_degree })
    }

    pub fn scalar_mul(&self, scalar: u64) -> Self {
        let components = self.components.iter()
            .map(|c| c.scalar_mul(scalar))
            .collect();
        Self { components, ring_degree: self.ring_degree }
    }

    /// Multiply by a big scalar given as its residue modulo each prime.
    pub fn mul_residues(&self, residues: &[u64]) -> Result<Self> {
        if residues.len() != self.components.len() {
            return Err(HeError::DimensionMismatch {
                expected: self.components.len(),
                got: residues.len(),
            });
        }
        let components = self.components.iter()
            .zip(residues.iter())
            .map(|(c, &r)| c.scalar_mul(r))
            .collect();
        Ok(Self { components, ring_degree: self.ring_degree })
    }
}
