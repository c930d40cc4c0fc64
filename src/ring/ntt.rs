use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use concrete_ntt::prime64::Plan;

use crate::error::{HeError, Result};
use crate::ring::modular::{barrett_constant, mod_add, mod_mul, mod_neg, mod_sub};
use crate::ring::poly::CoeffPoly;

/// Polynomial in NTT (evaluation) representation over Z_q[X]/(X^n + 1).
///
/// Uses `concrete-ntt` for hardware-accelerated NTT (AVX2/AVX-512/NEON).
#[derive(Clone, Debug)]
pub struct NttPoly {
    pub evals: Vec<u64>,
    pub modulus: u64,
    pub plan: Arc<Plan>,
}

type PlanCache = Mutex<HashMap<(usize, u64), Arc<Plan>>>;

fn plan_cache() -> &'static PlanCache {
    static CACHE: OnceLock<PlanCache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Fetch (or build once) the NTT plan for `(n, modulus)`.
///
/// Every context deserializing the same parameters shares one plan per prime.
pub fn make_plan(n: usize, modulus: u64) -> Result<Arc<Plan>> {
    if !n.is_power_of_two() || n < 16 {
        return Err(HeError::InvalidRingDegree(n));
    }

    if let Ok(cache) = plan_cache().lock() {
        if let Some(plan) = cache.get(&(n, modulus)) {
            return Ok(plan.clone());
        }
    }

    // concrete-ntt requires modulus to be prime and ≡ 1 (mod 2n)
    let plan = Plan::try_new(n, modulus)
        .ok_or_else(|| HeError::InvalidParameter(
            format!("cannot create NTT plan for n={n}, q={modulus} (need prime q ≡ 1 mod {})", 2 * n)
        ))?;
    let plan = Arc::new(plan);

    if let Ok(mut cache) = plan_cache().lock() {
        cache.entry((n, modulus)).or_insert_with(|| plan.clone());
    }
    Ok(plan)
}

impl NttPoly {
    pub fn zero(n: usize, modulus: u64, plan: Arc<Plan>) -> Self {
        Self {
            evals: vec![0u64; n],
            modulus,
            plan,
        }
    }

    /// Wrap already-transformed evaluations (e.g. read back from the wire).
    pub fn from_evals(evals: Vec<u64>, plan: Arc<Plan>) -> Result<Self> {
        let modulus = plan.modulus();
        if evals.len() != plan.ntt_size() {
            return Err(HeError::DimensionMismatch {
                expected: plan.ntt_size(),
                got: evals.len(),
            });
        }
        if evals.iter().any(|&e| e >= modulus) {
            return Err(HeError::ModulusMismatch);
        }
        Ok(Self { evals, modulus, plan })
    }

    /// Forward NTT: convert from coefficient to evaluation representation.
    pub fn from_coeff_poly(poly: &CoeffPoly, plan: Arc<Plan>) -> Result<Self> {
        if poly.modulus != plan.modulus() {
            return Err(HeError::ModulusMismatch);
        }
        let mut evals = poly.coeffs.clone();
        plan.fwd(&mut evals);
        Ok(Self {
            evals,
            modulus: poly.modulus,
            plan,
        })
    }

    /// Inverse NTT: convert back to coefficient representation.
    pub fn to_coeff_poly(&self) -> CoeffPoly {
        let mut coeffs = self.evals.clone();
        self.plan.inv(&mut coeffs);
        self.plan.normalize(&mut coeffs);
        CoeffPoly {
            coeffs,
            modulus: self.modulus,
        }
    }

    pub fn len(&self) -> usize {
        self.evals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evals.is_empty()
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        if self.len() != other.len() || self.modulus != other.modulus {
            return Err(HeError::ModulusMismatch);
        }
        Ok(())
    }

    /// Component-wise addition in NTT domain (= polynomial addition).
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let q = self.modulus;
        let evals = self.evals.iter()
            .zip(other.evals.iter())
            .map(|(&a, &b)| mod_add(a, b, q))
            .collect();
        Ok(Self { evals, modulus: q, plan: self.plan.clone() })
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let q = self.modulus;
        let evals = self.evals.iter()
            .zip(other.evals.iter())
            .map(|(&a, &b)| mod_sub(a, b, q))
            .collect();
        Ok(Self { evals, modulus: q, plan: self.plan.clone() })
    }

    pub fn neg(&self) -> Self {
        let q = self.modulus;
        let evals = self.evals.iter().map(|&a| mod_neg(a, q)).collect();
        Self { evals, modulus: q, plan: self.plan.clone() }
    }

    /// Pointwise multiplication in NTT domain (= negacyclic polynomial product).
    ///
    /// The 1/n normalization is applied later by `to_coeff_poly`.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let q = self.modulus;
        let bk = barrett_constant(q);
        let evals = self.evals.iter()
            .zip(other.evals.iter())
            .map(|(&a, &b)| mod_mul(a, b, q, bk))
            .collect();
        Ok(Self { evals, modulus: q, plan: self.plan.clone() })
    }

    pub fn scalar_mul(&self, scalar: u64) -> Self {
        let q = self.modulus;
        let s = scalar % q;
        let bk = barrett_constant(q);
        let evals = self.evals.iter().map(|&a| mod_mul(a, s, q, bk)).collect();
        Self { evals, modulus: q, plan: self.plan.clone() }
    }

    pub fn is_zero(&self) -> bool {
        self.evals.iter().all(|&e| e == 0)
    }
}

impl PartialEq for NttPoly {
    fn eq(&self, other: &Self) -> bool {
        self.modulus == other.modulus && self.evals == other.evals
    }
}
