use rand::Rng;

use crate::error::Result;
use crate::ring::ntt::NttPoly;
use crate::ring::poly::CoeffPoly;
use crate::ring::rns::{RnsBasis, RnsPoly};

/// Sample a polynomial with uniformly random coefficients in [0, modulus).
pub fn sample_uniform_poly<R: Rng>(n: usize, modulus: u64, rng: &mut R) -> CoeffPoly {
    // Rejection sampling to avoid bias
    let mask = if modulus.is_power_of_two() {
        modulus - 1
    } else {
        u64::MAX >> modulus.leading_zeros()
    };

    let coeffs: Vec<u64> = (0..n)
        .map(|_| {
            loop {
                let val = rng.random::<u64>() & mask;
                if val < modulus {
                    break val;
                }
            }
        })
        .collect();
    CoeffPoly { coeffs, modulus }
}

/// Sample a uniformly random element of R_Q.
///
/// Independent uniform residues per prime are uniform mod Q by CRT.
pub fn sample_uniform_rns<R: Rng>(basis: &RnsBasis, rng: &mut R) -> Result<RnsPoly> {
    let components = basis.moduli.iter()
        .zip(basis.plans.iter())
        .map(|(&q, plan)| {
            let cp = sample_uniform_poly(basis.ring_degree, q, rng);
            NttPoly::from_coeff_poly(&cp, plan.clone())
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RnsPoly {
        components,
        ring_degree: basis.ring_degree,
    })
}

/// Sample `n` ternary coefficients, each -1, 0 or 1 with probability 1/3.
pub fn sample_ternary_coeffs<R: Rng>(n: usize, rng: &mut R) -> Vec<i64> {
    (0..n)
        .map(|_| {
            // Rejection sampling on 2 bits for uniform {0,1,2}
            let val = loop {
                let r = rng.random::<u8>() & 0x03;
                if r < 3 { break r; }
            };
            val as i64 - 1
        })
        .collect()
}

/// Sample `n` binary coefficients in {0, 1}.
pub fn sample_binary_coeffs<R: Rng>(n: usize, rng: &mut R) -> Vec<i64> {
    (0..n)
        .map(|_| (rng.random::<u64>() & 1) as i64)
        .collect()
}
