use std::sync::Arc;
use num_bigint::BigInt;
use num_traits::Signed;
use rayon::prelude::*;

use crate::error::{HeError, Result};
use crate::noise;
use crate::params::EncryptionParameters;
use crate::ring::rns::{RnsBasis, RnsPoly};
use crate::bfv::Ciphertext;

/// Largest operand size on the narrow side of a product. The auxiliary
/// modulus leaves 16 bits of headroom for summing tensor terms.
pub const MAX_TENSOR_TERMS: usize = 1 << 16;

fn check_same_params(ct1: &Ciphertext, ct2: &Ciphertext) -> Result<()> {
    if ct1.params_id != ct2.params_id {
        return Err(HeError::IncompatibleParameters);
    }
    Ok(())
}

/// Homomorphic addition: ct_out = ct1 + ct2.
/// Component-wise addition of ciphertext polynomials; the shorter operand is
/// padded with zeros.
pub fn bfv_add(ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext> {
    check_same_params(ct1, ct2)?;
    let max_len = ct1.c.len().max(ct2.c.len());
    let mut c = Vec::with_capacity(max_len);

    for i in 0..max_len {
        match (ct1.c.get(i), ct2.c.get(i)) {
            (Some(a), Some(b)) => c.push(a.add(b)?),
            (Some(a), None) => c.push(a.clone()),
            (None, Some(b)) => c.push(b.clone()),
            (None, None) => break,
        }
    }

    Ok(Ciphertext {
        c,
        params_id: ct1.params_id,
        noise_estimate: noise::add_budget(ct1.noise_estimate, ct2.noise_estimate),
    })
}

/// Homomorphic subtraction: ct_out = ct1 - ct2.
pub fn bfv_sub(ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext> {
    check_same_params(ct1, ct2)?;
    let max_len = ct1.c.len().max(ct2.c.len());
    let mut c = Vec::with_capacity(max_len);

    for i in 0..max_len {
        match (ct1.c.get(i), ct2.c.get(i)) {
            (Some(a), Some(b)) => c.push(a.sub(b)?),
            (Some(a), None) => c.push(a.clone()),
            (None, Some(b)) => c.push(b.neg()),
            (None, None) => break,
        }
    }

    Ok(Ciphertext {
        c,
        params_id: ct1.params_id,
        noise_estimate: noise::add_budget(ct1.noise_estimate, ct2.noise_estimate),
    })
}

/// Negate a ciphertext.
pub fn bfv_neg(ct: &Ciphertext) -> Ciphertext {
    Ciphertext {
        c: ct.c.iter().map(|ci| ci.neg()).collect(),
        params_id: ct.params_id,
        noise_estimate: noise::negate_budget(ct.noise_estimate),
    }
}

/// Homomorphic multiplication without relinearization.
///
/// For ct1 = (c_0..c_{s1-1}) and ct2 = (d_0..d_{s2-1}) the output has
/// s1 + s2 - 1 components, e_k = ⌊t/Q · Σ_{i+j=k} c_i·d_j⌉.
///
/// Components are lifted to their centered representatives over Q·P, where
/// P is an auxiliary basis wide enough that the tensor product over the
/// integers never wraps. The tensor is computed with NTTs in that basis and
/// every output coefficient is scaled back by t/Q exactly.
pub fn bfv_mul(
    ct1: &Ciphertext,
    ct2: &Ciphertext,
    params: &Arc<EncryptionParameters>,
) -> Result<Ciphertext> {
    check_same_params(ct1, ct2)?;
    check_operand(ct1, params)?;
    check_operand(ct2, params)?;
    if ct1.size().min(ct2.size()) > MAX_TENSOR_TERMS {
        return Err(HeError::InvalidParameter(format!(
            "ciphertext sizes {} and {} are too large to multiply",
            ct1.size(),
            ct2.size()
        )));
    }

    let ext = params.ext_basis()?;
    let lhs = lift(ct1, params.ct_basis(), ext)?;
    let rhs = lift(ct2, params.ct_basis(), ext)?;

    let tensor = tensor_product(&lhs, &rhs)?;
    let c = rescale(&tensor, params)?;

    Ok(Ciphertext {
        c,
        params_id: ct1.params_id,
        noise_estimate: noise::multiply_budget(
            params,
            ct1.noise_estimate,
            ct1.size(),
            ct2.noise_estimate,
            ct2.size(),
        ),
    })
}

/// Homomorphic squaring. Same result as `bfv_mul(ct, ct)` but lifts once.
pub fn bfv_square(ct: &Ciphertext, params: &Arc<EncryptionParameters>) -> Result<Ciphertext> {
    check_operand(ct, params)?;
    if ct.size() > MAX_TENSOR_TERMS {
        return Err(HeError::InvalidParameter(format!(
            "ciphertext size {} is too large to square",
            ct.size()
        )));
    }

    let ext = params.ext_basis()?;
    let lifted = lift(ct, params.ct_basis(), ext)?;

    let tensor = tensor_product(&lifted, &lifted)?;
    let c = rescale(&tensor, params)?;

    Ok(Ciphertext {
        c,
        params_id: ct.params_id,
        noise_estimate: noise::multiply_budget(
            params,
            ct.noise_estimate,
            ct.size(),
            ct.noise_estimate,
            ct.size(),
        ),
    })
}

fn check_operand(ct: &Ciphertext, params: &EncryptionParameters) -> Result<()> {
    if ct.params_id != params.params_id() {
        return Err(HeError::IncompatibleParameters);
    }
    if ct.c.len() < 2 {
        return Err(HeError::DimensionMismatch { expected: 2, got: ct.c.len() });
    }
    Ok(())
}

/// Re-express every component over `ext` using centered representatives.
fn lift(ct: &Ciphertext, ct_basis: &RnsBasis, ext: &RnsBasis) -> Result<Vec<RnsPoly>> {
    ct.c.par_iter()
        .map(|ci| {
            let centered = ci.to_centered_bigints(ct_basis)?;
            RnsPoly::from_bigints(&centered, ext)
        })
        .collect()
}

/// Negacyclic tensor product: result[k] = Σ_{i+j=k} a_i · b_j.
fn tensor_product(a: &[RnsPoly], b: &[RnsPoly]) -> Result<Vec<RnsPoly>> {
    let result_len = a.len() + b.len() - 1;

    // Collect all (i, j) pairs grouped by output index k
    let mut work_items: Vec<(usize, usize, usize)> = Vec::with_capacity(a.len() * b.len());
    for i in 0..a.len() {
        for j in 0..b.len() {
            work_items.push((i, j, i + j));
        }
    }

    // Perform all pairwise products in parallel
    let products: Vec<(usize, RnsPoly)> = work_items.par_iter()
        .map(|&(i, j, k)| Ok((k, a[i].mul(&b[j])?)))
        .collect::<Result<Vec<_>>>()?;

    // Sum products for each output index k
    let mut result: Vec<Option<RnsPoly>> = vec![None; result_len];
    for (k, prod) in products {
        result[k] = Some(match result[k].take() {
            Some(existing) => existing.add(&prod)?,
            None => prod,
        });
    }

    result.into_iter()
        .map(|slot| slot.ok_or(HeError::DimensionMismatch { expected: result_len, got: 0 }))
        .collect()
}

/// Scale each tensor component by t/Q with rounding and reduce into the
/// ciphertext basis.
fn rescale(tensor: &[RnsPoly], params: &EncryptionParameters) -> Result<Vec<RnsPoly>> {
    let ext = params.ext_basis()?;
    let ct_basis = params.ct_basis();
    let t = BigInt::from(params.plain_modulus());
    let q = BigInt::from(ct_basis.product.clone());
    let half_q = &q >> 1u32;

    tensor.iter()
        .map(|component| {
            let coeffs = component.to_centered_bigints(ext)?;
            let scaled: Vec<BigInt> = coeffs.par_iter()
                .map(|x| scale_round(x, &t, &q, &half_q))
                .collect();
            RnsPoly::from_bigints(&scaled, ct_basis)
        })
        .collect()
}

/// ⌊t·x / Q⌉ with ties rounded away from zero.
fn scale_round(x: &BigInt, t: &BigInt, q: &BigInt, half_q: &BigInt) -> BigInt {
    let num = t * x;
    if num.is_negative() {
        -(((-num) + half_q) / q)
    } else {
        (num + half_q) / q
    }
}

/// Bits of headroom between Q·P/2 and the largest possible tensor
/// coefficient `m·n·(Q/2)^2` for operands of the given sizes, m being the
/// number of summed terms.
pub fn tensor_headroom_bits(params: &EncryptionParameters, size_a: usize, size_b: usize) -> Result<i64> {
    let ext = params.ext_basis()?;
    let log_n = params.poly_modulus_degree().trailing_zeros() as i64;
    let log_terms = size_a.min(size_b).max(1).next_power_of_two().trailing_zeros() as i64;
    let q_bits = params.ct_basis().modulus_bits() as i64;
    Ok(ext.modulus_bits() as i64 - 2 * q_bits - log_n - log_terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfv::encoding::IntegerCodec;
    use crate::bfv::encrypt::{decrypt, encrypt_pk_with_rng};
    use crate::bfv::keygen::{generate_keypair_with_rng, KeyPair};
    use crate::params::presets::{compact_params, default_params};
    use crate::params::{EncryptionParameters, SecurityLevel};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    struct Fixture {
        params: Arc<EncryptionParameters>,
        codec: IntegerCodec,
        keys: KeyPair,
        rng: ChaCha20Rng,
    }

    impl Fixture {
        fn new(params: Arc<EncryptionParameters>, seed: u64) -> Self {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let keys = generate_keypair_with_rng(&params, &mut rng).unwrap();
            let codec = IntegerCodec::new(&params);
            Self { params, codec, keys, rng }
        }

        fn enc(&mut self, v: i32) -> Ciphertext {
            let pt = self.codec.encode(v);
            encrypt_pk_with_rng(&pt, &self.keys.public_key, &self.params, &mut self.rng).unwrap()
        }

        fn dec(&self, ct: &Ciphertext) -> i32 {
            let out = decrypt(ct, &self.keys.secret_key, &self.params).unwrap();
            assert!(out.noise_budget > 0);
            self.codec.decode(&out.plaintext).unwrap()
        }
    }

    #[test]
    fn test_homomorphic_add_sub_neg() {
        let mut f = Fixture::new(default_params().unwrap(), 42);
        let a = f.enc(10);
        let b = f.enc(-20);

        assert_eq!(f.dec(&bfv_add(&a, &b).unwrap()), -10);
        assert_eq!(f.dec(&bfv_sub(&a, &b).unwrap()), 30);
        assert_eq!(f.dec(&bfv_neg(&a)), -10);
    }

    #[test]
    fn test_noise_estimate_tracks_operators() {
        let mut f = Fixture::new(default_params().unwrap(), 7);
        let a = f.enc(1);
        let b = f.enc(2);
        let fresh = a.noise_estimate;

        assert_eq!(bfv_add(&a, &b).unwrap().noise_estimate, fresh - 1.0);
        assert_eq!(bfv_neg(&a).noise_estimate, fresh);
        assert!(bfv_mul(&a, &b, &f.params).unwrap().noise_estimate < fresh - 15.0);
    }

    #[test]
    fn test_homomorphic_mul() {
        let mut f = Fixture::new(default_params().unwrap(), 42);
        let a = f.enc(5);
        let b = f.enc(-7);

        let prod = bfv_mul(&a, &b, &f.params).unwrap();
        assert_eq!(prod.size(), 3);
        assert_eq!(f.dec(&prod), -35);
    }

    #[test]
    fn test_homomorphic_mul_multi_prime() {
        let mut f = Fixture::new(compact_params().unwrap(), 1234);
        for (a, b) in [(3, 7), (10, 20), (0, 5), (-12, -12), (1000, -3)] {
            let ca = f.enc(a);
            let cb = f.enc(b);
            assert_eq!(f.dec(&bfv_mul(&ca, &cb, &f.params).unwrap()), a * b);
        }
    }

    #[test]
    fn test_mixed_size_add_and_mul() {
        let params = EncryptionParameters::new(4096, SecurityLevel::Bits192, 1024u64).unwrap();
        let mut f = Fixture::new(params, 99);
        let a = f.enc(-5);
        let b = f.enc(-7);

        // (a + b) * b has size 3; subtracting a fresh ct pads the shorter side.
        let prod = bfv_mul(&bfv_add(&a, &b).unwrap(), &b, &f.params).unwrap();
        assert_eq!(prod.size(), 3);
        let twenty_five = f.enc(25);
        let out = bfv_sub(&prod, &twenty_five).unwrap();
        assert_eq!(out.size(), 3);
        assert_eq!(f.dec(&out), 59);
    }

    #[test]
    fn test_square_matches_mul() {
        let mut f = Fixture::new(default_params().unwrap(), 5);
        let a = f.enc(-9);
        let sq = bfv_square(&a, &f.params).unwrap();
        assert_eq!(sq.size(), 3);
        assert_eq!(f.dec(&sq), 81);
        assert_eq!(sq.noise_estimate, bfv_mul(&a, &a, &f.params).unwrap().noise_estimate);
    }

    #[test]
    fn test_size_three_operand_product() {
        let mut f = Fixture::new(compact_params().unwrap(), 17);
        let a = f.enc(3);
        let b = f.enc(-4);
        let ab = bfv_mul(&a, &b, &f.params).unwrap();
        let abc = bfv_mul(&ab, &f.enc(5), &f.params).unwrap();
        assert_eq!(abc.size(), 4);
        assert_eq!(f.dec(&abc), -60);
    }

    #[test]
    fn test_tensor_headroom_is_positive() {
        for params in [default_params().unwrap(), compact_params().unwrap()] {
            assert!(tensor_headroom_bits(&params, 2, 2).unwrap() > 0);
            assert!(tensor_headroom_bits(&params, MAX_TENSOR_TERMS, MAX_TENSOR_TERMS).unwrap() >= 0);
        }
    }

    #[test]
    fn test_rejects_mixed_parameters() {
        let mut f = Fixture::new(default_params().unwrap(), 1);
        let mut g = Fixture::new(compact_params().unwrap(), 2);
        let a = f.enc(1);
        let b = g.enc(1);
        assert!(matches!(bfv_add(&a, &b), Err(HeError::IncompatibleParameters)));
        assert!(matches!(bfv_sub(&a, &b), Err(HeError::IncompatibleParameters)));
        assert!(matches!(bfv_mul(&a, &b, &f.params), Err(HeError::IncompatibleParameters)));
        assert!(matches!(bfv_square(&b, &f.params), Err(HeError::IncompatibleParameters)));
    }

    #[test]
    fn test_scale_round_ties_away_from_zero() {
        let t = BigInt::from(1);
        let q = BigInt::from(4);
        let half = BigInt::from(2);
        assert_eq!(scale_round(&BigInt::from(2), &t, &q, &half), BigInt::from(1));
        assert_eq!(scale_round(&BigInt::from(-2), &t, &q, &half), BigInt::from(-1));
        assert_eq!(scale_round(&BigInt::from(1), &t, &q, &half), BigInt::from(0));
    }
}
