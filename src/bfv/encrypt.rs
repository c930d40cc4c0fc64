use std::sync::Arc;
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use crate::error::{HeError, Result};
use crate::noise;
use crate::params::EncryptionParameters;
use crate::ring::poly::CoeffPoly;
use crate::ring::rns::RnsPoly;
use crate::bfv::Ciphertext;
use crate::bfv::keygen::{SecretKey, PublicKey};
use crate::backend::Decryption;
use crate::sampling::{sample_binary_coeffs, sample_gaussian_coeffs};

/// Encrypt a plaintext polynomial using the public key.
///
/// ct = (pk0·u + e1 + Δ·m, pk1·u + e2)
/// where Δ = ⌊Q/t⌋, u is binary, e1,e2 are Gaussian errors.
pub fn encrypt_pk(
    plaintext: &CoeffPoly,
    pk: &PublicKey,
    params: &Arc<EncryptionParameters>,
) -> Result<Ciphertext> {
    let mut rng = ChaCha20Rng::from_os_rng();
    encrypt_pk_with_rng(plaintext, pk, params, &mut rng)
}

/// Encrypt with provided RNG (for deterministic testing).
pub fn encrypt_pk_with_rng<R: rand::Rng>(
    plaintext: &CoeffPoly,
    pk: &PublicKey,
    params: &Arc<EncryptionParameters>,
    rng: &mut R,
) -> Result<Ciphertext> {
    if pk.params_id != params.params_id() {
        return Err(HeError::IncompatibleParameters);
    }
    let basis = params.ct_basis();
    let n = params.poly_modulus_degree();

    let delta_m = scale_plaintext(plaintext, params)?;

    // Sample u ← binary
    let u = RnsPoly::from_signed(&sample_binary_coeffs(n, rng), basis)?;

    // Sample errors e1, e2
    let e1 = RnsPoly::from_signed(&sample_gaussian_coeffs(n, params.sigma(), rng), basis)?;
    let e2 = RnsPoly::from_signed(&sample_gaussian_coeffs(n, params.sigma(), rng), basis)?;

    // c0 = pk0·u + e1 + Δ·m
    let c0 = pk.pk0.mul(&u)?.add(&e1)?.add(&delta_m)?;

    // c1 = pk1·u + e2
    let c1 = pk.pk1.mul(&u)?.add(&e2)?;

    Ok(Ciphertext {
        c: vec![c0, c1],
        params_id: params.params_id(),
        noise_estimate: noise::fresh_budget(params),
    })
}

/// Compute the phase c0 + c1·s + c2·s^2 + ... in R_Q.
pub fn phase(ct: &Ciphertext, sk: &SecretKey) -> Result<RnsPoly> {
    let mut acc = ct.c[0].clone();
    let mut s_power = sk.poly.clone();
    for i in 1..ct.c.len() {
        acc = acc.add(&ct.c[i].mul(&s_power)?)?;
        if i + 1 < ct.c.len() {
            s_power = s_power.mul(&sk.poly)?;
        }
    }
    Ok(acc)
}

/// Decrypt a BFV ciphertext and measure its invariant noise budget.
///
/// m_i = ⌊t · phase_i / Q⌉ mod t. The budget comes from the largest
/// centered coefficient of t · phase mod Q.
pub fn decrypt(
    ct: &Ciphertext,
    sk: &SecretKey,
    params: &Arc<EncryptionParameters>,
) -> Result<Decryption> {
    if ct.c.len() < 2 {
        return Err(HeError::DimensionMismatch { expected: 2, got: ct.c.len() });
    }
    let basis = params.ct_basis();
    sk.poly.check_basis(basis)?;
    for poly in &ct.c {
        poly.check_basis(basis)?;
    }

    let residue_polys = phase(ct, sk)?.to_residue_polys();

    let t = params.plain_modulus();
    let t_big = BigUint::from(t);
    let q_big = &basis.product;
    let half_q = q_big >> 1u32;

    let decoded: Vec<(u64, u64)> = (0..params.poly_modulus_degree())
        .into_par_iter()
        .map(|j| {
            let residues: Vec<u64> = residue_polys.iter().map(|p| p.coeffs[j]).collect();
            let x = basis.reconstruct(&residues);
            let tx = &x * &t_big;

            let m = ((&tx + &half_q) / q_big) % &t_big;
            let m = m.to_u64().ok_or_else(|| HeError::InvalidParameter(
                "decryption coefficient does not fit in u64".into()
            ))?;

            // |[t·x]_Q| for the invariant noise
            let w = tx % q_big;
            let norm = if w > half_q { q_big - &w } else { w };
            Ok((m, norm.bits()))
        })
        .collect::<Result<Vec<_>>>()?;

    let norm_bits = decoded.iter().map(|&(_, bits)| bits).max().unwrap_or(0);
    let coeffs = decoded.into_iter().map(|(m, _)| m).collect();

    Ok(Decryption {
        plaintext: CoeffPoly { coeffs, modulus: t },
        noise_budget: noise::invariant_budget(basis.modulus_bits(), norm_bits),
    })
}

/// Scale plaintext by Δ = ⌊Q/t⌋ (Q = ∏q_i) and convert to RNS-NTT form.
pub(crate) fn scale_plaintext(plaintext: &CoeffPoly, params: &EncryptionParameters) -> Result<RnsPoly> {
    if plaintext.modulus != params.plain_modulus() {
        return Err(HeError::ModulusMismatch);
    }
    RnsPoly::from_coeff_poly(plaintext, params.ct_basis())?
        .mul_residues(params.delta_residues())
}
