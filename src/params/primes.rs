use crate::error::{HeError, Result};
use crate::params::SecurityLevel;
use crate::ring::modular::is_prime;

/// Largest bit size of a single RNS prime.
pub const MAX_PRIME_BITS: u32 = 60;

/// Polynomial degrees a context may be created with.
pub const SUPPORTED_DEGREES: [usize; 6] = [1024, 2048, 4096, 8192, 16384, 32768];

/// Total coefficient-modulus bit count for `degree` at `level`
/// (HomomorphicEncryption.org standard, ternary secrets).
pub fn coeff_modulus_bits(degree: usize, level: SecurityLevel) -> Result<u32> {
    let row = match degree {
        1024 => [27, 19, 14],
        2048 => [54, 37, 29],
        4096 => [109, 75, 58],
        8192 => [218, 152, 118],
        16384 => [438, 300, 237],
        32768 => [881, 600, 476],
        _ => {
            return Err(HeError::InvalidParameter(format!(
                "unsupported poly_modulus_degree {degree}, expected one of {SUPPORTED_DEGREES:?}"
            )))
        }
    };
    Ok(match level {
        SecurityLevel::Bits128 => row[0],
        SecurityLevel::Bits192 => row[1],
        SecurityLevel::Bits256 => row[2],
    })
}

/// Split `total` bits into `ceil(total / 60)` near-equal prime sizes, larger first.
pub fn split_bit_sizes(total: u32) -> Vec<u32> {
    let count = total.div_ceil(MAX_PRIME_BITS).max(1);
    let base = total / count;
    let extra = total % count;
    (0..count)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Find the largest prime q < 2^bits with q ≡ 1 (mod two_n), skipping `used`.
///
/// The result has exactly `bits` bits, or the search fails.
pub fn find_ntt_prime(bits: u32, two_n: u64, used: &[u64]) -> Result<u64> {
    if !(2..=62).contains(&bits) {
        return Err(HeError::InvalidParameter(format!("cannot search for a {bits}-bit prime")));
    }
    let upper = (1u64 << bits) - 1;
    let lower = 1u64 << (bits - 1);

    // Largest candidate ≡ 1 mod two_n
    let mut candidate = upper - (upper % two_n) + 1;
    if candidate > upper {
        candidate -= two_n;
    }

    while candidate >= lower {
        if !used.contains(&candidate) && is_prime(candidate) {
            return Ok(candidate);
        }
        match candidate.checked_sub(two_n) {
            Some(next) => candidate = next,
            None => break,
        }
    }
    Err(HeError::InvalidParameter(format!(
        "no {bits}-bit prime ≡ 1 mod {two_n} is available"
    )))
}

/// Generate one NTT-friendly prime per entry of `bit_sizes`, all distinct
/// from each other and from `exclude`.
pub fn ntt_primes(degree: usize, bit_sizes: &[u32], exclude: &[u64]) -> Result<Vec<u64>> {
    let two_n = 2 * degree as u64;
    let mut used: Vec<u64> = exclude.to_vec();
    let mut primes = Vec::with_capacity(bit_sizes.len());
    for &bits in bit_sizes {
        let q = find_ntt_prime(bits, two_n, &used)?;
        used.push(q);
        primes.push(q);
    }
    Ok(primes)
}

/// Ciphertext primes for a (degree, level) pair.
pub fn coeff_modulus(degree: usize, level: SecurityLevel) -> Result<Vec<u64>> {
    let total = coeff_modulus_bits(degree, level)?;
    ntt_primes(degree, &split_bit_sizes(total), &[])
}

/// Auxiliary primes P used while multiplying ciphertexts.
///
/// Tensor coefficients are bounded by `k·n·Q²/4` for `k ≤ 2^16` summed
/// products, so Q·P must exceed `2^17·n·Q²/4` for the centered lift to be exact.
pub fn auxiliary_modulus(degree: usize, ct_primes: &[u64], ct_bits: u64) -> Result<Vec<u64>> {
    let log_n = degree.trailing_zeros() as u64;
    let needed = ct_bits + log_n + 16;
    // each prime has exactly MAX_PRIME_BITS bits, so contributes at least one less
    let count = needed.div_ceil(MAX_PRIME_BITS as u64 - 1) as usize;
    ntt_primes(degree, &vec![MAX_PRIME_BITS; count], ct_primes)
}
