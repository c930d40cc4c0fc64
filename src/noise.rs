//! Noise budget bookkeeping.
//!
//! Two quantities are tracked. The *measured* invariant noise budget needs
//! the secret key and is computed on decryption:
//! `max(0, bits(Q) - bits(||[t·(c·s)]_Q||∞) - 1)`. The *estimate* is a
//! worst-case heuristic carried in every ciphertext and updated by each
//! operator; it never needs a key. When decryption measures a zero budget the
//! estimate tells the two failure modes apart: an exhausted estimate means the
//! ciphertext ran out of budget, a healthy one means the key does not match.

use tracing::warn;

use crate::error::{CastFailure, HeError};
use crate::params::EncryptionParameters;

/// Budget of a fresh public-key encryption.
///
/// Fresh noise is `e·u + e1 + e2·s`. The products are sums of about n
/// Gaussian terms, so the infinity norm stays near `6σ·sqrt(2n)`.
pub fn fresh_budget(params: &EncryptionParameters) -> f64 {
    let n = params.poly_modulus_degree() as f64;
    let log_q = params.ct_basis().modulus_bits() as f64;
    let log_t = (params.plain_modulus() as f64).log2();
    let log_v = (6.0 * params.sigma() * (2.0 * n).sqrt()).log2();
    log_q - log_t - log_v - 1.0
}

/// Addition or subtraction adds the noise terms: at most one bit.
pub fn add_budget(a: f64, b: f64) -> f64 {
    a.min(b) - 1.0
}

/// Negation leaves the noise magnitude unchanged.
pub fn negate_budget(a: f64) -> f64 {
    a
}

/// Multiplication without relinearization of ciphertexts of sizes
/// `size_a` and `size_b`.
///
/// Every extra component multiplies the rounding error by another power of
/// `s`, costing about half of log2(n) bits each.
pub fn multiply_budget(
    params: &EncryptionParameters,
    a: f64,
    size_a: usize,
    b: f64,
    size_b: usize,
) -> f64 {
    let log_n = (params.poly_modulus_degree() as f64).log2();
    let log_t = (params.plain_modulus() as f64).log2();
    let growth = (size_a + size_b).saturating_sub(4) as f64;
    a.min(b) - (log_t + log_n + 2.0) - 0.5 * log_n * growth
}

pub fn is_exhausted(estimate: f64) -> bool {
    estimate <= 0.0
}

/// Invariant noise budget from the bit length of Q and of the largest
/// centered coefficient of `t·(c·s) mod Q`.
pub fn invariant_budget(modulus_bits: u64, norm_bits: u64) -> u32 {
    modulus_bits.saturating_sub(norm_bits).saturating_sub(1) as u32
}

/// Error for a decryption whose measured budget is zero.
pub fn zero_budget_error(estimate: f64) -> HeError {
    if is_exhausted(estimate) {
        warn!(estimate, "noise budget exhausted, plaintext is unrecoverable");
        HeError::DecodeCast(CastFailure::NoiseBudgetExhausted)
    } else {
        HeError::DecryptionRange
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::presets::default_params;

    #[test]
    fn test_fresh_budget_default() {
        let params = default_params().unwrap();
        let fresh = fresh_budget(&params);
        // 54 - 8 - log2(6·3.2·64) - 1 ≈ 34.7
        assert!(fresh > 34.0 && fresh < 35.5, "fresh = {fresh}");
    }

    #[test]
    fn test_operator_costs() {
        let params = default_params().unwrap();
        assert_eq!(add_budget(10.0, 12.0), 9.0);
        assert_eq!(negate_budget(7.5), 7.5);
        let once = multiply_budget(&params, 40.0, 2, 40.0, 2);
        assert_eq!(once, 40.0 - (8.0 + 11.0 + 2.0));
        let wider = multiply_budget(&params, 40.0, 3, 40.0, 2);
        assert!(wider < once);
    }

    #[test]
    fn test_invariant_budget() {
        assert_eq!(invariant_budget(54, 20), 33);
        assert_eq!(invariant_budget(54, 53), 0);
        assert_eq!(invariant_budget(54, 60), 0);
    }

    #[test]
    fn test_zero_budget_classification() {
        assert!(matches!(zero_budget_error(12.0), HeError::DecryptionRange));
        assert!(matches!(
            zero_budget_error(-3.0),
            HeError::DecodeCast(CastFailure::NoiseBudgetExhausted)
        ));
    }
}
