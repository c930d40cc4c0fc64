//! RLWE security estimation.
//!
//! Rough estimate interpolated from the HomomorphicEncryption.org tables:
//! for ternary secrets and σ ≈ 3.2 the attainable security is close to a
//! linear function of the ratio n / log2(q). Each anchor is the smallest
//! ratio at which the standard still certifies that level.

/// (n / log2 q, security bits) anchors, ascending.
const ANCHORS: [(f64, f64); 3] = [
    (37.19, 128.0),
    (53.89, 192.0),
    (68.84, 256.0),
];

/// Estimate the security level (in bits) of RLWE with ring degree `n`
/// and a `log2_q`-bit modulus.
pub fn estimate_security_bits(ring_degree: usize, log2_q: f64) -> f64 {
    if log2_q <= 0.0 {
        return f64::INFINITY;
    }
    let ratio = ring_degree as f64 / log2_q;

    // Piecewise-linear interpolation, extrapolating along the outer segments
    let segment = if ratio < ANCHORS[1].0 { 0 } else { 1 };
    let (x0, y0) = ANCHORS[segment];
    let (x1, y1) = ANCHORS[segment + 1];
    let estimate = y0 + (ratio - x0) * (y1 - y0) / (x1 - x0);
    estimate.max(0.0)
}

/// Check if parameters meet a minimum security level.
pub fn check_security(ring_degree: usize, log2_q: f64, min_bits: f64) -> bool {
    estimate_security_bits(ring_degree, log2_q) >= min_bits
}
