/// Barrett reduction: compute a mod m using precomputed Barrett constant.
///
/// Barrett constant k = floor(2^64 / m). For moduli ≤ 2^32 the single-word
/// trick is exact for inputs a < m^2. Larger moduli fall back to u128 division.
#[inline(always)]
pub fn barrett_reduce(a: u128, m: u64, barrett_k: u64) -> u64 {
    if m > (1u64 << 32) {
        (a % m as u128) as u64
    } else {
        // q_hat = (a * k) >> 64
        let q_hat = ((a * barrett_k as u128) >> 64) as u64;
        let r = (a as u64).wrapping_sub(q_hat.wrapping_mul(m));
        if r >= m { r.wrapping_sub(m) } else { r }
    }
}

/// Compute Barrett constant for modulus m: floor(2^64 / m)
#[inline]
pub fn barrett_constant(m: u64) -> u64 {
    debug_assert!(m > 1, "modulus must be > 1");
    ((1u128 << 64) / m as u128) as u64
}

/// Modular addition: (a + b) mod m, assumes a, b < m
#[inline(always)]
pub fn mod_add(a: u64, b: u64, m: u64) -> u64 {
    let sum = a as u128 + b as u128;
    let r = sum as u64;
    if sum >= m as u128 { r.wrapping_sub(m) } else { r }
}

/// Modular subtraction: (a - b) mod m, assumes a, b < m
#[inline(always)]
pub fn mod_sub(a: u64, b: u64, m: u64) -> u64 {
    if a >= b {
        a - b
    } else {
        m - b + a
    }
}

/// Modular negation: (-a) mod m, assumes a < m
#[inline(always)]
pub fn mod_neg(a: u64, m: u64) -> u64 {
    if a == 0 { 0 } else { m - a }
}

/// Modular multiplication: (a * b) mod m using Barrett reduction
#[inline(always)]
pub fn mod_mul(a: u64, b: u64, m: u64, barrett_k: u64) -> u64 {
    let product = a as u128 * b as u128;
    barrett_reduce(product, m, barrett_k)
}

/// Map a small signed integer into [0, m).
#[inline]
pub fn reduce_signed(x: i64, m: u64) -> u64 {
    let r = (x as i128).rem_euclid(m as i128);
    r as u64
}

/// Modular exponentiation: a^exp mod m
pub fn mod_pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let bk = barrett_constant(m);
    let mut result = 1u64;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mod_mul(result, base, m, bk);
        }
        exp >>= 1;
        base = mod_mul(base, base, m, bk);
    }
    result
}

/// Find modular inverse: a^{-1} mod m using extended Euclidean algorithm
pub fn mod_inv(a: u64, m: u64) -> Option<u64> {
    let (mut old_r, mut r) = (a as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);

    while r != 0 {
        let q = old_r / r;
        let tmp = r;
        r = old_r - q * r;
        old_r = tmp;
        let tmp = s;
        s = old_s - q * s;
        old_s = tmp;
    }

    if old_r != 1 {
        return None;
    }

    Some(((old_s % m as i128 + m as i128) % m as i128) as u64)
}

/// Deterministic Miller-Rabin for the full u64 range.
pub fn is_prime(n: u64) -> bool {
    const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

    if n < 2 {
        return false;
    }
    for &p in &WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }

    let mut d = n - 1;
    let mut s = 0u32;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    let bk = barrett_constant(n);
    'witness: for &a in &WITNESSES {
        let mut x = mod_pow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mod_mul(x, x, n, bk);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}
