use rand::Rng;

/// Discrete Gaussian sampler over Z, centered at 0, using a cumulative
/// distribution table truncated at ±6σ.
///
/// For σ = 3.2 the table covers [-20, 20]; the mass beyond is negligible.
#[derive(Clone, Debug)]
pub struct GaussianSampler {
    tail: i64,
    cdf: Vec<f64>,
}

impl GaussianSampler {
    pub fn new(sigma: f64) -> Self {
        let tail = (6.0 * sigma).ceil() as i64;
        let two_sigma_sq = 2.0 * sigma * sigma;

        // Unnormalized CDT
        let mut cdf = Vec::with_capacity((2 * tail + 1) as usize);
        let mut cumulative = 0.0f64;
        for x in -tail..=tail {
            cumulative += (-((x * x) as f64) / two_sigma_sq).exp();
            cdf.push(cumulative);
        }

        Self { tail, cdf }
    }

    /// Largest magnitude this sampler can return.
    pub fn tail(&self) -> i64 {
        self.tail
    }

    /// Draw one sample.
    ///
    /// The scan is branchless: every CDF entry is visited and a mask select
    /// keeps the lowest index with `u < cdf[i]`, so timing does not depend
    /// on the sampled value.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> i64 {
        let total = self.cdf[self.cdf.len() - 1];
        let u: f64 = rng.random::<f64>() * total;

        let mut result = self.tail;
        for i in (0..self.cdf.len()).rev() {
            let mask = ((u < self.cdf[i]) as i64).wrapping_neg();
            let candidate = -self.tail + i as i64;
            result = (candidate & mask) | (result & !mask);
        }
        result
    }
}

/// Sample `n` signed coefficients from the discrete Gaussian with deviation `sigma`.
pub fn sample_gaussian_coeffs<R: Rng>(n: usize, sigma: f64, rng: &mut R) -> Vec<i64> {
    let sampler = GaussianSampler::new(sigma);
    (0..n).map(|_| sampler.sample(rng)).collect()
}
