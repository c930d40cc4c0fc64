pub mod gaussian;
pub mod uniform;

pub use gaussian::{GaussianSampler, sample_gaussian_coeffs};
pub use uniform::{sample_uniform_poly, sample_uniform_rns, sample_ternary_coeffs, sample_binary_coeffs};
