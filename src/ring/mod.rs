pub mod modular;
pub mod ntt;
pub mod poly;
pub mod rns;

pub use modular::{barrett_reduce, mod_mul, mod_add, mod_sub, mod_neg, reduce_signed, is_prime};
pub use ntt::NttPoly;
pub use poly::CoeffPoly;
pub use rns::{RnsBasis, RnsPoly};
