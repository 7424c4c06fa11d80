pub mod pair;
pub mod gaussian;
pub mod grad;

pub use pair::{GaussianAux, GradGaussianAux, GradScalar, GradVector};
pub use gaussian::{complexify, CVec3, Gaussian, Isospin, Selection};
pub use grad::{numerical_bra_gradient, GradGaussian, GradSlaterDet};
