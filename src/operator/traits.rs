//! Operator traits.
//!
//! Operators are given by their kernels: matrix elements between single
//! Gaussians (one-body) or between direct products of two Gaussians
//! (two-body, not antisymmetrised). The engine contracts them with the
//! natural orbitals of a determinant.
//!
//! Kernels include the overlap factors of every particle they act on, so a
//! one-body kernel for the unit operator is just `x.q`.

use nalgebra::SVector;
use num_complex::Complex64;

use crate::gaussian::{Gaussian, GaussianAux, GradGaussian, GradGaussianAux};

/// Multi-component operator value.
pub type OpValue<const D: usize> = SVector<Complex64, D>;

/// One-body operator with `D` components.
pub trait OneBodyOperator<const D: usize> {
    /// Kernel ⟨q₁|o|q₂⟩.
    fn evaluate(&self, g1: &Gaussian, g2: &Gaussian, x: &GaussianAux) -> OpValue<D>;

    /// True if the kernel vanishes whenever the two Gaussians differ in
    /// isospin, so the engine may skip such pairs. Operators opt in.
    fn isospin_diagonal(&self) -> bool {
        false
    }
}

/// Two-body operator with `D` components.
///
/// The kernel ⟨q₁ q₂|v|q₃ q₄⟩ must be symmetric under exchange of the two
/// particles (1↔2 together with 3↔4). `x13` couples q₁ with q₃ and `x24`
/// couples q₂ with q₄.
pub trait TwoBodyOperator<const D: usize> {
    fn evaluate(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        g3: &Gaussian,
        g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
    ) -> OpValue<D>;

    /// True if the kernel vanishes unless both particles keep their
    /// isospin. Operators opt in.
    fn isospin_diagonal(&self) -> bool {
        false
    }
}

/// One-body kernel with its derivative with respect to the conjugated
/// parameters of the bra Gaussian.
pub trait GradOneBodyOperator: OneBodyOperator<1> {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        x: &GaussianAux,
        dx: &GradGaussianAux,
    ) -> (Complex64, GradGaussian);

    /// Central-difference bra derivative of the kernel, for testing.
    fn numerical_gradient(&self, g1: &Gaussian, g2: &Gaussian, h: f64) -> GradGaussian {
        crate::gaussian::numerical_bra_gradient(g1, h, |g| {
            let x = GaussianAux::new(g, g2);
            self.evaluate(g, g2, &x)[0]
        })
    }
}

/// Two-body kernel with its derivative with respect to the conjugated
/// parameters of the first bra Gaussian. The derivative with respect to the
/// second one follows from particle exchange symmetry.
pub trait GradTwoBodyOperator: TwoBodyOperator<1> {
    #[allow(clippy::too_many_arguments)]
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        g3: &Gaussian,
        g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
        dx13: &GradGaussianAux,
    ) -> (Complex64, GradGaussian);

    /// Central-difference derivative with respect to the first bra Gaussian.
    fn numerical_gradient(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        g3: &Gaussian,
        g4: &Gaussian,
        h: f64,
    ) -> GradGaussian {
        let x24 = GaussianAux::new(g2, g4);
        crate::gaussian::numerical_bra_gradient(g1, h, |g| {
            let x13 = GaussianAux::new(g, g3);
            self.evaluate(g, g2, g3, g4, &x13, &x24)[0]
        })
    }
}
