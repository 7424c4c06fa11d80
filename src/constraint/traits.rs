//! Constraint traits.
//!
//! A constraint is the equality c(Q) = value(Q) - target = 0 on a Slater
//! determinant, with the analytic gradient of `value`.

use num_complex::Complex64;

use crate::gaussian::GradSlaterDet;
use crate::slater::{GradSlaterDetAux, SlaterDet, SlaterDetAux};

pub trait Constraint: Send + Sync {
    /// Short name used in logs and output files.
    fn label(&self) -> &str;

    /// Target in internal units (squared quantities where `value` is squared).
    fn target(&self) -> f64;

    fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64;

    /// Gradient of `value`; the `value` field of the result is `value`.
    fn gradient(&self, det: &SlaterDet, aux: &SlaterDetAux, daux: &GradSlaterDetAux)
        -> GradSlaterDet;

    /// Transform from internal units to the reported quantity, e.g. r² → r.
    fn output(&self, value: f64) -> f64 {
        value
    }

    fn residual(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        self.value(det, aux) - self.target()
    }
}

/// Constraint on an off-diagonal ratio ⟨B|O|K⟩ / ⟨B|K⟩ with a fixed ket.
pub trait OffDiagonalConstraint: Send + Sync {
    fn label(&self) -> &str;

    fn target(&self) -> f64;

    fn value(&self, bra: &SlaterDet, ket: &SlaterDet, aux: &SlaterDetAux) -> Complex64;

    /// Bra gradient of `value`.
    fn gradient(
        &self,
        bra: &SlaterDet,
        ket: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet;

    fn output(&self, value: f64) -> f64 {
        value
    }
}
