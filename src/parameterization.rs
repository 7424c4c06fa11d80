//! Mapping between real parameter vectors and Slater determinants.

use num_complex::Complex64;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{FmdError, Result};
use crate::gaussian::{CVec3, Gaussian, GradSlaterDet, Isospin};
use crate::slater::SlaterDet;

/// Real parameters per Gaussian:
/// [Re a, Im a, Re b₀, Im b₀, Re b₁, Im b₁, Re b₂, Im b₂, Re χ₀, Im χ₀, Re χ₁, Im χ₁]
pub const PARAMS_PER_GAUSSIAN: usize = 12;

/// Smallest admissible Re(a) in fm².
pub const MIN_WIDTH: f64 = 0.05;

/// A way of describing a Slater determinant by real numbers.
pub trait Parameterization: Send + Sync {
    fn name(&self) -> &str;

    fn num_params(&self) -> usize;

    fn to_slater_det(&self, params: &[f64]) -> Result<SlaterDet>;

    fn from_slater_det(&self, det: &SlaterDet) -> Vec<f64>;

    /// Gradient of a real function of the determinant with respect to the
    /// real parameters, from its gradient in the conjugated complex ones.
    fn real_gradient(&self, grad: &GradSlaterDet) -> Vec<f64>;

    /// Whether `params` describe a usable state.
    fn is_admissible(&self, _params: &[f64]) -> bool {
        true
    }
}

/// Every Gaussian parameter is free, isospins are fixed.
#[derive(Debug, Clone)]
pub struct FmdParameterization {
    name: String,
    isospins: Vec<Isospin>,
}

impl FmdParameterization {
    /// Parameterization with the name and isospins of `template`.
    pub fn new(template: &SlaterDet) -> Self {
        Self {
            name: template.name.clone(),
            isospins: template.isospins(),
        }
    }
}

impl Parameterization for FmdParameterization {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_params(&self) -> usize {
        PARAMS_PER_GAUSSIAN * self.isospins.len()
    }

    fn to_slater_det(&self, params: &[f64]) -> Result<SlaterDet> {
        if params.len() != self.num_params() {
            return Err(FmdError::ParameterMismatch {
                expected: self.num_params(),
                found: params.len(),
            });
        }
        let gaussians = params
            .chunks_exact(PARAMS_PER_GAUSSIAN)
            .zip(&self.isospins)
            .map(|(x, &xi)| {
                let z = |i: usize| Complex64::new(x[i], x[i + 1]);
                Gaussian::new(xi, [z(8), z(10)], z(0), CVec3::new(z(2), z(4), z(6)))
            })
            .collect();
        Ok(SlaterDet::new(self.name.clone(), gaussians))
    }

    fn from_slater_det(&self, det: &SlaterDet) -> Vec<f64> {
        let mut params = Vec::with_capacity(PARAMS_PER_GAUSSIAN * det.len());
        for g in &det.gaussians {
            let zs = [g.a, g.b[0], g.b[1], g.b[2], g.chi[0], g.chi[1]];
            for z in zs {
                params.push(z.re);
                params.push(z.im);
            }
        }
        params
    }

    fn real_gradient(&self, grad: &GradSlaterDet) -> Vec<f64> {
        let mut out = Vec::with_capacity(PARAMS_PER_GAUSSIAN * grad.len());
        for g in &grad.gradient {
            let zs = [g.a, g.b[0], g.b[1], g.b[2], g.chi[0], g.chi[1]];
            for z in zs {
                out.push(2.0 * z.re);
                out.push(2.0 * z.im);
            }
        }
        out
    }

    fn is_admissible(&self, params: &[f64]) -> bool {
        params.iter().all(|x| x.is_finite())
            && params
                .chunks_exact(PARAMS_PER_GAUSSIAN)
                .all(|x| x[0] > MIN_WIDTH)
    }
}

/// Add Gaussian noise of width `magnitude` to every parameter.
pub fn shake<R: Rng + ?Sized>(params: &mut [f64], magnitude: f64, rng: &mut R) -> Result<()> {
    if !(magnitude.is_finite() && magnitude >= 0.0) {
        return Err(FmdError::input(
            "shake",
            format!("magnitude must be finite and non-negative, got {magnitude}"),
        ));
    }
    let normal = Normal::new(0.0, magnitude)
        .map_err(|e| FmdError::input("shake", format!("invalid magnitude {magnitude}: {e}")))?;
    for x in params.iter_mut() {
        *x += normal.sample(rng);
    }
    Ok(())
}
