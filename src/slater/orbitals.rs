//! Pair tables and natural orbitals of a Slater determinant.
//!
//! For a bra ⟨B| and a ket |K⟩ with A Gaussians each, the overlap matrix is
//! n_kl = ⟨q_k|q_l⟩ (bra packet k, ket packet l). Its inverse o = n⁻¹ weights
//! every one- and two-body kernel, and det n = ⟨B|K⟩.

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::error::{FmdError, Result};
use crate::gaussian::{GaussianAux, GradGaussianAux};

use super::slater_det::SlaterDet;

/// Overlap matrices with a Frobenius condition number above this are
/// rejected as linearly dependent.
pub const MAX_CONDITION: f64 = 1e12;

/// All pair quantities of a (bra, ket) pair of determinants plus the
/// inverse and determinant of their overlap matrix.
#[derive(Debug, Clone)]
pub struct SlaterDetAux {
    dim: usize,
    pairs: Vec<GaussianAux>,
    overlap: DMatrix<Complex64>,
    inverse: DMatrix<Complex64>,
    determinant: Complex64,
}

impl SlaterDetAux {
    /// Diagonal case ⟨Q|Q⟩.
    pub fn new(det: &SlaterDet) -> Result<Self> {
        Self::cross(det, det)
    }

    /// Off-diagonal case ⟨B|K⟩.
    pub fn cross(bra: &SlaterDet, ket: &SlaterDet) -> Result<Self> {
        if bra.len() != ket.len() {
            return Err(FmdError::ParameterMismatch {
                expected: bra.len(),
                found: ket.len(),
            });
        }
        let dim = bra.len();
        let mut pairs = Vec::with_capacity(dim * dim);
        for gk in &bra.gaussians {
            for gl in &ket.gaussians {
                pairs.push(GaussianAux::new(gk, gl));
            }
        }
        let overlap = DMatrix::from_fn(dim, dim, |k, l| pairs[k * dim + l].q);

        let name = if bra.name == ket.name {
            bra.name.clone()
        } else {
            format!("{}|{}", bra.name, ket.name)
        };
        let (inverse, determinant) = invert(&name, &overlap)?;

        Ok(Self {
            dim,
            pairs,
            overlap,
            inverse,
            determinant,
        })
    }

    /// Number of Gaussians.
    pub fn len(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.dim == 0
    }

    pub fn pair(&self, k: usize, l: usize) -> &GaussianAux {
        &self.pairs[k * self.dim + l]
    }

    pub fn overlap(&self) -> &DMatrix<Complex64> {
        &self.overlap
    }

    pub fn inverse(&self) -> &DMatrix<Complex64> {
        &self.inverse
    }

    /// det n = ⟨B|K⟩
    pub fn determinant(&self) -> Complex64 {
        self.determinant
    }
}

fn invert(name: &str, overlap: &DMatrix<Complex64>) -> Result<(DMatrix<Complex64>, Complex64)> {
    let dim = overlap.nrows();
    if dim == 0 {
        return Ok((DMatrix::zeros(0, 0), Complex64::new(1.0, 0.0)));
    }

    let lu = overlap.clone().lu();
    let determinant = lu.determinant();
    let inverse = lu
        .try_inverse()
        .ok_or_else(|| degenerate(name, overlap, f64::INFINITY))?;

    let condition = overlap.norm() * inverse.norm();
    if !condition.is_finite() || condition > MAX_CONDITION {
        return Err(degenerate(name, overlap, condition));
    }
    Ok((inverse, determinant))
}

fn degenerate(name: &str, overlap: &DMatrix<Complex64>, condition: f64) -> FmdError {
    let dim = overlap.nrows();
    let mut pair = (0, 0);
    let mut worst = -1.0;
    for k in 0..dim {
        for l in (k + 1)..dim {
            let norm = (overlap[(k, k)].norm() * overlap[(l, l)].norm()).sqrt();
            let c = if norm > 0.0 {
                overlap[(k, l)].norm() / norm
            } else {
                f64::INFINITY
            };
            if c > worst {
                worst = c;
                pair = (k, l);
            }
        }
    }
    FmdError::DegenerateState {
        name: name.to_string(),
        condition,
        pair,
    }
}

/// Bra derivatives of all pair quantities.
#[derive(Debug, Clone)]
pub struct GradSlaterDetAux {
    dim: usize,
    pairs: Vec<GradGaussianAux>,
}

impl GradSlaterDetAux {
    pub fn new(bra: &SlaterDet, ket: &SlaterDet, aux: &SlaterDetAux) -> Self {
        let dim = aux.len();
        let mut pairs = Vec::with_capacity(dim * dim);
        for (k, gk) in bra.gaussians.iter().enumerate() {
            for (l, gl) in ket.gaussians.iter().enumerate() {
                pairs.push(GradGaussianAux::new(gk, gl, aux.pair(k, l)));
            }
        }
        Self { dim, pairs }
    }

    pub fn diagonal(det: &SlaterDet, aux: &SlaterDetAux) -> Self {
        Self::new(det, det, aux)
    }

    pub fn pair(&self, k: usize, l: usize) -> &GradGaussianAux {
        &self.pairs[k * self.dim + l]
    }
}
