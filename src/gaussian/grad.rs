//! Gradients with respect to the complex conjugated bra parameters.

use num_complex::Complex64;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use super::gaussian::{CVec3, Gaussian};

/// ∂/∂(a*, b*, χ*) of some quantity, for a single Gaussian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradGaussian {
    pub a: Complex64,
    pub b: CVec3,
    pub chi: [Complex64; 2],
}

impl GradGaussian {
    pub fn new(a: Complex64, b: CVec3, chi: [Complex64; 2]) -> Self {
        Self { a, b, chi }
    }

    pub fn zero() -> Self {
        let z = Complex64::new(0.0, 0.0);
        Self {
            a: z,
            b: CVec3::zeros(),
            chi: [z, z],
        }
    }

    /// Gradient of a spin-independent quantity.
    pub fn spatial(a: Complex64, b: CVec3) -> Self {
        let z = Complex64::new(0.0, 0.0);
        Self { a, b, chi: [z, z] }
    }

    /// Largest modulus over all components.
    pub fn max_norm(&self) -> f64 {
        let mut m = self.a.norm();
        for k in 0..3 {
            m = m.max(self.b[k].norm());
        }
        m.max(self.chi[0].norm()).max(self.chi[1].norm())
    }
}

impl Default for GradGaussian {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for GradGaussian {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            a: self.a + rhs.a,
            b: self.b + rhs.b,
            chi: [self.chi[0] + rhs.chi[0], self.chi[1] + rhs.chi[1]],
        }
    }
}

impl AddAssign for GradGaussian {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for GradGaussian {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl SubAssign for GradGaussian {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for GradGaussian {
    type Output = Self;
    fn neg(self) -> Self {
        self * Complex64::new(-1.0, 0.0)
    }
}

impl Mul<Complex64> for GradGaussian {
    type Output = Self;
    fn mul(self, rhs: Complex64) -> Self {
        Self {
            a: self.a * rhs,
            b: self.b * rhs,
            chi: [self.chi[0] * rhs, self.chi[1] * rhs],
        }
    }
}

impl Mul<f64> for GradGaussian {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        self * Complex64::from(rhs)
    }
}

/// Value of a Slater determinant observable together with its gradient,
/// one [`GradGaussian`] per wave packet.
#[derive(Debug, Clone, PartialEq)]
pub struct GradSlaterDet {
    pub value: Complex64,
    pub gradient: Vec<GradGaussian>,
}

impl GradSlaterDet {
    pub fn zeros(n: usize) -> Self {
        Self {
            value: Complex64::new(0.0, 0.0),
            gradient: vec![GradGaussian::zero(); n],
        }
    }

    pub fn len(&self) -> usize {
        self.gradient.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gradient.is_empty()
    }

    /// Largest modulus over all gradient components.
    pub fn max_norm(&self) -> f64 {
        self.gradient
            .iter()
            .map(GradGaussian::max_norm)
            .fold(0.0, f64::max)
    }
}

impl Add for GradSlaterDet {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for GradSlaterDet {
    fn add_assign(&mut self, rhs: Self) {
        self.value += rhs.value;
        for (g, h) in self.gradient.iter_mut().zip(rhs.gradient) {
            *g += h;
        }
    }
}

impl Mul<Complex64> for GradSlaterDet {
    type Output = Self;
    fn mul(self, rhs: Complex64) -> Self {
        Self {
            value: self.value * rhs,
            gradient: self.gradient.into_iter().map(|g| g * rhs).collect(),
        }
    }
}

impl Mul<f64> for GradSlaterDet {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        self * Complex64::from(rhs)
    }
}

/// Central-difference derivative of `f` with respect to the conjugated bra
/// parameters of `g`.
///
/// `f` must depend holomorphically on (a*, b*, χ*), so a real shift of the
/// parameter is enough.
pub fn numerical_bra_gradient<F>(g: &Gaussian, h: f64, f: F) -> GradGaussian
where
    F: Fn(&Gaussian) -> Complex64,
{
    let diff = |shift: &dyn Fn(&mut Gaussian, f64)| {
        let mut fwd = g.clone();
        let mut bwd = g.clone();
        shift(&mut fwd, h);
        shift(&mut bwd, -h);
        (f(&fwd) - f(&bwd)) / (2.0 * h)
    };

    let mut grad = GradGaussian::zero();
    grad.a = diff(&|q, d| q.a += d);
    for k in 0..3 {
        grad.b[k] = diff(&|q, d| q.b[k] += d);
    }
    for s in 0..2 {
        grad.chi[s] = diff(&|q, d| q.chi[s] += d);
    }
    grad
}
