//! Pair quantities between a bra and a ket Gaussian and their derivatives
//! with respect to the (complex conjugated) bra parameters.
//!
//! With A = a₁*, B = b₁*:
//!
//!   λ = 1/(A + a₂),  α = A a₂ λ,  ρ = (a₂ B + A b₂) λ,  π = i λ (B - b₂)
//!   R = (2π α)^{3/2} exp(-λ (B - b₂)² / 2)
//!
//! so that ⟨q₁|x|q₂⟩ = ρ R and ⟨q₁|p|q₂⟩ = π R for the spatial part.

use num_complex::Complex64;
use std::f64::consts::PI;

use super::gaussian::{CVec3, Gaussian, I};
use super::grad::GradGaussian;

/// Overlap quantities of one bra/ket pair of Gaussians.
#[derive(Debug, Clone)]
pub struct GaussianAux {
    pub lambda: Complex64,
    pub alpha: Complex64,
    pub rho: CVec3,
    pub pi: CVec3,
    /// Spatial overlap R
    pub r: Complex64,
    /// Spin overlap S = χ₁* · χ₂
    pub s: Complex64,
    /// Spin matrix elements ⟨χ₁|σ|χ₂⟩
    pub sig: CVec3,
    /// Isospin overlap, exactly 0 or 1
    pub t: f64,
    /// Full overlap Q = R S T
    pub q: Complex64,
}

impl GaussianAux {
    pub fn new(g1: &Gaussian, g2: &Gaussian) -> Self {
        let a1 = g1.a.conj();
        let b1 = g1.b.map(|c| c.conj());

        let lambda = (a1 + g2.a).inv();
        let alpha = a1 * g2.a * lambda;
        let rho = (b1 * g2.a + g2.b * a1) * lambda;
        let db = b1 - g2.b;
        let pi = db * (I * lambda);
        let r = (2.0 * PI * alpha).powf(1.5) * (-0.5 * lambda * db.dot(&db)).exp();

        let c = [g1.chi[0].conj(), g1.chi[1].conj()];
        let d = g2.chi;
        let s = c[0] * d[0] + c[1] * d[1];
        let sig = CVec3::new(
            c[0] * d[1] + c[1] * d[0],
            I * (c[1] * d[0] - c[0] * d[1]),
            c[0] * d[0] - c[1] * d[1],
        );

        let t = if g1.xi == g2.xi { 1.0 } else { 0.0 };
        let q = r * s * t;

        Self {
            lambda,
            alpha,
            rho,
            pi,
            r,
            s,
            sig,
            t,
            q,
        }
    }

    /// ⟨q₁|x × p|q₂⟩ / R
    pub fn orbital(&self) -> CVec3 {
        self.rho.cross(&self.pi)
    }
}

/// Derivative of a vector pair quantity v: ∂v/∂A = `a`, ∂v_k/∂B_l = δ_kl `b`.
#[derive(Debug, Clone, Copy)]
pub struct GradVector {
    pub a: CVec3,
    pub b: Complex64,
}

/// Derivative of a scalar pair quantity with respect to A and B.
#[derive(Debug, Clone, Copy)]
pub struct GradScalar {
    pub a: Complex64,
    pub b: CVec3,
}

/// Bra derivatives of [`GaussianAux`].
#[derive(Debug, Clone)]
pub struct GradGaussianAux {
    pub dlambda: Complex64,
    pub dalpha: Complex64,
    pub drho: GradVector,
    pub dpi: GradVector,
    pub dr: GradScalar,
    /// ∂S/∂χ₁*[s]
    pub ds: [Complex64; 2],
    /// ∂sig/∂χ₁*[s]
    pub dsig: [CVec3; 2],
    pub dq: GradGaussian,
}

impl GradGaussianAux {
    pub fn new(_g1: &Gaussian, g2: &Gaussian, x: &GaussianAux) -> Self {
        let a2 = g2.a;
        let lambda = x.lambda;

        let dlambda = -lambda * lambda;
        let dalpha = (a2 * lambda) * (a2 * lambda);
        let drho = GradVector {
            a: (g2.b - x.rho) * lambda,
            b: a2 * lambda,
        };
        let dpi = GradVector {
            a: x.pi * (-lambda),
            b: I * lambda,
        };
        let dr = GradScalar {
            a: x.r * (1.5 * dalpha / x.alpha - 0.5 * x.pi.dot(&x.pi)),
            b: x.pi * (I * x.r),
        };

        let d = g2.chi;
        let ds = d;
        let dsig = [
            CVec3::new(d[1], -I * d[1], d[0]),
            CVec3::new(d[0], I * d[0], -d[1]),
        ];

        let st = x.s * x.t;
        let rt = x.r * x.t;
        let dq = GradGaussian::new(dr.a * st, dr.b * st, [ds[0] * rt, ds[1] * rt]);

        Self {
            dlambda,
            dalpha,
            drho,
            dpi,
            dr,
            ds,
            dsig,
            dq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::{numerical_bra_gradient, Isospin};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn pair() -> (Gaussian, Gaussian) {
        let g1 = Gaussian::new(
            Isospin::Proton,
            [c(0.8, 0.1), c(-0.3, 0.5)],
            c(1.9, 0.3),
            CVec3::new(c(0.4, 0.2), c(-0.7, 0.1), c(0.2, -0.5)),
        );
        let g2 = Gaussian::new(
            Isospin::Proton,
            [c(0.2, -0.6), c(0.9, 0.0)],
            c(2.4, -0.2),
            CVec3::new(c(-0.1, 0.3), c(0.5, 0.0), c(1.0, 0.4)),
        );
        (g1, g2)
    }

    #[test]
    fn test_norm_of_single_packet() {
        // ⟨q|q⟩ = (π a)^{3/2} |χ|² for a real width centred at rest
        let a = 1.6;
        let g = Gaussian::from_phase_space(
            Isospin::Neutron,
            [c(0.6, 0.0), c(0.0, 0.8)],
            c(a, 0.0),
            Vector3::new(1.0, 2.0, -1.0),
            Vector3::zeros(),
        );
        let x = GaussianAux::new(&g, &g);
        assert_relative_eq!(x.q.re, (PI * a).powf(1.5), epsilon = 1e-12);
        assert_relative_eq!(x.q.im, 0.0, epsilon = 1e-12);
        assert_relative_eq!(x.rho[1].re, 2.0, epsilon = 1e-12);
        assert_relative_eq!(x.sig[2].re, 0.36 - 0.64, epsilon = 1e-12);
    }

    #[test]
    fn test_isospin_mismatch_vanishes() {
        let (g1, mut g2) = pair();
        g2.xi = Isospin::Neutron;
        let x = GaussianAux::new(&g1, &g2);
        assert_eq!(x.t, 0.0);
        assert_eq!(x.q, c(0.0, 0.0));
    }

    #[test]
    fn test_overlap_derivative() {
        let (g1, g2) = pair();
        let x = GaussianAux::new(&g1, &g2);
        let dx = GradGaussianAux::new(&g1, &g2, &x);
        let num = numerical_bra_gradient(&g1, 1e-5, |g| GaussianAux::new(g, &g2).q);
        assert_relative_eq!(dx.dq.a.re, num.a.re, epsilon = 1e-6);
        assert_relative_eq!(dx.dq.a.im, num.a.im, epsilon = 1e-6);
        for k in 0..3 {
            assert_relative_eq!(dx.dq.b[k].re, num.b[k].re, epsilon = 1e-6);
            assert_relative_eq!(dx.dq.b[k].im, num.b[k].im, epsilon = 1e-6);
        }
        for s in 0..2 {
            assert_relative_eq!(dx.dq.chi[s].re, num.chi[s].re, epsilon = 1e-6);
            assert_relative_eq!(dx.dq.chi[s].im, num.chi[s].im, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_rho_and_sigma_derivatives() {
        let (g1, g2) = pair();
        let x = GaussianAux::new(&g1, &g2);
        let dx = GradGaussianAux::new(&g1, &g2, &x);

        let num = numerical_bra_gradient(&g1, 1e-5, |g| GaussianAux::new(g, &g2).rho[1]);
        assert_relative_eq!(dx.drho.a[1].re, num.a.re, epsilon = 1e-7);
        assert_relative_eq!(dx.drho.a[1].im, num.a.im, epsilon = 1e-7);
        assert_relative_eq!(dx.drho.b.re, num.b[1].re, epsilon = 1e-7);
        assert_relative_eq!(num.b[0].norm(), 0.0, epsilon = 1e-7);

        let num = numerical_bra_gradient(&g1, 1e-5, |g| GaussianAux::new(g, &g2).pi[2]);
        assert_relative_eq!(dx.dpi.a[2].re, num.a.re, epsilon = 1e-7);
        assert_relative_eq!(dx.dpi.b.im, num.b[2].im, epsilon = 1e-7);

        let num = numerical_bra_gradient(&g1, 1e-5, |g| GaussianAux::new(g, &g2).sig[1]);
        for s in 0..2 {
            assert_relative_eq!(dx.dsig[s][1].re, num.chi[s].re, epsilon = 1e-7);
            assert_relative_eq!(dx.dsig[s][1].im, num.chi[s].im, epsilon = 1e-7);
        }
    }
}
