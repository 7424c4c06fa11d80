//! Total isospin squared.
//!
//! T² = Σ_i t_i² + Σ_{i≠j} t_i·t_j with t = τ/2 and protons as isospin up.
//! The τ₊τ₋ part of t_i·t_j turns a proton into a neutron and back, so the
//! two-body kernel couples packets of different isospin.

use num_complex::Complex64;

use crate::gaussian::{CVec3, Gaussian, GaussianAux, GradGaussian, GradGaussianAux, GradSlaterDet, Isospin};
use crate::operator::{
    grad_ob_me_od, grad_tb_me_od, ob_me_od, tb_me_od, GradOneBodyOperator, GradTwoBodyOperator,
    OneBodyOperator, OpValue, TwoBodyOperator,
};
use crate::slater::{GradSlaterDetAux, SlaterDet, SlaterDetAux};

const I: Complex64 = Complex64::new(0.0, 1.0);

/// ⟨ξ₁|τ|ξ₂⟩
fn tau(xi1: Isospin, xi2: Isospin) -> CVec3 {
    let one = Complex64::new(1.0, 0.0);
    let zero = Complex64::new(0.0, 0.0);
    match (xi1, xi2) {
        (Isospin::Proton, Isospin::Proton) => CVec3::new(zero, zero, one),
        (Isospin::Neutron, Isospin::Neutron) => CVec3::new(zero, zero, -one),
        (Isospin::Proton, Isospin::Neutron) => CVec3::new(one, -I, zero),
        (Isospin::Neutron, Isospin::Proton) => CVec3::new(one, I, zero),
    }
}

/// ⟨ξ₁ ξ₂|t₁·t₂|ξ₃ ξ₄⟩
fn tt(g1: &Gaussian, g2: &Gaussian, g3: &Gaussian, g4: &Gaussian) -> Complex64 {
    tau(g1.xi, g3.xi).dot(&tau(g2.xi, g4.xi)) * 0.25
}

/// T²; it commutes with the centre of mass, so no frame is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalIsospin;

impl TotalIsospin {
    pub fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        self.value_od(det, det, aux).re
    }

    pub fn value_od(&self, bra: &SlaterDet, ket: &SlaterDet, aux: &SlaterDetAux) -> Complex64 {
        ob_me_od::<1, _>(bra, ket, aux, self)[0] + tb_me_od::<1, _>(bra, ket, aux, self)[0]
    }

    pub fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        self.gradient_od(det, det, aux, daux)
    }

    pub fn gradient_od(
        &self,
        bra: &SlaterDet,
        ket: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        grad_ob_me_od(bra, ket, aux, daux, self) + grad_tb_me_od(bra, ket, aux, daux, self)
    }
}

impl OneBodyOperator<1> for TotalIsospin {
    fn evaluate(&self, _g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<1> {
        OpValue::<1>::new(x.q * 0.75)
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradOneBodyOperator for TotalIsospin {
    fn evaluate_gradient(
        &self,
        _g1: &Gaussian,
        _g2: &Gaussian,
        x: &GaussianAux,
        dx: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        (x.q * 0.75, dx.dq * 0.75)
    }
}

impl TwoBodyOperator<1> for TotalIsospin {
    fn evaluate(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        g3: &Gaussian,
        g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
    ) -> OpValue<1> {
        OpValue::<1>::new(tt(g1, g2, g3, g4) * x13.r * x13.s * x24.r * x24.s)
    }
}

impl GradTwoBodyOperator for TotalIsospin {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        g3: &Gaussian,
        g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
        dx13: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let f = tt(g1, g2, g3, g4) * x24.r * x24.s;
        let grad = GradGaussian::new(
            dx13.dr.a * x13.s,
            dx13.dr.b * x13.s,
            [x13.r * dx13.ds[0], x13.r * dx13.ds[1]],
        ) * f;
        (f * x13.r * x13.s, grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slater::test_dets::{assert_gradient, four_nucleons, proton_neutron};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn pair(xi: Isospin, chi: [Complex64; 2]) -> SlaterDet {
        let up = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        let g = |xi, chi| {
            Gaussian::from_phase_space(
                xi,
                chi,
                Complex64::new(2.0, 0.0),
                Vector3::new(0.1, 0.2, -0.3),
                Vector3::zeros(),
            )
        };
        SlaterDet::new("pair", vec![g(Isospin::Proton, up), g(xi, chi)])
    }

    #[test]
    fn test_isospin_of_pairs() {
        let up = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        let down = [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)];

        // same orbit and spin: antisymmetric in isospin, T = 0
        let det = pair(Isospin::Neutron, up);
        let aux = SlaterDetAux::new(&det).unwrap();
        assert_relative_eq!(TotalIsospin.value(&det, &aux), 0.0, epsilon = 1e-10);

        // two protons: T = 1
        let det = pair(Isospin::Proton, down);
        let aux = SlaterDetAux::new(&det).unwrap();
        assert_relative_eq!(TotalIsospin.value(&det, &aux), 2.0, epsilon = 1e-10);

        // p↑ n↓ in one orbit: equal mix of T = 0 and T = 1
        let det = pair(Isospin::Neutron, down);
        let aux = SlaterDetAux::new(&det).unwrap();
        assert_relative_eq!(TotalIsospin.value(&det, &aux), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_two_body_part_mixes_isospin() {
        assert!(!TwoBodyOperator::<1>::isospin_diagonal(&TotalIsospin));
        let det = four_nucleons();
        let (p, n) = (&det.gaussians[0], &det.gaussians[2]);
        let x13 = GaussianAux::new(p, n);
        let x24 = GaussianAux::new(n, p);
        assert_eq!(x13.t, 0.0);
        let v = TwoBodyOperator::<1>::evaluate(&TotalIsospin, p, n, n, p, &x13, &x24)[0];
        assert!(v.norm() > 0.0);
    }

    #[test]
    fn test_kernel_gradients() {
        let det = four_nucleons();
        let (g1, g2, g3, g4) = (
            &det.gaussians[0],
            &det.gaussians[2],
            &det.gaussians[3],
            &det.gaussians[1],
        );
        let x13 = GaussianAux::new(g1, g3);
        let x24 = GaussianAux::new(g2, g4);
        let dx13 = GradGaussianAux::new(g1, g3, &x13);
        let (_, grad) =
            GradTwoBodyOperator::evaluate_gradient(&TotalIsospin, g1, g2, g3, g4, &x13, &x24, &dx13);
        let num = GradTwoBodyOperator::numerical_gradient(&TotalIsospin, g1, g2, g3, g4, 1e-5);
        assert_relative_eq!((grad - num).max_norm(), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_isospin_gradient() {
        for det in [four_nucleons(), proton_neutron()] {
            assert_gradient(&det, 1e-5, 1e-6, |d| {
                let aux = SlaterDetAux::new(d)?;
                let daux = GradSlaterDetAux::diagonal(d, &aux);
                Ok(TotalIsospin.gradient(d, &aux, &daux))
            });
        }
    }
}
