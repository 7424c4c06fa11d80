//! Centre of mass of a Slater determinant.
//!
//! X = Σ m_i x_i / M and V = Σ p_i / M as one-body operators. Observables
//! measured relative to (X, V) depend on the state through them as well; the
//! gradient engine treats that dependence with the component operators below.

use nalgebra::Vector3;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::gaussian::{complexify, CVec3, Gaussian, GaussianAux, GradGaussian, GradGaussianAux};
use crate::operator::{ob_me, GradOneBodyOperator, OneBodyOperator, OpValue};
use crate::physics::mass;

use super::orbitals::SlaterDetAux;
use super::slater_det::SlaterDet;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct CenterOfMass {
    /// fm
    pub position: Vector3<f64>,
    /// P / M, dimensionless
    pub velocity: Vector3<f64>,
}

impl CenterOfMass {
    /// Fixed frame at rest in the origin.
    pub fn origin() -> Self {
        Self::default()
    }

    pub fn of(det: &SlaterDet, aux: &SlaterDetAux) -> Self {
        let op = CenterOfMassOperator::new(det.total_mass());
        let v: OpValue<6> = ob_me(det, aux, &op);
        Self {
            position: Vector3::new(v[0].re, v[1].re, v[2].re),
            velocity: Vector3::new(v[3].re, v[4].re, v[5].re),
        }
    }

    pub fn momentum(&self, total_mass: f64) -> Vector3<f64> {
        self.velocity * total_mass
    }

    /// ρ - X
    pub fn relative_position(&self, rho: &CVec3) -> CVec3 {
        rho - complexify(&self.position)
    }

    /// π - m V
    pub fn relative_momentum(&self, pi: &CVec3, m: f64) -> CVec3 {
        pi - complexify(&(self.velocity * m))
    }
}

/// (X, V) as a six component one-body operator.
#[derive(Debug, Clone, Copy)]
pub struct CenterOfMassOperator {
    total_mass: f64,
}

impl CenterOfMassOperator {
    pub fn new(total_mass: f64) -> Self {
        Self { total_mass }
    }
}

impl OneBodyOperator<6> for CenterOfMassOperator {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<6> {
        let pos = x.rho * (x.q * (mass(g1.xi) / self.total_mass));
        let vel = x.pi * (x.q / self.total_mass);
        OpValue::<6>::from_column_slice(&[pos[0], pos[1], pos[2], vel[0], vel[1], vel[2]])
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

/// Single component of [`CenterOfMassOperator`]: 0..3 position, 3..6 velocity.
#[derive(Debug, Clone, Copy)]
pub struct CenterOfMassComponent {
    index: usize,
    total_mass: f64,
}

impl CenterOfMassComponent {
    pub fn new(index: usize, total_mass: f64) -> Self {
        Self { index, total_mass }
    }
}

impl OneBodyOperator<1> for CenterOfMassComponent {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<1> {
        let v = if self.index < 3 {
            x.rho[self.index] * x.q * (mass(g1.xi) / self.total_mass)
        } else {
            x.pi[self.index - 3] * x.q / self.total_mass
        };
        OpValue::<1>::new(v)
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradOneBodyOperator for CenterOfMassComponent {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        _g2: &Gaussian,
        x: &GaussianAux,
        dx: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let (v, dv, dvb, scale) = if self.index < 3 {
            let k = self.index;
            (x.rho[k], dx.drho.a[k], dx.drho.b, mass(g1.xi) / self.total_mass)
        } else {
            let k = self.index - 3;
            (x.pi[k], dx.dpi.a[k], dx.dpi.b, 1.0 / self.total_mass)
        };
        let k = self.index % 3;

        let mut b = dx.dq.b * v;
        b[k] += dvb * x.q;
        let grad = GradGaussian::new(
            dv * x.q + v * dx.dq.a,
            b,
            [v * dx.dq.chi[0], v * dx.dq.chi[1]],
        ) * scale;
        (v * x.q * scale, grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::grad_ob_me;
    use crate::slater::orbitals::GradSlaterDetAux;
    use crate::slater::test_dets::{assert_gradient, four_nucleons};
    use approx::assert_relative_eq;

    #[test]
    fn test_single_packet_center() {
        let r = Vector3::new(0.5, -1.0, 2.0);
        let p = Vector3::new(0.1, 0.2, -0.3);
        let g = Gaussian::from_phase_space(
            crate::gaussian::Isospin::Neutron,
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            Complex64::new(2.0, 0.5),
            r,
            p,
        );
        let det = SlaterDet::new("n", vec![g]);
        let aux = SlaterDetAux::new(&det).unwrap();
        let cm = CenterOfMass::of(&det, &aux);
        let m = det.total_mass();
        for k in 0..3 {
            assert_relative_eq!(cm.position[k], r[k], epsilon = 1e-12);
            assert_relative_eq!(cm.momentum(m)[k], p[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_component_gradients() {
        let det = four_nucleons();
        for index in 0..6 {
            let op = CenterOfMassComponent::new(index, det.total_mass());
            assert_gradient(&det, 1e-5, 1e-6, |d| {
                let aux = SlaterDetAux::new(d)?;
                let daux = GradSlaterDetAux::diagonal(d, &aux);
                Ok(grad_ob_me(d, &aux, &daux, &op))
            });
        }
    }
}
