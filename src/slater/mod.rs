pub mod center_of_mass;
pub mod orbitals;
pub mod slater_det;

pub use center_of_mass::{CenterOfMass, CenterOfMassComponent, CenterOfMassOperator};
pub use orbitals::{GradSlaterDetAux, SlaterDetAux, MAX_CONDITION};
pub use slater_det::SlaterDet;

/// Determinants shared by the unit tests of several modules.
#[cfg(test)]
pub(crate) mod test_dets {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use num_complex::Complex64;

    use crate::error::Result;
    use crate::gaussian::{CVec3, Gaussian, GradSlaterDet, Isospin};
    use crate::parameterization::{FmdParameterization, Parameterization};

    use super::SlaterDet;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    /// Two protons and two neutrons with complex widths, finite momenta and
    /// mixed spins, away from the origin.
    pub fn four_nucleons() -> SlaterDet {
        SlaterDet::new(
            "test4",
            vec![
                Gaussian::new(
                    Isospin::Proton,
                    [c(0.9, 0.1), c(0.2, -0.3)],
                    c(2.1, 0.3),
                    CVec3::new(c(0.8, 0.2), c(0.3, -0.1), c(0.5, 0.4)),
                ),
                Gaussian::new(
                    Isospin::Proton,
                    [c(-0.1, 0.4), c(0.8, 0.2)],
                    c(1.7, -0.2),
                    CVec3::new(c(-0.9, 0.1), c(0.6, 0.3), c(0.1, -0.2)),
                ),
                Gaussian::new(
                    Isospin::Neutron,
                    [c(0.7, -0.2), c(0.5, 0.5)],
                    c(2.4, 0.1),
                    CVec3::new(c(0.2, -0.3), c(-1.1, 0.2), c(0.7, 0.1)),
                ),
                Gaussian::new(
                    Isospin::Neutron,
                    [c(0.3, 0.3), c(-0.6, 0.4)],
                    c(1.9, 0.2),
                    CVec3::new(c(0.4, 0.4), c(0.9, -0.2), c(-0.8, 0.3)),
                ),
            ],
        )
    }

    /// A proton and a neutron with complex widths, mixed spins and opposite
    /// momenta.
    pub fn proton_neutron() -> SlaterDet {
        SlaterDet::new(
            "pn",
            vec![
                Gaussian::new(
                    Isospin::Proton,
                    [c(0.6, 0.3), c(-0.4, 0.6)],
                    c(1.8, 0.4),
                    CVec3::new(c(0.5, 0.3), c(-0.2, 0.1), c(0.9, -0.2)),
                ),
                Gaussian::new(
                    Isospin::Neutron,
                    [c(0.2, -0.7), c(0.6, 0.3)],
                    c(2.3, -0.3),
                    CVec3::new(c(-0.6, -0.3), c(0.4, 0.2), c(-0.3, 0.2)),
                ),
            ],
        )
    }

    /// Two spin-up protons at rest, 1.5 fm apart along z.
    pub fn two_protons() -> SlaterDet {
        let up = [c(1.0, 0.0), c(0.0, 0.0)];
        SlaterDet::new(
            "pp",
            vec![
                Gaussian::from_phase_space(
                    Isospin::Proton,
                    up,
                    c(2.0, 0.0),
                    Vector3::new(0.0, 0.0, 0.75),
                    Vector3::zeros(),
                ),
                Gaussian::from_phase_space(
                    Isospin::Proton,
                    up,
                    c(2.0, 0.0),
                    Vector3::new(0.0, 0.0, -0.75),
                    Vector3::zeros(),
                ),
            ],
        )
    }

    /// Compare the analytic gradient of a real expectation value with
    /// central differences in the 12 real parameters of every Gaussian.
    pub fn assert_gradient<F>(det: &SlaterDet, h: f64, tol: f64, f: F)
    where
        F: Fn(&SlaterDet) -> Result<GradSlaterDet>,
    {
        let param = FmdParameterization::new(det);
        let x0 = param.from_slater_det(det);
        let analytic = param.real_gradient(&f(det).unwrap());

        let value = |x: &[f64]| f(&param.to_slater_det(x).unwrap()).unwrap().value.re;
        for i in 0..x0.len() {
            let mut fwd = x0.clone();
            let mut bwd = x0.clone();
            fwd[i] += h;
            bwd[i] -= h;
            let numerical = (value(&fwd) - value(&bwd)) / (2.0 * h);
            assert_relative_eq!(analytic[i], numerical, epsilon = tol, max_relative = tol);
        }
    }
}
