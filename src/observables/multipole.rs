//! Dipole, quadrupole and octupole moments relative to the centre of mass.
//!
//! D_k = Σ_{i ∈ sel} (x_i - X)_k
//! Q_kl = Σ_{i ∈ sel} 3 (x_i - X)_k (x_i - X)_l - δ_kl (x_i - X)²
//! O_klm = Σ_{i ∈ sel} 5 r_k r_l r_m - r² (r_k δ_lm + r_l δ_km + r_m δ_kl), r = x_i - X
//!
//! Constraints use the rotational invariants |D|², Σ_kl Q_kl² and Σ_klm O_klm².

use nalgebra::Matrix3;
use num_complex::Complex64;

use crate::gaussian::{
    CVec3, Gaussian, GaussianAux, GradGaussian, GradGaussianAux, GradSlaterDet, Selection,
};
use crate::operator::{grad_center_of_mass, grad_ob_me, ob_me, GradOneBodyOperator, OneBodyOperator, OpValue};
use crate::slater::{CenterOfMass, GradSlaterDetAux, SlaterDet, SlaterDetAux};

fn zero() -> Complex64 {
    Complex64::new(0.0, 0.0)
}

/// Unique (k, l) pairs of a symmetric 3×3 tensor with their multiplicity.
const UPPER: [(usize, usize, f64); 6] = [
    (0, 0, 1.0),
    (1, 1, 1.0),
    (2, 2, 1.0),
    (0, 1, 2.0),
    (0, 2, 2.0),
    (1, 2, 2.0),
];

/// One Cartesian component of the quadrupole tensor.
#[derive(Debug, Clone, Copy)]
pub struct QuadrupoleComponent {
    center: CenterOfMass,
    selection: Selection,
    k: usize,
    l: usize,
}

impl QuadrupoleComponent {
    pub fn new(center: CenterOfMass, selection: Selection, k: usize, l: usize) -> Self {
        Self {
            center,
            selection,
            k,
            l,
        }
    }

    /// 3 (e_k ρc_l + ρc_k e_l) - 2 δ_kl ρc, the gradient of the kernel
    /// polynomial with respect to ρc.
    fn polynomial_gradient(&self, rc: &CVec3) -> CVec3 {
        let mut d = CVec3::zeros();
        d[self.k] += rc[self.l] * 3.0;
        d[self.l] += rc[self.k] * 3.0;
        if self.k == self.l {
            d -= rc * Complex64::new(2.0, 0.0);
        }
        d
    }

    fn polynomial(&self, rc: &CVec3) -> Complex64 {
        let mut f = rc[self.k] * rc[self.l] * 3.0;
        if self.k == self.l {
            f -= rc.dot(rc);
        }
        f
    }
}

impl OneBodyOperator<1> for QuadrupoleComponent {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<1> {
        let rc = self.center.relative_position(&x.rho);
        // the α δ_kl parts of ⟨x_k x_l⟩ cancel in the traceless combination
        let f = self.polynomial(&rc);
        OpValue::<1>::new(f * x.q * self.selection.weight(g1.xi))
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradOneBodyOperator for QuadrupoleComponent {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        _g2: &Gaussian,
        x: &GaussianAux,
        dx: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let w = self.selection.weight(g1.xi);
        if w == 0.0 {
            return (zero(), GradGaussian::zero());
        }
        let rc = self.center.relative_position(&x.rho);
        let f = self.polynomial(&rc);
        let df = self.polynomial_gradient(&rc);
        let grad = GradGaussian::new(
            df.dot(&dx.drho.a) * x.q + f * dx.dq.a,
            df * (dx.drho.b * x.q) + dx.dq.b * f,
            [f * dx.dq.chi[0], f * dx.dq.chi[1]],
        ) * w;
        (f * x.q * w, grad)
    }
}

struct QuadrupoleCenterDerivative<'a>(&'a QuadrupoleComponent);

impl OneBodyOperator<6> for QuadrupoleCenterDerivative<'_> {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<6> {
        let op = self.0;
        let rc = op.center.relative_position(&x.rho);
        let d = op.polynomial_gradient(&rc) * (x.q * -op.selection.weight(g1.xi));
        OpValue::<6>::from_column_slice(&[d[0], d[1], d[2], zero(), zero(), zero()])
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

/// Quadrupole tensor in fm².
pub fn quadrupole_tensor(
    det: &SlaterDet,
    aux: &SlaterDetAux,
    center: &CenterOfMass,
    selection: Selection,
) -> Matrix3<f64> {
    let mut q = Matrix3::zeros();
    for &(k, l, _) in UPPER.iter() {
        let v = ob_me::<1, _>(det, aux, &QuadrupoleComponent::new(*center, selection, k, l))[0].re;
        q[(k, l)] = v;
        q[(l, k)] = v;
    }
    q
}

/// Σ_kl Q_kl², the rotational invariant of the quadrupole tensor.
#[derive(Debug, Clone, Copy)]
pub struct Quadrupole {
    center: CenterOfMass,
    selection: Selection,
}

impl Quadrupole {
    pub fn new(center: CenterOfMass, selection: Selection) -> Self {
        Self { center, selection }
    }

    pub fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        quadrupole_tensor(det, aux, &self.center, self.selection).norm_squared()
    }

    pub fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        let mut acc = GradSlaterDet::zeros(det.len());
        let mut dedc = OpValue::<6>::zeros();
        for &(k, l, mult) in UPPER.iter() {
            let op = QuadrupoleComponent::new(self.center, self.selection, k, l);
            let g = grad_ob_me(det, aux, daux, &op);
            let weight = Complex64::from(2.0 * mult * g.value.re);
            dedc += ob_me::<6, _>(det, aux, &QuadrupoleCenterDerivative(&op)) * weight;
            acc.value += g.value * g.value * mult;
            let mut g = g * weight;
            g.value = zero();
            acc += g;
        }
        acc + grad_center_of_mass(det, aux, daux, &dedc)
    }
}

/// Unique (k, l, m) triples of a symmetric rank-3 tensor with their
/// multiplicity.
const UPPER3: [(usize, usize, usize, f64); 10] = [
    (0, 0, 0, 1.0),
    (1, 1, 1, 1.0),
    (2, 2, 2, 1.0),
    (0, 0, 1, 3.0),
    (0, 0, 2, 3.0),
    (0, 1, 1, 3.0),
    (0, 2, 2, 3.0),
    (1, 1, 2, 3.0),
    (1, 2, 2, 3.0),
    (0, 1, 2, 6.0),
];

fn delta(i: usize, j: usize) -> f64 {
    if i == j {
        1.0
    } else {
        0.0
    }
}

/// One Cartesian component of the traceless octupole tensor.
#[derive(Debug, Clone, Copy)]
pub struct OctupoleComponent {
    center: CenterOfMass,
    selection: Selection,
    k: usize,
    l: usize,
    m: usize,
}

impl OctupoleComponent {
    pub fn new(center: CenterOfMass, selection: Selection, k: usize, l: usize, m: usize) -> Self {
        Self {
            center,
            selection,
            k,
            l,
            m,
        }
    }

    /// ρc_k δ_lm + ρc_l δ_km + ρc_m δ_kl
    fn trace_part(&self, rc: &CVec3) -> Complex64 {
        let (k, l, m) = (self.k, self.l, self.m);
        rc[k] * delta(l, m) + rc[l] * delta(k, m) + rc[m] * delta(k, l)
    }

    fn polynomial(&self, rc: &CVec3) -> Complex64 {
        rc[self.k] * rc[self.l] * rc[self.m] * 5.0 - rc.dot(rc) * self.trace_part(rc)
    }

    fn polynomial_gradient(&self, rc: &CVec3) -> CVec3 {
        let (k, l, m) = (self.k, self.l, self.m);
        let rc2 = rc.dot(rc);
        let s = self.trace_part(rc);
        let mut d = rc * (s * -2.0);
        d[k] += rc[l] * rc[m] * 5.0 - rc2 * delta(l, m);
        d[l] += rc[k] * rc[m] * 5.0 - rc2 * delta(k, m);
        d[m] += rc[k] * rc[l] * 5.0 - rc2 * delta(k, l);
        d
    }
}

impl OneBodyOperator<1> for OctupoleComponent {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<1> {
        let rc = self.center.relative_position(&x.rho);
        // the width terms of the third moments cancel as well
        let f = self.polynomial(&rc);
        OpValue::<1>::new(f * x.q * self.selection.weight(g1.xi))
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradOneBodyOperator for OctupoleComponent {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        _g2: &Gaussian,
        x: &GaussianAux,
        dx: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let w = self.selection.weight(g1.xi);
        if w == 0.0 {
            return (zero(), GradGaussian::zero());
        }
        let rc = self.center.relative_position(&x.rho);
        let f = self.polynomial(&rc);
        let df = self.polynomial_gradient(&rc);
        let grad = GradGaussian::new(
            df.dot(&dx.drho.a) * x.q + f * dx.dq.a,
            df * (dx.drho.b * x.q) + dx.dq.b * f,
            [f * dx.dq.chi[0], f * dx.dq.chi[1]],
        ) * w;
        (f * x.q * w, grad)
    }
}

struct OctupoleCenterDerivative<'a>(&'a OctupoleComponent);

impl OneBodyOperator<6> for OctupoleCenterDerivative<'_> {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<6> {
        let op = self.0;
        let rc = op.center.relative_position(&x.rho);
        let d = op.polynomial_gradient(&rc) * (x.q * -op.selection.weight(g1.xi));
        OpValue::<6>::from_column_slice(&[d[0], d[1], d[2], zero(), zero(), zero()])
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

/// Σ_klm O_klm² in fm⁶.
#[derive(Debug, Clone, Copy)]
pub struct Octupole {
    center: CenterOfMass,
    selection: Selection,
}

impl Octupole {
    pub fn new(center: CenterOfMass, selection: Selection) -> Self {
        Self { center, selection }
    }

    pub fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        UPPER3
            .iter()
            .map(|&(k, l, m, mult)| {
                let op = OctupoleComponent::new(self.center, self.selection, k, l, m);
                mult * ob_me::<1, _>(det, aux, &op)[0].re.powi(2)
            })
            .sum()
    }

    pub fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        let mut acc = GradSlaterDet::zeros(det.len());
        let mut dedc = OpValue::<6>::zeros();
        for &(k, l, m, mult) in UPPER3.iter() {
            let op = OctupoleComponent::new(self.center, self.selection, k, l, m);
            let g = grad_ob_me(det, aux, daux, &op);
            let weight = Complex64::from(2.0 * mult * g.value.re);
            dedc += ob_me::<6, _>(det, aux, &OctupoleCenterDerivative(&op)) * weight;
            acc.value += g.value * g.value * mult;
            let mut g = g * weight;
            g.value = zero();
            acc += g;
        }
        acc + grad_center_of_mass(det, aux, daux, &dedc)
    }
}

/// One Cartesian component of the dipole vector.
#[derive(Debug, Clone, Copy)]
pub struct DipoleComponent {
    center: CenterOfMass,
    selection: Selection,
    k: usize,
}

impl DipoleComponent {
    pub fn new(center: CenterOfMass, selection: Selection, k: usize) -> Self {
        Self { center, selection, k }
    }
}

impl OneBodyOperator<1> for DipoleComponent {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<1> {
        let rc = self.center.relative_position(&x.rho);
        OpValue::<1>::new(rc[self.k] * x.q * self.selection.weight(g1.xi))
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradOneBodyOperator for DipoleComponent {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        _g2: &Gaussian,
        x: &GaussianAux,
        dx: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let w = self.selection.weight(g1.xi);
        if w == 0.0 {
            return (zero(), GradGaussian::zero());
        }
        let f = self.center.relative_position(&x.rho)[self.k];
        let mut b = dx.dq.b * f;
        b[self.k] += dx.drho.b * x.q;
        let grad = GradGaussian::new(
            dx.drho.a[self.k] * x.q + f * dx.dq.a,
            b,
            [f * dx.dq.chi[0], f * dx.dq.chi[1]],
        ) * w;
        (f * x.q * w, grad)
    }
}

/// |D|² in fm².
#[derive(Debug, Clone, Copy)]
pub struct Dipole {
    center: CenterOfMass,
    selection: Selection,
}

impl Dipole {
    pub fn new(center: CenterOfMass, selection: Selection) -> Self {
        Self { center, selection }
    }

    pub fn vector(&self, det: &SlaterDet, aux: &SlaterDetAux) -> nalgebra::Vector3<f64> {
        nalgebra::Vector3::from_fn(|k, _| {
            ob_me::<1, _>(det, aux, &DipoleComponent::new(self.center, self.selection, k))[0].re
        })
    }

    pub fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        self.vector(det, aux).norm_squared()
    }

    pub fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        // ∂D_k/∂X_k = -N_sel
        let count = det.count(self.selection) as f64;
        let mut acc = GradSlaterDet::zeros(det.len());
        let mut dedc = OpValue::<6>::zeros();
        for k in 0..3 {
            let op = DipoleComponent::new(self.center, self.selection, k);
            let g = grad_ob_me(det, aux, daux, &op);
            let weight = Complex64::from(2.0 * g.value.re);
            dedc[k] = weight * -count;
            acc.value += g.value * g.value;
            let mut g = g * weight;
            g.value = zero();
            acc += g;
        }
        acc + grad_center_of_mass(det, aux, daux, &dedc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::Isospin;
    use crate::slater::test_dets::{assert_gradient, four_nucleons, proton_neutron, two_protons};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_quadrupole_of_two_protons() {
        // two point-like clusters ±d along z: Q_zz = 2·2d², traceless
        let det = two_protons();
        let aux = SlaterDetAux::new(&det).unwrap();
        let cm = CenterOfMass::of(&det, &aux);
        let q = quadrupole_tensor(&det, &aux, &cm, Selection::All);
        assert_relative_eq!(q.trace(), 0.0, epsilon = 1e-10);
        assert!(q[(2, 2)] > 0.0);
        assert_relative_eq!(q[(0, 0)], q[(1, 1)], max_relative = 1e-10);
        assert_relative_eq!(q[(0, 1)], 0.0, epsilon = 1e-10);
        assert_relative_eq!(
            Quadrupole::new(cm, Selection::All).value(&det, &aux),
            1.5 * q[(2, 2)] * q[(2, 2)],
            max_relative = 1e-10
        );
    }

    #[test]
    fn test_dipole_of_separated_proton() {
        // proton at +d, neutron at -d: mass centre near 0, proton dipole ≈ d
        let up = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        let d = 1.2;
        let det = SlaterDet::new(
            "pn",
            vec![
                Gaussian::from_phase_space(
                    Isospin::Proton,
                    up,
                    Complex64::new(2.0, 0.0),
                    Vector3::new(d, 0.0, 0.0),
                    Vector3::zeros(),
                ),
                Gaussian::from_phase_space(
                    Isospin::Neutron,
                    up,
                    Complex64::new(2.0, 0.0),
                    Vector3::new(-d, 0.0, 0.0),
                    Vector3::zeros(),
                ),
            ],
        );
        let aux = SlaterDetAux::new(&det).unwrap();
        let cm = CenterOfMass::of(&det, &aux);
        let dp = Dipole::new(cm, Selection::Protons).vector(&det, &aux);
        assert_relative_eq!(dp.x, d - cm.position.x, max_relative = 1e-12);
        // matter dipole only measures the mass difference of p and n
        let dm = Dipole::new(cm, Selection::All).vector(&det, &aux);
        assert_relative_eq!(dm.x, -2.0 * cm.position.x, max_relative = 1e-8);
    }

    #[test]
    fn test_component_gradient() {
        let det = four_nucleons();
        let aux = SlaterDetAux::new(&det).unwrap();
        let cm = CenterOfMass::of(&det, &aux);
        let op = QuadrupoleComponent::new(cm, Selection::Protons, 0, 2);
        let (g1, g2) = (&det.gaussians[0], &det.gaussians[1]);
        let x = GaussianAux::new(g1, g2);
        let dx = GradGaussianAux::new(g1, g2, &x);
        let (_, grad) = op.evaluate_gradient(g1, g2, &x, &dx);
        let num = op.numerical_gradient(g1, g2, 1e-5);
        assert_relative_eq!((grad - num).max_norm(), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_quadrupole_gradient() {
        let det = four_nucleons();
        for selection in [Selection::All, Selection::Neutrons] {
            assert_gradient(&det, 1e-5, 1e-5, |d| {
                let aux = SlaterDetAux::new(d)?;
                let daux = GradSlaterDetAux::diagonal(d, &aux);
                Ok(Quadrupole::new(CenterOfMass::of(d, &aux), selection).gradient(d, &aux, &daux))
            });
        }
    }

    #[test]
    fn test_octupole_of_displaced_proton() {
        // a proton at z relative to the centre of mass: O_zzz = 2z³,
        // O_xxz = O_yyz = -z³, so Σ O² = 10 z⁶
        let up = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        let g = |xi, z| {
            Gaussian::from_phase_space(
                xi,
                up,
                Complex64::new(1.5, 0.0),
                Vector3::new(0.0, 0.0, z),
                Vector3::zeros(),
            )
        };
        let det = SlaterDet::new("pn", vec![g(Isospin::Proton, 1.0), g(Isospin::Neutron, -1.0)]);
        let aux = SlaterDetAux::new(&det).unwrap();
        let cm = CenterOfMass::of(&det, &aux);
        let z = 1.0 - cm.position.z;
        let o = Octupole::new(cm, Selection::Protons).value(&det, &aux);
        assert_relative_eq!(o, 10.0 * z.powi(6), max_relative = 1e-10);

        // reflection symmetric pair
        let det = two_protons();
        let aux = SlaterDetAux::new(&det).unwrap();
        let cm = CenterOfMass::of(&det, &aux);
        assert_relative_eq!(Octupole::new(cm, Selection::All).value(&det, &aux), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_octupole_component_is_traceless() {
        let det = four_nucleons();
        let aux = SlaterDetAux::new(&det).unwrap();
        let cm = CenterOfMass::of(&det, &aux);
        for m in 0..3 {
            let trace: Complex64 = (0..3)
                .map(|k| ob_me::<1, _>(&det, &aux, &OctupoleComponent::new(cm, Selection::All, k, k, m))[0])
                .sum();
            assert_relative_eq!(trace.norm(), 0.0, epsilon = 1e-10);
        }

        let op = OctupoleComponent::new(cm, Selection::Protons, 0, 1, 2);
        let (g1, g2) = (&det.gaussians[0], &det.gaussians[1]);
        let x = GaussianAux::new(g1, g2);
        let dx = GradGaussianAux::new(g1, g2, &x);
        let (_, grad) = op.evaluate_gradient(g1, g2, &x, &dx);
        let num = op.numerical_gradient(g1, g2, 1e-5);
        assert_relative_eq!((grad - num).max_norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_octupole_gradient() {
        for det in [four_nucleons(), proton_neutron()] {
            for selection in [Selection::All, Selection::Protons] {
                assert_gradient(&det, 1e-5, 1e-5, |d| {
                    let aux = SlaterDetAux::new(d)?;
                    let daux = GradSlaterDetAux::diagonal(d, &aux);
                    Ok(Octupole::new(CenterOfMass::of(d, &aux), selection).gradient(d, &aux, &daux))
                });
            }
        }
    }

    #[test]
    fn test_dipole_gradient() {
        let det = four_nucleons();
        assert_gradient(&det, 1e-5, 1e-6, |d| {
            let aux = SlaterDetAux::new(d)?;
            let daux = GradSlaterDetAux::diagonal(d, &aux);
            Ok(Dipole::new(CenterOfMass::of(d, &aux), Selection::Protons).gradient(d, &aux, &daux))
        });
    }
}
