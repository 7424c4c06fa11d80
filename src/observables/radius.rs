//! Mean square radii relative to the centre of mass.

use num_complex::Complex64;

use crate::gaussian::{Gaussian, GaussianAux, GradGaussian, GradGaussianAux, GradSlaterDet, Selection};
use crate::operator::{
    grad_center_of_mass, grad_ob_me, ob_me, ob_me_od, GradOneBodyOperator, OneBodyOperator, OpValue,
};
use crate::slater::{CenterOfMass, GradSlaterDetAux, SlaterDet, SlaterDetAux};

/// r²_sel = Σ_{i ∈ sel} (x_i - X)² / N_sel
#[derive(Debug, Clone, Copy)]
pub struct Radius {
    center: CenterOfMass,
    selection: Selection,
    count: f64,
}

impl Radius {
    pub fn new(center: CenterOfMass, selection: Selection, det: &SlaterDet) -> Self {
        Self {
            center,
            selection,
            count: det.count(selection) as f64,
        }
    }

    /// Mean square radius in fm²; zero if no nucleon is selected.
    pub fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        if self.count == 0.0 {
            return 0.0;
        }
        ob_me::<1, _>(det, aux, self)[0].re
    }

    /// ⟨B|r²|K⟩ / ⟨B|K⟩ about the fixed frame of this operator.
    pub fn value_od(&self, bra: &SlaterDet, ket: &SlaterDet, aux: &SlaterDetAux) -> Complex64 {
        if self.count == 0.0 {
            return Complex64::new(0.0, 0.0);
        }
        ob_me_od::<1, _>(bra, ket, aux, self)[0]
    }

    pub fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        if self.count == 0.0 {
            return GradSlaterDet::zeros(det.len());
        }
        let dedc = ob_me::<6, _>(det, aux, &CenterOfMassDerivative(self));
        grad_ob_me(det, aux, daux, self) + grad_center_of_mass(det, aux, daux, &dedc)
    }

    fn weight(&self, g: &Gaussian) -> f64 {
        self.selection.weight(g.xi) / self.count
    }
}

impl OneBodyOperator<1> for Radius {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<1> {
        let rc = self.center.relative_position(&x.rho);
        OpValue::<1>::new((rc.dot(&rc) + x.alpha * 3.0) * x.q * self.weight(g1))
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradOneBodyOperator for Radius {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        _g2: &Gaussian,
        x: &GaussianAux,
        dx: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let w = self.weight(g1);
        if w == 0.0 {
            return (Complex64::new(0.0, 0.0), GradGaussian::zero());
        }
        let rc = self.center.relative_position(&x.rho);
        let f = rc.dot(&rc) + x.alpha * 3.0;
        let dfa = rc.dot(&dx.drho.a) * 2.0 + dx.dalpha * 3.0;
        let dfb = rc * (dx.drho.b * 2.0);
        let grad = GradGaussian::new(
            dfa * x.q + f * dx.dq.a,
            dfb * x.q + dx.dq.b * f,
            [f * dx.dq.chi[0], f * dx.dq.chi[1]],
        ) * w;
        (f * x.q * w, grad)
    }
}

/// ∂/∂X of the radius kernel; it does not depend on V.
struct CenterOfMassDerivative<'a>(&'a Radius);

impl OneBodyOperator<6> for CenterOfMassDerivative<'_> {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<6> {
        let rc = self.0.center.relative_position(&x.rho);
        let d = rc * (x.q * (-2.0 * self.0.weight(g1)));
        let z = Complex64::new(0.0, 0.0);
        OpValue::<6>::from_column_slice(&[d[0], d[1], d[2], z, z, z])
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}
