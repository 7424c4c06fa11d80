//! Concrete constraints.

use num_complex::Complex64;

use crate::gaussian::{GradSlaterDet, Selection};
use crate::observables::{
    AngularMomentum, Dipole, Octupole, Quadrupole, Radius, SpinOrbit, TotalIsospin,
};
use crate::operator::{grad_center_of_mass, OpValue};
use crate::slater::{CenterOfMass, GradSlaterDetAux, SlaterDet, SlaterDetAux};

use super::traits::{Constraint, OffDiagonalConstraint};

/// |X|² + |P|² = 0
#[derive(Debug, Clone)]
pub struct CenterOfMassConstraint;

impl Constraint for CenterOfMassConstraint {
    fn label(&self) -> &str {
        "CM"
    }

    fn target(&self) -> f64 {
        0.0
    }

    fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        let cm = CenterOfMass::of(det, aux);
        cm.position.norm_squared() + cm.momentum(det.total_mass()).norm_squared()
    }

    fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        let cm = CenterOfMass::of(det, aux);
        let m2 = det.total_mass().powi(2);
        let mut dedc = OpValue::<6>::zeros();
        for k in 0..3 {
            dedc[k] = Complex64::from(2.0 * cm.position[k]);
            dedc[k + 3] = Complex64::from(2.0 * m2 * cm.velocity[k]);
        }
        let mut grad = grad_center_of_mass(det, aux, daux, &dedc);
        grad.value = Complex64::from(self.value(det, aux));
        grad
    }
}

/// Which angular momentum is constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngularMomentumKind {
    Total,
    Orbital,
    Spin,
}

impl AngularMomentumKind {
    fn label(&self) -> &'static str {
        match self {
            AngularMomentumKind::Total => "J2",
            AngularMomentumKind::Orbital => "L2",
            AngularMomentumKind::Spin => "S2",
        }
    }

    fn operator(&self, center: CenterOfMass) -> AngularMomentum {
        match self {
            AngularMomentumKind::Total => AngularMomentum::j2(center),
            AngularMomentumKind::Orbital => AngularMomentum::l2(center),
            AngularMomentumKind::Spin => AngularMomentum::s2(),
        }
    }
}

/// ⟨J²⟩, ⟨L²⟩ or ⟨S²⟩ = target
#[derive(Debug, Clone)]
pub struct AngularMomentumConstraint {
    kind: AngularMomentumKind,
    target: f64,
}

impl AngularMomentumConstraint {
    pub fn new(kind: AngularMomentumKind, target: f64) -> Self {
        Self { kind, target }
    }
}

impl Constraint for AngularMomentumConstraint {
    fn label(&self) -> &str {
        self.kind.label()
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        self.kind
            .operator(CenterOfMass::of(det, aux))
            .value(det, aux)
    }

    fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        self.kind
            .operator(CenterOfMass::of(det, aux))
            .gradient(det, aux, daux)
    }
}

/// Off-diagonal angular momentum about the origin of a fixed frame.
impl OffDiagonalConstraint for AngularMomentumConstraint {
    fn label(&self) -> &str {
        self.kind.label()
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn value(&self, bra: &SlaterDet, ket: &SlaterDet, aux: &SlaterDetAux) -> Complex64 {
        self.kind
            .operator(CenterOfMass::origin())
            .value_od(bra, ket, aux)
    }

    fn gradient(
        &self,
        bra: &SlaterDet,
        ket: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        self.kind
            .operator(CenterOfMass::origin())
            .gradient_od(bra, ket, aux, daux)
    }
}

/// ⟨Σ l·s⟩ = target
#[derive(Debug, Clone)]
pub struct SpinOrbitConstraint {
    target: f64,
}

impl SpinOrbitConstraint {
    pub fn new(target: f64) -> Self {
        Self { target }
    }
}

impl Constraint for SpinOrbitConstraint {
    fn label(&self) -> &str {
        "LS"
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        SpinOrbit::new(CenterOfMass::of(det, aux)).value(det, aux)
    }

    fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        SpinOrbit::new(CenterOfMass::of(det, aux)).gradient(det, aux, daux)
    }
}

impl OffDiagonalConstraint for SpinOrbitConstraint {
    fn label(&self) -> &str {
        "LS"
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn value(&self, bra: &SlaterDet, ket: &SlaterDet, aux: &SlaterDetAux) -> Complex64 {
        SpinOrbit::new(CenterOfMass::origin()).value_od(bra, ket, aux)
    }

    fn gradient(
        &self,
        bra: &SlaterDet,
        ket: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        SpinOrbit::new(CenterOfMass::origin()).gradient_od(bra, ket, aux, daux)
    }
}

/// ⟨T²⟩ = target
#[derive(Debug, Clone)]
pub struct IsospinConstraint {
    target: f64,
}

impl IsospinConstraint {
    pub fn new(target: f64) -> Self {
        Self { target }
    }
}

impl Constraint for IsospinConstraint {
    fn label(&self) -> &str {
        "T2"
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        TotalIsospin.value(det, aux)
    }

    fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        TotalIsospin.gradient(det, aux, daux)
    }
}

impl OffDiagonalConstraint for IsospinConstraint {
    fn label(&self) -> &str {
        "T2"
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn value(&self, bra: &SlaterDet, ket: &SlaterDet, aux: &SlaterDetAux) -> Complex64 {
        TotalIsospin.value_od(bra, ket, aux)
    }

    fn gradient(
        &self,
        bra: &SlaterDet,
        ket: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        TotalIsospin.gradient_od(bra, ket, aux, daux)
    }
}

/// Mean square radius = r²; reported as r.
#[derive(Debug, Clone)]
pub struct RadiusConstraint {
    selection: Selection,
    target: f64,
    label: String,
}

impl RadiusConstraint {
    /// `radius` in fm.
    pub fn new(selection: Selection, radius: f64) -> Self {
        Self {
            selection,
            target: radius * radius,
            label: format!("R{}", selection.tag()),
        }
    }
}

impl Constraint for RadiusConstraint {
    fn label(&self) -> &str {
        &self.label
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        Radius::new(CenterOfMass::of(det, aux), self.selection, det).value(det, aux)
    }

    fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        Radius::new(CenterOfMass::of(det, aux), self.selection, det).gradient(det, aux, daux)
    }

    fn output(&self, value: f64) -> f64 {
        value.max(0.0).sqrt()
    }
}

/// |D|² = d²; reported as |D|.
#[derive(Debug, Clone)]
pub struct DipoleConstraint {
    selection: Selection,
    target: f64,
    label: String,
}

impl DipoleConstraint {
    pub fn new(selection: Selection, dipole: f64) -> Self {
        Self {
            selection,
            target: dipole * dipole,
            label: format!("D{}", selection.tag()),
        }
    }
}

impl Constraint for DipoleConstraint {
    fn label(&self) -> &str {
        &self.label
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        Dipole::new(CenterOfMass::of(det, aux), self.selection).value(det, aux)
    }

    fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        Dipole::new(CenterOfMass::of(det, aux), self.selection).gradient(det, aux, daux)
    }

    fn output(&self, value: f64) -> f64 {
        value.max(0.0).sqrt()
    }
}

/// Σ Q_kl² = q²; reported as q.
#[derive(Debug, Clone)]
pub struct QuadrupoleConstraint {
    selection: Selection,
    target: f64,
    label: String,
}

impl QuadrupoleConstraint {
    pub fn new(selection: Selection, quadrupole: f64) -> Self {
        Self {
            selection,
            target: quadrupole * quadrupole,
            label: format!("Q{}", selection.tag()),
        }
    }
}

impl Constraint for QuadrupoleConstraint {
    fn label(&self) -> &str {
        &self.label
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        Quadrupole::new(CenterOfMass::of(det, aux), self.selection).value(det, aux)
    }

    fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        Quadrupole::new(CenterOfMass::of(det, aux), self.selection).gradient(det, aux, daux)
    }

    fn output(&self, value: f64) -> f64 {
        value.max(0.0).sqrt()
    }
}

/// Σ O_klm² = o²; reported as o.
#[derive(Debug, Clone)]
pub struct OctupoleConstraint {
    selection: Selection,
    target: f64,
    label: String,
}

impl OctupoleConstraint {
    /// `octupole` in fm³.
    pub fn new(selection: Selection, octupole: f64) -> Self {
        Self {
            selection,
            target: octupole * octupole,
            label: format!("O{}", selection.tag()),
        }
    }
}

impl Constraint for OctupoleConstraint {
    fn label(&self) -> &str {
        &self.label
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        Octupole::new(CenterOfMass::of(det, aux), self.selection).value(det, aux)
    }

    fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        Octupole::new(CenterOfMass::of(det, aux), self.selection).gradient(det, aux, daux)
    }

    fn output(&self, value: f64) -> f64 {
        value.max(0.0).sqrt()
    }
}
