//! Observables of a single Slater determinant.

pub mod angular_momentum;
pub mod hamiltonian;
pub mod isospin;
pub mod multipole;
pub mod radius;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use angular_momentum::{AngularMomentum, SpinOrbit};
pub use hamiltonian::{Energies, GaussianTerm, Hamiltonian, Interaction};
pub use isospin::TotalIsospin;
pub use multipole::{quadrupole_tensor, Dipole, Octupole, Quadrupole};
pub use radius::Radius;

use crate::error::Result;
use crate::gaussian::Selection;
use crate::slater::{CenterOfMass, SlaterDet, SlaterDetAux};

/// Everything the `calc` driver reports for one determinant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Observables {
    pub nucleons: usize,
    pub protons: usize,
    pub neutrons: usize,
    /// MeV
    pub energies: Energies,
    pub center_of_mass: CenterOfMass,
    /// Root mean square radii in fm: matter, proton, neutron
    pub radius: [f64; 3],
    pub j2: f64,
    pub l2: f64,
    pub s2: f64,
    /// Σ l·s
    pub ls: f64,
    pub t2: f64,
    /// Proton dipole moment in fm
    pub dipole: Vector3<f64>,
    /// Mass and proton quadrupole tensors in fm²
    pub quadrupole: [Matrix3<f64>; 2],
    /// Mass and proton octupole invariants (Σ O²)^½ in fm³
    pub octupole: [f64; 2],
}

impl Observables {
    pub fn calculate(interaction: &Interaction, det: &SlaterDet) -> Result<Self> {
        let aux = SlaterDetAux::new(det)?;
        let cm = CenterOfMass::of(det, &aux);
        let energies = Hamiltonian::new(interaction, det).energies(det, &aux);

        let radius = [Selection::All, Selection::Protons, Selection::Neutrons]
            .map(|s| Radius::new(cm, s, det).value(det, &aux).max(0.0).sqrt());

        Ok(Self {
            nucleons: det.len(),
            protons: det.protons(),
            neutrons: det.neutrons(),
            energies,
            center_of_mass: cm,
            radius,
            j2: AngularMomentum::j2(cm).value(det, &aux),
            l2: AngularMomentum::l2(cm).value(det, &aux),
            s2: AngularMomentum::s2().value(det, &aux),
            ls: SpinOrbit::new(cm).value(det, &aux),
            t2: TotalIsospin.value(det, &aux),
            dipole: Dipole::new(cm, Selection::Protons).vector(det, &aux),
            quadrupole: [
                quadrupole_tensor(det, &aux, &cm, Selection::All),
                quadrupole_tensor(det, &aux, &cm, Selection::Protons),
            ],
            octupole: [Selection::All, Selection::Protons]
                .map(|s| Octupole::new(cm, s).value(det, &aux).max(0.0).sqrt()),
        })
    }
}

fn spin_of(j2: f64) -> f64 {
    // j(j+1) = J²
    0.5 * ((1.0 + 4.0 * j2.max(0.0)).sqrt() - 1.0)
}

impl fmt::Display for Observables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.energies;
        writeln!(
            f,
            "# A = {}, Z = {}, N = {}",
            self.nucleons, self.protons, self.neutrons
        )?;
        writeln!(
            f,
            "# E = {:10.4} MeV    T = {:10.4} MeV    V = {:10.4} MeV",
            e.total, e.kinetic, e.potential
        )?;
        writeln!(
            f,
            "# R = {:8.4} fm    Rp = {:8.4} fm    Rn = {:8.4} fm",
            self.radius[0], self.radius[1], self.radius[2]
        )?;
        writeln!(
            f,
            "# J2 = {:8.4} (J = {:6.3})    L2 = {:8.4}    S2 = {:8.4}",
            self.j2,
            spin_of(self.j2),
            self.l2,
            self.s2
        )?;
        writeln!(f, "# LS = {:8.4}    T2 = {:8.4}", self.ls, self.t2)?;
        writeln!(
            f,
            "# Xcm = [{:8.4}, {:8.4}, {:8.4}] fm    Vcm = [{:10.3e}, {:10.3e}, {:10.3e}]",
            self.center_of_mass.position.x,
            self.center_of_mass.position.y,
            self.center_of_mass.position.z,
            self.center_of_mass.velocity.x,
            self.center_of_mass.velocity.y,
            self.center_of_mass.velocity.z
        )?;
        writeln!(f, "# |D_p| = {:8.4} fm", self.dipole.norm())?;
        for (label, q) in ["Q", "Q_p"].iter().zip(&self.quadrupole) {
            writeln!(
                f,
                "# {:3} = diag[{:8.3}, {:8.3}, {:8.3}] off[{:8.3}, {:8.3}, {:8.3}] fm²",
                label,
                q[(0, 0)],
                q[(1, 1)],
                q[(2, 2)],
                q[(0, 1)],
                q[(0, 2)],
                q[(1, 2)]
            )?;
        }
        writeln!(
            f,
            "# |O| = {:8.3} fm³    |O_p| = {:8.3} fm³",
            self.octupole[0], self.octupole[1]
        )?;
        Ok(())
    }
}
