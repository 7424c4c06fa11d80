//! Antisymmetrised product of Gaussian wave packets.

use nalgebra::{Matrix3, Rotation3, SymmetricEigen, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gaussian::{Gaussian, Isospin, Selection};
use crate::observables::multipole::quadrupole_tensor;
use crate::physics::mass;

use super::center_of_mass::CenterOfMass;
use super::orbitals::SlaterDetAux;

/// Slater determinant of A Gaussians. The order of the Gaussians only
/// fixes the overall sign.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SlaterDet {
    pub name: String,
    pub gaussians: Vec<Gaussian>,
}

impl SlaterDet {
    pub fn new(name: impl Into<String>, gaussians: Vec<Gaussian>) -> Self {
        Self {
            name: name.into(),
            gaussians,
        }
    }

    /// Mass number A.
    pub fn len(&self) -> usize {
        self.gaussians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaussians.is_empty()
    }

    pub fn count(&self, selection: Selection) -> usize {
        self.gaussians
            .iter()
            .filter(|g| selection.contains(g.xi))
            .count()
    }

    pub fn protons(&self) -> usize {
        self.count(Selection::Protons)
    }

    pub fn neutrons(&self) -> usize {
        self.count(Selection::Neutrons)
    }

    /// Total mass in fm⁻¹.
    pub fn total_mass(&self) -> f64 {
        self.gaussians.iter().map(|g| mass(g.xi)).sum()
    }

    pub fn isospins(&self) -> Vec<Isospin> {
        self.gaussians.iter().map(|g| g.xi).collect()
    }

    /// Rescale the spinors so that ⟨Q|Q⟩ = 1.
    pub fn normalize(&mut self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let aux = SlaterDetAux::new(self)?;
        let norm = aux.determinant().re;
        let factor = norm.powf(-0.5 / self.len() as f64);
        for g in self.gaussians.iter_mut() {
            g.scale_spin(factor);
        }
        Ok(())
    }

    /// Shift and boost every packet so that the centre of mass sits at rest
    /// in the origin. Translation by -X and boost by -m V are exact.
    pub fn move_boost(&mut self) -> Result<()> {
        let aux = SlaterDetAux::new(self)?;
        let cm = CenterOfMass::of(self, &aux);
        let shift = -cm.position;
        for g in self.gaussians.iter_mut() {
            let kick = -cm.velocity * mass(g.xi);
            g.translate(&shift);
            g.boost(&kick);
        }
        Ok(())
    }

    /// Rotate about the centre of mass onto the principal axes of the mass
    /// quadrupole tensor, largest eigenvalue along z. The centre of mass
    /// ends up in the origin.
    pub fn orient(&mut self) -> Result<()> {
        let aux = SlaterDetAux::new(self)?;
        let cm = CenterOfMass::of(self, &aux);
        let q = quadrupole_tensor(self, &aux, &cm, Selection::All);

        let eigen = SymmetricEigen::new(q);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&i, &j| eigen.eigenvalues[i].total_cmp(&eigen.eigenvalues[j]));

        // rows of the rotation are the sorted principal axes
        let mut m = Matrix3::zeros();
        for (row, &col) in order.iter().enumerate() {
            m.set_row(row, &eigen.eigenvectors.column(col).transpose());
        }
        if m.determinant() < 0.0 {
            m.row_mut(0).neg_mut();
        }
        let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m));

        let shift = -cm.position;
        for g in self.gaussians.iter_mut() {
            g.translate(&shift);
            g.rotate(&rot);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observables::angular_momentum::AngularMomentum;
    use crate::slater::test_dets::four_nucleons;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize() {
        let mut det = four_nucleons();
        det.normalize().unwrap();
        let aux = SlaterDetAux::new(&det).unwrap();
        assert_relative_eq!(aux.determinant().re, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_move_boost_centres_the_state() {
        let mut det = four_nucleons();
        det.move_boost().unwrap();
        let aux = SlaterDetAux::new(&det).unwrap();
        let cm = CenterOfMass::of(&det, &aux);
        assert_relative_eq!(cm.position.norm(), 0.0, epsilon = 1e-10);
        assert_relative_eq!(cm.velocity.norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_orient_diagonalises_quadrupole() {
        let mut det = four_nucleons();
        let before = {
            let aux = SlaterDetAux::new(&det).unwrap();
            let cm = CenterOfMass::of(&det, &aux);
            AngularMomentum::j2(cm).value(&det, &aux)
        };
        det.orient().unwrap();

        let aux = SlaterDetAux::new(&det).unwrap();
        let cm = CenterOfMass::of(&det, &aux);
        assert_relative_eq!(cm.position.norm(), 0.0, epsilon = 1e-9);

        let q = quadrupole_tensor(&det, &aux, &cm, Selection::All);
        assert_relative_eq!(q[(0, 1)], 0.0, epsilon = 1e-9);
        assert_relative_eq!(q[(0, 2)], 0.0, epsilon = 1e-9);
        assert_relative_eq!(q[(1, 2)], 0.0, epsilon = 1e-9);
        assert!(q[(0, 0)] <= q[(1, 1)] + 1e-9 && q[(1, 1)] <= q[(2, 2)] + 1e-9);

        // rotations leave J² alone
        let after = AngularMomentum::j2(cm).value(&det, &aux);
        assert_relative_eq!(after, before, epsilon = 1e-8, max_relative = 1e-8);
    }
}
