//! Equality constraints for variation after projection-free minimisation.

pub mod kinds;
pub mod traits;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use kinds::{
    AngularMomentumConstraint, AngularMomentumKind, CenterOfMassConstraint, DipoleConstraint,
    IsospinConstraint, OctupoleConstraint, QuadrupoleConstraint, RadiusConstraint,
    SpinOrbitConstraint,
};
pub use traits::{Constraint, OffDiagonalConstraint};

use crate::error::{FmdError, Result};
use crate::gaussian::Selection;

/// Constraint as written in run files and on the command line.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintSpec {
    CenterOfMass,
    J2 {
        value: f64,
    },
    L2 {
        value: f64,
    },
    S2 {
        value: f64,
    },
    /// Σ l·s
    Ls {
        value: f64,
    },
    T2 {
        value: f64,
    },
    Radius {
        #[serde(default)]
        selection: Selection,
        value: f64,
    },
    Dipole {
        #[serde(default)]
        selection: Selection,
        value: f64,
    },
    Quadrupole {
        #[serde(default)]
        selection: Selection,
        value: f64,
    },
    Octupole {
        #[serde(default)]
        selection: Selection,
        value: f64,
    },
}

impl ConstraintSpec {
    pub fn build(&self) -> Box<dyn Constraint> {
        match *self {
            ConstraintSpec::CenterOfMass => Box::new(CenterOfMassConstraint),
            ConstraintSpec::J2 { value } => Box::new(AngularMomentumConstraint::new(
                AngularMomentumKind::Total,
                value,
            )),
            ConstraintSpec::L2 { value } => Box::new(AngularMomentumConstraint::new(
                AngularMomentumKind::Orbital,
                value,
            )),
            ConstraintSpec::S2 { value } => Box::new(AngularMomentumConstraint::new(
                AngularMomentumKind::Spin,
                value,
            )),
            ConstraintSpec::Ls { value } => Box::new(SpinOrbitConstraint::new(value)),
            ConstraintSpec::T2 { value } => Box::new(IsospinConstraint::new(value)),
            ConstraintSpec::Radius { selection, value } => {
                Box::new(RadiusConstraint::new(selection, value))
            }
            ConstraintSpec::Dipole { selection, value } => {
                Box::new(DipoleConstraint::new(selection, value))
            }
            ConstraintSpec::Quadrupole { selection, value } => {
                Box::new(QuadrupoleConstraint::new(selection, value))
            }
            ConstraintSpec::Octupole { selection, value } => {
                Box::new(OctupoleConstraint::new(selection, value))
            }
        }
    }

    /// Off-diagonal form, about the origin of a fixed frame; only the
    /// angular momenta and T² have one.
    pub fn build_off_diagonal(&self) -> Result<Box<dyn OffDiagonalConstraint>> {
        let angular = |kind, value| -> Box<dyn OffDiagonalConstraint> {
            Box::new(AngularMomentumConstraint::new(kind, value))
        };
        match *self {
            ConstraintSpec::J2 { value } => Ok(angular(AngularMomentumKind::Total, value)),
            ConstraintSpec::L2 { value } => Ok(angular(AngularMomentumKind::Orbital, value)),
            ConstraintSpec::S2 { value } => Ok(angular(AngularMomentumKind::Spin, value)),
            ConstraintSpec::Ls { value } => Ok(Box::new(SpinOrbitConstraint::new(value))),
            ConstraintSpec::T2 { value } => Ok(Box::new(IsospinConstraint::new(value))),
            other => Err(FmdError::input(
                "constraints",
                format!("no off-diagonal form of {other}"),
            )),
        }
    }
}

impl fmt::Display for ConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSpec::CenterOfMass => write!(f, "centre of mass"),
            ConstraintSpec::J2 { value } => write!(f, "J2 = {value}"),
            ConstraintSpec::L2 { value } => write!(f, "L2 = {value}"),
            ConstraintSpec::S2 { value } => write!(f, "S2 = {value}"),
            ConstraintSpec::Ls { value } => write!(f, "LS = {value}"),
            ConstraintSpec::T2 { value } => write!(f, "T2 = {value}"),
            ConstraintSpec::Radius { selection, value } => {
                write!(f, "{selection} radius = {value} fm")
            }
            ConstraintSpec::Dipole { selection, value } => {
                write!(f, "{selection} dipole = {value} fm")
            }
            ConstraintSpec::Quadrupole { selection, value } => {
                write!(f, "{selection} quadrupole = {value} fm²")
            }
            ConstraintSpec::Octupole { selection, value } => {
                write!(f, "{selection} octupole = {value} fm³")
            }
        }
    }
}

pub fn build_constraints(specs: &[ConstraintSpec]) -> Vec<Box<dyn Constraint>> {
    specs.iter().map(ConstraintSpec::build).collect()
}

/// Parse `value`, `E:value` (protons) or `N:value` (neutrons).
pub fn parse_selected(s: &str) -> std::result::Result<(Selection, f64), String> {
    let (selection, number) = match s.split_once(':') {
        Some((tag, rest)) => (tag.parse::<Selection>()?, rest),
        None => (Selection::All, s),
    };
    let value = number
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid number `{number}`: {e}"))?;
    Ok((selection, value))
}
