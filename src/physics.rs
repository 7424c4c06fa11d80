//! Physical constants and unit conventions.
//!
//! Lengths are in fm, momenta and energies in fm⁻¹ (ħ = c = 1). Energies are
//! converted to MeV with [`HBAR_C`] only for reporting.

use crate::gaussian::Isospin;

/// ħc in MeV·fm
pub const HBAR_C: f64 = 197.3269804;
/// MeV/c²
pub const M_PROTON: f64 = 938.272046;
/// MeV/c²
pub const M_NEUTRON: f64 = 939.565378;

/// Nucleon mass in fm⁻¹.
pub fn mass(xi: Isospin) -> f64 {
    match xi {
        Isospin::Proton => M_PROTON / HBAR_C,
        Isospin::Neutron => M_NEUTRON / HBAR_C,
    }
}

/// Energy in fm⁻¹ to MeV.
pub fn to_mev(e: f64) -> f64 {
    HBAR_C * e
}

/// Energy in MeV to fm⁻¹.
pub fn from_mev(e: f64) -> f64 {
    e / HBAR_C
}
