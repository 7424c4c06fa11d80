//! Single-particle Gaussian wave packets.
//!
//! ⟨x|q⟩ = exp(-(x - b)² / (2a)) |χ⟩ |ξ⟩ with complex width `a` and complex
//! centre `b = r + i a p`, which encodes both position and momentum.

use nalgebra::{UnitQuaternion, Vector3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Complex 3-vector used for positions, momenta and spin matrix elements.
pub type CVec3 = Vector3<Complex64>;

pub(crate) const I: Complex64 = Complex64::new(0.0, 1.0);

/// Promote a real vector to a complex one.
pub fn complexify(v: &Vector3<f64>) -> CVec3 {
    v.map(Complex64::from)
}

/// Isospin projection of a nucleon, serialised as +1 (proton) / -1 (neutron).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(into = "i8", try_from = "i8")]
pub enum Isospin {
    Proton,
    Neutron,
}

impl From<Isospin> for i8 {
    fn from(xi: Isospin) -> i8 {
        match xi {
            Isospin::Proton => 1,
            Isospin::Neutron => -1,
        }
    }
}

impl TryFrom<i8> for Isospin {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Isospin::Proton),
            -1 => Ok(Isospin::Neutron),
            other => Err(format!("isospin must be +1 or -1, got {other}")),
        }
    }
}

/// Which nucleons an observable runs over.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    Protons,
    Neutrons,
}

impl Selection {
    pub fn contains(&self, xi: Isospin) -> bool {
        match self {
            Selection::All => true,
            Selection::Protons => xi == Isospin::Proton,
            Selection::Neutrons => xi == Isospin::Neutron,
        }
    }

    /// 1.0 for selected nucleons, 0.0 otherwise.
    pub fn weight(&self, xi: Isospin) -> f64 {
        if self.contains(xi) {
            1.0
        } else {
            0.0
        }
    }

    /// Short tag used in labels and on the command line (`E:` charge, `N:` neutron).
    pub fn tag(&self) -> &'static str {
        match self {
            Selection::All => "M",
            Selection::Protons => "E",
            Selection::Neutrons => "N",
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Selection::All => "matter",
            Selection::Protons => "proton",
            Selection::Neutrons => "neutron",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" | "matter" | "all" => Ok(Selection::All),
            "E" | "proton" | "protons" => Ok(Selection::Protons),
            "N" | "neutron" | "neutrons" => Ok(Selection::Neutrons),
            other => Err(format!("unknown selection `{other}`")),
        }
    }
}

/// Gaussian wave packet with spin and isospin.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Gaussian {
    /// Isospin label
    pub xi: Isospin,
    /// Spinor components (up, down)
    pub chi: [Complex64; 2],
    /// Complex width
    pub a: Complex64,
    /// Complex centre b = r + i a p
    pub b: CVec3,
}

impl Gaussian {
    pub fn new(xi: Isospin, chi: [Complex64; 2], a: Complex64, b: CVec3) -> Self {
        Self { xi, chi, a, b }
    }

    /// Wave packet centred at `r` in phase space with mean momentum `p`.
    pub fn from_phase_space(
        xi: Isospin,
        chi: [Complex64; 2],
        a: Complex64,
        r: Vector3<f64>,
        p: Vector3<f64>,
    ) -> Self {
        let b = complexify(&r) + complexify(&p) * (I * a);
        Self { xi, chi, a, b }
    }

    /// Mean position Re(a* b) / Re(a).
    pub fn mean_position(&self) -> Vector3<f64> {
        self.b.map(|bk| (self.a.conj() * bk).re / self.a.re)
    }

    /// Mean momentum Im(b) / Re(a).
    pub fn mean_momentum(&self) -> Vector3<f64> {
        self.b.map(|bk| bk.im / self.a.re)
    }

    pub fn translate(&mut self, d: &Vector3<f64>) {
        self.b += complexify(d);
    }

    /// Multiply by exp(i k·x); the constant phase/norm factor is dropped.
    pub fn boost(&mut self, k: &Vector3<f64>) {
        self.b += complexify(k) * (I * self.a);
    }

    pub fn scale_spin(&mut self, factor: f64) {
        for c in self.chi.iter_mut() {
            *c *= factor;
        }
    }

    /// Rotate about the origin, spatially and in spin space.
    pub fn rotate(&mut self, rot: &UnitQuaternion<f64>) {
        let re = rot * self.b.map(|c| c.re);
        let im = rot * self.b.map(|c| c.im);
        self.b = re.zip_map(&im, Complex64::new);

        // U = w - i (x σx + y σy + z σz)
        let q = rot.quaternion();
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);
        let [c0, c1] = self.chi;
        self.chi = [
            Complex64::new(w, -z) * c0 + Complex64::new(-y, -x) * c1,
            Complex64::new(y, -x) * c0 + Complex64::new(w, z) * c1,
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn up() -> [Complex64; 2] {
        [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)]
    }

    #[test]
    fn test_phase_space_round_trip() {
        let r = Vector3::new(0.3, -1.2, 2.0);
        let p = Vector3::new(0.1, 0.0, -0.4);
        let g = Gaussian::from_phase_space(Isospin::Proton, up(), Complex64::new(1.7, 0.4), r, p);
        let r2 = g.mean_position();
        let p2 = g.mean_momentum();
        for k in 0..3 {
            assert_relative_eq!(r2[k], r[k], epsilon = 1e-12);
            assert_relative_eq!(p2[k], p[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_translate_and_boost_shift_phase_space() {
        let mut g = Gaussian::from_phase_space(
            Isospin::Neutron,
            up(),
            Complex64::new(2.0, -0.3),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::zeros(),
        );
        g.translate(&Vector3::new(-1.0, 0.5, 0.0));
        g.boost(&Vector3::new(0.0, 0.0, 0.2));
        let r = g.mean_position();
        let p = g.mean_momentum();
        assert_relative_eq!(r.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(r.y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_turns_spin_and_position() {
        // spin along +x, packet on the x axis; a quarter turn about z moves both to +y
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let chi = [Complex64::new(s, 0.0), Complex64::new(s, 0.0)];
        let mut g = Gaussian::from_phase_space(
            Isospin::Proton,
            chi,
            Complex64::new(1.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::zeros(),
        );
        g.rotate(&UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2));
        let r = g.mean_position();
        assert_relative_eq!(r.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(r.y, 1.0, epsilon = 1e-12);

        let [c0, c1] = g.chi;
        let sx = 2.0 * (c0.conj() * c1).re;
        let sy = 2.0 * (c0.conj() * c1).im;
        assert_relative_eq!(sx, 0.0, epsilon = 1e-12);
        assert_relative_eq!(sy, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_isospin_serde() {
        let yaml = serde_yaml::to_string(&Isospin::Neutron).unwrap();
        assert_eq!(yaml.trim(), "-1");
        let xi: Isospin = serde_yaml::from_str("1").unwrap();
        assert_eq!(xi, Isospin::Proton);
        assert!(serde_yaml::from_str::<Isospin>("0").is_err());
    }
}
