//! Intrinsic Hamiltonian: kinetic energy minus the centre-of-mass kinetic
//! energy, plus a sum of central and spin-spin Gaussian potentials.
//!
//!   H = Σ_i p_i² / 2m_i - P² / 2M + Σ_{i<j} Σ_t V_t exp(-κ_t r_ij²) (c_t + s_t σ_i·σ_j)
//!
//! Strengths are given in MeV and converted to fm⁻¹ on construction.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::gaussian::{Gaussian, GaussianAux, GradGaussian, GradGaussianAux, GradSlaterDet};
use crate::operator::{
    grad_ob_partial, grad_tb_partial, ob_me, ob_me_od, tb_me, tb_me_od, GradOneBodyOperator,
    GradTwoBodyOperator, OneBodyOperator, OpValue, PartialGradient, TwoBodyOperator,
};
use crate::physics::{from_mev, mass, to_mev};
use crate::slater::{GradSlaterDetAux, SlaterDet, SlaterDetAux};

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

/// V exp(-κ r²) (central + spin_spin σ·σ)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GaussianTerm {
    /// MeV
    pub strength: f64,
    /// fm⁻²
    pub kappa: f64,
    #[serde(default = "one")]
    pub central: f64,
    #[serde(default)]
    pub spin_spin: f64,
}

/// Nuclear interaction read from an interaction file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Interaction {
    pub name: String,
    /// Subtract the centre-of-mass kinetic energy.
    #[serde(default = "yes")]
    pub subtract_cm: bool,
    #[serde(default)]
    pub terms: Vec<GaussianTerm>,
}

impl Interaction {
    /// Minnesota potential in its Wigner form (exchange mixture u = 2), spin
    /// channels projected with σ·σ.
    pub fn minnesota() -> Self {
        Self {
            name: "minnesota".to_string(),
            subtract_cm: true,
            terms: vec![
                GaussianTerm {
                    strength: 200.0,
                    kappa: 1.487,
                    central: 1.0,
                    spin_spin: 0.0,
                },
                // triplet: (3 + σσ)/4
                GaussianTerm {
                    strength: -178.0,
                    kappa: 0.639,
                    central: 0.75,
                    spin_spin: 0.25,
                },
                // singlet: (1 - σσ)/4
                GaussianTerm {
                    strength: -91.85,
                    kappa: 0.465,
                    central: 0.25,
                    spin_spin: -0.25,
                },
            ],
        }
    }

    /// Kinetic term only, useful for tests and free motion.
    pub fn free(subtract_cm: bool) -> Self {
        Self {
            name: "free".to_string(),
            subtract_cm,
            terms: vec![],
        }
    }
}

/// One-body kinetic energy, reduced by the one-body part of T_cm.
#[derive(Debug, Clone, Copy)]
pub struct KineticEnergy {
    cm_coefficient: f64,
}

impl KineticEnergy {
    pub fn new(total_mass: f64, subtract_cm: bool) -> Self {
        let cm_coefficient = if subtract_cm { 0.5 / total_mass } else { 0.0 };
        Self { cm_coefficient }
    }

    fn coefficient(&self, g: &Gaussian) -> f64 {
        0.5 / mass(g.xi) - self.cm_coefficient
    }
}

impl OneBodyOperator<1> for KineticEnergy {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<1> {
        let p2 = x.pi.dot(&x.pi) + x.lambda * 3.0;
        OpValue::<1>::new(p2 * x.q * self.coefficient(g1))
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradOneBodyOperator for KineticEnergy {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        _g2: &Gaussian,
        x: &GaussianAux,
        dx: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let c = self.coefficient(g1);
        let p2 = x.pi.dot(&x.pi) + x.lambda * 3.0;
        let dp2a = x.pi.dot(&dx.dpi.a) * 2.0 + dx.dlambda * 3.0;
        let dp2b = x.pi * (dx.dpi.b * 2.0);
        let grad = GradGaussian::new(
            dp2a * x.q + p2 * dx.dq.a,
            dp2b * x.q + dx.dq.b * p2,
            [p2 * dx.dq.chi[0], p2 * dx.dq.chi[1]],
        ) * c;
        (p2 * x.q * c, grad)
    }
}

/// Two-body part of -P²/2M: -Σ_{i≠j} p_i·p_j / 2M.
#[derive(Debug, Clone, Copy)]
pub struct CmKineticEnergy {
    coefficient: f64,
}

impl CmKineticEnergy {
    pub fn new(total_mass: f64) -> Self {
        Self {
            coefficient: -0.5 / total_mass,
        }
    }
}

impl TwoBodyOperator<1> for CmKineticEnergy {
    fn evaluate(
        &self,
        _g1: &Gaussian,
        _g2: &Gaussian,
        _g3: &Gaussian,
        _g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
    ) -> OpValue<1> {
        OpValue::<1>::new(x13.pi.dot(&x24.pi) * x13.q * x24.q * self.coefficient)
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradTwoBodyOperator for CmKineticEnergy {
    fn evaluate_gradient(
        &self,
        _g1: &Gaussian,
        _g2: &Gaussian,
        _g3: &Gaussian,
        _g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
        dx13: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let pp = x13.pi.dot(&x24.pi);
        let c = x24.q * self.coefficient;
        let grad = GradGaussian::new(
            dx13.dpi.a.dot(&x24.pi) * x13.q + pp * dx13.dq.a,
            x24.pi * (dx13.dpi.b * x13.q) + dx13.dq.b * pp,
            [pp * dx13.dq.chi[0], pp * dx13.dq.chi[1]],
        ) * c;
        (pp * x13.q * c, grad)
    }
}

/// Sum of Gaussian potential terms, internal units.
#[derive(Debug, Clone)]
pub struct GaussianPotential {
    /// (V in fm⁻¹, κ, central, spin-spin)
    terms: Vec<(f64, f64, f64, f64)>,
}

impl GaussianPotential {
    pub fn new(interaction: &Interaction) -> Self {
        let terms = interaction
            .terms
            .iter()
            .map(|t| (from_mev(t.strength), t.kappa, t.central, t.spin_spin))
            .collect();
        Self { terms }
    }

    /// ½ Σ_t V_t g_t R₁₃ R₂₄ (c_t S₁₃ S₂₄ + s_t sig₁₃·sig₂₄) without the isospin factor.
    fn kernel(&self, x13: &GaussianAux, x24: &GaussianAux) -> Complex64 {
        let rr = x13.r * x24.r;
        let ss = x13.s * x24.s;
        let sigsig = x13.sig.dot(&x24.sig);
        let rho = x13.rho - x24.rho;
        let rho2 = rho.dot(&rho);
        let alpha = x13.alpha + x24.alpha;

        let mut v = Complex64::new(0.0, 0.0);
        for &(v0, kappa, central, spin_spin) in &self.terms {
            let d = alpha * (2.0 * kappa) + 1.0;
            let g = d.powf(-1.5) * (-kappa * rho2 / d).exp();
            v += g * (ss * central + sigsig * spin_spin) * (0.5 * v0);
        }
        v * rr
    }
}

impl TwoBodyOperator<1> for GaussianPotential {
    fn evaluate(
        &self,
        _g1: &Gaussian,
        _g2: &Gaussian,
        _g3: &Gaussian,
        _g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
    ) -> OpValue<1> {
        let tt = x13.t * x24.t;
        if tt == 0.0 {
            return OpValue::<1>::zeros();
        }
        OpValue::<1>::new(self.kernel(x13, x24) * tt)
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradTwoBodyOperator for GaussianPotential {
    fn evaluate_gradient(
        &self,
        _g1: &Gaussian,
        _g2: &Gaussian,
        _g3: &Gaussian,
        _g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
        dx13: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let tt = x13.t * x24.t;
        if tt == 0.0 {
            return (Complex64::new(0.0, 0.0), GradGaussian::zero());
        }

        let rr = x13.r * x24.r;
        let ss = x13.s * x24.s;
        let sigsig = x13.sig.dot(&x24.sig);
        let rho = x13.rho - x24.rho;
        let rho2 = rho.dot(&rho);
        let alpha = x13.alpha + x24.alpha;

        let mut value = Complex64::new(0.0, 0.0);
        let mut grad = GradGaussian::zero();
        for &(v0, kappa, central, spin_spin) in &self.terms {
            let d = alpha * (2.0 * kappa) + 1.0;
            let g = d.powf(-1.5) * (-kappa * rho2 / d).exp();
            let dga = g
                * ((-3.0 * kappa / d + 2.0 * kappa * kappa * rho2 / (d * d)) * dx13.dalpha
                    - (2.0 * kappa / d) * rho.dot(&dx13.drho.a));
            let dgb = rho * (g * (-2.0 * kappa / d) * dx13.drho.b);

            let spin = ss * central + sigsig * spin_spin;
            let dspin = [
                dx13.ds[0] * x24.s * central + dx13.dsig[0].dot(&x24.sig) * spin_spin,
                dx13.ds[1] * x24.s * central + dx13.dsig[1].dot(&x24.sig) * spin_spin,
            ];

            let f = 0.5 * v0;
            value += g * spin * rr * f;
            grad += GradGaussian::new(
                (dga * rr + g * dx13.dr.a * x24.r) * spin,
                (dgb * rr + dx13.dr.b * (g * x24.r)) * spin,
                [g * rr * dspin[0], g * rr * dspin[1]],
            ) * f;
        }
        (value * tt, grad * tt)
    }
}

/// Energies of a determinant, in MeV.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Energies {
    pub kinetic: f64,
    pub potential: f64,
    pub total: f64,
}

/// The Hamiltonian of an interaction for a fixed nucleus.
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    kinetic: KineticEnergy,
    cm_kinetic: Option<CmKineticEnergy>,
    potential: GaussianPotential,
}

impl Hamiltonian {
    pub fn new(interaction: &Interaction, det: &SlaterDet) -> Self {
        let total_mass = det.total_mass();
        Self {
            kinetic: KineticEnergy::new(total_mass, interaction.subtract_cm),
            cm_kinetic: interaction
                .subtract_cm
                .then(|| CmKineticEnergy::new(total_mass)),
            potential: GaussianPotential::new(interaction),
        }
    }

    pub fn energies(&self, det: &SlaterDet, aux: &SlaterDetAux) -> Energies {
        let mut kinetic = ob_me::<1, _>(det, aux, &self.kinetic)[0].re;
        if let Some(cm) = &self.cm_kinetic {
            kinetic += tb_me::<1, _>(det, aux, cm)[0].re;
        }
        let potential = tb_me::<1, _>(det, aux, &self.potential)[0].re;
        Energies {
            kinetic: to_mev(kinetic),
            potential: to_mev(potential),
            total: to_mev(kinetic + potential),
        }
    }

    /// Total energy in fm⁻¹.
    pub fn energy(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        let mut e = ob_me::<1, _>(det, aux, &self.kinetic)[0] + tb_me::<1, _>(det, aux, &self.potential)[0];
        if let Some(cm) = &self.cm_kinetic {
            e += tb_me::<1, _>(det, aux, cm)[0];
        }
        e.re
    }

    /// ⟨B|H|K⟩ / ⟨B|K⟩ in fm⁻¹, `aux` built from (bra, ket).
    pub fn energy_od(&self, bra: &SlaterDet, ket: &SlaterDet, aux: &SlaterDetAux) -> Complex64 {
        let mut e = ob_me_od::<1, _>(bra, ket, aux, &self.kinetic)[0]
            + tb_me_od::<1, _>(bra, ket, aux, &self.potential)[0];
        if let Some(cm) = &self.cm_kinetic {
            e += tb_me_od::<1, _>(bra, ket, aux, cm)[0];
        }
        e
    }

    /// Energy gradient contributions of the bra rows in `rows`.
    pub fn partial_gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
        rows: &[usize],
    ) -> PartialGradient {
        let mut acc = grad_ob_partial(det, det, aux, daux, &self.kinetic, rows);
        acc += grad_tb_partial(det, det, aux, daux, &self.potential, rows);
        if let Some(cm) = &self.cm_kinetic {
            acc += grad_tb_partial(det, det, aux, daux, cm, rows);
        }
        acc
    }

    /// Energy (fm⁻¹) and its gradient.
    pub fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        let rows: Vec<usize> = (0..det.len()).collect();
        self.partial_gradient(det, aux, daux, &rows).finish(aux, daux)
    }
}
