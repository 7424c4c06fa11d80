//! Energy minimisation of a Slater determinant under constraints.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constraint::{build_constraints, Constraint, ConstraintSpec};
use crate::error::{FmdError, Result};
use crate::observables::{Hamiltonian, Interaction};
use crate::parallel::ExecutionContext;
use crate::parameterization::{shake, FmdParameterization, Parameterization};
use crate::slater::{GradSlaterDetAux, SlaterDet, SlaterDetAux};

use super::solver::{AugmentedLagrangian, ConstrainedProblem, Evaluation, NonlinearSolver};

fn yes() -> bool {
    true
}

/// Run file for `minimize`; every field has a default.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MinimizerConfig {
    /// Cap on the accepted solver steps
    pub max_steps: usize,
    pub max_outer: usize,
    pub gtol: f64,
    pub ctol: f64,
    pub memory: usize,
    pub max_step: f64,
    /// Log every `log_every` steps
    pub log_every: usize,
    /// Width of the noise added to the parameters before minimising
    pub shake: Option<f64>,
    pub seed: Option<u64>,
    /// Put the centre of mass at rest in the origin before minimising and
    /// orient the result along its principal axes.
    #[serde(default = "yes")]
    pub recenter: bool,
    /// Report the minimised state even if its energy is higher.
    pub overwrite: bool,
    pub workers: usize,
    pub constraints: Vec<ConstraintSpec>,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        let solver = AugmentedLagrangian::default();
        Self {
            max_steps: solver.max_steps,
            max_outer: solver.max_outer,
            gtol: solver.gtol,
            ctol: solver.ctol,
            memory: solver.memory,
            max_step: solver.max_step,
            log_every: solver.log_every,
            shake: None,
            seed: None,
            recenter: true,
            overwrite: false,
            workers: 1,
            constraints: vec![],
        }
    }
}

impl MinimizerConfig {
    pub fn solver(&self) -> AugmentedLagrangian {
        AugmentedLagrangian::new()
            .with_max_steps(self.max_steps)
            .with_max_outer(self.max_outer)
            .with_max_inner(self.max_steps)
            .with_gtol(self.gtol)
            .with_ctol(self.ctol)
            .with_memory(self.memory)
            .with_max_step(self.max_step)
            .with_log_every(self.log_every)
    }
}

/// Energy and constraints as functions of the real parameters.
pub struct FmdProblem<'a> {
    parameterization: &'a dyn Parameterization,
    hamiltonian: Hamiltonian,
    constraints: &'a [Box<dyn Constraint>],
    context: &'a ExecutionContext,
}

impl<'a> FmdProblem<'a> {
    pub fn new(
        interaction: &Interaction,
        template: &SlaterDet,
        parameterization: &'a dyn Parameterization,
        constraints: &'a [Box<dyn Constraint>],
        context: &'a ExecutionContext,
    ) -> Self {
        Self {
            parameterization,
            hamiltonian: Hamiltonian::new(interaction, template),
            constraints,
            context,
        }
    }
}

impl ConstrainedProblem for FmdProblem<'_> {
    fn dimension(&self) -> usize {
        self.parameterization.num_params()
    }

    fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation> {
        let det = self.parameterization.to_slater_det(x)?;
        let aux = SlaterDetAux::new(&det)?;
        let daux = GradSlaterDetAux::diagonal(&det, &aux);

        let energy = self
            .context
            .energy_gradient(&self.hamiltonian, x, &det, &aux, &daux)?;

        let mut constraints = Vec::with_capacity(self.constraints.len());
        let mut constraint_gradients = Vec::with_capacity(self.constraints.len());
        for c in self.constraints {
            let grad = c.gradient(&det, &aux, &daux);
            constraints.push(grad.value.re - c.target());
            constraint_gradients.push(self.parameterization.real_gradient(&grad));
        }

        Ok(Evaluation {
            objective: energy.value.re,
            objective_gradient: self.parameterization.real_gradient(&energy),
            constraints,
            constraint_gradients,
        })
    }

    fn is_admissible(&self, x: &[f64]) -> bool {
        self.parameterization.is_admissible(x)
    }
}

/// Target and achieved value of one constraint, in reported units.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConstraintReport {
    pub label: String,
    pub target: f64,
    pub achieved: f64,
}

#[derive(Debug, Clone)]
pub struct MinimizationOutcome {
    /// The state to report: minimised, or the initial one if that was better.
    pub det: SlaterDet,
    /// The minimised state, whatever its energy.
    pub minimized: SlaterDet,
    /// MeV
    pub e_initial: f64,
    /// MeV, energy of the minimised state
    pub e_final: f64,
    pub converged: bool,
    /// The minimised state had a higher energy and was discarded.
    pub kept_initial: bool,
    pub iterations: usize,
    pub evaluations: usize,
    pub constraints: Vec<ConstraintReport>,
}

/// Whether the initial state is reported instead of the minimised one.
pub fn keep_initial(overwrite: bool, e_initial: f64, e_final: f64) -> bool {
    !overwrite && e_final > e_initial
}

/// Relocate and orient (if `recenter`) and normalise a state for output.
fn finalize(mut det: SlaterDet, recenter: bool) -> Result<SlaterDet> {
    if recenter {
        det.move_boost()?;
        det.orient()?;
    }
    det.normalize()?;
    Ok(det)
}

/// Shaken starting points drawn before giving up.
pub const MAX_SHAKE_DRAWS: usize = 100;

/// Add noise of width `magnitude` to `x0`, redrawing until the shaken
/// parameters describe an admissible, non-degenerate determinant.
pub fn shaken_start<R: Rng + ?Sized>(
    parameterization: &dyn Parameterization,
    x0: &[f64],
    magnitude: f64,
    rng: &mut R,
) -> Result<Vec<f64>> {
    for draw in 1..=MAX_SHAKE_DRAWS {
        let mut x = x0.to_vec();
        shake(&mut x, magnitude, rng)?;
        if !parameterization.is_admissible(&x) {
            continue;
        }
        let det = parameterization.to_slater_det(&x)?;
        match SlaterDetAux::new(&det) {
            Ok(_) => {
                if draw > 1 {
                    info!("shaken start accepted after {draw} draws");
                }
                return Ok(x);
            }
            Err(e) if e.is_degenerate() => continue,
            Err(e) => return Err(e),
        }
    }
    Err(FmdError::input(
        "shake",
        format!(
            "no admissible starting point in {MAX_SHAKE_DRAWS} draws of magnitude {magnitude}, \
             use a smaller shake"
        ),
    ))
}

fn energy(interaction: &Interaction, det: &SlaterDet) -> Result<f64> {
    let aux = SlaterDetAux::new(det)?;
    Ok(Hamiltonian::new(interaction, det).energies(det, &aux).total)
}

pub struct Minimizer {
    config: MinimizerConfig,
}

impl Minimizer {
    pub fn new(config: MinimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MinimizerConfig {
        &self.config
    }

    pub fn run(
        &self,
        interaction: &Interaction,
        initial: &SlaterDet,
        context: &ExecutionContext,
    ) -> Result<MinimizationOutcome> {
        let config = &self.config;
        let e_initial = energy(interaction, initial)?;

        let mut det = initial.clone();
        if config.recenter {
            det.move_boost()?;
        }

        let parameterization: Arc<dyn Parameterization> = Arc::new(FmdParameterization::new(&det));
        let mut x0 = parameterization.from_slater_det(&det);
        if let Some(magnitude) = config.shake {
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            x0 = shaken_start(parameterization.as_ref(), &x0, magnitude, &mut rng)?;
        }

        let constraints = build_constraints(&config.constraints);
        info!(
            "minimizing {} with {} parameters, {} constraints, interaction {}",
            det.name,
            parameterization.num_params(),
            constraints.len(),
            interaction.name
        );
        for spec in &config.constraints {
            info!("constraint: {spec}");
        }

        context.start(interaction, parameterization.clone())?;
        let mut problem = FmdProblem::new(
            interaction,
            &det,
            parameterization.as_ref(),
            &constraints,
            context,
        );
        let report = config.solver().solve(&mut problem, x0)?;

        let minimized = finalize(parameterization.to_slater_det(&report.x)?, config.recenter)?;
        let e_final = energy(interaction, &minimized)?;

        let kept_initial = keep_initial(config.overwrite, e_initial, e_final);
        if kept_initial {
            warn!(
                "minimized energy {e_final:.4} MeV above initial {e_initial:.4} MeV, keeping initial state"
            );
        }
        let det = if kept_initial {
            finalize(initial.clone(), config.recenter)?
        } else {
            minimized.clone()
        };

        let aux = SlaterDetAux::new(&det)?;
        let constraints = constraints
            .iter()
            .map(|c| ConstraintReport {
                label: c.label().to_string(),
                target: c.output(c.target()),
                achieved: c.output(c.value(&det, &aux)),
            })
            .collect();

        info!(
            "energy {e_initial:.6} MeV -> {e_final:.6} MeV after {} steps",
            report.iterations
        );

        Ok(MinimizationOutcome {
            det,
            minimized,
            e_initial,
            e_final,
            converged: report.converged,
            kept_initial,
            iterations: report.iterations,
            evaluations: report.evaluations,
            constraints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::{Gaussian, Isospin};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use num_complex::Complex64;

    /// Four nucleons in one 0s packet of width `a`, displaced and moving.
    fn alpha(a: f64) -> SlaterDet {
        let up = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        let down = [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)];
        let r = Vector3::new(0.4, -0.2, 0.3);
        let p = Vector3::new(0.05, 0.0, -0.02);
        let g = |xi, chi| Gaussian::from_phase_space(xi, chi, Complex64::new(a, 0.0), r, p);
        SlaterDet::new(
            "alpha",
            vec![
                g(Isospin::Proton, up),
                g(Isospin::Proton, down),
                g(Isospin::Neutron, up),
                g(Isospin::Neutron, down),
            ],
        )
    }

    #[test]
    fn test_keep_initial_policy() {
        assert!(keep_initial(false, -10.0, -5.0));
        assert!(!keep_initial(true, -10.0, -5.0));
        assert!(!keep_initial(false, -10.0, -12.0));
        assert!(!keep_initial(false, -10.0, -10.0));
    }

    #[test]
    fn test_config_defaults_from_yaml() {
        let config: MinimizerConfig = serde_yaml::from_str(
            "
max_steps: 50
constraints:
  - kind: center_of_mass
",
        )
        .unwrap();
        assert_eq!(config.max_steps, 50);
        assert!(config.recenter);
        assert!(!config.overwrite);
        assert_eq!(config.constraints, vec![ConstraintSpec::CenterOfMass]);
        assert_eq!(config.memory, AugmentedLagrangian::default().memory);
    }

    #[test]
    fn test_problem_gradient_matches_finite_differences() {
        let det = crate::slater::test_dets::four_nucleons();
        let interaction = Interaction::minnesota();
        let param = FmdParameterization::new(&det);
        let constraints = build_constraints(&[
            ConstraintSpec::CenterOfMass,
            ConstraintSpec::J2 { value: 2.0 },
        ]);
        let context = ExecutionContext::serial();
        let mut problem = FmdProblem::new(&interaction, &det, &param, &constraints, &context);
        assert_eq!(problem.dimension(), 48);
        assert_eq!(problem.num_constraints(), 2);

        let x0 = param.from_slater_det(&det);
        let eval = problem.evaluate(&x0).unwrap();
        let h = 1e-5;
        for i in [0, 3, 7, 10, 13, 30, 47] {
            let mut fwd = x0.clone();
            let mut bwd = x0.clone();
            fwd[i] += h;
            bwd[i] -= h;
            let ef = problem.evaluate(&fwd).unwrap();
            let eb = problem.evaluate(&bwd).unwrap();
            let de = (ef.objective - eb.objective) / (2.0 * h);
            assert_relative_eq!(eval.objective_gradient[i], de, epsilon = 1e-6, max_relative = 1e-5);
            for j in 0..2 {
                let dc = (ef.constraints[j] - eb.constraints[j]) / (2.0 * h);
                assert_relative_eq!(
                    eval.constraint_gradients[j][i],
                    dc,
                    epsilon = 1e-6,
                    max_relative = 1e-5
                );
            }
        }
    }

    #[test]
    fn test_center_of_mass_constraint_is_satisfied() {
        let interaction = Interaction::minnesota();
        let config = MinimizerConfig {
            recenter: false,
            overwrite: true,
            max_steps: 2000,
            constraints: vec![ConstraintSpec::CenterOfMass],
            ..MinimizerConfig::default()
        };
        let initial = alpha(2.0);
        let outcome = Minimizer::new(config)
            .run(&interaction, &initial, &ExecutionContext::serial())
            .unwrap();
        assert_eq!(outcome.constraints.len(), 1);
        assert_eq!(outcome.constraints[0].label, "CM");
        assert!(outcome.converged);
        assert!(outcome.constraints[0].achieved < 1e-5);
        assert!(outcome.e_final <= outcome.e_initial + 1e-6);
        assert!(!outcome.kept_initial);
    }

    #[test]
    fn test_shaken_start_is_admissible() {
        let det = crate::slater::test_dets::four_nucleons();
        let param = FmdParameterization::new(&det);
        let x0 = param.from_slater_det(&det);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            let x = shaken_start(&param, &x0, 3.0, &mut rng).unwrap();
            assert!(param.is_admissible(&x));
            assert!(SlaterDetAux::new(&param.to_slater_det(&x).unwrap()).is_ok());
        }

        // every draw lands at negative widths
        let err = shaken_start(&param, &vec![-1e3; x0.len()], 1e-3, &mut rng).unwrap_err();
        assert!(err.to_string().contains("shake"));
    }

    #[test]
    fn test_large_shake_starts_from_valid_state() {
        let interaction = Interaction::minnesota();
        let config = MinimizerConfig {
            max_steps: 3,
            shake: Some(3.0),
            seed: Some(1),
            ..MinimizerConfig::default()
        };
        let initial = crate::slater::test_dets::four_nucleons();
        let outcome = Minimizer::new(config)
            .run(&interaction, &initial, &ExecutionContext::serial())
            .unwrap();
        assert!(outcome.e_final.is_finite());
    }

    #[test]
    fn test_higher_energy_keeps_initial_state() {
        let interaction = Interaction::minnesota();
        let config = MinimizerConfig {
            max_steps: 300,
            constraints: vec![ConstraintSpec::Radius {
                selection: crate::gaussian::Selection::All,
                value: 3.5,
            }],
            ..MinimizerConfig::default()
        };
        let initial = alpha(2.0);
        let outcome = Minimizer::new(config.clone())
            .run(&interaction, &initial, &ExecutionContext::serial())
            .unwrap();
        assert!(outcome.e_final > outcome.e_initial);
        assert!(outcome.kept_initial);
        assert_ne!(outcome.det, outcome.minimized);
        let reported = energy(&interaction, &outcome.det).unwrap();
        assert_relative_eq!(reported, outcome.e_initial, max_relative = 1e-8);

        let overwrite = MinimizerConfig {
            overwrite: true,
            ..config
        };
        let outcome = Minimizer::new(overwrite)
            .run(&interaction, &initial, &ExecutionContext::serial())
            .unwrap();
        assert!(!outcome.kept_initial);
        assert_eq!(outcome.det, outcome.minimized);
    }

    #[test]
    fn test_threaded_run_matches_serial() {
        let interaction = Interaction::minnesota();
        let config = MinimizerConfig {
            max_steps: 5,
            seed: Some(3),
            shake: Some(0.05),
            ..MinimizerConfig::default()
        };
        let initial = alpha(2.5);
        let serial = Minimizer::new(config.clone())
            .run(&interaction, &initial, &ExecutionContext::serial())
            .unwrap();
        let context = ExecutionContext::with_workers(2).unwrap();
        let threaded = Minimizer::new(config)
            .run(&interaction, &initial, &context)
            .unwrap();
        context.finish().unwrap();
        assert_relative_eq!(serial.e_final, threaded.e_final, max_relative = 1e-8);
        assert_eq!(serial.iterations, threaded.iterations);
    }
}
