//! Equality-constrained minimisation.
//!
//! The augmented Lagrangian
//!
//!   L(x) = f(x) - Σ_i λ_i c_i(x) + μ/2 Σ_i c_i(x)²
//!
//! is minimised by L-BFGS with backtracking for fixed (λ, μ); afterwards
//! λ ← λ - μ c and μ grows while the violation does not shrink fast enough.
//! Without constraints this is plain L-BFGS.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::error::Result;

/// Objective and constraint values with their gradients at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub objective: f64,
    pub objective_gradient: Vec<f64>,
    /// Residuals c_i; zero when satisfied.
    pub constraints: Vec<f64>,
    pub constraint_gradients: Vec<Vec<f64>>,
}

impl Evaluation {
    pub fn violation(&self) -> f64 {
        self.constraints.iter().fold(0.0, |m, c| m.max(c.abs()))
    }
}

/// min f(x) subject to c(x) = 0
pub trait ConstrainedProblem {
    fn dimension(&self) -> usize;

    fn num_constraints(&self) -> usize;

    /// Errors that are not degenerate states end the minimisation.
    fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation>;

    fn is_admissible(&self, _x: &[f64]) -> bool {
        true
    }
}

pub trait NonlinearSolver {
    fn solve(&self, problem: &mut dyn ConstrainedProblem, x0: Vec<f64>) -> Result<SolverReport>;
}

/// Progress after one outer iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub objective: f64,
    pub violation: f64,
    pub gradient_norm: f64,
    pub penalty: f64,
}

#[derive(Debug, Clone)]
pub struct SolverReport {
    pub x: Vec<f64>,
    pub objective: f64,
    pub constraints: Vec<f64>,
    pub multipliers: Vec<f64>,
    pub converged: bool,
    /// Accepted L-BFGS steps.
    pub iterations: usize,
    pub evaluations: usize,
    pub history: Vec<IterationRecord>,
}

/// Augmented-Lagrangian solver with an L-BFGS inner loop.
#[derive(Clone, Debug)]
pub struct AugmentedLagrangian {
    /// Maximum number of multiplier updates
    pub max_outer: usize,
    /// Maximum number of L-BFGS steps per multiplier update
    pub max_inner: usize,
    /// Cap on the accepted steps of the whole run
    pub max_steps: usize,
    /// Tolerance on |∇L|∞
    pub gtol: f64,
    /// Tolerance on max |c_i|
    pub ctol: f64,
    /// Initial penalty μ
    pub mu0: f64,
    /// Penalty growth factor
    pub mu_growth: f64,
    pub mu_max: f64,
    /// Number of stored L-BFGS correction pairs
    pub memory: usize,
    /// Largest change of a single parameter in one step
    pub max_step: f64,
    /// Armijo sufficient-decrease parameter
    pub armijo: f64,
    /// Log progress every `log_every` steps, 0 for never
    pub log_every: usize,
}

impl Default for AugmentedLagrangian {
    fn default() -> Self {
        Self {
            max_outer: 30,
            max_inner: 200,
            max_steps: 5000,
            gtol: 1e-6,
            ctol: 1e-6,
            mu0: 1.0,
            mu_growth: 10.0,
            mu_max: 1e8,
            memory: 7,
            max_step: 0.5,
            armijo: 1e-4,
            log_every: 10,
        }
    }
}

/// Smallest backtracking step before the line search gives up.
const MIN_STEP: f64 = 1e-12;

struct Point {
    x: Vec<f64>,
    eval: Evaluation,
    lagrangian: f64,
    gradient: Vec<f64>,
}

enum LineSearch {
    Accepted(Point),
    Failed,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

impl AugmentedLagrangian {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_outer(mut self, n: usize) -> Self {
        self.max_outer = n;
        self
    }

    pub fn with_max_inner(mut self, n: usize) -> Self {
        self.max_inner = n;
        self
    }

    pub fn with_max_steps(mut self, n: usize) -> Self {
        self.max_steps = n;
        self
    }

    pub fn with_gtol(mut self, tol: f64) -> Self {
        self.gtol = tol;
        self
    }

    pub fn with_ctol(mut self, tol: f64) -> Self {
        self.ctol = tol;
        self
    }

    pub fn with_penalty(mut self, mu0: f64, growth: f64, max: f64) -> Self {
        self.mu0 = mu0;
        self.mu_growth = growth;
        self.mu_max = max;
        self
    }

    pub fn with_memory(mut self, m: usize) -> Self {
        self.memory = m;
        self
    }

    pub fn with_max_step(mut self, step: f64) -> Self {
        self.max_step = step;
        self
    }

    pub fn with_log_every(mut self, n: usize) -> Self {
        self.log_every = n;
        self
    }

    fn lagrangian(eval: &Evaluation, lambda: &[f64], mu: f64) -> (f64, Vec<f64>) {
        let mut value = eval.objective;
        let mut grad = eval.objective_gradient.clone();
        for ((c, dc), l) in eval
            .constraints
            .iter()
            .zip(&eval.constraint_gradients)
            .zip(lambda)
        {
            value += -l * c + 0.5 * mu * c * c;
            let w = mu * c - l;
            for (g, d) in grad.iter_mut().zip(dc) {
                *g += w * d;
            }
        }
        (value, grad)
    }

    fn point(x: Vec<f64>, eval: Evaluation, lambda: &[f64], mu: f64) -> Point {
        let (lagrangian, gradient) = Self::lagrangian(&eval, lambda, mu);
        Point {
            x,
            eval,
            lagrangian,
            gradient,
        }
    }

    /// L-BFGS two-loop recursion: -H g.
    fn direction(gradient: &[f64], pairs: &VecDeque<(Vec<f64>, Vec<f64>, f64)>) -> Vec<f64> {
        let mut q = gradient.to_vec();
        let mut alphas = Vec::with_capacity(pairs.len());
        for (s, y, rho) in pairs.iter().rev() {
            let a = rho * dot(s, &q);
            for (qi, yi) in q.iter_mut().zip(y) {
                *qi -= a * yi;
            }
            alphas.push(a);
        }
        if let Some((s, y, _)) = pairs.back() {
            let gamma = dot(s, y) / dot(y, y);
            q.iter_mut().for_each(|qi| *qi *= gamma);
        }
        for ((s, y, rho), a) in pairs.iter().zip(alphas.iter().rev()) {
            let b = rho * dot(y, &q);
            for (qi, si) in q.iter_mut().zip(s) {
                *qi += (a - b) * si;
            }
        }
        q.iter_mut().for_each(|qi| *qi = -*qi);
        q
    }

    fn line_search(
        &self,
        problem: &mut dyn ConstrainedProblem,
        current: &Point,
        direction: &[f64],
        lambda: &[f64],
        mu: f64,
        evaluations: &mut usize,
    ) -> Result<LineSearch> {
        let slope = dot(&current.gradient, direction);
        let longest = max_abs(direction);
        if longest == 0.0 {
            return Ok(LineSearch::Failed);
        }
        let mut t = (self.max_step / longest).min(1.0);

        while t >= MIN_STEP {
            let x: Vec<f64> = current
                .x
                .iter()
                .zip(direction)
                .map(|(x, d)| x + t * d)
                .collect();
            if !problem.is_admissible(&x) {
                debug!("trial step {t:.3e} leaves the admissible region");
                t *= 0.5;
                continue;
            }
            *evaluations += 1;
            let eval = match problem.evaluate(&x) {
                Ok(eval) => eval,
                Err(e) if e.is_degenerate() => {
                    warn!("trial step {t:.3e} rejected: {e}");
                    t *= 0.5;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let trial = Self::point(x, eval, lambda, mu);
            if trial.lagrangian.is_finite()
                && trial.lagrangian <= current.lagrangian + self.armijo * t * slope
            {
                return Ok(LineSearch::Accepted(trial));
            }
            t *= 0.5;
        }
        Ok(LineSearch::Failed)
    }
}

impl NonlinearSolver for AugmentedLagrangian {
    fn solve(&self, problem: &mut dyn ConstrainedProblem, x0: Vec<f64>) -> Result<SolverReport> {
        let m = problem.num_constraints();
        let mut lambda = vec![0.0; m];
        let mut mu = self.mu0;
        let mut evaluations = 1;
        let mut iterations = 0;
        let mut history = Vec::new();
        let mut converged = false;

        let eval = problem.evaluate(&x0)?;
        let mut current = Self::point(x0, eval, &lambda, mu);
        let mut previous_violation = current.eval.violation();
        info!(
            "initial objective {:.8e}, constraint violation {:.3e}",
            current.eval.objective, previous_violation
        );

        for outer in 0..self.max_outer {
            let mut pairs: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::new();
            let mut accepted = 0;

            for _ in 0..self.max_inner {
                if max_abs(&current.gradient) <= self.gtol || iterations >= self.max_steps {
                    break;
                }
                let mut direction = Self::direction(&current.gradient, &pairs);
                if dot(&direction, &current.gradient) >= 0.0 {
                    pairs.clear();
                    direction = current.gradient.iter().map(|g| -g).collect();
                }
                let mut step = self.line_search(
                    problem,
                    &current,
                    &direction,
                    &lambda,
                    mu,
                    &mut evaluations,
                )?;
                if matches!(step, LineSearch::Failed) && !pairs.is_empty() {
                    debug!("line search failed, restarting from steepest descent");
                    pairs.clear();
                    direction = current.gradient.iter().map(|g| -g).collect();
                    step = self.line_search(
                        problem,
                        &current,
                        &direction,
                        &lambda,
                        mu,
                        &mut evaluations,
                    )?;
                }
                let next = match step {
                    LineSearch::Accepted(next) => next,
                    LineSearch::Failed => {
                        warn!("line search failed at objective {:.8e}", current.eval.objective);
                        break;
                    }
                };

                let s: Vec<f64> = next.x.iter().zip(&current.x).map(|(a, b)| a - b).collect();
                let y: Vec<f64> = next
                    .gradient
                    .iter()
                    .zip(&current.gradient)
                    .map(|(a, b)| a - b)
                    .collect();
                let sy = dot(&s, &y);
                if sy > 1e-12 * dot(&y, &y).sqrt() * dot(&s, &s).sqrt() {
                    if pairs.len() == self.memory {
                        pairs.pop_front();
                    }
                    if self.memory > 0 {
                        pairs.push_back((s, y, 1.0 / sy));
                    }
                }
                current = next;
                accepted += 1;
                iterations += 1;

                if self.log_every > 0 && iterations % self.log_every == 0 {
                    info!(
                        "step {:5}: objective {:.8e}, |grad L| {:.3e}, violation {:.3e}",
                        iterations,
                        current.eval.objective,
                        max_abs(&current.gradient),
                        current.eval.violation()
                    );
                }
            }

            let violation = current.eval.violation();
            let gradient_norm = max_abs(&current.gradient);
            history.push(IterationRecord {
                iteration: outer,
                objective: current.eval.objective,
                violation,
                gradient_norm,
                penalty: mu,
            });
            debug!(
                "outer {outer}: objective {:.8e}, violation {violation:.3e}, mu {mu:.1e}",
                current.eval.objective
            );

            if violation <= self.ctol && gradient_norm <= self.gtol {
                converged = true;
                break;
            }
            if iterations >= self.max_steps {
                info!("step cap of {} reached", self.max_steps);
                break;
            }
            if m == 0 && accepted == 0 {
                break;
            }
            if m > 0 {
                for (l, c) in lambda.iter_mut().zip(&current.eval.constraints) {
                    *l -= mu * c;
                }
                if violation > 0.25 * previous_violation {
                    mu = (mu * self.mu_growth).min(self.mu_max);
                }
                previous_violation = violation;
                let eval = current.eval;
                current = Self::point(current.x, eval, &lambda, mu);
            }
        }

        info!(
            "{} after {} steps and {} evaluations: objective {:.8e}, violation {:.3e}",
            if converged { "converged" } else { "stopped" },
            iterations,
            evaluations,
            current.eval.objective,
            current.eval.violation()
        );

        Ok(SolverReport {
            x: current.x,
            objective: current.eval.objective,
            constraints: current.eval.constraints,
            multipliers: lambda,
            converged,
            iterations,
            evaluations,
            history,
        })
    }
}
