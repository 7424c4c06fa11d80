//! Constrained energy minimisation.

pub mod driver;
pub mod solver;

pub use driver::{
    keep_initial, ConstraintReport, FmdProblem, MinimizationOutcome, Minimizer, MinimizerConfig,
};
pub use solver::{
    AugmentedLagrangian, ConstrainedProblem, Evaluation, IterationRecord, NonlinearSolver,
    SolverReport,
};
