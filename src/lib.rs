//! Rust FMD - Gaussian wave-packet Slater determinants for nuclear structure
//!
//! This crate evaluates expectation values, off-diagonal matrix elements and
//! analytic parameter gradients of one- and two-body operators in Slater
//! determinants of Gaussian wave packets, and minimises the energy under
//! constraints.

pub mod constraint;
pub mod error;
pub mod gaussian;
pub mod io;
pub mod minimizer;
pub mod observables;
pub mod operator;
pub mod parallel;
pub mod parameterization;
pub mod physics;
pub mod slater;

// Re-export commonly used types at crate root
pub use constraint::{Constraint, ConstraintSpec, OffDiagonalConstraint};
pub use error::{FmdError, Result};
pub use gaussian::{Gaussian, GradGaussian, GradSlaterDet, Isospin, Selection};
pub use minimizer::{AugmentedLagrangian, MinimizationOutcome, Minimizer, MinimizerConfig, NonlinearSolver};
pub use observables::{
    AngularMomentum, Energies, Hamiltonian, Interaction, Observables, SpinOrbit, TotalIsospin,
};
pub use operator::{ob_me, ob_me_od, tb_me, tb_me_od, OneBodyOperator, TwoBodyOperator};
pub use parallel::{ExecutionContext, Task, WorkerPool};
pub use parameterization::{FmdParameterization, Parameterization};
pub use slater::{CenterOfMass, SlaterDet, SlaterDetAux};
