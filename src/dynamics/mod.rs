//! Simulation dynamics modules: integration, contact solving, sleeping and the job system.

pub mod integrator;
pub mod job_system;
pub mod sleeping;
pub mod solver;

pub use integrator::Integrator;
pub use job_system::JobSystem;
pub use sleeping::SleepManager;
pub use solver::{ContactConstraint, ContactSolver};
