mod problem;
mod simplex;
mod solution;

pub use problem::{Constraint, ConstraintOp, LpProblem, Objective, ProblemError, VariableBounds};
pub use simplex::Solver;
pub use solution::{Solution, SolutionStatus};
