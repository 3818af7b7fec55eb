use thiserror::Error;

/// Represents a linear programming problem
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Variable names
    pub variables: Vec<String>,
    /// Objective function coefficients
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
    /// Lower and upper bound for each variable
    pub bounds: Vec<VariableBounds>,
}

#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

/// Box constraint on a single variable. Either side may be infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableBounds {
    pub lower: f64,
    pub upper: f64,
}

impl VariableBounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// `[0, +inf)`, the implicit bound of a textbook LP variable.
    pub fn non_negative() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    pub fn free() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.lower - tolerance && value <= self.upper + tolerance
    }
}

impl Default for VariableBounds {
    fn default() -> Self {
        Self::non_negative()
    }
}

/// Malformed problem input, detected before any pivoting happens
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Problem has no variables")]
    NoVariables,
    #[error("Objective has {found} coefficients but the problem has {expected} variables")]
    ObjectiveLength { expected: usize, found: usize },
    #[error("Constraint {constraint} has {found} coefficients but the problem has {expected} variables")]
    ConstraintLength {
        constraint: String,
        expected: usize,
        found: usize,
    },
    #[error("Problem has {found} variable bounds but {expected} variables")]
    BoundsLength { expected: usize, found: usize },
    #[error("Invalid bounds for {variable}: [{lower}, {upper}]")]
    InvalidBounds {
        variable: String,
        lower: f64,
        upper: f64,
    },
    #[error("Non-finite value in {0}")]
    NonFinite(String),
}

impl LpProblem {
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
            bounds: vec![VariableBounds::default(); n],
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    /// Replace the bounds of variable `index`. Out-of-range indices are ignored.
    pub fn set_bounds(&mut self, index: usize, lower: f64, upper: f64) {
        if let Some(b) = self.bounds.get_mut(index) {
            *b = VariableBounds::new(lower, upper);
        }
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Check dimensions and values before solving
    pub fn validate(&self) -> Result<(), ProblemError> {
        let n = self.num_variables();
        if n == 0 {
            return Err(ProblemError::NoVariables);
        }
        if self.objective.coefficients.len() != n {
            return Err(ProblemError::ObjectiveLength {
                expected: n,
                found: self.objective.coefficients.len(),
            });
        }
        if self.objective.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ProblemError::NonFinite("objective".to_string()));
        }
        if self.bounds.len() != n {
            return Err(ProblemError::BoundsLength {
                expected: n,
                found: self.bounds.len(),
            });
        }
        for (name, b) in self.variables.iter().zip(&self.bounds) {
            // NaN fails every comparison, so this also rejects NaN bounds
            let ordered = b.lower <= b.upper;
            if !ordered || b.lower == f64::INFINITY || b.upper == f64::NEG_INFINITY {
                return Err(ProblemError::InvalidBounds {
                    variable: name.clone(),
                    lower: b.lower,
                    upper: b.upper,
                });
            }
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(ProblemError::ConstraintLength {
                    constraint: c.name.clone(),
                    expected: n,
                    found: c.coefficients.len(),
                });
            }
            if !c.rhs.is_finite() || c.coefficients.iter().any(|a| !a.is_finite()) {
                return Err(ProblemError::NonFinite(format!("constraint {}", c.name)));
            }
        }
        Ok(())
    }

    /// Left-hand side of constraint `c` evaluated at `values`
    pub fn activity(c: &Constraint, values: &[f64]) -> f64 {
        c.coefficients.iter().zip(values).map(|(a, x)| a * x).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_vars() -> LpProblem {
        LpProblem::new(vec!["x".to_string(), "y".to_string()])
    }

    #[test]
    fn test_new_problem_defaults() {
        let problem = two_vars();
        assert_eq!(problem.num_variables(), 2);
        assert_eq!(problem.num_constraints(), 0);
        assert_eq!(problem.bounds, vec![VariableBounds::non_negative(); 2]);
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn test_constraint_length_mismatch() {
        let mut problem = two_vars();
        problem.add_constraint("short", vec![1.0], ConstraintOp::Le, 1.0);
        assert_eq!(
            problem.validate(),
            Err(ProblemError::ConstraintLength {
                constraint: "short".to_string(),
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn test_objective_length_mismatch() {
        let mut problem = two_vars();
        problem.set_objective(vec![1.0, 2.0, 3.0], false);
        assert!(matches!(
            problem.validate(),
            Err(ProblemError::ObjectiveLength { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_inverted_and_nan_bounds() {
        let mut problem = two_vars();
        problem.set_bounds(0, 5.0, 1.0);
        assert!(matches!(problem.validate(), Err(ProblemError::InvalidBounds { .. })));

        let mut problem = two_vars();
        problem.set_bounds(1, f64::NAN, 1.0);
        assert!(matches!(problem.validate(), Err(ProblemError::InvalidBounds { .. })));
    }

    #[test]
    fn test_bounds_contain() {
        let default = VariableBounds::default();
        assert!(default.contains(0.0, 0.0));
        assert!(!default.contains(-1e-3, 1e-6));
        assert!(default.contains(-1e-7, 1e-6));

        let free = VariableBounds::free();
        assert!(free.contains(-1e12, 0.0));
        assert!(free.contains(1e12, 0.0));
    }

    #[test]
    fn test_non_finite_rhs() {
        let mut problem = two_vars();
        problem.add_constraint("inf", vec![1.0, 1.0], ConstraintOp::Eq, f64::INFINITY);
        assert!(matches!(problem.validate(), Err(ProblemError::NonFinite(_))));
    }

    #[test]
    fn test_activity() {
        let c = Constraint {
            name: "row".to_string(),
            coefficients: vec![2.0, -1.0],
            op: ConstraintOp::Eq,
            rhs: 0.0,
        };
        assert!((LpProblem::activity(&c, &[3.0, 4.0]) - 2.0).abs() < 1e-12);
    }
}
