use fluxbal_solver::{ConstraintOp, LpProblem, Solution, SolutionStatus, Solver};
use log::{debug, info};
use serde::Serialize;

use crate::model::{FluxModel, ModelError, Sense};

/// Outcome of a flux balance solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FluxStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NumericalError,
}

impl From<SolutionStatus> for FluxStatus {
    fn from(status: SolutionStatus) -> Self {
        match status {
            SolutionStatus::Optimal => FluxStatus::Optimal,
            SolutionStatus::Infeasible => FluxStatus::Infeasible,
            SolutionStatus::Unbounded => FluxStatus::Unbounded,
            SolutionStatus::NumericalError => FluxStatus::NumericalError,
        }
    }
}

impl std::fmt::Display for FluxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FluxStatus::Optimal => "optimal",
            FluxStatus::Infeasible => "infeasible",
            FluxStatus::Unbounded => "unbounded",
            FluxStatus::NumericalError => "numerical error",
        };
        f.write_str(s)
    }
}

/// Steady-state flux distribution. `fluxes` and `objective_value` are only
/// present when the status is optimal; the objective value is in the
/// model's own sense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluxSolution {
    pub status: FluxStatus,
    pub sense: Sense,
    pub fluxes: Option<Vec<f64>>,
    pub objective_value: Option<f64>,
    pub iterations: usize,
}

impl FluxSolution {
    fn from_solution(solution: Solution, sense: Sense) -> Self {
        let status = FluxStatus::from(solution.status);
        let optimal = solution.is_optimal();
        Self {
            status,
            sense,
            fluxes: optimal.then_some(solution.values),
            objective_value: optimal.then_some(solution.objective_value),
            iterations: solution.iterations,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == FluxStatus::Optimal
    }

    /// Flux through the reaction named `id`, when optimal
    pub fn flux(&self, model: &FluxModel, id: &str) -> Option<f64> {
        let index = model.reaction_index(id).ok()?;
        self.fluxes.as_ref().and_then(|v| v.get(index).copied())
    }
}

/// Flux balance analysis driver. Holds solver configuration only; every
/// call is independent of the previous ones.
#[derive(Debug, Clone, Default)]
pub struct FluxBalance {
    solver: Solver,
}

impl FluxBalance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(solver: Solver) -> Self {
        Self { solver }
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Find the flux vector that optimizes the model's objective subject to
    /// `S · v = 0` on every balanced metabolite and the reaction bounds
    pub fn optimize(&self, model: &FluxModel) -> Result<FluxSolution, ModelError> {
        info!(
            "optimizing {} reactions over {} metabolites",
            model.num_reactions(),
            model.num_metabolites()
        );
        let problem = to_lp_problem(model);
        let solution = self.solver.solve(&problem)?;
        let result = FluxSolution::from_solution(solution, model.objective().sense);

        match result.objective_value {
            Some(value) => info!("{} after {} pivots, objective {}", result.status, result.iterations, value),
            None => info!("{} after {} pivots", result.status, result.iterations),
        }
        Ok(result)
    }
}

/// Linear program for a flux model: one variable per reaction, one equality
/// per balanced metabolite
pub fn to_lp_problem(model: &FluxModel) -> LpProblem {
    let mut problem = LpProblem::new(model.reactions().to_vec());

    for i in model.balanced_rows() {
        let met = &model.metabolites()[i];
        problem.add_constraint(
            format!("balance_{}", met.id),
            model.stoichiometry()[i].clone(),
            ConstraintOp::Eq,
            0.0,
        );
    }
    for (j, b) in model.bounds().iter().enumerate() {
        problem.set_bounds(j, b.lower, b.upper);
    }

    let objective = model.objective();
    problem.set_objective(objective.coefficients.clone(), objective.sense == Sense::Minimize);

    debug!(
        "built LP with {} variables and {} balance rows",
        problem.num_variables(),
        problem.num_constraints()
    );
    problem
}

/// Whether `solution` is optimal, balances every non-boundary metabolite and
/// respects every bound, all within `tolerance`
pub fn check_steady_state(model: &FluxModel, solution: &FluxSolution, tolerance: f64) -> bool {
    let Some(fluxes) = solution.fluxes.as_deref() else {
        return false;
    };
    fluxes.len() == model.num_reactions()
        && model
            .balance_residuals(fluxes)
            .iter()
            .all(|(_, net)| net.abs() <= tolerance)
        && model.bound_violation(fluxes) <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bounds, Metabolite, Objective};
    use crate::reference::*;

    const TOL: f64 = 1e-6;

    fn solve(model: &FluxModel) -> FluxSolution {
        FluxBalance::new().optimize(model).unwrap()
    }

    #[test]
    fn test_reference_optimum() {
        let model = reference_model().unwrap();
        let solution = solve(&model);

        assert_eq!(solution.status, FluxStatus::Optimal);
        let growth = solution.objective_value.unwrap();
        assert!((growth - 10.0).abs() < TOL, "growth = {} (expected 10)", growth);

        for id in [GLUCOSE_IN, OXYGEN_IN, METABOLISM, GROWTH] {
            let v = solution.flux(&model, id).unwrap();
            assert!((v - 10.0).abs() < TOL, "{} = {} (expected 10)", id, v);
        }

        // Rows 0-3 balance and every flux sits inside its bounds
        assert!(check_steady_state(&model, &solution, TOL));
        for (met, net) in model.balance_residuals(solution.fluxes.as_ref().unwrap()) {
            assert!(net.abs() < TOL, "{} accumulates {}", met, net);
        }
    }

    #[test]
    fn test_solving_twice_gives_same_objective() {
        let model = reference_model().unwrap();
        let balance = FluxBalance::new();
        let first = balance.optimize(&model).unwrap();
        let second = balance.optimize(&model).unwrap();
        let a = first.objective_value.unwrap();
        let b = second.objective_value.unwrap();
        assert!((a - b).abs() < TOL);
    }

    #[test]
    fn test_closed_glucose_supply_gives_zero_growth() {
        let model = reference_model()
            .unwrap()
            .with_bounds(GLUCOSE_IN, Bounds::up_to(0.0))
            .unwrap();
        let solution = solve(&model);

        assert_eq!(solution.status, FluxStatus::Optimal);
        assert!(solution.objective_value.unwrap().abs() < TOL);
        assert!(solution.fluxes.unwrap().iter().all(|v| v.abs() < TOL));
    }

    #[test]
    fn test_required_growth_without_supply_is_infeasible() {
        let model = reference_model()
            .unwrap()
            .with_bounds(GLUCOSE_IN, Bounds::up_to(0.0))
            .unwrap()
            .with_bounds(GROWTH, Bounds::new(5.0, 1000.0))
            .unwrap();
        let solution = solve(&model);

        assert_eq!(solution.status, FluxStatus::Infeasible);
        assert!(solution.fluxes.is_none());
        assert!(solution.objective_value.is_none());
    }

    #[test]
    fn test_relaxing_oxygen_balance_does_not_lower_optimum() {
        let model = reference_model().unwrap();
        let tight = solve(&model).objective_value.unwrap();

        let relaxed_model = model.with_boundary(OXYGEN).unwrap();
        let relaxed = solve(&relaxed_model);
        assert_eq!(relaxed.status, FluxStatus::Optimal);
        let relaxed_value = relaxed.objective_value.unwrap();

        assert!(tight <= relaxed_value + TOL);
        // Still limited by glucose
        assert!((relaxed_value - 10.0).abs() < TOL);
        assert!(check_steady_state(&relaxed_model, &relaxed, TOL));
    }

    #[test]
    fn test_tightening_a_bound_never_raises_optimum() {
        let model = reference_model().unwrap();
        let base = solve(&model).objective_value.unwrap();
        let capped = model.with_bounds(OXYGEN_IN, Bounds::up_to(4.0)).unwrap();
        let value = solve(&capped).objective_value.unwrap();
        assert!(value <= base + TOL);
        assert!((value - 4.0).abs() < TOL);
    }

    #[test]
    fn test_open_supplies_are_unbounded() {
        let mut model = reference_model().unwrap();
        for id in [GLUCOSE_IN, OXYGEN_IN, METABOLISM, GROWTH, WASTE] {
            model = model.with_bounds(id, Bounds::up_to(f64::INFINITY)).unwrap();
        }
        let solution = solve(&model);
        assert_eq!(solution.status, FluxStatus::Unbounded);
        assert!(solution.fluxes.is_none());
    }

    #[test]
    fn test_minimize_sense() {
        // Minimizing glucose uptake while demanding growth of 3
        let model = reference_model()
            .unwrap()
            .with_bounds(GROWTH, Bounds::new(3.0, 1000.0))
            .unwrap();
        let model = model
            .with_objective(Objective::minimize(vec![1.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();
        let solution = solve(&model);

        assert_eq!(solution.status, FluxStatus::Optimal);
        assert_eq!(solution.sense, Sense::Minimize);
        assert!((solution.objective_value.unwrap() - 3.0).abs() < TOL);
    }

    #[test]
    fn test_reversible_reaction() {
        // a is produced only through a reversible exchange run backwards
        let model = FluxModel::new(
            vec!["exchange".to_string(), "demand".to_string()],
            vec![Metabolite::new("a")],
            vec![vec![-1.0, -1.0]],
            vec![Bounds::new(-7.0, 7.0), Bounds::up_to(f64::INFINITY)],
            Objective::single(2, 1, Sense::Maximize),
        )
        .unwrap();
        let solution = solve(&model);

        assert_eq!(solution.status, FluxStatus::Optimal);
        assert!((solution.flux(&model, "exchange").unwrap() + 7.0).abs() < TOL);
        assert!((solution.objective_value.unwrap() - 7.0).abs() < TOL);
    }

    #[test]
    fn test_lp_translation() {
        let model = reference_model().unwrap().with_boundary(ENERGY).unwrap();
        let problem = to_lp_problem(&model);
        assert_eq!(problem.num_variables(), 5);
        assert_eq!(problem.num_constraints(), 3);
        assert!(problem.constraints.iter().all(|c| c.op == ConstraintOp::Eq && c.rhs == 0.0));
        assert!(!problem.objective.minimize);
        assert_eq!(problem.bounds[0].upper, 10.0);
    }
}
