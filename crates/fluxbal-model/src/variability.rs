use fluxbal_solver::{ConstraintOp, SolutionStatus};
use log::debug;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::fba::{to_lp_problem, FluxBalance, FluxStatus};
use crate::model::{FluxModel, ModelError, Sense};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VariabilityError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Base optimization ended {0}")]
    NotOptimal(FluxStatus),
    #[error("Flux range of {reaction} could not be determined: {status}")]
    Subproblem { reaction: String, status: FluxStatus },
}

/// Range of flux a reaction can carry while the objective stays near its
/// optimum. An infinite end means the flux is unbounded in that direction;
/// it serializes as `"inf"` or `"-inf"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluxRange {
    pub reaction: String,
    #[serde(serialize_with = "serialize_end")]
    pub minimum: f64,
    #[serde(serialize_with = "serialize_end")]
    pub maximum: f64,
}

// JSON has no infinity and serde_json writes it as null
fn serialize_end<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_infinite() {
        serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
    } else {
        serializer.serialize_f64(*value)
    }
}

impl FluxBalance {
    /// Flux variability analysis.
    ///
    /// The objective is first optimized, then pinned to within
    /// `fraction_of_optimum` of that optimum while each reaction is
    /// minimized and maximized in turn. `1.0` keeps the optimum exactly;
    /// `0.0` lets the objective fall by the full magnitude of the optimum.
    pub fn variability(&self, model: &FluxModel, fraction_of_optimum: f64) -> Result<Vec<FluxRange>, VariabilityError> {
        if !(0.0..=1.0).contains(&fraction_of_optimum) {
            return Err(ModelError::InvalidFraction(fraction_of_optimum).into());
        }

        let base = self.optimize(model)?;
        let optimum = match base.objective_value {
            Some(value) if base.is_optimal() => value,
            _ => return Err(VariabilityError::NotOptimal(base.status)),
        };

        let objective = model.objective();
        let slack = (1.0 - fraction_of_optimum) * optimum.abs() + 1e-9 * (1.0 + optimum.abs());
        let (op, rhs) = match objective.sense {
            Sense::Maximize => (ConstraintOp::Ge, optimum - slack),
            Sense::Minimize => (ConstraintOp::Le, optimum + slack),
        };

        let mut problem = to_lp_problem(model);
        problem.add_constraint("objective_floor", objective.coefficients.clone(), op, rhs);

        let n = model.num_reactions();
        let mut ranges = Vec::with_capacity(n);
        for (j, reaction) in model.reactions().iter().enumerate() {
            let mut target = vec![0.0; n];
            target[j] = 1.0;

            let mut ends = [0.0; 2];
            for (end, minimize) in ends.iter_mut().zip([true, false]) {
                problem.set_objective(target.clone(), minimize);
                let solution = self.solver().solve(&problem).map_err(ModelError::from)?;
                *end = match solution.status {
                    SolutionStatus::Optimal | SolutionStatus::Unbounded => solution.objective_value,
                    status => {
                        return Err(VariabilityError::Subproblem {
                            reaction: reaction.clone(),
                            status: status.into(),
                        });
                    }
                };
            }

            debug!("{} ranges over [{}, {}]", reaction, ends[0], ends[1]);
            ranges.push(FluxRange {
                reaction: reaction.clone(),
                minimum: ends[0],
                maximum: ends[1],
            });
        }

        Ok(ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bounds, Metabolite, Objective};
    use crate::reference::*;

    const TOL: f64 = 1e-6;

    fn assert_range(range: &FluxRange, minimum: f64, maximum: f64) {
        assert!(
            (range.minimum - minimum).abs() < TOL && (range.maximum - maximum).abs() < TOL,
            "{}: [{}, {}] (expected [{}, {}])",
            range.reaction,
            range.minimum,
            range.maximum,
            minimum,
            maximum
        );
    }

    /// Two parallel routes from `a` to `b`; only their sum is fixed at the optimum
    fn parallel_routes() -> FluxModel {
        FluxModel::new(
            vec![
                "uptake".to_string(),
                "route_1".to_string(),
                "route_2".to_string(),
                "demand".to_string(),
            ],
            vec![Metabolite::new("a"), Metabolite::new("b")],
            vec![vec![1.0, -1.0, -1.0, 0.0], vec![0.0, 1.0, 1.0, -1.0]],
            vec![
                Bounds::up_to(8.0),
                Bounds::up_to(5.0),
                Bounds::up_to(5.0),
                Bounds::up_to(f64::INFINITY),
            ],
            Objective::single(4, 3, Sense::Maximize),
        )
        .unwrap()
    }

    #[test]
    fn test_reference_fluxes_are_fixed_at_optimum() {
        let model = reference_model().unwrap();
        let ranges = FluxBalance::new().variability(&model, 1.0).unwrap();

        assert_eq!(ranges.len(), 5);
        for range in &ranges {
            assert_range(range, 10.0, 10.0);
        }
    }

    #[test]
    fn test_reference_fraction_zero() {
        let model = reference_model().unwrap();
        let ranges = FluxBalance::new().variability(&model, 0.0).unwrap();
        for range in &ranges {
            assert_range(range, 0.0, 10.0);
        }
    }

    #[test]
    fn test_alternative_optima() {
        let model = parallel_routes();
        let ranges = FluxBalance::new().variability(&model, 1.0).unwrap();

        assert_range(&ranges[0], 8.0, 8.0);
        assert_range(&ranges[1], 3.0, 5.0);
        assert_range(&ranges[2], 3.0, 5.0);
        assert_range(&ranges[3], 8.0, 8.0);
    }

    #[test]
    fn test_partial_fraction() {
        let model = parallel_routes();
        let ranges = FluxBalance::new().variability(&model, 0.5).unwrap();

        assert_range(&ranges[0], 4.0, 8.0);
        assert_range(&ranges[1], 0.0, 5.0);
        assert_range(&ranges[3], 4.0, 8.0);
    }

    #[test]
    fn test_invalid_fraction() {
        let model = reference_model().unwrap();
        let err = FluxBalance::new().variability(&model, 1.5).unwrap_err();
        assert_eq!(err, VariabilityError::Model(ModelError::InvalidFraction(1.5)));
    }

    #[test]
    fn test_infeasible_base_problem() {
        let model = reference_model()
            .unwrap()
            .with_bounds(GLUCOSE_IN, Bounds::up_to(0.0))
            .unwrap()
            .with_bounds(GROWTH, Bounds::new(1.0, 1000.0))
            .unwrap();
        let err = FluxBalance::new().variability(&model, 1.0).unwrap_err();
        assert_eq!(err, VariabilityError::NotOptimal(FluxStatus::Infeasible));
    }
}
