use std::collections::HashSet;

use fluxbal_solver::ProblemError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
    #[error("Model has no reactions")]
    NoReactions,
    #[error("Reaction {0} has no nonzero stoichiometric coefficient")]
    EmptyReaction(String),
    #[error("Invalid bounds for reaction {reaction}: [{lower}, {upper}]")]
    InvalidBounds {
        reaction: String,
        lower: f64,
        upper: f64,
    },
    #[error("Non-finite coefficient in {0}")]
    NonFinite(String),
    #[error("Duplicate identifier: {0}")]
    DuplicateId(String),
    #[error("Unknown reaction: {0}")]
    UnknownReaction(String),
    #[error("Unknown metabolite: {0}")]
    UnknownMetabolite(String),
    #[error("Fraction of optimum must lie in [0, 1], got {0}")]
    InvalidFraction(f64),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid network document: {0}")]
    ParseError(String),
    #[error("Malformed linear program: {0}")]
    Problem(#[from] ProblemError),
}

/// Capacity constraint of a single reaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Irreversible reaction limited to `upper`
    pub fn up_to(upper: f64) -> Self {
        Self::new(0.0, upper)
    }

    pub fn is_valid(&self) -> bool {
        self.lower <= self.upper && self.lower != f64::INFINITY && self.upper != f64::NEG_INFINITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sense {
    #[default]
    Maximize,
    Minimize,
}

impl Sense {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sense::Maximize => "maximize",
            Sense::Minimize => "minimize",
        }
    }
}

/// Linear objective over the reaction fluxes
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub coefficients: Vec<f64>,
    pub sense: Sense,
}

impl Objective {
    pub fn maximize(coefficients: Vec<f64>) -> Self {
        Self {
            coefficients,
            sense: Sense::Maximize,
        }
    }

    pub fn minimize(coefficients: Vec<f64>) -> Self {
        Self {
            coefficients,
            sense: Sense::Minimize,
        }
    }

    /// Unit weight on reaction `index` of `n`
    pub fn single(n: usize, index: usize, sense: Sense) -> Self {
        let mut coefficients = vec![0.0; n];
        if let Some(c) = coefficients.get_mut(index) {
            *c = 1.0;
        }
        Self { coefficients, sense }
    }

    pub fn value(&self, fluxes: &[f64]) -> f64 {
        self.coefficients.iter().zip(fluxes).map(|(c, v)| c * v).sum()
    }
}

/// An internal pool of the network. Boundary metabolites are exchanged with
/// the environment and carry no steady-state equality.
#[derive(Debug, Clone, PartialEq)]
pub struct Metabolite {
    pub id: String,
    pub name: Option<String>,
    pub boundary: bool,
}

impl Metabolite {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            boundary: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A validated flux balance problem: reactions, balance rows, the
/// stoichiometric matrix `S` (rows = metabolites), bounds and objective.
///
/// Instances are immutable; the `with_*` methods build new, re-validated
/// models.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxModel {
    reactions: Vec<String>,
    metabolites: Vec<Metabolite>,
    stoichiometry: Vec<Vec<f64>>,
    bounds: Vec<Bounds>,
    objective: Objective,
}

impl FluxModel {
    pub fn new(
        reactions: Vec<String>,
        metabolites: Vec<Metabolite>,
        stoichiometry: Vec<Vec<f64>>,
        bounds: Vec<Bounds>,
        objective: Objective,
    ) -> Result<Self, ModelError> {
        let model = Self {
            reactions,
            metabolites,
            stoichiometry,
            bounds,
            objective,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ModelError> {
        let r = self.reactions.len();
        let m = self.metabolites.len();
        if r == 0 {
            return Err(ModelError::NoReactions);
        }

        check_shape("stoichiometric rows", m, self.stoichiometry.len())?;
        for (row, met) in self.stoichiometry.iter().zip(&self.metabolites) {
            check_shape(&format!("stoichiometric row {}", met.id), r, row.len())?;
        }
        check_shape("bounds", r, self.bounds.len())?;
        check_shape("objective", r, self.objective.coefficients.len())?;

        let mut seen = HashSet::new();
        for id in self.reactions.iter().chain(self.metabolites.iter().map(|m| &m.id)) {
            if !seen.insert(id.as_str()) {
                return Err(ModelError::DuplicateId(id.clone()));
            }
        }

        for (row, met) in self.stoichiometry.iter().zip(&self.metabolites) {
            if row.iter().any(|a| !a.is_finite()) {
                return Err(ModelError::NonFinite(format!("stoichiometry of {}", met.id)));
            }
        }
        if self.objective.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::NonFinite("objective".to_string()));
        }

        for (j, name) in self.reactions.iter().enumerate() {
            if self.stoichiometry.iter().all(|row| row[j] == 0.0) {
                return Err(ModelError::EmptyReaction(name.clone()));
            }
            let b = self.bounds[j];
            if !b.is_valid() {
                return Err(ModelError::InvalidBounds {
                    reaction: name.clone(),
                    lower: b.lower,
                    upper: b.upper,
                });
            }
        }

        Ok(())
    }

    pub fn reactions(&self) -> &[String] {
        &self.reactions
    }

    pub fn metabolites(&self) -> &[Metabolite] {
        &self.metabolites
    }

    pub fn stoichiometry(&self) -> &[Vec<f64>] {
        &self.stoichiometry
    }

    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn num_metabolites(&self) -> usize {
        self.metabolites.len()
    }

    pub fn reaction_index(&self, id: &str) -> Result<usize, ModelError> {
        self.reactions
            .iter()
            .position(|r| r == id)
            .ok_or_else(|| ModelError::UnknownReaction(id.to_string()))
    }

    pub fn metabolite_index(&self, id: &str) -> Result<usize, ModelError> {
        self.metabolites
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| ModelError::UnknownMetabolite(id.to_string()))
    }

    /// Copy of this model with new bounds on one reaction
    pub fn with_bounds(&self, reaction: &str, bounds: Bounds) -> Result<Self, ModelError> {
        let index = self.reaction_index(reaction)?;
        let mut model = self.clone();
        model.bounds[index] = bounds;
        model.validate()?;
        Ok(model)
    }

    /// Copy of this model where `metabolite` is exchanged with the
    /// environment instead of balanced
    pub fn with_boundary(&self, metabolite: &str) -> Result<Self, ModelError> {
        let index = self.metabolite_index(metabolite)?;
        let mut model = self.clone();
        model.metabolites[index].boundary = true;
        Ok(model)
    }

    pub fn with_objective(&self, objective: Objective) -> Result<Self, ModelError> {
        let mut model = self.clone();
        model.objective = objective;
        model.validate()?;
        Ok(model)
    }

    /// Indices of the metabolites whose rows are steady-state equalities
    pub fn balanced_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.metabolites
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.boundary)
            .map(|(i, _)| i)
    }

    /// `S · v` for every balanced metabolite, paired with its id
    pub fn balance_residuals(&self, fluxes: &[f64]) -> Vec<(&str, f64)> {
        self.balanced_rows()
            .map(|i| {
                let net: f64 = self.stoichiometry[i].iter().zip(fluxes).map(|(a, v)| a * v).sum();
                (self.metabolites[i].id.as_str(), net)
            })
            .collect()
    }

    /// Largest distance of any flux outside its bounds (zero when all fit)
    pub fn bound_violation(&self, fluxes: &[f64]) -> f64 {
        self.bounds
            .iter()
            .zip(fluxes)
            .map(|(b, &v)| (b.lower - v).max(v - b.upper).max(0.0))
            .fold(0.0, f64::max)
    }
}

fn check_shape(what: &str, expected: usize, found: usize) -> Result<(), ModelError> {
    if expected != found {
        return Err(ModelError::ShapeMismatch {
            what: what.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn chain() -> FluxModel {
        // uptake -> a -> secretion
        FluxModel::new(
            names(&["uptake", "secretion"]),
            vec![Metabolite::new("a")],
            vec![vec![1.0, -1.0]],
            vec![Bounds::up_to(5.0), Bounds::up_to(f64::INFINITY)],
            Objective::single(2, 1, Sense::Maximize),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_model() {
        let model = chain();
        assert_eq!(model.num_reactions(), 2);
        assert_eq!(model.num_metabolites(), 1);
        assert_eq!(model.reaction_index("secretion"), Ok(1));
        assert_eq!(model.objective().value(&[5.0, 4.0]), 4.0);
    }

    #[test]
    fn test_row_count_mismatch() {
        let result = FluxModel::new(
            names(&["uptake", "secretion"]),
            vec![Metabolite::new("a"), Metabolite::new("b")],
            vec![vec![1.0, -1.0]],
            vec![Bounds::up_to(1.0); 2],
            Objective::single(2, 1, Sense::Maximize),
        );
        assert_eq!(
            result,
            Err(ModelError::ShapeMismatch {
                what: "stoichiometric rows".to_string(),
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn test_column_count_mismatch() {
        let result = FluxModel::new(
            names(&["uptake", "secretion"]),
            vec![Metabolite::new("a")],
            vec![vec![1.0, -1.0, 0.0]],
            vec![Bounds::up_to(1.0); 2],
            Objective::single(2, 1, Sense::Maximize),
        );
        assert!(matches!(result, Err(ModelError::ShapeMismatch { expected: 2, found: 3, .. })));
    }

    #[test]
    fn test_bounds_and_objective_length() {
        let result = FluxModel::new(
            names(&["uptake", "secretion"]),
            vec![Metabolite::new("a")],
            vec![vec![1.0, -1.0]],
            vec![Bounds::up_to(1.0)],
            Objective::single(2, 1, Sense::Maximize),
        );
        assert!(matches!(result, Err(ModelError::ShapeMismatch { ref what, .. }) if what == "bounds"));

        let result = FluxModel::new(
            names(&["uptake", "secretion"]),
            vec![Metabolite::new("a")],
            vec![vec![1.0, -1.0]],
            vec![Bounds::up_to(1.0); 2],
            Objective::maximize(vec![1.0]),
        );
        assert!(matches!(result, Err(ModelError::ShapeMismatch { ref what, .. }) if what == "objective"));
    }

    #[test]
    fn test_empty_reaction_rejected() {
        let result = FluxModel::new(
            names(&["uptake", "idle"]),
            vec![Metabolite::new("a")],
            vec![vec![1.0, 0.0]],
            vec![Bounds::up_to(1.0); 2],
            Objective::single(2, 0, Sense::Maximize),
        );
        assert_eq!(result, Err(ModelError::EmptyReaction("idle".to_string())));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = chain().with_bounds("uptake", Bounds::new(3.0, 1.0)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidBounds { .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = FluxModel::new(
            names(&["a", "secretion"]),
            vec![Metabolite::new("a")],
            vec![vec![1.0, -1.0]],
            vec![Bounds::up_to(1.0); 2],
            Objective::single(2, 1, Sense::Maximize),
        );
        assert_eq!(result, Err(ModelError::DuplicateId("a".to_string())));
    }

    #[test]
    fn test_derived_models_leave_original_untouched() {
        let model = chain();
        let closed = model.with_bounds("uptake", Bounds::up_to(0.0)).unwrap();
        assert_eq!(closed.bounds()[0], Bounds::up_to(0.0));
        assert_eq!(model.bounds()[0], Bounds::up_to(5.0));

        let open = model.with_boundary("a").unwrap();
        assert_eq!(open.balanced_rows().count(), 0);
        assert_eq!(model.balanced_rows().count(), 1);

        assert_eq!(
            model.with_boundary("zz"),
            Err(ModelError::UnknownMetabolite("zz".to_string()))
        );
    }

    #[test]
    fn test_residuals_and_violation() {
        let model = chain();
        let residuals = model.balance_residuals(&[3.0, 2.0]);
        assert_eq!(residuals, vec![("a", 1.0)]);
        assert_eq!(model.bound_violation(&[6.0, 2.0]), 1.0);
        assert_eq!(model.bound_violation(&[5.0, 5.0]), 0.0);
    }
}
