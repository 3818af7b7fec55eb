//! Network configuration documents.
//!
//! A network is described in JSON, one entry per metabolite and reaction,
//! with each reaction listing its stoichiometric coefficients by metabolite
//! id:
//!
//! ```json
//! {
//!   "id": "chain",
//!   "metabolites": [{ "id": "a" }],
//!   "reactions": [
//!     { "id": "uptake", "upper_bound": 5, "metabolites": { "a": 1 } },
//!     { "id": "secretion", "metabolites": { "a": -1 }, "objective_coefficient": 1 }
//!   ]
//! }
//! ```
//!
//! A missing `lower_bound` means `0` (or unbounded below when `reversible`
//! is set), a missing `upper_bound` means unbounded above.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{Bounds, FluxModel, Metabolite, ModelError, Objective, Sense};
use crate::reference::reference_model;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub sense: Sense,
    pub metabolites: Vec<NetworkMetabolite>,
    pub reactions: Vec<NetworkReaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetabolite {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub boundary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkReaction {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reversible: bool,
    pub metabolites: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_coefficient: Option<f64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl NetworkReaction {
    fn bounds(&self) -> Bounds {
        let default_lower = if self.reversible { f64::NEG_INFINITY } else { 0.0 };
        Bounds::new(
            self.lower_bound.unwrap_or(default_lower),
            self.upper_bound.unwrap_or(f64::INFINITY),
        )
    }
}

impl Network {
    /// The built-in reference network in configuration form
    pub fn reference() -> Result<Self, ModelError> {
        let mut network = Self::from_model(&reference_model()?);
        network.id = Some("reference".to_string());
        Ok(network)
    }

    pub fn from_json(source: &str) -> Result<Self, ModelError> {
        serde_json::from_str(source).map_err(|e| ModelError::ParseError(e.to_string()))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ModelError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&source)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        serde_json::to_string_pretty(self).map_err(|e| ModelError::ParseError(e.to_string()))
    }

    /// Assemble the dense stoichiometric matrix and validate the result
    pub fn to_model(&self) -> Result<FluxModel, ModelError> {
        let mut rows: HashMap<&str, usize> = HashMap::new();
        for (i, met) in self.metabolites.iter().enumerate() {
            if rows.insert(met.id.as_str(), i).is_some() {
                return Err(ModelError::DuplicateId(met.id.clone()));
            }
        }

        let n = self.reactions.len();
        let mut stoichiometry = vec![vec![0.0; n]; self.metabolites.len()];
        for (j, reaction) in self.reactions.iter().enumerate() {
            for (met, &coef) in &reaction.metabolites {
                let &i = rows
                    .get(met.as_str())
                    .ok_or_else(|| ModelError::UnknownMetabolite(met.clone()))?;
                stoichiometry[i][j] += coef;
            }
        }

        let metabolites = self
            .metabolites
            .iter()
            .map(|m| Metabolite {
                id: m.id.clone(),
                name: m.name.clone(),
                boundary: m.boundary,
            })
            .collect();

        let objective = Objective {
            coefficients: self
                .reactions
                .iter()
                .map(|r| r.objective_coefficient.unwrap_or(0.0))
                .collect(),
            sense: self.sense,
        };

        FluxModel::new(
            self.reactions.iter().map(|r| r.id.clone()).collect(),
            metabolites,
            stoichiometry,
            self.reactions.iter().map(NetworkReaction::bounds).collect(),
            objective,
        )
    }

    /// Configuration form of an existing model
    pub fn from_model(model: &FluxModel) -> Self {
        let metabolites = model
            .metabolites()
            .iter()
            .map(|m| NetworkMetabolite {
                id: m.id.clone(),
                name: m.name.clone(),
                boundary: m.boundary,
            })
            .collect();

        let reactions = model
            .reactions()
            .iter()
            .enumerate()
            .map(|(j, id)| {
                let b = model.bounds()[j];
                let coefficient = model.objective().coefficients[j];
                NetworkReaction {
                    id: id.clone(),
                    name: None,
                    lower_bound: b.lower.is_finite().then_some(b.lower),
                    upper_bound: b.upper.is_finite().then_some(b.upper),
                    reversible: b.lower == f64::NEG_INFINITY,
                    metabolites: model
                        .metabolites()
                        .iter()
                        .zip(model.stoichiometry())
                        .filter(|(_, row)| row[j] != 0.0)
                        .map(|(m, row)| (m.id.clone(), row[j]))
                        .collect(),
                    objective_coefficient: (coefficient != 0.0).then_some(coefficient),
                }
            })
            .collect();

        Self {
            id: None,
            sense: model.objective().sense,
            metabolites,
            reactions,
        }
    }
}
