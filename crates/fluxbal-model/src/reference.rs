//! Built-in five reaction network of a growing cell.
//!
//! Glucose and oxygen are imported into internal pools, one unit of each is
//! metabolized into two units of energy and one unit of building blocks,
//! growth consumes one unit of energy and one of building blocks, and the
//! remaining energy leaves with the waste reaction.

use crate::model::{Bounds, FluxModel, Metabolite, ModelError, Objective, Sense};

pub const GLUCOSE_IN: &str = "v0_Glucose_In";
pub const OXYGEN_IN: &str = "v1_Oxygen_In";
pub const METABOLISM: &str = "v2_Metabolism";
pub const GROWTH: &str = "v3_Growth";
pub const WASTE: &str = "v4_Waste_CO2";

pub const GLUCOSE: &str = "glucose_int";
pub const OXYGEN: &str = "oxygen_int";
pub const ENERGY: &str = "energy";
pub const BUILDING_BLOCKS: &str = "building_blocks";

/// The reference model, maximizing growth. Glucose uptake is capped at 10.
pub fn reference_model() -> Result<FluxModel, ModelError> {
    let reactions = [GLUCOSE_IN, OXYGEN_IN, METABOLISM, GROWTH, WASTE]
        .iter()
        .map(|r| r.to_string())
        .collect();

    let metabolites = vec![
        Metabolite::new(GLUCOSE).named("Internal glucose"),
        Metabolite::new(OXYGEN).named("Internal oxygen"),
        Metabolite::new(ENERGY).named("Energy (ATP)"),
        Metabolite::new(BUILDING_BLOCKS).named("Building blocks"),
    ];

    let stoichiometry = vec![
        //   v0,  v1,   v2,   v3,   v4
        vec![1.0, 0.0, -1.0, 0.0, 0.0],
        vec![0.0, 1.0, -1.0, 0.0, 0.0],
        vec![0.0, 0.0, 2.0, -1.0, -1.0],
        vec![0.0, 0.0, 1.0, -1.0, 0.0],
    ];

    let bounds = vec![
        Bounds::up_to(10.0),
        Bounds::up_to(100.0),
        Bounds::up_to(1000.0),
        Bounds::up_to(1000.0),
        Bounds::up_to(1000.0),
    ];

    FluxModel::new(
        reactions,
        metabolites,
        stoichiometry,
        bounds,
        Objective::single(5, 3, Sense::Maximize),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_shape() {
        let model = reference_model().unwrap();
        assert_eq!(model.num_reactions(), 5);
        assert_eq!(model.num_metabolites(), 4);
        assert_eq!(model.reaction_index(GROWTH), Ok(3));
        assert_eq!(model.objective().coefficients, vec![0.0, 0.0, 0.0, 1.0, 0.0]);
    }
}
