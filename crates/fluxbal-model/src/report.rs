use std::fmt;

use serde::Serialize;

use crate::fba::{FluxSolution, FluxStatus};
use crate::model::{FluxModel, Sense};
use crate::variability::FluxRange;

/// Human-readable breakdown of a flux solution
pub struct FluxReport<'a> {
    model: &'a FluxModel,
    solution: &'a FluxSolution,
    ranges: Option<&'a [FluxRange]>,
}

/// Machine-readable form of a report
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub status: FluxStatus,
    pub sense: Sense,
    pub objective_value: Option<f64>,
    pub fluxes: Vec<ReactionFlux>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variability: Option<Vec<FluxRange>>,
}

#[derive(Debug, Serialize)]
pub struct ReactionFlux {
    pub reaction: String,
    pub flux: f64,
}

impl<'a> FluxReport<'a> {
    pub fn new(model: &'a FluxModel, solution: &'a FluxSolution) -> Self {
        Self {
            model,
            solution,
            ranges: None,
        }
    }

    pub fn with_variability(mut self, ranges: &'a [FluxRange]) -> Self {
        self.ranges = Some(ranges);
        self
    }

    pub fn summary(&self) -> ReportSummary {
        let fluxes = match &self.solution.fluxes {
            Some(values) => self
                .model
                .reactions()
                .iter()
                .zip(values)
                .map(|(reaction, &flux)| ReactionFlux {
                    reaction: reaction.clone(),
                    flux: round4(flux),
                })
                .collect(),
            None => Vec::new(),
        };

        ReportSummary {
            status: self.solution.status,
            sense: self.solution.sense,
            objective_value: self.solution.objective_value.map(round4),
            fluxes,
            variability: self.ranges.map(|ranges| {
                ranges
                    .iter()
                    .map(|r| FluxRange {
                        reaction: r.reaction.clone(),
                        minimum: round4(r.minimum),
                        maximum: round4(r.maximum),
                    })
                    .collect()
            }),
        }
    }

    /// Reactions weighted by the objective, e.g. `v3_Growth` or `2*a + b`
    fn objective_label(&self) -> String {
        let terms: Vec<String> = self
            .model
            .reactions()
            .iter()
            .zip(&self.model.objective().coefficients)
            .filter(|(_, c)| **c != 0.0)
            .map(|(name, &c)| if c == 1.0 { name.clone() } else { format!("{}*{}", c, name) })
            .collect();

        if terms.is_empty() {
            "0".to_string()
        } else {
            terms.join(" + ")
        }
    }
}

impl fmt::Display for FluxReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (Some(objective), Some(fluxes)) = (self.solution.objective_value, &self.solution.fluxes) else {
            return writeln!(f, "Optimization failed: {}", failure_reason(self.solution.status));
        };

        writeln!(f, "--- OPTIMAL FLUX DISTRIBUTION FOUND ---")?;
        writeln!(
            f,
            "Objective ({} {}): {}",
            self.solution.sense.as_str(),
            self.objective_label(),
            fmt_flux(objective)
        )?;
        writeln!(f)?;
        writeln!(f, "Flux breakdown:")?;
        for (name, &flux) in self.model.reactions().iter().zip(fluxes) {
            writeln!(f, "  {}: {}", name, fmt_flux(flux))?;
        }

        if let Some(ranges) = self.ranges {
            writeln!(f)?;
            writeln!(f, "Flux variability:")?;
            for range in ranges {
                writeln!(
                    f,
                    "  {}: [{}, {}]",
                    range.reaction,
                    fmt_flux(range.minimum),
                    fmt_flux(range.maximum)
                )?;
            }
        }
        Ok(())
    }
}

fn failure_reason(status: FluxStatus) -> &'static str {
    match status {
        FluxStatus::Infeasible => "no flux distribution satisfies the steady state and the bounds (infeasible)",
        FluxStatus::Unbounded => "the objective can grow without limit (unbounded)",
        FluxStatus::NumericalError => "the solver could not reach a reliable answer (numerical error)",
        FluxStatus::Optimal => "solver reported optimal without a flux vector",
    }
}

fn round4(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let rounded = (value * 1e4).round() / 1e4;
    // Avoid printing -0.0000
    if rounded == 0.0 { 0.0 } else { rounded }
}

fn fmt_flux(value: f64) -> String {
    format!("{:.4}", round4(value))
}
