pub mod fba;
pub mod model;
pub mod network;
pub mod reference;
pub mod report;
pub mod variability;

pub use fba::{check_steady_state, to_lp_problem, FluxBalance, FluxSolution, FluxStatus};
pub use model::{Bounds, FluxModel, Metabolite, ModelError, Objective, Sense};
pub use network::{Network, NetworkMetabolite, NetworkReaction};
pub use reference::reference_model;
pub use report::{FluxReport, ReactionFlux, ReportSummary};
pub use variability::{FluxRange, VariabilityError};
