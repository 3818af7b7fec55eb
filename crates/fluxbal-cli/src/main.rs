use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use fluxbal_model::{FluxBalance, FluxModel, FluxReport, FluxStatus, ModelError, Network};
use fluxbal_solver::Solver;
use log::{debug, error};

const EXIT_OPTIMAL: i32 = 0;
const EXIT_MODEL_ERROR: i32 = 1;
const EXIT_INFEASIBLE: i32 = 2;
const EXIT_UNBOUNDED: i32 = 3;
const EXIT_NUMERICAL_ERROR: i32 = 4;

#[derive(Parser)]
#[command(name = "fluxbal")]
#[command(about = "Flux balance analysis for small metabolic networks", long_about = None)]
struct Cli {
    /// Defaults to solving the built-in reference network
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a network and print the optimal flux distribution
    Solve {
        /// Network JSON file (the reference network when omitted)
        #[arg(short, long)]
        network: Option<PathBuf>,
        /// Also report flux variability at the optimum
        #[arg(short, long)]
        variability: bool,
        /// Fraction of the optimum kept during flux variability analysis
        #[arg(long, default_value_t = 1.0)]
        fraction: f64,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        /// Simplex pivot limit
        #[arg(long, default_value_t = 10000)]
        max_iterations: usize,
    },
    /// Check a network file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
    /// Print the reference network as JSON
    Reference,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Solve {
            network: None,
            variability: false,
            fraction: 1.0,
            format: OutputFormat::Pretty,
            max_iterations: 10000,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let code = match cli.command.unwrap_or_default() {
        Commands::Solve {
            network,
            variability,
            fraction,
            format,
            max_iterations,
        } => {
            let solver = Solver::new().with_max_iterations(max_iterations);
            solve(network.as_deref(), variability, fraction, format, solver)
        }
        Commands::Check { file } => check(&file),
        Commands::Reference => reference(),
    };
    std::process::exit(code);
}

fn load_model(path: Option<&Path>) -> Result<FluxModel, ModelError> {
    match path {
        Some(path) => {
            debug!("loading network from {}", path.display());
            Network::from_path(path)?.to_model()
        }
        None => fluxbal_model::reference_model(),
    }
}

fn solve(path: Option<&Path>, variability: bool, fraction: f64, format: OutputFormat, solver: Solver) -> i32 {
    let model = match load_model(path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Model error: {}", e);
            return EXIT_MODEL_ERROR;
        }
    };

    let json = format == OutputFormat::Json;
    if json {
        eprintln!("running optimization algorithm...");
    } else {
        println!("running optimization algorithm...");
        println!();
    }

    let balance = FluxBalance::with_solver(solver);
    let solution = match balance.optimize(&model) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Model error: {}", e);
            return EXIT_MODEL_ERROR;
        }
    };

    let ranges = if variability && solution.is_optimal() {
        match balance.variability(&model, fraction) {
            Ok(r) => Some(r),
            Err(e) => {
                eprintln!("Flux variability failed: {}", e);
                return EXIT_MODEL_ERROR;
            }
        }
    } else {
        None
    };

    let mut report = FluxReport::new(&model, &solution);
    if let Some(ref ranges) = ranges {
        report = report.with_variability(ranges);
    }

    if json {
        match serde_json::to_string_pretty(&report.summary()) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                error!("could not serialize report: {}", e);
                return EXIT_MODEL_ERROR;
            }
        }
    } else {
        print!("{}", report);
    }

    match solution.status {
        FluxStatus::Optimal => EXIT_OPTIMAL,
        FluxStatus::Infeasible => EXIT_INFEASIBLE,
        FluxStatus::Unbounded => EXIT_UNBOUNDED,
        FluxStatus::NumericalError => EXIT_NUMERICAL_ERROR,
    }
}

fn check(file: &Path) -> i32 {
    match load_model(Some(file)) {
        Ok(model) => {
            let boundary = model.metabolites().iter().filter(|m| m.boundary).count();
            let objective = model.objective().coefficients.iter().filter(|c| **c != 0.0).count();

            println!("✓ {} is valid", file.display());
            println!("  {} reactions", model.num_reactions());
            println!("  {} metabolites ({} boundary)", model.num_metabolites(), boundary);
            println!("  {} objective reactions ({})", objective, model.objective().sense.as_str());
            EXIT_OPTIMAL
        }
        Err(e) => {
            eprintln!("✗ {} has errors:", file.display());
            eprintln!("  {}", e);
            EXIT_MODEL_ERROR
        }
    }
}

fn reference() -> i32 {
    match Network::reference().and_then(|n| n.to_json()) {
        Ok(json) => {
            println!("{}", json);
            EXIT_OPTIMAL
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_MODEL_ERROR
        }
    }
}
