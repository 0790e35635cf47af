//! DVRoute Simulator CLI
//!
//! Run distance-vector routing scenarios and check convergence against
//! true shortest paths.

use clap::Parser;
use dvroute_env::SimError;
use dvroute_sim::scenarios::ScenarioId;
use dvroute_sim::{DelayModel, LinkChange, ScenarioResult, ScenarioRun, ScenarioRunner, SimConfig, SimExport, Topology};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// DVRoute discrete-event simulator CLI
#[derive(Parser, Debug)]
#[command(name = "dvroute-sim")]
#[command(about = "Simulate distance-vector routing on a 4-node network", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (classic, classic_links, line_increase, link_failure, link_flap, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to run (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Halt a run after this many dispatched events
    #[arg(long, default_value_t = dvroute_sim::DEFAULT_MAX_EVENTS)]
    max_events: u64,

    /// Advertise infinity back toward each route's next hop
    #[arg(long)]
    poisoned_reverse: bool,

    /// Custom topology JSON file (replaces --scenario)
    #[arg(long)]
    topology: Option<PathBuf>,

    /// JSON file with a list of link changes for the custom topology
    #[arg(long, requires = "topology")]
    link_changes: Option<PathBuf>,

    /// Use a fixed transmission delay instead of uniform [1, 10)
    #[arg(long)]
    fixed_delay: Option<f64>,

    /// Print every node's final distance table
    #[arg(long)]
    tables: bool,

    /// Export the run to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Verbose output (every broadcast)
    #[arg(short, long)]
    verbose: bool,

    /// Trace output (every dispatched event)
    #[arg(long)]
    trace: bool,
}

/// One thing to run per seed.
enum Target {
    Scenario(ScenarioId),
    Custom(SimConfig),
}

impl Target {
    fn name(&self) -> &'static str {
        match self {
            Target::Scenario(scenario) => scenario.name(),
            Target::Custom(_) => "custom",
        }
    }

    fn execute(&self, runner: &ScenarioRunner) -> Result<ScenarioRun, SimError> {
        match self {
            Target::Scenario(scenario) => runner.execute(*scenario),
            Target::Custom(config) => runner.execute_config(self.name(), config.clone()),
        }
    }
}

fn load_custom(topology: &Path, link_changes: Option<&Path>) -> Result<SimConfig, SimError> {
    let topology = Topology::from_json_file(topology)?;
    let link_changes = match link_changes {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(SimError::io)?;
            serde_json::from_str::<Vec<LinkChange>>(&text).map_err(|e| SimError::topology(e.to_string()))?
        }
        None => Vec::new(),
    };

    Ok(SimConfig {
        topology,
        link_changes,
        ..Default::default()
    })
}

fn print_tables(run: &ScenarioRun) {
    for snapshot in run.simulator.snapshots() {
        println!("{}", snapshot.table);
        println!("  min cost: {}", snapshot.cost_vector);
        println!();
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.trace {
        Level::TRACE
    } else if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: failed to set tracing subscriber: {}", e);
        std::process::exit(2);
    }

    if !args.json {
        info!("DVRoute Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let targets: Vec<Target> = match &args.topology {
        Some(path) => match load_custom(path, args.link_changes.as_deref()) {
            Ok(config) => vec![Target::Custom(config)],
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(2);
            }
        },
        None if args.scenario == "all" => ScenarioId::all().into_iter().map(Target::Scenario).collect(),
        None => match args.scenario.parse() {
            Ok(scenario) => vec![Target::Scenario(scenario)],
            Err(e) => {
                eprintln!("Error: {}", e);
                let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
                eprintln!("Available scenarios: {}, all", names.join(", "));
                std::process::exit(2);
            }
        },
    };

    if args.export.is_some() && (targets.len() > 1 || args.seeds > 1) {
        eprintln!("Error: --export only supports a single scenario and seed");
        std::process::exit(2);
    }

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let mut runner = ScenarioRunner::new(seed)
            .with_max_events(args.max_events)
            .with_poisoned_reverse(args.poisoned_reverse);
        if let Some(delay) = args.fixed_delay {
            runner = runner.with_delay(DelayModel::Fixed { delay });
        }

        for target in &targets {
            let name = target.name();
            let result = match target.execute(&runner) {
                Ok(run) => {
                    if args.tables && !args.json {
                        print_tables(&run);
                    }
                    if let Some(path) = &args.export {
                        match SimExport::from_run(&run).write_to_file(path) {
                            Ok(()) => info!("Exported {} events to {}", run.simulator.trace().len(), path.display()),
                            Err(e) => error!("Failed to write export: {}", e),
                        }
                    }
                    run.result
                }
                Err(e) => ScenarioResult::errored(name, seed, &e),
            };

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED: {} events, t={}",
                        name, seed, result.events_dispatched, result.final_time
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        name,
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(2);
            }
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} runs converged to shortest paths", total);
        } else {
            error!("❌ {}/{} runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario,
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
