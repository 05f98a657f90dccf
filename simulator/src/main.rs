//! Bondcurve Simulator
//!
//! Drives an in-process exchange through named scenarios or seeded random
//! trading and reports the final market state.

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod metrics;
mod scenario;
mod trader;

use bondcurve_exchange::ExchangeConfig;
use controller::SimulationController;
use scenario::Scenario;

/// Bondcurve Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Bondcurve trading simulation environment")]
struct Args {
    /// Number of simulated traders for random mode
    #[arg(short, long, default_value = "5")]
    traders: usize,

    /// Named scenario to run instead of random trading
    #[arg(short, long)]
    scenario: Option<String>,

    /// Random rounds before everyone sells out
    #[arg(short, long, default_value = "500")]
    rounds: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Enable the seed-mint backdoor
    #[arg(long)]
    seed_mint: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print every notification as a JSON line on stdout
    #[arg(long)]
    print_events: bool,

    /// Print exchange counters in Prometheus format at the end
    #[arg(long)]
    prometheus: bool,
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()),
    );

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ExchangeConfig::from_env()?;
    if args.seed_mint {
        config.seed_mint_enabled = true;
    }

    init_tracing(&config.log_level, args.json_logs);

    info!("Starting Bondcurve Simulator");

    let scenario = args.scenario.as_deref().map(Scenario::load).transpose()?;
    if let Some(scenario) = &scenario {
        if scenario.requires_seed_mint && !config.seed_mint_enabled {
            warn!(
                scenario = %scenario.name,
                "Scenario needs seed mint; enabling it"
            );
            config.seed_mint_enabled = true;
        }
    }

    let mut controller =
        SimulationController::new(config, args.traders, args.seed, args.print_events)?;

    match &scenario {
        Some(scenario) => controller.run_scenario(scenario).await?,
        None => controller.run_random(args.rounds).await?,
    }

    let report = controller.report().await?;
    info!("Simulation complete");
    info!(
        "Operations: {} ({} committed, {} rejected)",
        report.simulation.total_operations,
        report.simulation.successful_operations,
        report.simulation.failed_operations
    );
    info!("Success rate: {:.1}%", report.simulation.success_rate() * 100.0);
    for (code, count) in &report.simulation.rejections {
        info!("  {}: {}", code, count);
    }
    info!(
        "Final price: {}, reserve pool: {}, supply: {}",
        report.price, report.reserve_pool, report.total_supply
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    if args.prometheus {
        print!("{}", controller.prometheus());
    }

    if !report.integrity {
        anyhow::bail!("ledger integrity check failed");
    }

    Ok(())
}
