use anyhow::Result;
use clap::{Parser, Subcommand};
use rackwatch::config::RackwatchConfig;

#[derive(Parser)]
#[command(
    name = "rackwatch",
    about = "Simulated data-centre incident dashboard backend",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server and the background incident simulator
    Serve {
        /// Bind address, overriding the config file
        #[arg(long)]
        bind: Option<String>,

        /// SQLite database path, overriding the config file
        #[arg(long)]
        db: Option<String>,

        /// Config file path (default: RACKWATCH_CONFIG, then /etc/rackwatch/rackwatch.toml)
        #[arg(long)]
        config: Option<String>,

        /// Do not run the background incident simulator
        #[arg(long)]
        no_simulator: bool,
    },

    /// Reset the database to a small sample incident set
    Seed {
        /// SQLite database path, overriding the config file
        #[arg(long)]
        db: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<String>,
    },

    /// Print dashboard statistics for the stored incidents
    Stats {
        /// SQLite database path, overriding the config file
        #[arg(long)]
        db: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<String>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&str>) -> Result<RackwatchConfig> {
    match path {
        Some(p) => RackwatchConfig::load(std::path::Path::new(p)),
        None => Ok(RackwatchConfig::load_or_default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            db,
            config,
            no_simulator,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            if let Some(db) = db {
                cfg.database.path = db;
            }
            if no_simulator {
                cfg.simulator.enabled = false;
            }

            tracing::info!(bind = %cfg.server.bind, "Starting rackwatch server");
            rackwatch::serve(&cfg).await?;
        }
        Commands::Seed { db, config } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(db) = db {
                cfg.database.path = db;
            }

            let pool = rackwatch::storage::open_pool(&cfg.database.path)?;
            let count = rackwatch::storage::seed::reset_and_seed(&pool)?;
            println!(
                "Seeded {} sample incidents into {}.",
                count, cfg.database.path
            );
        }
        Commands::Stats { db, config, json } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(db) = db {
                cfg.database.path = db;
            }

            let pool = rackwatch::storage::open_pool(&cfg.database.path)?;
            let stats = rackwatch::stats::dashboard_stats(&pool)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("\nRackwatch Incident Summary");
                println!("{:<16} : {}", "Total", stats.total_incidents);
                println!("{:<16} : {}", "Unresolved", stats.open_incidents);
                println!("{:<16} : {}", "Resolved", stats.resolved_incidents);
                match stats.mttr_hours {
                    Some(hours) => println!("{:<16} : {:.2} h", "MTTR", hours),
                    None => println!("{:<16} : n/a", "MTTR"),
                }
                if !stats.by_severity.is_empty() {
                    println!("\nBy severity:");
                    for (severity, count) in &stats.by_severity {
                        println!("  {:<10} : {}", severity.to_string(), count);
                    }
                }
                if !stats.incidents_per_day.is_empty() {
                    println!("\nPer day (most recent active days):");
                    for day in &stats.incidents_per_day {
                        println!("  {} : {}", day.day, day.count);
                    }
                }
                println!();
            }
        }
    }

    Ok(())
}
