mod pipeline;
mod run;
mod schedule;
mod sources;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cpdb-cli")]
#[command(about = "Coupon scraping and ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape every active source once, then purge expired coupons
    Run {
        /// Only scrape the named source (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,
        /// Reconcile against an in-memory store instead of the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete scraper-owned coupons that expired before today
    Purge,
    /// Run ingestion and purge on their cron schedules until interrupted
    Schedule,
    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect configured sources
    Sources {
        #[command(subcommand)]
        command: SourcesCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

#[derive(Debug, Subcommand)]
enum SourcesCommands {
    /// List sources from the sources file and whether they are active
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = cpdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Run { sources, dry_run }) => run::run_once(&config, sources, dry_run).await,
        Some(Commands::Purge) => run::run_purge(&config).await,
        Some(Commands::Schedule) => schedule::run_scheduled(&config).await,
        Some(Commands::Db { command }) => run_db(&config, command).await,
        Some(Commands::Sources {
            command: SourcesCommands::List,
        }) => sources::list_sources(&config),
        None => {
            println!("cpdb-cli: no command given (see --help)");
            Ok(())
        }
    }
}

async fn run_db(config: &cpdb_core::AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = pipeline::connect(config).await?;
    match command {
        DbCommands::Migrate => {
            let applied = cpdb_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Ping => {
            cpdb_db::ping(&pool).await?;
            println!("database reachable");
        }
    }
    Ok(())
}
