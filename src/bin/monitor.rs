use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sea_orm::Database;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use appwatch::config::MonitorConfig;
use appwatch::monitoring::scheduler::{MonitorFilter, MonitorScheduler};
use appwatch::notifications::service::spawn_dispatcher;
use appwatch::version::VERSION;

#[derive(Parser)]
#[command(name = "appwatch", version = VERSION, about = "HTTP application monitor")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one monitoring pass and exit.
    Run {
        /// Check only this application.
        #[arg(long)]
        application: Option<i32>,
        /// Check only applications in this group.
        #[arg(long)]
        group: Option<i32>,
        /// Check the selected applications even if their interval has not
        /// elapsed.
        #[arg(long)]
        force: bool,
    },
    /// Run the monitoring loop until interrupted.
    Daemon,
}

fn init_logging() {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "monitor.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_logging();
    info!(version = VERSION, "Starting monitor...");

    let config = match MonitorConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Critical error loading configuration. Exiting.");
            return Err(e.into());
        }
    };

    let db = Database::connect(&config.database_url).await?;
    let (events, dispatcher) = spawn_dispatcher(db.clone());
    let scheduler = Arc::new(MonitorScheduler::new(
        db,
        events.clone(),
        config.monitor_policy(),
    ));

    match cli.command {
        Command::Run {
            application,
            group,
            force,
        } => {
            let filter = MonitorFilter {
                application_id: application,
                group_id: group,
                force,
            };
            let summary = scheduler.run_pass(&filter).await?;
            info!(
                processed = summary.processed,
                skipped = summary.skipped,
                total = summary.total,
                "Monitoring run complete."
            );
            // Drop every event handle so the dispatcher drains and exits.
            drop(scheduler);
            drop(events);
            dispatcher.await?;
        }
        Command::Daemon => {
            let period = config.tick_period();
            info!(tick_seconds = config.tick_seconds, "Monitoring daemon started.");
            let loop_handle = Arc::clone(&scheduler).start_periodic(period);
            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received, stopping monitoring loop.");
            loop_handle.abort();
            drop(scheduler);
            drop(events);
            dispatcher.await?;
        }
    }

    Ok(())
}
