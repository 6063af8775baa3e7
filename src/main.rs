//! finance-store command line.
//!
//! ```text
//! finance-store [--config app.toml] check    # connection diagnostics
//! finance-store [--config app.toml] config   # print resolved configuration
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use finance_store::db::MemoryClient;
use finance_store::diagnostics::{check_connection, failure_hint};
use finance_store::lifecycle::shutdown::close_database;
use finance_store::lifecycle::signals::spawn_signal_listener;
use finance_store::lifecycle::startup::{prepare, start};
use finance_store::lifecycle::Shutdown;

#[derive(Parser)]
#[command(name = "finance-store")]
#[command(about = "Resilient data access for the personal-finance app", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test connect, read, write and delete against the data client
    Check,
    /// Print the resolved configuration and datasource URL
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match prepare(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Config => {
            match toml::to_string_pretty(&config) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            match config.database.datasource_url() {
                Ok(url) => println!("# datasource: {}", url),
                Err(e) => eprintln!("# datasource: invalid ({})", e),
            }
            ExitCode::SUCCESS
        }
        Commands::Check => run_check(config).await,
    }
}

async fn run_check(config: finance_store::AppConfig) -> ExitCode {
    let app = match start(config, MemoryClient::new()).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Database connection failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(Shutdown::new());
    let mut shutdown_rx = shutdown.subscribe();
    let listener = spawn_signal_listener(Arc::clone(&shutdown));

    let client = Arc::clone(app.db.client());
    let outcome = tokio::select! {
        result = check_connection(client.as_ref()) => Some(result),
        _ = shutdown_rx.recv() => None,
    };
    listener.abort();

    let code = match outcome {
        Some(Ok(report)) => {
            println!("Connection: ok");
            println!("Read: ok ({} users)", report.user_count);
            println!("Write: ok (created and removed {})", report.test_user_id);
            ExitCode::SUCCESS
        }
        Some(Err(e)) => {
            eprintln!("Database check failed: {}", e);
            if let Some(hint) = failure_hint(&e) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
        None => {
            eprintln!("Interrupted");
            ExitCode::FAILURE
        }
    };

    if app.db.client().is_connected() {
        close_database(&app.db).await;
    }
    code
}
