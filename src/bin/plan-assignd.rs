use std::path::PathBuf;

use clap::Parser;
use plan_assign::config::Config;
use plan_assign::daemon;
use plan_assign::error::Result;

#[derive(Parser, Debug)]
#[command(name = "plan-assignd")]
#[command(about = "Plan procedure assignment server")]
struct Cli {
    /// JSON config file; defaults apply when absent.
    #[arg(long, env = "PLAN_ASSIGN_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    plan_assign::logging::init_tracing("plan_assignd");
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(plan_assign::runtime_paths::default_config_path);
    let mut config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        tracing::info!(
            "No config at {}; using convention defaults",
            config_path.to_string_lossy()
        );
        Config::convention_defaults(&plan_assign::runtime_paths::default_db_path())
    }
    .apply_env_overrides()?;

    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(db) = cli.db {
        config.database.sqlite_path = db;
    }

    daemon::run_with_shutdown(&config, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", err);
            futures::future::pending::<()>().await;
        }
    })
    .await
}
