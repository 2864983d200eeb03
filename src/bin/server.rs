use clap::{Parser, Subcommand};
use sitegate::{config::Config, start_server_with_config, telemetry};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "sitegate", version, about = "Login and policy consent web front")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "SITEGATE_CONFIG", default_value = "sitegate.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the web server (default)
    Serve,
    /// Print an Argon2 hash for the `users` configuration
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::HashPassword { password }) = &cli.command {
        println!("{}", sitegate::auth::users::hash_password(password)?);
        return Ok(());
    }

    let config = Config::load(&cli.config)?;
    telemetry::init(&config.logging)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    start_server_with_config(config, shutdown_rx).await?;

    // Wait for Ctrl-C
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested, stopping server...");

    let _ = shutdown_tx.send(());
    // Give in-flight requests a short grace period
    tokio::time::sleep(Duration::from_millis(200)).await;

    tracing::info!("server stopped");
    Ok(())
}
