#![deny(unsafe_code)]

//! supctl: command-line control client for the supervisor daemon.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use supctl_config::AppConfig;
use supctl_core::{ProcessInfo, SupervisorClient, build_info};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Control processes managed by a supervisor daemon over XML-RPC.
#[derive(Parser)]
#[command(name = "supctl", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "supctl.toml")]
    config: PathBuf,

    /// Daemon endpoint, overriding the config file
    /// (`http://host:port/RPC2` or `unix:///path/to.sock`).
    #[arg(short = 's', long)]
    server_url: Option<String>,

    /// Per-call deadline in seconds, overriding the config file; 0 disables.
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Show the status of every process.
    Status {
        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the status of one process.
    Info {
        /// `name` or `group:name`.
        name: String,
    },

    /// Start a process (`name`, `group:name`, or `group:*`).
    Start {
        name: String,
        /// Return as soon as the start is requested.
        #[arg(long)]
        no_wait: bool,
    },

    /// Start every process.
    StartAll {
        #[arg(long)]
        no_wait: bool,
    },

    /// Start every process in a group.
    StartGroup {
        group: String,
        #[arg(long)]
        no_wait: bool,
    },

    /// Stop a process (`name`, `group:name`, or `group:*`).
    Stop {
        name: String,
        /// Return as soon as the stop is requested.
        #[arg(long)]
        no_wait: bool,
    },

    /// Stop every process.
    StopAll {
        #[arg(long)]
        no_wait: bool,
    },

    /// Stop every process in a group.
    StopGroup {
        group: String,
        #[arg(long)]
        no_wait: bool,
    },

    /// Ask the daemon to reload its configuration.
    Reload,

    /// Show API and daemon versions.
    Version,

    /// Shut the daemon down.
    Shutdown,

    /// Restart the daemon.
    Restart,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, from_file) = resolve_config(&cli).await?;

    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !from_file {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    if let Commands::Config { show } = cli.command {
        return cmd_config(&cli.config, &config, show);
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupted, cancelling in-flight call");
                cancel.cancel();
            }
        }
    });

    let client = SupervisorClient::from_config(&config)?.with_cancellation(cancel);
    debug!(endpoint = %client.endpoint(), user_agent = %build_info::user_agent(), "Client ready");

    let mut stdout = std::io::stdout().lock();
    run(cli.command, &client, &mut stdout).await
}

/// Execute one control command and print its result to `out`.
async fn run(command: Commands, client: &SupervisorClient, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Status { json } => {
            let infos = client.get_all_process_info().await?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&infos)?)?;
            } else {
                write!(out, "{}", format_status(&infos))?;
            }
        }
        Commands::Info { name } => {
            let info = client.get_process_info(&name).await?;
            write!(out, "{}", format_status(std::slice::from_ref(&info)))?;
        }
        Commands::Start { name, no_wait } => {
            confirmed(client.start_process(&name, !no_wait).await?, &name)?;
            writeln!(out, "{name}: started")?;
        }
        Commands::StartAll { no_wait } => {
            let infos = client.start_all_processes(!no_wait).await?;
            write!(out, "{}", format_status(&infos))?;
        }
        Commands::StartGroup { group, no_wait } => {
            let infos = client.start_process_group(&group, !no_wait).await?;
            write!(out, "{}", format_status(&infos))?;
        }
        Commands::Stop { name, no_wait } => {
            confirmed(client.stop_process(&name, !no_wait).await?, &name)?;
            writeln!(out, "{name}: stopped")?;
        }
        Commands::StopAll { no_wait } => {
            let infos = client.stop_all_processes(!no_wait).await?;
            write!(out, "{}", format_status(&infos))?;
        }
        Commands::StopGroup { group, no_wait } => {
            let infos = client.stop_process_group(&group, !no_wait).await?;
            write!(out, "{}", format_status(&infos))?;
        }
        Commands::Reload => {
            confirmed(client.reload_config().await?, "reload")?;
            writeln!(out, "Reloaded configuration")?;
        }
        Commands::Version => {
            let api = client.get_api_version().await?;
            let daemon = client.get_supervisor_version().await?;
            writeln!(out, "supctl {}", build_info::version_string())?;
            writeln!(out, "daemon {daemon} (API {api})")?;
        }
        Commands::Shutdown => {
            confirmed(client.shutdown().await?, "shutdown")?;
            writeln!(out, "Shut down")?;
        }
        Commands::Restart => {
            confirmed(client.restart().await?, "restart")?;
            writeln!(out, "Restarted")?;
        }
        Commands::Config { .. } => anyhow::bail!("config is handled without a daemon connection"),
    }
    Ok(())
}

/// A `false` result is the daemon declining the request.
fn confirmed(ok: bool, what: &str) -> Result<()> {
    if !ok {
        anyhow::bail!("{what}: daemon reported failure");
    }
    Ok(())
}

/// One line per process: full name, state, description.
fn format_status(infos: &[ProcessInfo]) -> String {
    let mut s = String::new();
    for info in infos {
        let line = format!(
            "{:<32} {:<10} {}",
            info.full_name(),
            info.statename,
            info.description.as_deref().unwrap_or("")
        );
        s.push_str(line.trim_end());
        s.push('\n');
    }
    s
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to render config")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

/// Load the config file (or defaults), apply flag overrides, and validate.
///
/// Returns whether the file existed.
async fn resolve_config(cli: &Cli) -> Result<(AppConfig, bool)> {
    let from_file = tokio::fs::try_exists(&cli.config).await.unwrap_or(false);
    let mut config = if from_file {
        AppConfig::load(&cli.config)
            .await
            .with_context(|| format!("failed to load {}", cli.config.display()))?
    } else {
        AppConfig::default()
    };

    if let Some(url) = &cli.server_url {
        config.server.url = url.clone();
    }
    if let Some(secs) = cli.timeout {
        config.server.timeout_secs = secs;
    }
    config.validate()?;
    Ok((config, from_file))
}
