use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use bravia_sdk::{Endpoint, LoggingMode, RemoteAction};

pub mod commands;

/// Bravia remote control
///
/// Probes, resolves and sends IRCC codes to Sony Bravia televisions, or
/// watches a set and reports power changes.
#[derive(Parser, Debug)]
#[command(name = "bravia")]
#[command(about = "Control and monitor Sony Bravia televisions over IRCC")]
#[command(version)]
pub struct Args {
    /// Address of the television; falls back to BRAVIA_TV_IP
    #[arg(long, global = true)]
    pub ip: Option<String>,

    /// Show debug output with source locations
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check whether the set is powered, using a TCP liveness probe
    Probe {
        /// Port to probe; nothing should listen on it
        #[arg(long, default_value = "1")]
        port: u16,

        /// Probe timeout in seconds
        #[arg(long, default_value = "3")]
        timeout: u64,
    },

    /// Find the IRCC control path the set serves
    Resolve,

    /// Send one remote-control code
    Send(SendArgs),

    /// Poll the set and print power transitions until interrupted
    Watch {
        /// Identifier the settings are stored under
        #[arg(long, default_value = "bravia")]
        id: String,

        /// Display name used in logs
        #[arg(long)]
        name: Option<String>,

        /// Poll interval in seconds
        #[arg(long, default_value = "10")]
        interval: u64,

        /// Persist settings in this JSON file
        #[arg(long, conflicts_with = "persist")]
        store_file: Option<PathBuf>,

        /// Persist settings under the user config directory
        #[arg(long)]
        persist: bool,
    },
}

#[derive(ClapArgs, Debug)]
pub struct SendArgs {
    /// Raw IRCC code (base64)
    #[arg(long, conflicts_with = "action", required_unless_present = "action")]
    pub code: Option<String>,

    /// Action name looked up in the command table (e.g. VolumeUp)
    #[arg(long, requires = "table")]
    pub action: Option<String>,

    /// JSON file mapping action names to codes
    #[arg(long)]
    pub table: Option<PathBuf>,

    /// Skip resolution and use this control path (/IRCC or /sony/IRCC)
    #[arg(long)]
    pub endpoint: Option<String>,
}

/// What `send` should transmit
#[derive(Debug, Clone)]
pub enum SendTarget {
    Code(String),
    Action { action: RemoteAction, table: PathBuf },
}

impl SendArgs {
    pub fn target(&self) -> Result<SendTarget> {
        if let Some(code) = &self.code {
            return Ok(SendTarget::Code(code.clone()));
        }

        let name = self
            .action
            .as_deref()
            .context("Either --code or --action is required")?;
        let action = RemoteAction::from_name(name)
            .or_else(|| RemoteAction::from_capability(name))
            .with_context(|| format!("Unknown action '{}'", name))?;
        let table = self
            .table
            .clone()
            .context("--action requires --table")?;

        Ok(SendTarget::Action { action, table })
    }

    pub fn fixed_endpoint(&self) -> Result<Option<Endpoint>> {
        self.endpoint
            .as_deref()
            .map(|path| {
                Endpoint::from_path(path)
                    .with_context(|| format!("Unknown endpoint '{}'", path))
            })
            .transpose()
    }
}

impl Args {
    /// Device address from `--ip` or `BRAVIA_TV_IP`
    pub fn device_ip(&self) -> Result<String> {
        let ip = match &self.ip {
            Some(ip) => ip.clone(),
            None => std::env::var("BRAVIA_TV_IP")
                .context("No device address: pass --ip or set BRAVIA_TV_IP")?,
        };

        let ip = ip.trim().to_string();
        if ip.is_empty() {
            return Err(anyhow::anyhow!("Device address must not be empty"));
        }
        Ok(ip)
    }

    pub fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Probe { timeout, .. } if *timeout == 0 => {
                Err(anyhow::anyhow!("Probe timeout must be positive"))
            }
            Command::Watch { interval, .. } if *interval == 0 => {
                Err(anyhow::anyhow!("Poll interval must be positive"))
            }
            _ => Ok(()),
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    if std::env::var(bravia_sdk::logging::LOG_MODE_ENV).is_ok() {
        bravia_sdk::init_logging_from_env()?;
    } else if verbose {
        bravia_sdk::init_logging(LoggingMode::Debug)?;
    } else {
        bravia_sdk::init_logging(LoggingMode::Development)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose).context("Failed to initialize logging")?;
    args.validate()?;

    let ip = args.device_ip()?;

    match args.command {
        Command::Probe { port, timeout } => {
            commands::probe(&ip, port, Duration::from_secs(timeout)).await
        }
        Command::Resolve => commands::resolve(&ip).await,
        Command::Send(send) => {
            let target = send.target()?;
            let endpoint = send.fixed_endpoint()?;
            commands::send(&ip, endpoint, target).await
        }
        Command::Watch {
            id,
            name,
            interval,
            store_file,
            persist,
        } => {
            let store = commands::StoreChoice::from_flags(store_file, persist);
            commands::watch(&ip, &id, name, Duration::from_secs(interval), store).await
        }
    }
}
