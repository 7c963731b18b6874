use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use smsgw::bootstrap::Server;
use smsgw::config::Config;
use smsgw::provider::Balance;
use smsgw::telemetry::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(name = "smsgw")]
#[command(author, version, about = "Multi-provider SMS gateway with failover")]
struct Args {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Validate config and exit
    #[arg(long)]
    validate: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List providers in failover order
    Providers,

    /// Send one message
    Send {
        /// Destination number
        #[arg(long)]
        to: String,

        /// Message text
        #[arg(long)]
        body: String,

        /// Sender number
        #[arg(long, conflicts_with = "assign")]
        from: Option<String>,

        /// Take the sender number from the pool
        #[arg(long)]
        assign: bool,
    },

    /// Poll delivery status
    Status {
        /// Provider name
        #[arg(long)]
        provider: String,

        /// Provider message id
        #[arg(long)]
        message_id: String,
    },

    /// Show account balance of every provider
    Balance,

    /// Show pool state
    Pool,

    /// Run the daily reset scheduler until interrupted (default)
    Run,
}

#[derive(Serialize)]
struct ProviderLine<'a> {
    name: &'a str,
    primary: bool,
}

#[derive(Serialize)]
struct BalanceLine<'a> {
    provider: &'a str,
    /// `None` when the provider cannot report a balance
    balance: Option<f64>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (to get log settings)
    let config = Config::load(&args.config)?;

    let tracing_config = TracingConfig {
        service_name: "smsgw".to_string(),
        log_level: config.settings.log_level.clone(),
        json_logs: config.settings.json_logs,
    };
    init_tracing(&tracing_config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        providers = config.providers.len(),
        numbers = config.pool.numbers.len(),
        "configuration loaded"
    );

    // Validate only mode
    if args.validate {
        info!("configuration is valid");
        return Ok(());
    }

    let server = Server::new(config).await?;
    let gateway = server.gateway();

    match args.command.unwrap_or(Command::Run) {
        Command::Providers => {
            let lines: Vec<ProviderLine<'_>> = gateway
                .failover_order()
                .into_iter()
                .map(|name| ProviderLine {
                    name,
                    primary: gateway.primary() == Some(name),
                })
                .collect();
            print_json(&lines)
        }
        Command::Send {
            to,
            body,
            from,
            assign,
        } => {
            if assign {
                match gateway.send_assigned(server.pool(), &to, &body, None).await? {
                    Some(result) => print_json(&result),
                    None => anyhow::bail!("no sender number available for {}", to),
                }
            } else {
                let result = gateway.send(&to, &body, from.as_deref()).await?;
                print_json(&result)
            }
        }
        Command::Status {
            provider,
            message_id,
        } => {
            let status = gateway.provider_status(&provider, &message_id).await?;
            print_json(&status)
        }
        Command::Balance => {
            let names = gateway.list_providers();
            let mut lines = Vec::with_capacity(names.len());
            for name in &names {
                let balance = match gateway.provider_balance(name).await? {
                    Balance::Amount(v) => Some(v),
                    Balance::Unsupported => None,
                };
                lines.push(BalanceLine {
                    provider: name,
                    balance,
                });
            }
            print_json(&lines)
        }
        Command::Pool => print_json(&server.pool().stats().await),
        Command::Run => server.run().await,
    }
}
