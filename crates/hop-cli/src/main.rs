mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hop::PushConfig;
use hop_bunny::ApiClient;
use log::LevelFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "hop")]
#[command(about = "Manage redirects, DNS checks and storage uploads for Bunny CDN pull zones")]
struct Cli {
    /// Print debug logs to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Config file (defaults to ~/.config/hop/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ZoneArgs {
    /// Pull zone name
    #[arg(long)]
    zone: String,
    /// Account API key
    #[arg(long, env = "BUNNY_API_KEY", hide_env_values = true)]
    key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Manage 302 redirect edge rules
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Verify DNS records for pull zone hostnames
    Dns {
        #[command(subcommand)]
        command: DnsCommand,
    },
    /// Storage zone operations
    Cdn {
        #[command(subcommand)]
        command: CdnCommand,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Add a 302 redirect
    Add {
        #[command(flatten)]
        zone: ZoneArgs,
        /// Source path to match
        #[arg(long)]
        from: String,
        /// Destination URL
        #[arg(long)]
        to: String,
        /// Rule description
        #[arg(long)]
        desc: Option<String>,
    },
    /// List 302 redirects
    List {
        #[command(flatten)]
        zone: ZoneArgs,
    },
    /// Analyze redirect rules for common problems
    Check {
        #[command(flatten)]
        zone: ZoneArgs,
        /// Skip HTTP health checks of destination URLs
        #[arg(long)]
        skip_health: bool,
    },
}

#[derive(Subcommand)]
enum DnsCommand {
    /// Check that every hostname has an A or CNAME record
    Check {
        #[command(flatten)]
        zone: ZoneArgs,
    },
}

#[derive(Subcommand)]
enum CdnCommand {
    /// Upload a local directory to the pull zone's storage zone
    Push {
        #[command(flatten)]
        zone: ZoneArgs,
        /// Local directory to upload
        #[arg(long)]
        from: PathBuf,
        /// Remote directory inside the storage zone
        #[arg(long)]
        to: Option<String>,
        /// Number of concurrent uploads
        #[arg(long)]
        workers: Option<usize>,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn api_client(config: &AppConfig, zone: &ZoneArgs) -> Result<ApiClient> {
    let key = config.api_key(zone.key.as_deref()).context(
        "no API key: pass --key, set BUNNY_API_KEY, or add api_key to the config file",
    )?;
    Ok(ApiClient::new(key))
}

fn exit_code(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let app_config = config::load_config(cli.config.as_deref());

    match cli.command {
        Command::Rules { command } => match command {
            RulesCommand::Add {
                zone,
                from,
                to,
                desc,
            } => {
                let api = api_client(&app_config, &zone)?;
                commands::rules::add(&api, &zone.zone, &from, &to, desc.as_deref()).await?;
                Ok(ExitCode::SUCCESS)
            }
            RulesCommand::List { zone } => {
                let api = api_client(&app_config, &zone)?;
                commands::rules::list(&api, &zone.zone).await?;
                Ok(ExitCode::SUCCESS)
            }
            RulesCommand::Check { zone, skip_health } => {
                let api = api_client(&app_config, &zone)?;
                let ok = commands::rules::check(&api, &zone.zone, skip_health).await?;
                Ok(exit_code(ok))
            }
        },
        Command::Dns {
            command: DnsCommand::Check { zone },
        } => {
            let api = api_client(&app_config, &zone)?;
            Ok(exit_code(commands::dns::check(&api, &zone.zone).await?))
        }
        Command::Cdn {
            command:
                CdnCommand::Push {
                    zone,
                    from,
                    to,
                    workers,
                    timeout,
                },
        } => {
            let api = api_client(&app_config, &zone)?;
            let settings = &app_config.push;

            let push_config = PushConfig::new(to.unwrap_or_else(|| settings.remote_prefix.clone()))
                .with_workers(workers.unwrap_or(settings.workers));
            let timeout = Duration::from_secs(timeout.unwrap_or(settings.timeout_secs));

            let ok = commands::push::run(&api, &zone.zone, &from, push_config, timeout).await?;
            Ok(exit_code(ok))
        }
    }
}
