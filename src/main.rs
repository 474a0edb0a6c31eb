mod aggregator;
mod config;
mod error;
mod insights;
mod metrics;
mod models;
mod providers;
mod scheduler;
mod service;
mod window;

use clap::{Parser, Subcommand};
use config::{
    delete_api_token, ensure_initialized, load_config, save_config, set_api_token, AppConfig,
};
use error::AppError;
use models::{DashboardModel, Granularity, RangeToken};
use service::DashboardService;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "costscope")]
#[command(about = "Cloud cost dashboard aggregator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Init,
    AddAccount {
        id: u32,
        name: String,
        #[arg(long)]
        api_token: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
    },
    RemoveAccount {
        id: u32,
    },
    /// One aggregation cycle, printed as JSON.
    Run {
        #[arg(long)]
        account: Option<u32>,
        /// Range preset; falls back to the configured default_range.
        #[arg(long)]
        range: Option<String>,
        #[arg(long, default_value = "daily")]
        granularity: String,
        #[arg(long)]
        pretty: bool,
    },
    /// Periodic refresh; prints each completed model until interrupted.
    Watch {
        #[arg(long)]
        account: Option<u32>,
        /// Range preset; falls back to the configured default_range.
        #[arg(long)]
        range: Option<String>,
        #[arg(long, default_value = "daily")]
        granularity: String,
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Extracts headline insights from report text (argument or stdin).
    Insights {
        text: Option<String>,
    },
}

fn parse_granularity(input: &str) -> Result<Granularity, AppError> {
    match input.to_ascii_lowercase().as_str() {
        "daily" => Ok(Granularity::Daily),
        "monthly" => Ok(Granularity::Monthly),
        "yearly" => Ok(Granularity::Yearly),
        _ => Err(AppError::Config(
            "Unsupported granularity. Use daily, monthly, or yearly.".into(),
        )),
    }
}

/// An explicit `--range` wins; otherwise the persisted default applies.
fn select_range(cfg: &AppConfig, requested: Option<&str>) -> Result<RangeToken, AppError> {
    match requested {
        Some(raw) => window::parse_range_token(raw),
        None => window::parse_range_token(&cfg.default_range),
    }
}

fn resolve_account(cfg: &AppConfig, requested: Option<u32>) -> Result<u32, AppError> {
    match requested {
        Some(id) => cfg
            .account(id)
            .map(|a| a.id)
            .ok_or(AppError::UnknownAccount(id)),
        None => cfg.default_account().map(|a| a.id).ok_or_else(|| {
            AppError::Config("No accounts configured. Run 'costscope add-account' first.".into())
        }),
    }
}

fn print_model(model: &DashboardModel, pretty: bool) -> Result<(), AppError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(model)?
    } else {
        serde_json::to_string(model)?
    };
    println!("{rendered}");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("costscope=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            ensure_initialized()?;
            println!("Initialized costscope config directory.");
        }
        Commands::AddAccount {
            id,
            name,
            api_token,
            base_url,
        } => {
            ensure_initialized()?;
            let mut cfg = load_config()?;

            if let Some(existing) = cfg.accounts.iter_mut().find(|a| a.id == id) {
                existing.name = name.clone();
                existing.base_url = base_url;
            } else {
                cfg.accounts.push(config::AccountSettings {
                    id,
                    name: name.clone(),
                    base_url,
                });
            }

            if let Some(token) = api_token {
                set_api_token(id, &token)?;
            }
            save_config(&cfg)?;
            println!("Account {id} ('{name}') configured.");
        }
        Commands::RemoveAccount { id } => {
            ensure_initialized()?;
            let mut cfg = load_config()?;
            let before = cfg.accounts.len();
            cfg.accounts.retain(|a| a.id != id);
            if cfg.accounts.len() == before {
                return Err(AppError::UnknownAccount(id));
            }
            delete_api_token(id)?;
            save_config(&cfg)?;
            println!("Account {id} removed.");
        }
        Commands::Run {
            account,
            range,
            granularity,
            pretty,
        } => {
            ensure_initialized()?;
            let cfg = load_config()?;
            // Selection errors surface before any network traffic.
            let range = select_range(&cfg, range.as_deref())?;
            let granularity = parse_granularity(&granularity)?;
            let account_id = resolve_account(&cfg, account)?;

            let svc = DashboardService::new(cfg)?;
            let model = svc.run_cycle(account_id, range, granularity).await?;
            if !model.source_failures.is_empty() {
                tracing::warn!(
                    degraded = model.source_failures.len(),
                    "some sources were unavailable this cycle"
                );
            }
            print_model(&model, pretty)?;
        }
        Commands::Watch {
            account,
            range,
            granularity,
            interval_secs,
        } => {
            ensure_initialized()?;
            let cfg = load_config()?;
            let range = select_range(&cfg, range.as_deref())?;
            let granularity = parse_granularity(&granularity)?;
            let account_id = resolve_account(&cfg, account)?;
            let interval = Duration::from_secs(interval_secs.unwrap_or(cfg.refresh_seconds).max(1));

            let svc = Arc::new(DashboardService::new(cfg)?);
            let seed = svc.run_cycle(account_id, range, granularity).await?;
            print_model(&seed, false)?;

            let (handle, mut rx) =
                svc.start_auto_refresh(account_id, range, granularity, interval, Some(seed));
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    next = rx.recv() => match next {
                        Some(model) => print_model(&model, false)?,
                        None => break,
                    },
                }
            }
            handle.cancel();
        }
        Commands::Insights { text } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let found = insights::extract_key_insights(&text);
            println!("{}", serde_json::to_string(&found)?);
        }
    }

    Ok(())
}
