use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use meridian_kernel::config::ReplayConfig;
use meridian_kernel::log::{CommandLog, LogEntry};
use meridian_kernel::metaclass::{ClassLookup, TenantInfo};
use meridian_kernel::replay::{replay_class, AppliedEntry, FailedEntry, ReplayOutcome};
use meridian_kernel::schema::ClassInfo;
use meridian_kernel::sharding::ShardingState;

/// Meridian class metadata CLI
#[derive(Parser, Debug)]
#[command(name = "meridian")]
#[command(about = "Replay class commands and inspect the resulting metadata", long_about = None)]
struct Cli {
    /// Path to the command log JSON
    #[arg(long)]
    log: String,

    /// Path to replay config JSON
    #[arg(long)]
    config: Option<String>,

    /// Local node id (overrides the config)
    #[arg(long)]
    node: Option<String>,

    /// Tenants to resolve after replay
    #[arg(long = "tenant")]
    tenants: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TenantRoute {
    tenant: String,
    shard: String,
    status: String,
    owner: Option<String>,
}

/// Wrapper for JSON output
#[derive(Debug, Serialize)]
struct CliOutput {
    node_id: String,
    class_info: ClassInfo,
    sharding: Option<ShardingState>,
    tenants: Vec<TenantInfo>,
    routes: Vec<TenantRoute>,
    applied: Vec<AppliedEntry>,
    failures: Vec<FailedEntry>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // ----------------------------
    // Load config
    // ----------------------------
    let mut config = if let Some(path) = &cli.config {
        let data = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        serde_json::from_str::<ReplayConfig>(&data)?
    } else {
        ReplayConfig::default_config()
    };
    if let Some(node) = cli.node {
        config.node_id = node;
    }

    // ----------------------------
    // Load command log
    // ----------------------------
    let log_data = fs::read_to_string(&cli.log).with_context(|| format!("reading {}", cli.log))?;
    let entries: Vec<LogEntry> = serde_json::from_str(&log_data)?;

    let log = CommandLog::try_from(entries).with_context(|| format!("validating {}", cli.log))?;
    info!(entries = log.len(), node = %config.node_id, "replaying command log");

    // ----------------------------
    // Replay
    // ----------------------------
    let ReplayOutcome {
        class,
        applied,
        failures,
    } = replay_class(&log, &config)?;

    // ----------------------------
    // Resolve requested tenants
    // ----------------------------
    let routes = cli
        .tenants
        .iter()
        .map(|tenant| {
            let (shard, status) = class.as_ref().tenant_shard(tenant);
            let owner = class
                .as_ref()
                .and_then(|meta| meta.shard_owner(tenant).ok());
            TenantRoute {
                tenant: tenant.clone(),
                shard,
                status,
                owner,
            }
        })
        .collect();

    // ----------------------------
    // Output
    // ----------------------------
    let output = CliOutput {
        node_id: config.node_id,
        class_info: class.as_ref().class_info(),
        sharding: class.as_ref().map(|meta| meta.copy_sharding_state()),
        tenants: class
            .as_ref()
            .map(|meta| meta.tenants(&[]))
            .unwrap_or_default(),
        routes,
        applied,
        failures,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
