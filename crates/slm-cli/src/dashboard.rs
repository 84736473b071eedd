//! Network settings and on-chain royalty commands

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;

use slm_core::chain::{DashboardState, Poller, PollerConfig, RpcClient};
use slm_core::network::{ContractKind, FileStore, NetworkKind, NetworkProfiles, NetworkSelector};
use slm_core::{Error, Result};

use crate::{Context, EXIT_ERROR, EXIT_OK};

const SETTINGS_FILE: &str = "settings.json";
const SESSION_FILE: &str = "session.json";

const CONTRACTS: [ContractKind; 3] = [ContractKind::Token, ContractKind::Entity, ContractKind::Manager];

fn open_selector(ctx: &Context) -> Result<NetworkSelector<FileStore, FileStore>> {
    let persistent = FileStore::open(ctx.state_dir.join(SETTINGS_FILE))?;
    let session = FileStore::open(ctx.state_dir.join(SESSION_FILE))?;
    Ok(NetworkSelector::new(NetworkProfiles::from_env(), persistent, session))
}

// ── network ───────────────────────────────────────────────

pub fn network_show(json: bool, ctx: &Context) -> Result<i32> {
    let selector = open_selector(ctx)?;
    let config = selector.current();

    if json {
        let contracts: serde_json::Map<String, serde_json::Value> = CONTRACTS
            .iter()
            .map(|&kind| {
                let address = selector.contract_address(kind);
                (kind.as_str().to_string(), serde_json::json!(address))
            })
            .collect();
        let out = serde_json::json!({
            "network": config.kind,
            "name": config.name,
            "rpcUrl": config.rpc_url,
            "chainId": config.chain_id,
            "contracts": contracts,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(EXIT_OK);
    }
    if ctx.quiet {
        return Ok(EXIT_OK);
    }

    println!("{} {}", config.name.bold(), format!("({})", config.kind).dimmed());
    println!(
        "  rpc url:  {}",
        config.rpc_url.as_deref().unwrap_or("(not configured)")
    );
    println!("  chain id: {}", config.chain_id);
    for kind in CONTRACTS {
        let address = selector.contract_address(kind);
        println!(
            "  {:<9} {}",
            format!("{}:", kind.as_str()),
            address.as_deref().unwrap_or("(not set)")
        );
    }
    Ok(EXIT_OK)
}

pub fn network_use(name: &str, ctx: &Context) -> Result<i32> {
    let kind: NetworkKind = name.parse()?;
    let mut selector = open_selector(ctx)?;
    let config = selector.select(kind)?;
    if !ctx.quiet {
        println!("{} using {} ({})", "✓".green(), config.name, config.kind);
    }
    Ok(EXIT_OK)
}

pub fn network_set_address(kind: ContractKind, address: &str, ctx: &Context) -> Result<i32> {
    if !slm_core::rules::is_valid_address(address) {
        return Err(Error::ConfigError(format!("'{}' is not a contract address", address)));
    }
    let mut selector = open_selector(ctx)?;
    selector.set_contract_address(kind, address)?;
    if !ctx.quiet {
        println!("{} {} address set to {}", "✓".green(), kind.as_str(), address);
    }
    Ok(EXIT_OK)
}

pub fn network_load_addresses(text: &str, ctx: &Context) -> Result<i32> {
    let mut selector = open_selector(ctx)?;
    let loaded = selector.load_contract_addresses(text)?;
    if !ctx.quiet {
        println!("{} loaded {} contract addresses", "✓".green(), loaded);
    }
    Ok(EXIT_OK)
}

// ── royalty / watch ───────────────────────────────────────

fn build_poller(entity: Option<&str>, interval: Duration, ctx: &Context) -> Result<Poller<RpcClient>> {
    let selector = open_selector(ctx)?;
    let entity = match entity {
        Some(address) => address.to_string(),
        None => selector.contract_address(ContractKind::Entity).ok_or_else(|| {
            Error::ConfigError(
                "no entity address; pass --entity or run `slm network set-address entity <address>`".into(),
            )
        })?,
    };
    let client = RpcClient::from_network(selector.current())?;
    tracing::info!(url = client.url(), entity = %entity, "connecting");

    let config = PollerConfig {
        interval,
        entity_address: entity,
    };
    Ok(Poller::new(Arc::new(client), config))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::IoError(format!("failed to start async runtime: {}", e)))
}

pub fn royalty(entity: Option<&str>, json: bool, ctx: &Context) -> Result<i32> {
    let poller = build_poller(entity, slm_core::chain::poller::DEFAULT_INTERVAL, ctx)?;
    let state = runtime()?.block_on(poller.poll_once());

    if json {
        let out = serde_json::json!({
            "state": state,
            "summary": state.summary(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !ctx.quiet {
        print_state(&state);
    }
    if let Some(error) = &state.last_error {
        eprintln!("{} {}", "error:".red().bold(), error);
        return Ok(EXIT_ERROR);
    }
    Ok(EXIT_OK)
}

pub fn watch(entity: Option<&str>, interval_secs: u64, ctx: &Context) -> Result<i32> {
    let interval = Duration::from_secs(interval_secs.max(1));
    let mut poller = build_poller(entity, interval, ctx)?;
    let quiet = ctx.quiet;

    runtime()?.block_on(async move {
        let mut updates = poller.subscribe();
        poller.start();

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = updates.borrow_and_update().clone();
                    if !quiet {
                        print_state(&state);
                    }
                    if let Some(error) = &state.last_error {
                        eprintln!("{} {}", "warning:".yellow().bold(), error);
                    }
                }
                _ = &mut ctrl_c => break,
            }
        }
        poller.stop();
    });
    Ok(EXIT_OK)
}

fn print_state(state: &DashboardState) {
    let summary = state.summary();
    let block = state
        .block_number
        .map_or_else(|| "?".to_string(), |n| n.to_string());
    println!(
        "{} block {}  licenses {}/{} active  paid {}  unpaid {}",
        format!("[{}]", state.tick).dimmed(),
        block,
        summary.active_licenses,
        summary.total_licenses,
        summary.total_paid.to_string().green(),
        summary.total_unpaid.to_string().yellow()
    );
    for license in &summary.per_license {
        let flag = if license.is_active {
            "active".green()
        } else {
            "inactive".dimmed()
        };
        println!(
            "  {} {} paid {} unpaid {} ({} payments)",
            license.manager_address, flag, license.paid, license.unpaid, license.payments
        );
    }
}
