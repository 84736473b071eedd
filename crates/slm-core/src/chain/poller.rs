//! Dashboard poller — periodic reads of every Manager contract
//!
//! # Guarantees
//!
//! - The interval, task handle and shutdown signal are fields of [`Poller`];
//!   nothing is global, and dropping the poller stops it
//! - Ticks run one after another inside a single task, so published states
//!   are ordered
//! - A failing read is recorded in [`DashboardState::last_error`] and logged;
//!   the next tick retries, nothing retries within a tick
//! - Manager discovery is retried on each tick until it succeeds

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::LicenseChain;
use crate::royalty::{summarize, ManagerSnapshot, RoyaltySummary};
use crate::Error;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Entity contract whose licensee licenses are polled
    pub entity_address: String,
}

impl PollerConfig {
    pub fn new(entity_address: &str) -> Self {
        PollerConfig {
            interval: DEFAULT_INTERVAL,
            entity_address: entity_address.to_string(),
        }
    }
}

/// Latest view of the chain, published after every tick
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub tick: u64,
    pub block_number: Option<u64>,
    pub accounts: Vec<String>,
    /// Manager contracts found through the Entity; `None` until discovery succeeds
    pub licenses: Option<Vec<String>>,
    pub managers: Vec<ManagerSnapshot>,
    pub last_error: Option<String>,
    pub error_count: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn summary(&self) -> RoyaltySummary {
        summarize(&self.managers)
    }
}

pub struct Poller<C: LicenseChain + 'static> {
    chain: Arc<C>,
    config: PollerConfig,
    state: Arc<watch::Sender<DashboardState>>,
    receiver: watch::Receiver<DashboardState>,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl<C: LicenseChain + 'static> Poller<C> {
    pub fn new(chain: Arc<C>, config: PollerConfig) -> Self {
        let (tx, rx) = watch::channel(DashboardState::default());
        Poller {
            chain,
            config,
            state: Arc::new(tx),
            receiver: rx,
            shutdown: None,
            handle: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.receiver.clone()
    }

    pub fn state(&self) -> DashboardState {
        self.receiver.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Spawn the polling task; the first tick runs immediately.
    /// Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        let (tx, mut stop_rx) = watch::channel(false);
        let chain = Arc::clone(&self.chain);
        let state = Arc::clone(&self.state);
        let config = self.config.clone();

        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval = ?config.interval, entity = %config.entity_address, "poller started");
            loop {
                tokio::select! {
                    _ = interval.tick() => poll_tick(chain.as_ref(), &config, &state).await,
                    _ = stop_rx.changed() => break,
                }
            }
            tracing::info!("poller stopped");
        }));
        self.shutdown = Some(tx);
        true
    }

    /// Cancel the polling task. Returns false if it was not running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        was_running
    }

    /// Run a single tick in the caller's task and return the published state
    pub async fn poll_once(&self) -> DashboardState {
        poll_tick(self.chain.as_ref(), &self.config, &self.state).await;
        self.state()
    }
}

impl<C: LicenseChain + 'static> Drop for Poller<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_tick<C: LicenseChain + ?Sized>(
    chain: &C,
    config: &PollerConfig,
    state: &watch::Sender<DashboardState>,
) {
    let mut errors: Vec<Error> = Vec::new();

    let block_number = match chain.block_number().await {
        Ok(n) => Some(n),
        Err(e) => {
            // Node unreachable: every other read would fail the same way
            log_error("eth_blockNumber", &e);
            publish(state, |s| {
                s.last_error = Some(e.to_string());
                s.error_count = 1;
            });
            return;
        }
    };

    let (previous, mut licenses) = {
        let current = state.borrow();
        (current.managers.clone(), current.licenses.clone())
    };

    let mut accounts = None;
    if licenses.is_none() {
        match chain.accounts().await {
            Ok(a) => accounts = Some(a),
            Err(e) => {
                log_error("eth_accounts", &e);
                errors.push(e);
            }
        }
        match chain.active_licensee_licenses(&config.entity_address).await {
            Ok(found) => {
                tracing::info!(count = found.len(), "licensee licenses discovered");
                licenses = Some(found);
            }
            Err(e) => {
                log_error("getActiveLicenseeSLs", &e);
                errors.push(e);
            }
        }
    }

    let mut managers = Vec::new();
    for address in licenses.iter().flatten() {
        match chain.manager_snapshot(address).await {
            Ok(snapshot) => managers.push(snapshot),
            Err(e) => {
                log_error("manager snapshot", &e);
                // Keep showing the last good read
                if let Some(prev) = previous.iter().find(|m| &m.manager_address == address) {
                    managers.push(prev.clone());
                }
                errors.push(e);
            }
        }
    }

    publish(state, |s| {
        s.block_number = block_number;
        if let Some(accounts) = accounts {
            s.accounts = accounts;
        }
        s.licenses = licenses;
        s.managers = managers;
        s.last_error = errors.first().map(|e| e.to_string());
        s.error_count = errors.len();
    });
}

fn publish(state: &watch::Sender<DashboardState>, update: impl FnOnce(&mut DashboardState)) {
    state.send_modify(|s| {
        update(s);
        s.tick += 1;
        s.updated_at = Some(Utc::now());
    });
    tracing::debug!(tick = state.borrow().tick, "dashboard state published");
}

fn log_error(operation: &str, error: &Error) {
    tracing::warn!(operation, error = %error, "poll read failed");
    if let Some(steps) = error.remediation() {
        for step in steps {
            tracing::info!("{}", step);
        }
    }
}
