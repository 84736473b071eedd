//! Network configuration — chain profiles, selection and contract addresses
//!
//! Three profiles exist: `development`, `alps` and `custom`. Each is built
//! from `SLM_<DEV|ALPS|CUSTOM>_*` environment variables with fixed defaults.
//! The selected profile is remembered in a persistent key-value store;
//! contract addresses missing from the profile fall back to a session store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Persistent key holding the selected network
pub const NETWORK_KEY: &str = "networkType";

/// Placeholder address shipped in sample env files; treated as unset
const ADDRESS_PLACEHOLDER: &str = "0x...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Development,
    Alps,
    Custom,
}

impl NetworkKind {
    pub const ALL: [NetworkKind; 3] = [NetworkKind::Development, NetworkKind::Alps, NetworkKind::Custom];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkKind::Development => "development",
            NetworkKind::Alps => "alps",
            NetworkKind::Custom => "custom",
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            NetworkKind::Development => "SLM_DEV",
            NetworkKind::Alps => "SLM_ALPS",
            NetworkKind::Custom => "SLM_CUSTOM",
        }
    }
}

impl std::fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NetworkKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "development" => Ok(NetworkKind::Development),
            "alps" => Ok(NetworkKind::Alps),
            "custom" => Ok(NetworkKind::Custom),
            other => Err(Error::ConfigError(format!(
                "unknown network '{}', expected development, alps or custom",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    Token,
    Entity,
    Manager,
}

impl ContractKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractKind::Token => "token",
            ContractKind::Entity => "entity",
            ContractKind::Manager => "manager",
        }
    }

    /// Session-store key, e.g. `entityAddress`
    pub fn session_key(&self) -> String {
        format!("{}Address", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ContractAddresses {
    pub token: Option<String>,
    pub entity: Option<String>,
    pub manager: Option<String>,
}

impl ContractAddresses {
    pub fn get(&self, kind: ContractKind) -> Option<&str> {
        let value = match kind {
            ContractKind::Token => &self.token,
            ContractKind::Entity => &self.entity,
            ContractKind::Manager => &self.manager,
        };
        value.as_deref().filter(|a| !a.is_empty() && *a != ADDRESS_PLACEHOLDER)
    }
}

/// One chain profile
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub kind: NetworkKind,
    /// `alps` has no default endpoint
    pub rpc_url: Option<String>,
    pub chain_id: u64,
    pub name: String,
    pub contracts: ContractAddresses,
}

impl NetworkConfig {
    /// Build a profile from `lookup` (usually the process environment)
    pub fn from_lookup(kind: NetworkKind, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let prefix = kind.env_prefix();
        let var = |suffix: &str| lookup(&format!("{}_{}", prefix, suffix)).filter(|v| !v.is_empty());

        let (default_url, default_chain, default_name) = match kind {
            NetworkKind::Development => (Some("http://localhost:8545"), 31337, "Hardhat Local"),
            NetworkKind::Alps => (None, 1337, "ALPS Network"),
            NetworkKind::Custom => (Some("http://localhost:8545"), 31337, "Custom Network"),
        };

        NetworkConfig {
            kind,
            rpc_url: var("RPC_URL").or_else(|| default_url.map(str::to_string)),
            chain_id: var("CHAIN_ID")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default_chain),
            name: var("NETWORK_NAME").unwrap_or_else(|| default_name.to_string()),
            contracts: ContractAddresses {
                token: var("TOKEN_ADDRESS"),
                entity: var("ENTITY_ADDRESS"),
                manager: var("MANAGER_ADDRESS"),
            },
        }
    }

    pub fn from_env(kind: NetworkKind) -> Self {
        Self::from_lookup(kind, |key| std::env::var(key).ok())
    }

    pub fn require_rpc_url(&self) -> Result<&str> {
        self.rpc_url.as_deref().ok_or_else(|| {
            Error::ConfigError(format!(
                "network '{}' has no RPC URL; set {}_RPC_URL",
                self.kind,
                self.kind.env_prefix()
            ))
        })
    }
}

/// All three profiles plus the default selection
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkProfiles {
    pub default_kind: NetworkKind,
    profiles: [NetworkConfig; 3],
}

impl NetworkProfiles {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_kind = lookup("SLM_DEFAULT_NETWORK")
            .and_then(|v| v.parse().ok())
            .unwrap_or(NetworkKind::Development);
        NetworkProfiles {
            default_kind,
            profiles: NetworkKind::ALL.map(|kind| NetworkConfig::from_lookup(kind, &lookup)),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn get(&self, kind: NetworkKind) -> &NetworkConfig {
        match kind {
            NetworkKind::Development => &self.profiles[0],
            NetworkKind::Alps => &self.profiles[1],
            NetworkKind::Custom => &self.profiles[2],
        }
    }
}

// ── Key-value stores ──────────────────────────────────────

/// String key-value storage for settings
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Process-lifetime store; used as the session store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON-object file store, rewritten on every change
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `path`; a missing file is an empty store
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                Error::ConfigError(format!("invalid settings file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(FileStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            self.restore(key, previous);
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if let Some(previous) = self.entries.remove(key) {
            if let Err(e) = self.flush() {
                self.restore(key, Some(previous));
                return Err(e);
            }
        }
        Ok(())
    }
}

impl FileStore {
    // Undo an in-memory change whose flush failed, so memory matches the file.
    fn restore(&mut self, key: &str, previous: Option<String>) {
        match previous {
            Some(value) => self.entries.insert(key.to_string(), value),
            None => self.entries.remove(key),
        };
    }
}

// ── Selection ─────────────────────────────────────────────

/// Resolves the active network profile and contract addresses
pub struct NetworkSelector<P: KeyValueStore, S: KeyValueStore = MemoryStore> {
    profiles: NetworkProfiles,
    persistent: P,
    session: S,
}

impl<P: KeyValueStore, S: KeyValueStore> NetworkSelector<P, S> {
    pub fn new(profiles: NetworkProfiles, persistent: P, session: S) -> Self {
        NetworkSelector {
            profiles,
            persistent,
            session,
        }
    }

    /// Stored selection, else the default; unknown stored values fall back to development
    pub fn current_kind(&self) -> NetworkKind {
        match self.persistent.get(NETWORK_KEY) {
            Some(stored) => stored.parse().unwrap_or_else(|_| {
                tracing::warn!(network = %stored, "unknown stored network, using development");
                NetworkKind::Development
            }),
            None => self.profiles.default_kind,
        }
    }

    pub fn current(&self) -> &NetworkConfig {
        self.profiles.get(self.current_kind())
    }

    pub fn select(&mut self, kind: NetworkKind) -> Result<&NetworkConfig> {
        self.persistent.set(NETWORK_KEY, kind.as_str())?;
        tracing::info!(network = %kind, "network selected");
        Ok(self.profiles.get(kind))
    }

    /// Profile address first, then the session fallback
    pub fn contract_address(&self, kind: ContractKind) -> Option<String> {
        if let Some(address) = self.current().contracts.get(kind) {
            return Some(address.to_string());
        }
        self.session
            .get(&kind.session_key())
            .filter(|a| !a.is_empty() && a != ADDRESS_PLACEHOLDER)
    }

    pub fn set_contract_address(&mut self, kind: ContractKind, address: &str) -> Result<()> {
        tracing::debug!(contract = kind.as_str(), network = %self.current_kind(), address, "contract address set");
        self.session.set(&kind.session_key(), address)
    }

    /// Seed the session store from a deployment address file
    ///
    /// The file is a JSON object whose keys name the contract
    /// (`Token`, `entity`, ...; case-insensitive) and whose values are addresses.
    pub fn load_contract_addresses(&mut self, text: &str) -> Result<usize> {
        let map: BTreeMap<String, serde_json::Value> = serde_json::from_str(text)?;
        let mut loaded = 0;
        for (key, value) in map {
            let kind = match key.to_ascii_lowercase().as_str() {
                "token" => ContractKind::Token,
                "entity" => ContractKind::Entity,
                "manager" => ContractKind::Manager,
                _ => continue,
            };
            if let Some(address) = value.as_str() {
                self.set_contract_address(kind, address)?;
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    pub fn profiles(&self) -> &NetworkProfiles {
        &self.profiles
    }
}
