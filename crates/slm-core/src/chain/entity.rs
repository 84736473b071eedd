//! Entity name resolution with a per-address cache

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::LicenseChain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Licensor,
    Licensee,
}

impl PartyRole {
    pub fn fallback_name(&self) -> &'static str {
        match self {
            PartyRole::Licensor => "Unknown Licensor",
            PartyRole::Licensee => "Unknown Licensee",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedName {
    pub name: String,
    pub is_from_contract: bool,
}

/// Resolves Entity contract addresses to display names.
///
/// Results are cached by lower-cased address, failures included: an address
/// whose `name()` call failed keeps its fallback name until [`clear`](Self::clear).
pub struct EntityResolver<C: LicenseChain> {
    chain: Arc<C>,
    cache: Mutex<HashMap<String, ResolvedName>>,
}

impl<C: LicenseChain> EntityResolver<C> {
    pub fn new(chain: Arc<C>) -> Self {
        EntityResolver {
            chain,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, address: &str, role: PartyRole) -> ResolvedName {
        let key = address.trim().to_ascii_lowercase();
        if key.is_empty() {
            return fallback(role);
        }
        if let Some(hit) = self.cache.lock().await.get(&key) {
            return hit.clone();
        }

        let resolved = match self.chain.entity_name(&key).await {
            Ok(name) if !name.trim().is_empty() => ResolvedName {
                name: name.trim().to_string(),
                is_from_contract: true,
            },
            Ok(_) => {
                tracing::warn!(address = %key, "entity returned an empty name");
                fallback(role)
            }
            Err(e) => {
                tracing::warn!(address = %key, error = %e, "failed to resolve entity name");
                fallback(role)
            }
        };

        self.cache.lock().await.insert(key, resolved.clone());
        resolved
    }

    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

fn fallback(role: PartyRole) -> ResolvedName {
    ResolvedName {
        name: role.fallback_name().to_string(),
        is_from_contract: false,
    }
}
