//! Chain access — read-only views of the Entity and Manager contracts
//!
//! # Architecture
//!
//! ```text
//! NetworkConfig ─▶ RpcClient (JSON-RPC over HTTP) ─┐
//!                                                  ├─▶ impl LicenseChain
//!                         test doubles ────────────┘          │
//!                                                             ▼
//!                     EntityResolver (name cache)    Poller (watch::Receiver<DashboardState>)
//! ```
//!
//! Nothing here writes to the chain.

pub mod abi;
pub mod entity;
pub mod poller;
pub mod rpc;

pub use entity::{EntityResolver, PartyRole, ResolvedName};
pub use poller::{DashboardState, Poller, PollerConfig};
pub use rpc::RpcClient;

use async_trait::async_trait;

use crate::royalty::ManagerSnapshot;
use crate::Result;

/// Read operations the dashboard performs against a node.
///
/// Implementations must not retry internally; the poller's next tick is the
/// retry.
#[async_trait]
pub trait LicenseChain: Send + Sync {
    async fn block_number(&self) -> Result<u64>;

    async fn accounts(&self) -> Result<Vec<String>>;

    /// Manager contract addresses of the licenses where `entity` is licensee
    async fn active_licensee_licenses(&self, entity: &str) -> Result<Vec<String>>;

    /// Licensor, licensee, activity flag and royalty history of one Manager
    async fn manager_snapshot(&self, manager: &str) -> Result<ManagerSnapshot>;

    /// `name()` of an Entity contract
    async fn entity_name(&self, entity: &str) -> Result<String>;
}
