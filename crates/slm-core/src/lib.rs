//! Smart License Core - versioned IP-licensing documents
//!
//! Single source of truth for smart license semantics. The CLI and the
//! WebAssembly binding used by the dashboard both call into this crate.
//!
//! # Architecture
//!
//! ```text
//! Form / free text → Generator → LicenseDocument (versioned JSON)
//!                                      ↓
//!                                  Lifecycle → draft → proposed → approved → deployed
//!                                      ↓
//!                              Solidity render → Comparator ← uploaded .sol
//!                                      ↓
//!                               Wizard (gates each step on the above)
//!
//! Network profile → RpcClient → Poller → RoyaltySummary   (feature "chain")
//! ```
//!
//! # Guarantees
//!
//! - **Append-only**: edits and revision requests add versions, never rewrite data
//! - **Gap-free**: version numbers are 1, 2, 3, ... with no holes
//! - **Mirrored**: `LicenseDocument::status` always equals the current version's status
//! - **Non-destructive**: a rejected transition or a bad upload leaves state untouched

pub mod canonical;
pub mod comparator;
pub mod error;
pub mod export;
pub mod generator;
pub mod lifecycle;
pub mod network;
pub mod royalty;
pub mod rules;
pub mod solidity;
pub mod verifier;
pub mod wizard;

#[cfg(feature = "chain")]
pub mod chain;

use chrono::{DateTime, Utc};

pub use error::{Error, Result};
pub use rules::Rule;

/// Address used when a party has not been filled in
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// A versioned smart license proposal
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDocument {
    pub license_id: String,
    pub name: String,
    pub current_version: u32,
    pub status: VersionStatus,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub parties: Parties,
    pub versions: Vec<Version>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Parties {
    pub licensor: String,
    pub licensee: String,
    pub territory: String,
}

/// Immutable snapshot of license terms plus status and reviewer feedback
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub version_number: u32,
    pub status: VersionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub data: VersionData,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// License terms carried by a version
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VersionData {
    pub duration: String,
    pub ips: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Feedback {
    pub from: String,
    pub date: DateTime<Utc>,
    pub message: String,
}

/// Status of a single version (and, mirrored, of the whole document)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    Proposed,
    NeedsRevision,
    Approved,
    Deployed,
    Superseded,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Draft => "draft",
            VersionStatus::Proposed => "proposed",
            VersionStatus::NeedsRevision => "needs_revision",
            VersionStatus::Approved => "approved",
            VersionStatus::Deployed => "deployed",
            VersionStatus::Superseded => "superseded",
        }
    }

    /// `deployed` and `superseded` accept no further review
    pub fn is_terminal(&self) -> bool {
        matches!(self, VersionStatus::Deployed | VersionStatus::Superseded)
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LicenseDocument {
    /// Parse a document from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Pretty JSON with 2-space indentation, the format written to disk
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The version whose number equals `current_version`
    pub fn current(&self) -> Option<&Version> {
        self.version(self.current_version)
    }

    pub fn version(&self, number: u32) -> Option<&Version> {
        self.versions.iter().find(|v| v.version_number == number)
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut Version> {
        let number = self.current_version;
        self.versions
            .iter_mut()
            .find(|v| v.version_number == number)
    }

    /// Versions currently in `deployed` status
    pub fn deployed_versions(&self) -> impl Iterator<Item = &Version> {
        self.versions
            .iter()
            .filter(|v| v.status == VersionStatus::Deployed)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_735_689_600 + secs, 0).unwrap()
    }

    pub fn draft_document() -> LicenseDocument {
        LicenseDocument {
            license_id: "LIC-2025-042".into(),
            name: "Sensor Firmware License".into(),
            current_version: 1,
            status: VersionStatus::Draft,
            created_at: at(0),
            last_modified: at(0),
            parties: Parties {
                licensor: "0x1111111111111111111111111111111111111111".into(),
                licensee: "0x2222222222222222222222222222222222222222".into(),
                territory: "EU".into(),
            },
            versions: vec![Version {
                version_number: 1,
                status: VersionStatus::Draft,
                created_at: at(0),
                created_by: "creator".into(),
                comment: "Initial license configuration: Sensor Firmware License".into(),
                data: VersionData {
                    duration: "2Y 0M 0D".into(),
                    ips: "Firmware patent EP123".into(),
                    rules: vec![],
                },
                feedback: None,
                last_modified: None,
            }],
        }
    }
}
