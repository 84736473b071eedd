//! Export — timestamped license JSON and Solidity files

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{solidity, LicenseDocument, Result};

pub fn json_file_name(at: DateTime<Utc>) -> String {
    format!("smart-license-{}.json", at.timestamp_millis())
}

pub fn contract_file_name(at: DateTime<Utc>) -> String {
    format!("smart-license-contract-{}.sol", at.timestamp_millis())
}

/// Paths written by [`write_bundle`]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ExportedBundle {
    pub json: PathBuf,
    pub contract: PathBuf,
}

/// Write the document JSON and its generated contract into `dir`
pub fn write_bundle(doc: &LicenseDocument, dir: &Path, at: DateTime<Utc>) -> Result<ExportedBundle> {
    std::fs::create_dir_all(dir)?;

    let json = dir.join(json_file_name(at));
    std::fs::write(&json, doc.to_json_pretty()?)?;

    let contract = dir.join(contract_file_name(at));
    std::fs::write(&contract, solidity::generate_contract(doc)?)?;

    tracing::info!(
        license_id = %doc.license_id,
        json = %json.display(),
        contract = %contract.display(),
        "license exported"
    );
    Ok(ExportedBundle { json, contract })
}
