//! Document verifier — checks a license document against its invariants
//!
//! Used before a pasted or uploaded document is accepted. The verifier
//! accumulates all diagnostics rather than stopping at the first one, so the
//! user sees every problem in a single pass.
//!
//! # Phases
//!
//! 1. **Versioning** — numbering starts at 1 with no gaps; `currentVersion` is the last
//! 2. **Status** — top-level status mirrors the current version; at most one deployed
//! 3. **Parties** — licensor/licensee look like addresses (warning only)
//! 4. **Terms** — durations parse, rate references name declared bases (warnings)

use std::collections::BTreeSet;

use crate::rules::{is_valid_address, LicenseDuration};
use crate::{Error, LicenseDocument, Result, VersionStatus};

// ── Verification Result Types ─────────────────────────────

/// Result of document verification — accumulates all diagnostics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct VerificationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl VerificationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no errors were found (warnings are OK)
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }

    fn add_error(&mut self, kind: DiagnosticKind, message: String, path: Option<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            kind,
            message,
            path,
        });
    }

    fn add_warning(&mut self, kind: DiagnosticKind, message: String, path: Option<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            kind,
            message,
            path,
        });
    }
}

/// A single verification diagnostic
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    /// JSON path of the offending value, e.g. `versions[1].status`
    pub path: Option<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if let Some(ref path) = self.path {
            write!(f, "{} [{}] at {}: {}", prefix, self.kind, path, self.message)
        } else {
            write!(f, "{} [{}]: {}", prefix, self.kind, self.message)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Versioning,
    Status,
    Parties,
    Terms,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DiagnosticKind::Versioning => write!(f, "versioning"),
            DiagnosticKind::Status => write!(f, "status"),
            DiagnosticKind::Parties => write!(f, "parties"),
            DiagnosticKind::Terms => write!(f, "terms"),
        }
    }
}

// ── Public API ────────────────────────────────────────────

/// Verify a license document.
///
/// Runs all phases and returns accumulated diagnostics.
pub fn verify(doc: &LicenseDocument) -> VerificationResult {
    let mut result = VerificationResult::new();

    verify_versioning(doc, &mut result);
    verify_status(doc, &mut result);
    verify_parties(doc, &mut result);
    verify_terms(doc, &mut result);

    result
}

/// Accept a parsed document only if it has no error diagnostics.
///
/// Warnings pass; errors are joined into a single `Error::DocumentError`.
pub fn ensure_valid(doc: &LicenseDocument) -> Result<()> {
    let result = verify(doc);
    if result.is_valid() {
        return Ok(());
    }
    let errors: Vec<String> = result.errors().iter().map(|d| d.to_string()).collect();
    tracing::warn!(
        license_id = %doc.license_id,
        errors = errors.len(),
        "rejecting invalid license document"
    );
    Err(Error::DocumentError(format!(
        "license '{}' is not valid: {}",
        doc.license_id,
        errors.join("; ")
    )))
}

// ── Phase 1: Versioning ───────────────────────────────────

fn verify_versioning(doc: &LicenseDocument, result: &mut VerificationResult) {
    if doc.license_id.trim().is_empty() {
        result.add_error(
            DiagnosticKind::Versioning,
            "licenseId is empty".into(),
            Some("licenseId".into()),
        );
    }

    if doc.versions.is_empty() {
        result.add_error(
            DiagnosticKind::Versioning,
            "document has no versions".into(),
            Some("versions".into()),
        );
        return;
    }

    for (i, version) in doc.versions.iter().enumerate() {
        let expected = i as u32 + 1;
        if version.version_number != expected {
            result.add_error(
                DiagnosticKind::Versioning,
                format!(
                    "version number {} found where {} was expected",
                    version.version_number, expected
                ),
                Some(format!("versions[{}].versionNumber", i)),
            );
        }
        if version.data.duration.is_empty() && version.data.ips.is_empty() && i == 0 {
            result.add_warning(
                DiagnosticKind::Terms,
                "first version carries no terms".into(),
                Some("versions[0].data".into()),
            );
        }
    }

    let last = doc.versions.len() as u32;
    if doc.current_version != last {
        result.add_error(
            DiagnosticKind::Versioning,
            format!(
                "currentVersion is {} but the last version is {}",
                doc.current_version, last
            ),
            Some("currentVersion".into()),
        );
    }

    if doc.created_at > doc.last_modified {
        result.add_warning(
            DiagnosticKind::Versioning,
            "createdAt is later than lastModified".into(),
            Some("createdAt".into()),
        );
    }
}

// ── Phase 2: Status ───────────────────────────────────────

fn verify_status(doc: &LicenseDocument, result: &mut VerificationResult) {
    if let Some(current) = doc.current() {
        if current.status != doc.status {
            result.add_error(
                DiagnosticKind::Status,
                format!(
                    "document status '{}' does not match current version status '{}'",
                    doc.status, current.status
                ),
                Some("status".into()),
            );
        }
        if current.status == VersionStatus::Superseded {
            let index = doc
                .versions
                .iter()
                .position(|v| v.version_number == doc.current_version)
                .unwrap_or_default();
            result.add_error(
                DiagnosticKind::Status,
                "current version is superseded".into(),
                Some(format!("versions[{}].status", index)),
            );
        }
    }

    let deployed: Vec<u32> = doc.deployed_versions().map(|v| v.version_number).collect();
    if deployed.len() > 1 {
        result.add_error(
            DiagnosticKind::Status,
            format!("more than one deployed version: {:?}", deployed),
            Some("versions".into()),
        );
    }

    // A superseded version must have been replaced by a later deployment
    for (i, version) in doc.versions.iter().enumerate() {
        match version.status {
            VersionStatus::Superseded => {
                let replaced = doc.versions[i + 1..].iter().any(|later| {
                    matches!(
                        later.status,
                        VersionStatus::Deployed | VersionStatus::Superseded
                    )
                });
                if !replaced {
                    result.add_error(
                        DiagnosticKind::Status,
                        format!(
                            "version {} is superseded but no later version was deployed",
                            version.version_number
                        ),
                        Some(format!("versions[{}].status", i)),
                    );
                }
            }
            VersionStatus::NeedsRevision if version.feedback.is_none() => {
                result.add_warning(
                    DiagnosticKind::Status,
                    format!(
                        "version {} needs revision but carries no feedback",
                        version.version_number
                    ),
                    Some(format!("versions[{}].feedback", i)),
                );
            }
            _ => {}
        }
    }
}

// ── Phase 3: Parties ──────────────────────────────────────

fn verify_parties(doc: &LicenseDocument, result: &mut VerificationResult) {
    for (role, address) in [
        ("licensor", &doc.parties.licensor),
        ("licensee", &doc.parties.licensee),
    ] {
        if address.is_empty() {
            result.add_warning(
                DiagnosticKind::Parties,
                format!("{} is empty", role),
                Some(format!("parties.{}", role)),
            );
        } else if !is_valid_address(address) {
            result.add_warning(
                DiagnosticKind::Parties,
                format!("{} '{}' is not a 0x-prefixed 40-hex-digit address", role, address),
                Some(format!("parties.{}", role)),
            );
        }
    }

    if !doc.parties.licensor.is_empty()
        && doc.parties.licensor.eq_ignore_ascii_case(&doc.parties.licensee)
        && doc.parties.licensor != crate::ZERO_ADDRESS
    {
        result.add_warning(
            DiagnosticKind::Parties,
            "licensor and licensee are the same address".into(),
            Some("parties".into()),
        );
    }
}

// ── Phase 4: Terms ────────────────────────────────────────

fn verify_terms(doc: &LicenseDocument, result: &mut VerificationResult) {
    let Some(current) = doc.current() else {
        return;
    };
    let index = doc
        .versions
        .iter()
        .position(|v| v.version_number == current.version_number)
        .unwrap_or(0);
    let base = format!("versions[{}].data", index);

    if !current.data.duration.is_empty() && LicenseDuration::parse(&current.data.duration).is_err() {
        result.add_warning(
            DiagnosticKind::Terms,
            format!("duration '{}' is not in '<n>Y <n>M <n>D' form", current.data.duration),
            Some(format!("{}.duration", base)),
        );
    }

    let mut rule_ids = BTreeSet::new();
    for (r, rule) in current.data.rules.iter().enumerate() {
        let path = format!("{}.rules[{}]", base, r);
        if !rule_ids.insert(rule.id) {
            result.add_warning(
                DiagnosticKind::Terms,
                format!("duplicate rule id {}", rule.id),
                Some(format!("{}.id", path)),
            );
        }
        for name in rule.dangling_references() {
            result.add_warning(
                DiagnosticKind::Terms,
                format!("royalty rate references undeclared base '{}'", name),
                Some(format!("{}.royaltyRate", path)),
            );
        }
        let interval = &rule.evaluation_interval.duration;
        if !interval.is_empty() && LicenseDuration::parse(interval).is_err() {
            result.add_warning(
                DiagnosticKind::Terms,
                format!("evaluation interval '{}' is not a duration", interval),
                Some(format!("{}.evaluationInterval.duration", path)),
            );
        }
    }
}
