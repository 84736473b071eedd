//! Lifecycle — status transitions of a versioned license document
//!
//! ```text
//! draft ──propose──▶ proposed ──approve──▶ approved ──deploy──▶ deployed ──▶ superseded
//!   ▲                   │                                          (on next deploy)
//!   │            request_revision
//!   │                   ▼
//!   └──────edit─── needs_revision (new version, carries feedback)
//! ```
//!
//! # Guarantees
//!
//! - Every transition is a pure function: `&LicenseDocument` in, new document out
//! - A rejected transition returns `Error::InvalidTransition` and no document
//! - Past versions keep their data; only their status may move to `superseded`

use chrono::{DateTime, Utc};

use crate::{verifier, Error, Feedback, LicenseDocument, Result, Version, VersionData, VersionStatus};

/// Send the current draft for review
pub fn propose(doc: &LicenseDocument, at: DateTime<Utc>) -> Result<LicenseDocument> {
    let from = require(doc, "propose", |s| s == VersionStatus::Draft)?;

    let mut next = doc.clone();
    let current = current_version_mut(&mut next)?;
    current.status = VersionStatus::Proposed;
    current.last_modified = Some(at);
    next.status = VersionStatus::Proposed;
    next.last_modified = at;

    log_transition(&next, from);
    Ok(next)
}

/// Append a `needs_revision` version carrying the reviewer's feedback
pub fn request_revision(
    doc: &LicenseDocument,
    reviewer: &str,
    comment: &str,
    at: DateTime<Utc>,
) -> Result<LicenseDocument> {
    let from = require(doc, "request revision on", |s| {
        !matches!(
            s,
            VersionStatus::Approved | VersionStatus::Deployed | VersionStatus::Superseded
        )
    })?;

    let data = current_data(doc)?;
    let mut next = doc.clone();
    append_version(
        &mut next,
        Version {
            version_number: 0,
            status: VersionStatus::NeedsRevision,
            created_at: at,
            created_by: reviewer.to_string(),
            comment: format!("Revision requested: {}", comment),
            data,
            feedback: Some(Feedback {
                from: reviewer.to_string(),
                date: at,
                message: comment.to_string(),
            }),
            last_modified: None,
        },
    );

    log_transition(&next, from);
    Ok(next)
}

pub fn approve(doc: &LicenseDocument, at: DateTime<Utc>) -> Result<LicenseDocument> {
    let from = require(doc, "approve", |s| s == VersionStatus::Proposed)?;

    let mut next = doc.clone();
    set_current_status(&mut next, VersionStatus::Approved, at)?;

    log_transition(&next, from);
    Ok(next)
}

/// Deploy the approved current version; any previously deployed version
/// becomes `superseded`
pub fn deploy(doc: &LicenseDocument, at: DateTime<Utc>) -> Result<LicenseDocument> {
    let from = require(doc, "deploy", |s| s == VersionStatus::Approved)?;

    let mut next = doc.clone();
    let current = next.current_version;
    for version in next.versions.iter_mut() {
        if version.version_number != current && version.status == VersionStatus::Deployed {
            tracing::debug!(
                license_id = %doc.license_id,
                version = version.version_number,
                "superseding deployed version"
            );
            version.status = VersionStatus::Superseded;
        }
    }
    set_current_status(&mut next, VersionStatus::Deployed, at)?;

    log_transition(&next, from);
    Ok(next)
}

/// Append a new draft version with edited terms
pub fn edit(
    doc: &LicenseDocument,
    data: VersionData,
    comment: &str,
    author: &str,
    at: DateTime<Utc>,
) -> Result<LicenseDocument> {
    // Any status may be edited; the edit itself is a fresh draft.
    let from = current_status(doc)?;

    let mut next = doc.clone();
    append_version(
        &mut next,
        Version {
            version_number: 0,
            status: VersionStatus::Draft,
            created_at: at,
            created_by: author.to_string(),
            comment: comment.to_string(),
            data,
            feedback: None,
            last_modified: None,
        },
    );

    log_transition(&next, from);
    Ok(next)
}

// ── JSON wrappers ─────────────────────────────────────────

/// Parse, verify, propose, and re-serialize
pub fn propose_json(text: &str) -> Result<String> {
    transition_json(text, |doc| propose(doc, Utc::now()))
}

pub fn request_revision_json(text: &str, reviewer: &str, comment: &str) -> Result<String> {
    transition_json(text, |doc| request_revision(doc, reviewer, comment, Utc::now()))
}

pub fn approve_json(text: &str) -> Result<String> {
    transition_json(text, |doc| approve(doc, Utc::now()))
}

pub fn deploy_json(text: &str) -> Result<String> {
    transition_json(text, |doc| deploy(doc, Utc::now()))
}

fn transition_json(
    text: &str,
    step: impl FnOnce(&LicenseDocument) -> Result<LicenseDocument>,
) -> Result<String> {
    let doc = LicenseDocument::from_json(text)?;
    verifier::ensure_valid(&doc)?;
    step(&doc)?.to_json_pretty()
}

// ── Helpers ───────────────────────────────────────────────

fn current_status(doc: &LicenseDocument) -> Result<VersionStatus> {
    doc.current().map(|v| v.status).ok_or_else(|| {
        Error::DocumentError(format!(
            "current version {} not found in '{}'",
            doc.current_version, doc.license_id
        ))
    })
}

fn require(
    doc: &LicenseDocument,
    action: &'static str,
    allowed: impl Fn(VersionStatus) -> bool,
) -> Result<VersionStatus> {
    let from = current_status(doc)?;
    if allowed(from) {
        Ok(from)
    } else {
        Err(Error::InvalidTransition { action, from })
    }
}

fn current_data(doc: &LicenseDocument) -> Result<VersionData> {
    doc.current()
        .map(|v| v.data.clone())
        .ok_or_else(|| Error::DocumentError("current version missing".into()))
}

fn current_version_mut(doc: &mut LicenseDocument) -> Result<&mut Version> {
    doc.current_mut()
        .ok_or_else(|| Error::DocumentError("current version missing".into()))
}

fn set_current_status(
    doc: &mut LicenseDocument,
    status: VersionStatus,
    at: DateTime<Utc>,
) -> Result<()> {
    current_version_mut(doc)?.status = status;
    doc.status = status;
    doc.last_modified = at;
    Ok(())
}

/// Number the version after the highest existing one and make it current
fn append_version(doc: &mut LicenseDocument, mut version: Version) {
    let number = doc
        .versions
        .iter()
        .map(|v| v.version_number)
        .max()
        .unwrap_or(0)
        + 1;
    version.version_number = number;
    doc.status = version.status;
    doc.last_modified = version.created_at;
    doc.current_version = number;
    doc.versions.push(version);
}

fn log_transition(doc: &LicenseDocument, from: VersionStatus) {
    tracing::debug!(
        license_id = %doc.license_id,
        version = doc.current_version,
        from = %from,
        to = %doc.status,
        "license transition"
    );
}
