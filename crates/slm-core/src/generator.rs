//! License JSON generator — builds a versioned document from wizard input
//!
//! Two creation modes feed the same document shape:
//!
//! - **manual**: form fields are copied verbatim into the new version
//! - **ai**: free text becomes the IP description and a single placeholder
//!   royalty rule is synthesized (no language processing takes place)
//!
//! With a prior document the result is an edit: a new draft version is
//! appended through [`lifecycle::edit`] and the license id is preserved.

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::lifecycle;
use crate::rules::{EvaluationInterval, RateKind, RoyaltyBase, RoyaltyRate, Rule};
use crate::{Error, LicenseDocument, Parties, Result, Version, VersionData, VersionStatus, ZERO_ADDRESS};

pub const DEFAULT_NAME: &str = "Smart License";
pub const DEFAULT_DURATION: &str = "1Y 0M 0D";
pub const DEFAULT_IPS: &str = "Intellectual property description";
pub const DEFAULT_TERRITORY: &str = "Worldwide";
pub const DEFAULT_AUTHOR: &str = "creator";

/// Minimum trimmed length of AI input text
pub const MIN_AI_TEXT_CHARS: usize = 10;

const AI_COMMENT: &str = "AI-generated license based on provided text";
const AI_IPS_FALLBACK: &str = "AI generated intellectual property description";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreationMode {
    Manual,
    Ai,
}

impl std::str::FromStr for CreationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manual" => Ok(CreationMode::Manual),
            "ai" => Ok(CreationMode::Ai),
            other => Err(Error::ParseError(format!(
                "unknown creation mode '{}', expected 'manual' or 'ai'",
                other
            ))),
        }
    }
}

/// Manual configuration form
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManualData {
    pub name: String,
    pub licensor: String,
    pub licensee: String,
    pub territory: String,
    pub duration: String,
    pub ips: String,
    pub comment: String,
    pub rules: Vec<Rule>,
}

impl ManualData {
    /// Load a saved form. `name`, `licensor` and `licensee` are required;
    /// missing rule, base and step ids are derived from `id_seed`.
    pub fn from_form_json(text: &str, id_seed: u64) -> Result<Self> {
        let mut form: ManualData = serde_json::from_str(text)?;

        let missing: Vec<String> = [
            ("name", &form.name),
            ("licensor", &form.licensor),
            ("licensee", &form.licensee),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| format!("Missing required field: {}", field))
        .collect();
        if !missing.is_empty() {
            return Err(Error::ValidationError(missing));
        }

        for (i, rule) in form.rules.iter_mut().enumerate() {
            let i = i as u64;
            if rule.id == 0 {
                rule.id = id_seed + i;
            }
            for (j, rb) in rule.royalty_base.iter_mut().enumerate() {
                if rb.id == 0 {
                    rb.id = id_seed + i * 100 + j as u64;
                }
            }
            for (k, step) in rule.royalty_rate.step_structure.steps.iter_mut().enumerate() {
                if step.id == 0 {
                    step.id = id_seed + i * 1000 + k as u64;
                }
            }
        }
        Ok(form)
    }

    /// Every required field that is still empty, in form order
    pub fn validate(&self) -> ValidationReport {
        let checks = [
            (&self.name, "License name is required"),
            (&self.licensor, "Licensor is required"),
            (&self.licensee, "Licensee is required"),
            (&self.duration, "Duration is required"),
            (&self.territory, "Territory is required"),
            (&self.ips, "Intellectual properties description is required"),
        ];
        ValidationReport {
            errors: checks
                .into_iter()
                .filter(|(value, _)| value.trim().is_empty())
                .map(|(_, message)| message.to_string())
                .collect(),
        }
    }
}

/// Validation messages collected for one wizard step
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationError(self.errors))
        }
    }
}

/// Minimal check before JSON generation: a name and a licensor
pub fn validate_manual_data(data: &ManualData) -> bool {
    !data.name.trim().is_empty() && !data.licensor.trim().is_empty()
}

pub fn validate_ai_text(text: &str) -> bool {
    text.trim().chars().count() >= MIN_AI_TEXT_CHARS
}

pub fn validate_ai_input(text: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    if !validate_ai_text(text) {
        report
            .errors
            .push(format!("Please provide at least {} characters of text", MIN_AI_TEXT_CHARS));
    }
    report
}

// ── Generation ─────────────────────────────────────────────

/// Generate the document JSON (2-space pretty print) at the current time
pub fn generate_smart_license_json(
    mode: CreationMode,
    manual: &ManualData,
    ai_text: &str,
    prior: Option<&LicenseDocument>,
) -> Result<String> {
    generate_document(mode, manual, ai_text, prior, Utc::now())?.to_json_pretty()
}

/// Build the document for `mode`, as a new license or as an edit of `prior`
pub fn generate_document(
    mode: CreationMode,
    manual: &ManualData,
    ai_text: &str,
    prior: Option<&LicenseDocument>,
    now: DateTime<Utc>,
) -> Result<LicenseDocument> {
    let data = match mode {
        CreationMode::Manual => VersionData {
            duration: or_default(&manual.duration, DEFAULT_DURATION),
            ips: or_default(&manual.ips, DEFAULT_IPS),
            rules: manual.rules.clone(),
        },
        CreationMode::Ai => VersionData {
            duration: DEFAULT_DURATION.to_string(),
            ips: or_default(ai_text, AI_IPS_FALLBACK),
            rules: vec![placeholder_rule(now)],
        },
    };

    match prior.filter(|p| !p.license_id.is_empty()) {
        Some(prior) => edit_document(mode, manual, prior, data, now),
        None => Ok(new_document(mode, manual, data, now)),
    }
}

fn new_document(
    mode: CreationMode,
    manual: &ManualData,
    data: VersionData,
    now: DateTime<Utc>,
) -> LicenseDocument {
    let name = or_default(&manual.name, DEFAULT_NAME);
    let comment = match mode {
        CreationMode::Manual if !manual.comment.is_empty() => manual.comment.clone(),
        CreationMode::Manual => format!("Initial license configuration: {}", name),
        CreationMode::Ai => AI_COMMENT.to_string(),
    };

    let doc = LicenseDocument {
        license_id: license_id(now),
        name,
        current_version: 1,
        status: VersionStatus::Draft,
        created_at: now,
        last_modified: now,
        parties: Parties {
            licensor: or_default(&manual.licensor, ZERO_ADDRESS),
            licensee: or_default(&manual.licensee, ZERO_ADDRESS),
            territory: or_default(&manual.territory, DEFAULT_TERRITORY),
        },
        versions: vec![Version {
            version_number: 1,
            status: VersionStatus::Draft,
            created_at: now,
            created_by: DEFAULT_AUTHOR.to_string(),
            comment,
            data,
            feedback: None,
            last_modified: None,
        }],
    };
    tracing::debug!(license_id = %doc.license_id, ?mode, "license created");
    doc
}

fn edit_document(
    mode: CreationMode,
    manual: &ManualData,
    prior: &LicenseDocument,
    data: VersionData,
    now: DateTime<Utc>,
) -> Result<LicenseDocument> {
    let name = or_default(&manual.name, &prior.name);
    let comment = match mode {
        CreationMode::Manual if !manual.comment.is_empty() => manual.comment.clone(),
        CreationMode::Manual => format!("Editing license: {}", name),
        CreationMode::Ai => AI_COMMENT.to_string(),
    };

    let mut doc = lifecycle::edit(prior, data, &comment, DEFAULT_AUTHOR, now)?;
    doc.name = name;
    doc.parties = Parties {
        licensor: or_default(&manual.licensor, &prior.parties.licensor),
        licensee: or_default(&manual.licensee, &prior.parties.licensee),
        territory: or_default(&manual.territory, &prior.parties.territory),
    };
    Ok(doc)
}

/// `LIC-<year>-<last three digits of the epoch milliseconds>`
pub fn license_id(now: DateTime<Utc>) -> String {
    format!(
        "LIC-{}-{:03}",
        now.year(),
        now.timestamp_millis().rem_euclid(1000)
    )
}

/// Rule synthesized for AI mode: 10.0 lump sum within [0, 100], valid for a year
pub fn placeholder_rule(now: DateTime<Utc>) -> Rule {
    let id = now.timestamp_millis().max(0) as u64;
    Rule {
        id,
        name: "AI Generated Rule".into(),
        validity_start: now.format("%Y-%m-%d").to_string(),
        validity_end: (now + Duration::days(365)).format("%Y-%m-%d").to_string(),
        evaluation_interval: EvaluationInterval {
            duration: DEFAULT_DURATION.into(),
        },
        royalty_base: vec![RoyaltyBase {
            id: id + 1,
            oracle_address: ZERO_ADDRESS.into(),
            property_name: "getCount".into(),
            display_name: "RB01".into(),
            intellectual_property: String::new(),
        }],
        royalty_rate: RoyaltyRate {
            kind: RateKind::Lumpsum,
            lumpsum_value: "10.0".into(),
            min: "0".into(),
            max: "100".into(),
            ..RoyaltyRate::default()
        },
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
