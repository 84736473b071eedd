//! Wizard controller — the four-step build/verify flow as a reducer
//!
//! ```text
//! creation:      Mode Selection → Configuration → Review & Generate → Deploy
//! verification:  Mode Selection → File Upload   → Review & Verify   → Deploy
//! ```
//!
//! All state lives in [`Wizard`] and changes only through [`Wizard::dispatch`].
//! An action that fails (validation, parse error, rejected transition) leaves
//! the wizard exactly as it was.

use chrono::{DateTime, Utc};

use crate::comparator::{Comparator, ComparatorConfig, Comparison, PatternExtractor};
use crate::generator::{self, CreationMode, ManualData, ValidationReport};
use crate::{lifecycle, solidity, verifier, Error, LicenseDocument, Result};

pub const STEP_COUNT: usize = 4;

const CREATION_STEPS: [&str; STEP_COUNT] =
    ["Mode Selection", "Configuration", "Review & Generate", "Deploy"];
const VERIFICATION_STEPS: [&str; STEP_COUNT] =
    ["Mode Selection", "File Upload", "Review & Verify", "Deploy"];

const DEPLOY_STEP: usize = STEP_COUNT - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardMode {
    Manual,
    Ai,
    /// Verify an uploaded JSON + Solidity pair
    Upload,
}

impl WizardMode {
    pub fn is_verification(&self) -> bool {
        matches!(self, WizardMode::Upload)
    }
}

/// Progress of the deploy step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    #[default]
    Pending,
    Sent,
    Approved,
    Deployed,
}

/// Wizard input; JSON form is `{"type": "goTo", "payload": 2}`
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum WizardAction {
    SelectMode(WizardMode),
    UpdateForm(ManualData),
    SetAiText(String),
    UploadJson(String),
    UploadSolidity(String),
    Next,
    Back,
    GoTo(usize),
    SendForApproval,
    RequestRevision { reviewer: String, comment: String },
    Approve,
    Deploy,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Wizard {
    step: usize,
    mode: Option<WizardMode>,
    manual: ManualData,
    ai_text: String,
    uploaded_json: Option<String>,
    uploaded_solidity: Option<String>,
    /// Document being edited, if the wizard was opened on one
    prior: Option<LicenseDocument>,
    document: Option<LicenseDocument>,
    generated_json: Option<String>,
    generated_contract: Option<String>,
    comparison: Option<Comparison>,
    deployment_status: DeploymentStatus,
    comparator: ComparatorConfig,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comparator(config: ComparatorConfig) -> Self {
        Wizard {
            comparator: config,
            ..Self::default()
        }
    }

    /// Open the wizard on an existing document; generation appends a version
    pub fn editing(doc: LicenseDocument) -> Self {
        let manual = ManualData {
            name: doc.name.clone(),
            licensor: doc.parties.licensor.clone(),
            licensee: doc.parties.licensee.clone(),
            territory: doc.parties.territory.clone(),
            duration: doc.current().map(|v| v.data.duration.clone()).unwrap_or_default(),
            ips: doc.current().map(|v| v.data.ips.clone()).unwrap_or_default(),
            comment: String::new(),
            rules: doc.current().map(|v| v.data.rules.clone()).unwrap_or_default(),
        };
        Wizard {
            manual,
            prior: Some(doc),
            ..Self::default()
        }
    }

    // ── Accessors ─────────────────────────────────────────

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn mode(&self) -> Option<WizardMode> {
        self.mode
    }

    pub fn step_names(&self) -> &'static [&'static str; STEP_COUNT] {
        match self.mode {
            Some(WizardMode::Upload) => &VERIFICATION_STEPS,
            _ => &CREATION_STEPS,
        }
    }

    pub fn manual(&self) -> &ManualData {
        &self.manual
    }

    pub fn document(&self) -> Option<&LicenseDocument> {
        self.document.as_ref()
    }

    pub fn generated_json(&self) -> Option<&str> {
        self.generated_json.as_deref()
    }

    pub fn generated_contract(&self) -> Option<&str> {
        self.generated_contract.as_deref()
    }

    pub fn comparison(&self) -> Option<&Comparison> {
        self.comparison.as_ref()
    }

    pub fn deployment_status(&self) -> DeploymentStatus {
        self.deployment_status
    }

    fn is_verification(&self) -> bool {
        self.mode.map_or(false, |m| m.is_verification())
    }

    // ── Gating ────────────────────────────────────────────

    /// Validation messages blocking the configuration/upload step
    pub fn input_validation(&self) -> ValidationReport {
        match self.mode {
            None => ValidationReport {
                errors: vec!["Select a creation mode".into()],
            },
            Some(WizardMode::Manual) => self.manual.validate(),
            Some(WizardMode::Ai) => generator::validate_ai_input(&self.ai_text),
            Some(WizardMode::Upload) => {
                let mut errors = Vec::new();
                if self.uploaded_json.is_none() {
                    errors.push("License JSON file is required".into());
                }
                if self.uploaded_solidity.is_none() {
                    errors.push("Solidity contract file is required".into());
                }
                ValidationReport { errors }
            }
        }
    }

    pub fn is_step_completed(&self, step: usize) -> bool {
        match step {
            0 => self.mode.is_some(),
            1 => self.mode.is_some() && self.input_validation().is_valid(),
            2 if self.is_verification() => self.comparison.as_ref().map_or(false, |c| c.is_valid),
            2 => self.document.is_some(),
            3 => self.deployment_status == DeploymentStatus::Deployed,
            _ => false,
        }
    }

    /// Backward always; forward only to the next step once this one is complete
    pub fn can_navigate_to(&self, step: usize) -> bool {
        step < STEP_COUNT
            && (step <= self.step || (step == self.step + 1 && self.is_step_completed(self.step)))
    }

    // ── Reducer ───────────────────────────────────────────

    pub fn dispatch(&mut self, action: WizardAction) -> Result<()> {
        self.dispatch_at(action, Utc::now())
    }

    /// Apply `action` as of `now`; on error the wizard is unchanged
    pub fn dispatch_at(&mut self, action: WizardAction, now: DateTime<Utc>) -> Result<()> {
        let mut next = self.clone();
        next.apply(action, now)?;
        *self = next;
        Ok(())
    }

    fn apply(&mut self, action: WizardAction, now: DateTime<Utc>) -> Result<()> {
        match action {
            WizardAction::SelectMode(mode) => {
                if self.mode != Some(mode) {
                    self.mode = Some(mode);
                    self.invalidate();
                }
            }
            WizardAction::UpdateForm(form) => {
                self.manual = form;
                self.invalidate();
            }
            WizardAction::SetAiText(text) => {
                self.ai_text = text;
                self.invalidate();
            }
            WizardAction::UploadJson(text) => {
                // Reject malformed or inconsistent uploads immediately
                verifier::ensure_valid(&LicenseDocument::from_json(&text)?)?;
                self.uploaded_json = Some(text);
                self.invalidate();
            }
            WizardAction::UploadSolidity(text) => {
                self.uploaded_solidity = Some(text);
                self.invalidate();
            }
            WizardAction::Next => {
                if self.step < DEPLOY_STEP {
                    self.advance(now)?;
                }
            }
            WizardAction::Back => self.step = self.step.saturating_sub(1),
            WizardAction::GoTo(step) if step <= self.step => self.step = step,
            WizardAction::GoTo(step) if step == self.step + 1 && step < STEP_COUNT => {
                self.advance(now)?
            }
            WizardAction::GoTo(step) => {
                return Err(Error::ValidationError(vec![format!(
                    "Cannot jump from step {} to step {}",
                    self.step + 1,
                    step + 1
                )]))
            }
            WizardAction::SendForApproval => {
                self.transition(DeploymentStatus::Sent, |doc| lifecycle::propose(doc, now))?
            }
            WizardAction::RequestRevision { reviewer, comment } => self
                .transition(DeploymentStatus::Pending, |doc| {
                    lifecycle::request_revision(doc, &reviewer, &comment, now)
                })?,
            WizardAction::Approve => {
                self.transition(DeploymentStatus::Approved, |doc| lifecycle::approve(doc, now))?
            }
            WizardAction::Deploy => {
                self.transition(DeploymentStatus::Deployed, |doc| lifecycle::deploy(doc, now))?
            }
            WizardAction::Reset => {
                *self = Wizard::with_comparator(self.comparator);
            }
        }
        Ok(())
    }

    fn advance(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.step {
            0 if self.mode.is_none() => {
                return Err(Error::ValidationError(vec!["Select a creation mode".into()]))
            }
            1 => {
                self.input_validation().into_result()?;
                self.enter_review(now)?;
            }
            2 if !self.is_step_completed(2) => {
                let message = match &self.comparison {
                    Some(c) => format!(
                        "Contract similarity {:.1}% is below the {:.0}% threshold",
                        c.similarity, c.threshold
                    ),
                    None => "Generate the license before deploying".into(),
                };
                return Err(Error::ValidationError(vec![message]));
            }
            _ => {}
        }
        self.step += 1;
        tracing::debug!(step = self.step, "wizard advanced");
        Ok(())
    }

    /// Generate (creation) or parse and compare (verification)
    fn enter_review(&mut self, now: DateTime<Utc>) -> Result<()> {
        let doc = match self.mode {
            Some(WizardMode::Upload) => {
                let text = self.uploaded_json.as_deref().unwrap_or_default();
                let doc = LicenseDocument::from_json(text)?;
                verifier::ensure_valid(&doc)?;
                doc
            }
            Some(WizardMode::Manual) => generator::generate_document(
                CreationMode::Manual,
                &self.manual,
                "",
                self.prior.as_ref(),
                now,
            )?,
            Some(WizardMode::Ai) => generator::generate_document(
                CreationMode::Ai,
                &self.manual,
                &self.ai_text,
                self.prior.as_ref(),
                now,
            )?,
            None => return Err(Error::ValidationError(vec!["Select a creation mode".into()])),
        };

        let contract = solidity::generate_contract(&doc)?;
        if let Some(uploaded) = &self.uploaded_solidity {
            if self.is_verification() {
                let comparator = Comparator::new(PatternExtractor, self.comparator);
                self.comparison = Some(comparator.compare(&contract, uploaded));
            }
        }
        self.set_document(doc)?;
        self.generated_contract = Some(contract);
        self.deployment_status = DeploymentStatus::Pending;
        Ok(())
    }

    fn transition(
        &mut self,
        status: DeploymentStatus,
        step: impl FnOnce(&LicenseDocument) -> Result<LicenseDocument>,
    ) -> Result<()> {
        if self.step != DEPLOY_STEP {
            return Err(Error::ValidationError(vec![
                "License actions are only available on the Deploy step".into(),
            ]));
        }
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| Error::ValidationError(vec!["No license document generated".into()]))?;
        let next = step(doc)?;
        self.set_document(next)?;
        self.deployment_status = status;
        Ok(())
    }

    fn set_document(&mut self, doc: LicenseDocument) -> Result<()> {
        self.generated_json = Some(doc.to_json_pretty()?);
        self.document = Some(doc);
        Ok(())
    }

    /// Input changed: generated artifacts are stale
    fn invalidate(&mut self) {
        self.document = None;
        self.generated_json = None;
        self.generated_contract = None;
        self.comparison = None;
        self.deployment_status = DeploymentStatus::Pending;
        if self.step > 1 {
            self.step = 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, draft_document};
    use crate::VersionStatus;

    fn valid_form() -> ManualData {
        ManualData {
            name: "Audio Codec License".into(),
            licensor: "0x1111111111111111111111111111111111111111".into(),
            licensee: "0x2222222222222222222222222222222222222222".into(),
            territory: "EU".into(),
            duration: "1Y 0M 0D".into(),
            ips: "Codec patent".into(),
            ..ManualData::default()
        }
    }

    fn run(w: &mut Wizard, actions: Vec<WizardAction>) {
        for action in actions {
            w.dispatch_at(action, at(1)).unwrap();
        }
    }

    fn manual_at_deploy() -> Wizard {
        let mut w = Wizard::new();
        run(
            &mut w,
            vec![
                WizardAction::SelectMode(WizardMode::Manual),
                WizardAction::Next,
                WizardAction::UpdateForm(valid_form()),
                WizardAction::Next,
                WizardAction::Next,
            ],
        );
        w
    }

    #[test]
    fn test_step_zero_requires_mode() {
        let mut w = Wizard::new();
        assert!(!w.can_navigate_to(1));
        assert!(w.dispatch_at(WizardAction::Next, at(0)).is_err());
        assert_eq!(w.step(), 0);
    }

    #[test]
    fn test_configuration_blocks_with_messages() {
        let mut w = Wizard::new();
        run(&mut w, vec![WizardAction::SelectMode(WizardMode::Manual), WizardAction::Next]);
        let err = w.dispatch_at(WizardAction::Next, at(0)).unwrap_err();
        match err {
            Error::ValidationError(messages) => assert_eq!(messages.len(), 6),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(w.step(), 1);
    }

    #[test]
    fn test_manual_flow_generates_document() {
        let w = manual_at_deploy();
        assert_eq!(w.step(), 3);
        assert!(w.generated_json().unwrap().contains("Audio Codec License"));
        assert!(w.generated_contract().unwrap().contains("contract SmartLicense"));
        assert_eq!(w.step_names()[2], "Review & Generate");
    }

    #[test]
    fn test_deploy_actions_follow_lifecycle() {
        let mut w = manual_at_deploy();
        run(&mut w, vec![WizardAction::SendForApproval]);
        assert_eq!(w.deployment_status(), DeploymentStatus::Sent);
        assert!(w.generated_json().unwrap().contains("\"proposed\""));

        // Deploying before approval is rejected and changes nothing
        let before = w.clone();
        assert!(w.dispatch_at(WizardAction::Deploy, at(2)).is_err());
        assert_eq!(w, before);

        run(&mut w, vec![WizardAction::Approve, WizardAction::Deploy]);
        assert_eq!(w.deployment_status(), DeploymentStatus::Deployed);
        assert_eq!(w.document().unwrap().status, VersionStatus::Deployed);
        assert!(w.is_step_completed(3));
    }

    #[test]
    fn test_request_revision_from_deploy_step() {
        let mut w = manual_at_deploy();
        run(
            &mut w,
            vec![
                WizardAction::SendForApproval,
                WizardAction::RequestRevision {
                    reviewer: "0xReviewer".into(),
                    comment: "Lower the rate".into(),
                },
            ],
        );
        assert_eq!(w.deployment_status(), DeploymentStatus::Pending);
        assert_eq!(w.document().unwrap().current_version, 2);
    }

    #[test]
    fn test_actions_outside_deploy_step_rejected() {
        let mut w = Wizard::new();
        assert!(w.dispatch_at(WizardAction::Approve, at(0)).is_err());
    }

    #[test]
    fn test_ai_mode_needs_ten_chars() {
        let mut w = Wizard::new();
        run(
            &mut w,
            vec![
                WizardAction::SelectMode(WizardMode::Ai),
                WizardAction::Next,
                WizardAction::SetAiText("too short".into()),
            ],
        );
        assert!(!w.is_step_completed(1));
        run(
            &mut w,
            vec![
                WizardAction::SetAiText("License the codec to Acme for Europe".into()),
                WizardAction::Next,
            ],
        );
        assert_eq!(w.step(), 2);
        assert_eq!(w.document().unwrap().current().unwrap().data.rules.len(), 1);
    }

    #[test]
    fn test_navigation_rules() {
        let mut w = manual_at_deploy();
        assert!(w.can_navigate_to(0));
        run(&mut w, vec![WizardAction::GoTo(1)]);
        assert_eq!(w.step(), 1);
        assert!(w.dispatch_at(WizardAction::GoTo(3), at(0)).is_err());
        run(&mut w, vec![WizardAction::Back, WizardAction::Back]);
        assert_eq!(w.step(), 0);
    }

    #[test]
    fn test_verification_flow() {
        let doc = draft_document();
        let json = doc.to_json_pretty().unwrap();
        let contract = solidity::generate_contract(&doc).unwrap();

        let mut w = Wizard::new();
        run(
            &mut w,
            vec![
                WizardAction::SelectMode(WizardMode::Upload),
                WizardAction::Next,
                WizardAction::UploadJson(json),
                WizardAction::UploadSolidity(contract),
                WizardAction::Next,
            ],
        );
        assert_eq!(w.step_names()[1], "File Upload");
        assert_eq!(w.comparison().unwrap().similarity, 100.0);
        assert!(w.can_navigate_to(3));
        run(&mut w, vec![WizardAction::Next]);
        assert_eq!(w.step(), 3);
    }

    #[test]
    fn test_verification_blocks_below_threshold() {
        let doc = draft_document();
        let mut w = Wizard::new();
        run(
            &mut w,
            vec![
                WizardAction::SelectMode(WizardMode::Upload),
                WizardAction::Next,
                WizardAction::UploadJson(doc.to_json_pretty().unwrap()),
                WizardAction::UploadSolidity("contract Other {}".into()),
                WizardAction::Next,
            ],
        );
        let err = w.dispatch_at(WizardAction::Next, at(0)).unwrap_err();
        assert!(err.to_string().contains("below the 80% threshold"));
        assert_eq!(w.step(), 2);
    }

    #[test]
    fn test_malformed_upload_leaves_state() {
        let mut w = Wizard::new();
        run(&mut w, vec![WizardAction::SelectMode(WizardMode::Upload), WizardAction::Next]);
        let before = w.clone();
        let err = w.dispatch_at(WizardAction::UploadJson("{ nope".into()), at(0)).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
        assert_eq!(w, before);
        assert_eq!(
            w.input_validation().errors,
            vec!["License JSON file is required", "Solidity contract file is required"]
        );
    }

    #[test]
    fn test_inconsistent_upload_rejected() {
        let mut w = Wizard::new();
        run(&mut w, vec![WizardAction::SelectMode(WizardMode::Upload), WizardAction::Next]);
        let before = w.clone();
        let gap = include_str!("../../../tests/fixtures/licenses/version-gap.json");
        let err = w.dispatch_at(WizardAction::UploadJson(gap.into()), at(0)).unwrap_err();
        assert!(matches!(err, Error::DocumentError(_)));
        assert!(err.to_string().contains("found where 2 was expected"));
        assert_eq!(w, before);
    }

    #[test]
    fn test_editing_appends_version() {
        let mut w = Wizard::editing(draft_document());
        assert_eq!(w.manual().name, "Sensor Firmware License");
        run(
            &mut w,
            vec![
                WizardAction::SelectMode(WizardMode::Manual),
                WizardAction::Next,
                WizardAction::Next,
            ],
        );
        let doc = w.document().unwrap();
        assert_eq!(doc.license_id, "LIC-2025-042");
        assert_eq!(doc.current_version, 2);
    }

    #[test]
    fn test_reset_keeps_threshold() {
        let mut w = Wizard::with_comparator(ComparatorConfig { threshold: 50.0 });
        run(&mut w, vec![WizardAction::SelectMode(WizardMode::Ai), WizardAction::Reset]);
        assert_eq!(w, Wizard::with_comparator(ComparatorConfig { threshold: 50.0 }));
    }

    #[test]
    fn test_actions_from_json() {
        let parse = |text: &str| serde_json::from_str::<WizardAction>(text).unwrap();
        assert_eq!(parse(r#"{"type":"next"}"#), WizardAction::Next);
        assert_eq!(parse(r#"{"type":"goTo","payload":2}"#), WizardAction::GoTo(2));
        assert_eq!(
            parse(r#"{"type":"selectMode","payload":"upload"}"#),
            WizardAction::SelectMode(WizardMode::Upload)
        );
        assert_eq!(
            parse(r#"{"type":"requestRevision","payload":{"reviewer":"0xabc","comment":"fix"}}"#),
            WizardAction::RequestRevision {
                reviewer: "0xabc".into(),
                comment: "fix".into()
            }
        );
        assert!(serde_json::from_str::<WizardAction>(r#"{"type":"launch"}"#).is_err());
    }
}
