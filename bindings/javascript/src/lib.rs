//! JavaScript/TypeScript bindings for the Smart License Manager
//!
//! Thin wrapper around `slm-core` compiled to WebAssembly.
//! ZERO logic here — all behavior from the canonical Rust implementation.
//! Documents cross the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use slm_core::comparator::{Comparator, ComparatorConfig, PatternExtractor};
use slm_core::generator::{self, CreationMode, ManualData};
use slm_core::wizard::{Wizard, WizardAction, STEP_COUNT};
use slm_core::{canonical, lifecycle, royalty, solidity, verifier, LicenseDocument};

fn js_err(e: slm_core::Error) -> JsError {
    JsError::new(&e.to_string())
}

fn to_json<T: ?Sized + serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string_pretty(value).map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

fn parse_document(text: &str) -> Result<LicenseDocument, JsError> {
    LicenseDocument::from_json(text).map_err(js_err)
}

fn parse_manual(text: &str) -> Result<ManualData, JsError> {
    serde_json::from_str(text).map_err(|e| JsError::new(&format!("Parse error: {}", e)))
}

// ── Generator ─────────────────────────────────────────────

/// Generate a license document.
///
/// @param mode - "manual" or "ai"
/// @param manual - JSON of the manual form (ignored in ai mode)
/// @param aiText - free-text description (ignored in manual mode)
/// @param prior - JSON of the document being edited, or undefined
/// @returns pretty-printed license JSON
#[wasm_bindgen(js_name = "generateSmartLicenseJson")]
pub fn generate_smart_license_json(
    mode: &str,
    manual: &str,
    ai_text: &str,
    prior: Option<String>,
) -> Result<String, JsError> {
    let mode: CreationMode = mode.parse().map_err(js_err)?;
    let manual = if manual.trim().is_empty() {
        ManualData::default()
    } else {
        parse_manual(manual)?
    };
    let prior = prior.as_deref().map(parse_document).transpose()?;
    generator::generate_smart_license_json(mode, &manual, ai_text, prior.as_ref()).map_err(js_err)
}

/// @returns JSON: { errors: string[] }
#[wasm_bindgen(js_name = "validateManualData")]
pub fn validate_manual_data(manual: &str) -> Result<String, JsError> {
    to_json(&parse_manual(manual)?.validate())
}

/// @returns JSON: { errors: string[] }
#[wasm_bindgen(js_name = "validateAiInput")]
pub fn validate_ai_input(text: &str) -> Result<String, JsError> {
    to_json(&generator::validate_ai_input(text))
}

// ── Lifecycle ─────────────────────────────────────────────

#[wasm_bindgen(js_name = "proposeForReview")]
pub fn propose_for_review(license: &str) -> Result<String, JsError> {
    lifecycle::propose_json(license).map_err(js_err)
}

#[wasm_bindgen(js_name = "requestRevision")]
pub fn request_revision(license: &str, reviewer: &str, comment: &str) -> Result<String, JsError> {
    lifecycle::request_revision_json(license, reviewer, comment).map_err(js_err)
}

#[wasm_bindgen(js_name = "approveLicense")]
pub fn approve_license(license: &str) -> Result<String, JsError> {
    lifecycle::approve_json(license).map_err(js_err)
}

#[wasm_bindgen(js_name = "deployLicense")]
pub fn deploy_license(license: &str) -> Result<String, JsError> {
    lifecycle::deploy_json(license).map_err(js_err)
}

// ── Contracts ─────────────────────────────────────────────

/// Render the Solidity source for a license document
#[wasm_bindgen(js_name = "generateContract")]
pub fn generate_contract(license: &str) -> Result<String, JsError> {
    solidity::generate_contract(&parse_document(license)?).map_err(js_err)
}

/// Compare an uploaded contract with a generated one.
///
/// @param threshold - minimum similarity percentage; defaults to 80
/// @returns JSON: { similarity, isValid, threshold, matched, differences, missing, extra }
#[wasm_bindgen(js_name = "compareContracts")]
pub fn compare_contracts(generated: &str, uploaded: &str, threshold: Option<f64>) -> Result<String, JsError> {
    let config = threshold.map_or_else(ComparatorConfig::default, |threshold| ComparatorConfig { threshold });
    to_json(&Comparator::new(PatternExtractor, config).compare(generated, uploaded))
}

// ── Verification / hashing ────────────────────────────────

/// @returns JSON: { valid: boolean, diagnostics: [...] }
#[wasm_bindgen(js_name = "verifyLicense")]
pub fn verify_license(license: &str) -> Result<String, JsError> {
    let result = verifier::verify(&parse_document(license)?);
    to_json(&serde_json::json!({
        "valid": result.is_valid(),
        "diagnostics": result.diagnostics,
    }))
}

/// Hex SHA-256 of the license identity and its current terms
#[wasm_bindgen(js_name = "semanticHash")]
pub fn semantic_hash(license: &str) -> Result<String, JsError> {
    canonical::semantic_hash(&parse_document(license)?).map_err(js_err)
}

// ── Royalties ─────────────────────────────────────────────

/// Dashboard totals for Manager snapshots read by the page.
///
/// @param snapshots - JSON array of { managerAddress, licensor, licensee, isActive, royalties }
#[wasm_bindgen(js_name = "summarizeRoyalties")]
pub fn summarize_royalties(snapshots: &str) -> Result<String, JsError> {
    let snapshots: Vec<royalty::ManagerSnapshot> =
        serde_json::from_str(snapshots).map_err(|e| JsError::new(&format!("Parse error: {}", e)))?;
    to_json(&royalty::summarize(&snapshots))
}

// ── Wizard ────────────────────────────────────────────────

/// Stateful wizard controller held on the JavaScript side
#[wasm_bindgen(js_name = "Wizard")]
pub struct WasmWizard {
    inner: Wizard,
}

#[wasm_bindgen(js_class = "Wizard")]
impl WasmWizard {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmWizard {
        WasmWizard { inner: Wizard::new() }
    }

    /// Open the wizard on an existing license; generation appends a version
    pub fn editing(license: &str) -> Result<WasmWizard, JsError> {
        Ok(WasmWizard {
            inner: Wizard::editing(parse_document(license)?),
        })
    }

    /// Apply an action such as `{"type": "next"}`; on error the wizard is unchanged
    pub fn dispatch(&mut self, action: &str) -> Result<(), JsError> {
        let action: WizardAction =
            serde_json::from_str(action).map_err(|e| JsError::new(&format!("Invalid action: {}", e)))?;
        self.inner.dispatch(action).map_err(js_err)
    }

    /// Everything the page renders, as JSON
    pub fn state(&self) -> Result<String, JsError> {
        let w = &self.inner;
        let completed: Vec<bool> = (0..STEP_COUNT).map(|s| w.is_step_completed(s)).collect();
        let reachable: Vec<bool> = (0..STEP_COUNT).map(|s| w.can_navigate_to(s)).collect();
        to_json(&serde_json::json!({
            "step": w.step(),
            "mode": w.mode(),
            "stepNames": w.step_names(),
            "completed": completed,
            "reachable": reachable,
            "validation": w.input_validation(),
            "manual": w.manual(),
            "document": w.document(),
            "generatedJson": w.generated_json(),
            "generatedContract": w.generated_contract(),
            "comparison": w.comparison(),
            "deploymentStatus": w.deployment_status(),
        }))
    }
}

impl Default for WasmWizard {
    fn default() -> Self {
        Self::new()
    }
}
