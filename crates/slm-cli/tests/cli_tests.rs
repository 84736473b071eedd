//! Integration tests for the SLM CLI
//!
//! These tests invoke the actual `slm` binary and verify:
//! - Exit codes (0 = success, 1 = validation/transition/comparison failure, 2 = error)
//! - stdout/stderr output
//! - JSON output format
//! - Documents written back to disk

use std::path::{Path, PathBuf};
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn slm_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_slm"))
}

fn fixture(kind: &str, name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(format!("../../tests/fixtures/{}/{}", kind, name))
}

fn license(name: &str) -> PathBuf {
    fixture("licenses", name)
}

fn form(name: &str) -> PathBuf {
    fixture("forms", name)
}

fn contract(name: &str) -> PathBuf {
    fixture("contracts", name)
}

fn command(args: &[&str]) -> Command {
    let mut cmd = Command::new(slm_bin());
    cmd.args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("RUST_LOG")
        .env_remove("SLM_HOME")
        .env_remove("SLM_DEFAULT_NETWORK")
        .env_remove("SLM_DEV_RPC_URL")
        .env_remove("SLM_DEV_ENTITY_ADDRESS");
    cmd
}

fn run_slm(args: &[&str]) -> std::process::Output {
    command(args).output().expect("failed to execute slm")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_str(&stdout(output)).expect("should be valid JSON")
}

/// Copy a fixture into `dir` so commands can write back to it
fn working_copy(dir: &Path, source: &Path) -> PathBuf {
    let target = dir.join(source.file_name().unwrap());
    std::fs::copy(source, &target).unwrap();
    target
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn p(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run_slm(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let out = stdout(&output);
    assert!(out.contains("slm"), "should contain 'slm'");
    assert!(out.contains(env!("CARGO_PKG_VERSION")), "should contain version");
}

#[test]
fn test_version_flag() {
    let output = run_slm(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

// ── New ───────────────────────────────────────────────────

#[test]
fn test_new_from_complete_form() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("license.json");
    let output = run_slm(&["new", "--form", p(&form("complete.json")), "-o", p(&out)]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let doc = read_json(&out);
    assert_eq!(doc["name"], "Sensor Firmware License");
    assert_eq!(doc["status"], "draft");
    assert_eq!(doc["currentVersion"], 1);
    assert_eq!(doc["parties"]["territory"], "EU");
    let version = &doc["versions"][0];
    assert_eq!(version["data"]["duration"], "2Y 0M 0D");
    assert_eq!(version["data"]["rules"][0]["name"], "Annual fee");
    assert_ne!(version["data"]["rules"][0]["id"], 0, "rule id should be assigned");
    assert!(doc["licenseId"].as_str().unwrap().starts_with("LIC-"));
}

#[test]
fn test_new_form_missing_fields() {
    let output = run_slm(&["new", "--form", p(&form("missing-fields.json"))]);
    assert_eq!(output.status.code(), Some(1), "incomplete form should exit 1");
    let err = stderr(&output);
    assert!(err.contains("Duration is required"));
    assert!(err.contains("Territory is required"));
    assert!(stdout(&output).is_empty(), "no document should be printed");
}

#[test]
fn test_new_form_missing_required_party() {
    let output = run_slm(&["new", "--form", p(&form("no-licensee.json"))]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Missing required field: licensee"));
}

#[test]
fn test_new_ai_mode_to_stdout() {
    let text = "Exclusive license for the sensor firmware in the EU";
    let output = run_slm(&["new", "--ai", text]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let doc = json_stdout(&output);
    assert_eq!(doc["versions"][0]["data"]["ips"], text);
    assert_eq!(doc["versions"][0]["data"]["rules"][0]["name"], "AI Generated Rule");
    assert_eq!(doc["versions"][0]["createdBy"], "creator");
}

#[test]
fn test_new_ai_text_too_short() {
    let output = run_slm(&["new", "--ai", "too short"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("at least 10 characters"));
}

#[test]
fn test_new_without_input_is_error() {
    let output = run_slm(&["new"]);
    assert_eq!(output.status.code(), Some(2));
}

// ── Lifecycle ─────────────────────────────────────────────

#[test]
fn test_full_lifecycle_writes_back() {
    let dir = tempfile::tempdir().unwrap();
    let file = working_copy(dir.path(), &license("draft.json"));

    for (cmd, status) in [("propose", "proposed"), ("approve", "approved"), ("deploy", "deployed")] {
        let output = run_slm(&[cmd, p(&file)]);
        assert!(output.status.success(), "{} failed: {}", cmd, stderr(&output));
        assert!(stdout(&output).contains(status));
        let doc = read_json(&file);
        assert_eq!(doc["status"], status);
        assert_eq!(doc["versions"][0]["status"], status);
    }

    let verify = run_slm(&["verify", p(&file)]);
    assert!(verify.status.success(), "deployed document should verify");
}

#[test]
fn test_invalid_transition_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let file = working_copy(dir.path(), &license("draft.json"));
    let before = std::fs::read_to_string(&file).unwrap();

    let output = run_slm(&["approve", p(&file)]);
    assert_eq!(output.status.code(), Some(1), "approving a draft should exit 1");
    assert!(stderr(&output).contains("cannot approve"));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
}

#[test]
fn test_revise_deployed_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = working_copy(dir.path(), &license("deployed.json"));
    let before = std::fs::read_to_string(&file).unwrap();

    let output = run_slm(&["revise", p(&file), "--reviewer", "0xabc", "--comment", "too late"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("deployed"));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
}

#[test]
fn test_transition_rejects_broken_history() {
    let dir = tempfile::tempdir().unwrap();
    let file = working_copy(dir.path(), &license("version-gap.json"));
    let before = std::fs::read_to_string(&file).unwrap();

    for cmd in ["propose", "approve"] {
        let output = run_slm(&[cmd, p(&file)]);
        assert_eq!(output.status.code(), Some(1), "{} should reject the document", cmd);
        assert!(stderr(&output).contains("found where 2 was expected"));
    }
    let output = run_slm(&["revise", p(&file), "--reviewer", "0xabc", "--comment", "again"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), before, "file must be untouched");
}

#[test]
fn test_revise_proposed_appends_version() {
    let dir = tempfile::tempdir().unwrap();
    let file = working_copy(dir.path(), &license("draft.json"));
    assert!(run_slm(&["propose", p(&file)]).status.success());

    let output = run_slm(&[
        "revise",
        p(&file),
        "--reviewer",
        "0x2222222222222222222222222222222222222222",
        "--comment",
        "Lower the rate",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let doc = read_json(&file);
    assert_eq!(doc["currentVersion"], 2);
    assert_eq!(doc["status"], "needs_revision");
    assert_eq!(doc["versions"][0]["status"], "proposed");
    assert_eq!(doc["versions"][1]["feedback"]["message"], "Lower the rate");
    assert_eq!(doc["versions"][1]["comment"], "Revision requested: Lower the rate");
}

#[test]
fn test_edit_appends_draft_to_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("edited.json");
    let output = run_slm(&[
        "edit",
        p(&license("deployed.json")),
        "--form",
        p(&form("complete.json")),
        "-o",
        p(&out),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let doc = read_json(&out);
    assert_eq!(doc["licenseId"], "LIC-2025-007");
    assert_eq!(doc["currentVersion"], 3);
    assert_eq!(doc["status"], "draft");
    assert_eq!(doc["versions"][1]["status"], "deployed");
}

// ── Show / Hash / Contract ────────────────────────────────

#[test]
fn test_show_human_and_json() {
    let output = run_slm(&["show", p(&license("deployed.json"))]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Codec Patent Pool"));
    assert!(out.contains("Territory too narrow"));

    let output = run_slm(&["show", "--json", p(&license("deployed.json"))]);
    assert_eq!(json_stdout(&output)["licenseId"], "LIC-2025-007");
}

#[test]
fn test_hash_is_sha256_hex() {
    let output = run_slm(&["hash", p(&license("draft.json"))]);
    assert!(output.status.success());
    let hash = stdout(&output).trim().to_string();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_hash_determinism() {
    let path = license("draft.json");
    let first = stdout(&run_slm(&["hash", p(&path)]));
    for i in 0..10 {
        let again = stdout(&run_slm(&["hash", p(&path)]));
        assert_eq!(first, again, "hash diverged at iteration {}", i);
    }
}

#[test]
fn test_hash_malformed_json() {
    let output = run_slm(&["hash", p(&license("malformed.json"))]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Parse error"));
}

#[test]
fn test_contract_to_stdout() {
    let output = run_slm(&["contract", p(&license("draft.json"))]);
    assert!(output.status.success());
    let source = stdout(&output);
    assert!(source.contains("pragma solidity ^0.8.4;"));
    assert!(source.contains("contract SmartLicense"));
    assert!(source.contains("LIC-2025-042"));
}

// ── Compare ───────────────────────────────────────────────

#[test]
fn test_compare_identical() {
    let path = contract("royalty-manager.sol");
    let output = run_slm(&["compare", "--json", p(&path), p(&path)]);
    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["similarity"], 100.0);
    assert_eq!(json["isValid"], true);
    assert!(json["differences"].as_array().unwrap().is_empty());
}

#[test]
fn test_compare_different_contracts() {
    let output = run_slm(&["compare", "--json", p(&contract("foo.sol")), p(&contract("bar.sol"))]);
    assert_eq!(output.status.code(), Some(1), "0% similarity should exit 1");
    let json = json_stdout(&output);
    assert_eq!(json["similarity"], 0.0);
    assert_eq!(json["missing"].as_array().unwrap().len(), 1);
    assert_eq!(json["extra"].as_array().unwrap().len(), 1);
    assert_eq!(json["differences"][0], "Missing contract: Foo");
}

#[test]
fn test_compare_license_with_generated_contract() {
    let dir = tempfile::tempdir().unwrap();
    let sol = dir.path().join("generated.sol");
    let license = license("draft.json");
    assert!(run_slm(&["contract", p(&license), "-o", p(&sol)]).status.success());

    let output = run_slm(&["compare", p(&license), p(&sol)]);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
    assert!(stdout(&output).contains("100.0%"));
}

#[test]
fn test_compare_threshold_flag() {
    let output = run_slm(&[
        "compare",
        "--threshold",
        "0",
        p(&contract("foo.sol")),
        p(&contract("bar.sol")),
    ]);
    assert!(output.status.success(), "threshold 0 accepts anything");
}

// ── Validate / Verify ─────────────────────────────────────

#[test]
fn test_validate_complete_form() {
    let output = run_slm(&["validate", p(&form("complete.json"))]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("valid"));
}

#[test]
fn test_validate_json_lists_every_missing_field() {
    let output = run_slm(&["validate", "--json", p(&form("missing-fields.json"))]);
    assert_eq!(output.status.code(), Some(1));
    let json = json_stdout(&output);
    assert_eq!(json["valid"], false);
    let errors: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert_eq!(errors, vec!["Duration is required", "Territory is required"]);
}

#[test]
fn test_validate_quiet_valid() {
    let output = run_slm(&["--quiet", "validate", p(&form("complete.json"))]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty(), "quiet mode should produce no stdout");
}

#[test]
fn test_validate_ai_text() {
    assert!(run_slm(&["validate", "--ai", "A long enough description"]).status.success());
    assert_eq!(run_slm(&["validate", "--ai", "   short  "]).status.code(), Some(1));
}

#[test]
fn test_verify_valid_document() {
    let output = run_slm(&["verify", "--json", p(&license("draft.json"))]);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
    let json = json_stdout(&output);
    assert_eq!(json["valid"], true);
    assert_eq!(json["errors"], 0);
}

#[test]
fn test_verify_version_gap() {
    let output = run_slm(&["verify", p(&license("version-gap.json"))]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("version number 3 found where 2 was expected"));
    assert!(err.contains("currentVersion"));
}

#[test]
fn test_verify_nonexistent_file() {
    let output = run_slm(&["verify", "nonexistent.json"]);
    assert_eq!(output.status.code(), Some(2), "missing file should exit 2");
}

#[test]
fn test_verify_determinism() {
    let path = license("version-gap.json");
    let first = stdout(&run_slm(&["verify", "--json", p(&path)]));
    for _ in 0..10 {
        assert_eq!(stdout(&run_slm(&["verify", "--json", p(&path)])), first);
    }
}

// ── Export ────────────────────────────────────────────────

#[test]
fn test_export_writes_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_slm(&["export", "--json", "--dir", p(dir.path()), p(&license("draft.json"))]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let bundle = json_stdout(&output);
    let json_path = PathBuf::from(bundle["json"].as_str().unwrap());
    let sol_path = PathBuf::from(bundle["contract"].as_str().unwrap());
    let json_name = json_path.file_name().unwrap().to_str().unwrap().to_string();
    let sol_name = sol_path.file_name().unwrap().to_str().unwrap().to_string();
    assert!(json_name.starts_with("smart-license-") && json_name.ends_with(".json"));
    assert!(sol_name.starts_with("smart-license-contract-") && sol_name.ends_with(".sol"));

    assert_eq!(read_json(&json_path)["licenseId"], "LIC-2025-042");
    assert!(std::fs::read_to_string(&sol_path).unwrap().contains("contract SmartLicense"));
}

// ── Network ───────────────────────────────────────────────

#[test]
fn test_network_defaults_to_development() {
    let state = tempfile::tempdir().unwrap();
    let output = run_slm(&["--state-dir", p(state.path()), "network", "show", "--json"]);
    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["network"], "development");
    assert_eq!(json["rpcUrl"], "http://localhost:8545");
    assert_eq!(json["chainId"], 31337);
}

#[test]
fn test_network_selection_persists() {
    let state = tempfile::tempdir().unwrap();
    let dir = p(state.path());
    assert!(run_slm(&["--state-dir", dir, "network", "use", "alps"]).status.success());

    let json = json_stdout(&run_slm(&["--state-dir", dir, "network", "show", "--json"]));
    assert_eq!(json["network"], "alps");
    assert_eq!(json["name"], "ALPS Network");
    assert!(state.path().join("settings.json").exists());
}

#[test]
fn test_network_unknown_name() {
    let state = tempfile::tempdir().unwrap();
    let output = run_slm(&["--state-dir", p(state.path()), "network", "use", "mainnet"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("unknown network"));
}

#[test]
fn test_network_contract_addresses() {
    let state = tempfile::tempdir().unwrap();
    let dir = p(state.path());

    let output = run_slm(&[
        "--state-dir",
        dir,
        "network",
        "set-address",
        "entity",
        "0x1234567890123456789012345678901234567890",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = json_stdout(&run_slm(&["--state-dir", dir, "network", "show", "--json"]));
    assert_eq!(json["contracts"]["entity"], "0x1234567890123456789012345678901234567890");

    let output = run_slm(&[
        "--state-dir",
        dir,
        "network",
        "load-addresses",
        p(&contract("deployment.json")),
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("loaded 3"));
    let json = json_stdout(&run_slm(&["--state-dir", dir, "network", "show", "--json"]));
    assert_eq!(json["contracts"]["token"], "0x5FbDB2315678afecb367f032d93F642f64180aa3");
}

#[test]
fn test_network_profile_from_environment() {
    let state = tempfile::tempdir().unwrap();
    let output = command(&["--state-dir", p(state.path()), "network", "show", "--json"])
        .env("SLM_DEV_RPC_URL", "http://10.0.0.5:8545")
        .env("SLM_DEV_ENTITY_ADDRESS", "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512")
        .output()
        .unwrap();
    let json = json_stdout(&output);
    assert_eq!(json["rpcUrl"], "http://10.0.0.5:8545");
    assert_eq!(json["contracts"]["entity"], "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
}

#[test]
fn test_set_address_rejects_garbage() {
    let state = tempfile::tempdir().unwrap();
    let output = run_slm(&["--state-dir", p(state.path()), "network", "set-address", "token", "0x..."]);
    assert_eq!(output.status.code(), Some(2));
}

// ── Royalty ───────────────────────────────────────────────

#[test]
fn test_royalty_requires_entity_address() {
    let state = tempfile::tempdir().unwrap();
    let output = run_slm(&["--state-dir", p(state.path()), "royalty"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("no entity address"));
}

#[test]
fn test_royalty_unreachable_node() {
    let state = tempfile::tempdir().unwrap();
    let output = command(&[
        "--state-dir",
        p(state.path()),
        "royalty",
        "--json",
        "--entity",
        "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512",
    ])
    .env("SLM_DEV_RPC_URL", "http://127.0.0.1:9")
    .output()
    .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let json = json_stdout(&output);
    assert!(json["state"]["lastError"].as_str().unwrap().contains("Connectivity error"));
    assert_eq!(json["summary"]["totalLicenses"], 0);
}
