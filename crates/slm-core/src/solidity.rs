//! Contract generator — Solidity source for a license document
//!
//! Produces the "generated" side of a contract comparison. The output is a
//! deterministic template: license terms travel as constructor arguments,
//! royalty rules are registered as descriptive records, and the approval and
//! deployment functions mirror the document lifecycle.

use crate::rules::{LicenseDuration, Rule};
use crate::{Error, LicenseDocument, Result};

/// Name of the generated contract
pub const CONTRACT_NAME: &str = "SmartLicense";

const PRAGMA: &str = "^0.8.4";

/// Render the current version of `doc` as Solidity source
pub fn generate_contract(doc: &LicenseDocument) -> Result<String> {
    let current = doc.current().ok_or_else(|| {
        Error::DocumentError(format!(
            "current version {} not found",
            doc.current_version
        ))
    })?;
    let rules = &current.data.rules;

    let mut out = String::new();
    out.push_str("// SPDX-License-Identifier: MIT\n");
    write_meta(&mut out, "License", &doc.name);
    write_meta(&mut out, "License ID", &doc.license_id);
    write_meta(&mut out, "Version", &current.version_number.to_string());
    write_meta(&mut out, "Territory", &doc.parties.territory);
    if !current.data.duration.is_empty() {
        write_meta(
            &mut out,
            "Duration",
            &format!(
                "{} ({} s)",
                current.data.duration,
                duration_seconds(&current.data.duration)
            ),
        );
    }
    out.push_str(&format!("pragma solidity {};\n\n", PRAGMA));
    out.push_str("import \"@openzeppelin/contracts/access/Ownable.sol\";\n");
    out.push_str("import \"@openzeppelin/contracts/security/ReentrancyGuard.sol\";\n\n");

    out.push_str(&format!(
        "contract {} is Ownable, ReentrancyGuard {{\n",
        CONTRACT_NAME
    ));
    write_structs(&mut out, !rules.is_empty());
    write_state(&mut out, !rules.is_empty());
    write_events(&mut out);
    write_constructor(&mut out, rules);
    write_lifecycle_functions(&mut out);
    if !rules.is_empty() {
        write_rule_functions(&mut out);
    }
    out.push_str("}\n");

    Ok(out)
}

/// Duration in seconds as passed to the constructor; unparsable text yields 0
pub fn duration_seconds(duration: &str) -> u64 {
    LicenseDuration::parse(duration)
        .map(|d| d.approx_days() * 86_400)
        .unwrap_or(0)
}

// ── Sections ───────────────────────────────────────────────

fn write_structs(out: &mut String, with_rules: bool) {
    write_line(out, 1, "struct LicenseData {");
    for field in [
        "string name;",
        "address licensor;",
        "address licensee;",
        "string territory;",
        "uint256 duration;",
        "string intellectualProperty;",
        "bool isActive;",
        "uint256 createdAt;",
    ] {
        write_line(out, 2, field);
    }
    write_line(out, 1, "}");
    out.push('\n');

    if with_rules {
        write_line(out, 1, "struct RoyaltyRule {");
        write_line(out, 2, "string name;");
        write_line(out, 2, "string rateType;");
        write_line(out, 2, "string summary;");
        write_line(out, 2, "string validityStart;");
        write_line(out, 2, "string validityEnd;");
        write_line(out, 1, "}");
        out.push('\n');
    }
}

fn write_state(out: &mut String, with_rules: bool) {
    write_line(out, 1, "LicenseData public licenseData;");
    if with_rules {
        write_line(out, 1, "RoyaltyRule[] private royaltyRules;");
    }
    write_line(out, 1, "mapping(address => bool) public approvedBy;");
    write_line(out, 1, "bool public isApproved;");
    write_line(out, 1, "bool public isDeployed;");
    out.push('\n');
}

fn write_events(out: &mut String) {
    write_line(out, 1, "event LicenseCreated(string name, address licensor, address licensee);");
    write_line(out, 1, "event LicenseApproved(address approver);");
    write_line(out, 1, "event LicenseDeployed();");
    out.push('\n');
}

fn write_constructor(out: &mut String, rules: &[Rule]) {
    write_line(out, 1, "constructor(");
    write_line(out, 2, "string memory _name,");
    write_line(out, 2, "address _licensor,");
    write_line(out, 2, "address _licensee,");
    write_line(out, 2, "string memory _territory,");
    write_line(out, 2, "uint256 _duration,");
    write_line(out, 2, "string memory _intellectualProperty");
    write_line(out, 1, ") {");
    write_line(out, 2, "licenseData = LicenseData({");
    for (field, value) in [
        ("name", "_name"),
        ("licensor", "_licensor"),
        ("licensee", "_licensee"),
        ("territory", "_territory"),
        ("duration", "_duration"),
        ("intellectualProperty", "_intellectualProperty"),
        ("isActive", "true"),
    ] {
        write_line(out, 3, &format!("{}: {},", field, value));
    }
    write_line(out, 3, "createdAt: block.timestamp");
    write_line(out, 2, "});");

    for rule in rules {
        let rate = &rule.royalty_rate;
        out.push('\n');
        write_line(out, 2, &format!("// {}", single_line(&rate.summary())));
        write_line(out, 2, "royaltyRules.push(RoyaltyRule({");
        write_line(out, 3, &format!("name: {},", string_literal(&rule.name)));
        write_line(
            out,
            3,
            &format!("rateType: {},", string_literal(&rate_type(rule))),
        );
        write_line(out, 3, &format!("summary: {},", string_literal(&rate.summary())));
        write_line(
            out,
            3,
            &format!("validityStart: {},", string_literal(&rule.validity_start)),
        );
        write_line(
            out,
            3,
            &format!("validityEnd: {}", string_literal(&rule.validity_end)),
        );
        write_line(out, 2, "}));");
    }

    out.push('\n');
    write_line(out, 2, "emit LicenseCreated(_name, _licensor, _licensee);");
    write_line(out, 1, "}");
    out.push('\n');
}

fn write_lifecycle_functions(out: &mut String) {
    write_line(out, 1, "function approveLicense() external {");
    write_line(
        out,
        2,
        "require(msg.sender == licenseData.licensor || msg.sender == licenseData.licensee, \"Not authorized\");",
    );
    write_line(out, 2, "require(!approvedBy[msg.sender], \"Already approved\");");
    out.push('\n');
    write_line(out, 2, "approvedBy[msg.sender] = true;");
    write_line(out, 2, "emit LicenseApproved(msg.sender);");
    out.push('\n');
    write_line(
        out,
        2,
        "if (approvedBy[licenseData.licensor] && approvedBy[licenseData.licensee]) {",
    );
    write_line(out, 3, "isApproved = true;");
    write_line(out, 2, "}");
    write_line(out, 1, "}");
    out.push('\n');

    write_line(out, 1, "function deployLicense() external onlyOwner {");
    write_line(out, 2, "require(isApproved, \"License not approved by both parties\");");
    write_line(out, 2, "require(!isDeployed, \"Already deployed\");");
    out.push('\n');
    write_line(out, 2, "isDeployed = true;");
    write_line(out, 2, "emit LicenseDeployed();");
    write_line(out, 1, "}");
    out.push('\n');

    write_line(
        out,
        1,
        "function getLicenseInfo() external view returns (LicenseData memory) {",
    );
    write_line(out, 2, "return licenseData;");
    write_line(out, 1, "}");
}

fn write_rule_functions(out: &mut String) {
    out.push('\n');
    write_line(
        out,
        1,
        "function getRoyaltyRule(uint256 index) external view returns (RoyaltyRule memory) {",
    );
    write_line(out, 2, "require(index < royaltyRules.length, \"No such rule\");");
    write_line(out, 2, "return royaltyRules[index];");
    write_line(out, 1, "}");
    out.push('\n');
    write_line(
        out,
        1,
        "function royaltyRuleCount() external view returns (uint256) {",
    );
    write_line(out, 2, "return royaltyRules.length;");
    write_line(out, 1, "}");
}

// ── Helpers ────────────────────────────────────────────────

fn write_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("    ");
    }
}

fn write_line(out: &mut String, level: usize, text: &str) {
    write_indent(out, level);
    out.push_str(text);
    out.push('\n');
}

fn write_meta(out: &mut String, label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    out.push_str(&format!("// {}: {}\n", label, single_line(value)));
}

fn rate_type(rule: &Rule) -> String {
    serde_json::to_value(rule.royalty_rate.kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Comments must not break across lines
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c.is_ascii() => out.push(c),
            // Plain string literals are ASCII-only
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    out.push('"');
    out
}
