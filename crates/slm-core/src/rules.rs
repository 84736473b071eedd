//! Royalty rules — the per-version royalty-computation descriptors
//!
//! A rule names one or more royalty bases (numeric properties read from an
//! oracle or another smart license) and a royalty rate that combines them:
//! a lump sum, a proportional factor, a custom expression tree, or a step
//! function.
//!
//! Form values are kept as strings, exactly as entered, so that a document
//! round-trips through the generator without reformatting numbers.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::{Error, Result};

/// Royalty base name reserved for the time axis of a step function
pub const TIME_AXIS: &str = "time";

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rule {
    pub id: u64,
    pub name: String,
    pub validity_start: String,
    pub validity_end: String,
    pub evaluation_interval: EvaluationInterval,
    pub royalty_base: Vec<RoyaltyBase>,
    pub royalty_rate: RoyaltyRate,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EvaluationInterval {
    pub duration: String,
}

/// A named numeric input feeding the royalty rate
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoyaltyBase {
    pub id: u64,
    pub oracle_address: String,
    pub property_name: String,
    pub display_name: String,
    pub intellectual_property: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoyaltyRate {
    #[serde(rename = "type")]
    pub kind: RateKind,
    pub lumpsum_value: String,
    pub proportional_value: String,
    #[serde(rename = "proportionalRB")]
    pub proportional_rb: String,
    pub custom_func: String,
    pub custom_inputs: Vec<CustomInput>,
    pub step_structure: StepStructure,
    pub min: String,
    pub max: String,
}

impl Default for RoyaltyRate {
    fn default() -> Self {
        RoyaltyRate {
            kind: RateKind::Lumpsum,
            lumpsum_value: String::new(),
            proportional_value: String::new(),
            proportional_rb: String::new(),
            custom_func: "sum".into(),
            custom_inputs: Vec::new(),
            step_structure: StepStructure::default(),
            min: String::new(),
            max: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateKind {
    #[default]
    Lumpsum,
    Proportional,
    Custom,
    Step,
}

/// Node of a custom royalty expression tree
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CustomInput {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub value: String,
    pub func: String,
    pub rb: String,
    pub inputs: Vec<CustomInput>,
}

impl Default for CustomInput {
    fn default() -> Self {
        CustomInput {
            id: 0,
            kind: InputKind::Constant,
            value: String::new(),
            func: "sum".into(),
            rb: String::new(),
            inputs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    Constant,
    Func,
    Rb,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepStructure {
    /// Royalty base display name, or [`TIME_AXIS`]
    pub x_axis: String,
    pub steps: Vec<StepPoint>,
    pub infinite_value: String,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StepPoint {
    pub id: u64,
    pub x: f64,
    pub y: f64,
}

// ── Rule editing ──────────────────────────────────────────

impl Rule {
    /// Blank rule as added by the configuration form: `Rule <n>` with one `RB01` base
    pub fn template(id: u64, ordinal: usize) -> Self {
        Rule {
            id,
            name: format!("Rule {}", ordinal),
            royalty_base: vec![RoyaltyBase {
                id,
                display_name: base_display_name(1),
                ..RoyaltyBase::default()
            }],
            ..Rule::default()
        }
    }

    /// Clear every field except the id
    pub fn reset(&mut self, base_id: u64) {
        let id = self.id;
        *self = Rule::template(id, 0);
        self.name.clear();
        self.royalty_base[0].id = base_id;
    }

    pub fn base(&self, display_name: &str) -> Option<&RoyaltyBase> {
        self.royalty_base
            .iter()
            .find(|rb| rb.display_name == display_name)
    }

    /// Append a base named `RB<nn>` after the existing ones
    pub fn add_royalty_base(&mut self, id: u64) -> &RoyaltyBase {
        let name = base_display_name(self.royalty_base.len() + 1);
        self.royalty_base.push(RoyaltyBase {
            id,
            display_name: name,
            ..RoyaltyBase::default()
        });
        &self.royalty_base[self.royalty_base.len() - 1]
    }

    /// Remove a base and blank every rate reference that pointed at it
    pub fn remove_royalty_base(&mut self, id: u64) -> Option<RoyaltyBase> {
        let index = self.royalty_base.iter().position(|rb| rb.id == id)?;
        let removed = self.royalty_base.remove(index);
        self.royalty_rate.replace_base_reference(&removed.display_name, "");
        Some(removed)
    }

    /// Rename a base, following the new name through every rate reference
    pub fn rename_royalty_base(&mut self, id: u64, new_name: &str) -> bool {
        let Some(rb) = self.royalty_base.iter_mut().find(|rb| rb.id == id) else {
            return false;
        };
        let old = std::mem::replace(&mut rb.display_name, new_name.to_string());
        self.royalty_rate.replace_base_reference(&old, new_name);
        true
    }

    /// Blank rate references to bases that no longer exist
    pub fn clean_dangling_references(&mut self) {
        let known: Vec<String> = self
            .royalty_base
            .iter()
            .map(|rb| rb.display_name.clone())
            .collect();
        let rate = &mut self.royalty_rate;
        if !rate.proportional_rb.is_empty() && !known.contains(&rate.proportional_rb) {
            rate.proportional_rb.clear();
        }
        let axis = &rate.step_structure.x_axis;
        if !axis.is_empty() && axis != TIME_AXIS && !known.contains(axis) {
            rate.step_structure.x_axis.clear();
        }
        for input in &mut rate.custom_inputs {
            if input.kind == InputKind::Rb && !input.rb.is_empty() && !known.contains(&input.rb) {
                input.rb.clear();
            }
        }
    }

    /// Base names referenced by the rate but not declared on the rule
    pub fn dangling_references(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for name in self.royalty_rate.referenced_bases() {
            if name != TIME_AXIS && self.base(&name).is_none() && !missing.contains(&name) {
                missing.push(name);
            }
        }
        missing
    }
}

fn base_display_name(n: usize) -> String {
    format!("RB{:02}", n)
}

impl RoyaltyRate {
    fn replace_base_reference(&mut self, old: &str, new: &str) {
        if self.proportional_rb == old {
            self.proportional_rb = new.to_string();
        }
        if self.step_structure.x_axis == old {
            self.step_structure.x_axis = new.to_string();
        }
        // Only top-level inputs reference bases directly in the form.
        for input in &mut self.custom_inputs {
            if input.kind == InputKind::Rb && input.rb == old {
                input.rb = new.to_string();
            }
        }
    }

    /// Every base name the active rate kind reads
    pub fn referenced_bases(&self) -> Vec<String> {
        let mut names = Vec::new();
        match self.kind {
            RateKind::Lumpsum => {}
            RateKind::Proportional => {
                if !self.proportional_rb.is_empty() {
                    names.push(self.proportional_rb.clone());
                }
            }
            RateKind::Custom => collect_input_bases(&self.custom_inputs, &mut names),
            RateKind::Step => {
                if !self.step_structure.x_axis.is_empty() {
                    names.push(self.step_structure.x_axis.clone());
                }
            }
        }
        names
    }

    /// One-line human description of the rate
    pub fn summary(&self) -> String {
        match self.kind {
            RateKind::Lumpsum => format!(
                "Lumpsum: ${} (Fixed amount)",
                or_default(&self.lumpsum_value, "0")
            ),
            RateKind::Proportional => format!(
                "Proportional: ${} × {} (Multiply by Royalty Base)",
                or_default(&self.proportional_value, "0"),
                or_default(&self.proportional_rb, "RB")
            ),
            RateKind::Custom => {
                let func = or_default(&self.custom_func, "sum");
                if self.custom_inputs.is_empty() {
                    return format!("Custom: {} function (No inputs configured)", func);
                }
                let inputs: Vec<String> = self.custom_inputs.iter().map(describe_input).collect();
                format!(
                    "Custom: {}({}) ({} inputs)",
                    func,
                    inputs.join(" + "),
                    self.custom_inputs.len()
                )
            }
            RateKind::Step => {
                let s = &self.step_structure;
                let mut out = format!(
                    "Step: {} steps on {}",
                    s.steps.len(),
                    or_default(&s.x_axis, "unset axis")
                );
                if !s.infinite_value.is_empty() {
                    out.push_str(&format!(", ∞ → ${}", s.infinite_value));
                }
                out
            }
        }
    }

    /// Evaluate the rate for the given base values (keyed by display name).
    ///
    /// The result is clamped to `[min, max]` when those fields hold numbers.
    pub fn evaluate(&self, bases: &BTreeMap<String, f64>) -> Result<f64> {
        let raw = match self.kind {
            RateKind::Lumpsum => parse_number("lumpsumValue", &self.lumpsum_value)?,
            RateKind::Proportional => {
                let factor = parse_number("proportionalValue", &self.proportional_value)?;
                factor * lookup_base(bases, &self.proportional_rb)?
            }
            RateKind::Custom => {
                let values = self
                    .custom_inputs
                    .iter()
                    .map(|input| evaluate_input(input, bases))
                    .collect::<Result<Vec<_>>>()?;
                apply_function(or_default(&self.custom_func, "sum"), &values)?
            }
            RateKind::Step => {
                let x = lookup_base(bases, &self.step_structure.x_axis)?;
                self.step_structure.value_at(x)?
            }
        };
        Ok(self.clamp(raw))
    }

    fn clamp(&self, value: f64) -> f64 {
        let mut v = value;
        if let Ok(min) = self.min.trim().parse::<f64>() {
            v = v.max(min);
        }
        if let Ok(max) = self.max.trim().parse::<f64>() {
            v = v.min(max);
        }
        v
    }
}

impl StepStructure {
    /// Step-after lookup: below the first threshold pays 0, past the last
    /// threshold pays `infinite_value` when one is set
    pub fn value_at(&self, x: f64) -> Result<f64> {
        let mut steps: Vec<&StepPoint> = self.steps.iter().collect();
        steps.sort_by(|a, b| a.x.total_cmp(&b.x));

        let Some(last) = steps.last() else {
            if self.infinite_value.trim().is_empty() {
                return Err(Error::EvaluationError("step function has no steps".into()));
            }
            return parse_number("infiniteValue", &self.infinite_value);
        };
        if x > last.x && !self.infinite_value.trim().is_empty() {
            return parse_number("infiniteValue", &self.infinite_value);
        }
        Ok(steps
            .iter()
            .take_while(|s| s.x <= x)
            .last()
            .map(|s| s.y)
            .unwrap_or(0.0))
    }
}

fn collect_input_bases(inputs: &[CustomInput], out: &mut Vec<String>) {
    for input in inputs {
        match input.kind {
            InputKind::Rb if !input.rb.is_empty() => out.push(input.rb.clone()),
            InputKind::Func => collect_input_bases(&input.inputs, out),
            _ => {}
        }
    }
}

fn describe_input(input: &CustomInput) -> String {
    match input.kind {
        InputKind::Constant => format!("const({})", or_default(&input.value, "0")),
        InputKind::Rb => format!("RB({})", or_default(&input.rb, "none")),
        InputKind::Func => format!(
            "func({})[{} inputs]",
            or_default(&input.func, "sum"),
            input.inputs.len()
        ),
    }
}

fn evaluate_input(input: &CustomInput, bases: &BTreeMap<String, f64>) -> Result<f64> {
    match input.kind {
        InputKind::Constant => parse_number("constant", &input.value),
        InputKind::Rb => lookup_base(bases, &input.rb),
        InputKind::Func => {
            let values = input
                .inputs
                .iter()
                .map(|child| evaluate_input(child, bases))
                .collect::<Result<Vec<_>>>()?;
            apply_function(or_default(&input.func, "sum"), &values)
        }
    }
}

fn apply_function(func: &str, values: &[f64]) -> Result<f64> {
    if func == "sum" {
        return Ok(values.iter().sum());
    }
    let Some((&first, rest)) = values.split_first() else {
        return Err(Error::EvaluationError(format!(
            "function '{}' has no inputs",
            func
        )));
    };
    match func {
        "multiply" => Ok(rest.iter().fold(first, |acc, v| acc * v)),
        "subtract" => Ok(rest.iter().fold(first, |acc, v| acc - v)),
        "divide" => rest.iter().try_fold(first, |acc, &v| {
            if v == 0.0 {
                Err(Error::EvaluationError("division by zero".into()))
            } else {
                Ok(acc / v)
            }
        }),
        "max" => Ok(rest.iter().fold(first, |acc, &v| acc.max(v))),
        "min" => Ok(rest.iter().fold(first, |acc, &v| acc.min(v))),
        other => Err(Error::EvaluationError(format!(
            "unknown function '{}'",
            other
        ))),
    }
}

fn lookup_base(bases: &BTreeMap<String, f64>, name: &str) -> Result<f64> {
    if name.is_empty() {
        return Err(Error::EvaluationError("royalty base not selected".into()));
    }
    bases
        .get(name)
        .copied()
        .ok_or_else(|| Error::EvaluationError(format!("no value for royalty base '{}'", name)))
}

fn parse_number(field: &str, text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| Error::EvaluationError(format!("{} is not a number: '{}'", field, text)))
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

// ── Durations ─────────────────────────────────────────────

/// A `"<n>Y <n>M <n>D"` license or evaluation-interval duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LicenseDuration {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl LicenseDuration {
    /// Parse every `<digits><Y|M|D>` group; text without any group is rejected
    pub fn parse(text: &str) -> Result<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| Regex::new(r"(\d+)([YMD])").expect("valid duration regex"));

        let mut duration = LicenseDuration::default();
        let mut found = false;
        for caps in re.captures_iter(text) {
            let value: u32 = caps[1]
                .parse()
                .map_err(|_| Error::ParseError(format!("duration value too large in '{}'", text)))?;
            match &caps[2] {
                "Y" => duration.years += value,
                "M" => duration.months += value,
                _ => duration.days += value,
            }
            found = true;
        }
        if !found {
            return Err(Error::ParseError(format!("invalid duration '{}'", text)));
        }
        Ok(duration)
    }

    /// Approximate length in days (30-day months, 365-day years)
    pub fn approx_days(&self) -> u64 {
        self.years as u64 * 365 + self.months as u64 * 30 + self.days as u64
    }
}

impl std::fmt::Display for LicenseDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}Y {}M {}D", self.years, self.months, self.days)
    }
}

// ── Smart policy dependencies ─────────────────────────────

/// A royalty base that reads from another smart license
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDependency {
    pub rule_id: u64,
    pub rule_name: String,
    pub display_name: String,
    pub smart_license_address: String,
    pub property_name: String,
}

/// Collect bases whose source address is another smart license, one entry
/// per distinct address
pub fn policy_dependencies(
    rules: &[Rule],
    is_smart_license: impl Fn(&str) -> bool,
) -> Vec<PolicyDependency> {
    let mut deps: Vec<PolicyDependency> = Vec::new();
    for rule in rules {
        for rb in &rule.royalty_base {
            if !is_valid_address(&rb.oracle_address) || !is_smart_license(&rb.oracle_address) {
                continue;
            }
            if deps
                .iter()
                .any(|d| d.smart_license_address == rb.oracle_address)
            {
                continue;
            }
            deps.push(PolicyDependency {
                rule_id: rule.id,
                rule_name: rule.name.clone(),
                display_name: rb.display_name.clone(),
                smart_license_address: rb.oracle_address.clone(),
                property_name: rb.property_name.clone(),
            });
        }
    }
    deps
}

/// Well-formed Ethereum address: `0x` + 40 hex chars
pub fn is_valid_address(addr: &str) -> bool {
    addr.len() == 42
        && addr.starts_with("0x")
        && addr[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bases(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn rate(kind: RateKind) -> RoyaltyRate {
        RoyaltyRate {
            kind,
            ..RoyaltyRate::default()
        }
    }

    fn input(kind: InputKind, value: &str, rb: &str) -> CustomInput {
        CustomInput {
            kind,
            value: value.into(),
            rb: rb.into(),
            ..CustomInput::default()
        }
    }

    #[test]
    fn test_rule_template() {
        let rule = Rule::template(7, 2);
        assert_eq!(rule.name, "Rule 2");
        assert_eq!(rule.royalty_base.len(), 1);
        assert_eq!(rule.royalty_base[0].display_name, "RB01");
        assert_eq!(rule.royalty_rate.kind, RateKind::Lumpsum);
        assert_eq!(rule.royalty_rate.custom_func, "sum");
    }

    #[test]
    fn test_rule_json_keys() {
        let json = serde_json::to_value(Rule::template(1, 1)).unwrap();
        assert!(json.get("validityStart").is_some());
        assert!(json["royaltyRate"].get("proportionalRB").is_some());
        assert_eq!(json["royaltyRate"]["type"], "lumpsum");
        assert!(json["royaltyRate"]["stepStructure"].get("infiniteValue").is_some());
    }

    #[test]
    fn test_rule_parses_sparse_json() {
        let rule: Rule = serde_json::from_str(r#"{"name": "Sparse", "royaltyRate": {"type": "custom"}}"#).unwrap();
        assert_eq!(rule.name, "Sparse");
        assert_eq!(rule.royalty_rate.kind, RateKind::Custom);
        assert_eq!(rule.royalty_rate.custom_func, "sum");
        assert!(rule.royalty_base.is_empty());
    }

    #[test]
    fn test_add_base_numbering() {
        let mut rule = Rule::template(1, 1);
        rule.add_royalty_base(2);
        let third = rule.add_royalty_base(3);
        assert_eq!(third.display_name, "RB03");
    }

    #[test]
    fn test_remove_base_clears_references() {
        let mut rule = Rule::template(1, 1);
        rule.royalty_rate.proportional_rb = "RB01".into();
        rule.royalty_rate.step_structure.x_axis = "RB01".into();
        rule.royalty_rate.custom_inputs = vec![input(InputKind::Rb, "", "RB01")];
        let removed = rule.remove_royalty_base(1).unwrap();
        assert_eq!(removed.display_name, "RB01");
        assert!(rule.royalty_rate.proportional_rb.is_empty());
        assert!(rule.royalty_rate.step_structure.x_axis.is_empty());
        assert!(rule.royalty_rate.custom_inputs[0].rb.is_empty());
        assert!(rule.remove_royalty_base(1).is_none());
    }

    #[test]
    fn test_rename_base_follows_references() {
        let mut rule = Rule::template(1, 1);
        rule.royalty_rate.proportional_rb = "RB01".into();
        assert!(rule.rename_royalty_base(1, "Units"));
        assert_eq!(rule.royalty_rate.proportional_rb, "Units");
        assert!(!rule.rename_royalty_base(99, "x"));
    }

    #[test]
    fn test_clean_dangling_keeps_time_axis() {
        let mut rule = Rule::template(1, 1);
        rule.royalty_rate.step_structure.x_axis = TIME_AXIS.into();
        rule.royalty_rate.proportional_rb = "RB09".into();
        rule.clean_dangling_references();
        assert_eq!(rule.royalty_rate.step_structure.x_axis, TIME_AXIS);
        assert!(rule.royalty_rate.proportional_rb.is_empty());
    }

    #[test]
    fn test_dangling_references_reported() {
        let mut rule = Rule::template(1, 1);
        rule.royalty_rate.kind = RateKind::Proportional;
        rule.royalty_rate.proportional_rb = "RB02".into();
        assert_eq!(rule.dangling_references(), vec!["RB02".to_string()]);
    }

    #[test]
    fn test_summaries() {
        let mut r = rate(RateKind::Lumpsum);
        r.lumpsum_value = "10.0".into();
        assert_eq!(r.summary(), "Lumpsum: $10.0 (Fixed amount)");

        let r = rate(RateKind::Proportional);
        assert_eq!(r.summary(), "Proportional: $0 × RB (Multiply by Royalty Base)");

        let r = rate(RateKind::Custom);
        assert_eq!(r.summary(), "Custom: sum function (No inputs configured)");

        let mut r = rate(RateKind::Custom);
        r.custom_inputs = vec![
            input(InputKind::Constant, "5", ""),
            input(InputKind::Rb, "", "RB01"),
        ];
        assert_eq!(r.summary(), "Custom: sum(const(5) + RB(RB01)) (2 inputs)");
    }

    #[test]
    fn test_evaluate_lumpsum_clamped() {
        let mut r = rate(RateKind::Lumpsum);
        r.lumpsum_value = "150".into();
        r.max = "100".into();
        assert_eq!(r.evaluate(&BTreeMap::new()).unwrap(), 100.0);
    }

    #[test]
    fn test_evaluate_proportional() {
        let mut r = rate(RateKind::Proportional);
        r.proportional_value = "0.5".into();
        r.proportional_rb = "RB01".into();
        assert_eq!(r.evaluate(&bases(&[("RB01", 40.0)])).unwrap(), 20.0);
        assert!(r.evaluate(&BTreeMap::new()).is_err());
    }

    #[test]
    fn test_evaluate_custom_tree() {
        let mut r = rate(RateKind::Custom);
        r.custom_func = "sum".into();
        let nested = CustomInput {
            kind: InputKind::Func,
            func: "multiply".into(),
            inputs: vec![
                input(InputKind::Constant, "2", ""),
                input(InputKind::Rb, "", "RB01"),
            ],
            ..CustomInput::default()
        };
        r.custom_inputs = vec![input(InputKind::Constant, "1", ""), nested];
        assert_eq!(r.evaluate(&bases(&[("RB01", 3.0)])).unwrap(), 7.0);
    }

    #[test]
    fn test_evaluate_divide_by_zero() {
        let mut r = rate(RateKind::Custom);
        r.custom_func = "divide".into();
        r.custom_inputs = vec![
            input(InputKind::Constant, "1", ""),
            input(InputKind::Constant, "0", ""),
        ];
        let err = r.evaluate(&BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }

    #[test]
    fn test_step_function_lookup() {
        let s = StepStructure {
            x_axis: "RB01".into(),
            steps: vec![
                StepPoint { id: 2, x: 100.0, y: 5.0 },
                StepPoint { id: 1, x: 10.0, y: 1.0 },
            ],
            infinite_value: "9".into(),
        };
        assert_eq!(s.value_at(5.0).unwrap(), 0.0);
        assert_eq!(s.value_at(10.0).unwrap(), 1.0);
        assert_eq!(s.value_at(99.0).unwrap(), 1.0);
        assert_eq!(s.value_at(100.0).unwrap(), 5.0);
        assert_eq!(s.value_at(101.0).unwrap(), 9.0);
    }

    #[test]
    fn test_parse_duration() {
        let d = LicenseDuration::parse("5Y 10M 2D").unwrap();
        assert_eq!(d, LicenseDuration { years: 5, months: 10, days: 2 });
        assert_eq!(d.to_string(), "5Y 10M 2D");
        assert_eq!(LicenseDuration::parse("1Y").unwrap().approx_days(), 365);
        assert!(LicenseDuration::parse("forever").is_err());
    }

    #[test]
    fn test_policy_dependencies_deduplicated() {
        let mut a = Rule::template(1, 1);
        a.royalty_base[0].oracle_address = "0x1234567890123456789012345678901234567890".into();
        let mut b = Rule::template(2, 2);
        b.royalty_base[0].oracle_address = "0x1234567890123456789012345678901234567890".into();
        b.add_royalty_base(3);
        b.royalty_base[1].oracle_address = "0x2345678901234567890123456789012345678901".into();

        let deps = policy_dependencies(&[a, b], |addr| addr.starts_with("0x1"));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].rule_id, 1);
    }

    #[test]
    fn test_is_valid_address() {
        assert!(is_valid_address(crate::ZERO_ADDRESS));
        assert!(!is_valid_address("0x123..."));
        assert!(!is_valid_address("0xGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG"));
    }
}
