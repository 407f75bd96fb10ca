#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **toka-taxonomy** – Static taxonomy tables (C1).
//!
//! Ships `rule_mapping` (tool-native rule id -> weakness class + external
//! identifiers) and `weakness_defaults` (weakness class -> default severity,
//! base score, remediation/title templates) as embedded YAML, loaded once
//! at `TaxonomyTables::load_default()`. The core never mutates these tables
//! after load (§4.5, §9 "Taxonomy data").
//!
//! Missing entries degrade gracefully: an unmapped `(tool, rule)` pair
//! yields [`WeaknessClass::Other`] plus a `tracing::warn!` the caller can
//! surface in observability outputs, never a hard failure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use toka_types::{Severity, WeaknessClass};

const DEFAULT_RULE_MAPPING_YAML: &str = include_str!("data/rule_mapping.yaml");
const DEFAULT_WEAKNESS_DEFAULTS_YAML: &str = include_str!("data/weakness_defaults.yaml");

/// Errors loading or parsing taxonomy data.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// The YAML document could not be parsed.
    #[error("failed to parse taxonomy YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// One `rule_mapping` row before weakness-tag resolution (raw YAML shape).
#[derive(Debug, Clone, Deserialize, Serialize)]
struct RuleMappingRow {
    key: String,
    weakness: String,
    severity: Option<String>,
    weakness_enum: Option<String>,
    swc: Option<String>,
    #[serde(default)]
    frameworks: Vec<String>,
    remediation_template_key: String,
}

/// One `weakness_defaults` row before weakness-tag resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct WeaknessDefaultRow {
    weakness: String,
    default_severity: String,
    base_score: f64,
    title_template: String,
    remediation_template: String,
}

/// Resolved entry for a single `(tool, native rule id)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMapping {
    /// Canonical weakness class.
    pub weakness: WeaknessClass,
    /// Severity override, when the taxonomy pins one for this rule.
    pub severity: Option<Severity>,
    /// Weakness-enumeration identifier.
    pub weakness_enum: Option<String>,
    /// Standard-weakness-classification identifier.
    pub swc: Option<String>,
    /// External compliance-framework control IDs.
    pub frameworks: Vec<String>,
    /// Key into `weakness_defaults`' remediation template, when the tool
    /// itself supplies no remediation text.
    pub remediation_template_key: String,
}

/// Resolved defaults for one weakness class.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaknessDefaults {
    /// Severity used when no per-rule override exists.
    pub default_severity: Severity,
    /// Base CVSS-scale score before per-tool adjustment.
    pub base_score: f64,
    /// `{function}`-templated title.
    pub title_template: String,
    /// Remediation guidance text.
    pub remediation_template: String,
}

/// The static taxonomy: `rule_mapping`, `weakness_defaults`, and the
/// severity-bucket function (the latter lives on `toka_types::Severity`
/// itself since it has no configurable state, per §4.7).
#[derive(Debug, Clone)]
pub struct TaxonomyTables {
    rule_mapping: HashMap<(String, String), RuleMapping>,
    weakness_defaults: HashMap<WeaknessClass, WeaknessDefaults>,
}

impl TaxonomyTables {
    /// Load the taxonomy shipped with this build.
    pub fn load_default() -> Result<Self, TaxonomyError> {
        Self::from_yaml(DEFAULT_RULE_MAPPING_YAML, DEFAULT_WEAKNESS_DEFAULTS_YAML)
    }

    /// Parse taxonomy tables from caller-supplied YAML documents, e.g. a
    /// vendored or extended ruleset (§10.3 "Configuration").
    pub fn from_yaml(rule_mapping_yaml: &str, weakness_defaults_yaml: &str) -> Result<Self, TaxonomyError> {
        let rule_rows: Vec<RuleMappingRow> = serde_yaml::from_str(rule_mapping_yaml)?;
        let default_rows: Vec<WeaknessDefaultRow> = serde_yaml::from_str(weakness_defaults_yaml)?;

        let mut rule_mapping = HashMap::with_capacity(rule_rows.len());
        for row in rule_rows {
            let Some((tool, rule)) = row.key.split_once("::") else {
                warn!(key = %row.key, "malformed rule_mapping key, skipping");
                continue;
            };
            let Some(weakness) = parse_weakness(&row.weakness) else {
                warn!(weakness = %row.weakness, key = %row.key, "unknown weakness tag in rule_mapping, skipping");
                continue;
            };
            let severity = row.severity.as_deref().and_then(parse_severity);
            rule_mapping.insert(
                (tool.to_string(), rule.to_string()),
                RuleMapping {
                    weakness,
                    severity,
                    weakness_enum: row.weakness_enum,
                    swc: row.swc,
                    frameworks: row.frameworks,
                    remediation_template_key: row.remediation_template_key,
                },
            );
        }

        let mut weakness_defaults = HashMap::with_capacity(default_rows.len());
        for row in default_rows {
            let Some(weakness) = parse_weakness(&row.weakness) else {
                warn!(weakness = %row.weakness, "unknown weakness tag in weakness_defaults, skipping");
                continue;
            };
            let Some(default_severity) = parse_severity(&row.default_severity) else {
                warn!(severity = %row.default_severity, "unknown severity tag in weakness_defaults, skipping");
                continue;
            };
            weakness_defaults.insert(
                weakness,
                WeaknessDefaults {
                    default_severity,
                    base_score: row.base_score,
                    title_template: row.title_template,
                    remediation_template: row.remediation_template,
                },
            );
        }

        Ok(Self { rule_mapping, weakness_defaults })
    }

    /// Look up `(tool, native rule id)`. Returns `None` on a miss; callers
    /// assign [`WeaknessClass::Other`] and log the unmapped pair (§4.4 step 2).
    pub fn lookup_rule(&self, tool: &str, native_rule_id: &str) -> Option<&RuleMapping> {
        self.rule_mapping.get(&(tool.to_string(), native_rule_id.to_string()))
    }

    /// Look up defaults for a weakness class. Always present for the
    /// built-in classes including `OTHER`; a caller-supplied table that
    /// omits a class falls back to `OTHER`'s defaults.
    pub fn weakness_defaults(&self, weakness: WeaknessClass) -> &WeaknessDefaults {
        self.weakness_defaults
            .get(&weakness)
            .or_else(|| self.weakness_defaults.get(&WeaknessClass::Other))
            .expect("weakness_defaults must contain at least an OTHER entry")
    }

    /// Number of loaded rule-mapping entries, for diagnostics/tests.
    pub fn rule_count(&self) -> usize {
        self.rule_mapping.len()
    }
}

fn parse_weakness(tag: &str) -> Option<WeaknessClass> {
    match tag {
        "REENTRANCY" => Some(WeaknessClass::Reentrancy),
        "INTEGER_OVERFLOW" => Some(WeaknessClass::IntegerOverflow),
        "ACCESS_CONTROL" => Some(WeaknessClass::AccessControl),
        "TX_ORIGIN" => Some(WeaknessClass::TxOrigin),
        "UNCHECKED_CALL" => Some(WeaknessClass::UncheckedCall),
        "TIMESTAMP_DEP" => Some(WeaknessClass::TimestampDep),
        "DELEGATECALL_UNTRUSTED" => Some(WeaknessClass::DelegatecallUntrusted),
        "DOS_LOCK" => Some(WeaknessClass::DosLock),
        "WEAK_PRNG" => Some(WeaknessClass::WeakPrng),
        "OTHER" => Some(WeaknessClass::Other),
        _ => None,
    }
}

fn parse_severity(tag: &str) -> Option<Severity> {
    match tag {
        "CRITICAL" => Some(Severity::Critical),
        "HIGH" => Some(Severity::High),
        "MEDIUM" => Some(Severity::Medium),
        "LOW" => Some(Severity::Low),
        "INFORMATIONAL" => Some(Severity::Informational),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_default_tables() {
        let tables = TaxonomyTables::load_default().expect("default taxonomy must parse");
        assert!(tables.rule_count() > 0);
    }

    #[test]
    fn known_rule_resolves_to_weakness() {
        let tables = TaxonomyTables::load_default().unwrap();
        let mapping = tables.lookup_rule("sol-static", "reentrancy-eth").expect("seeded rule");
        assert_eq!(mapping.weakness, WeaknessClass::Reentrancy);
        assert_eq!(mapping.swc.as_deref(), Some("SWC-107"));
    }

    #[test]
    fn unknown_rule_is_a_clean_miss() {
        let tables = TaxonomyTables::load_default().unwrap();
        assert!(tables.lookup_rule("nonexistent-tool", "nonexistent-rule").is_none());
    }

    #[test]
    fn every_weakness_class_has_defaults() {
        let tables = TaxonomyTables::load_default().unwrap();
        for weakness in [
            WeaknessClass::Reentrancy,
            WeaknessClass::IntegerOverflow,
            WeaknessClass::AccessControl,
            WeaknessClass::TxOrigin,
            WeaknessClass::UncheckedCall,
            WeaknessClass::TimestampDep,
            WeaknessClass::DelegatecallUntrusted,
            WeaknessClass::DosLock,
            WeaknessClass::WeakPrng,
            WeaknessClass::Other,
        ] {
            let defaults = tables.weakness_defaults(weakness);
            assert!(defaults.base_score >= 0.0 && defaults.base_score <= 10.0);
        }
    }

    #[test]
    fn malformed_yaml_is_a_parse_error_not_a_panic() {
        let result = TaxonomyTables::from_yaml("not: [valid", DEFAULT_WEAKNESS_DEFAULTS_YAML);
        assert!(matches!(result, Err(TaxonomyError::Parse(_))));
    }
}
