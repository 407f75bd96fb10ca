//! Canonical finding schema (§3 "Normalized Finding") and weakness/severity
//! taxonomy tags.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;

use crate::location::CanonicalLocation;

/// Canonical, tool-independent vulnerability-class tag assigned by the
/// Normalizer (§3, §4.4 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaknessClass {
    /// External call before state update.
    Reentrancy,
    /// Unchecked arithmetic overflow/underflow.
    IntegerOverflow,
    /// Missing or insufficient access control on a sensitive function.
    AccessControl,
    /// Use of `tx.origin` for authorization.
    TxOrigin,
    /// Return value of an external call is not checked.
    UncheckedCall,
    /// Control flow depends on block timestamp.
    TimestampDep,
    /// `delegatecall` to an untrusted or caller-controlled address.
    DelegatecallUntrusted,
    /// Denial of service via a lock that can be held indefinitely.
    DosLock,
    /// Use of a weak/predictable pseudo-random number source.
    WeakPrng,
    /// No taxonomy entry matched; the native rule id is retained for
    /// observability by the Normalizer (§4.5).
    Other,
}

impl WeaknessClass {
    /// Stable lowercase-with-dashes tag, used as a taxonomy key and in
    /// summary counters.
    pub fn as_tag(self) -> &'static str {
        match self {
            WeaknessClass::Reentrancy => "REENTRANCY",
            WeaknessClass::IntegerOverflow => "INTEGER_OVERFLOW",
            WeaknessClass::AccessControl => "ACCESS_CONTROL",
            WeaknessClass::TxOrigin => "TX_ORIGIN",
            WeaknessClass::UncheckedCall => "UNCHECKED_CALL",
            WeaknessClass::TimestampDep => "TIMESTAMP_DEP",
            WeaknessClass::DelegatecallUntrusted => "DELEGATECALL_UNTRUSTED",
            WeaknessClass::DosLock => "DOS_LOCK",
            WeaknessClass::WeakPrng => "WEAK_PRNG",
            WeaknessClass::Other => "OTHER",
        }
    }
}

/// Severity rating (§3, §4.7 severity buckets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// 0.0 score.
    Informational,
    /// 0.1–3.9.
    Low,
    /// 4.0–6.9.
    Medium,
    /// 7.0–8.9.
    High,
    /// 9.0–10.0.
    Critical,
}

impl Severity {
    fn rank(self) -> u8 {
        match self {
            Severity::Informational => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    /// Bucket a CVSS-scale score into its severity per §4.7.
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else if score > 0.0 {
            Severity::Low
        } else {
            Severity::Informational
        }
    }

    /// Wire/display tag (`CRITICAL`, `HIGH`, ...).
    pub fn as_tag(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Informational => "INFORMATIONAL",
        }
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// A `(tool name, native rule id)` attribution pair (§3 "detection source").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DetectionSource {
    /// Name of the tool that raised this finding.
    pub tool: String,
    /// The tool's own rule identifier.
    pub rule: String,
}

/// External identifier mappings attached by the Taxonomy (§3, §4.5).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalIds {
    /// Weakness-enumeration identifier (e.g. a CWE-style id).
    pub weakness_enum: Option<String>,
    /// Standard-weakness-classification identifier (e.g. an SWC-style id).
    pub swc: Option<String>,
    /// Zero or more external compliance-framework control IDs.
    #[serde(default)]
    pub frameworks: Vec<String>,
}

/// Structured verdict returned by the optional LLM collaborator (§4.6, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmAssessment {
    /// Whether the collaborator judged the finding a true positive.
    pub is_true_positive: bool,
    /// Collaborator-reported confidence, 0.0–1.0.
    pub confidence: f64,
    /// Free-text justification, recorded verbatim for auditability.
    pub reasoning: String,
    /// Suggested remediation priority, 1 (most urgent) to 5.
    pub suggested_priority: u8,
}

/// A finding normalized to the shared schema (§3 "Normalized Finding").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedFinding {
    /// Content-hash identifier, stable across re-runs on identical inputs.
    pub id: String,
    /// One or more `(tool, rule)` pairs that produced this finding.
    pub detected_by: Vec<DetectionSource>,
    /// Canonical weakness tag.
    pub weakness: WeaknessClass,
    /// Severity rating.
    pub severity: Severity,
    /// Confidence, 0.0–1.0.
    pub confidence: f64,
    /// CVSS-scale score, 0.0–10.0.
    pub score: f64,
    /// Canonical location.
    pub location: CanonicalLocation,
    /// Short title.
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// Remediation guidance.
    pub remediation: String,
    /// Mapped external identifiers.
    pub external_ids: ExternalIds,
    /// Correlation-group identifier; equals `id` for singleton groups.
    pub correlation_group: String,
    /// Optional LLM verdict, present only when the collaborator was
    /// consulted and did not fail.
    pub llm_assessment: Option<LlmAssessment>,
}

impl NormalizedFinding {
    /// Every detection-source pair must be unique within a finding (§3
    /// invariant); returns the duplicate, if any.
    pub fn duplicate_detection_source(&self) -> Option<&DetectionSource> {
        for (i, a) in self.detected_by.iter().enumerate() {
            if self.detected_by[..i].contains(a) {
                return Some(a);
            }
        }
        None
    }

    /// True when `severity` agrees with the bucket containing `score`
    /// (§3 invariant, §4.7, §8 "Severity consistency").
    pub fn severity_consistent(&self) -> bool {
        Severity::from_score(self.score) == self.severity
    }
}

/// Mint the stable identifier for a finding: a pure function of
/// `(originating tool, native rule id, canonical location)` (§3, §4.6).
///
/// Regenerating the pipeline on the same inputs always yields the same id
/// (§8 "Determinism").
pub fn mint_finding_id(tool: &str, rule: &str, location: &CanonicalLocation) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tool.as_bytes());
    hasher.update(b"\0");
    hasher.update(rule.as_bytes());
    hasher.update(b"\0");
    hasher.update(location.file.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"\0");
    hasher.update(location.line.map(|l| l.to_string()).unwrap_or_default().as_bytes());
    hasher.update(b"\0");
    hasher.update(location.column.map(|c| c.to_string()).unwrap_or_default().as_bytes());
    hasher.update(b"\0");
    hasher.update(location.function.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"\0");
    hasher.update(location.contract.as_deref().unwrap_or("").as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_from_score_matches_buckets() {
        assert_eq!(Severity::from_score(9.5), Severity::Critical);
        assert_eq!(Severity::from_score(7.0), Severity::High);
        assert_eq!(Severity::from_score(8.9), Severity::High);
        assert_eq!(Severity::from_score(4.0), Severity::Medium);
        assert_eq!(Severity::from_score(3.9), Severity::Low);
        assert_eq!(Severity::from_score(0.1), Severity::Low);
        assert_eq!(Severity::from_score(0.0), Severity::Informational);
    }

    #[test]
    fn severity_orders_critical_highest() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Informational);
    }

    #[test]
    fn mint_finding_id_is_pure() {
        let loc = CanonicalLocation {
            file: Some("contracts/Vault.sol".into()),
            line: Some(42),
            ..Default::default()
        };
        let a = mint_finding_id("slither", "reentrancy-eth", &loc);
        let b = mint_finding_id("slither", "reentrancy-eth", &loc);
        assert_eq!(a, b);

        let other_loc = CanonicalLocation { line: Some(43), ..loc.clone() };
        let c = mint_finding_id("slither", "reentrancy-eth", &other_loc);
        assert_ne!(a, c);
    }
}
