//! Location primitives shared by raw records and normalized findings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A location within a contract, as reported or as canonicalized.
///
/// Raw adapters populate whichever fields their native output carries;
/// the Normalizer (see `toka-orchestration::normalizer`) resolves `file`
/// to a project-relative path and trims `function` when both are known,
/// but does not invent missing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CanonicalLocation {
    /// File path, project-relative when the project root is known.
    pub file: Option<String>,
    /// 1-indexed line number.
    pub line: Option<u32>,
    /// 1-indexed column number.
    pub column: Option<u32>,
    /// Enclosing function identifier.
    pub function: Option<String>,
    /// Enclosing contract identifier.
    pub contract: Option<String>,
    /// Byte span `(start, end)` within the file, when the tool reports one.
    pub byte_span: Option<(u64, u64)>,
}

impl CanonicalLocation {
    /// Number of non-null location fields, used to pick the "most specific"
    /// member of a correlation group (§4.6).
    pub fn specificity(&self) -> usize {
        [
            self.file.is_some(),
            self.line.is_some(),
            self.column.is_some(),
            self.function.is_some(),
            self.contract.is_some(),
            self.byte_span.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    /// True if `self`'s byte span contains `other`'s, or vice versa.
    pub fn byte_span_contains(&self, other: &CanonicalLocation) -> bool {
        match (self.byte_span, other.byte_span) {
            (Some((a_start, a_end)), Some((b_start, b_end))) => {
                (a_start <= b_start && b_end <= a_end) || (b_start <= a_start && a_end <= b_end)
            }
            _ => false,
        }
    }

    /// Absolute distance between two line numbers, if both are known.
    pub fn line_distance(&self, other: &CanonicalLocation) -> Option<u32> {
        match (self.line, other.line) {
            (Some(a), Some(b)) => Some(a.abs_diff(b)),
            _ => None,
        }
    }
}

/// A single untyped record from an adapter's native output, before
/// taxonomy lookup or severity scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// The tool's own identifier for the rule/check that fired.
    pub native_rule_id: String,
    /// Tool-provided human-readable message, copied verbatim when present.
    pub message: String,
    /// Location as reported by the tool (not yet canonicalized).
    pub location: CanonicalLocation,
    /// Tool-native severity string, if the tool reports one (e.g. "High",
    /// "2", "warning"). Interpretation is tool-specific and handled by the
    /// Normalizer via the taxonomy's `rule_mapping`.
    pub severity: Option<String>,
    /// Any additional tool-specific fields, retained for observability.
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}
