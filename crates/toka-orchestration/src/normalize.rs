//! The Normalizer (C6, §4.4): Raw Finding Envelopes -> Normalized Findings.
//!
//! Pure and restartable: given the same envelopes and the same taxonomy it
//! always yields the same findings (§4.4 "The Normalizer is pure and
//! restartable").

use tracing::debug;

use toka_taxonomy::TaxonomyTables;
use toka_types::{
    mint_finding_id, CanonicalLocation, ContractInput, DetectionSource, ExternalIds,
    NormalizedFinding, RawFindingEnvelope, RawRecord, Severity,
};

/// Counters over one Normalizer pass, surfaced for observability rather
/// than as metrics-exporter output (§11 supplemental feature).
#[derive(Debug, Clone, Default)]
pub struct NormalizeStats {
    /// Records whose `(tool, native rule id)` had no taxonomy entry.
    pub unmapped_rules: usize,
    /// Total records normalized.
    pub total: usize,
}

/// Normalize every record across every envelope into the shared schema.
pub fn normalize_envelopes(envelopes: &[RawFindingEnvelope], input: &ContractInput, taxonomy: &TaxonomyTables) -> (Vec<NormalizedFinding>, NormalizeStats) {
    let mut findings = Vec::new();
    let mut stats = NormalizeStats::default();

    for envelope in envelopes {
        for record in &envelope.records {
            stats.total += 1;
            let (finding, unmapped) = normalize_record(&envelope.tool, record, input, taxonomy);
            if unmapped {
                stats.unmapped_rules += 1;
            }
            findings.push(finding);
        }
    }

    (findings, stats)
}

fn normalize_record(tool: &str, record: &RawRecord, input: &ContractInput, taxonomy: &TaxonomyTables) -> (NormalizedFinding, bool) {
    let location = canonicalize_location(&record.location, input);

    let mapping = taxonomy.lookup_rule(tool, &record.native_rule_id);
    let unmapped = mapping.is_none();
    if unmapped {
        debug!(tool = %tool, rule = %record.native_rule_id, "unmapped taxonomy rule, classifying as OTHER");
    }
    let weakness = mapping.map(|m| m.weakness).unwrap_or(toka_types::WeaknessClass::Other);
    let defaults = taxonomy.weakness_defaults(weakness);

    let score = resolve_score(record.severity.as_deref(), mapping.and_then(|m| m.severity), defaults.base_score);
    let severity = Severity::from_score(score);

    let id = mint_finding_id(tool, &record.native_rule_id, &location);

    let external_ids = mapping
        .map(|m| ExternalIds { weakness_enum: m.weakness_enum.clone(), swc: m.swc.clone(), frameworks: m.frameworks.clone() })
        .unwrap_or_default();

    let title = render_template(&defaults.title_template, location.function.as_deref());
    let description = if record.message.trim().is_empty() { title.clone() } else { record.message.clone() };
    let remediation = defaults.remediation_template.clone();

    let finding = NormalizedFinding {
        id: id.clone(),
        detected_by: vec![DetectionSource { tool: tool.to_string(), rule: record.native_rule_id.clone() }],
        weakness,
        severity,
        confidence: default_confidence(tool),
        score,
        location,
        title,
        description,
        remediation,
        external_ids,
        correlation_group: id,
        llm_assessment: None,
    };

    (finding, unmapped)
}

/// Step 1: resolve `file` to a project-relative path when the project root
/// is known, retain nulls, trim trailing whitespace from `function`.
fn canonicalize_location(raw: &CanonicalLocation, input: &ContractInput) -> CanonicalLocation {
    let file = raw.file.as_ref().map(|f| relativize(f, input));
    let function = raw.function.as_ref().map(|f| f.trim_end().to_string());

    CanonicalLocation { file, function, ..raw.clone() }
}

fn relativize(file: &str, input: &ContractInput) -> String {
    let Some(root) = &input.project_root else {
        return file.to_string();
    };
    std::path::Path::new(file)
        .strip_prefix(root)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| file.to_string())
}

/// Step 3: if the tool reports a severity we recognize, honor it (scored at
/// the midpoint of its bucket); a taxonomy rule-level override takes the
/// same path; otherwise fall back to the weakness class's base score.
/// Deriving the final `Severity` from this score (not the other way
/// around) is what keeps severity/score consistent (§4.7, §8).
fn resolve_score(native_severity: Option<&str>, rule_override: Option<Severity>, base_score: f64) -> f64 {
    if let Some(raw) = native_severity {
        if let Some(parsed) = parse_native_severity(raw) {
            return bucket_midpoint(parsed);
        }
    }
    if let Some(severity) = rule_override {
        return bucket_midpoint(severity);
    }
    base_score
}

fn parse_native_severity(raw: &str) -> Option<Severity> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "critical" => Some(Severity::Critical),
        "high" => Some(Severity::High),
        "medium" | "warning" | "warn" => Some(Severity::Medium),
        "low" => Some(Severity::Low),
        "informational" | "info" | "note" => Some(Severity::Informational),
        other => other.parse::<f64>().ok().map(Severity::from_score),
    }
}

fn bucket_midpoint(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 9.5,
        Severity::High => 8.0,
        Severity::Medium => 5.5,
        Severity::Low => 2.0,
        Severity::Informational => 0.0,
    }
}

fn render_template(template: &str, function: Option<&str>) -> String {
    template.replace("{function}", function.unwrap_or("this function"))
}

/// Single-detector confidence before correlation combines multiple; the
/// LLM-backed reviewer reports its own judgement with less certainty than a
/// deterministic static rule, so it starts lower.
fn default_confidence(tool: &str) -> f64 {
    if tool == "sol-ai-review" {
        0.5
    } else {
        0.7
    }
}
