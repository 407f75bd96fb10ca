//! Group construction: turns a flat finding list into one representative
//! per correlation group (§4.6).

use toka_types::{DetectionSource, NormalizedFinding};

use crate::similarity::are_similar;
use crate::union_find::UnionFind;

/// Partition `findings` under the similarity relation and collapse each
/// partition into one representative finding.
///
/// Input order does not affect the result: representatives are rebuilt
/// from scratch from each group's members, and group order in the
/// returned vector follows the lowest member index in `findings`, which is
/// itself stable only insofar as the caller's input order is (§8
/// "Determinism" — a re-run on the same raw findings produces the same
/// groups and the same representative per group).
pub fn group_findings(findings: Vec<NormalizedFinding>) -> Vec<NormalizedFinding> {
    if findings.is_empty() {
        return Vec::new();
    }

    let mut uf = UnionFind::new(findings.len());
    for i in 0..findings.len() {
        for j in (i + 1)..findings.len() {
            if are_similar(&findings[i], &findings[j]) {
                uf.union(i, j);
            }
        }
    }

    uf.groups()
        .into_iter()
        .map(|indices| {
            let members: Vec<&NormalizedFinding> = indices.iter().map(|&i| &findings[i]).collect();
            build_representative(&members)
        })
        .collect()
}

fn build_representative(members: &[&NormalizedFinding]) -> NormalizedFinding {
    debug_assert!(!members.is_empty());

    if members.len() == 1 {
        let mut only = members[0].clone();
        only.correlation_group = only.id.clone();
        return only;
    }

    let group_id = members.iter().map(|m| m.id.as_str()).min().expect("non-empty group").to_string();

    let mut detected_by: Vec<DetectionSource> = members.iter().flat_map(|m| m.detected_by.clone()).collect();
    detected_by.sort();
    detected_by.dedup();

    let severity = members.iter().map(|m| m.severity).max().expect("non-empty group");
    let score = members.iter().map(|m| m.score).fold(f64::MIN, f64::max);

    let confidence = combine_confidence(members.iter().map(|m| m.confidence));

    let location_idx = (0..members.len())
        .max_by(|&i, &j| {
            let (a, b) = (&members[i].location, &members[j].location);
            a.specificity()
                .cmp(&b.specificity())
                .then_with(|| b.line.unwrap_or(u32::MAX).cmp(&a.line.unwrap_or(u32::MAX)))
        })
        .expect("non-empty group");
    let location = members[location_idx].location.clone();

    let primary_idx = (0..members.len()).max_by_key(|&i| members[i].severity).expect("non-empty group");
    let primary = members[primary_idx];

    let mut description = primary.description.clone();
    for (i, other) in members.iter().enumerate() {
        if i == primary_idx {
            continue;
        }
        description.push_str(&format!("\n\nAlso reported by {}: {}", source_list(&other.detected_by), other.description));
    }

    let external_ids = primary.external_ids.clone();

    NormalizedFinding {
        id: group_id.clone(),
        detected_by,
        weakness: primary.weakness,
        severity,
        confidence,
        score,
        location,
        title: primary.title.clone(),
        description,
        remediation: primary.remediation.clone(),
        external_ids,
        correlation_group: group_id,
        llm_assessment: None,
    }
}

/// Independent-evidence confidence combination: `1 - prod(1 - c_i)`,
/// capped at 1.0 against floating-point overshoot.
fn combine_confidence(confidences: impl Iterator<Item = f64>) -> f64 {
    let product_of_complements: f64 = confidences.map(|c| 1.0 - c.clamp(0.0, 1.0)).product();
    (1.0 - product_of_complements).min(1.0)
}

fn source_list(sources: &[DetectionSource]) -> String {
    sources.iter().map(|s| s.tool.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use toka_types::{CanonicalLocation, ExternalIds, Severity, WeaknessClass};

    fn finding(id: &str, tool: &str, rule: &str, severity: Severity, score: f64, confidence: f64, line: u32) -> NormalizedFinding {
        NormalizedFinding {
            id: id.into(),
            detected_by: vec![DetectionSource { tool: tool.into(), rule: rule.into() }],
            weakness: WeaknessClass::Reentrancy,
            severity,
            confidence,
            score,
            location: CanonicalLocation { file: Some("a.sol".into()), line: Some(line), ..Default::default() },
            title: format!("{tool} finding"),
            description: format!("{tool} says so"),
            remediation: "fix it".into(),
            external_ids: ExternalIds::default(),
            correlation_group: id.into(),
            llm_assessment: None,
        }
    }

    #[test]
    fn singleton_group_passes_through_unchanged_except_correlation_group() {
        let f = finding("zzz", "sol-static", "reentrancy", Severity::High, 8.0, 0.6, 10);
        let grouped = group_findings(vec![f.clone()]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].id, "zzz");
        assert_eq!(grouped[0].correlation_group, "zzz");
    }

    #[test]
    fn two_findings_from_different_tools_merge_into_one_representative() {
        let a = finding("b-id", "sol-static", "reentrancy", Severity::Medium, 5.0, 0.4, 10);
        let b = finding("a-id", "sol-symbolic", "reentrancy-check", Severity::High, 8.0, 0.6, 12);

        let grouped = group_findings(vec![a, b]);
        assert_eq!(grouped.len(), 1);

        let rep = &grouped[0];
        assert_eq!(rep.id, "a-id", "representative id is the lexicographic minimum of the group");
        assert_eq!(rep.correlation_group, "a-id");
        assert_eq!(rep.detected_by.len(), 2);
        assert_eq!(rep.detected_by[0].tool, "sol-static", "sources are sorted by tool name");
        assert_eq!(rep.severity, Severity::High, "severity is the max across members");
        assert_eq!(rep.score, 8.0, "score is the max across members");

        let expected_confidence = 1.0 - (1.0 - 0.4) * (1.0 - 0.6);
        assert!((rep.confidence - expected_confidence).abs() < 1e-9);

        assert!(rep.description.contains("sol-symbolic says so") || rep.description.contains("sol-static says so"));
    }

    #[test]
    fn confidence_combination_is_capped_at_one() {
        let combined = combine_confidence(vec![0.95, 0.9, 0.9].into_iter());
        assert!(combined <= 1.0);
    }

    #[test]
    fn location_choice_prefers_the_more_specific_member() {
        let mut a = finding("a", "t1", "r1", Severity::Low, 1.0, 0.2, 50);
        a.location.function = Some("withdraw".into());
        let b = finding("b", "t2", "r2", Severity::Low, 1.0, 0.2, 48);

        let grouped = group_findings(vec![a, b]);
        assert_eq!(grouped.len(), 1, "same file, close lines, same weakness -> grouped");
        assert_eq!(grouped[0].location.function.as_deref(), Some("withdraw"));
    }

    #[test]
    fn location_choice_breaks_specificity_ties_by_lowest_line() {
        let a = finding("a", "t1", "r1", Severity::Low, 1.0, 0.2, 50);
        let b = finding("b", "t2", "r2", Severity::Low, 1.0, 0.2, 48);

        let grouped = group_findings(vec![a, b]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].location.line, Some(48), "equal specificity, lowest line wins");
    }

    #[test]
    fn unrelated_findings_are_not_merged() {
        let a = finding("a", "t1", "r1", Severity::Low, 1.0, 0.2, 10);
        let mut b = finding("b", "t2", "r2", Severity::Low, 1.0, 0.2, 500);
        b.location.file = Some("other.sol".into());

        let grouped = group_findings(vec![a, b]);
        assert_eq!(grouped.len(), 2);
    }
}
