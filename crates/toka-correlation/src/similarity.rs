//! Pairwise similarity rule for findings (§4.6).
//!
//! Two findings are considered the same underlying issue when all of the
//! following hold:
//! * same weakness class;
//! * same canonical contract identifier when both report one, else same
//!   file path;
//! * same normalized function identifier when both report one;
//! * line-number distance <= 5, or one location's byte span contains the
//!   other's.

use toka_types::NormalizedFinding;

const MAX_LINE_DISTANCE: u32 = 5;

/// True when `a` and `b` should be grouped into the same correlation group.
pub fn are_similar(a: &NormalizedFinding, b: &NormalizedFinding) -> bool {
    if a.weakness != b.weakness {
        return false;
    }

    if !same_contract_or_file(a, b) {
        return false;
    }

    if let (Some(fa), Some(fb)) = (&a.location.function, &b.location.function) {
        if fa != fb {
            return false;
        }
    }

    let close_lines = a.location.line_distance(&b.location).map(|d| d <= MAX_LINE_DISTANCE).unwrap_or(false);
    let overlapping_spans = a.location.byte_span_contains(&b.location);

    close_lines || overlapping_spans
}

fn same_contract_or_file(a: &NormalizedFinding, b: &NormalizedFinding) -> bool {
    match (&a.location.contract, &b.location.contract) {
        (Some(ca), Some(cb)) => ca == cb,
        _ => a.location.file == b.location.file,
    }
}
