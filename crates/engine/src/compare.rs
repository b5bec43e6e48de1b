use crate::model::{FieldVerdict, Verdict};

/// Marker shown when a field is empty on both sides, and recognized as "no
/// output" by the statistics.
pub const NOT_AVAILABLE: &str = "N/A";

/// Compare one field's extracted value to one expected value.
///
/// Comparison is exact-string after whitespace trimming; rules are evaluated
/// in order, first match wins. The type field is validated against the
/// configured literal, not the answer sheet.
pub fn compare_field(
    actual: &str,
    expected: &str,
    is_type_field: bool,
    type_value: &str,
) -> FieldVerdict {
    let actual = actual.trim();
    let expected = expected.trim();

    // Nothing to extract, nothing expected.
    if actual.is_empty() && expected.is_empty() {
        return FieldVerdict {
            matched: true,
            display: NOT_AVAILABLE.into(),
            result: Verdict::Pass,
        };
    }

    if is_type_field && actual == type_value {
        return FieldVerdict {
            matched: true,
            display: actual.into(),
            result: Verdict::Pass,
        };
    }

    if actual.is_empty() {
        return FieldVerdict {
            matched: false,
            display: format!("{NOT_AVAILABLE}({expected})"),
            result: Verdict::Fail,
        };
    }

    if actual == expected {
        return FieldVerdict {
            matched: true,
            display: actual.into(),
            result: Verdict::Pass,
        };
    }

    let display = if is_type_field {
        actual.to_string()
    } else {
        format!("{actual}({expected})")
    };
    FieldVerdict {
        matched: false,
        display,
        result: Verdict::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_equivalence() {
        let v = compare_field("", "", false, "X");
        assert!(v.matched);
        assert_eq!(v.display, "N/A");
        assert_eq!(v.result, Verdict::Pass);
    }

    #[test]
    fn type_field_authority_beats_answer_sheet() {
        // Ground truth says something else, but the recognized type matches
        // the configured literal.
        let v = compare_field("WORK_PERMIT", "PERMIT", true, "WORK_PERMIT");
        assert!(v.matched);
        assert_eq!(v.display, "WORK_PERMIT");
        assert_eq!(v.result, Verdict::Pass);
    }

    #[test]
    fn missing_value_shows_expected() {
        let v = compare_field("", "AB123", false, "X");
        assert!(!v.matched);
        assert_eq!(v.display, "N/A(AB123)");
        assert_eq!(v.result, Verdict::Fail);
    }

    #[test]
    fn trimmed_equality_passes() {
        let v = compare_field("  AB123 ", "AB123", false, "X");
        assert!(v.matched);
        assert_eq!(v.display, "AB123");
    }

    #[test]
    fn mismatch_shows_both_values() {
        let v = compare_field("AB124", "AB123", false, "X");
        assert!(!v.matched);
        assert_eq!(v.display, "AB124(AB123)");
        assert_eq!(v.result, Verdict::Fail);
    }

    #[test]
    fn type_field_mismatch_keeps_bare_actual() {
        let v = compare_field("HEALTH_REPORT", "WORK_PERMIT", true, "WORK_PERMIT");
        assert!(!v.matched);
        assert_eq!(v.display, "HEALTH_REPORT");
        assert_eq!(v.result, Verdict::Fail);
    }

    #[test]
    fn empty_type_field_with_expected_fails_as_missing() {
        let v = compare_field("", "WORK_PERMIT", true, "WORK_PERMIT");
        assert_eq!(v.display, "N/A(WORK_PERMIT)");
        assert_eq!(v.result, Verdict::Fail);
    }
}
