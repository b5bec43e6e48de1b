use std::collections::BTreeMap;

use crate::compare::NOT_AVAILABLE;
use crate::model::{AnswerRow, DocStats, FieldStats, OutputRow, RunSummary, Verdict};
use crate::schema::DocTypeSchema;

#[derive(Default)]
struct FieldTally {
    total: usize,
    correct: usize,
    fail: usize,
    missing: usize,
    extra: usize,
}

/// Aggregate scored rows into per-row and per-field accuracy records plus a
/// run-level summary.
///
/// Ground truth for a row is its embedded `expected` map when present,
/// otherwise the answer row for its filename — the same source the scorer
/// used. The type field is excluded from every count; identifier and
/// filename never appear among the values.
pub fn compute(
    schema: &DocTypeSchema,
    rows: &[OutputRow],
    answers: &[AnswerRow],
) -> (Vec<DocStats>, Vec<FieldStats>, RunSummary) {
    let by_file: BTreeMap<&str, &AnswerRow> = answers
        .iter()
        .filter(|row| !row.file_name.is_empty())
        .map(|row| (row.file_name.as_str(), row))
        .collect();

    let fields: Vec<&String> = schema
        .fields
        .iter()
        .filter(|field| !schema.is_type_field(field))
        .collect();

    let mut per_doc = Vec::new();
    let mut tallies: BTreeMap<&String, FieldTally> = BTreeMap::new();

    for row in rows {
        let embedded = !row.expected.is_empty();
        let answer = by_file.get(row.file_name.as_str()).copied();
        if !embedded && answer.is_none() {
            continue;
        }

        let mut correct = 0usize;
        let mut expected_count = 0usize;
        let mut produced = 0usize;
        let mut compared = 0usize;

        for &field in &fields {
            let expected = row
                .expected
                .get(field)
                .map(String::as_str)
                .or_else(|| answer.map(|a| a.value(field)))
                .unwrap_or("")
                .trim();
            let model = bare_model_value(row.value(field), expected);
            let result = row.results.get(field).copied();

            let has_expected = !expected.is_empty();
            let has_model = !model.is_empty();
            let passed = result == Some(Verdict::Pass);

            if has_expected {
                expected_count += 1;
            }
            if has_model {
                produced += 1;
            }
            if has_expected && has_model {
                compared += 1;
                if passed {
                    correct += 1;
                }
            }

            let tally = tallies.entry(field).or_default();
            if has_expected {
                tally.total += 1;
                if passed {
                    tally.correct += 1;
                }
                if !has_model {
                    tally.missing += 1;
                }
            } else if has_model {
                tally.extra += 1;
            }
            if result == Some(Verdict::Fail) {
                tally.fail += 1;
            }
        }

        let precision = ratio(correct, produced);
        let recall = ratio(correct, expected_count);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        per_doc.push(DocStats {
            file_name: row.file_name.clone(),
            entry_index: row.entry_index,
            correct_count: correct,
            expected_count,
            produced_count: produced,
            compared_count: compared,
            precision,
            recall,
            f1,
            // A wholly silent model scores zero here rather than being
            // excluded, so it drags averaged metrics down.
            item_accuracy: ratio(correct, compared),
        });
    }

    // Fields the ground truth never fills are left out of the report.
    let per_field: Vec<FieldStats> = fields
        .iter()
        .filter_map(|field| {
            let tally = tallies.get(*field)?;
            if tally.total == 0 {
                return None;
            }
            Some(FieldStats {
                field: (*field).clone(),
                total_count: tally.total,
                correct_count: tally.correct,
                fail_count: tally.fail,
                missing_count: tally.missing,
                extra_count: tally.extra,
                accuracy: ratio(tally.correct, tally.total),
                error_rate: ratio(tally.fail, tally.total),
            })
        })
        .collect();

    let summary = summarize(rows, &per_doc);
    (per_doc, per_field, summary)
}

fn summarize(rows: &[OutputRow], per_doc: &[DocStats]) -> RunSummary {
    let passed = rows.iter().filter(|r| r.overall == Some(Verdict::Pass)).count();
    let failed = rows.iter().filter(|r| r.overall == Some(Verdict::Fail)).count();

    let mean = |pick: fn(&DocStats) -> f64| -> f64 {
        if per_doc.is_empty() {
            0.0
        } else {
            per_doc.iter().map(pick).sum::<f64>() / per_doc.len() as f64
        }
    };

    RunSummary {
        total_rows: rows.len(),
        passed,
        failed,
        pass_rate: ratio(passed, rows.len()),
        avg_precision: mean(|d| d.precision),
        avg_recall: mean(|d| d.recall),
        avg_f1: mean(|d| d.f1),
        avg_item_accuracy: mean(|d| d.item_accuracy),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Recover the bare model value from a scored display value.
///
/// The scorer rewrites failing fields to `"<actual>(<expected>)"` and
/// empty-both fields to `"N/A"`; the not-available marker counts as no
/// output.
fn bare_model_value(display: &str, expected: &str) -> String {
    let mut value = display.trim();
    if !expected.is_empty() {
        let suffix = format!("({expected})");
        if let Some(stripped) = value.strip_suffix(suffix.as_str()) {
            value = stripped.trim();
        }
    }
    if value.eq_ignore_ascii_case(NOT_AVAILABLE) {
        return String::new();
    }
    value.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::schema::SchemaRegistry;
    use crate::score::score;

    const TABLE: &str = r#"
[types.health_report]
name = "Health Report"
type_field = "doc_type"
type_value = "HEALTH_REPORT"
fields = ["doc_type", "exam_date", "report_date", "passport_no"]

[types.health_report.columns]
exam_date   = "field_exam_date"
report_date = "field_report_date"
passport_no = "field_passport_no"
"#;

    fn schema() -> DocTypeSchema {
        SchemaRegistry::from_toml(TABLE).unwrap().get("health_report").unwrap().clone()
    }

    fn answer(file: &str, pairs: &[(&str, &str)]) -> AnswerRow {
        let mut values = Record::new();
        values.insert("file_name".into(), file.into());
        for (k, v) in pairs {
            values.insert((*k).into(), (*v).into());
        }
        AnswerRow { file_name: file.into(), values }
    }

    fn merged_row(file: &str, pairs: &[(&str, &str)]) -> OutputRow {
        let mut row = OutputRow::new("u1", file, 0);
        for (k, v) in pairs {
            row.values.insert((*k).into(), (*v).into());
        }
        row
    }

    /// 3 comparable fields, all expected, 2 correct and 1 wrong.
    #[test]
    fn metric_sanity() {
        let rows = vec![merged_row(
            "a.pdf",
            &[
                ("doc_type", "HEALTH_REPORT"),
                ("exam_date", "2026-01-10"),
                ("report_date", "2026-01-12"),
                ("passport_no", "WRONG"),
            ],
        )];
        let answers = vec![answer(
            "a.pdf",
            &[
                ("exam_date", "2026-01-10"),
                ("report_date", "2026-01-12"),
                ("passport_no", "X123"),
            ],
        )];

        let scored = score(&schema(), rows, &answers);
        let (per_doc, _, _) = compute(&schema(), &scored, &answers);
        assert_eq!(per_doc.len(), 1);
        let d = &per_doc[0];
        assert_eq!(d.correct_count, 2);
        assert_eq!(d.expected_count, 3);
        assert_eq!(d.produced_count, 3);
        assert_eq!(d.compared_count, 3);
        let two_thirds = 2.0 / 3.0;
        assert!((d.precision - two_thirds).abs() < 1e-9);
        assert!((d.recall - two_thirds).abs() < 1e-9);
        assert!((d.f1 - two_thirds).abs() < 1e-9);
        assert!((d.item_accuracy - two_thirds).abs() < 1e-9);
    }

    #[test]
    fn silent_model_scores_zero_item_accuracy() {
        let rows = vec![merged_row("a.pdf", &[("doc_type", "HEALTH_REPORT")])];
        let answers = vec![answer("a.pdf", &[("exam_date", "2026-01-10"), ("passport_no", "X123")])];

        let scored = score(&schema(), rows, &answers);
        let (per_doc, _, _) = compute(&schema(), &scored, &answers);
        let d = &per_doc[0];
        assert_eq!(d.expected_count, 2);
        assert_eq!(d.produced_count, 0);
        assert_eq!(d.compared_count, 0);
        assert_eq!(d.item_accuracy, 0.0);
        assert_eq!(d.recall, 0.0);
    }

    #[test]
    fn field_tallies_track_missing_and_extra() {
        let rows = vec![
            // exam_date missing from model, passport_no extra (no ground truth)
            merged_row(
                "a.pdf",
                &[("doc_type", "HEALTH_REPORT"), ("exam_date", ""), ("passport_no", "X123")],
            ),
            merged_row(
                "b.pdf",
                &[("doc_type", "HEALTH_REPORT"), ("exam_date", "2026-01-11"), ("passport_no", "")],
            ),
        ];
        let answers = vec![
            answer("a.pdf", &[("exam_date", "2026-01-10")]),
            answer("b.pdf", &[("exam_date", "2026-01-11")]),
        ];

        let scored = score(&schema(), rows, &answers);
        let (_, per_field, _) = compute(&schema(), &scored, &answers);

        let exam = per_field.iter().find(|f| f.field == "exam_date").unwrap();
        assert_eq!(exam.total_count, 2);
        assert_eq!(exam.correct_count, 1);
        assert_eq!(exam.fail_count, 1);
        assert_eq!(exam.missing_count, 1);
        assert_eq!(exam.extra_count, 0);
        assert!((exam.accuracy - 0.5).abs() < 1e-9);
        assert!((exam.error_rate - 0.5).abs() < 1e-9);

        // passport_no never appears in ground truth: excluded from the
        // report even though the model produced an extra value for it.
        assert!(per_field.iter().all(|f| f.field != "passport_no"));
        // report_date is empty on both sides everywhere: also excluded.
        assert!(per_field.iter().all(|f| f.field != "report_date"));
    }

    #[test]
    fn summary_averages_per_row_metrics() {
        let rows = vec![
            merged_row(
                "a.pdf",
                &[("doc_type", "HEALTH_REPORT"), ("exam_date", "2026-01-10"), ("passport_no", "X1")],
            ),
            merged_row(
                "b.pdf",
                &[("doc_type", "HEALTH_REPORT"), ("exam_date", "bad"), ("passport_no", "X2")],
            ),
        ];
        let answers = vec![
            answer("a.pdf", &[("exam_date", "2026-01-10"), ("passport_no", "X1")]),
            answer("b.pdf", &[("exam_date", "2026-01-11"), ("passport_no", "X2")]),
        ];

        let scored = score(&schema(), rows, &answers);
        let (per_doc, _, summary) = compute(&schema(), &scored, &answers);
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert!((summary.pass_rate - 0.5).abs() < 1e-9);

        let expected_avg = per_doc.iter().map(|d| d.precision).sum::<f64>() / 2.0;
        assert!((summary.avg_precision - expected_avg).abs() < 1e-9);
        // Row a: 2/2 precision; row b: 1/2 precision → average 0.75.
        assert!((summary.avg_precision - 0.75).abs() < 1e-9);
    }

    #[test]
    fn bare_value_recovers_actual_from_display() {
        assert_eq!(bare_model_value("C9(C1)", "C1"), "C9");
        assert_eq!(bare_model_value("N/A(C1)", "C1"), "");
        assert_eq!(bare_model_value("N/A", ""), "");
        assert_eq!(bare_model_value("C1", "C1"), "C1");
        // A genuine value containing parentheses is untouched when it
        // doesn't carry the scorer's suffix.
        assert_eq!(bare_model_value("Acme (HK)", "Acme Ltd"), "Acme (HK)");
    }
}
