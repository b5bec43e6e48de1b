use std::collections::BTreeMap;

use crate::compare::compare_field;
use crate::model::{AnswerRow, OutputRow, Verdict};
use crate::schema::DocTypeSchema;

/// Score merged rows against ground truth.
///
/// Expected values come from the row's embedded `expected` map when present
/// (list-expansion merges), otherwise from the answer row matching the
/// filename. Rows with neither cannot be judged and are dropped.
pub fn score(schema: &DocTypeSchema, rows: Vec<OutputRow>, answers: &[AnswerRow]) -> Vec<OutputRow> {
    let by_file: BTreeMap<&str, &AnswerRow> = answers
        .iter()
        .filter(|row| !row.file_name.is_empty())
        .map(|row| (row.file_name.as_str(), row))
        .collect();

    let mut scored = Vec::with_capacity(rows.len());
    for mut row in rows {
        let embedded = !row.expected.is_empty();
        let answer = by_file.get(row.file_name.as_str()).copied();
        if !embedded && answer.is_none() {
            continue;
        }

        let mut overall = Verdict::Pass;
        for field in &schema.fields {
            let actual = row.value(field).to_string();
            let expected = row
                .expected
                .get(field)
                .cloned()
                .or_else(|| answer.map(|a| a.value(field).to_string()))
                .unwrap_or_default();

            let verdict = compare_field(
                &actual,
                &expected,
                schema.is_type_field(field),
                &schema.type_value,
            );
            row.values.insert(field.clone(), verdict.display);
            row.results.insert(field.clone(), verdict.result);
            if verdict.result == Verdict::Fail {
                overall = Verdict::Fail;
            }
        }
        row.overall = Some(overall);
        scored.push(row);
    }
    scored
}
