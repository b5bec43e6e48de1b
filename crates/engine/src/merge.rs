use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::answers;
use crate::error::EngineError;
use crate::model::{AnswerRow, DocumentIndexRow, OutputRow, Record, RunWarning};
use crate::normalize::{json_array_string, json_scalar_to_string, normalize_json};
use crate::schema::{DocTypeSchema, OutputLayout};

/// Merge output: rows ready for scoring plus non-fatal findings.
#[derive(Debug)]
pub struct MergeOutput {
    pub rows: Vec<OutputRow>,
    pub warnings: Vec<RunWarning>,
}

/// Join the document index with type-specific data and ground truth.
///
/// Takes the N most recently created index rows (N = number of answer rows)
/// and requires their filenames to be exactly the answer filename set; a
/// partial join would corrupt every downstream denominator, so a mismatch
/// aborts with both difference sets instead.
pub fn merge(
    schema: &DocTypeSchema,
    index: &[DocumentIndexRow],
    attributes: &[Record],
    answers: &[AnswerRow],
    layout: OutputLayout,
    id_column: &str,
) -> Result<MergeOutput, EngineError> {
    let recent = select_recent(index, answers.len());
    check_file_sets(&recent, answers)?;

    if schema.multi_valued {
        Ok(merge_multi(schema, &recent, answers, layout))
    } else {
        Ok(MergeOutput {
            rows: merge_scalar(schema, &recent, attributes, id_column),
            warnings: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Selection + validation
// ---------------------------------------------------------------------------

/// The N most recently created index rows; unparseable timestamps sort oldest.
fn select_recent<'a>(index: &'a [DocumentIndexRow], n: usize) -> Vec<&'a DocumentIndexRow> {
    let mut rows: Vec<&DocumentIndexRow> = index.iter().collect();
    rows.sort_by_key(|row| std::cmp::Reverse(parse_timestamp(&row.created_at)));
    rows.truncate(n);
    rows
}

fn parse_timestamp(value: &str) -> NaiveDateTime {
    let value = value.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return ts;
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return ts;
        }
    }
    NaiveDateTime::MIN
}

fn check_file_sets(recent: &[&DocumentIndexRow], answers: &[AnswerRow]) -> Result<(), EngineError> {
    let answer_names: BTreeSet<&str> = answers
        .iter()
        .map(|row| row.file_name.as_str())
        .filter(|name| !name.is_empty())
        .collect();
    let index_names: BTreeSet<&str> = recent
        .iter()
        .map(|row| row.file_name.as_str())
        .filter(|name| !name.is_empty())
        .collect();

    if answer_names == index_names {
        return Ok(());
    }
    Err(EngineError::FileSetMismatch {
        missing_in_index: answer_names
            .difference(&index_names)
            .map(|name| name.to_string())
            .collect(),
        missing_in_answers: index_names
            .difference(&answer_names)
            .map(|name| name.to_string())
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Scalar merge
// ---------------------------------------------------------------------------

/// One output row per document: attribute columns projected through the
/// schema's field mapping, type field taken from the detected type.
fn merge_scalar(
    schema: &DocTypeSchema,
    recent: &[&DocumentIndexRow],
    attributes: &[Record],
    id_column: &str,
) -> Vec<OutputRow> {
    let by_id: BTreeMap<&str, &Record> = attributes
        .iter()
        .filter_map(|record| record.get(id_column).map(|id| (id.as_str(), record)))
        .collect();

    let mut rows = Vec::with_capacity(recent.len());
    for doc in recent {
        let mut row = OutputRow::new(&doc.doc_id, &doc.file_name, 0);
        row.values.insert(schema.type_field.clone(), doc.doc_type.clone());

        // Documents with no attribute row keep every mapped field empty.
        let attr = by_id.get(doc.doc_id.as_str());
        for (field, column) in &schema.columns {
            let value = attr
                .and_then(|record| record.get(column))
                .cloned()
                .unwrap_or_default();
            row.values.insert(field.clone(), value);
        }
        rows.push(row);
    }

    rows.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    rows
}

// ---------------------------------------------------------------------------
// List-expansion merge
// ---------------------------------------------------------------------------

/// Expand multi-valued documents to one row per logical entry (or one
/// JSON-encoded row, depending on layout), embedding index-aligned expected
/// values so each row can be judged on its own.
fn merge_multi(
    schema: &DocTypeSchema,
    recent: &[&DocumentIndexRow],
    answer_rows: &[AnswerRow],
    layout: OutputLayout,
) -> MergeOutput {
    let resolved = answers::resolve(answer_rows);
    let scalar_fields: Vec<&String> = schema
        .payload
        .keys()
        .filter(|field| !schema.is_list_field(field))
        .collect();

    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    for doc in recent {
        let payload = parse_payload(&doc.payload);
        if payload.is_none() {
            warnings.push(RunWarning::MalformedPayload { file_name: doc.file_name.clone() });
        }

        let mut lists: BTreeMap<&String, Vec<String>> = BTreeMap::new();
        let mut scalars: BTreeMap<&String, String> = BTreeMap::new();
        if let Some(data) = &payload {
            for (field, key) in &schema.payload {
                let value = data.get(key).unwrap_or(&Value::Null);
                if schema.is_list_field(field) {
                    lists.insert(field, normalize_json(value));
                } else {
                    scalars.insert(field, json_scalar_to_string(value));
                }
            }
        }

        let answer = resolved.get(&doc.file_name);
        let answer_lists: BTreeMap<&String, Vec<String>> = schema
            .list_fields
            .iter()
            .map(|field| {
                let values = answer.map(|a| a.list_values(field)).unwrap_or_default();
                (field, values)
            })
            .collect();

        let recognized_len = lists.values().map(Vec::len).max().unwrap_or(0);
        let expected_len = answer.map(|a| a.entry_count(&schema.list_fields)).unwrap_or(0);
        if recognized_len > 0 && expected_len > 0 && recognized_len != expected_len {
            warnings.push(RunWarning::ListLengthMismatch {
                file_name: doc.file_name.clone(),
                recognized: recognized_len,
                expected: expected_len,
            });
        }

        let entry_expected = |i: usize| -> Record {
            let mut expected = Record::new();
            expected.insert(schema.type_field.clone(), schema.type_value.clone());
            for field in &schema.list_fields {
                let value = answer_lists[field].get(i).cloned().unwrap_or_default();
                expected.insert(field.clone(), value);
            }
            for &field in &scalar_fields {
                let value = answer.map(|a| a.scalar(field)).unwrap_or_default();
                expected.insert(field.clone(), value);
            }
            expected
        };

        match layout {
            OutputLayout::Expanded => {
                // One row per entry, padded with empties so neither side
                // loses an entry; a document with no entries at all still
                // yields one blank row.
                let entries = recognized_len.max(expected_len).max(1);
                for i in 0..entries {
                    let mut row = OutputRow::new(&doc.doc_id, &doc.file_name, i);
                    row.values.insert(schema.type_field.clone(), doc.doc_type.clone());
                    for field in &schema.list_fields {
                        let value = lists
                            .get(field)
                            .and_then(|values| values.get(i))
                            .cloned()
                            .unwrap_or_default();
                        row.values.insert(field.clone(), value);
                    }
                    for &field in &scalar_fields {
                        let value = scalars.get(field).cloned().unwrap_or_default();
                        row.values.insert(field.clone(), value);
                    }
                    row.expected = entry_expected(i);
                    rows.push(row);
                }
            }
            OutputLayout::ListEncoded => {
                let mut row = OutputRow::new(&doc.doc_id, &doc.file_name, 0);
                row.values.insert(schema.type_field.clone(), doc.doc_type.clone());
                for field in &schema.list_fields {
                    let values = lists.get(field).cloned().unwrap_or_default();
                    row.values.insert(field.clone(), json_array_string(&values));
                }
                for &field in &scalar_fields {
                    let value = scalars.get(field).cloned().unwrap_or_default();
                    row.values.insert(field.clone(), value);
                }

                let mut expected = Record::new();
                expected.insert(schema.type_field.clone(), schema.type_value.clone());
                for field in &schema.list_fields {
                    expected.insert(field.clone(), json_array_string(&answer_lists[field]));
                }
                for &field in &scalar_fields {
                    let value = answer.map(|a| a.scalar(field)).unwrap_or_default();
                    expected.insert(field.clone(), value);
                }
                row.expected = expected;
                rows.push(row);
            }
        }
    }

    rows.sort_by(|a, b| (&a.file_name, a.entry_index).cmp(&(&b.file_name, b.entry_index)));
    MergeOutput { rows, warnings }
}

/// Payloads must decode to a JSON object; anything else counts as malformed.
fn parse_payload(payload: &str) -> Option<Value> {
    if payload.trim().is_empty() {
        return None;
    }
    serde_json::from_str::<Value>(payload).ok().filter(Value::is_object)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
