use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::schema::IndexColumns;

/// Key under which a row's overall verdict appears in the flat report form.
pub const RESULT_COLUMN: &str = "result";
/// Suffix appended to a field name to form its verdict column.
pub const RESULT_SUFFIX: &str = "_result";
/// Flat-form column carrying the document identifier.
pub const DOC_ID_COLUMN: &str = "doc_id";
/// Flat-form column carrying the filename.
pub const FILE_NAME_COLUMN: &str = "file_name";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A header-keyed row from any exported table.
pub type Record = BTreeMap<String, String>;

/// One row of the document index: identity, filename, detected type, and the
/// raw structured payload for multi-valued document types.
#[derive(Debug, Clone)]
pub struct DocumentIndexRow {
    pub doc_id: String,
    pub file_name: String,
    pub doc_type: String,
    pub created_at: String,
    pub payload: String,
}

impl DocumentIndexRow {
    pub fn from_record(record: &Record, columns: &IndexColumns) -> Self {
        let get = |name: &str| record.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
        Self {
            doc_id: get(&columns.id),
            file_name: get(&columns.file_name),
            doc_type: get(&columns.doc_type),
            created_at: get(&columns.created_at),
            payload: record.get(&columns.payload).cloned().unwrap_or_default(),
        }
    }
}

/// One row of ground truth, keyed by filename.
#[derive(Debug, Clone)]
pub struct AnswerRow {
    pub file_name: String,
    pub values: Record,
}

impl AnswerRow {
    pub fn from_record(record: &Record, file_column: &str) -> Self {
        Self {
            file_name: record.get(file_column).map(|v| v.trim().to_string()).unwrap_or_default(),
            values: record.clone(),
        }
    }

    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }
}

/// Pre-loaded records for one run.
#[derive(Debug, Clone, Default)]
pub struct EngineInput {
    pub index: Vec<Record>,
    pub attributes: Vec<Record>,
    pub answers: Vec<Record>,
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Result of one field comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldVerdict {
    pub matched: bool,
    pub display: String,
    pub result: Verdict,
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

/// One report row: field values plus, after scoring, per-field verdicts.
///
/// Serializes as the flat mapping the report collaborator expects: field →
/// display value plus `<field>_result` and `result` keys.
#[derive(Debug, Clone)]
pub struct OutputRow {
    pub doc_id: String,
    pub file_name: String,
    pub entry_index: usize,
    /// Field → value; the scorer rewrites these to display form.
    pub values: Record,
    /// Index-aligned expected values embedded by the list-expansion merge.
    pub expected: Record,
    /// Field → verdict, written by the scorer.
    pub results: BTreeMap<String, Verdict>,
    /// Overall verdict, written by the scorer.
    pub overall: Option<Verdict>,
}

impl OutputRow {
    pub fn new(doc_id: &str, file_name: &str, entry_index: usize) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            file_name: file_name.to_string(),
            entry_index,
            values: Record::new(),
            expected: Record::new(),
            results: BTreeMap::new(),
            overall: None,
        }
    }

    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    /// Flat mapping for the report collaborator.
    pub fn to_flat(&self) -> Record {
        let mut flat = self.values.clone();
        if !self.doc_id.is_empty() {
            flat.insert(DOC_ID_COLUMN.into(), self.doc_id.clone());
        }
        flat.insert(FILE_NAME_COLUMN.into(), self.file_name.clone());
        for (field, verdict) in &self.results {
            flat.insert(format!("{field}{RESULT_SUFFIX}"), verdict.to_string());
        }
        if let Some(overall) = self.overall {
            flat.insert(RESULT_COLUMN.into(), overall.to_string());
        }
        flat
    }
}

impl Serialize for OutputRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flat = self.to_flat();
        let mut map = serializer.serialize_map(Some(flat.len()))?;
        for (key, value) in &flat {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Per-row accuracy record. Multi-valued documents contribute one record per
/// expanded entry.
#[derive(Debug, Clone, Serialize)]
pub struct DocStats {
    pub file_name: String,
    pub entry_index: usize,
    pub correct_count: usize,
    pub expected_count: usize,
    pub produced_count: usize,
    pub compared_count: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub item_accuracy: f64,
}

/// Per-field tallies across all scored rows.
#[derive(Debug, Clone, Serialize)]
pub struct FieldStats {
    pub field: String,
    pub total_count: usize,
    pub correct_count: usize,
    pub fail_count: usize,
    pub missing_count: usize,
    pub extra_count: usize,
    pub accuracy: f64,
    pub error_rate: f64,
}

/// Run-level roll-up of verdicts and averaged per-row metrics.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub avg_precision: f64,
    pub avg_recall: f64,
    pub avg_f1: f64,
    pub avg_item_accuracy: f64,
}

// ---------------------------------------------------------------------------
// Warnings + Result
// ---------------------------------------------------------------------------

/// Non-fatal findings collected during merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// Raw payload missing or unparseable; document emitted as a blank entry.
    MalformedPayload { file_name: String },
    /// Recognized and ground-truth lists disagree on entry count.
    ListLengthMismatch {
        file_name: String,
        recognized: usize,
        expected: usize,
    },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPayload { file_name } => {
                write!(f, "{file_name}: payload missing or unparseable, emitted blank entry")
            }
            Self::ListLengthMismatch { file_name, recognized, expected } => {
                write!(
                    f,
                    "{file_name}: recognized {recognized} entries but ground truth has {expected}"
                )
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub doc_type: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub columns: Vec<String>,
    pub rows: Vec<OutputRow>,
    pub per_doc: Vec<DocStats>,
    pub per_field: Vec<FieldStats>,
    pub summary: RunSummary,
    pub warnings: Vec<RunWarning>,
}
