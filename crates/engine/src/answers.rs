use std::collections::BTreeMap;

use crate::model::AnswerRow;
use crate::normalize::normalize_str;

/// How one document's ground truth was authored. Both encodings are valid
/// and are detected per filename, so one run can mix them.
#[derive(Debug, Clone)]
pub enum AnswerShape {
    /// Several rows share the filename, one per logical entry.
    RowExpanded(Vec<AnswerRow>),
    /// A single row; list-capable fields are JSON-array-encoded.
    ListEncoded(AnswerRow),
}

/// Ground truth for one filename, normalized to index-aligned values.
#[derive(Debug, Clone)]
pub struct ResolvedAnswer {
    shape: AnswerShape,
}

impl ResolvedAnswer {
    pub fn shape(&self) -> &AnswerShape {
        &self.shape
    }

    /// Ordered per-entry values for a list-capable field.
    pub fn list_values(&self, field: &str) -> Vec<String> {
        match &self.shape {
            AnswerShape::RowExpanded(rows) => {
                rows.iter().map(|row| row.value(field).to_string()).collect()
            }
            AnswerShape::ListEncoded(row) => normalize_str(row.value(field)),
        }
    }

    /// Scalar field value; row-expanded answers read it from the first row.
    pub fn scalar(&self, field: &str) -> String {
        match &self.shape {
            AnswerShape::RowExpanded(rows) => rows
                .first()
                .map(|row| row.value(field).to_string())
                .unwrap_or_default(),
            AnswerShape::ListEncoded(row) => row.value(field).to_string(),
        }
    }

    /// Number of logical entries implied by the given list fields.
    pub fn entry_count(&self, list_fields: &[String]) -> usize {
        list_fields
            .iter()
            .map(|field| self.list_values(field).len())
            .max()
            .unwrap_or(0)
    }
}

/// Group answer rows by filename and detect each filename's shape. Rows with
/// an empty filename are dropped. A filename absent from the result has no
/// ground truth at all.
pub fn resolve(answers: &[AnswerRow]) -> BTreeMap<String, ResolvedAnswer> {
    let mut grouped: BTreeMap<String, Vec<AnswerRow>> = BTreeMap::new();
    for row in answers {
        if row.file_name.is_empty() {
            continue;
        }
        grouped.entry(row.file_name.clone()).or_default().push(row.clone());
    }

    grouped
        .into_iter()
        .map(|(file_name, mut rows)| {
            let shape = if rows.len() > 1 {
                AnswerShape::RowExpanded(rows)
            } else {
                AnswerShape::ListEncoded(rows.remove(0))
            };
            (file_name, ResolvedAnswer { shape })
        })
        .collect()
}
