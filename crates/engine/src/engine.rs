use crate::error::EngineError;
use crate::merge;
use crate::model::{
    AnswerRow, DocumentIndexRow, EngineInput, OutputRow, Record, RunMeta, RunResult,
    RESULT_COLUMN, RESULT_SUFFIX,
};
use crate::schema::{DocTypeSchema, RunOptions};
use crate::score;
use crate::stats;

/// Run reconciliation and scoring for one document type.
///
/// Merges the document index with type-specific data and ground truth,
/// scores every field of every row, and aggregates statistics. Structural
/// problems (filename-set mismatch) abort before any scoring; per-record
/// problems degrade to blank rows and come back as warnings.
pub fn run(
    schema: &DocTypeSchema,
    input: &EngineInput,
    options: &RunOptions,
) -> Result<RunResult, EngineError> {
    let index: Vec<DocumentIndexRow> = input
        .index
        .iter()
        .map(|record| DocumentIndexRow::from_record(record, &options.index_columns))
        .collect();
    let answers: Vec<AnswerRow> = input
        .answers
        .iter()
        .map(|record| AnswerRow::from_record(record, &options.answer_file_column))
        .collect();

    let merged = merge::merge(
        schema,
        &index,
        &input.attributes,
        &answers,
        options.layout,
        &options.index_columns.id,
    )?;
    let rows = score::score(schema, merged.rows, &answers);
    let (per_doc, per_field, summary) = stats::compute(schema, &rows, &answers);
    let columns = report_columns(schema, &rows);

    Ok(RunResult {
        meta: RunMeta {
            doc_type: schema.id.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        columns,
        rows,
        per_doc,
        per_field,
        summary,
        warnings: merged.warnings,
    })
}

/// Full report column order: configured columns, then a verdict column for
/// every scored one, then the overall verdict.
pub fn report_columns(schema: &DocTypeSchema, rows: &[OutputRow]) -> Vec<String> {
    let base = schema.report_columns();
    let mut columns = base.clone();
    if let Some(first) = rows.first() {
        for column in &base {
            if first.results.contains_key(column) {
                columns.push(format!("{column}{RESULT_SUFFIX}"));
            }
        }
        if first.overall.is_some() {
            columns.push(RESULT_COLUMN.to_string());
        }
    }
    columns
}

/// Parse CSV text into header-keyed records. A UTF-8 BOM on the first
/// header is stripped.
pub fn load_records(csv_data: &str) -> Result<Vec<Record>, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::CsvParse(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| EngineError::CsvParse(e.to_string()))?;
        let mut fields = Record::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            if let Some(value) = record.get(i) {
                fields.insert(header.clone(), value.to_string());
            }
        }
        records.push(fields);
    }
    Ok(records)
}
