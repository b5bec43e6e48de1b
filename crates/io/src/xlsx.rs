// XLSX answer-sheet import

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use docgrade_engine::model::Record;

/// Read the first worksheet into header-keyed records.
///
/// Spreadsheet tools store typed-in numbers as floats, so float cells with
/// no fractional part become integer strings; all-empty rows are dropped.
pub fn read_records(path: &Path) -> Result<Vec<Record>, String> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| format!("{}: workbook has no sheets", path.display()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("{}: cannot read sheet '{sheet_name}': {e}", path.display()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(cell_to_string).collect(),
        None => return Ok(Vec::new()),
    };

    let mut records = Vec::new();
    for row in rows {
        let mut record = Record::new();
        let mut all_empty = true;
        for (header, cell) in headers.iter().zip(row.iter()) {
            if header.is_empty() {
                continue;
            }
            let value = cell_to_string(cell);
            if !value.is_empty() {
                all_empty = false;
            }
            record.insert(header.clone(), value);
        }
        if !all_empty {
            records.push(record);
        }
    }
    Ok(records)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(n) => {
            // Integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => {
            if *b {
                "TRUE".into()
            } else {
                "FALSE".into()
            }
        }
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            if serial.fract() == 0.0 {
                format!("{}", serial as i64)
            } else {
                format!("{serial}")
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn answers_workbook() -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "file_name").unwrap();
        sheet.write_string(0, 1, "card_no").unwrap();
        sheet.write_string(0, 2, "issue_days").unwrap();
        sheet.write_string(1, 0, "a.pdf").unwrap();
        sheet.write_string(1, 1, " C1 ").unwrap();
        sheet.write_number(1, 2, 25.0).unwrap();
        // Row 2 left entirely blank, row 3 has data again
        sheet.write_string(3, 0, "b.pdf").unwrap();
        sheet.write_number(3, 2, 25.5).unwrap();
        workbook.save(file.path()).unwrap();
        file
    }

    #[test]
    fn reads_records_and_normalizes_floats() {
        let file = answers_workbook();
        let records = read_records(file.path()).unwrap();

        // The blank spacer row is dropped
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["file_name"], "a.pdf");
        assert_eq!(records[0]["card_no"], "C1");
        assert_eq!(records[0]["issue_days"], "25");
        assert_eq!(records[1]["file_name"], "b.pdf");
        assert_eq!(records[1]["issue_days"], "25.5");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_records(Path::new("/nonexistent/answers.xlsx")).unwrap_err();
        assert!(err.contains("answers.xlsx"));
    }
}
