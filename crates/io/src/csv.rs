// CSV export ingestion

use std::io::Read;
use std::path::Path;

use docgrade_engine::model::Record;

/// Read a file and convert to UTF-8 if needed (handles Windows-1252,
/// Latin-1, etc.); a leading BOM is stripped.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(content.trim_start_matches('\u{feff}').to_string())
}

/// Read a CSV export into header-keyed records.
pub fn read_records(path: &Path) -> Result<Vec<Record>, String> {
    let content = read_file_as_utf8(path)?;
    docgrade_engine::load_records(&content).map_err(|e| format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn reads_bom_prefixed_csv() {
        let file = write_temp("\u{feff}uuid,file_name\nu1,a.pdf\n".as_bytes());
        let records = read_records(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["uuid"], "u1");
    }

    #[test]
    fn falls_back_to_windows_1252() {
        // 0xE9 is 'é' in Windows-1252 but invalid UTF-8
        let file = write_temp(b"uuid,employer\nu1,Caf\xe9 Ltd\n");
        let records = read_records(file.path()).unwrap();
        assert_eq!(records[0]["employer"], "Café Ltd");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_records(Path::new("/nonexistent/answers.csv")).unwrap_err();
        assert!(err.contains("answers.csv"));
    }
}
