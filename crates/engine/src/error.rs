use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Schema table validation error (bad field reference, missing mapping, etc.).
    ConfigValidation(String),
    /// A requested document-type id has no schema descriptor.
    UnknownDocType(String),
    /// Ground-truth filenames and document-index filenames are not the same set.
    FileSetMismatch {
        missing_in_index: Vec<String>,
        missing_in_answers: Vec<String>,
    },
    /// Malformed CSV text handed to `load_records`.
    CsvParse(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownDocType(id) => write!(f, "unknown document type: {id}"),
            Self::FileSetMismatch { missing_in_index, missing_in_answers } => {
                write!(
                    f,
                    "filename sets differ: {} missing from index, {} missing from answers",
                    missing_in_index.len(),
                    missing_in_answers.len()
                )?;
                if !missing_in_index.is_empty() {
                    write!(f, "; missing from index: {}", missing_in_index.join(", "))?;
                }
                if !missing_in_answers.is_empty() {
                    write!(f, "; missing from answers: {}", missing_in_answers.join(", "))?;
                }
                Ok(())
            }
            Self::CsvParse(msg) => write!(f, "CSV parse error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
