use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::EngineError;
use crate::model::FILE_NAME_COLUMN;

// ---------------------------------------------------------------------------
// Index columns
// ---------------------------------------------------------------------------

/// Column names of the document-index table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexColumns {
    pub id: String,
    pub file_name: String,
    pub doc_type: String,
    pub created_at: String,
    pub payload: String,
}

impl Default for IndexColumns {
    fn default() -> Self {
        Self {
            id: "uuid".into(),
            file_name: "file_name".into(),
            doc_type: "document_type".into(),
            created_at: "created_at".into(),
            payload: "payload".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output layout
// ---------------------------------------------------------------------------

/// How multi-valued documents are laid out in the report. Scalar document
/// types always produce one row per document regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// One row per logical entry.
    #[default]
    Expanded,
    /// One row per document; list fields stay JSON-array-encoded.
    ListEncoded,
}

// ---------------------------------------------------------------------------
// Run options
// ---------------------------------------------------------------------------

/// Per-run options outside the document-type schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub layout: OutputLayout,
    pub index_columns: IndexColumns,
    /// Answer-table column holding the filename.
    pub answer_file_column: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            layout: OutputLayout::default(),
            index_columns: IndexColumns::default(),
            answer_file_column: FILE_NAME_COLUMN.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Document-type schema
// ---------------------------------------------------------------------------

/// Static descriptor for one document type.
#[derive(Debug, Clone, Deserialize)]
pub struct DocTypeSchema {
    /// Filled from the schema-table key, not the TOML body.
    #[serde(skip)]
    pub id: String,
    pub name: String,
    /// Ordered comparable fields, including the type field.
    pub fields: Vec<String>,
    /// Field that designates the document type.
    pub type_field: String,
    /// Canonical literal expected in the type field.
    pub type_value: String,
    #[serde(default)]
    pub multi_valued: bool,
    /// Scalar schemas: comparable field → attribute-table column.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
    /// Multi-valued schemas: comparable field → payload key.
    #[serde(default)]
    pub payload: BTreeMap<String, String>,
    /// Multi-valued schemas: the subset of fields that are list-capable.
    #[serde(default)]
    pub list_fields: Vec<String>,
    /// Report column order; defaults to filename + fields when empty.
    #[serde(default)]
    pub output_columns: Vec<String>,
}

impl DocTypeSchema {
    pub fn is_type_field(&self, field: &str) -> bool {
        field == self.type_field
    }

    pub fn is_list_field(&self, field: &str) -> bool {
        self.list_fields.iter().any(|f| f == field)
    }

    /// Configured report columns, or filename + fields when unconfigured.
    pub fn report_columns(&self) -> Vec<String> {
        if !self.output_columns.is_empty() {
            return self.output_columns.clone();
        }
        let mut columns = vec![FILE_NAME_COLUMN.to_string()];
        columns.extend(self.fields.iter().cloned());
        columns
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |msg: String| Err(EngineError::ConfigValidation(msg));

        if self.fields.is_empty() {
            return fail(format!("type '{}': fields must not be empty", self.id));
        }
        if !self.fields.contains(&self.type_field) {
            return fail(format!(
                "type '{}': type_field '{}' is not a declared field",
                self.id, self.type_field
            ));
        }
        for field in self.columns.keys() {
            if !self.fields.contains(field) {
                return fail(format!(
                    "type '{}': columns maps undeclared field '{field}'",
                    self.id
                ));
            }
        }
        for field in self.payload.keys() {
            if !self.fields.contains(field) {
                return fail(format!(
                    "type '{}': payload maps undeclared field '{field}'",
                    self.id
                ));
            }
        }
        if self.multi_valued {
            if self.list_fields.is_empty() {
                return fail(format!(
                    "type '{}': multi_valued types need at least one list field",
                    self.id
                ));
            }
            for field in &self.list_fields {
                if !self.fields.contains(field) {
                    return fail(format!(
                        "type '{}': list field '{field}' is not a declared field",
                        self.id
                    ));
                }
                if !self.payload.contains_key(field) {
                    return fail(format!(
                        "type '{}': list field '{field}' has no payload mapping",
                        self.id
                    ));
                }
            }
        } else {
            if !self.list_fields.is_empty() {
                return fail(format!(
                    "type '{}': list_fields requires multi_valued = true",
                    self.id
                ));
            }
            if !self.payload.is_empty() {
                return fail(format!(
                    "type '{}': payload mapping requires multi_valued = true",
                    self.id
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Validated table of document-type schemas.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    types: BTreeMap<String, DocTypeSchema>,
}

#[derive(Deserialize)]
struct RegistryFile {
    types: BTreeMap<String, DocTypeSchema>,
}

impl SchemaRegistry {
    /// Build a registry from a keyed schema table, filling each schema's id
    /// from its key and validating every descriptor.
    pub fn from_types(types: BTreeMap<String, DocTypeSchema>) -> Result<Self, EngineError> {
        let mut validated = BTreeMap::new();
        for (id, mut schema) in types {
            if id.trim().is_empty() {
                return Err(EngineError::ConfigValidation("empty document-type id".into()));
            }
            schema.id = id.clone();
            schema.validate()?;
            validated.insert(id, schema);
        }
        if validated.is_empty() {
            return Err(EngineError::ConfigValidation("schema table declares no types".into()));
        }
        Ok(Self { types: validated })
    }

    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let file: RegistryFile =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        Self::from_types(file.types)
    }

    pub fn get(&self, id: &str) -> Result<&DocTypeSchema, EngineError> {
        self.types
            .get(id)
            .ok_or_else(|| EngineError::UnknownDocType(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
