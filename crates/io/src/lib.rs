//! `docgrade-io` — file ingestion for the reconciliation engine.
//!
//! CSV exports (UTF-8 with optional BOM, Windows-1252 fallback) and XLSX
//! answer sheets. Parsing into engine records happens in `docgrade-engine`;
//! this crate only deals with files and encodings.

pub mod csv;
pub mod xlsx;
