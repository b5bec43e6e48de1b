//! `docgrade-engine` — recognition-output vs ground-truth reconciliation
//! and scoring engine.
//!
//! Pure engine crate: receives pre-loaded records, returns scored rows and
//! statistics. No CLI or IO dependencies.

pub mod answers;
pub mod compare;
pub mod engine;
pub mod error;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod schema;
pub mod score;
pub mod stats;

pub use engine::{load_records, run};
pub use error::EngineError;
pub use model::{EngineInput, OutputRow, RunResult, Verdict};
pub use schema::{DocTypeSchema, OutputLayout, RunOptions, SchemaRegistry};
