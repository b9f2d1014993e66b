//! Core parsing helpers for seedsmith.
//!
//! This crate holds the pieces every pipeline step shares: the record
//! tokenizer for SQL value tuples, small SQL text helpers, name-to-id lookup
//! maps, and dependency ordering for the assembled seed script.

pub mod error;
pub mod graph;
pub mod lookup;
pub mod record;
pub mod sql;

pub use error::{Error, Result};
pub use graph::{build_dependency_report, dependency_order, DependencyReport, GraphSummary};
pub use lookup::{list_entries, LookupMap, MatchMode};
pub use record::{
    extract_records, parse_record, split_fields, tokenize, values_body, Extracted, RecordError,
    PRODUCT_RECORD_FIELDS,
};
pub use sql::{escape_sql, first_quoted, single_value_rows, unescape_sql, unquote, InsertStatement};
