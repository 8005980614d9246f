//! Error and warning taxonomy for the pattern pipeline.
//!
//! [`SchemaError`] and [`ParseError`] are fatal and abort a run before any
//! later stage writes output. [`PipelineWarning`] values are non-fatal: they
//! are logged where they occur and carried forward in the run report.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Column '{column}' not found in {table} table")]
    MissingColumn { table: String, column: String },

    #[error("Duplicate column name '{column}' in {table} table")]
    DuplicateColumn { table: String, column: String },

    #[error("Column '{column}' holds non-numeric value '{value}' on row {row}")]
    UnexpectedColumnType {
        column: String,
        value: String,
        row: usize,
    },

    #[error("Categorical column '{column}' not found in county table")]
    MissingCategoricalColumn { column: String },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("Unrecognized token '{token}' at offset {offset}")]
    UnknownToken { offset: usize, token: String },

    #[error("Description is missing required key '{key}'")]
    MissingKey { key: String },

    #[error("Key '{key}' is repeated within one mapping")]
    DuplicateKey { key: String },

    #[error("Expected {expected} for '{key}'")]
    UnexpectedValue { key: String, expected: String },

    #[error("Bound '{bound}' of feature '{feature}' is not a number or infinity: {reason}")]
    InvalidBound {
        feature: String,
        bound: String,
        reason: String,
    },

    #[error("Pattern '{pattern}' is described more than once")]
    DuplicatePattern { pattern: String },

    #[error("Pattern row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    pub(crate) fn at_row(self, row: usize) -> Self {
        ParseError::Row {
            row,
            source: Box::new(self),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    #[error("Pattern '{pattern}' references unknown feature '{feature}'; constraint skipped")]
    UnknownFeature { pattern: String, feature: String },

    #[error("Pattern '{pattern}' constrains '{feature}' without 'lb' or 'ub'; constraint skipped")]
    EmptyConstraint { pattern: String, feature: String },

    #[error("Column '{column}' is constant over {rows} matched row(s); normalized values are NaN")]
    DivisionDegenerate { column: String, rows: usize },
}

/// Fatal errors raised by the library stages.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
