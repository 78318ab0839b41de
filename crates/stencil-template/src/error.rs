/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation.
//!
//! Applying a compiled template never fails: unresolved references,
//! malformed conditions, and unknown namespaces all degrade to inert
//! values instead of erroring. The only fallible operation is turning
//! template JSON text into a tree.

use thiserror::Error;

/// Errors that can occur when compiling a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template source is not valid JSON.
    #[error("Invalid template JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
