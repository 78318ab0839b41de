/*
 * interpolate.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! String interpolation of `{{...}}` tokens.
//!
//! Two rules decide what a template string resolves to:
//! - a string that is exactly one token (after trimming) keeps the native
//!   type of the resolved reference: numbers stay numbers, arrays stay
//!   arrays, and at an array position the transformer splices an array
//!   result into the surrounding elements
//! - in mixed content, every token stringifies through display text
//!
//! Credential tokens (`services.<id>.<key>`) are never resolved here;
//! they pass through verbatim for the later credential pass.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::{TemplateContext, UsageTracker};
use crate::value::TemplateValue;

/// Regex for interpolation tokens: `{{reference}}`
///
/// Matches:
/// - Opening `{{`
/// - The reference (captured group 1) - any characters except braces
/// - Closing `}}`
///
/// References are trimmed after capture, so `{{ inputs.name }}` and
/// `{{inputs.name}}` are equivalent.
pub(crate) static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([^{}]*)\}\}").expect("Invalid regex pattern for interpolation tokens")
});

/// Split a `services.<id>.<key>` reference into service id and credential
/// key path, if it has that shape. A plain `services.<id>` reference is a
/// selection test, not a credential.
pub(crate) fn credential_reference(reference: &str) -> Option<(&str, &str)> {
    let path = reference.strip_prefix("services.")?;
    let (service, key) = path.split_once('.')?;
    if service.is_empty() || key.is_empty() {
        return None;
    }
    Some((service, key))
}

/// Resolve the `{{...}}` tokens in a template string.
///
/// A sole-token string resolves to the referenced value itself; an
/// undefined reference becomes the empty string. In mixed content each
/// token stringifies via display text, undefined and null both rendering
/// as "". Text without tokens passes through unchanged.
pub fn interpolate(text: &str, ctx: &TemplateContext, usage: &mut UsageTracker) -> TemplateValue {
    if let Some(reference) = sole_token(text) {
        if credential_reference(reference).is_some() {
            return TemplateValue::String(text.to_owned());
        }
        return match ctx.resolve(reference, usage) {
            Some(value) => value,
            None => TemplateValue::String(String::new()),
        };
    }

    let replaced = TOKEN_PATTERN.replace_all(text, |caps: &regex::Captures| {
        let reference = caps.get(1).map(|m| m.as_str()).unwrap_or("").trim();
        if credential_reference(reference).is_some() {
            // Leave the whole token in place for the credential pass
            caps[0].to_string()
        } else {
            ctx.resolve(reference, usage)
                .map(|value| value.display_text())
                .unwrap_or_default()
        }
    });
    TemplateValue::String(replaced.into_owned())
}

/// If the trimmed text is exactly one token, return its trimmed reference.
fn sole_token(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let caps = TOKEN_PATTERN.captures(trimmed)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == trimmed.len() {
        Some(caps.get(1)?.as_str().trim())
    } else {
        None
    }
}
