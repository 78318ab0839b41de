/*
 * transform.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template tree transformation.
//!
//! [`transform`] walks a template tree and produces the resolved
//! configuration: directive objects (`__if`, `__switch`, `__remove`)
//! collapse into their selected content, strings interpolate, and
//! everything else copies through with object key order intact. The walk
//! is pure; applying the same template to the same context twice gives
//! identical output.
//!
//! Directive outcomes depend on position. A directive that produces
//! nothing omits its key at an object field, contributes zero elements at
//! an array position, and degrades to `null` at the root. A `__switch`
//! with no matching case and no `default` is the one directive that
//! produces an explicit `null` instead of nothing.

use indexmap::IndexMap;

use crate::context::{TemplateContext, UsageTracker};
use crate::evaluator::evaluate_condition_tracked;
use crate::interpolate::interpolate;
use crate::parser::Template;
use crate::value::TemplateValue;

/// Apply a template tree to a context, producing the resolved
/// configuration tree.
pub fn transform(template: &TemplateValue, ctx: &TemplateContext) -> TemplateValue {
    transform_with_usage(template, ctx).0
}

/// As [`transform`], also reporting which references were consulted.
pub fn transform_with_usage(
    template: &TemplateValue,
    ctx: &TemplateContext,
) -> (TemplateValue, UsageTracker) {
    tracing::debug!(
        inputs = ctx.inputs().len(),
        services = ctx.services().len(),
        "Applying configuration template"
    );
    let mut usage = UsageTracker::new();
    let resolved = transform_node(template, ctx, &mut usage);
    (resolved, usage)
}

impl Template {
    /// Apply this template to a context.
    pub fn apply(&self, ctx: &TemplateContext) -> TemplateValue {
        transform(self.root(), ctx)
    }

    /// As [`apply`](Self::apply), also reporting consulted references.
    pub fn apply_with_usage(&self, ctx: &TemplateContext) -> (TemplateValue, UsageTracker) {
        transform_with_usage(self.root(), ctx)
    }
}

/// A directive object, classified.
///
/// When several directive keys appear on one object, `__if` wins over
/// `__switch`, which wins over `__remove`; the losers are ignored.
enum Directive<'a> {
    /// `__if` (a condition string) with optional `__value`.
    If {
        condition: &'a str,
        value: Option<&'a TemplateValue>,
    },

    /// `__switch` (a selector reference) with sibling `cases`/`default`.
    Switch {
        selector: &'a str,
        cases: Option<&'a IndexMap<String, TemplateValue>>,
        default: Option<&'a TemplateValue>,
    },

    /// `__remove: true`.
    Remove,
}

/// Recognize a directive object. Objects whose marker key holds the wrong
/// type (`__if: 5`, `__remove: "yes"`) are not directives and transform
/// as ordinary objects.
fn classify(fields: &IndexMap<String, TemplateValue>) -> Option<Directive<'_>> {
    if let Some(TemplateValue::String(condition)) = fields.get("__if") {
        return Some(Directive::If {
            condition,
            value: fields.get("__value"),
        });
    }
    if let Some(TemplateValue::String(selector)) = fields.get("__switch") {
        let cases = match fields.get("cases") {
            Some(TemplateValue::Object(cases)) => Some(cases),
            _ => None,
        };
        return Some(Directive::Switch {
            selector,
            cases,
            default: fields.get("default"),
        });
    }
    if matches!(fields.get("__remove"), Some(TemplateValue::Bool(true))) {
        return Some(Directive::Remove);
    }
    None
}

fn transform_node(
    node: &TemplateValue,
    ctx: &TemplateContext,
    usage: &mut UsageTracker,
) -> TemplateValue {
    match node {
        TemplateValue::String(text) => interpolate(text, ctx, usage),
        TemplateValue::Array(items) => TemplateValue::Array(transform_array(items, ctx, usage)),
        TemplateValue::Object(_) => {
            resolve_value(node, ctx, usage).unwrap_or(TemplateValue::Null)
        }
        other => other.clone(),
    }
}

/// Transform a node at a value position (an object field's value or the
/// tree root). `None` means the position produces nothing: the field is
/// omitted, or the root degrades to `null`.
fn resolve_value(
    node: &TemplateValue,
    ctx: &TemplateContext,
    usage: &mut UsageTracker,
) -> Option<TemplateValue> {
    match node {
        TemplateValue::Object(fields) => match classify(fields) {
            Some(directive) => resolve_directive(directive, fields, ctx, usage),
            None => Some(TemplateValue::Object(transform_entries(
                fields.iter(),
                ctx,
                usage,
            ))),
        },
        other => Some(transform_node(other, ctx, usage)),
    }
}

fn resolve_directive(
    directive: Directive<'_>,
    fields: &IndexMap<String, TemplateValue>,
    ctx: &TemplateContext,
    usage: &mut UsageTracker,
) -> Option<TemplateValue> {
    match directive {
        Directive::Remove => None,
        Directive::If { condition, value } => {
            if !evaluate_condition_tracked(condition, ctx, usage) {
                return None;
            }
            match value {
                // Directives chain: a __value may itself be a directive
                Some(value) => resolve_value(value, ctx, usage),
                None => Some(TemplateValue::Object(transform_entries(
                    fields.iter().filter(|(key, _)| key.as_str() != "__if"),
                    ctx,
                    usage,
                ))),
            }
        }
        Directive::Switch {
            selector,
            cases,
            default,
        } => {
            let key = switch_key(ctx.resolve(selector, usage));
            let branch = cases.and_then(|cases| cases.get(key.as_str())).or(default);
            match branch {
                Some(branch) => resolve_value(branch, ctx, usage),
                None => Some(TemplateValue::Null),
            }
        }
    }
}

/// Transform object entries field by field, omitting fields whose value
/// position produced nothing.
fn transform_entries<'a>(
    entries: impl Iterator<Item = (&'a String, &'a TemplateValue)>,
    ctx: &TemplateContext,
    usage: &mut UsageTracker,
) -> IndexMap<String, TemplateValue> {
    let mut resolved = IndexMap::new();
    for (key, value) in entries {
        if let Some(value) = resolve_value(value, ctx, usage) {
            resolved.insert(key.clone(), value);
        }
    }
    resolved
}

/// What one template array element contributes to the resolved array.
enum Contribution {
    /// Nothing: a failed `__if` or a `__remove`.
    Skip,

    /// Exactly one element.
    Single(TemplateValue),

    /// Zero or more spliced elements from a sole-token array
    /// interpolation.
    Spread(Vec<TemplateValue>),
}

fn transform_array(
    items: &[TemplateValue],
    ctx: &TemplateContext,
    usage: &mut UsageTracker,
) -> Vec<TemplateValue> {
    let mut resolved = Vec::new();
    for item in items {
        match element_contribution(item, ctx, usage) {
            Contribution::Skip => {}
            Contribution::Single(value) => resolved.push(value),
            Contribution::Spread(values) => resolved.extend(values),
        }
    }
    resolved
}

/// Transform a node at an array element position.
///
/// Sole-token interpolation is the only source of splicing: a literal
/// array element stays one (nested) element, while a string element whose
/// lone token resolves to an array splices those elements in place. An
/// empty array splices to zero elements. Directives recurse through
/// their selected content, so a directive choosing a spliceable string
/// splices too.
fn element_contribution(
    node: &TemplateValue,
    ctx: &TemplateContext,
    usage: &mut UsageTracker,
) -> Contribution {
    match node {
        TemplateValue::String(text) => match interpolate(text, ctx, usage) {
            // interpolate only returns an array for a sole-token match
            TemplateValue::Array(values) => Contribution::Spread(values),
            other => Contribution::Single(other),
        },
        TemplateValue::Object(fields) => match classify(fields) {
            Some(directive) => directive_contribution(directive, fields, ctx, usage),
            None => Contribution::Single(TemplateValue::Object(transform_entries(
                fields.iter(),
                ctx,
                usage,
            ))),
        },
        other => Contribution::Single(transform_node(other, ctx, usage)),
    }
}

fn directive_contribution(
    directive: Directive<'_>,
    fields: &IndexMap<String, TemplateValue>,
    ctx: &TemplateContext,
    usage: &mut UsageTracker,
) -> Contribution {
    match directive {
        Directive::Remove => Contribution::Skip,
        Directive::If { condition, value } => {
            if !evaluate_condition_tracked(condition, ctx, usage) {
                return Contribution::Skip;
            }
            match value {
                Some(value) => element_contribution(value, ctx, usage),
                None => Contribution::Single(TemplateValue::Object(transform_entries(
                    fields.iter().filter(|(key, _)| key.as_str() != "__if"),
                    ctx,
                    usage,
                ))),
            }
        }
        Directive::Switch {
            selector,
            cases,
            default,
        } => {
            let key = switch_key(ctx.resolve(selector, usage));
            let branch = cases.and_then(|cases| cases.get(key.as_str())).or(default);
            match branch {
                Some(branch) => element_contribution(branch, ctx, usage),
                None => Contribution::Single(TemplateValue::Null),
            }
        }
    }
}

/// The case-map key for a switch selector resolution. Undefined and null
/// both select the `"undefined"` case; every other value keys by its
/// display text.
fn switch_key(resolved: Option<TemplateValue>) -> String {
    match resolved {
        None | Some(TemplateValue::Null) => "undefined".to_owned(),
        Some(value) => value.display_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> TemplateValue {
        serde_json::from_str(json).unwrap()
    }

    fn apply(template: &str, ctx: &TemplateContext) -> TemplateValue {
        transform(&parse(template), ctx)
    }

    #[test]
    fn test_plain_tree_passes_through() {
        let ctx = TemplateContext::new();
        let source = r#"{"zeta": 1, "alpha": {"flag": true, "note": null}, "list": [1, "two"]}"#;
        let resolved = apply(source, &ctx);
        assert_eq!(resolved, parse(source));
        // Key order survives the walk
        assert_eq!(
            serde_json::to_string(&resolved).unwrap(),
            r#"{"zeta":1,"alpha":{"flag":true,"note":null},"list":[1,"two"]}"#
        );
    }

    #[test]
    fn test_if_value_keeps_or_omits_key() {
        let template = r#"{"debrid": {"__if": "services.vault", "__value": "{{inputs.level}}"}, "kept": 1}"#;

        let on = TemplateContext::new().with_service("vault").with_input("level", 3);
        assert_eq!(apply(template, &on), parse(r#"{"debrid": 3, "kept": 1}"#));

        let off = TemplateContext::new().with_input("level", 3);
        assert_eq!(apply(template, &off), parse(r#"{"kept": 1}"#));
    }

    #[test]
    fn test_if_only_strips_marker() {
        let template = r#"{"__if": "inputs.debug", "level": "verbose", "sink": "stderr"}"#;

        let on = TemplateContext::new().with_input("debug", true);
        assert_eq!(apply(template, &on), parse(r#"{"level": "verbose", "sink": "stderr"}"#));

        // A false condition at the root degrades to null
        let off = TemplateContext::new();
        assert_eq!(apply(template, &off), TemplateValue::Null);
    }

    #[test]
    fn test_switch_selects_case_or_default() {
        let template = r#"{
            "__switch": "inputs.quality",
            "cases": {
                "high": {"bitrate": 8000},
                "low": {"bitrate": 1000},
                "undefined": {"bitrate": 2000}
            },
            "default": {"bitrate": 4000}
        }"#;

        let high = TemplateContext::new().with_input("quality", "high");
        assert_eq!(apply(template, &high), parse(r#"{"bitrate": 8000}"#));

        let odd = TemplateContext::new().with_input("quality", "odd");
        assert_eq!(apply(template, &odd), parse(r#"{"bitrate": 4000}"#));

        // Undefined and null selectors both hit the "undefined" case
        let unset = TemplateContext::new();
        assert_eq!(apply(template, &unset), parse(r#"{"bitrate": 2000}"#));
        let null = TemplateContext::new().with_input("quality", TemplateValue::Null);
        assert_eq!(apply(template, &null), parse(r#"{"bitrate": 2000}"#));
    }

    #[test]
    fn test_switch_without_match_or_default_is_null() {
        let template = r#"{"mode": {"__switch": "inputs.quality", "cases": {"high": 1}}}"#;
        let ctx = TemplateContext::new().with_input("quality", "odd");
        // Explicit null, not an omitted key
        assert_eq!(apply(template, &ctx), parse(r#"{"mode": null}"#));
    }

    #[test]
    fn test_switch_keys_by_display_text() {
        let template = r#"{
            "__switch": "inputs.workers",
            "cases": {"0": "none", "4": "pool", "true": "flagged"}
        }"#;

        let four = TemplateContext::new().with_input("workers", 4);
        assert_eq!(apply(template, &four), TemplateValue::from("pool"));

        let zero = TemplateContext::new().with_input("workers", 0);
        assert_eq!(apply(template, &zero), TemplateValue::from("none"));

        let flagged = TemplateContext::new().with_input("workers", true);
        assert_eq!(apply(template, &flagged), TemplateValue::from("flagged"));
    }

    #[test]
    fn test_remove_directive() {
        let template = r#"{"gone": {"__remove": true}, "kept": {"__remove": false}}"#;
        let resolved = apply(template, &TemplateContext::new());
        // Only exactly-true removes; __remove: false is an ordinary object
        assert_eq!(resolved, parse(r#"{"kept": {"__remove": false}}"#));
    }

    #[test]
    fn test_directive_marker_of_wrong_type_is_ordinary() {
        let template = r#"{"a": {"__if": true, "x": 1}, "b": {"__remove": "yes"}}"#;
        let resolved = apply(template, &TemplateContext::new());
        assert_eq!(resolved, parse(template));
    }

    #[test]
    fn test_array_element_contributions() {
        let template = r#"[
            {"__if": "services.vault", "id": "vault-search"},
            {"__remove": true},
            {"id": "always"},
            {"__if": "inputs.missing", "__value": "never"}
        ]"#;
        let ctx = TemplateContext::new().with_service("vault");
        assert_eq!(
            apply(template, &ctx),
            parse(r#"[{"id": "vault-search"}, {"id": "always"}]"#)
        );

        let none = TemplateContext::new();
        assert_eq!(apply(template, &none), parse(r#"[{"id": "always"}]"#));
    }

    #[test]
    fn test_sole_token_array_splices() {
        let template = r#"["{{inputs.languages}}", "Original"]"#;

        let ctx = TemplateContext::new().with_input(
            "languages",
            parse(r#"["French", "German"]"#),
        );
        assert_eq!(apply(template, &ctx), parse(r#"["French", "German", "Original"]"#));

        // An empty array splices to zero elements
        let empty = TemplateContext::new().with_input("languages", TemplateValue::Array(vec![]));
        assert_eq!(apply(template, &empty), parse(r#"["Original"]"#));
    }

    #[test]
    fn test_literal_array_element_stays_nested() {
        let template = r#"[["French", "German"], "Original"]"#;
        let resolved = apply(template, &TemplateContext::new());
        assert_eq!(resolved, parse(r#"[["French", "German"], "Original"]"#));
    }

    #[test]
    fn test_directives_splice_through_selected_content() {
        let template = r#"[
            {"__if": "inputs.extra", "__value": "{{inputs.languages}}"},
            {"__switch": "inputs.mode", "cases": {"all": "{{inputs.languages}}"}, "default": "none"},
            "end"
        ]"#;
        let ctx = TemplateContext::new()
            .with_input("extra", true)
            .with_input("mode", "all")
            .with_input("languages", parse(r#"["French", "German"]"#));
        assert_eq!(
            apply(template, &ctx),
            parse(r#"["French", "German", "French", "German", "end"]"#)
        );

        let fallback = TemplateContext::new().with_input("languages", parse(r#"["French"]"#));
        assert_eq!(apply(template, &fallback), parse(r#"["none", "end"]"#));
    }

    #[test]
    fn test_value_chains_through_nested_directive() {
        let template = r#"{"mode": {
            "__if": "inputs.debug",
            "__value": {"__switch": "inputs.quality", "cases": {"high": "hq"}, "default": "sq"}
        }}"#;
        let ctx = TemplateContext::new()
            .with_input("debug", true)
            .with_input("quality", "high");
        assert_eq!(apply(template, &ctx), parse(r#"{"mode": "hq"}"#));
    }

    #[test]
    fn test_interpolation_inside_kept_branches() {
        let template = r#"{
            "__if": "services.indexer",
            "server": "{{inputs.host}}:{{inputs.port}}",
            "services": "{{services}}"
        }"#;
        let ctx = TemplateContext::new()
            .with_service("indexer")
            .with_service("vault")
            .with_input("host", "localhost")
            .with_input("port", 8080);
        assert_eq!(
            apply(template, &ctx),
            parse(r#"{"server": "localhost:8080", "services": ["indexer", "vault"]}"#)
        );
    }

    #[test]
    fn test_transform_collects_usage() {
        let template = parse(
            r#"{
                "a": "{{inputs.host}}",
                "b": {"__if": "services.vault and inputs.debug", "__value": 1},
                "c": {"__switch": "inputs.mode", "cases": {}}
            }"#,
        );
        let ctx = TemplateContext::new().with_service("vault").with_input("debug", true);
        let (_, usage) = transform_with_usage(&template, &ctx);

        let inputs: Vec<&str> = usage.inputs().iter().map(String::as_str).collect();
        assert_eq!(inputs, vec!["host", "debug", "mode"]);
        let services: Vec<&str> = usage.services().iter().map(String::as_str).collect();
        assert_eq!(services, vec!["vault"]);
    }

    #[test]
    fn test_template_apply() {
        let template = Template::compile(r#"{"on": "{{inputs.flag}}"}"#).unwrap();
        let ctx = TemplateContext::new().with_input("flag", true);
        assert_eq!(template.apply(&ctx), parse(r#"{"on": true}"#));

        let (resolved, usage) = template.apply_with_usage(&ctx);
        assert_eq!(resolved, parse(r#"{"on": true}"#));
        assert!(!usage.is_empty());
    }
}
