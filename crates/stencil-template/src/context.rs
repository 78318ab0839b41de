/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Evaluation context and reference resolution.
//!
//! A [`TemplateContext`] carries the two namespaces a template can read:
//! wizard `inputs` (JSON-shaped values keyed by input id) and the set of
//! selected `services`. [`TemplateContext::resolve`] is the single
//! resolution path shared by condition evaluation, interpolation, and the
//! tree transformer, so the namespaces cannot drift between features.

use indexmap::{IndexMap, IndexSet};

use crate::value::TemplateValue;

/// References consulted while applying a template.
///
/// A tracker is threaded through resolution so callers can report which
/// inputs and services a template actually read. Ids are recorded in
/// first-consulted order, once each, whether or not they resolved.
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    inputs: IndexSet<String>,
    services: IndexSet<String>,
}

impl UsageTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Input ids that were looked up.
    pub fn inputs(&self) -> &IndexSet<String> {
        &self.inputs
    }

    /// Service ids whose selection state was tested.
    pub fn services(&self) -> &IndexSet<String> {
        &self.services
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.services.is_empty()
    }

    fn record_input(&mut self, id: &str) {
        self.inputs.insert(id.to_owned());
    }

    fn record_service(&mut self, id: &str) {
        self.services.insert(id.to_owned());
    }
}

/// The values a template is applied against.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Wizard input values keyed by input id.
    inputs: IndexMap<String, TemplateValue>,

    /// Selected service ids, in selection order.
    services: IndexSet<String>,
}

impl TemplateContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert_input`](Self::insert_input).
    pub fn with_input(mut self, id: impl Into<String>, value: impl Into<TemplateValue>) -> Self {
        self.insert_input(id, value);
        self
    }

    /// Builder-style [`select_service`](Self::select_service).
    pub fn with_service(mut self, id: impl Into<String>) -> Self {
        self.select_service(id);
        self
    }

    /// Bind an input value. Re-binding an id replaces its value.
    pub fn insert_input(&mut self, id: impl Into<String>, value: impl Into<TemplateValue>) {
        self.inputs.insert(id.into(), value.into());
    }

    /// Mark a service as selected.
    pub fn select_service(&mut self, id: impl Into<String>) {
        self.services.insert(id.into());
    }

    /// The bound input values.
    pub fn inputs(&self) -> &IndexMap<String, TemplateValue> {
        &self.inputs
    }

    /// The selected service ids.
    pub fn services(&self) -> &IndexSet<String> {
        &self.services
    }

    /// Whether a service id is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.services.contains(id)
    }

    /// Resolve a dotted reference against this context.
    ///
    /// Reference grammar:
    /// - `inputs.<id>[.<nested>...]` resolves to the input value,
    ///   descending into nested objects segment by segment
    /// - `services.<id>` resolves to a boolean: is the service selected
    /// - bare `services` resolves to the array of selected ids
    ///
    /// Everything else (unknown namespace, bare `inputs`, an unknown input
    /// id, a path that walks through a non-object) resolves to `None`.
    /// An unresolved reference is not an error; callers decide how an
    /// undefined value degrades. Note that `None` is distinct from
    /// `Some(TemplateValue::Null)`: an input bound to JSON `null` resolves.
    pub fn resolve(&self, reference: &str, usage: &mut UsageTracker) -> Option<TemplateValue> {
        let reference = reference.trim();
        if reference == "services" {
            return Some(TemplateValue::Array(
                self.services
                    .iter()
                    .map(|id| TemplateValue::String(id.clone()))
                    .collect(),
            ));
        }

        let (namespace, path) = reference.split_once('.')?;
        match namespace {
            "inputs" => {
                let (id, rest) = match path.split_once('.') {
                    Some((id, rest)) => (id, rest),
                    None => (path, ""),
                };
                if id.is_empty() {
                    return None;
                }
                usage.record_input(id);
                let root = self.inputs.get(id)?;
                if rest.is_empty() {
                    return Some(root.clone());
                }
                let segments: Vec<&str> = rest.split('.').collect();
                root.get_path(&segments).cloned()
            }
            "services" => {
                if path.is_empty() {
                    return None;
                }
                usage.record_service(path);
                Some(TemplateValue::Bool(self.services.contains(path)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> TemplateContext {
        let user: TemplateValue =
            serde_json::from_str(r#"{"name": "casey", "quota": 0, "plan": null}"#).unwrap();
        TemplateContext::new()
            .with_input("user", user)
            .with_input("debug", false)
            .with_service("indexer")
            .with_service("archive")
    }

    fn resolve(ctx: &TemplateContext, reference: &str) -> Option<TemplateValue> {
        let mut usage = UsageTracker::new();
        ctx.resolve(reference, &mut usage)
    }

    #[test]
    fn test_resolve_input_paths() {
        let ctx = sample_context();

        assert_eq!(
            resolve(&ctx, "inputs.user.name"),
            Some(TemplateValue::from("casey"))
        );
        // Falsy leaves still resolve; undefined is None, not falsy-Some
        assert_eq!(resolve(&ctx, "inputs.user.quota"), Some(TemplateValue::from(0)));
        assert_eq!(resolve(&ctx, "inputs.user.plan"), Some(TemplateValue::Null));
        assert_eq!(resolve(&ctx, "inputs.debug"), Some(TemplateValue::Bool(false)));

        assert_eq!(resolve(&ctx, "inputs.user.missing"), None);
        assert_eq!(resolve(&ctx, "inputs.unknown"), None);
        // Descending through a string fails rather than erroring
        assert_eq!(resolve(&ctx, "inputs.user.name.deep"), None);
        // Surrounding whitespace is tolerated
        assert_eq!(
            resolve(&ctx, "  inputs.user.name  "),
            Some(TemplateValue::from("casey"))
        );
    }

    #[test]
    fn test_resolve_services() {
        let ctx = sample_context();

        assert_eq!(
            resolve(&ctx, "services.indexer"),
            Some(TemplateValue::Bool(true))
        );
        assert_eq!(
            resolve(&ctx, "services.nothere"),
            Some(TemplateValue::Bool(false))
        );
        // Bare `services` is the selected ids in selection order
        assert_eq!(
            resolve(&ctx, "services"),
            Some(TemplateValue::Array(vec![
                TemplateValue::from("indexer"),
                TemplateValue::from("archive"),
            ]))
        );

        let empty = TemplateContext::new();
        assert_eq!(resolve(&empty, "services"), Some(TemplateValue::Array(vec![])));
    }

    #[test]
    fn test_resolve_unknown_shapes() {
        let ctx = sample_context();

        assert_eq!(resolve(&ctx, "settings.user"), None);
        assert_eq!(resolve(&ctx, "inputs"), None);
        assert_eq!(resolve(&ctx, "inputs."), None);
        assert_eq!(resolve(&ctx, "services."), None);
        assert_eq!(resolve(&ctx, ""), None);
        assert_eq!(resolve(&ctx, "user.name"), None);
    }

    #[test]
    fn test_usage_tracking() {
        let ctx = sample_context();
        let mut usage = UsageTracker::new();
        assert!(usage.is_empty());

        ctx.resolve("inputs.user.name", &mut usage);
        ctx.resolve("inputs.debug", &mut usage);
        ctx.resolve("inputs.user.quota", &mut usage); // dedupes "user"
        ctx.resolve("inputs.unknown", &mut usage); // consulted even though unresolved
        ctx.resolve("services.indexer", &mut usage);
        ctx.resolve("settings.x", &mut usage); // unknown namespace records nothing

        let inputs: Vec<&str> = usage.inputs().iter().map(String::as_str).collect();
        assert_eq!(inputs, vec!["user", "debug", "unknown"]);
        let services: Vec<&str> = usage.services().iter().map(String::as_str).collect();
        assert_eq!(services, vec!["indexer"]);
    }

    #[test]
    fn test_selection_queries() {
        let ctx = sample_context();
        assert!(ctx.is_selected("archive"));
        assert!(!ctx.is_selected("vault"));
        assert_eq!(ctx.inputs().len(), 2);
        assert_eq!(ctx.services().len(), 2);
    }
}
