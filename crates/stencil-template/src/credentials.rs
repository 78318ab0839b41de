/*
 * credentials.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Credential substitution, the second resolution pass.
//!
//! Interpolation leaves `{{services.<id>.<key>}}` tokens in place so a
//! resolved configuration can be stored or displayed without secrets.
//! This pass walks a tree (typically a transformed one, but any tree
//! works) and replaces each credential token with its value from a flat
//! credential map. It needs no [`TemplateContext`] and runs
//! independently of the transform pass.
//!
//! [`TemplateContext`]: crate::context::TemplateContext

use std::collections::HashMap;

use crate::interpolate::{TOKEN_PATTERN, credential_reference};
use crate::value::TemplateValue;

/// Flat credential storage, keyed by [`credential_key`].
pub type CredentialMap = HashMap<String, String>;

/// The flat storage key for a service credential: `service_<id>_<key>`,
/// with dots in nested key paths flattened to underscores. So
/// `{{services.vault.keys.primary}}` reads `service_vault_keys_primary`.
pub fn credential_key(service: &str, key: &str) -> String {
    format!("service_{service}_{}", key.replace('.', "_"))
}

/// Replace `{{services.<id>.<key>}}` tokens throughout a tree.
///
/// Non-credential tokens and non-string values pass through untouched. A
/// credential token with no map entry substitutes as the empty string;
/// within one pass, substituted text is never re-scanned.
pub fn resolve_credentials(node: &TemplateValue, credentials: &CredentialMap) -> TemplateValue {
    tracing::debug!(credentials = credentials.len(), "Applying credential pass");
    substitute_node(node, credentials)
}

fn substitute_node(node: &TemplateValue, credentials: &CredentialMap) -> TemplateValue {
    match node {
        TemplateValue::String(text) => TemplateValue::String(substitute(text, credentials)),
        TemplateValue::Array(items) => TemplateValue::Array(
            items
                .iter()
                .map(|item| substitute_node(item, credentials))
                .collect(),
        ),
        TemplateValue::Object(fields) => TemplateValue::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), substitute_node(value, credentials)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn substitute(text: &str, credentials: &CredentialMap) -> String {
    TOKEN_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            let reference = caps.get(1).map(|m| m.as_str()).unwrap_or("").trim();
            match credential_reference(reference) {
                Some((service, key)) => credentials
                    .get(&credential_key(service, key))
                    .cloned()
                    .unwrap_or_default(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> CredentialMap {
        CredentialMap::from([
            ("service_vault_apiKey".to_owned(), "s3cr3t".to_owned()),
            ("service_vault_keys_primary".to_owned(), "primary-key".to_owned()),
            ("service_indexer_token".to_owned(), "tok-123".to_owned()),
        ])
    }

    #[test]
    fn test_credential_key_flattening() {
        assert_eq!(credential_key("vault", "apiKey"), "service_vault_apiKey");
        assert_eq!(
            credential_key("vault", "keys.primary"),
            "service_vault_keys_primary"
        );
    }

    #[test]
    fn test_substitutes_credential_tokens() {
        let tree: TemplateValue = serde_json::from_str(
            r#"{
                "auth": "Bearer {{services.vault.apiKey}}",
                "nested": {"primary": "{{services.vault.keys.primary}}"},
                "list": ["{{services.indexer.token}}", 42]
            }"#,
        )
        .unwrap();

        let resolved = resolve_credentials(&tree, &credentials());
        let expected: TemplateValue = serde_json::from_str(
            r#"{
                "auth": "Bearer s3cr3t",
                "nested": {"primary": "primary-key"},
                "list": ["tok-123", 42]
            }"#,
        )
        .unwrap();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_missing_credential_substitutes_blank() {
        let tree = TemplateValue::from("key={{services.vault.missing}};");
        let resolved = resolve_credentials(&tree, &credentials());
        assert_eq!(resolved, TemplateValue::from("key=;"));
    }

    #[test]
    fn test_non_credential_tokens_untouched() {
        let tree: TemplateValue = serde_json::from_str(
            r#"["{{inputs.name}}", "{{services.vault}}", "{{services}}", "plain"]"#,
        )
        .unwrap();
        // Only two-plus-segment services paths are credentials
        assert_eq!(resolve_credentials(&tree, &credentials()), tree);
    }

    #[test]
    fn test_non_string_values_untouched() {
        let tree: TemplateValue =
            serde_json::from_str(r#"{"n": 42, "b": false, "x": null}"#).unwrap();
        assert_eq!(resolve_credentials(&tree, &credentials()), tree);
    }
}
