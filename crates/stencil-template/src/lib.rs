/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Directive-based configuration template engine for Stencil.
//!
//! Setup flows describe the configuration they produce as JSON templates.
//! Applying a template to the user's wizard inputs and selected services
//! yields a concrete configuration tree. Templates support:
//!
//! - Interpolation: `{{inputs.name}}`, `{{services.vault}}`, `{{services}}`;
//!   a string that is exactly one token keeps the resolved value's native
//!   type, and in arrays a sole-token array result splices in place
//! - Conditional nodes: `__if` with an optional `__value`, guarding either
//!   a replacement value or the rest of the object's own fields
//! - A condition language with `==`, `!=`, `>`, `>=`, `<`, `<=`,
//!   `includes`, clause negation via `!`, and `and`/`or`/`xor` combinators
//!   (`and` binds tighter)
//! - Branch nodes: `__switch` over a reference, with `cases` and `default`
//! - Removal markers: `__remove: true`
//! - Deferred credentials: `{{services.<id>.<key>}}` tokens survive the
//!   transform pass and are filled in later from a [`CredentialMap`]
//!
//! # Architecture
//!
//! Resolution is two independent passes. [`transform`] consumes a
//! [`TemplateContext`] (inputs + selected services) and never sees
//! secrets; [`resolve_credentials`] consumes only a flat credential map.
//! Both passes are pure functions over the tree, and object key order is
//! preserved end to end. Applying a template cannot fail: unresolved
//! references, malformed conditions, and wrong-namespace operators all
//! degrade to inert output rather than errors.
//!
//! # Example
//!
//! ```
//! use stencil_template::{CredentialMap, Template, TemplateContext, resolve_credentials};
//!
//! let template = Template::compile(
//!     r#"{
//!         "server": "{{inputs.host}}:{{inputs.port}}",
//!         "auth": {
//!             "__if": "services.vault",
//!             "__value": "Bearer {{services.vault.apiKey}}"
//!         }
//!     }"#,
//! )?;
//!
//! let ctx = TemplateContext::new()
//!     .with_input("host", "localhost")
//!     .with_input("port", 8080)
//!     .with_service("vault");
//!
//! // Pass 1: resolve inputs and services; credentials stay tokenized
//! let resolved = template.apply(&ctx);
//! assert_eq!(
//!     serde_json::to_string(&resolved)?,
//!     r#"{"server":"localhost:8080","auth":"Bearer {{services.vault.apiKey}}"}"#
//! );
//!
//! // Pass 2: fill in credentials
//! let credentials =
//!     CredentialMap::from([("service_vault_apiKey".to_owned(), "s3cr3t".to_owned())]);
//! let config = resolve_credentials(&resolved, &credentials);
//! assert_eq!(
//!     serde_json::to_string(&config)?,
//!     r#"{"server":"localhost:8080","auth":"Bearer s3cr3t"}"#
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ast;
pub mod context;
pub mod credentials;
pub mod error;
pub mod evaluator;
pub mod interpolate;
pub mod parser;
pub mod transform;
pub mod value;

// Re-export main types at crate root
pub use ast::{Clause, ClauseTest, CompareOp, Condition};
pub use context::{TemplateContext, UsageTracker};
pub use credentials::{CredentialMap, credential_key, resolve_credentials};
pub use error::{TemplateError, TemplateResult};
pub use evaluator::evaluate_condition;
pub use interpolate::interpolate;
pub use parser::Template;
pub use transform::{transform, transform_with_usage};
pub use value::TemplateValue;
