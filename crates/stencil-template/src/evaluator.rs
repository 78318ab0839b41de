/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Condition evaluation.
//!
//! Evaluation is total: every condition string yields a boolean. A clause
//! whose reference does not resolve is false (before negation), an
//! operator applied outside its namespace is false, and a numeric
//! comparison with a non-numeric side is false. Nothing here returns an
//! error, because a template selecting the wrong branch must still
//! produce a configuration.

use crate::ast::{Clause, ClauseTest, CompareOp, Condition};
use crate::context::{TemplateContext, UsageTracker};
use crate::value::TemplateValue;

/// Evaluate condition text against a context.
///
/// Convenience over [`Condition::parse`] + [`Condition::evaluate`] that
/// discards usage information.
pub fn evaluate_condition(condition: &str, ctx: &TemplateContext) -> bool {
    let mut usage = UsageTracker::new();
    evaluate_condition_tracked(condition, ctx, &mut usage)
}

/// As [`evaluate_condition`], recording consulted references into `usage`.
pub(crate) fn evaluate_condition_tracked(
    condition: &str,
    ctx: &TemplateContext,
    usage: &mut UsageTracker,
) -> bool {
    Condition::parse(condition).evaluate(ctx, usage)
}

impl Condition {
    /// Evaluate this expression tree against a context.
    ///
    /// `and`/`or` short-circuit. `xor` evaluates both sides, so a chain
    /// of `xor` is an odd-parity test over its operands.
    pub fn evaluate(&self, ctx: &TemplateContext, usage: &mut UsageTracker) -> bool {
        match self {
            Condition::Clause(clause) => clause.evaluate(ctx, usage),
            Condition::And(left, right) => left.evaluate(ctx, usage) && right.evaluate(ctx, usage),
            Condition::Or(left, right) => left.evaluate(ctx, usage) || right.evaluate(ctx, usage),
            Condition::Xor(left, right) => {
                let l = left.evaluate(ctx, usage);
                let r = right.evaluate(ctx, usage);
                l != r
            }
        }
    }
}

impl Clause {
    /// Evaluate this clause. Negation applies to the test outcome, after
    /// any operator.
    pub fn evaluate(&self, ctx: &TemplateContext, usage: &mut UsageTracker) -> bool {
        let outcome = match &self.test {
            ClauseTest::Truthy => ctx
                .resolve(&self.reference, usage)
                .is_some_and(|value| value.is_truthy()),
            ClauseTest::Compare { op, literal } => {
                compare(&self.reference, *op, literal, ctx, usage)
            }
        };
        if self.negated { !outcome } else { outcome }
    }
}

fn compare(
    reference: &str,
    op: CompareOp,
    literal: &str,
    ctx: &TemplateContext,
    usage: &mut UsageTracker,
) -> bool {
    match op {
        CompareOp::Includes => includes(reference, literal, ctx, usage),
        CompareOp::Eq | CompareOp::Ne => {
            if !is_inputs_reference(reference) {
                return false;
            }
            let text = match ctx.resolve(reference, usage) {
                Some(value) => value.display_text(),
                None => String::new(),
            };
            let equal = text == literal;
            if op == CompareOp::Ne { !equal } else { equal }
        }
        CompareOp::Gt | CompareOp::Ge | CompareOp::Lt | CompareOp::Le => {
            if !is_inputs_reference(reference) {
                return false;
            }
            let left = ctx.resolve(reference, usage).and_then(|v| numeric(&v));
            let right = literal.trim().parse::<f64>().ok();
            match (left, right) {
                (Some(left), Some(right)) => ordered(op, left, right),
                _ => false,
            }
        }
    }
}

/// `includes` accepts any namespace: an array resolution tests membership
/// (string elements only, strict equality), a string resolution tests for
/// a substring. Anything else is false.
fn includes(reference: &str, literal: &str, ctx: &TemplateContext, usage: &mut UsageTracker) -> bool {
    match ctx.resolve(reference, usage) {
        Some(TemplateValue::Array(items)) => items
            .iter()
            .any(|item| matches!(item, TemplateValue::String(s) if s == literal)),
        Some(TemplateValue::String(s)) => s.contains(literal),
        _ => false,
    }
}

fn ordered(op: CompareOp, left: f64, right: f64) -> bool {
    match op {
        CompareOp::Gt => left > right,
        CompareOp::Ge => left >= right,
        CompareOp::Lt => left < right,
        CompareOp::Le => left <= right,
        _ => false,
    }
}

/// Equality and numeric operators only apply to `inputs.*` references.
fn is_inputs_reference(reference: &str) -> bool {
    reference.trim().starts_with("inputs.")
}

/// Values that coerce to a number: numbers, and strings holding one.
fn numeric(value: &TemplateValue) -> Option<f64> {
    match value {
        TemplateValue::Number(n) => n.as_f64(),
        TemplateValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
