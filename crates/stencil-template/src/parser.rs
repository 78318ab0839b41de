/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Parsers for the two textual surfaces of a template.
//!
//! Template documents are JSON and deserialize straight into
//! [`TemplateValue`] trees, keeping object key order. Condition
//! expressions get a single-pass word scanner: `and`/`or`/`xor` are only
//! honored as combinators when the text after them starts like a context
//! reference, so unquoted comparison literals may contain those words
//! (`inputs.genre == action and adventure` is one clause).
//!
//! Condition parsing is total. Malformed text never fails; it degrades
//! into clauses whose references simply do not resolve.

use crate::ast::{Clause, ClauseTest, CompareOp, Condition};
use crate::error::TemplateResult;
use crate::value::TemplateValue;

/// A compiled template ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// The template tree as authored.
    root: TemplateValue,
}

impl Template {
    /// Compile a template from JSON source text.
    ///
    /// # Arguments
    /// * `source` - The template document as JSON text
    ///
    /// # Returns
    /// A compiled template, or an error if the source is not valid JSON.
    pub fn compile(source: &str) -> TemplateResult<Self> {
        let root = serde_json::from_str(source)?;
        Ok(Template { root })
    }

    /// Wrap an already-built tree as a template.
    pub fn from_value(root: TemplateValue) -> Self {
        Template { root }
    }

    /// The template tree.
    pub fn root(&self) -> &TemplateValue {
        &self.root
    }
}

/// A combinator keyword joining two clauses.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    And,
    Or,
    Xor,
}

impl Combinator {
    fn join(self, left: Condition, right: Condition) -> Condition {
        match self {
            Combinator::And => Condition::And(Box::new(left), Box::new(right)),
            Combinator::Or => Condition::Or(Box::new(left), Box::new(right)),
            Combinator::Xor => Condition::Xor(Box::new(left), Box::new(right)),
        }
    }
}

impl Condition {
    /// Parse condition text into an expression tree.
    ///
    /// `and` binds tighter than `or`/`xor`; `or` and `xor` associate left
    /// to right at equal precedence. Parsing never fails.
    pub fn parse(input: &str) -> Condition {
        let (first, rest) = split_compound(input);
        let mut group = Condition::Clause(parse_clause(&first));
        let mut folded: Option<(Condition, Combinator)> = None;

        for (combinator, text) in rest {
            let clause = Condition::Clause(parse_clause(&text));
            match combinator {
                Combinator::And => {
                    group = combinator.join(group, clause);
                }
                Combinator::Or | Combinator::Xor => {
                    folded = Some(match folded {
                        None => (group, combinator),
                        Some((expr, pending)) => (pending.join(expr, group), combinator),
                    });
                    group = clause;
                }
            }
        }

        match folded {
            None => group,
            Some((expr, pending)) => pending.join(expr, group),
        }
    }
}

/// Split condition text into clause chunks at accepted combinator keywords.
///
/// A keyword is accepted as a separator only when clause text precedes it
/// and the text following it starts like a reference. Rejected keywords
/// stay inside the surrounding clause.
fn split_compound(input: &str) -> (String, Vec<(Combinator, String)>) {
    let mut separators: Vec<(usize, usize, Combinator)> = Vec::new();
    let mut prev_end = 0;
    for (start, end) in word_runs(input) {
        let combinator = match &input[start..end] {
            "and" => Combinator::And,
            "or" => Combinator::Or,
            "xor" => Combinator::Xor,
            _ => continue,
        };
        if input[prev_end..start].trim().is_empty() {
            continue;
        }
        if !starts_reference(input[end..].trim_start()) {
            continue;
        }
        separators.push((start, end, combinator));
        prev_end = end;
    }

    let first_end = separators.first().map_or(input.len(), |&(start, _, _)| start);
    let first = input[..first_end].trim().to_owned();
    let mut rest = Vec::with_capacity(separators.len());
    for (i, &(_, end, combinator)) in separators.iter().enumerate() {
        let next_start = separators
            .get(i + 1)
            .map_or(input.len(), |&(start, _, _)| start);
        rest.push((combinator, input[end..next_start].trim().to_owned()));
    }
    (first, rest)
}

/// Does this text begin with a context reference, after an optional `!`?
fn starts_reference(text: &str) -> bool {
    let text = text.strip_prefix('!').unwrap_or(text).trim_start();
    text.starts_with("inputs.")
        || text.starts_with("services.")
        || text == "services"
        || text
            .strip_prefix("services")
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

/// Byte ranges of the whitespace-delimited words in `input`.
fn word_runs(input: &str) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (index, ch) in input.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                runs.push((s, index));
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(s) = start {
        runs.push((s, input.len()));
    }
    runs
}

fn parse_clause(text: &str) -> Clause {
    let trimmed = text.trim();
    let (negated, body) = match trimmed.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    match find_operator(body) {
        Some((op, start, end)) => Clause {
            negated,
            reference: body[..start].trim().to_owned(),
            test: ClauseTest::Compare {
                op,
                literal: body[end..].trim().to_owned(),
            },
        },
        None => Clause {
            negated,
            reference: body.to_owned(),
            test: ClauseTest::Truthy,
        },
    }
}

/// Locate the first comparison operator in a clause body.
///
/// The earliest operator wins. Two-character symbols are tried before
/// their one-character prefixes so `>=` never splits as `>` + `=`. The
/// word operator `includes` only counts when it stands alone between
/// whitespace and has clause text before it.
fn find_operator(body: &str) -> Option<(CompareOp, usize, usize)> {
    const SYMBOLS: [(&str, CompareOp); 6] = [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        (">=", CompareOp::Ge),
        ("<=", CompareOp::Le),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
    ];

    let mut found: Option<(usize, usize, CompareOp)> = None;
    for (symbol, op) in SYMBOLS {
        if let Some(position) = body.find(symbol) {
            if found.is_none_or(|(start, _, _)| position < start) {
                found = Some((position, position + symbol.len(), op));
            }
        }
    }
    for (start, end) in word_runs(body) {
        if &body[start..end] == "includes" && start > 0 {
            if found.is_none_or(|(s, _, _)| start < s) {
                found = Some((start, end, CompareOp::Includes));
            }
            break;
        }
    }
    found.map(|(start, end, op)| (op, start, end))
}
