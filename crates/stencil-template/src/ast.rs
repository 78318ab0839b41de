/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Condition expression AST.
//!
//! Conditions are parsed into an explicit tree before evaluation rather
//! than being re-scanned per combinator. `and` binds tighter than `or`
//! and `xor`, which chain left to right at equal precedence; a chain of
//! `xor` therefore evaluates as odd parity over its operands.

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single reference test.
    Clause(Clause),

    /// Both sides must hold.
    And(Box<Condition>, Box<Condition>),

    /// At least one side must hold.
    Or(Box<Condition>, Box<Condition>),

    /// The sides must disagree.
    Xor(Box<Condition>, Box<Condition>),
}

/// One reference test within a condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Leading `!`: negate the outcome of the test.
    pub negated: bool,

    /// The dotted reference under test.
    pub reference: String,

    /// How the resolved reference is judged.
    pub test: ClauseTest,
}

/// The test applied to a clause's resolved reference.
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseTest {
    /// No operator: the outcome is the reference's truthiness.
    Truthy,

    /// An operator comparing the reference against literal text.
    Compare {
        op: CompareOp,
        /// Everything after the operator up to the clause boundary, trimmed.
        literal: String,
    },
}

/// Comparison operators available in clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`: string equality, `inputs.*` references only.
    Eq,

    /// `!=`: string inequality, `inputs.*` references only.
    Ne,

    /// `>`: numeric, `inputs.*` references only.
    Gt,

    /// `>=`: numeric, `inputs.*` references only.
    Ge,

    /// `<`: numeric, `inputs.*` references only.
    Lt,

    /// `<=`: numeric, `inputs.*` references only.
    Le,

    /// `includes`: array membership or substring test, any namespace.
    Includes,
}
