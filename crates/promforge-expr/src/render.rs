//! Rendering expression trees back to PromQL source text.
//!
//! Rendering is pure and deterministic. The compact form (`Display`, or
//! [`Expr::render`] with indent 0) produces a single line; a positive indent
//! produces multi-line output with aggregate bodies, call arguments, and
//! parenthesized children nested one level deeper. Re-parsing the output
//! with a standard PromQL parser reconstructs an equivalent tree for
//! matcher sets and operator structure.

use std::fmt::Write as _;
use std::time::Duration;

use crate::expr::{BinOp, Expr, MatrixSelector, VectorSelector};

/// Formats a duration in PromQL notation (`5m`, `1h30m`, `90s` as `1m30s`).
///
/// Components render largest unit first and zero components are omitted; a
/// zero duration renders as `0s`. Sub-millisecond precision is truncated.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 && millis == 0 {
        return "0s".to_string();
    }

    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3_600;
    secs %= 3_600;
    let minutes = secs / 60;
    secs %= 60;

    let mut out = String::new();
    for (amount, unit) in [
        (days, "d"),
        (hours, "h"),
        (minutes, "m"),
        (secs, "s"),
        (u64::from(millis), "ms"),
    ] {
        if amount > 0 {
            let _ = write!(out, "{amount}{unit}");
        }
    }
    out
}

impl std::fmt::Display for VectorSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.metric())?;
        if self.matchers().is_empty() {
            return Ok(());
        }
        write!(f, "{{")?;
        for (i, matcher) in self.matchers().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{matcher}")?;
        }
        write!(f, "}}")
    }
}

impl std::fmt::Display for MatrixSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.vector, format_duration(self.range))
    }
}

/// Whether a binary operand needs parentheses to preserve evaluation order.
///
/// All supported operators are left-associative, so a right-hand child of
/// equal precedence needs parentheses while a left-hand one does not.
fn operand_needs_parens(parent: BinOp, child: &Expr, is_rhs: bool) -> bool {
    match child {
        Expr::Binary(b) => {
            b.op.precedence() < parent.precedence()
                || (is_rhs && b.op.precedence() == parent.precedence())
        }
        _ => false,
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vector(v) => write!(f, "{v}"),
            Self::Matrix(m) => write!(f, "{m}"),
            Self::Aggregate(a) => {
                write!(f, "{}", a.op.as_str())?;
                if a.grouping.is_empty() {
                    write!(f, "({})", a.body)
                } else {
                    write!(f, " by ({}) ({})", a.grouping.join(", "), a.body)
                }
            }
            Self::Binary(b) => {
                if operand_needs_parens(b.op, &b.lhs, false) {
                    write!(f, "({})", b.lhs)?;
                } else {
                    write!(f, "{}", b.lhs)?;
                }
                write!(f, " {} ", b.op.as_str())?;
                if operand_needs_parens(b.op, &b.rhs, true) {
                    write!(f, "({})", b.rhs)
                } else {
                    write!(f, "{}", b.rhs)
                }
            }
            Self::Call(c) => {
                write!(f, "{}(", c.func.name())?;
                for (i, arg) in c.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::Paren(e) => write!(f, "({e})"),
        }
    }
}

impl Expr {
    /// Renders the expression to PromQL source text.
    ///
    /// An `indent` of 0 produces the compact single-line form (identical to
    /// `Display`); a positive `indent` produces multi-line output indented
    /// by that many spaces per nesting level.
    #[must_use]
    pub fn render(&self, indent: usize) -> String {
        if indent == 0 {
            return self.to_string();
        }
        let mut out = String::new();
        write_pretty(&mut out, self, indent, 0);
        out
    }
}

fn write_pretty(out: &mut String, expr: &Expr, width: usize, level: usize) {
    let pad = " ".repeat(width * level);
    match expr {
        Expr::Vector(_) | Expr::Matrix(_) | Expr::Number(_) => {
            let _ = write!(out, "{pad}{expr}");
        }
        Expr::Aggregate(a) => {
            let _ = write!(out, "{pad}{}", a.op.as_str());
            if a.grouping.is_empty() {
                out.push_str("(\n");
            } else {
                let _ = write!(out, " by ({}) (\n", a.grouping.join(", "));
            }
            write_pretty(out, &a.body, width, level + 1);
            let _ = write!(out, "\n{pad})");
        }
        Expr::Binary(b) => {
            write_operand(out, b.op, &b.lhs, false, width, level);
            let _ = write!(out, "\n{pad}{}\n", b.op.as_str());
            write_operand(out, b.op, &b.rhs, true, width, level);
        }
        Expr::Call(c) => {
            let _ = write!(out, "{pad}{}(\n", c.func.name());
            for (i, arg) in c.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                write_pretty(out, arg, width, level + 1);
            }
            let _ = write!(out, "\n{pad})");
        }
        Expr::Paren(e) => {
            let _ = write!(out, "{pad}(\n");
            write_pretty(out, e, width, level + 1);
            let _ = write!(out, "\n{pad})");
        }
    }
}

fn write_operand(
    out: &mut String,
    parent: BinOp,
    child: &Expr,
    is_rhs: bool,
    width: usize,
    level: usize,
) {
    if operand_needs_parens(parent, child, is_rhs) {
        let pad = " ".repeat(width * level);
        let _ = write!(out, "{pad}(\n");
        write_pretty(out, child, width, level + 1);
        let _ = write!(out, "\n{pad})");
    } else {
        write_pretty(out, child, width, level);
    }
}
