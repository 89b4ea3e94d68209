//! Expression tree for the legacy template grammar.
//!
//! The grammar is small enough to need no generated parser infrastructure: a
//! handful of node types, assembled by `adventure_parser` and walked by
//! whatever evaluator embeds this crate. Nothing here depends on a concrete
//! script runtime — a `Value::ScalarRef` is just a name until something
//! resolves it against a `scalars` table.

#![forbid(unsafe_code)]

/// A position in the source text of a template fragment.
///
/// Stored on every node that a `ParseError` might need to point at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A leaf value: a literal or a read of a named scalar.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A double-quoted string literal with the standard escapes resolved.
    Str(String),
    /// A backtick-delimited raw string, contents preserved verbatim.
    RawStr(String),
    /// A numeric literal, already promoted to `f64` if written as an integer.
    Num(f64),
    /// `$name` — a read of `scalars[name]`.
    ScalarRef(String),
}

/// `name(args...)` — a call into script-global scope.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
}

/// `name = expr` — writes `scalars[name]` and evaluates to the written value.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarAssign {
    pub name: String,
    pub value: Box<Expr>,
}

/// One production of the `expr` rule, tagged with the position it started at.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Value(Value),
    Call(Call),
    ScalarAssign(ScalarAssign),
}

impl Expr {
    #[must_use]
    pub const fn new(kind: ExprKind, position: Position) -> Self {
        Self { kind, position }
    }
}

/// `expr (';' expr)*` — a semicolon-separated sequence, valued as its last
/// element. The grammar forbids an empty sequence, so this always holds at
/// least one expression.
#[derive(Clone, Debug, PartialEq)]
pub struct ExprList {
    exprs: Vec<Expr>,
}

impl ExprList {
    /// Builds a sequence from at least one expression.
    ///
    /// # Panics
    ///
    /// Panics if `exprs` is empty — the grammar never produces this, so a
    /// panic here indicates a parser bug rather than bad input.
    #[must_use]
    pub fn new(exprs: Vec<Expr>) -> Self {
        assert!(!exprs.is_empty(), "ExprList must not be empty");
        Self { exprs }
    }

    #[must_use]
    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    /// The expression whose value is the sequence's value.
    #[must_use]
    pub fn last(&self) -> &Expr {
        self.exprs.last().expect("ExprList is never empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_list_last_is_the_tail() {
        let list = ExprList::new(vec![
            Expr::new(ExprKind::Value(Value::Num(1.0)), Position::default()),
            Expr::new(ExprKind::Value(Value::Num(2.0)), Position::default()),
        ]);
        assert_eq!(list.last().kind, ExprKind::Value(Value::Num(2.0)));
    }

    #[test]
    #[should_panic(expected = "ExprList must not be empty")]
    fn expr_list_rejects_empty() {
        ExprList::new(vec![]);
    }
}
