//! AST for condition, update and projection expressions.
//!
//! Attribute references are top-level names only: either a literal
//! identifier or a `#placeholder` that the evaluator resolves through the
//! request's name map.

use std::fmt;

/// Condition, filter or key-condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `left op right`
    Compare {
        /// Left-hand operand.
        left: Operand,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand operand.
        right: Operand,
    },
    /// `value BETWEEN low AND high`
    Between {
        /// Value to test.
        value: Operand,
        /// Lower bound (inclusive).
        low: Operand,
        /// Upper bound (inclusive).
        high: Operand,
    },
    /// `left AND right` or `left OR right`
    Logical {
        /// Logical operator.
        op: LogicalOp,
        /// Left-hand expression.
        left: Box<Expr>,
        /// Right-hand expression.
        right: Box<Expr>,
    },
    /// `NOT expr`
    Not(Box<Expr>),
    /// `function(args...)`
    Function {
        /// Function name.
        name: FunctionName,
        /// Function arguments.
        args: Vec<Operand>,
    },
}

impl Expr {
    /// The operands of a top-level `AND` chain, or the expression itself.
    #[must_use]
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Self::Logical {
                op: LogicalOp::And,
                left,
                right,
            } => {
                let mut parts = left.conjuncts();
                parts.extend(right.conjuncts());
                parts
            }
            other => vec![other],
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `AND`
    And,
    /// `OR`
    Or,
}

/// Condition functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionName {
    /// `attribute_exists(name)`
    AttributeExists,
    /// `attribute_not_exists(name)`
    AttributeNotExists,
    /// `begins_with(name, prefix)`
    BeginsWith,
    /// `contains(name, operand)`
    Contains,
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AttributeExists => "attribute_exists",
            Self::AttributeNotExists => "attribute_not_exists",
            Self::BeginsWith => "begins_with",
            Self::Contains => "contains",
        })
    }
}

/// A value producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Attribute reference: `Name` or `#placeholder`.
    Name(String),
    /// Value reference, including the leading colon: `:v0`.
    Value(String),
}

/// Update expression clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpr {
    /// `SET name = operand`
    pub set_actions: Vec<(String, Operand)>,
    /// `REMOVE name`
    pub remove_names: Vec<String>,
    /// `ADD name operand`
    pub add_actions: Vec<(String, Operand)>,
    /// `DELETE name operand`
    pub delete_actions: Vec<(String, Operand)>,
}

impl UpdateExpr {
    /// Returns `true` if no clause has an action.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set_actions.is_empty()
            && self.remove_names.is_empty()
            && self.add_actions.is_empty()
            && self.delete_actions.is_empty()
    }

    /// Every attribute reference the update writes to.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.set_actions
            .iter()
            .map(|(n, _)| n.as_str())
            .chain(self.remove_names.iter().map(String::as_str))
            .chain(self.add_actions.iter().map(|(n, _)| n.as_str()))
            .chain(self.delete_actions.iter().map(|(n, _)| n.as_str()))
    }
}
