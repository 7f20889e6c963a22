use std::fmt;

use super::{Comma, Value};

/// Scalar and boolean expressions as they appear in `WHERE`, `HAVING`,
/// `VALUES` and `SET` clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Paren(Box<Expr>),
    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Between {
        negated: bool,
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    Column(String),
    Literal(Value),
    /// Parenthesized value list, the right-hand side of `IN`.
    Tuple(Vec<Expr>),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn comparison(op: ComparisonOp, left: Expr, right: Expr) -> Self {
        Expr::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::And(left, right) => write!(f, "{} and {}", left, right),
            Expr::Or(left, right) => write!(f, "{} or {}", left, right),
            Expr::Not(expr) => write!(f, "not {}", expr),
            Expr::Paren(expr) => write!(f, "({})", expr),
            Expr::Comparison { op, left, right } => {
                write!(f, "{} {} {}", left, op.as_str(), right)
            }
            Expr::Between {
                negated,
                expr,
                low,
                high,
            } => {
                let op = if *negated { "not between" } else { "between" };
                write!(f, "{} {} {} and {}", expr, op, low, high)
            }
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Tuple(values) => write!(f, "({})", Comma(values)),
        }
    }
}

/// Binary comparison operators the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::In => "in",
            ComparisonOp::NotIn => "not in",
        }
    }

    /// The operator with its operands swapped: `5 < id` means `id > 5`.
    /// `IN` has no mirrored form.
    pub fn mirrored(&self) -> Option<ComparisonOp> {
        match self {
            ComparisonOp::Eq => Some(ComparisonOp::Eq),
            ComparisonOp::Ne => Some(ComparisonOp::Ne),
            ComparisonOp::Lt => Some(ComparisonOp::Gt),
            ComparisonOp::Le => Some(ComparisonOp::Ge),
            ComparisonOp::Gt => Some(ComparisonOp::Lt),
            ComparisonOp::Ge => Some(ComparisonOp::Le),
            ComparisonOp::In | ComparisonOp::NotIn => None,
        }
    }
}

/// One `column = expr` assignment in a `SET` or `ON DUPLICATE KEY UPDATE`
/// list.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: Expr) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}
