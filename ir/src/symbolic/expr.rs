use std::fmt;
use std::ops;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{Error, NonFiniteFloatSnafu, Result};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Binary operators, from arithmetic to boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

pub(super) const PREC_NOT: u8 = 3;
pub(super) const PREC_NEG: u8 = 7;
const PREC_ATOM: u8 = 9;

impl BinaryOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    pub const fn is_comparison(&self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne)
    }

    pub(super) const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::FloorDiv | Self::Mod => 6,
            Self::Pow => 8,
        }
    }

    const fn is_right_assoc(&self) -> bool {
        matches!(self, Self::Pow)
    }
}

/// Symbolic expression tree.
///
/// `Index` is the only form that reads runtime data (`A[i]`); everything else
/// is a function of symbols and literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Expr {
    Int(i64),
    /// Always finite; see [`Expr::float`].
    Float(f64),
    Bool(bool),
    Symbol(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call { func: String, args: Vec<Expr> },
    Index { data: String, indices: Vec<Expr> },
}

impl Expr {
    pub const fn int(value: i64) -> Self {
        Self::Int(value)
    }

    /// Float literal. Infinities and NaN have no text form and are rejected.
    pub fn float(value: f64) -> Result<Self> {
        ensure!(value.is_finite(), NonFiniteFloatSnafu { value });
        Ok(Self::Float(value))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn parse(text: &str) -> Result<Self> {
        super::parse::parse(text)
    }

    pub(super) fn precedence(&self) -> u8 {
        match self {
            Self::Int(v) if *v < 0 => PREC_NEG,
            Self::Float(v) if v.is_sign_negative() => PREC_NEG,
            Self::Unary(UnaryOp::Neg, _) => PREC_NEG,
            Self::Unary(UnaryOp::Not, _) => PREC_NOT,
            Self::Binary(op, ..) => op.precedence(),
            _ => PREC_ATOM,
        }
    }

    /// Whether the expression is a literal that always holds.
    pub fn is_always_true(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(v) => *v != 0,
            _ => false,
        }
    }

    /// Pre-order traversal.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Self::Unary(_, operand) => operand.visit(f),
            Self::Binary(_, lhs, rhs) => {
                lhs.visit(f);
                rhs.visit(f);
            }
            Self::Call { args: children, .. } | Self::Index { indices: children, .. } => {
                children.iter().for_each(|c| c.visit(f));
            }
            Self::Int(_) | Self::Float(_) | Self::Bool(_) | Self::Symbol(_) => {}
        }
    }

    fn visit_mut(&mut self, f: &mut impl FnMut(&mut Expr)) {
        f(self);
        match self {
            Self::Unary(_, operand) => operand.visit_mut(f),
            Self::Binary(_, lhs, rhs) => {
                lhs.visit_mut(f);
                rhs.visit_mut(f);
            }
            Self::Call { args: children, .. } | Self::Index { indices: children, .. } => {
                children.iter_mut().for_each(|c| c.visit_mut(f));
            }
            Self::Int(_) | Self::Float(_) | Self::Bool(_) | Self::Symbol(_) => {}
        }
    }

    /// Names the expression reads: plain symbols and indexed data names.
    ///
    /// Function names of calls are not included.
    pub fn free_symbols(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        self.visit(&mut |e| match e {
            Self::Symbol(name) | Self::Index { data: name, .. } => {
                names.insert(name.clone());
            }
            _ => {}
        });
        names
    }

    /// Names dereferenced through indexing (`name[...]`).
    pub fn data_references(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        self.visit(&mut |e| {
            if let Self::Index { data, .. } = e {
                names.insert(data.clone());
            }
        });
        names
    }

    /// Renames every symbol or indexed data name equal to `old`.
    pub fn rename(&mut self, old: &str, new: &str) {
        self.visit_mut(&mut |e| match e {
            Self::Symbol(name) | Self::Index { data: name, .. } if name.as_str() == old => *name = new.to_string(),
            _ => {}
        });
    }

    /// Integer value after constant folding, if the expression is constant.
    pub fn as_int(&self) -> Option<i64> {
        match self.fold() {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Constant folding plus collapsing of constant offsets (`(N - 1) + 1` is `N`).
    pub fn fold(&self) -> Expr {
        match self {
            Self::Unary(op, operand) => {
                let operand = operand.fold();
                match (op, operand) {
                    (UnaryOp::Neg, Self::Int(v)) if v != i64::MIN => Self::Int(-v),
                    (UnaryOp::Neg, Self::Float(v)) => Self::Float(-v),
                    (UnaryOp::Not, Self::Bool(b)) => Self::Bool(!b),
                    (op, operand) => Self::unary(*op, operand),
                }
            }
            Self::Binary(op, lhs, rhs) => fold_binary(*op, lhs.fold(), rhs.fold()),
            Self::Call { func, args } => {
                let args: Vec<Expr> = args.iter().map(Expr::fold).collect();
                let ints: Option<Vec<i64>> =
                    args.iter().map(|a| if let Self::Int(v) = a { Some(*v) } else { None }).collect();
                match (func.as_str(), ints) {
                    ("min", Some(values)) if !values.is_empty() => Self::Int(values.into_iter().min().unwrap_or(0)),
                    ("max", Some(values)) if !values.is_empty() => Self::Int(values.into_iter().max().unwrap_or(0)),
                    _ => Self::Call { func: func.clone(), args },
                }
            }
            Self::Index { data, indices } => {
                Self::Index { data: data.clone(), indices: indices.iter().map(Expr::fold).collect() }
            }
            Self::Int(_) | Self::Float(_) | Self::Bool(_) | Self::Symbol(_) => self.clone(),
        }
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) { q.checked_sub(1) } else { Some(q) }
}

fn eval_int(op: BinaryOp, a: i64, b: i64) -> Option<Expr> {
    use BinaryOp::*;
    Some(match op {
        Add => Expr::Int(a.checked_add(b)?),
        Sub => Expr::Int(a.checked_sub(b)?),
        Mul => Expr::Int(a.checked_mul(b)?),
        Div if b != 0 && a % b == 0 => Expr::Int(a / b),
        Div => return None,
        FloorDiv => Expr::Int(floor_div(a, b)?),
        Mod => Expr::Int(a.checked_sub(floor_div(a, b)?.checked_mul(b)?)?),
        Pow => Expr::Int(a.checked_pow(u32::try_from(b).ok()?)?),
        Lt => Expr::Bool(a < b),
        Le => Expr::Bool(a <= b),
        Gt => Expr::Bool(a > b),
        Ge => Expr::Bool(a >= b),
        Eq => Expr::Bool(a == b),
        Ne => Expr::Bool(a != b),
        And | Or => return None,
    })
}

/// Splits `e` into `base + offset` with a constant offset.
fn split_offset(e: Expr) -> (Option<Expr>, i64) {
    match e {
        Expr::Int(k) => (None, k),
        Expr::Binary(op @ (BinaryOp::Add | BinaryOp::Sub), base, k) => match (op, *k) {
            (BinaryOp::Add, Expr::Int(k)) => (Some(*base), k),
            (BinaryOp::Sub, Expr::Int(k)) if k != i64::MIN => (Some(*base), -k),
            (op, k) => (Some(Expr::binary(op, *base, k)), 0),
        },
        other => (Some(other), 0),
    }
}

fn join_offset(base: Option<Expr>, offset: i64) -> Expr {
    match base {
        None => Expr::Int(offset),
        Some(base) if offset == 0 => base,
        Some(base) if offset > 0 => Expr::binary(BinaryOp::Add, base, Expr::Int(offset)),
        Some(base) => Expr::binary(BinaryOp::Sub, base, Expr::Int(-offset)),
    }
}

fn fold_binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    use BinaryOp::*;

    if let (Expr::Int(a), Expr::Int(b)) = (&lhs, &rhs)
        && let Some(folded) = eval_int(op, *a, *b)
    {
        return folded;
    }

    match (op, lhs, rhs) {
        (And, Expr::Bool(a), Expr::Bool(b)) => Expr::Bool(a && b),
        (Or, Expr::Bool(a), Expr::Bool(b)) => Expr::Bool(a || b),
        (Mul, Expr::Int(1), x) | (Mul, x, Expr::Int(1)) => x,
        (FloorDiv | Div, x, Expr::Int(1)) => x,
        (Add, Expr::Int(k), x) | (Add, x, Expr::Int(k)) => {
            let (base, offset) = split_offset(x);
            match offset.checked_add(k) {
                Some(total) => join_offset(base, total),
                None => Expr::binary(Add, join_offset(base, offset), Expr::Int(k)),
            }
        }
        (Sub, x, Expr::Int(k)) if k != i64::MIN => {
            let (base, offset) = split_offset(x);
            match offset.checked_sub(k) {
                Some(total) => join_offset(base, total),
                None => Expr::binary(Sub, join_offset(base, offset), Expr::Int(k)),
            }
        }
        (Sub, x, y) if x == y && !matches!(x, Expr::Float(_)) => Expr::Int(0),
        (op, lhs, rhs) => Expr::binary(op, lhs, rhs),
    }
}

impl ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Add, self, rhs)
    }
}

impl ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Sub, self, rhs)
    }
}

impl ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Mul, self, rhs)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Self::Symbol(name.to_string())
    }
}

impl FromStr for Expr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Expr> for String {
    fn from(expr: Expr) -> Self {
        expr.to_string()
    }
}

impl TryFrom<String> for Expr {
    type Error = Error;

    fn try_from(text: String) -> Result<Self> {
        Self::parse(&text)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expr, parens: bool) -> fmt::Result {
    if parens { write!(f, "({operand})") } else { write!(f, "{operand}") }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Symbol(name) => f.write_str(name),
            Self::Unary(UnaryOp::Neg, operand) => {
                // `-(1)` keeps a negated literal distinct from the literal `-1`.
                let parens = operand.precedence() < PREC_NEG || matches!(**operand, Self::Int(_) | Self::Float(_));
                f.write_str("-")?;
                write_operand(f, operand, parens)
            }
            Self::Unary(UnaryOp::Not, operand) => {
                f.write_str("not ")?;
                write_operand(f, operand, operand.precedence() < PREC_NOT)
            }
            Self::Binary(op, lhs, rhs) => {
                let prec = op.precedence();
                let (lp, rp) = (lhs.precedence(), rhs.precedence());
                let lhs_parens = lp < prec || (op.is_right_assoc() && lp == prec);
                let rhs_parens = rp < prec || (!op.is_right_assoc() && rp == prec);
                write_operand(f, lhs, lhs_parens)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, rhs, rhs_parens)
            }
            Self::Call { func, args } => {
                write!(f, "{func}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Self::Index { data, indices } => {
                write!(f, "{data}[")?;
                write_list(f, indices)?;
                f.write_str("]")
            }
        }
    }
}
