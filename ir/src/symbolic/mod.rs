//! Symbolic expressions.
//!
//! Shapes, subset bounds, map ranges, interstate guards and symbol assignments
//! are all [`Expr`] trees. Expressions parse from and print to a small
//! Python-like syntax:
//!
//! ```text
//! N - 1          i * 2 + j       min(N, 32)
//! A[0] > 0       not (i < N)     x ** 2
//! ```
//!
//! Printing is canonical: `Expr::parse(&e.to_string())` yields `e` back, which
//! is what the portable form relies on.

mod expr;
mod parse;

pub use expr::{BinaryOp, Expr, UnaryOp};
