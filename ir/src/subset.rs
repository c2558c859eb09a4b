//! Multi-dimensional address subsets.
//!
//! A [`Subset`] is one [`Range`] per dimension with an inclusive end. The text
//! form follows slice notation with an exclusive end: `0:N, i, 2:M:2`.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{Error, Result, SubsetParseSnafu};
use crate::symbolic::{BinaryOp, Expr};

/// One dimension of a subset: `begin..=end` by `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub begin: Expr,
    pub end: Expr,
    pub step: Expr,
}

impl Range {
    pub fn new(begin: Expr, end: Expr, step: Expr) -> Self {
        Self { begin, end, step }
    }

    /// Single-index range `i..=i`.
    pub fn index(i: Expr) -> Self {
        Self { begin: i.clone(), end: i, step: Expr::Int(1) }
    }

    /// Full range over a dimension of extent `n`.
    pub fn full(n: Expr) -> Self {
        Self { begin: Expr::Int(0), end: (n - Expr::Int(1)).fold(), step: Expr::Int(1) }
    }

    pub fn is_index(&self) -> bool {
        self.begin == self.end
    }

    /// Number of points covered by the range.
    pub fn size(&self) -> Expr {
        if self.is_index() {
            return Expr::Int(1);
        }
        let extent = self.end.clone() - self.begin.clone();
        let count = match self.step.as_int() {
            Some(1) => extent,
            _ => Expr::binary(BinaryOp::FloorDiv, extent, self.step.clone()),
        };
        (count + Expr::Int(1)).fold()
    }

    fn exprs(&self) -> [&Expr; 3] {
        [&self.begin, &self.end, &self.step]
    }

    fn exprs_mut(&mut self) -> [&mut Expr; 3] {
        [&mut self.begin, &mut self.end, &mut self.step]
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_index() {
            return write!(f, "{}", self.begin);
        }
        let end = (self.end.clone() + Expr::Int(1)).fold();
        write!(f, "{}:{end}", self.begin)?;
        if self.step != Expr::Int(1) {
            write!(f, ":{}", self.step)?;
        }
        Ok(())
    }
}

/// Address subset of a data container, one range per dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subset {
    pub ranges: Vec<Range>,
}

impl Subset {
    pub fn new(ranges: Vec<Range>) -> Self {
        Self { ranges }
    }

    /// Subset covering a whole container of the given shape.
    ///
    /// Scalars (empty shape) are covered by the single index `0`.
    pub fn from_shape(shape: &[Expr]) -> Self {
        if shape.is_empty() {
            return Self { ranges: vec![Range::index(Expr::Int(0))] };
        }
        Self { ranges: shape.iter().cloned().map(Range::full).collect() }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut ranges = Vec::new();
        for dim in split_top_level(text, ',') {
            let parts = split_top_level(dim, ':');
            let parse = |part: &str| {
                Expr::parse(part.trim()).map_err(|e| Error::SubsetParse { input: text.to_string(), reason: e.to_string() })
            };
            let range = match parts.as_slice() {
                [index] => Range::index(parse(index)?),
                [begin, end] => Range::new(parse(begin)?, (parse(end)? - Expr::Int(1)).fold(), Expr::Int(1)),
                [begin, end, step] => Range::new(parse(begin)?, (parse(end)? - Expr::Int(1)).fold(), parse(step)?),
                _ => return SubsetParseSnafu { input: text, reason: format!("malformed range {dim:?}") }.fail(),
            };
            ranges.push(range);
        }
        ensure!(!ranges.is_empty(), SubsetParseSnafu { input: text, reason: "empty subset" });
        Ok(Self { ranges })
    }

    pub fn dims(&self) -> usize {
        self.ranges.len()
    }

    /// Per-dimension extents.
    pub fn size(&self) -> Vec<Expr> {
        self.ranges.iter().map(Range::size).collect()
    }

    /// Total number of elements, folded as far as the bounds allow.
    pub fn num_elements(&self) -> Expr {
        self.size().into_iter().reduce(|acc, n| (acc * n).fold()).unwrap_or(Expr::Int(1))
    }

    /// Total number of elements when every bound is constant.
    pub fn num_elements_exact(&self) -> Option<i64> {
        self.num_elements().as_int()
    }

    pub fn free_symbols(&self) -> IndexSet<String> {
        self.ranges.iter().flat_map(|r| r.exprs()).flat_map(Expr::free_symbols).collect()
    }

    /// Names the bounds dereference through indexing.
    pub fn data_references(&self) -> IndexSet<String> {
        self.ranges.iter().flat_map(|r| r.exprs()).flat_map(Expr::data_references).collect()
    }

    pub fn rename(&mut self, old: &str, new: &str) {
        for range in &mut self.ranges {
            range.exprs_mut().into_iter().for_each(|e| e.rename(old, new));
        }
    }
}

/// Splits on `sep` outside of parentheses and brackets.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts.retain(|p| !p.trim().is_empty() || sep == ':');
    parts
}

impl FromStr for Subset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}
