//! Recursive-descent parser for symbolic expressions.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons, `+ -`,
//! `* / // %`, unary `-`, `**` (right associative), calls and indexing.

use snafu::ensure;

use super::expr::{BinaryOp, Expr, UnaryOp};
use crate::error::{ExprParseSnafu, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Ident(String),
    Punct(&'static str),
}

const PUNCTUATION: [&str; 20] =
    ["**", "//", "<=", ">=", "==", "!=", "+", "-", "*", "/", "%", "<", ">", "(", ")", "[", "]", ",", "=", ":"];

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        if c.is_ascii_digit() || (c == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)) {
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                pos += 1;
            }
            if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
                let mut exp = pos + 1;
                if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
                    exp += 1;
                }
                if exp < bytes.len() && bytes[exp].is_ascii_digit() {
                    pos = exp;
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
            }
            tokens.push((Token::Number(input[start..pos].to_string()), start));
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            tokens.push((Token::Ident(input[start..pos].to_string()), start));
            continue;
        }

        let Some(punct) = PUNCTUATION.iter().find(|p| input[pos..].starts_with(**p)) else {
            return ExprParseSnafu { input, offset: pos, reason: format!("unexpected character {:?}", c as char) }
                .fail();
        };
        tokens.push((Token::Punct(punct), start));
        pos += punct.len();
    }

    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.input.len(), |(_, o)| *o)
    }

    fn error<T>(&self, reason: impl Into<String>) -> Result<T> {
        ExprParseSnafu { input: self.input, offset: self.offset(), reason: reason.into() }.fail()
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<()> {
        if self.eat_punct(punct) { Ok(()) } else { self.error(format!("expected {punct:?}")) }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") {
            lhs = Expr::binary(BinaryOp::Or, lhs, self.parse_and()?);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_not()?;
        while self.eat_keyword("and") {
            lhs = Expr::binary(BinaryOp::And, lhs, self.parse_not()?);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat_keyword("not") {
            return Ok(Expr::unary(UnaryOp::Not, self.parse_not()?));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct("<")) => BinaryOp::Lt,
                Some(Token::Punct("<=")) => BinaryOp::Le,
                Some(Token::Punct(">")) => BinaryOp::Gt,
                Some(Token::Punct(">=")) => BinaryOp::Ge,
                Some(Token::Punct("==")) => BinaryOp::Eq,
                Some(Token::Punct("!=")) => BinaryOp::Ne,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Expr::binary(op, lhs, self.parse_additive()?);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct("+")) => BinaryOp::Add,
                Some(Token::Punct("-")) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Expr::binary(op, lhs, self.parse_term()?);
        }
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct("*")) => BinaryOp::Mul,
                Some(Token::Punct("/")) => BinaryOp::Div,
                Some(Token::Punct("//")) => BinaryOp::FloorDiv,
                Some(Token::Punct("%")) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Expr::binary(op, lhs, self.parse_unary()?);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat_punct("-") {
            // A minus directly before a number is a negative literal, unless
            // the number is the base of a power: `-2 ** 2` is `-(2 ** 2)`.
            if let Some(Token::Number(text)) = self.peek()
                && !matches!(self.peek_at(1), Some(Token::Punct("**")))
            {
                let literal = self.number(&format!("-{text}"))?;
                self.pos += 1;
                return Ok(literal);
            }
            return Ok(Expr::unary(UnaryOp::Neg, self.parse_unary()?));
        }
        if self.eat_punct("+") {
            return self.parse_unary();
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_postfix()?;
        if self.eat_punct("**") {
            return Ok(Expr::binary(BinaryOp::Pow, base, self.parse_unary()?));
        }
        Ok(base)
    }

    fn parse_list(&mut self, close: &str) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat_punct(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_or()?);
            if self.eat_punct(close) {
                return Ok(items);
            }
            self.expect_punct(",")?;
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        match self.peek().cloned() {
            Some(Token::Number(text)) => {
                let literal = self.number(&text)?;
                self.pos += 1;
                Ok(literal)
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                match name.as_str() {
                    "True" => return Ok(Expr::Bool(true)),
                    "False" => return Ok(Expr::Bool(false)),
                    "and" | "or" | "not" => return self.error(format!("unexpected keyword {name:?}")),
                    _ => {}
                }
                if self.eat_punct("(") {
                    let args = self.parse_list(")")?;
                    return Ok(Expr::Call { func: name, args });
                }
                if self.eat_punct("[") {
                    let indices = self.parse_list("]")?;
                    return Ok(Expr::Index { data: name, indices });
                }
                Ok(Expr::Symbol(name))
            }
            Some(Token::Punct("(")) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Some(Token::Punct(p)) => self.error(format!("unexpected {p:?}")),
            None => self.error("unexpected end of input"),
        }
    }

    fn number(&self, text: &str) -> Result<Expr> {
        if text.contains(['.', 'e', 'E']) {
            match text.parse::<f64>() {
                Ok(v) => Expr::float(v).or_else(|_| self.error(format!("float literal {text:?} is out of range"))),
                Err(e) => self.error(format!("invalid float literal {text:?}: {e}")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => Ok(Expr::Int(v)),
                Err(e) => self.error(format!("invalid integer literal {text:?}: {e}")),
            }
        }
    }
}

pub(super) fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    ensure!(!tokens.is_empty(), ExprParseSnafu { input, offset: 0usize, reason: "empty expression" });

    let mut parser = Parser { input, tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return parser.error("trailing input");
    }
    Ok(expr)
}
