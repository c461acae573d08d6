//! Arithmetic formulas over base metrics.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | atom
//! atom   := number | identifier | '(' expr ')'
//! ```
//!
//! Identifiers must name a base metric. Division by zero evaluates to 0.

use std::collections::HashMap;
use thiserror::Error;

/// Metrics a formula may reference
pub const BASE_METRICS: [&str; 10] = [
    "revenue",
    "orders",
    "aov",
    "ad_spend",
    "roas",
    "new_customers",
    "impressions",
    "clicks",
    "ctr",
    "cpc",
];

pub const MAX_FORMULA_LEN: usize = 500;

pub fn is_base_metric(name: &str) -> bool {
    BASE_METRICS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("formula cannot be empty")]
    Empty,
    #[error("formula exceeds {MAX_FORMULA_LEN} characters")]
    TooLong,
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unknown metric '{0}'")]
    UnknownMetric(String),
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unexpected token at position {0}")]
    UnexpectedToken(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

/// Parsed formula
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Metric(String),
    Neg(Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, FormulaError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }
            '+' | '-' | '*' | '/' | '(' | ')' => {
                let token = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                };
                tokens.push((i, token));
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::InvalidNumber(literal.clone()))?;
                tokens.push((start, Token::Number(value)));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push((start, Token::Ident(ident.to_ascii_lowercase())));
            }
            other => {
                return Err(FormulaError::UnexpectedChar {
                    ch: other,
                    position: i,
                });
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(BinOp::Add),
            Some(Token::Minus) => Some(BinOp::Sub),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(BinOp::Mul),
            Some(Token::Slash) => Some(BinOp::Div),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, FormulaError> {
        match self.next() {
            Some((_, Token::Number(value))) => Ok(Expr::Number(value)),
            Some((_, Token::Ident(name))) => {
                if is_base_metric(&name) {
                    Ok(Expr::Metric(name))
                } else {
                    Err(FormulaError::UnknownMetric(name))
                }
            }
            Some((_, Token::LParen)) => {
                let inner = self.expr()?;
                match self.next() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((position, _)) => Err(FormulaError::UnexpectedToken(position)),
                    None => Err(FormulaError::UnexpectedEnd),
                }
            }
            Some((position, _)) => Err(FormulaError::UnexpectedToken(position)),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }
}

/// Parse and validate a formula
pub fn parse(input: &str) -> Result<Expr, FormulaError> {
    if input.trim().is_empty() {
        return Err(FormulaError::Empty);
    }
    if input.chars().count() > MAX_FORMULA_LEN {
        return Err(FormulaError::TooLong);
    }

    let mut parser = Parser {
        tokens: tokenize(input)?,
        pos: 0,
    };
    let expr = parser.expr()?;
    if let Some((position, _)) = parser.tokens.get(parser.pos) {
        return Err(FormulaError::UnexpectedToken(*position));
    }
    Ok(expr)
}

impl Expr {
    /// Evaluate against metric values; missing metrics count as 0
    pub fn evaluate(&self, values: &HashMap<&str, f64>) -> f64 {
        match self {
            Expr::Number(value) => *value,
            Expr::Metric(name) => values.get(name.as_str()).copied().unwrap_or(0.0),
            Expr::Neg(inner) => -inner.evaluate(values),
            Expr::Binary(lhs, op, rhs) => {
                let lhs = lhs.evaluate(values);
                let rhs = rhs.evaluate(values);
                match op {
                    BinOp::Add => lhs + rhs,
                    BinOp::Sub => lhs - rhs,
                    BinOp::Mul => lhs * rhs,
                    BinOp::Div if rhs == 0.0 => 0.0,
                    BinOp::Div => lhs / rhs,
                }
            }
        }
    }

    /// Base metrics referenced by this formula
    pub fn metrics(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_metrics(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_metrics<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Metric(name) => out.push(name),
            Expr::Neg(inner) => inner.collect_metrics(out),
            Expr::Binary(lhs, _, rhs) => {
                lhs.collect_metrics(out);
                rhs.collect_metrics(out);
            }
        }
    }
}
