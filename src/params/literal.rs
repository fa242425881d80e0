//! Literal values in parameter files.
//!
//! Values use a small literal syntax: integers, floats, quoted strings,
//! `True`/`False`, and parenthesised or bracketed tuples of literals.

use std::fmt;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Integer literal, e.g. `4`.
    Int(i64),
    /// Float literal, e.g. `0.65` or `1e-3`.
    Float(f64),
    /// Quoted string literal.
    Text(String),
    /// `True` or `False`.
    Bool(bool),
    /// Tuple or list literal.
    Tuple(Vec<ParamValue>),
}

impl ParamValue {
    /// Returns the value as a float if it is numeric.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a boolean. Integers count as truthy when non-zero.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Returns the value as an RGB triple if it is a numeric 3-tuple.
    #[must_use]
    pub fn as_triple(&self) -> Option<[f64; 3]> {
        match self {
            Self::Tuple(items) if items.len() == 3 => {
                let mut out = [0.0; 3];
                for (slot, item) in out.iter_mut().zip(items) {
                    *slot = item.as_f64()?;
                }
                Some(out)
            }
            _ => None,
        }
    }
}

/// Formats a float the way the parameter files write them: integral values
/// keep a trailing `.0`.
pub(crate) fn format_float(f: f64, out: &mut impl fmt::Write) -> fmt::Result {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        write!(out, "{f:.1}")
    } else {
        write!(out, "{f}")
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => format_float(*x, f),
            Self::Text(s) => f.write_str(s),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Self::Text(s) => write!(f, "'{s}'")?,
                        other => write!(f, "{other}")?,
                    }
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Parses a literal. Returns a human-readable message on failure.
pub fn parse_literal(input: &str) -> Result<ParamValue, String> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(format!(
            "unexpected trailing input '{}'",
            parser.chars[parser.pos..].iter().collect::<String>()
        ));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<ParamValue, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("empty value".to_string()),
            Some('\'' | '"') => self.string(),
            Some('(') => self.sequence(')', true),
            Some('[') => self.sequence(']', false),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.keyword(),
            Some(c) => Err(format!("unexpected character '{c}'")),
        }
    }

    fn keyword(&mut self) -> Result<ParamValue, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" => Ok(ParamValue::Bool(true)),
            "False" => Ok(ParamValue::Bool(false)),
            _ => Err(format!("unknown identifier '{word}' (strings must be quoted)")),
        }
    }

    fn number(&mut self) -> Result<ParamValue, String> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    if matches!(self.chars.get(self.pos + 1), Some('-' | '+')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();
        if is_float {
            text.parse::<f64>()
                .map(ParamValue::Float)
                .map_err(|_| format!("invalid float '{text}'"))
        } else {
            text.parse::<i64>()
                .map(ParamValue::Int)
                .map_err(|_| format!("invalid integer '{text}'"))
        }
    }

    fn string(&mut self) -> Result<ParamValue, String> {
        let Some(quote) = self.peek() else {
            return Err("expected string".to_string());
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err("unterminated string".to_string());
            };
            self.pos += 1;
            if c == quote {
                return Ok(ParamValue::Text(out));
            }
            if c == '\\' {
                let Some(escaped) = self.peek() else {
                    return Err("unterminated escape".to_string());
                };
                self.pos += 1;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            } else {
                out.push(c);
            }
        }
    }

    /// Parses `( ... )` or `[ ... ]`. A parenthesised single value without a
    /// trailing comma is just that value.
    fn sequence(&mut self, close: char, paren: bool) -> Result<ParamValue, String> {
        self.pos += 1;
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    saw_comma = true;
                    self.pos += 1;
                }
                Some(c) if c == close => {}
                Some(c) => return Err(format!("expected ',' or '{close}', found '{c}'")),
                None => return Err(format!("missing '{close}'")),
            }
        }
        if paren && items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(ParamValue::Tuple(items))
    }
}
