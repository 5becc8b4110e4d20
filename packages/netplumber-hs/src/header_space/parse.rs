//! Text form of header spaces
//!
//! ```text
//! hs    := "(nil)" | "(" term (" + " term)* ")"
//! term  := vector | "(" vector " - " hs ")"
//! ```
//!
//! The parser is more lenient than the printer: it also takes a bare
//! vector, a `+`-list without outer parentheses, redundant grouping and a
//! bare vector with a trailing exception clause (`v - (d1 + d2)`).

use super::set::HeaderSpace;
use super::term::Term;
use crate::error::{HsError, Result};
use crate::ternary::TernaryVector;
use std::fmt;
use std::str::FromStr;

fn write_list(f: &mut fmt::Formatter<'_>, terms: &[Term]) -> fmt::Result {
    f.write_str("(")?;
    for (i, t) in terms.iter().enumerate() {
        if i > 0 {
            f.write_str(" + ")?;
        }
        write_term(f, t)?;
    }
    f.write_str(")")
}

fn write_term(f: &mut fmt::Formatter<'_>, t: &Term) -> fmt::Result {
    if t.is_leaf() {
        return write!(f, "{}", t.vector);
    }
    write!(f, "({} - ", t.vector)?;
    write_list(f, &t.diff)?;
    f.write_str(")")
}

impl fmt::Display for HeaderSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("(nil)");
        }
        write_list(f, &self.terms)
    }
}

struct Parser<'a> {
    chars: Vec<(usize, char)>,
    pos: usize,
    text: &'a str,
    len: Option<usize>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, len: Option<usize>) -> Self {
        Self {
            chars: text.char_indices().collect(),
            pos: 0,
            text,
            len,
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].1.is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn expect(&mut self, want: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == want => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(HsError::bad_char(c, self.offset())),
            None => Err(HsError::parse(format!(
                "expected '{}' at end of '{}'",
                want, self.text
            ))),
        }
    }

    /// `item ('+' item)*`
    fn list(&mut self) -> Result<Vec<Term>> {
        let mut terms = self.item()?;
        while self.peek() == Some('+') {
            self.pos += 1;
            terms.extend(self.item()?);
        }
        Ok(terms)
    }

    /// A vector, or a parenthesized group, `nil`, or difference
    fn item(&mut self) -> Result<Vec<Term>> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                if self.eat_nil() {
                    self.expect(')')?;
                    return Ok(Vec::new());
                }
                let left = self.list()?;
                if self.peek() == Some('-') {
                    self.pos += 1;
                    let right = self.list()?;
                    self.expect(')')?;
                    return self.difference(left, right).map(|t| vec![t]);
                }
                self.expect(')')?;
                Ok(left)
            }
            Some(_) => {
                let term = Term::new(self.vector()?);
                if self.peek() != Some('-') {
                    return Ok(vec![term]);
                }
                self.pos += 1;
                let right = self.item()?;
                self.difference(vec![term], right).map(|t| vec![t])
            }
            None => Err(HsError::parse(format!(
                "unexpected end of '{}'",
                self.text
            ))),
        }
    }

    fn eat_nil(&mut self) -> bool {
        self.skip_ws();
        let rest: String = self.chars[self.pos..].iter().take(3).map(|&(_, c)| c).collect();
        if rest == "nil" {
            self.pos += 3;
            true
        } else {
            false
        }
    }

    fn difference(&self, mut left: Vec<Term>, right: Vec<Term>) -> Result<Term> {
        if left.len() != 1 {
            return Err(HsError::parse(format!(
                "difference needs a single positive term in '{}'",
                self.text
            )));
        }
        let mut term = left.remove(0);
        let vector = term.vector.clone();
        term.diff
            .extend(right.into_iter().filter_map(|d| d.intersect_vector(&vector)));
        Ok(term)
    }

    fn vector(&mut self) -> Result<TernaryVector> {
        self.skip_ws();
        let start = self.pos;
        while let Some(&(_, c)) = self.chars.get(self.pos) {
            if matches!(c, '0' | '1' | 'x' | 'X' | 'z' | 'Z' | ',') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if start == self.pos {
            let (i, c) = self.chars[start];
            return Err(HsError::bad_char(c, i));
        }
        let begin = self.chars[start].0;
        let text = &self.text[begin..self.offset()];
        let v = TernaryVector::parse(text)?;
        match self.len {
            Some(len) if len != v.len() => return Err(HsError::length(len, v.len())),
            Some(_) => {}
            None => self.len = Some(v.len()),
        }
        Ok(v)
    }
}

impl HeaderSpace {
    /// Parse a header space of headers `len` bytes wide. `(nil)` parses to
    /// the empty set of that width.
    pub fn parse(text: &str, len: usize) -> Result<Self> {
        let mut parser = Parser::new(text, Some(len));
        let terms = parser.list()?;
        if let Some(c) = parser.peek() {
            return Err(HsError::bad_char(c, parser.offset()));
        }
        Ok(HeaderSpace::from_terms(len, terms))
    }
}

impl FromStr for HeaderSpace {
    type Err = HsError;

    /// Width is taken from the first vector; `(nil)` alone has width 0
    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s, None);
        let terms = parser.list()?;
        if let Some(c) = parser.peek() {
            return Err(HsError::bad_char(c, parser.offset()));
        }
        Ok(HeaderSpace::from_terms(parser.len.unwrap_or(0), terms))
    }
}
