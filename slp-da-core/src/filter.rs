//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! Filter evaluation (§4.2).
//!
//! This module owns only the *evaluation contract*: given an already
//! parsed filter tree, decide whether an [`Attributes`] value satisfies
//! it. The accompanying parser is a minimal recursive-descent
//! implementation of the LDAPv3 filter grammar subset SLP relies on
//! (`&`, `|`, `!`, `=`, `>=`, `<=`, presence and substring wildcards) —
//! enough to drive the cache's `match()` operation end to end. A
//! production wire-level parser able to round-trip every LDAPv3
//! corner case is out of this component's scope (§1); only the shape
//! below (an AST plus `evaluate`) is load-bearing.

use std::fmt::{self, Display};

use crate::attr::{AttrEntry, AttrValue, Attributes};

/// A parsed LDAPv3-style filter expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    /// `(tag=value)`, where `value` may contain `*` wildcards.
    Equal(String, String),
    /// `(tag=*)`.
    Present(String),
    /// `(tag>=value)`, integers only.
    GreaterOrEqual(String, i64),
    /// `(tag<=value)`, integers only.
    LessOrEqual(String, i64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterError(String);

impl Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid filter: {}", self.0)
    }
}

impl std::error::Error for FilterError {}

/// Parses an LDAPv3-style filter string. An empty string parses to
/// `None`, meaning "match everything" per §4.1.
pub fn parse(input: &str) -> Result<Option<Filter>, FilterError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let mut parser = Parser { input, pos: 0 };
    let filter = parser.parse_filter()?;
    parser.skip_ws();
    if parser.pos != parser.input.len() {
        return Err(FilterError(format!(
            "trailing input at byte {}",
            parser.pos
        )));
    }
    Ok(Some(filter))
}

impl Filter {
    /// Evaluates the filter against an attribute list (§4.2). Evaluation
    /// is short-circuited: `And`/`Or` stop at the first
    /// deciding operand.
    pub fn evaluate(&self, attrs: &Attributes) -> bool {
        match self {
            Filter::And(items) => items.iter().all(|f| f.evaluate(attrs)),
            Filter::Or(items) => items.iter().any(|f| f.evaluate(attrs)),
            Filter::Not(inner) => !inner.evaluate(attrs),
            Filter::Present(tag) => attrs.contains_tag(tag),
            Filter::Equal(tag, pattern) => match attrs.get(tag) {
                None => false,
                Some(AttrEntry::Flag) => pattern == "*" || pattern.eq_ignore_ascii_case("true"),
                Some(AttrEntry::Values(values)) => {
                    values.iter().any(|v| value_matches(v, pattern))
                }
            },
            Filter::GreaterOrEqual(tag, threshold) => {
                integer_values(attrs, tag).any(|v| v >= *threshold)
            }
            Filter::LessOrEqual(tag, threshold) => {
                integer_values(attrs, tag).any(|v| v <= *threshold)
            }
        }
    }
}

fn integer_values<'a>(
    attrs: &'a Attributes,
    tag: &str,
) -> impl Iterator<Item = i64> + 'a {
    let values = match attrs.get(tag) {
        Some(AttrEntry::Values(values)) => values.as_slice(),
        _ => &[],
    };
    values.iter().filter_map(|v| match v {
        AttrValue::Integer(i) => Some(*i),
        _ => None,
    })
}

fn value_matches(value: &AttrValue, pattern: &str) -> bool {
    match value {
        AttrValue::String(s) => wildcard_match(&s.to_lowercase(), &pattern.to_lowercase()),
        AttrValue::Integer(i) => pattern
            .parse::<i64>()
            .map(|p| p == *i)
            .unwrap_or(false),
        AttrValue::Bool(b) => pattern.eq_ignore_ascii_case(&b.to_string()),
        AttrValue::Opaque(_) => false,
    }
}

/// Case-folded `*`-wildcard matching per LDAPv3 substring semantics.
fn wildcard_match(text: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return text == pattern;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = text;

    if let Some(first) = parts.first() {
        if !first.is_empty() {
            if !rest.starts_with(first) {
                return false;
            }
            rest = &rest[first.len()..];
        }
    }
    for part in &parts[1..parts.len().saturating_sub(1)] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    if let Some(last) = parts.last() {
        if !last.is_empty() {
            return rest.ends_with(last);
        }
    }
    true
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while self.peek() == Some(' ') {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn expect(&mut self, c: char) -> Result<(), FilterError> {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(FilterError(format!("expected '{c}' at byte {}", self.pos)))
        }
    }

    fn parse_filter(&mut self) -> Result<Filter, FilterError> {
        self.skip_ws();
        self.expect('(')?;
        self.skip_ws();
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.parse_filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.parse_filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                let inner = self.parse_filter()?;
                Filter::Not(Box::new(inner))
            }
            _ => self.parse_item()?,
        };
        self.skip_ws();
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_filter_list(&mut self) -> Result<Vec<Filter>, FilterError> {
        let mut items = Vec::new();
        self.skip_ws();
        while self.peek() == Some('(') {
            items.push(self.parse_filter()?);
            self.skip_ws();
        }
        if items.is_empty() {
            return Err(FilterError("empty '&'/'|' operand list".to_string()));
        }
        Ok(items)
    }

    fn parse_item(&mut self) -> Result<Filter, FilterError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '=' || c == ')' || (c == '>' || c == '<') {
                break;
            }
            self.pos += c.len_utf8();
        }
        let tag = self.input[start..self.pos].trim().to_string();
        if tag.is_empty() {
            return Err(FilterError(format!("missing attribute tag at byte {start}")));
        }

        match self.peek() {
            Some('>') => {
                self.pos += 1;
                self.expect('=')?;
                let value = self.parse_value()?;
                let n = value
                    .parse::<i64>()
                    .map_err(|_| FilterError(format!("'{value}' is not an integer")))?;
                Ok(Filter::GreaterOrEqual(tag, n))
            }
            Some('<') => {
                self.pos += 1;
                self.expect('=')?;
                let value = self.parse_value()?;
                let n = value
                    .parse::<i64>()
                    .map_err(|_| FilterError(format!("'{value}' is not an integer")))?;
                Ok(Filter::LessOrEqual(tag, n))
            }
            Some('=') => {
                self.pos += 1;
                let value = self.parse_value()?;
                if value == "*" {
                    Ok(Filter::Present(tag))
                } else {
                    Ok(Filter::Equal(tag, value))
                }
            }
            _ => Err(FilterError(format!(
                "expected comparison operator at byte {}",
                self.pos
            ))),
        }
    }

    fn parse_value(&mut self) -> Result<String, FilterError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == ')' {
                break;
            }
            self.pos += c.len_utf8();
        }
        Ok(self.input[start..self.pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs_with(pairs: &[(&str, AttrValue)]) -> Attributes {
        let mut attrs = Attributes::new();
        for (tag, value) in pairs {
            attrs.set_values(*tag, vec![value.clone()]);
        }
        attrs
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn equality_is_case_insensitive_for_strings() {
        let f = parse("(color=Red)").unwrap().unwrap();
        let attrs = attrs_with(&[("COLOR", AttrValue::String("red".to_string()))]);
        assert!(f.evaluate(&attrs));
    }

    #[test]
    fn presence_filter() {
        let f = parse("(color=*)").unwrap().unwrap();
        let mut attrs = Attributes::new();
        attrs.set_flag("color");
        assert!(f.evaluate(&attrs));
        assert!(!f.evaluate(&Attributes::new()));
    }

    #[test]
    fn integer_comparisons() {
        let attrs = attrs_with(&[("ppm", AttrValue::Integer(10))]);
        assert!(parse("(ppm>=5)").unwrap().unwrap().evaluate(&attrs));
        assert!(!parse("(ppm>=50)").unwrap().unwrap().evaluate(&attrs));
        assert!(parse("(ppm<=10)").unwrap().unwrap().evaluate(&attrs));
    }

    #[test]
    fn boolean_composition() {
        let attrs = attrs_with(&[
            ("color", AttrValue::Bool(true)),
            ("ppm", AttrValue::Integer(10)),
        ]);
        let f = parse("(&(color=true)(ppm>=5))").unwrap().unwrap();
        assert!(f.evaluate(&attrs));

        let f = parse("(|(color=false)(ppm>=5))").unwrap().unwrap();
        assert!(f.evaluate(&attrs));

        let f = parse("(!(ppm>=50))").unwrap().unwrap();
        assert!(f.evaluate(&attrs));
    }

    #[test]
    fn wildcard_substrings() {
        let attrs = attrs_with(&[("location", AttrValue::String("floor2-east".to_string()))]);
        assert!(parse("(location=floor2*)").unwrap().unwrap().evaluate(&attrs));
        assert!(parse("(location=*east)").unwrap().unwrap().evaluate(&attrs));
        assert!(parse("(location=*2-e*)").unwrap().unwrap().evaluate(&attrs));
        assert!(!parse("(location=floor3*)").unwrap().unwrap().evaluate(&attrs));
    }

    #[test]
    fn unparseable_filter_is_an_error() {
        assert!(parse("(color=").is_err());
        assert!(parse("color=true)").is_err());
        assert!(parse("(&)").is_err());
    }
}
