//! Nested filter expressions and their two wire syntaxes.
//!
//! A filter is a predicate tree that is conjunctive by nesting:
//! `{domain: {parent: {id: {in: ["a", "b"]}}}}` reads as "the asset's domain's
//! parent id is one of a, b". The same tree renders either as structured
//! expression text (query language `where:` argument) or as flat REST
//! key/value parameters.

use std::fmt::{self, Write as _};

use crate::domain::error::DomainError;

/// Leaf value of a filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// Null, or a float the query language cannot express (NaN, infinities).
    pub fn is_null(&self) -> bool {
        match self {
            Literal::Null => true,
            Literal::Float(x) => !x.is_finite(),
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    /// Plain textual form, as used for REST parameter values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Float(x) if x.is_finite() => write!(f, "{x}"),
            Literal::Float(_) => write!(f, "null"),
            Literal::String(s) => write!(f, "{s}"),
        }
    }
}

/// Filter tree: literal leaves, lists, and objects with ordered keys.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    Literal(Literal),
    List(Vec<FilterExpression>),
    Object(Vec<(String, FilterExpression)>),
}

/// Target wire syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// `key=value&key=value`, percent-encoded
    Rest,
    /// `{key: value, ...}` with unquoted keys
    Structured,
}

impl FilterExpression {
    pub fn null() -> Self {
        FilterExpression::Literal(Literal::Null)
    }

    pub fn empty() -> Self {
        FilterExpression::Object(Vec::new())
    }

    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FilterExpression)>,
    {
        FilterExpression::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list<T, I>(items: I) -> Self
    where
        T: Into<FilterExpression>,
        I: IntoIterator<Item = T>,
    {
        FilterExpression::List(items.into_iter().map(Into::into).collect())
    }

    /// Nest `leaf` under `segments`: `path(["a", "b"], x)` is `{a: {b: x}}`.
    pub fn path(segments: &[&str], leaf: FilterExpression) -> Self {
        segments.iter().rev().fold(leaf, |inner, key| {
            FilterExpression::Object(vec![(key.to_string(), inner)])
        })
    }

    /// `{<path>: {eq: value}}`
    pub fn eq(segments: &[&str], value: impl Into<FilterExpression>) -> Self {
        Self::path(segments, Self::object([("eq", value.into())]))
    }

    /// `{<path>: {in: [values...]}}`
    pub fn in_set<T, I>(segments: &[&str], values: I) -> Self
    where
        T: Into<FilterExpression>,
        I: IntoIterator<Item = T>,
    {
        Self::path(segments, Self::object([("in", Self::list(values))]))
    }

    /// Append a key to an object expression; other shapes are wrapped in `{key: value}`.
    pub fn and(self, key: impl Into<String>, value: impl Into<FilterExpression>) -> Self {
        match self {
            FilterExpression::Object(mut entries) => {
                entries.push((key.into(), value.into()));
                FilterExpression::Object(entries)
            }
            _ => FilterExpression::Object(vec![(key.into(), value.into())]),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FilterExpression::Object(entries) if entries.is_empty())
    }

    /// Serialize into the given syntax.
    pub fn serialize(&self, syntax: Syntax) -> Result<String, DomainError> {
        match syntax {
            Syntax::Structured => Ok(self.to_structured()),
            Syntax::Rest => {
                let pairs = self.to_rest_params()?;
                Ok(pairs
                    .iter()
                    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&"))
            }
        }
    }

    /// Structured expression text. Pure and deterministic.
    pub fn to_structured(&self) -> String {
        let mut out = String::new();
        self.write_structured(&mut out);
        out
    }

    fn write_structured(&self, out: &mut String) {
        match self {
            FilterExpression::Literal(Literal::String(s)) => write_quoted(out, s),
            FilterExpression::Literal(literal) => {
                let _ = write!(out, "{literal}");
            }
            FilterExpression::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_structured(out);
                }
                out.push(']');
            }
            FilterExpression::Object(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    value.write_structured(out);
                }
                out.push('}');
            }
        }
    }

    /// Flatten into REST key/value pairs.
    ///
    /// Nested objects produce dotted keys, lists repeat their key per element,
    /// null leaves are skipped. Only objects flatten, and lists must hold literals.
    pub fn to_rest_params(&self) -> Result<Vec<(String, String)>, DomainError> {
        let FilterExpression::Object(entries) = self else {
            return Err(DomainError::invalid_filter(
                "REST parameters need an object at the top level",
            ));
        };
        let mut pairs = Vec::new();
        flatten_rest("", entries, &mut pairs)?;
        Ok(pairs)
    }
}

fn flatten_rest(
    prefix: &str,
    entries: &[(String, FilterExpression)],
    pairs: &mut Vec<(String, String)>,
) -> Result<(), DomainError> {
    for (key, value) in entries {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            FilterExpression::Literal(literal) if literal.is_null() => {}
            FilterExpression::Literal(literal) => pairs.push((full_key, literal.to_string())),
            FilterExpression::List(items) => {
                for item in items {
                    match item {
                        FilterExpression::Literal(literal) if literal.is_null() => {}
                        FilterExpression::Literal(literal) => {
                            pairs.push((full_key.clone(), literal.to_string()))
                        }
                        _ => {
                            return Err(DomainError::invalid_filter(format!(
                                "list under '{full_key}' holds a non-literal element"
                            )))
                        }
                    }
                }
            }
            FilterExpression::Object(nested) => flatten_rest(&full_key, nested, pairs)?,
        }
    }
    Ok(())
}

/// Double-quote `s`, escaping quotes, backslashes and control characters.
fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

impl From<Literal> for FilterExpression {
    fn from(value: Literal) -> Self {
        FilterExpression::Literal(value)
    }
}

impl From<&str> for FilterExpression {
    fn from(value: &str) -> Self {
        FilterExpression::Literal(Literal::String(value.to_string()))
    }
}

impl From<String> for FilterExpression {
    fn from(value: String) -> Self {
        FilterExpression::Literal(Literal::String(value))
    }
}

impl From<&String> for FilterExpression {
    fn from(value: &String) -> Self {
        FilterExpression::Literal(Literal::String(value.clone()))
    }
}

impl From<bool> for FilterExpression {
    fn from(value: bool) -> Self {
        FilterExpression::Literal(Literal::Bool(value))
    }
}

impl From<i64> for FilterExpression {
    fn from(value: i64) -> Self {
        FilterExpression::Literal(Literal::Integer(value))
    }
}

impl From<usize> for FilterExpression {
    fn from(value: usize) -> Self {
        FilterExpression::Literal(Literal::Integer(i64::try_from(value).unwrap_or(i64::MAX)))
    }
}

impl From<f64> for FilterExpression {
    /// NaN and infinities become null.
    fn from(value: f64) -> Self {
        if !value.is_finite() {
            return FilterExpression::null();
        }
        FilterExpression::Literal(Literal::Float(value))
    }
}

impl<T: Into<FilterExpression>> From<Option<T>> for FilterExpression {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_else(FilterExpression::null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_literals_when_structured_then_textual_form() {
        assert_eq!(FilterExpression::null().to_structured(), "null");
        assert_eq!(FilterExpression::from(true).to_structured(), "true");
        assert_eq!(FilterExpression::from(42i64).to_structured(), "42");
        assert_eq!(FilterExpression::from(1.5f64).to_structured(), "1.5");
        assert_eq!(FilterExpression::from("x").to_structured(), "\"x\"");
    }

    #[test]
    fn given_path_when_built_then_nests_objects() {
        let expr = FilterExpression::eq(&["domain", "name"], "Sales");
        assert_eq!(expr.to_structured(), r#"{domain: {name: {eq: "Sales"}}}"#);
    }

    #[test]
    fn given_empty_object_when_structured_then_braces() {
        assert_eq!(FilterExpression::empty().to_structured(), "{}");
        assert!(FilterExpression::empty().is_empty());
    }
}
