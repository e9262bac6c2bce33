//! Field-mapping expressions ("tokens").
//!
//! A mapping like `"[billing_address::first_name+billing_address::last_name]"`
//! says where a value for an Acumulus field is found in the shop data. The
//! expression language is small:
//!
//! ```text
//! expression   := (literal | '[' alternatives ']')*
//! alternatives := concat ('|' concat)*
//! concat       := term (('+' | '&') term)*
//! term         := '"' text '"' | name ('::' path)?
//! path         := segment ('.' segment)*
//! ```
//!
//! `+` joins the present parts with a space, `&` without, and `|` takes the
//! first alternative that has a value.
//!
//! ```
//! use acumulus::collect::{Token, Variables};
//! use serde_json::json;
//!
//! let customer = json!({"first_name": "Jan", "last_name": "Jansen", "id": 17});
//! let vars = Variables::new().with("customer", &customer);
//!
//! let name = Token::parse("[customer::first_name+customer::last_name]").unwrap();
//! assert_eq!(name.evaluate(&vars), Some(json!("Jan Jansen")));
//!
//! // A single property keeps its JSON type.
//! let id = Token::parse("[customer::id]").unwrap();
//! assert_eq!(id.evaluate(&vars), Some(json!(17)));
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::AcumulusError;

/// Something that properties can be read from by a dotted path.
pub trait PropertySource {
    /// Value at `path`, `None` when absent.
    fn property(&self, path: &str) -> Option<Value>;
}

impl PropertySource for Value {
    fn property(&self, path: &str) -> Option<Value> {
        let mut current = self;
        for segment in path.split('.') {
            let segment = segment.trim().trim_end_matches("()");
            if segment.is_empty() {
                return None;
            }
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        present(current).cloned()
    }
}

impl PropertySource for BTreeMap<String, Value> {
    fn property(&self, path: &str) -> Option<Value> {
        let (key, rest) = match path.split_once('.') {
            Some((key, rest)) => (key, Some(rest)),
            None => (path, None),
        };
        let value = self.get(key.trim().trim_end_matches("()"))?;
        match rest {
            Some(rest) => value.property(rest),
            None => present(value).cloned(),
        }
    }
}

fn present(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(other),
    }
}

/// Ordered set of named property sources that tokens are evaluated against.
#[derive(Clone, Default)]
pub struct Variables<'a> {
    entries: Vec<(String, &'a dyn PropertySource)>,
}

impl<'a> Variables<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, source: &'a dyn PropertySource) -> Self {
        self.push(name, source);
        self
    }

    /// Register a source. A source with the same name is replaced in place.
    pub fn push(&mut self, name: impl Into<String>, source: &'a dyn PropertySource) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = source,
            None => self.entries.push((name, source)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a dyn PropertySource> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, source)| *source)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Look up `path` in `variable`, or in every source in registration
    /// order when no variable is named.
    pub fn lookup(&self, variable: Option<&str>, path: &str) -> Option<Value> {
        match variable {
            Some(name) => self.get(name)?.property(path),
            None => self.entries.iter().find_map(|(_, source)| source.property(path)),
        }
    }
}

impl std::fmt::Debug for Variables<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Literal(String),
    Property { variable: Option<String>, path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    Space,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Concat {
    first: Term,
    rest: Vec<(Joiner, Term)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Token(Vec<Concat>),
}

/// A parsed field-mapping expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    segments: Vec<Segment>,
}

impl Token {
    /// Parse an expression.
    ///
    /// # Errors
    ///
    /// `AcumulusError::Token` on an unclosed `[`, a nested `[`, an
    /// unterminated quote or an empty term.
    pub fn parse(expression: &str) -> Result<Self, AcumulusError> {
        let mut parser = Parser {
            chars: expression.chars().collect(),
            pos: 0,
            source: expression,
        };
        parser.expression().map(|segments| Self { segments })
    }

    /// Evaluate against `vars`. Returns `None` when nothing was found.
    pub fn evaluate(&self, vars: &Variables<'_>) -> Option<Value> {
        if let [Segment::Token(alternatives)] = self.segments.as_slice() {
            return evaluate_alternatives(alternatives, vars);
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Token(alternatives) => {
                    if let Some(value) = evaluate_alternatives(alternatives, vars) {
                        out.push_str(&render(&value));
                    }
                }
            }
        }
        (!out.is_empty()).then_some(Value::String(out))
    }

    /// Whether the expression contains no tokens at all.
    pub fn is_literal(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Text(_)))
    }
}

/// Parse and evaluate in one go.
pub fn evaluate(expression: &str, vars: &Variables<'_>) -> Result<Option<Value>, AcumulusError> {
    Ok(Token::parse(expression)?.evaluate(vars))
}

fn evaluate_alternatives(alternatives: &[Concat], vars: &Variables<'_>) -> Option<Value> {
    alternatives.iter().find_map(|concat| evaluate_concat(concat, vars))
}

fn evaluate_concat(concat: &Concat, vars: &Variables<'_>) -> Option<Value> {
    if concat.rest.is_empty() {
        return evaluate_term(&concat.first, vars);
    }

    let mut out = String::new();
    let parts = std::iter::once((Joiner::Direct, &concat.first))
        .chain(concat.rest.iter().map(|(joiner, term)| (*joiner, term)));
    for (joiner, term) in parts {
        let Some(value) = evaluate_term(term, vars) else {
            continue;
        };
        let text = render(&value);
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() && joiner == Joiner::Space {
            out.push(' ');
        }
        out.push_str(&text);
    }
    (!out.is_empty()).then_some(Value::String(out))
}

fn evaluate_term(term: &Term, vars: &Variables<'_>) -> Option<Value> {
    match term {
        Term::Literal(text) if text.is_empty() => None,
        Term::Literal(text) => Some(Value::String(text.clone())),
        Term::Property { variable, path } => vars.lookup(variable.as_deref(), path),
    }
}

/// String form of a value inside a larger expression.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        other => other.to_string(),
    }
}

struct Parser<'s> {
    chars: Vec<char>,
    pos: usize,
    source: &'s str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, reason: &str) -> AcumulusError {
        AcumulusError::Token(format!("{reason} at position {} in '{}'", self.pos, self.source))
    }

    fn expression(&mut self) -> Result<Vec<Segment>, AcumulusError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '[' {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                self.pos += 1;
                segments.push(Segment::Token(self.alternatives()?));
            } else {
                text.push(c);
                self.pos += 1;
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(segments)
    }

    /// Parses up to and including the closing `]`.
    fn alternatives(&mut self) -> Result<Vec<Concat>, AcumulusError> {
        let mut alternatives = vec![self.concat()?];
        loop {
            match self.peek() {
                Some('|') => {
                    self.pos += 1;
                    alternatives.push(self.concat()?);
                }
                Some(']') => {
                    self.pos += 1;
                    return Ok(alternatives);
                }
                _ => return Err(self.error("unclosed '['")),
            }
        }
    }

    fn concat(&mut self) -> Result<Concat, AcumulusError> {
        let first = self.term()?;
        let mut rest = Vec::new();
        loop {
            let joiner = match self.peek() {
                Some('+') => Joiner::Space,
                Some('&') => Joiner::Direct,
                _ => return Ok(Concat { first, rest }),
            };
            self.pos += 1;
            rest.push((joiner, self.term()?));
        }
    }

    fn term(&mut self) -> Result<Term, AcumulusError> {
        self.skip_whitespace();
        if self.peek() == Some('"') {
            self.pos += 1;
            let mut text = String::new();
            loop {
                match self.peek() {
                    Some('"') => {
                        self.pos += 1;
                        break;
                    }
                    Some(c) => {
                        text.push(c);
                        self.pos += 1;
                    }
                    None => return Err(self.error("unterminated quote")),
                }
            }
            self.skip_whitespace();
            return Ok(Term::Literal(text));
        }

        let mut name = String::new();
        while let Some(c) = self.peek() {
            match c {
                '|' | '+' | '&' | ']' => break,
                '[' => return Err(self.error("nested '['")),
                c => {
                    name.push(c);
                    self.pos += 1;
                }
            }
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(self.error("empty term"));
        }
        Ok(match name.split_once("::") {
            Some((variable, path)) if !variable.trim().is_empty() && !path.trim().is_empty() => {
                Term::Property {
                    variable: Some(variable.trim().to_string()),
                    path: path.trim().to_string(),
                }
            }
            Some(_) => return Err(self.error("empty variable or path")),
            None => Term::Property {
                variable: None,
                path: name.to_string(),
            },
        })
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order() -> Value {
        json!({
            "id": 17,
            "reference": "ORD-17",
            "paid": true,
            "customer": {"first_name": "Jan", "last_name": "", "email": null},
            "lines": [{"name": "Thee"}, {"name": "Koffie"}],
            "items_count()": 2
        })
    }

    fn eval(expression: &str, value: &Value) -> Option<Value> {
        let vars = Variables::new().with("order", value);
        Token::parse(expression).unwrap().evaluate(&vars)
    }

    #[test]
    fn single_token_keeps_type() {
        assert_eq!(eval("[order::id]", &order()), Some(json!(17)));
        assert_eq!(eval("[order::paid]", &order()), Some(json!(true)));
    }

    #[test]
    fn mixed_expression_is_text() {
        assert_eq!(
            eval("Order [order::reference] (#[order::id])", &order()),
            Some(json!("Order ORD-17 (#17)"))
        );
    }

    #[test]
    fn nested_paths_and_indices() {
        assert_eq!(eval("[order::lines.1.name]", &order()), Some(json!("Koffie")));
        assert_eq!(eval("[order::lines.5.name]", &order()), None);
    }

    #[test]
    fn empty_and_null_are_absent() {
        assert_eq!(eval("[order::customer.last_name]", &order()), None);
        assert_eq!(eval("[order::customer.email]", &order()), None);
        assert_eq!(
            eval("[order::customer.email|\"geen\"]", &order()),
            Some(json!("geen"))
        );
    }

    #[test]
    fn plus_skips_absent_parts() {
        assert_eq!(
            eval("[order::customer.first_name+order::customer.last_name]", &order()),
            Some(json!("Jan"))
        );
        assert_eq!(
            eval("[order::reference&\"-\"&order::id]", &order()),
            Some(json!("ORD-17-17"))
        );
    }

    #[test]
    fn bare_path_searches_all_variables() {
        let customer = json!({"email": "jan@example.nl"});
        let order = order();
        let vars = Variables::new()
            .with("order", &order)
            .with("customer", &customer);
        let token = Token::parse("[email]").unwrap();
        assert_eq!(token.evaluate(&vars), Some(json!("jan@example.nl")));
    }

    #[test]
    fn unknown_variable_is_absent() {
        assert_eq!(eval("[nothing::id]", &order()), None);
        assert_eq!(eval("prefix [nothing::id]", &order()), Some(json!("prefix ")));
    }

    #[test]
    fn method_call_suffix_is_ignored() {
        let mut map = BTreeMap::new();
        map.insert("getId".to_string(), json!(5));
        let vars = Variables::new().with("shop", &map);
        assert_eq!(
            Token::parse("[shop::getId()]").unwrap().evaluate(&vars),
            Some(json!(5))
        );
    }

    #[test]
    fn parse_errors() {
        for bad in ["[order::id", "[\"open]", "[]", "[a|]", "[a[b]]", "[::x]"] {
            let err = Token::parse(bad).unwrap_err();
            assert!(matches!(err, AcumulusError::Token(_)), "{bad}");
        }
    }

    #[test]
    fn stray_closing_bracket_is_text() {
        let token = Token::parse("a]b").unwrap();
        assert!(token.is_literal());
        assert_eq!(token.evaluate(&Variables::new()), Some(json!("a]b")));
    }

    #[test]
    fn empty_expression_is_none() {
        assert_eq!(Token::parse("").unwrap().evaluate(&Variables::new()), None);
    }
}
