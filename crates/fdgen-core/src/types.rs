//! Type expressions for value types, generic arguments and accessor signatures.
//!
//! Expressions are written in the target's surface syntax (`Integer`,
//! `List<T>`, `Map<String, Long>`, `PersonRowData[]`) and parsed into a small
//! tree so that template parameters can be substituted structurally.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeExpr {
    /// A named type with optional generic arguments.
    Named { name: String, args: Vec<TypeExpr> },
    /// An array of the element type.
    Array(Box<TypeExpr>),
}

/// Error returned when a type expression cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type expression `{input}`: {reason}")]
pub struct TypeParseError {
    pub input: String,
    pub reason: String,
}

impl TypeExpr {
    /// A non-generic named type.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// A generic type applied to arguments.
    pub fn generic(name: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        Self::Named {
            name: name.into(),
            args,
        }
    }

    /// An array of `elem`.
    pub fn array(elem: TypeExpr) -> Self {
        Self::Array(Box::new(elem))
    }

    /// Parse a type expression from its surface syntax.
    pub fn parse(input: &str) -> Result<Self, TypeParseError> {
        let mut parser = Parser {
            input,
            chars: input.char_indices().peekable(),
            depth: 0,
        };
        let expr = parser.parse_type()?;
        parser.skip_ws();
        if let Some(&(pos, c)) = parser.chars.peek() {
            return Err(parser.error(format!("unexpected `{c}` at offset {pos}")));
        }
        Ok(expr)
    }

    /// The head name of a named type (`List` for `List<T>`), `None` for arrays.
    pub fn head(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            Self::Array(_) => None,
        }
    }

    /// Whether this expression is exactly the named type `name` without arguments.
    pub fn is_simple(&self, name: &str) -> bool {
        matches!(self, Self::Named { name: n, args } if n == name && args.is_empty())
    }

    /// Whether any of `params` occurs as a bare type variable inside this expression.
    pub fn mentions_any(&self, params: &[String]) -> bool {
        match self {
            Self::Named { name, args } => {
                (args.is_empty() && params.iter().any(|p| p == name))
                    || args.iter().any(|a| a.mentions_any(params))
            }
            Self::Array(elem) => elem.mentions_any(params),
        }
    }

    /// Replace bare type variables by their bound types.
    #[must_use]
    pub fn substitute(&self, bindings: &BTreeMap<String, TypeExpr>) -> TypeExpr {
        match self {
            Self::Named { name, args } if args.is_empty() => bindings
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            Self::Named { name, args } => Self::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            Self::Array(elem) => Self::Array(Box::new(elem.substitute(bindings))),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Self::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}

impl FromStr for TypeExpr {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TypeExpr {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TypeExpr> for String {
    fn from(value: TypeExpr) -> Self {
        value.to_string()
    }
}

/// Deepest generic argument nesting a type expression may use.
const MAX_NESTING: usize = 32;

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> TypeParseError {
        TypeParseError {
            input: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.chars.peek().is_some_and(|&(_, c)| c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, TypeParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!("type arguments nested deeper than {MAX_NESTING}")));
        }
        self.depth += 1;
        let expr = self.parse_named();
        self.depth -= 1;
        expr
    }

    fn parse_named(&mut self) -> Result<TypeExpr, TypeParseError> {
        self.skip_ws();
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | '?') {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(self.error("expected a type name"));
        }

        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                args.push(self.parse_type()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.error("expected `,` or `>` in type arguments"));
            }
        }

        let mut expr = TypeExpr::Named { name, args };
        while self.eat('[') {
            if !self.eat(']') {
                return Err(self.error("expected `]`"));
            }
            expr = TypeExpr::array(expr);
        }
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(TypeExpr::parse("Integer").unwrap(), TypeExpr::named("Integer"));
        assert_eq!(
            TypeExpr::parse(" java.lang.String ").unwrap(),
            TypeExpr::named("java.lang.String")
        );
    }

    #[test]
    fn test_parse_nested_generics_and_arrays() {
        let expr = TypeExpr::parse("Map<String, List<T>>[]").unwrap();
        assert_eq!(
            expr,
            TypeExpr::array(TypeExpr::generic(
                "Map",
                vec![
                    TypeExpr::named("String"),
                    TypeExpr::generic("List", vec![TypeExpr::named("T")]),
                ]
            ))
        );
        assert_eq!(expr.to_string(), "Map<String, List<T>>[]");
    }

    #[test]
    fn test_parse_errors() {
        assert!(TypeExpr::parse("").is_err());
        assert!(TypeExpr::parse("List<").is_err());
        assert!(TypeExpr::parse("List<A B>").is_err());
        assert!(TypeExpr::parse("A[").is_err());
        assert!(TypeExpr::parse("A>").is_err());
    }

    #[test]
    fn test_parse_rejects_deep_nesting() {
        let nested = |depth: usize| format!("{}T{}", "L<".repeat(depth), ">".repeat(depth));
        assert!(TypeExpr::parse(&nested(MAX_NESTING - 1)).is_ok());
        let err = TypeExpr::parse(&nested(10_000)).unwrap_err();
        assert!(err.reason.contains("nested deeper than"));
    }

    #[test]
    fn test_substitute_and_mentions() {
        let expr = TypeExpr::parse("List<T>").unwrap();
        let params = vec!["T".to_string()];
        assert!(expr.mentions_any(&params));
        assert!(!TypeExpr::named("Tree").mentions_any(&params));

        let mut bindings = BTreeMap::new();
        bindings.insert("T".to_string(), TypeExpr::named("Integer"));
        assert_eq!(expr.substitute(&bindings).to_string(), "List<Integer>");
    }

    #[test]
    fn test_serde_as_string() {
        let expr = TypeExpr::parse("List<Long>").unwrap();
        let json = serde_json::to_string(&expr).unwrap();
        assert_eq!(json, "\"List<Long>\"");
        let back: TypeExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
        assert!(serde_json::from_str::<TypeExpr>("\"List<\"").is_err());
    }
}
