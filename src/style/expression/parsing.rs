//! Parsing context: recursive descent from JSON arrays into typed
//! [`Expression`] trees, with type reconciliation and constant folding.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value as JsonValue;

use super::definitions::{self, Assertion, Coercion, Expression, Literal};
use super::evaluation::EvaluationContext;
use super::is_constant::is_constant;
use super::types::{check_subtype, Type};

/// A parse-time error, keyed by the bracketed path of the offending
/// subexpression (e.g. `[2][1]`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{key}: {message}")]
pub struct ParsingError {
    pub key: String,
    pub message: String,
}

impl ParsingError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// How a node whose type is looser than the expected type gets reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeAnnotation {
    /// Wrap in a runtime type assertion.
    Assert,
    /// Wrap in a runtime coercion.
    Coerce,
    /// Leave the node unwrapped and skip the subtype check.
    Omit,
}

struct ScopeFrame {
    bindings: Vec<(String, Rc<Expression>)>,
    parent: Option<Rc<ScopeFrame>>,
}

/// Immutable chain of `let` bindings. Extending a scope never touches
/// the parent.
#[derive(Clone, Default)]
pub struct Scope {
    head: Option<Rc<ScopeFrame>>,
}

impl Scope {
    pub fn concat(&self, bindings: Vec<(String, Rc<Expression>)>) -> Scope {
        Scope {
            head: Some(Rc::new(ScopeFrame {
                bindings,
                parent: self.head.clone(),
            })),
        }
    }

    pub fn get(&self, name: &str) -> Option<Rc<Expression>> {
        let mut frame = self.head.as_ref();
        while let Some(current) = frame {
            if let Some((_, expr)) = current.bindings.iter().rev().find(|(n, _)| n == name) {
                return Some(Rc::clone(expr));
            }
            frame = current.parent.as_ref();
        }
        None
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        let mut frame = self.head.as_ref();
        while let Some(current) = frame {
            names.extend(current.bindings.iter().map(|(n, _)| n.clone()));
            frame = current.parent.as_ref();
        }
        f.debug_struct("Scope").field("names", &names).finish()
    }
}

/// State threaded through one recursive parse.
///
/// Child contexts share the error list of their parent unless created
/// with [`ParsingContext::with_fresh_errors`], which overload resolution
/// uses to try each signature in isolation.
#[derive(Debug, Clone)]
pub struct ParsingContext {
    path: Vec<usize>,
    pub expected_type: Option<Type>,
    scope: Scope,
    errors: Rc<RefCell<Vec<ParsingError>>>,
}

impl ParsingContext {
    pub fn new(expected_type: Option<Type>) -> Self {
        Self {
            path: Vec::new(),
            expected_type,
            scope: Scope::default(),
            errors: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Bracketed path of this context, e.g. `[1][3]`.
    pub fn key(&self) -> String {
        self.path.iter().map(|p| format!("[{}]", p)).collect()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn errors(&self) -> Vec<ParsingError> {
        self.errors.borrow().clone()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    pub fn extend_errors(&self, errors: Vec<ParsingError>) {
        self.errors.borrow_mut().extend(errors);
    }

    /// Child context at `index` (or at the same path when `None`).
    pub fn concat(
        &self,
        index: Option<usize>,
        expected_type: Option<Type>,
        bindings: Option<Vec<(String, Rc<Expression>)>>,
    ) -> ParsingContext {
        let mut path = self.path.clone();
        if let Some(i) = index {
            path.push(i);
        }
        ParsingContext {
            path,
            expected_type,
            scope: match bindings {
                Some(b) => self.scope.concat(b),
                None => self.scope.clone(),
            },
            errors: Rc::clone(&self.errors),
        }
    }

    /// Same path and scope, no expected type, and a private error list.
    pub fn with_fresh_errors(&self) -> ParsingContext {
        ParsingContext {
            path: self.path.clone(),
            expected_type: None,
            scope: self.scope.clone(),
            errors: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Record an error at this context's path. Always returns `None` so
    /// parsers can `return ctx.error(..)`.
    pub fn error<T>(&self, message: impl Into<String>) -> Option<T> {
        self.error_at(message, &[])
    }

    /// Record an error at this path extended by `keys`.
    pub fn error_at<T>(&self, message: impl Into<String>, keys: &[usize]) -> Option<T> {
        let mut key = self.key();
        for k in keys {
            key.push_str(&format!("[{}]", k));
        }
        self.errors
            .borrow_mut()
            .push(ParsingError::new(key, message));
        None
    }

    /// Subtype check that records the mismatch as an error.
    pub fn check_subtype(&self, expected: &Type, actual: &Type) -> Option<String> {
        let err = check_subtype(expected, actual);
        if let Some(message) = &err {
            self.error::<()>(message.clone());
        }
        err
    }

    /// Parse the child `expr` found at argument `index`.
    pub fn parse(&self, expr: &JsonValue, index: usize, expected_type: Option<Type>) -> Option<Expression> {
        self.concat(Some(index), expected_type, None)
            .parse_here(expr, None)
    }

    pub fn parse_with_bindings(
        &self,
        expr: &JsonValue,
        index: usize,
        expected_type: Option<Type>,
        bindings: Vec<(String, Rc<Expression>)>,
    ) -> Option<Expression> {
        self.concat(Some(index), expected_type, Some(bindings))
            .parse_here(expr, None)
    }

    pub fn parse_with_annotation(
        &self,
        expr: &JsonValue,
        index: usize,
        expected_type: Option<Type>,
        annotation: TypeAnnotation,
    ) -> Option<Expression> {
        self.concat(Some(index), expected_type, None)
            .parse_here(expr, Some(annotation))
    }

    /// Parse `expr` at this context's own path.
    pub fn parse_here(&self, expr: &JsonValue, annotation: Option<TypeAnnotation>) -> Option<Expression> {
        let items = match expr {
            JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => {
                let wrapped = [JsonValue::from("literal"), expr.clone()];
                return self.finish(Literal::parse(&wrapped, self)?, annotation);
            }
            JsonValue::Array(items) => items,
            JsonValue::Object(_) => {
                return self.error("Bare objects invalid. Use [\"literal\", {...}] instead.")
            }
        };

        let Some(op) = items.first() else {
            return self.error(
                "Expected an array with at least one element. If you wanted a literal array, use [\"literal\", []].",
            );
        };
        let Some(op) = op.as_str() else {
            return self.error_at(
                format!(
                    "Expression name must be a string, but found {} instead. If you wanted a literal array, use [\"literal\", [...]].",
                    json_type_name(op)
                ),
                &[0],
            );
        };
        let Some(parse_fn) = definitions::parser_for(op) else {
            return self.error_at(
                format!(
                    "Unknown expression \"{}\". If you wanted a literal array, use [\"literal\", [...]].",
                    op
                ),
                &[0],
            );
        };

        let parsed = parse_fn(items, self)?;
        self.finish(parsed, annotation)
    }

    fn finish(&self, parsed: Expression, annotation: Option<TypeAnnotation>) -> Option<Expression> {
        let mut parsed = parsed;
        if let Some(expected) = &self.expected_type {
            let actual = parsed.ty();
            let wants_assert = matches!(
                expected,
                Type::String | Type::Number | Type::Boolean | Type::Object | Type::Array { .. }
            );
            let wants_coerce = matches!(
                expected,
                Type::Color | Type::Formatted | Type::ResolvedImage
            );
            if wants_assert && actual.is_value() {
                parsed = annotate(parsed, expected, annotation.unwrap_or(TypeAnnotation::Assert));
            } else if wants_coerce && (actual.is_value() || actual == Type::String) {
                parsed = annotate(parsed, expected, annotation.unwrap_or(TypeAnnotation::Coerce));
            } else if self.check_subtype(expected, &actual).is_some() {
                return None;
            }
        }

        if !matches!(parsed, Expression::Literal(_))
            && parsed.ty() != Type::ResolvedImage
            && is_constant(&parsed)
        {
            let ctx = EvaluationContext::default();
            match parsed.evaluate(&ctx) {
                Ok(value) => parsed = Expression::Literal(Literal::new(parsed.ty(), value)),
                Err(e) => return self.error(e.message),
            }
        }
        Some(parsed)
    }
}

fn annotate(parsed: Expression, expected: &Type, annotation: TypeAnnotation) -> Expression {
    match annotation {
        TypeAnnotation::Assert => Expression::Assertion(Assertion::new(expected.clone(), vec![parsed])),
        TypeAnnotation::Coerce => Expression::Coercion(Coercion::new(expected.clone(), vec![parsed])),
        TypeAnnotation::Omit => parsed,
    }
}

/// `typeof`-style name of a JSON value for diagnostics.
pub fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Number(_) => "number",
        JsonValue::Bool(_) => "boolean",
        JsonValue::String(_) => "string",
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => "object",
    }
}
