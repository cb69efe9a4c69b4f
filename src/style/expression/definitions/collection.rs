//! Array and string access: `at`, `in`, `index-of`, `slice`, `length`.
//!
//! String positions count Unicode scalar values.

use serde_json::{json, Value as JsonValue};

use super::{evaluate_number, Expression};
use crate::style::expression::evaluation::{EvalError, EvalResult, EvaluationContext};
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::{is_valid_type, Type};
use crate::style::expression::value::{number_to_string, type_of, Value};

const NEEDLE_MESSAGE: &str = "Expected first argument to be of type boolean, string, number or null";
const HAYSTACK_MESSAGE: &str = "Expected second argument to be of type array or string";

fn needle_types() -> [Type; 5] {
    [Type::Boolean, Type::String, Type::Number, Type::Null, Type::Value]
}

fn sequence_types() -> [Type; 3] {
    [Type::String, Type::any_array(), Type::Value]
}

/// Parse the shared `(needle, haystack)` prefix of `in` and `index-of`.
fn parse_needle_haystack(args: &[JsonValue], ctx: &ParsingContext) -> Option<(Expression, Expression)> {
    let needle = ctx.parse(&args[1], 1, Some(Type::Value))?;
    let haystack = ctx.parse(&args[2], 2, Some(Type::Value))?;
    if !is_valid_type(&needle.ty(), &needle_types()) {
        return ctx.error(format!("{}, but found {} instead", NEEDLE_MESSAGE, needle.ty()));
    }
    if !is_valid_type(&haystack.ty(), &sequence_types()) {
        return ctx.error(format!("{}, but found {} instead", HAYSTACK_MESSAGE, haystack.ty()));
    }
    Some((needle, haystack))
}

fn check_needle_haystack(needle: &Value, haystack: &Value) -> Result<(), EvalError> {
    if !matches!(needle, Value::Bool(_) | Value::String(_) | Value::Number(_) | Value::Null) {
        return Err(EvalError::new(format!(
            "{}, but found {} instead.",
            NEEDLE_MESSAGE,
            type_of(needle)
        )));
    }
    if !matches!(haystack, Value::String(_) | Value::Array(_)) {
        return Err(EvalError::new(format!(
            "{}, but found {} instead.",
            HAYSTACK_MESSAGE,
            type_of(haystack)
        )));
    }
    Ok(())
}

/// `ToIntegerOrInfinity` followed by the relative-index clamp used by
/// `Array.prototype.slice` and friends.
fn relative_index(index: f64, len: usize) -> usize {
    let index = if index.is_nan() { 0.0 } else { index.trunc() };
    let len_f = len as f64;
    if index < 0.0 {
        (len_f + index).max(0.0) as usize
    } else {
        index.min(len_f) as usize
    }
}

/// `["at", index, array]`
#[derive(Debug, Clone)]
pub struct At {
    pub ty: Type,
    pub index: Box<Expression>,
    pub input: Box<Expression>,
}

impl At {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() != 3 {
            return ctx.error(format!(
                "Expected 2 arguments, but found {} instead.",
                args.len() - 1
            ));
        }
        let index = ctx.parse(&args[1], 1, Some(Type::Number))?;
        let item = ctx.expected_type.clone().unwrap_or(Type::Value);
        let input = ctx.parse(&args[2], 2, Some(Type::array(item, None)))?;
        let ty = match input.ty() {
            Type::Array { item, .. } => *item,
            _ => Type::Value,
        };
        Some(Expression::At(At {
            ty,
            index: Box::new(index),
            input: Box::new(input),
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let index = evaluate_number(&self.index, ctx)?;
        let items = match self.input.evaluate(ctx)? {
            Value::Array(items) => items,
            other => {
                return Err(EvalError::new(format!(
                    "Expected value to be of type array, but found {} instead.",
                    type_of(&other)
                )))
            }
        };

        if index < 0.0 {
            return Err(EvalError::new(format!(
                "Array index out of bounds: {} < 0.",
                number_to_string(index)
            )));
        }
        if index >= items.len() as f64 {
            return Err(EvalError::new(format!(
                "Array index out of bounds: {} > {}.",
                number_to_string(index),
                items.len() as i64 - 1
            )));
        }
        if index != index.floor() {
            return Err(EvalError::new(format!(
                "Array index must be an integer, but found {} instead.",
                number_to_string(index)
            )));
        }
        Ok(items[index as usize].clone())
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        f(self.index.as_ref());
        f(self.input.as_ref());
    }

    pub fn serialize(&self) -> JsonValue {
        json!(["at", self.index.serialize(), self.input.serialize()])
    }
}

/// `["in", needle, haystack]`
#[derive(Debug, Clone)]
pub struct In {
    pub needle: Box<Expression>,
    pub haystack: Box<Expression>,
}

impl In {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() != 3 {
            return ctx.error(format!(
                "Expected 2 arguments, but found {} instead.",
                args.len() - 1
            ));
        }
        let (needle, haystack) = parse_needle_haystack(args, ctx)?;
        Some(Expression::In(In {
            needle: Box::new(needle),
            haystack: Box::new(haystack),
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let needle = self.needle.evaluate(ctx)?;
        let haystack = self.haystack.evaluate(ctx)?;
        if !haystack.is_truthy() {
            return Ok(Value::Bool(false));
        }
        check_needle_haystack(&needle, &haystack)?;
        let found = match &haystack {
            Value::String(s) => s.contains(needle.to_string().as_str()),
            Value::Array(items) => items.iter().any(|item| item.strict_equals(&needle)),
            _ => false,
        };
        Ok(Value::Bool(found))
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        f(self.needle.as_ref());
        f(self.haystack.as_ref());
    }

    pub fn serialize(&self) -> JsonValue {
        json!(["in", self.needle.serialize(), self.haystack.serialize()])
    }
}

/// `["index-of", needle, haystack, from?]`
#[derive(Debug, Clone)]
pub struct IndexOf {
    pub needle: Box<Expression>,
    pub haystack: Box<Expression>,
    pub from_index: Option<Box<Expression>>,
}

impl IndexOf {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() <= 2 || args.len() >= 5 {
            return ctx.error(format!(
                "Expected 3 or 4 arguments, but found {} instead.",
                args.len() - 1
            ));
        }
        let (needle, haystack) = parse_needle_haystack(args, ctx)?;
        let from_index = match args.get(3) {
            Some(arg) => Some(Box::new(ctx.parse(arg, 3, Some(Type::Number))?)),
            None => None,
        };
        Some(Expression::IndexOf(IndexOf {
            needle: Box::new(needle),
            haystack: Box::new(haystack),
            from_index,
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let needle = self.needle.evaluate(ctx)?;
        let haystack = self.haystack.evaluate(ctx)?;
        check_needle_haystack(&needle, &haystack)?;
        let from = match &self.from_index {
            Some(expr) => evaluate_number(expr, ctx)?,
            None => 0.0,
        };

        let position = match &haystack {
            Value::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                let target: Vec<char> = needle.to_string().chars().collect();
                // Negative starts clamp to zero for strings.
                let start = relative_index(from.max(0.0), chars.len());
                if target.is_empty() {
                    Some(start)
                } else {
                    (start..chars.len())
                        .find(|&i| chars[i..].starts_with(&target))
                }
            }
            Value::Array(items) => {
                let start = relative_index(from, items.len());
                (start..items.len()).find(|&i| items[i].strict_equals(&needle))
            }
            _ => None,
        };
        Ok(Value::Number(position.map(|p| p as f64).unwrap_or(-1.0)))
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        f(self.needle.as_ref());
        f(self.haystack.as_ref());
        if let Some(from) = &self.from_index {
            f(from.as_ref());
        }
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!("index-of"), self.needle.serialize(), self.haystack.serialize()];
        if let Some(from) = &self.from_index {
            out.push(from.serialize());
        }
        JsonValue::Array(out)
    }
}

/// `["slice", input, begin, end?]`
#[derive(Debug, Clone)]
pub struct Slice {
    pub ty: Type,
    pub input: Box<Expression>,
    pub begin_index: Box<Expression>,
    pub end_index: Option<Box<Expression>>,
}

impl Slice {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() <= 2 || args.len() >= 5 {
            return ctx.error(format!(
                "Expected 3 or 4 arguments, but found {} instead.",
                args.len() - 1
            ));
        }
        let input = ctx.parse(&args[1], 1, Some(Type::Value))?;
        let begin_index = ctx.parse(&args[2], 2, Some(Type::Number))?;
        if !is_valid_type(&input.ty(), &sequence_types()) {
            return ctx.error(format!(
                "Expected first argument to be of type array or string, but found {} instead",
                input.ty()
            ));
        }
        let end_index = match args.get(3) {
            Some(arg) => Some(Box::new(ctx.parse(arg, 3, Some(Type::Number))?)),
            None => None,
        };

        // A slice of a fixed-length array no longer has that length.
        let ty = match input.ty() {
            Type::Array { item, .. } => Type::Array { item, length: None },
            other => other,
        };
        Some(Expression::Slice(Slice {
            ty,
            input: Box::new(input),
            begin_index: Box::new(begin_index),
            end_index,
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let input = self.input.evaluate(ctx)?;
        let begin = evaluate_number(&self.begin_index, ctx)?;
        let end = match &self.end_index {
            Some(expr) => Some(evaluate_number(expr, ctx)?),
            None => None,
        };

        let range = |len: usize| {
            let start = relative_index(begin, len);
            let stop = end.map(|e| relative_index(e, len)).unwrap_or(len);
            (start, stop.max(start))
        };
        match input {
            Value::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                let (start, stop) = range(chars.len());
                Ok(Value::String(chars[start..stop].iter().collect()))
            }
            Value::Array(items) => {
                let (start, stop) = range(items.len());
                Ok(Value::Array(items[start..stop].to_vec()))
            }
            other => Err(EvalError::new(format!(
                "Expected first argument to be of type array or string, but found {} instead.",
                type_of(&other)
            ))),
        }
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        f(self.input.as_ref());
        f(self.begin_index.as_ref());
        if let Some(end) = &self.end_index {
            f(end.as_ref());
        }
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!("slice"), self.input.serialize(), self.begin_index.serialize()];
        if let Some(end) = &self.end_index {
            out.push(end.serialize());
        }
        JsonValue::Array(out)
    }
}

/// `["length", string_or_array]`
#[derive(Debug, Clone)]
pub struct Length {
    pub input: Box<Expression>,
}

impl Length {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() != 2 {
            return ctx.error(format!(
                "Expected 1 argument, but found {} instead.",
                args.len() - 1
            ));
        }
        let input = ctx.parse(&args[1], 1, None)?;
        if !matches!(input.ty(), Type::Array { .. } | Type::String | Type::Value) {
            return ctx.error(format!(
                "Expected argument of type string or array, but found {} instead.",
                input.ty()
            ));
        }
        Some(Expression::Length(Length {
            input: Box::new(input),
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        match self.input.evaluate(ctx)? {
            Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
            Value::Array(items) => Ok(Value::Number(items.len() as f64)),
            other => Err(EvalError::new(format!(
                "Expected value to be of type string or array, but found {} instead.",
                type_of(&other)
            ))),
        }
    }

    pub fn serialize(&self) -> JsonValue {
        json!(["length", self.input.serialize()])
    }
}
