use serde_json::{json, Value as JsonValue};

use super::Expression;
use crate::style::expression::evaluation::{EvalError, EvalResult, EvaluationContext};
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::{check_subtype, Type};
use crate::style::expression::value::{type_of, Value};

/// Runtime type assertion: `string`, `number`, `boolean`, `object`, `array`.
#[derive(Debug, Clone)]
pub struct Assertion {
    pub ty: Type,
    pub args: Vec<Expression>,
}

fn assertable_type(name: &str) -> Option<Type> {
    match name {
        "string" => Some(Type::String),
        "number" => Some(Type::Number),
        "boolean" => Some(Type::Boolean),
        "object" => Some(Type::Object),
        _ => None,
    }
}

impl Assertion {
    pub fn new(ty: Type, args: Vec<Expression>) -> Self {
        Self { ty, args }
    }

    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() < 2 {
            return ctx.error("Expected at least one argument.");
        }

        let name = args[0].as_str().unwrap_or_default();
        let mut i = 1;
        let ty = if name == "array" {
            let item = if args.len() > 2 {
                let item = args[1]
                    .as_str()
                    .filter(|t| *t != "object")
                    .and_then(assertable_type);
                let Some(item) = item else {
                    return ctx.error_at(
                        "The item type argument of \"array\" must be one of string, number, boolean",
                        &[1],
                    );
                };
                i += 1;
                item
            } else {
                Type::Value
            };

            let mut length = None;
            if args.len() > 3 {
                match &args[2] {
                    JsonValue::Null => {}
                    JsonValue::Number(n) => match n.as_f64() {
                        Some(v) if v >= 0.0 && v.fract() == 0.0 => length = Some(v as usize),
                        _ => {
                            return ctx.error_at(
                                "The length argument to \"array\" must be a positive integer literal",
                                &[2],
                            )
                        }
                    },
                    _ => {
                        return ctx.error_at(
                            "The length argument to \"array\" must be a positive integer literal",
                            &[2],
                        )
                    }
                }
                i += 1;
            }
            Type::array(item, length)
        } else {
            assertable_type(name)?
        };

        let mut parsed = Vec::with_capacity(args.len() - i);
        while i < args.len() {
            parsed.push(ctx.parse(&args[i], i, Some(Type::Value))?);
            i += 1;
        }
        Some(Expression::Assertion(Assertion::new(ty, parsed)))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        for (i, arg) in self.args.iter().enumerate() {
            let value = arg.evaluate(ctx)?;
            let actual = type_of(&value);
            if check_subtype(&self.ty, &actual).is_none() {
                return Ok(value);
            }
            if i == self.args.len() - 1 {
                return Err(EvalError::new(format!(
                    "Expected value to be of type {}, but found {} instead.",
                    self.ty, actual
                )));
            }
        }
        Ok(Value::Null)
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!(self.ty.kind())];
        if let Type::Array { item, length } = &self.ty {
            if matches!(item.as_ref(), Type::String | Type::Number | Type::Boolean) {
                out.push(json!(item.kind()));
                if length.is_some() || self.args.len() > 1 {
                    out.push(json!(length));
                }
            }
        }
        out.extend(self.args.iter().map(Expression::serialize));
        JsonValue::Array(out)
    }
}
