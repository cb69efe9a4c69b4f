use serde_json::{json, Value as JsonValue};

use super::{Expression, FormatExpression, FormatSectionExpression, ImageExpression};
use crate::style::expression::color::{validate_rgba, Color};
use crate::style::expression::evaluation::{EvalError, EvalResult, EvaluationContext};
use crate::style::expression::formatted::{Formatted, ResolvedImage};
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::Type;
use crate::style::expression::value::Value;

/// Runtime conversion: `to-boolean`, `to-color`, `to-number`, `to-string`,
/// plus the implicit `formatted` / `resolvedImage` coercions the parser inserts.
#[derive(Debug, Clone)]
pub struct Coercion {
    pub ty: Type,
    pub args: Vec<Expression>,
}

impl Coercion {
    pub fn new(ty: Type, args: Vec<Expression>) -> Self {
        Self { ty, args }
    }

    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() < 2 {
            return ctx.error("Expected at least one argument.");
        }
        let name = args[0].as_str().unwrap_or_default();
        if (name == "to-boolean" || name == "to-string") && args.len() != 2 {
            return ctx.error("Expected one argument.");
        }
        let ty = match name {
            "to-boolean" => Type::Boolean,
            "to-color" => Type::Color,
            "to-number" => Type::Number,
            _ => Type::String,
        };

        let mut parsed = Vec::with_capacity(args.len() - 1);
        for (i, arg) in args.iter().enumerate().skip(1) {
            parsed.push(ctx.parse(arg, i, Some(Type::Value))?);
        }
        Some(Expression::Coercion(Coercion::new(ty, parsed)))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        match self.ty {
            Type::Boolean => Ok(Value::Bool(self.first(ctx)?.is_truthy())),
            Type::Color => self.to_color(ctx),
            Type::Number => {
                let mut last = Value::Null;
                for arg in &self.args {
                    last = arg.evaluate(ctx)?;
                    if last.is_null() {
                        return Ok(Value::Number(0.0));
                    }
                    let n = last.to_number();
                    if !n.is_nan() {
                        return Ok(Value::Number(n));
                    }
                }
                Err(EvalError::new(format!(
                    "Could not convert {} to number.",
                    last.to_json()
                )))
            }
            Type::Formatted => Ok(Value::Formatted(Formatted::from_string(
                self.first(ctx)?.to_string(),
            ))),
            Type::ResolvedImage => Ok(ResolvedImage::from_name(&self.first(ctx)?.to_string())
                .map(Value::Image)
                .unwrap_or(Value::Null)),
            _ => Ok(Value::String(self.first(ctx)?.to_string())),
        }
    }

    fn first(&self, ctx: &EvaluationContext) -> EvalResult {
        match self.args.first() {
            Some(arg) => arg.evaluate(ctx),
            None => Ok(Value::Null),
        }
    }

    fn to_color(&self, ctx: &EvaluationContext) -> EvalResult {
        let mut input = Value::Null;
        let mut error = None;
        for arg in &self.args {
            input = arg.evaluate(ctx)?;
            error = None;
            match &input {
                Value::Color(c) => return Ok(Value::Color(*c)),
                Value::String(s) => {
                    if let Some(c) = ctx.parse_color(s) {
                        return Ok(Value::Color(c));
                    }
                }
                Value::Array(items) => {
                    if items.len() < 3 || items.len() > 4 {
                        error = Some(format!(
                            "Invalid rbga value {}: expected an array containing either three or four numeric values.",
                            input.to_json()
                        ));
                    } else {
                        let channels: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
                        match channels {
                            Some(ch) => {
                                let alpha = ch.get(3).copied();
                                error = validate_rgba(ch[0], ch[1], ch[2], alpha);
                                if error.is_none() {
                                    return Ok(Value::Color(Color::from_rgba8(
                                        ch[0],
                                        ch[1],
                                        ch[2],
                                        alpha.unwrap_or(1.0),
                                    )));
                                }
                            }
                            None => {
                                error = Some(format!(
                                    "Invalid rbga value {}: expected an array containing either three or four numeric values.",
                                    input.to_json()
                                ));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Err(EvalError::new(error.unwrap_or_else(|| {
            let shown = match &input {
                Value::String(s) => s.clone(),
                other => other.to_json().to_string(),
            };
            format!("Could not parse color from value '{}'", shown)
        })))
    }

    pub fn serialize(&self) -> JsonValue {
        match self.ty {
            Type::Formatted => {
                let Some(content) = self.args.first() else {
                    return json!(["format"]);
                };
                FormatExpression::new(vec![FormatSectionExpression::new(content.clone())]).serialize()
            }
            Type::ResolvedImage => match self.args.first() {
                Some(input) => ImageExpression::new(input.clone()).serialize(),
                None => json!(["image"]),
            },
            _ => {
                let mut out = vec![json!(format!("to-{}", self.ty.kind()))];
                out.extend(self.args.iter().map(Expression::serialize));
                JsonValue::Array(out)
            }
        }
    }
}
