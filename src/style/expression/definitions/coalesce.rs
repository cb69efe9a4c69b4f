use serde_json::{json, Value as JsonValue};

use super::Expression;
use crate::style::expression::evaluation::{EvalResult, EvaluationContext};
use crate::style::expression::parsing::{ParsingContext, TypeAnnotation};
use crate::style::expression::types::{check_subtype, Type};
use crate::style::expression::value::Value;

/// `["coalesce", a, b, ...]`: first argument that is neither null nor a
/// missing image.
#[derive(Debug, Clone)]
pub struct Coalesce {
    pub ty: Type,
    pub args: Vec<Expression>,
}

impl Coalesce {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() < 2 {
            return ctx.error("Expected at least one argument.");
        }

        let expected = ctx.expected_type.clone();
        let mut output_type = expected.clone().filter(|t| !t.is_value());
        let mut parsed = Vec::with_capacity(args.len() - 1);
        for (i, arg) in args.iter().enumerate().skip(1) {
            // No automatic assertion: a null argument must fall through.
            let expr = ctx.parse_with_annotation(arg, i, output_type.clone(), TypeAnnotation::Omit)?;
            output_type.get_or_insert_with(|| expr.ty());
            parsed.push(expr);
        }

        // Arguments looser than the expected type leave the result as
        // `value`, so the caller's own annotation checks it at runtime.
        let needs_annotation = expected
            .as_ref()
            .map(|exp| parsed.iter().any(|arg| check_subtype(exp, &arg.ty()).is_some()))
            .unwrap_or(false);
        let ty = if needs_annotation {
            Type::Value
        } else {
            output_type.unwrap_or(Type::Value)
        };
        Some(Expression::Coalesce(Coalesce { ty, args: parsed }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let mut first_image: Option<Value> = None;
        for arg in &self.args {
            let result = arg.evaluate(ctx)?;
            match &result {
                Value::Image(img) if !img.available => {
                    if first_image.is_none() {
                        first_image = Some(result);
                    }
                }
                Value::Null => {}
                _ => return Ok(result),
            }
        }
        // Returning the missing image (not null) lets consumers report it.
        Ok(first_image.unwrap_or(Value::Null))
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!("coalesce")];
        out.extend(self.args.iter().map(Expression::serialize));
        JsonValue::Array(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::expression::evaluation::{Feature, GeometryType, GlobalProperties};
    use crate::style::expression::formatted::ResolvedImage;

    fn parse(expr: JsonValue, expected: Option<Type>) -> Expression {
        let ctx = ParsingContext::new(expected);
        ctx.parse_here(&expr, None)
            .unwrap_or_else(|| panic!("{:?}", ctx.errors()))
    }

    #[test]
    fn test_null_then_value() {
        let e = parse(json!(["coalesce", ["get", "missing"], ["get", "name"]]), None);
        let f = Feature::new(GeometryType::Point).with_property("name", "x");
        let ctx = EvaluationContext::new(GlobalProperties::new(0.0)).with_feature(&f);
        assert_eq!(e.evaluate(&ctx).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_all_missing_images_returns_first() {
        let e = parse(
            json!(["coalesce", ["image", ["get", "a"]], ["image", ["get", "b"]]]),
            Some(Type::ResolvedImage),
        );
        let f = Feature::new(GeometryType::Point)
            .with_property("a", "first")
            .with_property("b", "second");
        let ctx = EvaluationContext::new(GlobalProperties::new(0.0)).with_feature(&f);
        assert_eq!(
            e.evaluate(&ctx).unwrap(),
            Value::Image(ResolvedImage {
                name: "first".into(),
                available: false
            })
        );

        let images = vec!["second".to_string()];
        let ctx = EvaluationContext::new(GlobalProperties::new(0.0))
            .with_feature(&f)
            .with_available_images(&images);
        assert_eq!(
            e.evaluate(&ctx).unwrap(),
            Value::Image(ResolvedImage {
                name: "second".into(),
                available: true
            })
        );
    }

    #[test]
    fn test_type_widens_to_value_when_needed() {
        let e = parse(json!(["coalesce", ["get", "a"], 1]), Some(Type::Number));
        // The outer assertion is inserted by the parsing context.
        assert_eq!(e.ty(), Type::Number);
        assert!(matches!(e, Expression::Assertion(_)));
        let inner = parse(json!(["coalesce", 1, 2]), Some(Type::Number));
        assert_eq!(inner.ty(), Type::Number);
    }
}
