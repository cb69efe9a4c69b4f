use std::cmp::Ordering;

use serde_json::{json, Value as JsonValue};

use super::{Assertion, Expression};
use crate::style::expression::evaluation::{EvalError, EvalResult, EvaluationContext};
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::Type;
use crate::style::expression::value::{type_of, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl ComparisonOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "==" => ComparisonOp::Equal,
            "!=" => ComparisonOp::NotEqual,
            "<" => ComparisonOp::Less,
            ">" => ComparisonOp::Greater,
            "<=" => ComparisonOp::LessEqual,
            ">=" => ComparisonOp::GreaterEqual,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "==",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::Less => "<",
            ComparisonOp::Greater => ">",
            ComparisonOp::LessEqual => "<=",
            ComparisonOp::GreaterEqual => ">=",
        }
    }

    pub fn is_order(&self) -> bool {
        !matches!(self, ComparisonOp::Equal | ComparisonOp::NotEqual)
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::Less => ordering == Ordering::Less,
            ComparisonOp::Greater => ordering == Ordering::Greater,
            ComparisonOp::LessEqual => ordering != Ordering::Greater,
            ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        }
    }

    fn is_comparable(&self, ty: &Type) -> bool {
        if self.is_order() {
            matches!(ty, Type::String | Type::Number | Type::Value)
        } else {
            matches!(
                ty,
                Type::Boolean | Type::String | Type::Number | Type::Null | Type::Value
            )
        }
    }
}

/// `["==", a, b, collator?]` and the other five comparison operators.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub op: ComparisonOp,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
    pub collator: Option<Box<Expression>>,
    has_untyped_argument: bool,
}

impl Comparison {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() != 3 && args.len() != 4 {
            return ctx.error("Expected two or three arguments.");
        }
        let op = ComparisonOp::from_name(args[0].as_str().unwrap_or_default())?;

        let mut lhs = ctx.parse(&args[1], 1, Some(Type::Value))?;
        if !op.is_comparable(&lhs.ty()) {
            return ctx.error_at(
                format!(
                    "\"{}\" comparisons are not supported for type '{}'.",
                    op.name(),
                    lhs.ty()
                ),
                &[1],
            );
        }
        let mut rhs = ctx.parse(&args[2], 2, Some(Type::Value))?;
        if !op.is_comparable(&rhs.ty()) {
            return ctx.error_at(
                format!(
                    "\"{}\" comparisons are not supported for type '{}'.",
                    op.name(),
                    rhs.ty()
                ),
                &[2],
            );
        }

        let (lt, rt) = (lhs.ty(), rhs.ty());
        if !lt.same_kind(&rt) && !lt.is_value() && !rt.is_value() {
            return ctx.error(format!("Cannot compare types '{}' and '{}'.", lt, rt));
        }

        if op.is_order() {
            if lt.is_value() && !rt.is_value() {
                lhs = Expression::Assertion(Assertion::new(rt.clone(), vec![lhs]));
            } else if !lt.is_value() && rt.is_value() {
                rhs = Expression::Assertion(Assertion::new(lt.clone(), vec![rhs]));
            }
        }

        let mut collator = None;
        if args.len() == 4 {
            let string_like = |t: &Type| matches!(t, Type::String | Type::Value);
            if !string_like(&lt) && !string_like(&rt) {
                return ctx.error("Cannot use collator to compare non-string types.");
            }
            collator = Some(Box::new(ctx.parse(&args[3], 3, Some(Type::Collator))?));
        }

        let has_untyped_argument = lhs.ty().is_value() || rhs.ty().is_value();
        Some(Expression::Comparison(Comparison {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            collator,
            has_untyped_argument,
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let lhs = self.lhs.evaluate(ctx)?;
        let rhs = self.rhs.evaluate(ctx)?;

        if self.op.is_order() && self.has_untyped_argument {
            let (lt, rt) = (type_of(&lhs), type_of(&rhs));
            if !lt.same_kind(&rt) || !matches!(lt, Type::String | Type::Number) {
                return Err(EvalError::new(format!(
                    "Expected arguments for \"{}\" to be (string, string) or (number, number), but found ({}, {}) instead.",
                    self.op.name(),
                    lt.kind(),
                    rt.kind()
                )));
            }
        }

        let Some(collator) = &self.collator else {
            return Ok(Value::Bool(self.compare_basic(&lhs, &rhs)));
        };
        let (Value::String(a), Value::String(b)) = (&lhs, &rhs) else {
            if !self.op.is_order() && self.has_untyped_argument {
                return Ok(Value::Bool(self.compare_basic(&lhs, &rhs)));
            }
            return Err(EvalError::new(format!(
                "Expected arguments for \"{}\" to be (string, string), but found ({}, {}) instead.",
                self.op.name(),
                type_of(&lhs).kind(),
                type_of(&rhs).kind()
            )));
        };
        match collator.evaluate(ctx)? {
            Value::Collator(c) => Ok(Value::Bool(self.op.holds(c.compare(a, b)))),
            other => Err(EvalError::new(format!(
                "Expected value to be of type collator, but found {} instead.",
                type_of(&other)
            ))),
        }
    }

    fn compare_basic(&self, lhs: &Value, rhs: &Value) -> bool {
        match self.op {
            ComparisonOp::Equal => lhs.strict_equals(rhs),
            ComparisonOp::NotEqual => !lhs.strict_equals(rhs),
            _ => {
                let ordering = match (lhs, rhs) {
                    (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                    _ => None,
                };
                // NaN never orders.
                ordering.map(|o| self.op.holds(o)).unwrap_or(false)
            }
        }
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        f(self.lhs.as_ref());
        f(self.rhs.as_ref());
        if let Some(collator) = &self.collator {
            f(collator.as_ref());
        }
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!(self.op.name()), self.lhs.serialize(), self.rhs.serialize()];
        if let Some(collator) = &self.collator {
            out.push(collator.serialize());
        }
        JsonValue::Array(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::expression::evaluation::{Feature, GeometryType, GlobalProperties};

    fn parse(expr: JsonValue) -> Result<Expression, Vec<String>> {
        let ctx = ParsingContext::new(None);
        ctx.parse_here(&expr, None)
            .ok_or_else(|| ctx.errors().into_iter().map(|e| e.to_string()).collect())
    }

    fn eval_on(e: &Expression, feature: &Feature) -> EvalResult {
        e.evaluate(&EvaluationContext::new(GlobalProperties::new(0.0)).with_feature(feature))
    }

    #[test]
    fn test_equality_on_untyped_values() {
        let e = parse(json!(["==", ["get", "class"], "park"])).unwrap();
        let park = Feature::new(GeometryType::Polygon).with_property("class", "park");
        let num = Feature::new(GeometryType::Polygon).with_property("class", 1.0);
        assert_eq!(eval_on(&e, &park).unwrap(), Value::Bool(true));
        assert_eq!(eval_on(&e, &num).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_order_comparison_asserts_untyped_side() {
        let e = parse(json!(["<", ["get", "n"], 10])).unwrap();
        match &e {
            Expression::Comparison(c) => assert!(matches!(c.lhs.as_ref(), Expression::Assertion(_))),
            other => panic!("unexpected {:?}", other.serialize()),
        }
        let f = Feature::new(GeometryType::Point).with_property("n", 3.0);
        assert_eq!(eval_on(&e, &f).unwrap(), Value::Bool(true));
        let f = Feature::new(GeometryType::Point).with_property("n", "3");
        assert_eq!(
            eval_on(&e, &f).unwrap_err().message,
            "Expected value to be of type number, but found string instead."
        );
    }

    #[test]
    fn test_both_untyped_order_comparison() {
        let e = parse(json!([">", ["get", "a"], ["get", "b"]])).unwrap();
        let f = Feature::new(GeometryType::Point)
            .with_property("a", "b")
            .with_property("b", "a");
        assert_eq!(eval_on(&e, &f).unwrap(), Value::Bool(true));
        let f = Feature::new(GeometryType::Point)
            .with_property("a", 1.0)
            .with_property("b", "a");
        assert_eq!(
            eval_on(&e, &f).unwrap_err().message,
            "Expected arguments for \">\" to be (string, string) or (number, number), but found (number, string) instead."
        );
    }

    #[test]
    fn test_parse_errors() {
        let errs = parse(json!(["==", 1])).unwrap_err();
        assert_eq!(errs[0], ": Expected two or three arguments.");
        let errs = parse(json!(["==", 1, "a"])).unwrap_err();
        assert_eq!(errs[0], ": Cannot compare types 'number' and 'string'.");
        let errs = parse(json!(["<", true, false])).unwrap_err();
        assert_eq!(errs[0], "[1]: \"<\" comparisons are not supported for type 'boolean'.");
        let errs = parse(json!(["==", 1, 2, ["collator", {}]])).unwrap_err();
        assert_eq!(errs[0], ": Cannot use collator to compare non-string types.");
    }

    #[test]
    fn test_collator_comparison() {
        let e = parse(json!([
            "==", ["get", "name"], "CAFE",
            ["collator", {"case-sensitive": false, "diacritic-sensitive": false}]
        ]))
        .unwrap();
        let f = Feature::new(GeometryType::Point).with_property("name", "café");
        assert_eq!(eval_on(&e, &f).unwrap(), Value::Bool(true));
        // Non-string untyped operand falls back to strict equality.
        let f = Feature::new(GeometryType::Point).with_property("name", 1.0);
        assert_eq!(eval_on(&e, &f).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_constant_comparison_folds() {
        let e = parse(json!(["<=", "a", "b"])).unwrap();
        assert!(matches!(e, Expression::Literal(_)));
        assert_eq!(
            e.evaluate(&EvaluationContext::default()).unwrap(),
            Value::Bool(true)
        );
    }
}
