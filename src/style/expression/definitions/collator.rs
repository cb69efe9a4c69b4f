use serde_json::{json, Value as JsonValue};

use super::{evaluate_string, Expression};
use crate::style::expression::evaluation::{EvalError, EvalResult, EvaluationContext};
use crate::style::expression::formatted::Collator;
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::Type;
use crate::style::expression::value::{type_of, Value};

/// `["collator", {"case-sensitive": ..., "diacritic-sensitive": ..., "locale": ...}]`
#[derive(Debug, Clone)]
pub struct CollatorExpression {
    pub case_sensitive: Box<Expression>,
    pub diacritic_sensitive: Box<Expression>,
    pub locale: Option<Box<Expression>>,
}

impl CollatorExpression {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() != 2 {
            return ctx.error("Expected one argument.");
        }
        let Some(options) = args[1].as_object() else {
            return ctx.error("Collator options argument must be an object.");
        };

        let flag = |key: &str| -> Option<Expression> {
            let raw = options.get(key).cloned().unwrap_or(JsonValue::Bool(false));
            ctx.parse(&raw, 1, Some(Type::Boolean))
        };
        let case_sensitive = flag("case-sensitive")?;
        let diacritic_sensitive = flag("diacritic-sensitive")?;
        let locale = match options.get("locale") {
            Some(raw) if is_present(raw) => Some(Box::new(ctx.parse(raw, 1, Some(Type::String))?)),
            _ => None,
        };

        Some(Expression::Collator(CollatorExpression {
            case_sensitive: Box::new(case_sensitive),
            diacritic_sensitive: Box::new(diacritic_sensitive),
            locale,
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let case_sensitive = evaluate_flag(&self.case_sensitive, ctx)?;
        let diacritic_sensitive = evaluate_flag(&self.diacritic_sensitive, ctx)?;
        let locale = match &self.locale {
            Some(expr) => Some(evaluate_string(expr, ctx)?),
            None => None,
        };
        Ok(Value::Collator(Collator::new(case_sensitive, diacritic_sensitive, locale)))
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        f(self.case_sensitive.as_ref());
        f(self.diacritic_sensitive.as_ref());
        if let Some(locale) = &self.locale {
            f(locale.as_ref());
        }
    }

    pub fn serialize(&self) -> JsonValue {
        let mut options = serde_json::Map::new();
        options.insert("case-sensitive".into(), self.case_sensitive.serialize());
        options.insert("diacritic-sensitive".into(), self.diacritic_sensitive.serialize());
        if let Some(locale) = &self.locale {
            options.insert("locale".into(), locale.serialize());
        }
        json!(["collator", options])
    }
}

/// JS truthiness of an option value as written in the style.
pub(super) fn is_present(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

fn evaluate_flag(expr: &Expression, ctx: &EvaluationContext) -> Result<bool, EvalError> {
    let value = expr.evaluate(ctx)?;
    value.as_bool().ok_or_else(|| {
        EvalError::new(format!(
            "Expected value to be of type boolean, but found {} instead.",
            type_of(&value)
        ))
    })
}
