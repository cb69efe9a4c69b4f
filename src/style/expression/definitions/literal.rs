use serde_json::{json, Value as JsonValue};

use super::Expression;
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::Type;
use crate::style::expression::value::{number_to_json, type_of, Value};

/// A constant value.
#[derive(Debug, Clone)]
pub struct Literal {
    pub ty: Type,
    pub value: Value,
}

impl Literal {
    pub fn new(ty: Type, value: Value) -> Self {
        Self { ty, value }
    }

    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() != 2 {
            return ctx.error(format!(
                "'literal' expression requires exactly one argument, but found {} instead.",
                args.len() - 1
            ));
        }
        let value = Value::from_json(&args[1]);
        let mut ty = type_of(&value);

        // An empty array literal takes its item type from context.
        if let (Type::Array { length: Some(0), .. }, Some(expected @ Type::Array { length, .. })) =
            (&ty, &ctx.expected_type)
        {
            if length.is_none() || *length == Some(0) {
                ty = expected.clone();
            }
        }
        Some(Expression::Literal(Literal::new(ty, value)))
    }

    pub fn serialize(&self) -> JsonValue {
        match (&self.ty, &self.value) {
            (Type::Array { .. } | Type::Object, value) => json!(["literal", value.to_json()]),
            (_, Value::Color(c)) => {
                let mut out = vec![json!("rgba")];
                out.extend(c.to_array().into_iter().map(number_to_json));
                JsonValue::Array(out)
            }
            (_, Value::Formatted(f)) => f.serialize(),
            (_, Value::Image(img)) => img.serialize(),
            (_, Value::Collator(c)) => json!(["collator", c.to_json()]),
            (_, value) => value.to_json(),
        }
    }
}
