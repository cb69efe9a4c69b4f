use std::rc::Rc;

use serde_json::{json, Value as JsonValue};

use super::Expression;
use crate::style::expression::evaluation::{EvalResult, EvaluationContext};
use crate::style::expression::parsing::{json_type_name, ParsingContext};

/// `["let", name, value, ..., body]`
#[derive(Debug, Clone)]
pub struct Let {
    pub bindings: Vec<(String, Rc<Expression>)>,
    pub result: Box<Expression>,
}

impl Let {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() < 4 {
            return ctx.error(format!(
                "Expected at least 3 arguments, but found {} instead.",
                args.len() - 1
            ));
        }

        let mut bindings: Vec<(String, Rc<Expression>)> = Vec::new();
        let mut i = 1;
        while i < args.len() - 1 {
            let Some(name) = args[i].as_str() else {
                return ctx.error_at(
                    format!("Expected string, but found {} instead.", json_type_name(&args[i])),
                    &[i],
                );
            };
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return ctx.error_at(
                    "Variable names must contain only alphanumeric characters or '_'.",
                    &[i],
                );
            }
            // Each binding sees the ones declared before it.
            let value = if bindings.is_empty() {
                ctx.parse(&args[i + 1], i + 1, None)?
            } else {
                ctx.parse_with_bindings(&args[i + 1], i + 1, None, bindings.clone())?
            };
            bindings.push((name.to_string(), Rc::new(value)));
            i += 2;
        }

        let last = args.len() - 1;
        let result = ctx.parse_with_bindings(&args[last], last, ctx.expected_type.clone(), bindings.clone())?;
        Some(Expression::Let(Let {
            bindings,
            result: Box::new(result),
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        self.result.evaluate(ctx)
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        for (_, value) in &self.bindings {
            f(value.as_ref());
        }
        f(self.result.as_ref());
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!("let")];
        for (name, value) in &self.bindings {
            out.push(json!(name));
            out.push(value.serialize());
        }
        out.push(self.result.serialize());
        JsonValue::Array(out)
    }
}

/// `["var", name]`, resolved at parse time to the bound expression.
#[derive(Debug, Clone)]
pub struct Var {
    pub name: String,
    bound: Rc<Expression>,
}

impl Var {
    pub fn bound(&self) -> &Expression {
        self.bound.as_ref()
    }

    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        let name = match args {
            [_, JsonValue::String(name)] => name,
            _ => return ctx.error("'var' expression requires exactly one string literal argument."),
        };
        match ctx.scope().get(name) {
            Some(bound) => Some(Expression::Var(Var {
                name: name.clone(),
                bound,
            })),
            None => ctx.error_at(
                format!(
                    "Unknown variable \"{0}\". Make sure \"{0}\" has been bound in an enclosing \"let\" expression before using it.",
                    name
                ),
                &[1],
            ),
        }
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        self.bound.evaluate(ctx)
    }

    pub fn serialize(&self) -> JsonValue {
        json!(["var", self.name])
    }
}
