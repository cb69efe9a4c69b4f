use serde_json::{json, Value as JsonValue};

use super::Expression;
use crate::style::expression::evaluation::{EvalResult, EvaluationContext};
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::Type;

/// `["case", cond1, out1, cond2, out2, ..., fallback]`
#[derive(Debug, Clone)]
pub struct Case {
    pub ty: Type,
    pub branches: Vec<(Expression, Expression)>,
    pub otherwise: Box<Expression>,
}

impl Case {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() < 4 {
            return ctx.error(format!(
                "Expected at least 3 arguments, but found only {}.",
                args.len() - 1
            ));
        }
        if args.len() % 2 != 0 {
            return ctx.error("Expected an odd number of arguments.");
        }

        let mut output_type = ctx.expected_type.clone().filter(|t| !t.is_value());
        let mut branches = Vec::new();
        let mut i = 1;
        while i < args.len() - 1 {
            let test = ctx.parse(&args[i], i, Some(Type::Boolean))?;
            let result = ctx.parse(&args[i + 1], i + 1, output_type.clone())?;
            output_type.get_or_insert_with(|| result.ty());
            branches.push((test, result));
            i += 2;
        }

        let last = args.len() - 1;
        let otherwise = ctx.parse(&args[last], last, output_type.clone())?;
        let ty = output_type.unwrap_or_else(|| otherwise.ty());
        Some(Expression::Case(Case {
            ty,
            branches,
            otherwise: Box::new(otherwise),
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        for (test, expression) in &self.branches {
            if test.evaluate(ctx)?.is_truthy() {
                return expression.evaluate(ctx);
            }
        }
        self.otherwise.evaluate(ctx)
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        for (test, expression) in &self.branches {
            f(test);
            f(expression);
        }
        f(self.otherwise.as_ref());
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!("case")];
        for (test, expression) in &self.branches {
            out.push(test.serialize());
            out.push(expression.serialize());
        }
        out.push(self.otherwise.serialize());
        JsonValue::Array(out)
    }
}
