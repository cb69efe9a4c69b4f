use serde_json::{json, Value as JsonValue};

use super::{evaluate_number, Expression};
use crate::style::expression::evaluation::{EvalResult, EvaluationContext};
use crate::style::expression::interpolation::find_stop_less_than_or_equal_to;
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::Type;
use crate::style::expression::value::number_to_json;

/// `["step", input, out0, t1, out1, ...]`: piecewise-constant curve.
#[derive(Debug, Clone)]
pub struct Step {
    pub ty: Type,
    pub input: Box<Expression>,
    /// Thresholds; the first is always `-inf`.
    pub labels: Vec<f64>,
    pub outputs: Vec<Expression>,
}

impl Step {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() - 1 < 4 {
            return ctx.error(format!(
                "Expected at least 4 arguments, but found only {}.",
                args.len() - 1
            ));
        }
        if (args.len() - 1) % 2 != 0 {
            return ctx.error("Expected an even number of arguments.");
        }

        let input = ctx.parse(&args[1], 1, Some(Type::Number))?;
        let mut output_type = ctx.expected_type.clone().filter(|t| !t.is_value());
        let mut labels: Vec<f64> = Vec::new();
        let mut outputs = Vec::new();

        let mut i = 1;
        while i < args.len() {
            let label = if i == 1 {
                f64::NEG_INFINITY
            } else {
                match args[i].as_f64() {
                    Some(v) => v,
                    None => {
                        return ctx.error_at(
                            "Input/output pairs for \"step\" expressions must be defined using literal numeric values (not computed expressions) for the input values.",
                            &[i],
                        )
                    }
                }
            };
            if labels.last().map(|prev| *prev >= label).unwrap_or(false) {
                return ctx.error_at(
                    "Input/output pairs for \"step\" expressions must be arranged with input values in strictly ascending order.",
                    &[i],
                );
            }
            let parsed = ctx.parse(&args[i + 1], i + 1, output_type.clone())?;
            output_type.get_or_insert_with(|| parsed.ty());
            labels.push(label);
            outputs.push(parsed);
            i += 2;
        }

        Some(Expression::Step(Step {
            ty: output_type.unwrap_or(Type::Value),
            input: Box::new(input),
            labels,
            outputs,
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let labels = &self.labels;
        let outputs = &self.outputs;
        if labels.len() == 1 {
            return outputs[0].evaluate(ctx);
        }

        let value = evaluate_number(&self.input, ctx)?;
        if value <= labels[0] {
            return outputs[0].evaluate(ctx);
        }
        let stop_count = labels.len();
        if value >= labels[stop_count - 1] {
            return outputs[stop_count - 1].evaluate(ctx);
        }
        let index = find_stop_less_than_or_equal_to(labels, value)?;
        outputs[index].evaluate(ctx)
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        f(self.input.as_ref());
        for output in &self.outputs {
            f(output);
        }
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!("step"), self.input.serialize()];
        for (i, output) in self.outputs.iter().enumerate() {
            if i > 0 {
                out.push(number_to_json(self.labels[i]));
            }
            out.push(output.serialize());
        }
        JsonValue::Array(out)
    }
}
