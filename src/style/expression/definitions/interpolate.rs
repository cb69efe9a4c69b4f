use serde_json::{json, Value as JsonValue};

use super::{evaluate_number, Expression};
use crate::style::expression::color::Color;
use crate::style::expression::color_spaces::{
    hcl_to_rgb, interpolate_hcl, interpolate_lab, lab_to_rgb, rgb_to_hcl, rgb_to_lab,
};
use crate::style::expression::evaluation::{EvalError, EvalResult, EvaluationContext};
use crate::style::expression::interpolation::{
    find_stop_less_than_or_equal_to, interpolate_array, interpolate_color, interpolate_number,
    InterpolationType,
};
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::Type;
use crate::style::expression::value::{number_to_json, type_of, Value};

/// Color space an `interpolate` variant blends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolateOperator {
    Interpolate,
    InterpolateHcl,
    InterpolateLab,
}

impl InterpolateOperator {
    pub fn name(&self) -> &'static str {
        match self {
            InterpolateOperator::Interpolate => "interpolate",
            InterpolateOperator::InterpolateHcl => "interpolate-hcl",
            InterpolateOperator::InterpolateLab => "interpolate-lab",
        }
    }

    fn from_name(name: &str) -> Self {
        match name {
            "interpolate-hcl" => InterpolateOperator::InterpolateHcl,
            "interpolate-lab" => InterpolateOperator::InterpolateLab,
            _ => InterpolateOperator::Interpolate,
        }
    }
}

/// `[op, interpolation, input, l1, o1, l2, o2, ...]`: continuous curve
/// between numeric stops.
#[derive(Debug, Clone)]
pub struct Interpolate {
    pub ty: Type,
    pub operator: InterpolateOperator,
    pub interpolation: InterpolationType,
    pub input: Box<Expression>,
    pub labels: Vec<f64>,
    pub outputs: Vec<Expression>,
}

impl Interpolate {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        let operator = InterpolateOperator::from_name(args[0].as_str().unwrap_or_default());

        let interpolation = match args.get(1) {
            Some(JsonValue::Array(spec)) if !spec.is_empty() => parse_interpolation_type(spec, ctx)?,
            _ => return ctx.error_at("Expected an interpolation type expression.", &[1]),
        };

        if args.len() - 1 < 4 {
            return ctx.error(format!(
                "Expected at least 4 arguments, but found only {}.",
                args.len() - 1
            ));
        }
        if (args.len() - 1) % 2 != 0 {
            return ctx.error("Expected an even number of arguments.");
        }

        let input = ctx.parse(&args[2], 2, Some(Type::Number))?;

        let mut output_type = match operator {
            InterpolateOperator::InterpolateHcl | InterpolateOperator::InterpolateLab => Some(Type::Color),
            InterpolateOperator::Interpolate => ctx.expected_type.clone().filter(|t| !t.is_value()),
        };

        let mut labels: Vec<f64> = Vec::new();
        let mut outputs = Vec::new();
        let stops = &args[3..];
        for (i, pair) in stops.chunks(2).enumerate() {
            let label_key = i * 2 + 3;
            let value_key = i * 2 + 4;
            let Some(label) = pair[0].as_f64() else {
                return ctx.error_at(
                    "Input/output pairs for \"interpolate\" expressions must be defined using literal numeric values (not computed expressions) for the input values.",
                    &[label_key],
                );
            };
            if labels.last().map(|prev| *prev >= label).unwrap_or(false) {
                return ctx.error_at(
                    "Input/output pairs for \"interpolate\" expressions must be arranged with input values in strictly ascending order.",
                    &[label_key],
                );
            }
            let parsed = ctx.parse(&pair[1], value_key, output_type.clone())?;
            output_type.get_or_insert_with(|| parsed.ty());
            labels.push(label);
            outputs.push(parsed);
        }

        let ty = output_type.unwrap_or(Type::Value);
        if !is_interpolatable(&ty) {
            return ctx.error(format!("Type {} is not interpolatable.", ty));
        }

        Some(Expression::Interpolate(Interpolate {
            ty,
            operator,
            interpolation,
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
        let lower = labels[index];
        let upper = labels[index + 1];
        let t = self.interpolation.factor(value, lower, upper);

        let output_lower = outputs[index].evaluate(ctx)?;
        let output_upper = outputs[index + 1].evaluate(ctx)?;

        match self.operator {
            InterpolateOperator::Interpolate => interpolate_values(&output_lower, &output_upper, t),
            InterpolateOperator::InterpolateHcl => {
                let (from, to) = color_pair(&output_lower, &output_upper)?;
                let blended = interpolate_hcl(&rgb_to_hcl(from), &rgb_to_hcl(to), t);
                Ok(Value::Color(hcl_to_rgb(&blended)))
            }
            InterpolateOperator::InterpolateLab => {
                let (from, to) = color_pair(&output_lower, &output_upper)?;
                let blended = interpolate_lab(&rgb_to_lab(from), &rgb_to_lab(to), t);
                Ok(Value::Color(lab_to_rgb(&blended)))
            }
        }
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        f(self.input.as_ref());
        for output in &self.outputs {
            f(output);
        }
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![
            json!(self.operator.name()),
            self.interpolation.serialize(),
            self.input.serialize(),
        ];
        for (label, output) in self.labels.iter().zip(&self.outputs) {
            out.push(number_to_json(*label));
            out.push(output.serialize());
        }
        JsonValue::Array(out)
    }
}

fn parse_interpolation_type(spec: &[JsonValue], ctx: &ParsingContext) -> Option<InterpolationType> {
    match spec[0].as_str() {
        Some("linear") => Some(InterpolationType::Linear),
        Some("exponential") => match spec.get(1).and_then(JsonValue::as_f64) {
            Some(base) => Some(InterpolationType::Exponential { base }),
            None => ctx.error_at("Exponential interpolation requires a numeric base.", &[1, 1]),
        },
        Some("cubic-bezier") => {
            let points: Vec<f64> = spec[1..]
                .iter()
                .filter_map(JsonValue::as_f64)
                .filter(|p| (0.0..=1.0).contains(p))
                .collect();
            if spec.len() != 5 || points.len() != 4 {
                return ctx.error_at(
                    "Cubic bezier interpolation requires four numeric arguments with values between 0 and 1.",
                    &[1],
                );
            }
            Some(InterpolationType::CubicBezier {
                control_points: [points[0], points[1], points[2], points[3]],
            })
        }
        _ => {
            let shown = match &spec[0] {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            ctx.error_at(format!("Unknown interpolation type {}", shown), &[1, 0])
        }
    }
}

fn is_interpolatable(ty: &Type) -> bool {
    match ty {
        Type::Number | Type::Color => true,
        Type::Array { item, length } => **item == Type::Number && length.is_some(),
        _ => false,
    }
}

fn color_pair<'v>(a: &'v Value, b: &'v Value) -> Result<(&'v Color, &'v Color), EvalError> {
    match (a, b) {
        (Value::Color(from), Value::Color(to)) => Ok((from, to)),
        _ => Err(mismatch(a, b)),
    }
}

fn interpolate_values(a: &Value, b: &Value, t: f64) -> EvalResult {
    match (a, b) {
        (Value::Number(from), Value::Number(to)) => Ok(Value::Number(interpolate_number(*from, *to, t))),
        (Value::Color(from), Value::Color(to)) => Ok(Value::Color(interpolate_color(from, to, t))),
        (Value::Array(from), Value::Array(to)) => {
            let from: Option<Vec<f64>> = from.iter().map(Value::as_f64).collect();
            let to: Option<Vec<f64>> = to.iter().map(Value::as_f64).collect();
            match (from, to) {
                (Some(from), Some(to)) => Ok(Value::Array(
                    interpolate_array(&from, &to, t)
                        .into_iter()
                        .map(Value::Number)
                        .collect(),
                )),
                _ => Err(mismatch(a, b)),
            }
        }
        _ => Err(mismatch(a, b)),
    }
}

fn mismatch(a: &Value, b: &Value) -> EvalError {
    EvalError::new(format!(
        "Cannot interpolate between values of type {} and {}.",
        type_of(a),
        type_of(b)
    ))
}
