use std::collections::BTreeMap;

use serde_json::{json, Value as JsonValue};

use super::Expression;
use crate::style::expression::evaluation::{EvalResult, EvaluationContext};
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::Type;
use crate::style::expression::value::Value;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A `match` branch label: an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchLabel {
    Number(i64),
    String(String),
}

impl MatchLabel {
    fn ty(&self) -> Type {
        match self {
            MatchLabel::Number(_) => Type::Number,
            MatchLabel::String(_) => Type::String,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            MatchLabel::Number(n) => json!(n),
            MatchLabel::String(s) => json!(s),
        }
    }

    /// Lookup key for a runtime value of the label type.
    fn from_value(value: &Value) -> Option<MatchLabel> {
        match value {
            Value::String(s) => Some(MatchLabel::String(s.clone())),
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                Some(MatchLabel::Number(*n as i64))
            }
            _ => None,
        }
    }
}

/// `["match", input, labels1, out1, labels2, out2, ..., fallback]`
#[derive(Debug, Clone)]
pub struct Match {
    pub input_type: Type,
    pub ty: Type,
    pub input: Box<Expression>,
    pub cases: BTreeMap<MatchLabel, usize>,
    pub outputs: Vec<Expression>,
    pub otherwise: Box<Expression>,
}

impl Match {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() < 5 {
            return ctx.error(format!(
                "Expected at least 4 arguments, but found only {}.",
                args.len() - 1
            ));
        }
        if args.len() % 2 != 1 {
            return ctx.error("Expected an even number of arguments.");
        }

        let mut input_type: Option<Type> = None;
        let mut output_type = ctx.expected_type.clone().filter(|t| !t.is_value());
        let mut cases = BTreeMap::new();
        let mut outputs = Vec::new();

        let mut i = 2;
        while i < args.len() - 1 {
            let labels = match &args[i] {
                JsonValue::Array(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            let label_ctx = ctx.concat(Some(i), None, None);
            if labels.is_empty() {
                return label_ctx.error("Expected at least one branch label.");
            }

            for raw in labels {
                let label = match raw {
                    JsonValue::String(s) => MatchLabel::String(s.clone()),
                    JsonValue::Number(n) => {
                        let v = n.as_f64().unwrap_or(f64::NAN);
                        if v.abs() > MAX_SAFE_INTEGER {
                            return label_ctx.error(format!(
                                "Branch labels must be integers no larger than {}.",
                                MAX_SAFE_INTEGER as i64
                            ));
                        }
                        if v.fract() != 0.0 {
                            return label_ctx.error("Numeric branch labels must be integer values.");
                        }
                        MatchLabel::Number(v as i64)
                    }
                    _ => return label_ctx.error("Branch labels must be numbers or strings."),
                };
                match &input_type {
                    None => input_type = Some(label.ty()),
                    Some(t) => {
                        if label_ctx.check_subtype(t, &label.ty()).is_some() {
                            return None;
                        }
                    }
                }
                if cases.contains_key(&label) {
                    return label_ctx.error("Branch labels must be unique.");
                }
                cases.insert(label, outputs.len());
            }

            let result = ctx.parse(&args[i + 1], i + 1, output_type.clone())?;
            output_type.get_or_insert_with(|| result.ty());
            outputs.push(result);
            i += 2;
        }

        let input = ctx.parse(&args[1], 1, Some(Type::Value))?;
        let last = args.len() - 1;
        let otherwise = ctx.parse(&args[last], last, output_type.clone())?;

        let input_type = input_type.unwrap_or(Type::Value);
        if !input.ty().is_value()
            && ctx
                .concat(Some(1), None, None)
                .check_subtype(&input_type, &input.ty())
                .is_some()
        {
            return None;
        }

        let ty = output_type.unwrap_or_else(|| otherwise.ty());
        Some(Expression::Match(Match {
            input_type,
            ty,
            input: Box::new(input),
            cases,
            outputs,
            otherwise: Box::new(otherwise),
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let input = self.input.evaluate(ctx)?;
        let matches_type = matches!(
            (&self.input_type, &input),
            (Type::Number, Value::Number(_)) | (Type::String, Value::String(_))
        );
        let output = matches_type
            .then(|| MatchLabel::from_value(&input))
            .flatten()
            .and_then(|label| self.cases.get(&label))
            .and_then(|&index| self.outputs.get(index))
            .unwrap_or(self.otherwise.as_ref());
        output.evaluate(ctx)
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        f(self.input.as_ref());
        for output in &self.outputs {
            f(output);
        }
        f(self.otherwise.as_ref());
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!("match"), self.input.serialize()];

        // Group labels by output, ordered by each output's first label.
        let mut grouped: Vec<(usize, Vec<&MatchLabel>)> = Vec::new();
        for (label, &index) in &self.cases {
            match grouped.iter_mut().find(|(i, _)| *i == index) {
                Some((_, labels)) => labels.push(label),
                None => grouped.push((index, vec![label])),
            }
        }
        for (index, labels) in grouped {
            if labels.len() == 1 {
                out.push(labels[0].to_json());
            } else {
                out.push(JsonValue::Array(labels.iter().map(|l| l.to_json()).collect()));
            }
            out.push(self.outputs[index].serialize());
        }
        out.push(self.otherwise.serialize());
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

    fn eval_prop(e: &Expression, key: &str, value: Value) -> Value {
        let f = Feature::new(GeometryType::Point).with_property(key, value);
        e.evaluate(&EvaluationContext::new(GlobalProperties::new(0.0)).with_feature(&f))
            .unwrap()
    }

    #[test]
    fn test_match_labels_and_fallback() {
        let e = parse(json!(["match", ["get", "k"], ["a", "b"], 1, "c", 2, 0])).unwrap();
        assert_eq!(eval_prop(&e, "k", Value::from("b")), Value::Number(1.0));
        assert_eq!(eval_prop(&e, "k", Value::from("c")), Value::Number(2.0));
        assert_eq!(eval_prop(&e, "k", Value::from("z")), Value::Number(0.0));
        // Wrong runtime type hits the fallback.
        assert_eq!(eval_prop(&e, "k", Value::Number(1.0)), Value::Number(0.0));
    }

    #[test]
    fn test_numeric_labels() {
        let e = parse(json!(["match", ["get", "n"], [1, 2], "low", 3, "three", "other"])).unwrap();
        assert_eq!(eval_prop(&e, "n", Value::Number(2.0)), Value::from("low"));
        assert_eq!(eval_prop(&e, "n", Value::Number(2.5)), Value::from("other"));
        assert_eq!(eval_prop(&e, "n", Value::from("3")), Value::from("other"));
    }

    #[test]
    fn test_label_errors() {
        let errs = parse(json!(["match", ["get", "k"], "a", 1, "a", 2, 0])).unwrap_err();
        assert_eq!(errs[0], "[4]: Branch labels must be unique.");
        let errs = parse(json!(["match", ["get", "k"], 1.5, 1, 0])).unwrap_err();
        assert_eq!(errs[0], "[2]: Numeric branch labels must be integer values.");
        let errs = parse(json!(["match", ["get", "k"], [], 1, 0])).unwrap_err();
        assert_eq!(errs[0], "[2]: Expected at least one branch label.");
        let errs = parse(json!(["match", ["get", "k"], "a", 1, 2, 2, 0])).unwrap_err();
        assert_eq!(errs[0], "[4]: Expected string but found number instead.");
    }

    #[test]
    fn test_serialize_groups_labels() {
        let e = parse(json!(["match", ["get", "k"], ["a", "b"], 1, "c", 2, 0])).unwrap();
        assert_eq!(
            e.serialize(),
            json!(["match", ["get", "k"], ["a", "b"], 1, "c", 2, 0])
        );
    }
}
