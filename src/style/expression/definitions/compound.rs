//! Builtins with fixed or variadic signatures, resolved by overload.
//!
//! Each builtin maps to a [`Definition`]: one result type and a list of
//! `(parameters, evaluator)` overloads. Parsing tries the overloads whose
//! arity fits, each against a private error list, and keeps the first
//! one that type-checks.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::f64::consts::{E, LN_2, PI};

use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};

use super::{evaluate_number, evaluate_string, Expression};
use crate::style::expression::color::{validate_rgba, Color};
use crate::style::expression::evaluation::{EvalError, EvalResult, EvaluationContext};
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::Type;
use crate::style::expression::value::{type_of, Value, ValueMap};

/// Evaluator for one overload; receives the already-parsed arguments.
pub type Evaluate = fn(&EvaluationContext, &[Expression]) -> EvalResult;

/// Parameter list of one overload.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Fixed(Vec<Type>),
    Varargs(Type),
}

impl Params {
    fn expected(&self, index: usize) -> Type {
        match self {
            Params::Fixed(types) => types.get(index).cloned().unwrap_or(Type::Value),
            Params::Varargs(ty) => ty.clone(),
        }
    }

    fn accepts_arity(&self, count: usize) -> bool {
        match self {
            Params::Fixed(types) => types.len() == count,
            Params::Varargs(_) => true,
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Params::Fixed(types) => {
                let names: Vec<String> = types.iter().map(Type::to_string).collect();
                write!(f, "({})", names.join(", "))
            }
            Params::Varargs(ty) => write!(f, "({}...)", ty),
        }
    }
}

pub struct Definition {
    pub ty: Type,
    pub overloads: Vec<(Params, Evaluate)>,
}

/// Look up a builtin by operator name.
pub fn definition(name: &str) -> Option<&'static Definition> {
    DEFINITIONS.get(name)
}

/// A call to a builtin with its resolved overload.
#[derive(Clone)]
pub struct CompoundExpression {
    name: &'static str,
    ty: Type,
    evaluate: Evaluate,
    args: Vec<Expression>,
}

impl fmt::Debug for CompoundExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundExpression")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("args", &self.args)
            .finish()
    }
}

impl CompoundExpression {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn args(&self) -> &[Expression] {
        &self.args
    }

    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        let op = args[0].as_str()?;
        let (&name, def) = DEFINITIONS.get_key_value(op)?;
        let arg_count = args.len() - 1;

        let candidates: Vec<&(Params, Evaluate)> = def
            .overloads
            .iter()
            .filter(|(params, _)| params.accepts_arity(arg_count))
            .collect();

        let mut last_errors = Vec::new();
        for (params, evaluate) in &candidates {
            let signature_ctx = ctx.with_fresh_errors();
            let mut parsed = Vec::with_capacity(arg_count);
            for (i, arg) in args.iter().enumerate().skip(1) {
                match signature_ctx.parse(arg, i, Some(params.expected(i - 1))) {
                    Some(expr) => parsed.push(expr),
                    None => break,
                }
            }
            if parsed.len() != arg_count {
                last_errors = signature_ctx.errors();
                continue;
            }

            for (i, arg) in parsed.iter().enumerate() {
                signature_ctx
                    .concat(Some(i + 1), None, None)
                    .check_subtype(&params.expected(i), &arg.ty());
            }

            if !signature_ctx.has_errors() {
                return Some(Expression::Compound(CompoundExpression {
                    name,
                    ty: def.ty.clone(),
                    evaluate: *evaluate,
                    args: parsed,
                }));
            }
            last_errors = signature_ctx.errors();
        }

        if candidates.len() == 1 {
            ctx.extend_errors(last_errors);
            return None;
        }

        let expected: Vec<String> = if candidates.is_empty() {
            def.overloads.iter().map(|(p, _)| p.to_string()).collect()
        } else {
            candidates.iter().map(|(p, _)| p.to_string()).collect()
        };
        let mut actual = Vec::with_capacity(arg_count);
        for (i, arg) in args.iter().enumerate().skip(1) {
            actual.push(ctx.parse(arg, i, None)?.ty().to_string());
        }
        ctx.error(format!(
            "Expected arguments of type {}, but found ({}) instead.",
            expected.join(" | "),
            actual.join(", ")
        ))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        (self.evaluate)(ctx, &self.args)
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!(self.name)];
        out.extend(self.args.iter().map(Expression::serialize));
        JsonValue::Array(out)
    }
}

fn evaluate_bool(expr: &Expression, ctx: &EvaluationContext) -> Result<bool, EvalError> {
    let value = expr.evaluate(ctx)?;
    value.as_bool().ok_or_else(|| {
        EvalError::new(format!(
            "Expected value to be of type boolean, but found {} instead.",
            type_of(&value)
        ))
    })
}

fn evaluate_array(expr: &Expression, ctx: &EvaluationContext) -> Result<Vec<Value>, EvalError> {
    match expr.evaluate(ctx)? {
        Value::Array(items) => Ok(items),
        other => Err(EvalError::new(format!(
            "Expected value to be of type array, but found {} instead.",
            type_of(&other)
        ))),
    }
}

fn evaluate_object(expr: &Expression, ctx: &EvaluationContext) -> Result<ValueMap, EvalError> {
    match expr.evaluate(ctx)? {
        Value::Object(map) => Ok(map),
        other => Err(EvalError::new(format!(
            "Expected value to be of type object, but found {} instead.",
            type_of(&other)
        ))),
    }
}

fn property(ctx: &EvaluationContext, key: &str) -> Option<Value> {
    ctx.properties().and_then(|props| props.get(key)).cloned()
}

/// Ordering between values of the same runtime kind; `None` across kinds.
fn same_kind_order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn binary_search(needle: &Value, haystack: &[Value]) -> bool {
    let (mut lo, mut hi) = (0usize, haystack.len());
    while lo < hi {
        let mid = (lo + hi) / 2;
        match same_kind_order(&haystack[mid], needle) {
            Some(Ordering::Equal) => return true,
            Some(Ordering::Greater) => hi = mid,
            Some(Ordering::Less) => lo = mid + 1,
            None => return false,
        }
    }
    false
}

fn number(n: f64) -> EvalResult {
    Ok(Value::Number(n))
}

fn boolean(b: bool) -> EvalResult {
    Ok(Value::Bool(b))
}

fn fixed(params: Vec<Type>, evaluate: Evaluate) -> (Params, Evaluate) {
    (Params::Fixed(params), evaluate)
}

fn varargs(ty: Type, evaluate: Evaluate) -> (Params, Evaluate) {
    (Params::Varargs(ty), evaluate)
}

fn rgba_from_args(ctx: &EvaluationContext, args: &[Expression]) -> EvalResult {
    let r = evaluate_number(&args[0], ctx)?;
    let g = evaluate_number(&args[1], ctx)?;
    let b = evaluate_number(&args[2], ctx)?;
    let a = match args.get(3) {
        Some(arg) => Some(evaluate_number(arg, ctx)?),
        None => None,
    };
    if let Some(message) = validate_rgba(r, g, b, a) {
        return Err(EvalError::new(message));
    }
    Ok(Value::Color(Color::from_rgba8(r, g, b, a.unwrap_or(1.0))))
}

/// Property comparison for the legacy filter operators.
fn filter_compare(ctx: &EvaluationContext, args: &[Expression], holds: fn(Ordering) -> bool) -> EvalResult {
    let key = evaluate_string(&args[0], ctx)?;
    let b = args[1].evaluate(ctx)?;
    let a = property(ctx, &key).unwrap_or(Value::Null);
    boolean(same_kind_order(&a, &b).map(holds).unwrap_or(false))
}

fn filter_id_compare(ctx: &EvaluationContext, args: &[Expression], holds: fn(Ordering) -> bool) -> EvalResult {
    let b = args[0].evaluate(ctx)?;
    boolean(same_kind_order(&ctx.id(), &b).map(holds).unwrap_or(false))
}

fn lt(o: Ordering) -> bool {
    o == Ordering::Less
}

fn gt(o: Ordering) -> bool {
    o == Ordering::Greater
}

fn le(o: Ordering) -> bool {
    o != Ordering::Greater
}

fn ge(o: Ordering) -> bool {
    o != Ordering::Less
}

fn math_extreme(ctx: &EvaluationContext, args: &[Expression], start: f64, pick: fn(f64, f64) -> f64) -> EvalResult {
    let mut acc = start;
    for arg in args {
        let n = evaluate_number(arg, ctx)?;
        if n.is_nan() {
            return number(f64::NAN);
        }
        acc = pick(acc, n);
    }
    number(acc)
}

macro_rules! math_fn {
    ($f:expr) => {
        |ctx, args| number(($f)(evaluate_number(&args[0], ctx)?))
    };
}

static DEFINITIONS: Lazy<HashMap<&'static str, Definition>> = Lazy::new(build_definitions);

fn build_definitions() -> HashMap<&'static str, Definition> {
    let mut defs: HashMap<&'static str, Definition> = HashMap::new();
    let mut define = |name: &'static str, ty: Type, overloads: Vec<(Params, Evaluate)>| {
        defs.insert(name, Definition { ty, overloads });
    };

    let string_array = Type::array(Type::String, None);
    let value_array = Type::any_array();

    define(
        "error",
        Type::Error,
        vec![fixed(vec![Type::String], |ctx, args| {
            Err(EvalError::new(evaluate_string(&args[0], ctx)?))
        })],
    );
    define(
        "typeof",
        Type::String,
        vec![fixed(vec![Type::Value], |ctx, args| {
            Ok(Value::String(type_of(&args[0].evaluate(ctx)?).to_string()))
        })],
    );
    define(
        "to-rgba",
        Type::array(Type::Number, Some(4)),
        vec![fixed(vec![Type::Color], |ctx, args| match args[0].evaluate(ctx)? {
            Value::Color(c) => Ok(Value::Array(
                c.to_array().into_iter().map(Value::Number).collect(),
            )),
            other => Err(EvalError::new(format!(
                "Expected value to be of type color, but found {} instead.",
                type_of(&other)
            ))),
        })],
    );
    define(
        "rgb",
        Type::Color,
        vec![fixed(vec![Type::Number, Type::Number, Type::Number], rgba_from_args)],
    );
    define(
        "rgba",
        Type::Color,
        vec![fixed(
            vec![Type::Number, Type::Number, Type::Number, Type::Number],
            rgba_from_args,
        )],
    );

    // Feature data
    define(
        "has",
        Type::Boolean,
        vec![
            fixed(vec![Type::String], |ctx, args| {
                let key = evaluate_string(&args[0], ctx)?;
                boolean(property(ctx, &key).is_some())
            }),
            fixed(vec![Type::String, Type::Object], |ctx, args| {
                let key = evaluate_string(&args[0], ctx)?;
                boolean(evaluate_object(&args[1], ctx)?.contains_key(&key))
            }),
        ],
    );
    define(
        "get",
        Type::Value,
        vec![
            fixed(vec![Type::String], |ctx, args| {
                let key = evaluate_string(&args[0], ctx)?;
                Ok(property(ctx, &key).unwrap_or(Value::Null))
            }),
            fixed(vec![Type::String, Type::Object], |ctx, args| {
                let key = evaluate_string(&args[0], ctx)?;
                Ok(evaluate_object(&args[1], ctx)?.remove(&key).unwrap_or(Value::Null))
            }),
        ],
    );
    define(
        "feature-state",
        Type::Value,
        vec![fixed(vec![Type::String], |ctx, args| {
            let key = evaluate_string(&args[0], ctx)?;
            Ok(ctx
                .feature_state
                .and_then(|state| state.get(&key))
                .cloned()
                .unwrap_or(Value::Null))
        })],
    );
    define(
        "properties",
        Type::Object,
        vec![fixed(vec![], |ctx, _| {
            Ok(Value::Object(ctx.properties().cloned().unwrap_or_default()))
        })],
    );
    define(
        "geometry-type",
        Type::String,
        vec![fixed(vec![], |ctx, _| {
            Ok(ctx
                .geometry_type()
                .map(Value::from)
                .unwrap_or(Value::Null))
        })],
    );
    define("id", Type::Value, vec![fixed(vec![], |ctx, _| Ok(ctx.id()))]);

    // Camera and render-pass globals
    define("zoom", Type::Number, vec![fixed(vec![], |ctx, _| number(ctx.globals.zoom))]);
    define(
        "pitch",
        Type::Number,
        vec![fixed(vec![], |ctx, _| number(ctx.globals.pitch.unwrap_or(0.0)))],
    );
    define(
        "distance-from-center",
        Type::Number,
        vec![fixed(vec![], |ctx, _| number(ctx.distance_from_center()))],
    );
    define(
        "heatmap-density",
        Type::Number,
        vec![fixed(vec![], |ctx, _| number(ctx.globals.heatmap_density.unwrap_or(0.0)))],
    );
    define(
        "line-progress",
        Type::Number,
        vec![fixed(vec![], |ctx, _| number(ctx.globals.line_progress.unwrap_or(0.0)))],
    );
    define(
        "accumulated",
        Type::Number,
        vec![fixed(vec![], |ctx, _| {
            Ok(ctx.globals.accumulated.map(Value::Number).unwrap_or(Value::Null))
        })],
    );

    // Arithmetic
    define(
        "+",
        Type::Number,
        vec![varargs(Type::Number, |ctx, args| {
            let mut sum = 0.0;
            for arg in args {
                sum += evaluate_number(arg, ctx)?;
            }
            number(sum)
        })],
    );
    define(
        "*",
        Type::Number,
        vec![varargs(Type::Number, |ctx, args| {
            let mut product = 1.0;
            for arg in args {
                product *= evaluate_number(arg, ctx)?;
            }
            number(product)
        })],
    );
    define(
        "-",
        Type::Number,
        vec![
            fixed(vec![Type::Number, Type::Number], |ctx, args| {
                number(evaluate_number(&args[0], ctx)? - evaluate_number(&args[1], ctx)?)
            }),
            fixed(vec![Type::Number], |ctx, args| number(-evaluate_number(&args[0], ctx)?)),
        ],
    );
    define(
        "/",
        Type::Number,
        vec![fixed(vec![Type::Number, Type::Number], |ctx, args| {
            number(evaluate_number(&args[0], ctx)? / evaluate_number(&args[1], ctx)?)
        })],
    );
    define(
        "%",
        Type::Number,
        vec![fixed(vec![Type::Number, Type::Number], |ctx, args| {
            number(evaluate_number(&args[0], ctx)? % evaluate_number(&args[1], ctx)?)
        })],
    );
    define(
        "^",
        Type::Number,
        vec![fixed(vec![Type::Number, Type::Number], |ctx, args| {
            number(evaluate_number(&args[0], ctx)?.powf(evaluate_number(&args[1], ctx)?))
        })],
    );
    define("ln2", Type::Number, vec![fixed(vec![], |_, _| number(LN_2))]);
    define("pi", Type::Number, vec![fixed(vec![], |_, _| number(PI))]);
    define("e", Type::Number, vec![fixed(vec![], |_, _| number(E))]);

    define("sqrt", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::sqrt))]);
    define("log10", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::log10))]);
    define("ln", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::ln))]);
    define("log2", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::log2))]);
    define("sin", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::sin))]);
    define("cos", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::cos))]);
    define("tan", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::tan))]);
    define("asin", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::asin))]);
    define("acos", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::acos))]);
    define("atan", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::atan))]);
    define("abs", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::abs))]);
    // Halves round away from zero.
    define("round", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::round))]);
    define("floor", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::floor))]);
    define("ceil", Type::Number, vec![fixed(vec![Type::Number], math_fn!(f64::ceil))]);
    define(
        "min",
        Type::Number,
        vec![varargs(Type::Number, |ctx, args| {
            math_extreme(ctx, args, f64::INFINITY, f64::min)
        })],
    );
    define(
        "max",
        Type::Number,
        vec![varargs(Type::Number, |ctx, args| {
            math_extreme(ctx, args, f64::NEG_INFINITY, f64::max)
        })],
    );

    // Legacy filter helpers
    define(
        "filter-==",
        Type::Boolean,
        vec![fixed(vec![Type::String, Type::Value], |ctx, args| {
            let key = evaluate_string(&args[0], ctx)?;
            let expected = args[1].evaluate(ctx)?;
            boolean(
                property(ctx, &key)
                    .map(|v| v.strict_equals(&expected))
                    .unwrap_or(false),
            )
        })],
    );
    define(
        "filter-id-==",
        Type::Boolean,
        vec![fixed(vec![Type::Value], |ctx, args| {
            boolean(ctx.id().strict_equals(&args[0].evaluate(ctx)?))
        })],
    );
    define(
        "filter-type-==",
        Type::Boolean,
        vec![fixed(vec![Type::String], |ctx, args| {
            let expected = evaluate_string(&args[0], ctx)?;
            boolean(ctx.geometry_type() == Some(expected.as_str()))
        })],
    );
    define(
        "filter-<",
        Type::Boolean,
        vec![fixed(vec![Type::String, Type::Value], |ctx, args| filter_compare(ctx, args, lt))],
    );
    define(
        "filter-id-<",
        Type::Boolean,
        vec![fixed(vec![Type::Value], |ctx, args| filter_id_compare(ctx, args, lt))],
    );
    define(
        "filter->",
        Type::Boolean,
        vec![fixed(vec![Type::String, Type::Value], |ctx, args| filter_compare(ctx, args, gt))],
    );
    define(
        "filter-id->",
        Type::Boolean,
        vec![fixed(vec![Type::Value], |ctx, args| filter_id_compare(ctx, args, gt))],
    );
    define(
        "filter-<=",
        Type::Boolean,
        vec![fixed(vec![Type::String, Type::Value], |ctx, args| filter_compare(ctx, args, le))],
    );
    define(
        "filter-id-<=",
        Type::Boolean,
        vec![fixed(vec![Type::Value], |ctx, args| filter_id_compare(ctx, args, le))],
    );
    define(
        "filter->=",
        Type::Boolean,
        vec![fixed(vec![Type::String, Type::Value], |ctx, args| filter_compare(ctx, args, ge))],
    );
    define(
        "filter-id->=",
        Type::Boolean,
        vec![fixed(vec![Type::Value], |ctx, args| filter_id_compare(ctx, args, ge))],
    );
    define(
        "filter-has",
        Type::Boolean,
        vec![fixed(vec![Type::Value], |ctx, args| {
            let key = args[0].evaluate(ctx)?.to_string();
            boolean(property(ctx, &key).is_some())
        })],
    );
    define(
        "filter-has-id",
        Type::Boolean,
        vec![fixed(vec![], |ctx, _| boolean(!ctx.id().is_null()))],
    );
    define(
        "filter-type-in",
        Type::Boolean,
        vec![fixed(vec![string_array], |ctx, args| {
            let types = evaluate_array(&args[0], ctx)?;
            let actual = ctx.geometry_type();
            boolean(types.iter().any(|t| t.as_str().is_some() && t.as_str() == actual))
        })],
    );
    define(
        "filter-id-in",
        Type::Boolean,
        vec![fixed(vec![value_array.clone()], |ctx, args| {
            let ids = evaluate_array(&args[0], ctx)?;
            let id = ctx.id();
            boolean(ids.iter().any(|candidate| candidate.strict_equals(&id)))
        })],
    );
    define(
        "filter-in-small",
        Type::Boolean,
        vec![fixed(vec![Type::String, value_array.clone()], |ctx, args| {
            let key = evaluate_string(&args[0], ctx)?;
            let values = evaluate_array(&args[1], ctx)?;
            boolean(
                property(ctx, &key)
                    .map(|v| values.iter().any(|candidate| candidate.strict_equals(&v)))
                    .unwrap_or(false),
            )
        })],
    );
    define(
        "filter-in-large",
        Type::Boolean,
        vec![fixed(vec![Type::String, value_array], |ctx, args| {
            let key = evaluate_string(&args[0], ctx)?;
            let values = evaluate_array(&args[1], ctx)?;
            boolean(
                property(ctx, &key)
                    .map(|v| binary_search(&v, &values))
                    .unwrap_or(false),
            )
        })],
    );

    // Logic
    define(
        "all",
        Type::Boolean,
        vec![
            fixed(vec![Type::Boolean, Type::Boolean], |ctx, args| {
                boolean(evaluate_bool(&args[0], ctx)? && evaluate_bool(&args[1], ctx)?)
            }),
            varargs(Type::Boolean, |ctx, args| {
                for arg in args {
                    if !evaluate_bool(arg, ctx)? {
                        return boolean(false);
                    }
                }
                boolean(true)
            }),
        ],
    );
    define(
        "any",
        Type::Boolean,
        vec![
            fixed(vec![Type::Boolean, Type::Boolean], |ctx, args| {
                boolean(evaluate_bool(&args[0], ctx)? || evaluate_bool(&args[1], ctx)?)
            }),
            varargs(Type::Boolean, |ctx, args| {
                for arg in args {
                    if evaluate_bool(arg, ctx)? {
                        return boolean(true);
                    }
                }
                boolean(false)
            }),
        ],
    );
    define(
        "!",
        Type::Boolean,
        vec![fixed(vec![Type::Boolean], |ctx, args| boolean(!evaluate_bool(&args[0], ctx)?))],
    );

    // Strings
    define(
        "is-supported-script",
        Type::Boolean,
        vec![fixed(vec![Type::String], |ctx, args| {
            let text = evaluate_string(&args[0], ctx)?;
            boolean(
                ctx.globals
                    .is_supported_script
                    .map(|supported| supported(&text))
                    .unwrap_or(true),
            )
        })],
    );
    define(
        "upcase",
        Type::String,
        vec![fixed(vec![Type::String], |ctx, args| {
            Ok(Value::String(evaluate_string(&args[0], ctx)?.to_uppercase()))
        })],
    );
    define(
        "downcase",
        Type::String,
        vec![fixed(vec![Type::String], |ctx, args| {
            Ok(Value::String(evaluate_string(&args[0], ctx)?.to_lowercase()))
        })],
    );
    define(
        "concat",
        Type::String,
        vec![varargs(Type::Value, |ctx, args| {
            let mut out = String::new();
            for arg in args {
                out.push_str(&arg.evaluate(ctx)?.to_string());
            }
            Ok(Value::String(out))
        })],
    );
    define(
        "resolved-locale",
        Type::String,
        vec![fixed(vec![Type::Collator], |ctx, args| match args[0].evaluate(ctx)? {
            Value::Collator(c) => Ok(Value::String(c.resolved_locale())),
            other => Err(EvalError::new(format!(
                "Expected value to be of type collator, but found {} instead.",
                type_of(&other)
            ))),
        })],
    );

    defs
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

    fn eval(expr: JsonValue) -> EvalResult {
        parse(expr).unwrap().evaluate(&EvaluationContext::default())
    }

    fn eval_on(expr: JsonValue, feature: &Feature) -> EvalResult {
        parse(expr)
            .unwrap()
            .evaluate(&EvaluationContext::new(GlobalProperties::new(0.0)).with_feature(feature))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval(json!(["+", 1, 2, 3])).unwrap(), Value::Number(6.0));
        assert_eq!(eval(json!(["-", 5])).unwrap(), Value::Number(-5.0));
        assert_eq!(eval(json!(["-", 5, 2])).unwrap(), Value::Number(3.0));
        assert_eq!(eval(json!(["%", -7, 3])).unwrap(), Value::Number(-1.0));
        assert_eq!(eval(json!(["^", 2, 10])).unwrap(), Value::Number(1024.0));
        assert_eq!(eval(json!(["min", 3, 1, 2])).unwrap(), Value::Number(1.0));
        assert_eq!(eval(json!(["max"])).unwrap(), Value::Number(f64::NEG_INFINITY));
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(eval(json!(["round", 2.5])).unwrap(), Value::Number(3.0));
        assert_eq!(eval(json!(["round", -2.5])).unwrap(), Value::Number(-3.0));
        assert_eq!(eval(json!(["round", -2.4])).unwrap(), Value::Number(-2.0));
    }

    #[test]
    fn test_get_and_has() {
        let f = Feature::new(GeometryType::Point).with_property("name", "Main St");
        assert_eq!(eval_on(json!(["get", "name"]), &f).unwrap(), Value::from("Main St"));
        assert_eq!(eval_on(json!(["get", "nope"]), &f).unwrap(), Value::Null);
        assert_eq!(eval_on(json!(["has", "name"]), &f).unwrap(), Value::Bool(true));
        assert_eq!(
            eval(json!(["get", "a", ["literal", {"a": 2}]])).unwrap(),
            Value::Number(2.0)
        );
    }

    #[test]
    fn test_rgba_validation() {
        assert_eq!(
            eval(json!(["rgb", 255, 0, 0])).unwrap(),
            Value::Color(Color::new(1.0, 0.0, 0.0, 1.0))
        );
        let f = Feature::new(GeometryType::Point).with_property("a", 2.0);
        assert_eq!(
            eval_on(json!(["rgba", 0, 0, 0, ["get", "a"]]), &f).unwrap_err().message,
            "Invalid rgba value [0, 0, 0, 2]: 'a' must be between 0 and 1."
        );
    }

    #[test]
    fn test_overload_error_message() {
        let errs = parse(json!(["-", "a", 1, 2])).unwrap_err();
        assert_eq!(
            errs[0],
            ": Expected arguments of type (number, number) | (number), but found (string, number, number) instead."
        );
        let errs = parse(json!(["+", 1, "a"])).unwrap_err();
        assert_eq!(errs[0], "[2]: Expected number but found string instead.");
        let errs = parse(json!(["zoom", 1])).unwrap_err();
        assert_eq!(errs[0], ": Expected arguments of type (), but found (number) instead.");
    }

    #[test]
    fn test_logic_short_circuits() {
        let f = Feature::new(GeometryType::Point);
        assert_eq!(
            eval_on(json!(["all", false, ["boolean", ["get", "missing"]]]), &f).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            eval_on(json!(["any", true, ["boolean", ["get", "missing"]]]), &f).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(eval(json!(["all"])).unwrap(), Value::Bool(true));
        assert_eq!(eval(json!(["any"])).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_filter_builtins() {
        let f = Feature::new(GeometryType::LineString)
            .with_id(7.0)
            .with_property("class", "primary")
            .with_property("lanes", 4.0);
        assert_eq!(eval_on(json!(["filter-==", "class", "primary"]), &f).unwrap(), Value::Bool(true));
        assert_eq!(eval_on(json!(["filter-<", "lanes", 5]), &f).unwrap(), Value::Bool(true));
        assert_eq!(eval_on(json!(["filter-<", "lanes", "5"]), &f).unwrap(), Value::Bool(false));
        assert_eq!(eval_on(json!(["filter-id->=", 7]), &f).unwrap(), Value::Bool(true));
        assert_eq!(eval_on(json!(["filter-type-==", "LineString"]), &f).unwrap(), Value::Bool(true));
        assert_eq!(
            eval_on(json!(["filter-type-in", ["literal", ["Point", "LineString"]]]), &f).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(eval_on(json!(["filter-has-id"]), &f).unwrap(), Value::Bool(true));
        assert_eq!(
            eval_on(json!(["filter-in-large", "class", ["literal", ["a", "motorway", "primary", "z"]]]), &f)
                .unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_on(json!(["filter-in-small", "class", ["literal", ["a", "b"]]]), &f).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_concat_and_case() {
        assert_eq!(eval(json!(["concat", "a", 1, true])).unwrap(), Value::from("a1true"));
        assert_eq!(eval(json!(["upcase", "abc"])).unwrap(), Value::from("ABC"));
        assert_eq!(eval(json!(["typeof", ["literal", [1, 2]]])).unwrap(), Value::from("array<number, 2>"));
    }

    #[test]
    fn test_supported_script_predicate() {
        fn latin_only(s: &str) -> bool {
            s.is_ascii()
        }
        let e = parse(json!(["is-supported-script", ["get", "t"]])).unwrap();
        let f = Feature::new(GeometryType::Point).with_property("t", "日本");
        let ctx = EvaluationContext::new(GlobalProperties::new(0.0)).with_feature(&f);
        assert_eq!(e.evaluate(&ctx).unwrap(), Value::Bool(true));
        let ctx = EvaluationContext::new(GlobalProperties::new(0.0).with_supported_script(latin_only))
            .with_feature(&f);
        assert_eq!(e.evaluate(&ctx).unwrap(), Value::Bool(false));
    }
}
