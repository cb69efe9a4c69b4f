//! Expression node kinds.
//!
//! [`Expression`] is a closed sum type; operator names are resolved to a
//! parse function by [`parser_for`], a compile-time match rather than a
//! mutable registry.

mod assertion;
mod case;
mod coalesce;
mod coercion;
mod collator;
mod collection;
mod comparison;
pub mod compound;
mod format;
mod interpolate;
mod let_var;
mod literal;
mod match_expr;
mod step;
mod within;

use serde_json::Value as JsonValue;

use super::evaluation::{EvalError, EvalResult, EvaluationContext};
use super::parsing::ParsingContext;
use super::types::Type;
use super::value::{type_of, Value};

pub use assertion::Assertion;
pub use case::Case;
pub use coalesce::Coalesce;
pub use coercion::Coercion;
pub use collator::CollatorExpression;
pub use collection::{At, In, IndexOf, Length, Slice};
pub use comparison::{Comparison, ComparisonOp};
pub use compound::CompoundExpression;
pub use format::{FormatExpression, FormatSectionExpression, ImageExpression, NumberFormat};
pub use interpolate::{Interpolate, InterpolateOperator};
pub use let_var::{Let, Var};
pub use literal::Literal;
pub use match_expr::{Match, MatchLabel};
pub use step::Step;
pub use within::Within;

/// Parser entry point: receives the full array form including the operator.
pub type ParseFn = fn(&[JsonValue], &ParsingContext) -> Option<Expression>;

/// A parsed, type-checked expression node.
#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Literal),
    Var(Var),
    Let(Let),
    Assertion(Assertion),
    Coercion(Coercion),
    Case(Case),
    Match(Match),
    Coalesce(Coalesce),
    Step(Step),
    Interpolate(Interpolate),
    Comparison(Comparison),
    Within(Within),
    Compound(CompoundExpression),
    At(At),
    In(In),
    IndexOf(IndexOf),
    Slice(Slice),
    Length(Length),
    Format(FormatExpression),
    Image(ImageExpression),
    NumberFormat(NumberFormat),
    Collator(CollatorExpression),
}

impl Expression {
    /// Static type; every value `evaluate` produces is a subtype of it.
    pub fn ty(&self) -> Type {
        match self {
            Expression::Literal(e) => e.ty.clone(),
            Expression::Var(e) => e.bound().ty(),
            Expression::Let(e) => e.result.ty(),
            Expression::Assertion(e) => e.ty.clone(),
            Expression::Coercion(e) => e.ty.clone(),
            Expression::Case(e) => e.ty.clone(),
            Expression::Match(e) => e.ty.clone(),
            Expression::Coalesce(e) => e.ty.clone(),
            Expression::Step(e) => e.ty.clone(),
            Expression::Interpolate(e) => e.ty.clone(),
            Expression::Comparison(_) | Expression::Within(_) | Expression::In(_) => Type::Boolean,
            Expression::Compound(e) => e.ty().clone(),
            Expression::At(e) => e.ty.clone(),
            Expression::IndexOf(_) | Expression::Length(_) => Type::Number,
            Expression::Slice(e) => e.ty.clone(),
            Expression::Format(_) => Type::Formatted,
            Expression::Image(_) => Type::ResolvedImage,
            Expression::NumberFormat(_) => Type::String,
            Expression::Collator(_) => Type::Collator,
        }
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        match self {
            Expression::Literal(e) => Ok(e.value.clone()),
            Expression::Var(e) => e.evaluate(ctx),
            Expression::Let(e) => e.evaluate(ctx),
            Expression::Assertion(e) => e.evaluate(ctx),
            Expression::Coercion(e) => e.evaluate(ctx),
            Expression::Case(e) => e.evaluate(ctx),
            Expression::Match(e) => e.evaluate(ctx),
            Expression::Coalesce(e) => e.evaluate(ctx),
            Expression::Step(e) => e.evaluate(ctx),
            Expression::Interpolate(e) => e.evaluate(ctx),
            Expression::Comparison(e) => e.evaluate(ctx),
            Expression::Within(e) => e.evaluate(ctx),
            Expression::Compound(e) => e.evaluate(ctx),
            Expression::At(e) => e.evaluate(ctx),
            Expression::In(e) => e.evaluate(ctx),
            Expression::IndexOf(e) => e.evaluate(ctx),
            Expression::Slice(e) => e.evaluate(ctx),
            Expression::Length(e) => e.evaluate(ctx),
            Expression::Format(e) => e.evaluate(ctx),
            Expression::Image(e) => e.evaluate(ctx),
            Expression::NumberFormat(e) => e.evaluate(ctx),
            Expression::Collator(e) => e.evaluate(ctx),
        }
    }

    /// Canonical array form; parsing it yields an equivalent expression.
    pub fn serialize(&self) -> JsonValue {
        match self {
            Expression::Literal(e) => e.serialize(),
            Expression::Var(e) => e.serialize(),
            Expression::Let(e) => e.serialize(),
            Expression::Assertion(e) => e.serialize(),
            Expression::Coercion(e) => e.serialize(),
            Expression::Case(e) => e.serialize(),
            Expression::Match(e) => e.serialize(),
            Expression::Coalesce(e) => e.serialize(),
            Expression::Step(e) => e.serialize(),
            Expression::Interpolate(e) => e.serialize(),
            Expression::Comparison(e) => e.serialize(),
            Expression::Within(e) => e.serialize(),
            Expression::Compound(e) => e.serialize(),
            Expression::At(e) => e.serialize(),
            Expression::In(e) => e.serialize(),
            Expression::IndexOf(e) => e.serialize(),
            Expression::Slice(e) => e.serialize(),
            Expression::Length(e) => e.serialize(),
            Expression::Format(e) => e.serialize(),
            Expression::Image(e) => e.serialize(),
            Expression::NumberFormat(e) => e.serialize(),
            Expression::Collator(e) => e.serialize(),
        }
    }

    /// Visit direct children in argument order. `var` has none; its
    /// bound expression belongs to the enclosing `let`.
    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        match self {
            Expression::Literal(_) | Expression::Var(_) | Expression::Within(_) => {}
            Expression::Let(e) => e.each_child(f),
            Expression::Assertion(e) => e.args.iter().for_each(f),
            Expression::Coercion(e) => e.args.iter().for_each(f),
            Expression::Case(e) => e.each_child(f),
            Expression::Match(e) => e.each_child(f),
            Expression::Coalesce(e) => e.args.iter().for_each(f),
            Expression::Step(e) => e.each_child(f),
            Expression::Interpolate(e) => e.each_child(f),
            Expression::Comparison(e) => e.each_child(f),
            Expression::Compound(e) => e.args().iter().for_each(f),
            Expression::At(e) => e.each_child(f),
            Expression::In(e) => e.each_child(f),
            Expression::IndexOf(e) => e.each_child(f),
            Expression::Slice(e) => e.each_child(f),
            Expression::Length(e) => f(e.input.as_ref()),
            Expression::Format(e) => e.each_child(f),
            Expression::Image(e) => f(e.input.as_ref()),
            Expression::NumberFormat(e) => e.each_child(f),
            Expression::Collator(e) => e.each_child(f),
        }
    }

    /// Compound builtin name, if this is one.
    pub fn compound_name(&self) -> Option<&'static str> {
        match self {
            Expression::Compound(c) => Some(c.name()),
            _ => None,
        }
    }
}

/// Resolve an operator name to its parser.
pub fn parser_for(op: &str) -> Option<ParseFn> {
    let f: ParseFn = match op {
        "literal" => Literal::parse,
        "let" => Let::parse,
        "var" => Var::parse,
        "string" | "number" | "boolean" | "object" | "array" => Assertion::parse,
        "to-boolean" | "to-color" | "to-number" | "to-string" => Coercion::parse,
        "case" => Case::parse,
        "match" => Match::parse,
        "coalesce" => Coalesce::parse,
        "step" => Step::parse,
        "interpolate" | "interpolate-hcl" | "interpolate-lab" => Interpolate::parse,
        "==" | "!=" | "<" | ">" | "<=" | ">=" => Comparison::parse,
        "within" => Within::parse,
        "at" => At::parse,
        "in" => In::parse,
        "index-of" => IndexOf::parse,
        "slice" => Slice::parse,
        "length" => Length::parse,
        "format" => FormatExpression::parse,
        "image" => ImageExpression::parse,
        "number-format" => NumberFormat::parse,
        "collator" => CollatorExpression::parse,
        other if compound::definition(other).is_some() => CompoundExpression::parse,
        _ => return None,
    };
    Some(f)
}

/// True when `op` names any expression operator.
pub fn is_operator(op: &str) -> bool {
    parser_for(op).is_some()
}

/// Evaluate to a number or fail with a typed message.
pub(crate) fn evaluate_number(expr: &Expression, ctx: &EvaluationContext) -> Result<f64, EvalError> {
    let value = expr.evaluate(ctx)?;
    value.as_f64().ok_or_else(|| {
        EvalError::new(format!(
            "Expected value to be of type number, but found {} instead.",
            type_of(&value)
        ))
    })
}

/// Evaluate to a string or fail with a typed message.
pub(crate) fn evaluate_string(expr: &Expression, ctx: &EvaluationContext) -> Result<String, EvalError> {
    match expr.evaluate(ctx)? {
        Value::String(s) => Ok(s),
        other => Err(EvalError::new(format!(
            "Expected value to be of type string, but found {} instead.",
            type_of(&other)
        ))),
    }
}
