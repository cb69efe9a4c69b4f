//! Layer filter compiler.
//!
//! Legacy filters (`["==", "class", "road"]`) are rewritten to the
//! `filter-*` builtins. Expression filters that read camera state
//! (`pitch`, `distance-from-center`) are split into a static
//! over-approximation, which can be cached per layer, and the full
//! dynamic filter evaluated per feature.

use std::cmp::Ordering;

use serde_json::{json, Value as JsonValue};

use crate::error::StyleResult;
use crate::style::expression::is_constant::is_feature_constant;
use crate::style::expression::parsing::json_type_name;
use crate::style::expression::{create_expression, EvaluationContext, StyleExpression, Value};
use crate::style::reference::filter_spec;

/// Past this many values of one type, `in` compiles to a sorted binary search.
pub const FILTER_IN_LARGE_THRESHOLD: usize = 200;

/// Comparisons and predicates collapsed to `true` when an operand is dynamic.
const DYNAMIC_CONDITIONS: &[&str] = &["in", "==", "!=", ">", ">=", "<", "<=", "to-boolean"];

/// True when `filter` is already written in expression syntax.
pub fn is_expression_filter(filter: &JsonValue) -> bool {
    let items = match filter {
        JsonValue::Bool(_) => return true,
        JsonValue::Array(items) if !items.is_empty() => items,
        _ => return false,
    };

    match items[0].as_str() {
        Some("has") => {
            items.len() >= 2 && items[1] != "$id" && items[1] != "$type"
        }
        Some("in") => items.len() >= 3 && (!items[1].is_string() || items[2].is_array()),
        Some("!in") | Some("!has") | Some("none") => false,
        Some("==") | Some("!=") | Some(">") | Some(">=") | Some("<") | Some("<=") => {
            items.len() != 3 || items[1].is_array() || items[2].is_array()
        }
        Some("any") | Some("all") => items[1..]
            .iter()
            .all(|f| f.is_boolean() || is_expression_filter(f)),
        _ => true,
    }
}

/// Rewrite a legacy filter into expression syntax.
pub fn convert_filter(filter: &JsonValue) -> JsonValue {
    let items = match filter {
        JsonValue::Null => return json!(true),
        JsonValue::Array(items) => items,
        _ => return json!(true),
    };
    let op = items.first().and_then(JsonValue::as_str).unwrap_or_default();
    if items.len() <= 1 {
        return json!(op != "any");
    }

    match op {
        "==" => convert_comparison_op(&items[1], arg(items, 2), "=="),
        "!=" => convert_negation(convert_comparison_op(&items[1], arg(items, 2), "==")),
        "<" | ">" | "<=" | ">=" => convert_comparison_op(&items[1], arg(items, 2), op),
        "any" => convert_combining("any", &items[1..], false),
        "all" => convert_combining("all", &items[1..], false),
        "none" => convert_combining("all", &items[1..], true),
        "in" => convert_in_op(&items[1], &items[2..]),
        "!in" => convert_negation(convert_in_op(&items[1], &items[2..])),
        "has" => convert_has_op(&items[1]),
        "!has" => convert_negation(convert_has_op(&items[1])),
        "within" => filter.clone(),
        _ => json!(true),
    }
}

fn arg(items: &[JsonValue], index: usize) -> &JsonValue {
    items.get(index).unwrap_or(&JsonValue::Null)
}

fn convert_combining(op: &str, filters: &[JsonValue], negate: bool) -> JsonValue {
    let mut out = vec![json!(op)];
    out.extend(filters.iter().map(|f| {
        let converted = convert_filter(f);
        if negate {
            convert_negation(converted)
        } else {
            converted
        }
    }));
    JsonValue::Array(out)
}

fn convert_comparison_op(property: &JsonValue, value: &JsonValue, op: &str) -> JsonValue {
    match property.as_str() {
        Some("$type") => json!([format!("filter-type-{}", op), value]),
        Some("$id") => json!([format!("filter-id-{}", op), value]),
        _ => json!([format!("filter-{}", op), property, value]),
    }
}

fn convert_in_op(property: &JsonValue, values: &[JsonValue]) -> JsonValue {
    if values.is_empty() {
        return json!(false);
    }
    match property.as_str() {
        Some("$type") => json!(["filter-type-in", ["literal", values]]),
        Some("$id") => json!(["filter-id-in", ["literal", values]]),
        _ => {
            let first_type = json_type_name(&values[0]);
            let same_type = values.iter().all(|v| json_type_name(v) == first_type);
            if values.len() > FILTER_IN_LARGE_THRESHOLD && same_type {
                let mut sorted = values.to_vec();
                sorted.sort_by(compare_json);
                json!(["filter-in-large", property, ["literal", sorted]])
            } else {
                json!(["filter-in-small", property, ["literal", values]])
            }
        }
    }
}

fn compare_json(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn convert_has_op(property: &JsonValue) -> JsonValue {
    match property.as_str() {
        Some("$type") => json!(true),
        Some("$id") => json!(["filter-has-id"]),
        _ => json!(["filter-has", property]),
    }
}

fn convert_negation(filter: JsonValue) -> JsonValue {
    json!(["!", filter])
}

/// A branching expression too short to hold its branches.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed \"{op}\" expression with {len} elements")]
pub struct StaticFilterError {
    pub op: String,
    pub len: usize,
}

/// Static over-approximation of `filter`: dynamic branch points become
/// `any` over their branches and dynamic conditions become `true`.
pub fn extract_static_filter(filter: &JsonValue) -> Result<JsonValue, StaticFilterError> {
    if !is_dynamic_filter(filter) {
        return Ok(filter.clone());
    }
    let mut result = filter.clone();
    union_dynamic_branches(&mut result)?;
    Ok(collapse_dynamic_boolean_expressions(result))
}

/// True when `filter` reads `pitch` or `distance-from-center` anywhere.
pub fn is_dynamic_filter(filter: &JsonValue) -> bool {
    let Some(items) = filter.as_array() else {
        return false;
    };
    if matches!(
        items.first().and_then(JsonValue::as_str),
        Some("pitch") | Some("distance-from-center")
    ) {
        return true;
    }
    items.iter().skip(1).any(is_dynamic_filter)
}

fn union_dynamic_branches(filter: &mut JsonValue) -> Result<(), StaticFilterError> {
    let Some(items) = filter.as_array_mut() else {
        return Ok(());
    };
    let op = items.first().and_then(JsonValue::as_str).unwrap_or_default().to_string();
    let len = items.len();

    let (dynamic, well_formed) = match op.as_str() {
        "case" => (
            items
                .get(1..len.saturating_sub(1))
                .unwrap_or_default()
                .iter()
                .step_by(2)
                .any(is_dynamic_filter),
            len >= 4 && len % 2 == 0,
        ),
        "match" => (
            items.get(1).map(is_dynamic_filter).unwrap_or(false),
            len >= 5 && len % 2 == 1,
        ),
        "step" => (
            items.get(1).map(is_dynamic_filter).unwrap_or(false),
            len >= 3 && len % 2 == 1,
        ),
        _ => (false, true),
    };

    if dynamic {
        if !well_formed {
            return Err(StaticFilterError { op, len });
        }
        let branches: Vec<JsonValue> = match op.as_str() {
            "case" => items[2..len - 1]
                .iter()
                .step_by(2)
                .chain(std::iter::once(&items[len - 1]))
                .cloned()
                .collect(),
            "match" => items[3..len - 1]
                .iter()
                .step_by(2)
                .chain(std::iter::once(&items[len - 1]))
                .cloned()
                .collect(),
            _ => items[2..].iter().step_by(2).cloned().collect(),
        };
        *items = std::iter::once(json!("any")).chain(branches).collect();
    }

    for child in items.iter_mut().skip(1) {
        union_dynamic_branches(child)?;
    }
    Ok(())
}

fn collapse_dynamic_boolean_expressions(expression: JsonValue) -> JsonValue {
    let items = match expression {
        JsonValue::Array(items) => items,
        other => return other,
    };
    let is_condition = items
        .first()
        .and_then(JsonValue::as_str)
        .map(|op| DYNAMIC_CONDITIONS.contains(&op))
        .unwrap_or(false);
    if is_condition && items.iter().skip(1).any(is_dynamic_filter) {
        return json!(true);
    }
    JsonValue::Array(
        items
            .into_iter()
            .map(collapse_dynamic_boolean_expressions)
            .collect(),
    )
}

/// True when evaluating `filter` needs the feature's geometry.
pub fn geometry_needed(filter: &JsonValue) -> bool {
    let Some(items) = filter.as_array() else {
        return false;
    };
    if items.first().and_then(JsonValue::as_str) == Some("within") {
        return true;
    }
    items.iter().skip(1).any(geometry_needed)
}

/// A compiled layer filter.
#[derive(Debug)]
pub struct FeatureFilter {
    static_filter: StyleExpression,
    dynamic_filter: Option<StyleExpression>,
    needs_geometry: bool,
    needs_feature: bool,
}

impl FeatureFilter {
    /// Static part only; safe to cache per layer.
    pub fn evaluate_static(&self, ctx: &EvaluationContext) -> bool {
        matches!(self.static_filter.evaluate(ctx), Value::Bool(true))
    }

    /// The exact filter, falling back to the static one when no dynamic
    /// part was split off.
    pub fn evaluate_dynamic(&self, ctx: &EvaluationContext) -> bool {
        match &self.dynamic_filter {
            Some(dynamic) => matches!(dynamic.evaluate(ctx), Value::Bool(true)),
            None => self.evaluate_static(ctx),
        }
    }

    /// Static check first, then the dynamic part if any.
    pub fn matches(&self, ctx: &EvaluationContext) -> bool {
        self.evaluate_static(ctx)
            && self
                .dynamic_filter
                .as_ref()
                .map(|dynamic| matches!(dynamic.evaluate(ctx), Value::Bool(true)))
                .unwrap_or(true)
    }

    pub fn has_dynamic_filter(&self) -> bool {
        self.dynamic_filter.is_some()
    }

    pub fn needs_geometry(&self) -> bool {
        self.needs_geometry
    }

    /// Only meaningful with a dynamic part: whether it reads the feature.
    pub fn needs_feature(&self) -> bool {
        self.needs_feature
    }

    pub fn static_expression(&self) -> &StyleExpression {
        &self.static_filter
    }
}

/// Compile a layer filter. A missing filter accepts everything.
pub fn create_filter(filter: Option<&JsonValue>) -> StyleResult<FeatureFilter> {
    let spec = filter_spec()?;
    let filter = match filter {
        None | Some(JsonValue::Null) => json!(true),
        Some(f) if is_expression_filter(f) => f.clone(),
        Some(f) => convert_filter(f),
    };

    let static_filter = match extract_static_filter(&filter) {
        Ok(extracted) => extracted,
        Err(e) => {
            log::warn!(
                "Failed to extract static filter ({}). Filter will continue working, but at higher memory usage and slower framerate.\nFilter Expression:\n{}",
                e,
                serde_json::to_string_pretty(&filter).unwrap_or_default()
            );
            json!(true)
        }
    };

    let compiled_static = create_expression(&static_filter, Some(spec))?;
    let (dynamic_filter, needs_feature) = if static_filter != filter {
        let compiled = create_expression(&filter, Some(spec))?;
        let needs_feature = !is_feature_constant(compiled.expression());
        (Some(compiled), needs_feature)
    } else {
        (None, false)
    };

    Ok(FeatureFilter {
        static_filter: compiled_static,
        dynamic_filter,
        needs_geometry: geometry_needed(&static_filter),
        needs_feature,
    })
}
