//! Legacy function converter.
//!
//! Older styles describe data- and zoom-driven values as stop tables
//! (`{"stops": [...], "property": ..., "type": ...}`). These are rewritten
//! into the equivalent expression before compilation, so the rest of the
//! engine only ever sees expressions.

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::style::expression::ParsingError;
use crate::style::reference::PropertySpec;

/// A legacy function object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionSpec {
    #[serde(default)]
    pub stops: Option<Vec<(JsonValue, JsonValue)>>,
    #[serde(default)]
    pub base: Option<f64>,
    #[serde(default)]
    pub property: Option<String>,
    /// `identity`, `exponential`, `interval` or `categorical`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// `rgb`, `lab` or `hcl`.
    #[serde(rename = "colorSpace", default)]
    pub color_space: Option<String>,
    #[serde(default)]
    pub default: Option<JsonValue>,
}

type Stops = Vec<(JsonValue, JsonValue)>;

/// Legacy functions are the only object-shaped property values.
pub fn is_function(value: &JsonValue) -> bool {
    value.is_object()
}

/// Rewrite a legacy function into an expression for `spec`.
pub fn convert_function(parameters: &JsonValue, spec: &PropertySpec) -> Result<JsonValue, ParsingError> {
    let parameters: FunctionSpec = serde_json::from_value(parameters.clone())
        .map_err(|e| ParsingError::new("", format!("Invalid function: {}", e)))?;

    let stops = match &parameters.stops {
        Some(stops) if parameters.kind.as_deref() != Some("identity") => stops,
        _ => return convert_identity_function(&parameters, spec),
    };
    if stops.is_empty() {
        return Err(ParsingError::new("", "Function stops must be non-empty."));
    }

    let zoom_and_feature_dependent = stops[0].0.is_object();
    let feature_dependent = zoom_and_feature_dependent || parameters.property.is_some();
    let zoom_dependent = zoom_and_feature_dependent || !feature_dependent;

    let stops: Stops = stops
        .iter()
        .map(|(input, output)| {
            let output = match output {
                JsonValue::String(s) if !feature_dependent && spec.tokens => convert_token_string(s),
                other => convert_literal(other),
            };
            (input.clone(), output)
        })
        .collect();

    if zoom_and_feature_dependent {
        convert_zoom_and_property_function(&parameters, spec, &stops)
    } else if zoom_dependent {
        convert_zoom_function(&parameters, spec, &stops, json!(["zoom"]))
    } else {
        convert_property_function(&parameters, spec, &stops)
    }
}

fn property_get(parameters: &FunctionSpec) -> Result<JsonValue, ParsingError> {
    match &parameters.property {
        Some(property) => Ok(json!(["get", property])),
        None => Err(ParsingError::new("", "Property functions require a \"property\" key.")),
    }
}

fn convert_identity_function(parameters: &FunctionSpec, spec: &PropertySpec) -> Result<JsonValue, ParsingError> {
    let get = property_get(parameters)?;
    let Some(default) = &parameters.default else {
        // String properties would otherwise coerce; legacy semantics assert.
        return Ok(if spec.kind == "string" {
            json!(["string", get])
        } else {
            get
        });
    };

    let expression = match spec.kind.as_str() {
        "enum" => json!(["match", get, spec.enum_values().unwrap_or_default(), get, default]),
        "color" => json!(["to-color", get, convert_literal(default)]),
        "array" => json!([
            "array",
            spec.value.as_deref().unwrap_or("number"),
            spec.length,
            get,
            convert_literal(default)
        ]),
        "number" | "string" | "boolean" | "object" => {
            json!([spec.kind, get, convert_literal(default)])
        }
        _ => json!(["coalesce", get, convert_literal(default)]),
    };
    Ok(expression)
}

fn interpolate_operator(parameters: &FunctionSpec) -> &'static str {
    match parameters.color_space.as_deref() {
        Some("hcl") => "interpolate-hcl",
        Some("lab") => "interpolate-lab",
        _ => "interpolate",
    }
}

fn function_type(parameters: &FunctionSpec, spec: &PropertySpec) -> String {
    match &parameters.kind {
        Some(kind) => kind.clone(),
        None if spec.supports_interpolation() => "exponential".to_string(),
        None => "interval".to_string(),
    }
}

fn convert_zoom_and_property_function(
    parameters: &FunctionSpec,
    spec: &PropertySpec,
    stops: &Stops,
) -> Result<JsonValue, ParsingError> {
    // Property stop tables grouped by zoom, in first-seen order.
    let mut groups: Vec<(JsonValue, Stops)> = Vec::new();
    for (input, output) in stops {
        let zoom = input.get("zoom").cloned().unwrap_or(JsonValue::Null);
        let value = input.get("value").cloned().unwrap_or(JsonValue::Null);
        match groups.iter_mut().find(|(z, _)| *z == zoom) {
            Some((_, group)) => group.push((value, output.clone())),
            None => groups.push((zoom, vec![(value, output.clone())])),
        }
    }

    // The zoom dimension follows the property: linear when it
    // interpolates, step otherwise.
    let inner = FunctionSpec {
        stops: None,
        base: None,
        property: parameters.property.clone(),
        kind: parameters.kind.clone(),
        color_space: None,
        default: parameters.default.clone(),
    };
    let is_step = function_type(&FunctionSpec::default(), spec) != "exponential";
    let mut curve = if is_step {
        vec![json!("step"), json!(["zoom"])]
    } else {
        vec![json!(interpolate_operator(parameters)), json!(["linear"]), json!(["zoom"])]
    };
    for (zoom, group) in &groups {
        let output = convert_property_function(&inner, spec, group)?;
        append_stop_pair(&mut curve, zoom.clone(), output, is_step);
    }
    fixup_degenerate_step_curve(&mut curve);
    Ok(JsonValue::Array(curve))
}

/// Fallback output of `match` and `case` conversions.
fn fallback(parameters: &FunctionSpec, spec: &PropertySpec) -> JsonValue {
    match parameters.default.as_ref().or(spec.default.as_ref()) {
        Some(default) => convert_literal(default),
        None if spec.kind == "resolvedImage" => json!(""),
        None => JsonValue::Null,
    }
}

fn with_number_default(parameters: &FunctionSpec, get: JsonValue, curve: JsonValue) -> JsonValue {
    match &parameters.default {
        None => curve,
        Some(default) => json!([
            "case",
            ["==", ["typeof", get], "number"],
            curve,
            convert_literal(default)
        ]),
    }
}

fn convert_property_function(
    parameters: &FunctionSpec,
    spec: &PropertySpec,
    stops: &Stops,
) -> Result<JsonValue, ParsingError> {
    let kind = function_type(parameters, spec);
    let get = property_get(parameters)?;

    match kind.as_str() {
        "categorical" if stops.first().map(|s| s.0.is_boolean()).unwrap_or(false) => {
            let mut expression = vec![json!("case")];
            for (input, output) in stops {
                expression.push(json!(["==", get, input]));
                expression.push(output.clone());
            }
            expression.push(fallback(parameters, spec));
            Ok(JsonValue::Array(expression))
        }
        "categorical" => {
            let mut expression = vec![json!("match"), get];
            for (input, output) in stops {
                append_stop_pair(&mut expression, input.clone(), output.clone(), false);
            }
            expression.push(fallback(parameters, spec));
            Ok(JsonValue::Array(expression))
        }
        "interval" => {
            let mut expression = vec![json!("step"), json!(["number", get])];
            for (input, output) in stops {
                append_stop_pair(&mut expression, input.clone(), output.clone(), true);
            }
            fixup_degenerate_step_curve(&mut expression);
            Ok(with_number_default(parameters, get, JsonValue::Array(expression)))
        }
        "exponential" => {
            let mut expression = vec![
                json!(interpolate_operator(parameters)),
                interpolation_curve(parameters),
                json!(["number", get]),
            ];
            for (input, output) in stops {
                append_stop_pair(&mut expression, input.clone(), output.clone(), false);
            }
            Ok(with_number_default(parameters, get, JsonValue::Array(expression)))
        }
        other => Err(ParsingError::new("", format!("Unknown property function type {}", other))),
    }
}

fn interpolation_curve(parameters: &FunctionSpec) -> JsonValue {
    match parameters.base {
        None => json!(["linear"]),
        Some(base) if base == 1.0 => json!(["linear"]),
        Some(base) => json!(["exponential", base]),
    }
}

fn convert_zoom_function(
    parameters: &FunctionSpec,
    spec: &PropertySpec,
    stops: &Stops,
    input: JsonValue,
) -> Result<JsonValue, ParsingError> {
    let kind = function_type(parameters, spec);
    let (mut expression, is_step) = match kind.as_str() {
        "interval" => (vec![json!("step"), input], true),
        "exponential" => (
            vec![
                json!(interpolate_operator(parameters)),
                interpolation_curve(parameters),
                input,
            ],
            false,
        ),
        other => {
            return Err(ParsingError::new(
                "",
                format!("Unknown zoom function type \"{}\"", other),
            ))
        }
    };
    for (stop_input, output) in stops {
        append_stop_pair(&mut expression, stop_input.clone(), output.clone(), is_step);
    }
    fixup_degenerate_step_curve(&mut expression);
    Ok(JsonValue::Array(expression))
}

/// A step curve with only its base output gets a second stop repeating
/// that output.
fn fixup_degenerate_step_curve(expression: &mut Vec<JsonValue>) {
    if expression.len() == 3 && expression[0] == "step" {
        let output = expression[2].clone();
        expression.push(json!(0));
        expression.push(output);
    }
}

fn append_stop_pair(curve: &mut Vec<JsonValue>, input: JsonValue, output: JsonValue, is_step: bool) {
    // Duplicate stop inputs were never rejected for functions; keep the first.
    if curve.len() > 3 && curve[curve.len() - 2] == input {
        return;
    }
    // Step curves drop the first input.
    if !(is_step && curve.len() == 2) {
        curve.push(input);
    }
    curve.push(output);
}

fn convert_literal(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(_) | JsonValue::Object(_) => json!(["literal", value]),
        other => other.clone(),
    }
}

/// `"{name} St"` becomes `["concat", ["get", "name"], " St"]`. Strings
/// without tokens are returned unchanged.
pub fn convert_token_string(s: &str) -> JsonValue {
    let mut result = vec![json!("concat")];
    let mut pos = 0;
    let mut search = 0;

    while let Some(offset) = s[search..].find('{') {
        let open = search + offset;
        let rest = &s[open + 1..];
        match rest.find(|c: char| c == '{' || c == '}') {
            Some(len) if len > 0 && rest[len..].starts_with('}') => {
                if open > pos {
                    result.push(json!(&s[pos..open]));
                }
                result.push(json!(["get", &rest[..len]]));
                pos = open + len + 2;
                search = pos;
            }
            _ => search = open + 1,
        }
    }

    if result.len() == 1 {
        return json!(s);
    }
    if pos < s.len() {
        result.push(json!(&s[pos..]));
    } else if result.len() == 2 {
        return json!(["to-string", result[1]]);
    }
    JsonValue::Array(result)
}
