//! Style expression engine.
//!
//! JSON expressions are parsed by [`parsing::ParsingContext`] into typed
//! [`Expression`] trees. [`StyleExpression`] binds a tree to a property's
//! default and enum domain and absorbs runtime errors;
//! [`StylePropertyExpression`] additionally classifies the tree by its
//! zoom and feature dependence and extracts its zoom curve.

pub mod color;
pub mod color_spaces;
pub mod definitions;
pub mod evaluation;
pub mod formatted;
pub mod interpolation;
pub mod is_constant;
pub mod parsing;
pub mod types;
pub mod value;

use std::cell::RefCell;
use std::collections::HashSet;

use serde_json::{json, Value as JsonValue};

use crate::style::function::{convert_function, convert_token_string, is_function};
use crate::style::reference::PropertySpec;

pub use color::Color;
pub use definitions::{Expression, Literal};
pub use evaluation::{
    CanonicalTileId, EvalError, EvalResult, EvaluationContext, Feature, FeatureDistanceData,
    FeatureState, GeometryType, GlobalProperties, TilePoint,
};
pub use formatted::{Collator, Formatted, FormattedSection, ResolvedImage};
pub use interpolation::InterpolationType;
pub use parsing::{ParsingContext, ParsingError, TypeAnnotation};
pub use types::Type;
pub use value::{Value, ValueMap};

/// A parsed expression bound to the property it was compiled for.
#[derive(Debug)]
pub struct StyleExpression {
    expression: Expression,
    default_value: Value,
    enum_values: Option<Vec<String>>,
    warning_history: RefCell<HashSet<String>>,
}

impl StyleExpression {
    fn new(expression: Expression, spec: Option<&PropertySpec>) -> Self {
        Self {
            expression,
            default_value: spec.map(PropertySpec::default_value).unwrap_or(Value::Null),
            enum_values: spec.and_then(PropertySpec::enum_values),
            warning_history: RefCell::new(HashSet::new()),
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    /// Raw evaluation; errors propagate to the caller.
    pub fn evaluate_without_error_handling(&self, ctx: &EvaluationContext) -> EvalResult {
        self.expression.evaluate(ctx)
    }

    /// Evaluate, replacing null, NaN and runtime errors with the default.
    /// Each distinct error message is logged once.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> Value {
        match self.checked_evaluate(ctx) {
            Ok(Value::Null) => self.default_value.clone(),
            Ok(Value::Number(n)) if n.is_nan() => self.default_value.clone(),
            Ok(value) => value,
            Err(e) => {
                if self.warning_history.borrow_mut().insert(e.message.clone()) {
                    log::warn!("{}", e.message);
                }
                self.default_value.clone()
            }
        }
    }

    fn checked_evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let value = self.expression.evaluate(ctx)?;
        if let (Some(allowed), false) = (&self.enum_values, value.is_null()) {
            let key = value.to_string();
            if !allowed.iter().any(|v| *v == key) {
                let expected = allowed
                    .iter()
                    .map(|v| JsonValue::from(v.as_str()).to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(EvalError::new(format!(
                    "Expected value to be one of {}, but found {} instead.",
                    expected,
                    value.to_json()
                )));
            }
        }
        Ok(value)
    }
}

/// Parse `expression` against an optional property specification.
///
/// The expected type comes from the specification; string properties get
/// coercion rather than assertion for untyped results.
pub fn create_expression(
    expression: &JsonValue,
    spec: Option<&PropertySpec>,
) -> Result<StyleExpression, Vec<ParsingError>> {
    let ctx = ParsingContext::new(spec.and_then(PropertySpec::expected_type));
    let annotation = match spec {
        Some(spec) if spec.kind == "string" => Some(TypeAnnotation::Coerce),
        _ => None,
    };
    match ctx.parse_here(expression, annotation) {
        Some(parsed) if !ctx.has_errors() => Ok(StyleExpression::new(parsed, spec)),
        _ => Err(ctx.errors()),
    }
}

/// Zoom and feature dependence of a compiled property expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyExpressionKind {
    /// Depends on neither zoom nor the feature.
    Constant,
    /// Feature-dependent only.
    Source,
    /// Zoom-dependent only.
    Camera,
    /// Zoom- and feature-dependent.
    Composite,
}

/// A property value compiled for repeated evaluation.
#[derive(Debug)]
pub struct StylePropertyExpression {
    kind: PropertyExpressionKind,
    expression: StyleExpression,
    zoom_stops: Vec<f64>,
    interpolation_type: Option<InterpolationType>,
    is_state_dependent: bool,
}

impl StylePropertyExpression {
    pub fn kind(&self) -> PropertyExpressionKind {
        self.kind
    }

    pub fn expression(&self) -> &StyleExpression {
        &self.expression
    }

    /// Labels of the zoom curve; empty for zoom-constant expressions.
    pub fn zoom_stops(&self) -> &[f64] {
        &self.zoom_stops
    }

    pub fn interpolation_type(&self) -> Option<&InterpolationType> {
        self.interpolation_type.as_ref()
    }

    pub fn is_state_dependent(&self) -> bool {
        self.is_state_dependent
    }

    pub fn is_zoom_constant(&self) -> bool {
        matches!(
            self.kind,
            PropertyExpressionKind::Constant | PropertyExpressionKind::Source
        )
    }

    pub fn is_feature_constant(&self) -> bool {
        matches!(
            self.kind,
            PropertyExpressionKind::Constant | PropertyExpressionKind::Camera
        )
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> Value {
        self.expression.evaluate(ctx)
    }

    pub fn evaluate_without_error_handling(&self, ctx: &EvaluationContext) -> EvalResult {
        self.expression.evaluate_without_error_handling(ctx)
    }

    /// Progress of `input` between two zoom stops; 0 for step curves.
    pub fn interpolation_factor(&self, input: f64, lower: f64, upper: f64) -> f64 {
        match &self.interpolation_type {
            Some(interpolation) => interpolation.factor(input, lower, upper),
            None => 0.0,
        }
    }
}

const ZOOM_POSITION_MESSAGE: &str =
    "\"zoom\" expression may only be used as input to a top-level \"step\" or \"interpolate\" expression.";

/// Parse and classify a property expression.
pub fn create_property_expression(
    expression: &JsonValue,
    spec: &PropertySpec,
) -> Result<StylePropertyExpression, Vec<ParsingError>> {
    let compiled = create_expression(expression, Some(spec))?;
    let parsed = compiled.expression();

    let is_feature_constant = is_constant::is_feature_constant(parsed);
    if !is_feature_constant && !spec.supports_property_expression() {
        return Err(vec![ParsingError::new("", "data expressions not supported")]);
    }

    let is_zoom_constant = is_constant::is_global_property_constant(
        parsed,
        &["zoom", "pitch", "distance-from-center"],
    );
    if !is_zoom_constant && !spec.supports_zoom_expression() {
        return Err(vec![ParsingError::new("", "zoom expressions not supported")]);
    }

    let curve = find_zoom_curve(parsed).map_err(|e| vec![e])?;
    if curve.is_none() && !is_zoom_constant {
        return Err(vec![ParsingError::new("", ZOOM_POSITION_MESSAGE)]);
    }
    if let Some(ZoomCurve {
        interpolation: Some(_),
        ..
    }) = &curve
    {
        if !spec.supports_interpolation() {
            return Err(vec![ParsingError::new(
                "",
                "\"interpolate\" expressions cannot be used with this property",
            )]);
        }
    }

    let is_state_dependent = !is_constant::is_state_constant(parsed);
    let (kind, zoom_stops, interpolation_type) = match curve {
        None if is_feature_constant => (PropertyExpressionKind::Constant, Vec::new(), None),
        None => (PropertyExpressionKind::Source, Vec::new(), None),
        Some(curve) => {
            let kind = if is_feature_constant {
                PropertyExpressionKind::Camera
            } else {
                PropertyExpressionKind::Composite
            };
            (kind, curve.labels, curve.interpolation)
        }
    };

    Ok(StylePropertyExpression {
        kind,
        expression: compiled,
        zoom_stops,
        interpolation_type,
        is_state_dependent,
    })
}

/// The single `step`/`interpolate` over `["zoom"]` found in a tree.
struct ZoomCurve {
    node: *const Expression,
    labels: Vec<f64>,
    interpolation: Option<InterpolationType>,
}

impl ZoomCurve {
    fn of(expr: &Expression) -> Option<ZoomCurve> {
        let (input, labels, interpolation) = match expr {
            Expression::Step(s) => (&s.input, &s.labels, None),
            Expression::Interpolate(i) => (&i.input, &i.labels, Some(i.interpolation.clone())),
            _ => return None,
        };
        (input.compound_name() == Some("zoom")).then(|| ZoomCurve {
            node: expr as *const Expression,
            labels: labels.clone(),
            interpolation,
        })
    }
}

/// Locate the zoom curve. It may sit at the root or under `let` results
/// and `coalesce` arguments; a zoom read anywhere else is an error, as is
/// a second curve.
fn find_zoom_curve(expr: &Expression) -> Result<Option<ZoomCurve>, ParsingError> {
    let result = match expr {
        Expression::Let(e) => find_zoom_curve(&e.result)?,
        Expression::Coalesce(e) => {
            let mut found = None;
            for arg in &e.args {
                found = find_zoom_curve(arg)?;
                if found.is_some() {
                    break;
                }
            }
            found
        }
        _ => ZoomCurve::of(expr),
    };

    let mut error = None;
    expr.each_child(&mut |child| {
        if error.is_some() {
            return;
        }
        match find_zoom_curve(child) {
            Err(e) => error = Some(e),
            Ok(None) => {}
            Ok(Some(found)) => match &result {
                None => error = Some(ParsingError::new("", ZOOM_POSITION_MESSAGE)),
                Some(current) if current.node != found.node => {
                    error = Some(ParsingError::new(
                        "",
                        "Only one zoom-based \"step\" or \"interpolate\" subexpression may be used in an expression.",
                    ))
                }
                Some(_) => {}
            },
        }
    });

    match error {
        Some(e) => Err(e),
        None => Ok(result),
    }
}

/// True when `value` is an array whose head names an expression operator.
pub fn is_expression(value: &JsonValue) -> bool {
    value
        .as_array()
        .and_then(|items| items.first())
        .and_then(JsonValue::as_str)
        .map(definitions::is_operator)
        .unwrap_or(false)
}

/// Compile any property value: a constant, a legacy function or an
/// expression. Null means "unset" and takes the specification default.
pub fn normalize_property_value(
    value: &JsonValue,
    spec: &PropertySpec,
) -> Result<StylePropertyExpression, Vec<ParsingError>> {
    let value = match value {
        JsonValue::Null => spec.default.clone().unwrap_or(JsonValue::Null),
        other => other.clone(),
    };

    if value.is_null() {
        return Ok(StylePropertyExpression {
            kind: PropertyExpressionKind::Constant,
            expression: StyleExpression::new(
                Expression::Literal(Literal::new(Type::Null, Value::Null)),
                Some(spec),
            ),
            zoom_stops: Vec::new(),
            interpolation_type: None,
            is_state_dependent: false,
        });
    }
    if is_function(&value) {
        let converted = convert_function(&value, spec).map_err(|e| vec![e])?;
        return create_property_expression(&converted, spec);
    }
    if is_expression(&value) {
        return create_property_expression(&value, spec);
    }

    let constant = match &value {
        JsonValue::String(s) if spec.tokens => convert_token_string(s),
        JsonValue::Array(_) | JsonValue::Object(_) => json!(["literal", value]),
        _ => value,
    };
    create_property_expression(&constant, spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(value: JsonValue) -> PropertySpec {
        serde_json::from_value(value).unwrap()
    }

    fn data_number() -> PropertySpec {
        spec(json!({
            "type": "number",
            "default": 1,
            "property-type": "data-driven",
            "expression": {"interpolated": true, "parameters": ["zoom", "feature"]}
        }))
    }

    fn messages(errors: Vec<ParsingError>) -> Vec<String> {
        errors.into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn test_create_expression_folds_constants() {
        let e = create_expression(&json!(["+", 1, 2, 3]), None).unwrap();
        assert!(matches!(e.expression(), Expression::Literal(_)));
        assert_eq!(e.evaluate(&EvaluationContext::default()), Value::Number(6.0));
    }

    #[test]
    fn test_get_property() {
        let e = create_expression(&json!(["get", "height"]), None).unwrap();
        let with = Feature::new(GeometryType::Polygon).with_property("height", 12.0);
        let without = Feature::new(GeometryType::Polygon);
        let ctx = EvaluationContext::default().with_feature(&with);
        assert_eq!(e.evaluate(&ctx), Value::Number(12.0));
        let ctx = EvaluationContext::default().with_feature(&without);
        assert_eq!(e.evaluate(&ctx), Value::Null);
    }

    #[test]
    fn test_default_substitution() {
        let number = data_number();
        let e = create_expression(&json!(["get", "missing"]), Some(&number)).unwrap();
        let f = Feature::new(GeometryType::Point).with_property("missing", "text");
        let ctx = EvaluationContext::default().with_feature(&f);
        // The assertion fails at runtime and the default is returned.
        assert_eq!(e.evaluate(&ctx), Value::Number(1.0));
        assert_eq!(e.evaluate(&ctx), Value::Number(1.0));
        assert!(e.evaluate_without_error_handling(&ctx).is_err());

        let nan = create_expression(&json!(["/", 0, ["get", "x"]]), Some(&number)).unwrap();
        let f = Feature::new(GeometryType::Point).with_property("x", 0.0);
        let ctx = EvaluationContext::default().with_feature(&f);
        assert_eq!(nan.evaluate(&ctx), Value::Number(1.0));
    }

    #[test]
    fn test_enum_membership() {
        let cap = spec(json!({
            "type": "enum",
            "values": {"butt": {}, "round": {}},
            "default": "butt",
            "property-type": "data-driven",
            "expression": {"interpolated": false, "parameters": ["zoom", "feature"]}
        }));
        let e = create_expression(&json!(["get", "cap"]), Some(&cap)).unwrap();
        let good = Feature::new(GeometryType::LineString).with_property("cap", "round");
        let bad = Feature::new(GeometryType::LineString).with_property("cap", "square");
        assert_eq!(
            e.evaluate(&EvaluationContext::default().with_feature(&good)),
            Value::from("round")
        );
        let ctx = EvaluationContext::default().with_feature(&bad);
        assert_eq!(e.evaluate(&ctx), Value::from("butt"));
        assert_eq!(
            e.checked_evaluate(&ctx).unwrap_err().message,
            "Expected value to be one of \"butt\", \"round\", but found \"square\" instead."
        );
    }

    #[test]
    fn test_string_properties_coerce() {
        let string = spec(json!({"type": "string", "property-type": "data-driven",
            "expression": {"interpolated": false, "parameters": ["zoom", "feature"]}}));
        let e = create_expression(&json!(["get", "n"]), Some(&string)).unwrap();
        let f = Feature::new(GeometryType::Point).with_property("n", 5.0);
        let ctx = EvaluationContext::default().with_feature(&f);
        assert_eq!(e.evaluate(&ctx), Value::from("5"));
    }

    #[test]
    fn test_property_expression_kinds() {
        let number = data_number();
        let constant = create_property_expression(&json!(5), &number).unwrap();
        assert_eq!(constant.kind(), PropertyExpressionKind::Constant);

        let source = create_property_expression(&json!(["get", "h"]), &number).unwrap();
        assert_eq!(source.kind(), PropertyExpressionKind::Source);

        let camera = create_property_expression(
            &json!(["interpolate", ["linear"], ["zoom"], 0, 0, 10, 100]),
            &number,
        )
        .unwrap();
        assert_eq!(camera.kind(), PropertyExpressionKind::Camera);
        assert_eq!(camera.zoom_stops(), &[0.0, 10.0]);
        assert!((camera.interpolation_factor(5.0, 0.0, 10.0) - 0.5).abs() < 1e-9);
        let ctx = EvaluationContext::new(GlobalProperties::new(5.0));
        assert_eq!(camera.evaluate(&ctx), Value::Number(50.0));

        let composite = create_property_expression(
            &json!(["step", ["zoom"], ["get", "a"], 10, ["get", "b"]]),
            &number,
        )
        .unwrap();
        assert_eq!(composite.kind(), PropertyExpressionKind::Composite);
        assert_eq!(composite.zoom_stops()[1], 10.0);
        assert_eq!(composite.interpolation_factor(5.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_zoom_curve_nested_in_let_and_coalesce() {
        let number = data_number();
        let e = create_property_expression(
            &json!(["let", "x", 1, ["coalesce", ["step", ["zoom"], 1, 5, 2], 0]]),
            &number,
        )
        .unwrap();
        assert_eq!(e.kind(), PropertyExpressionKind::Camera);
    }

    #[test]
    fn test_zoom_curve_errors() {
        let number = data_number();
        let errs = create_property_expression(&json!(["+", ["zoom"], 1]), &number).unwrap_err();
        assert_eq!(messages(errs), vec![ZOOM_POSITION_MESSAGE.to_string()]);

        let errs = create_property_expression(
            &json!(["+", ["step", ["zoom"], 1, 5, 2], 1]),
            &number,
        )
        .unwrap_err();
        assert_eq!(messages(errs), vec![ZOOM_POSITION_MESSAGE.to_string()]);

        let errs = create_property_expression(
            &json!(["coalesce", ["step", ["zoom"], 1, 5, 2], ["step", ["zoom"], 3, 5, 4]]),
            &number,
        )
        .unwrap_err();
        assert_eq!(
            messages(errs),
            vec!["Only one zoom-based \"step\" or \"interpolate\" subexpression may be used in an expression."]
        );
    }

    #[test]
    fn test_property_support_errors() {
        let constant_only = spec(json!({
            "type": "number",
            "property-type": "data-constant",
            "expression": {"interpolated": false, "parameters": ["zoom"]}
        }));
        let errs = create_property_expression(&json!(["get", "x"]), &constant_only).unwrap_err();
        assert_eq!(messages(errs), vec!["data expressions not supported"]);

        let errs = create_property_expression(
            &json!(["interpolate", ["linear"], ["zoom"], 0, 0, 10, 1]),
            &constant_only,
        )
        .unwrap_err();
        assert_eq!(
            messages(errs),
            vec!["\"interpolate\" expressions cannot be used with this property"]
        );

        let no_zoom = spec(json!({"type": "number", "property-type": "constant"}));
        let errs = create_property_expression(&json!(["zoom"]), &no_zoom).unwrap_err();
        assert_eq!(messages(errs), vec!["zoom expressions not supported"]);
    }

    #[test]
    fn test_is_expression() {
        assert!(is_expression(&json!(["get", "x"])));
        assert!(!is_expression(&json!(["nope", "x"])));
        assert!(!is_expression(&json!([1, 2])));
        assert!(!is_expression(&json!({"stops": []})));
    }

    #[test]
    fn test_normalize_constants() {
        let color = spec(json!({
            "type": "color",
            "default": "#000000",
            "property-type": "data-driven",
            "expression": {"interpolated": true, "parameters": ["zoom", "feature"]}
        }));
        let red = normalize_property_value(&json!("red"), &color).unwrap();
        assert_eq!(red.kind(), PropertyExpressionKind::Constant);
        assert_eq!(
            red.evaluate(&EvaluationContext::default()),
            Value::Color(Color::new(1.0, 0.0, 0.0, 1.0))
        );
        assert!(normalize_property_value(&json!("not-a-color"), &color).is_err());

        let unset = normalize_property_value(&JsonValue::Null, &color).unwrap();
        assert_eq!(unset.evaluate(&EvaluationContext::default()), Value::Color(Color::BLACK));

        let offset = spec(json!({
            "type": "array", "value": "number", "length": 2, "default": [0, 0],
            "property-type": "data-driven",
            "expression": {"interpolated": true, "parameters": ["zoom", "feature"]}
        }));
        let e = normalize_property_value(&json!([1, 2]), &offset).unwrap();
        assert_eq!(
            e.evaluate(&EvaluationContext::default()),
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn test_normalize_tokens_and_functions() {
        let field = spec(json!({
            "type": "string",
            "tokens": true,
            "property-type": "data-driven",
            "expression": {"interpolated": false, "parameters": ["zoom", "feature"]}
        }));
        let e = normalize_property_value(&json!("{name} St"), &field).unwrap();
        assert_eq!(e.kind(), PropertyExpressionKind::Source);
        let f = Feature::new(GeometryType::Point).with_property("name", "Main");
        let ctx = EvaluationContext::default().with_feature(&f);
        assert_eq!(e.evaluate(&ctx), Value::from("Main St"));

        let number = data_number();
        let e = normalize_property_value(&json!({"stops": [[10, 0.1], [20, 0.9]]}), &number).unwrap();
        assert_eq!(e.kind(), PropertyExpressionKind::Camera);
        let at = |zoom: f64| e.evaluate(&EvaluationContext::new(GlobalProperties::new(zoom)));
        assert_eq!(at(5.0), Value::Number(0.1));
        assert_eq!(at(25.0), Value::Number(0.9));
    }
}
