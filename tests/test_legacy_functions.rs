// tests/test_legacy_functions.rs
// Legacy stop-table functions and token strings compiled as property values
// Verifies zoom, property and zoom-and-property functions end to end
//
// RELEVANT FILES: src/style/function.rs, src/style/expression/mod.rs,
// src/style/reference.rs

#[cfg(test)]
mod legacy_function_tests {
    use forge3d_style::style::expression::{
        normalize_property_value, Color, EvaluationContext, Feature, GeometryType, GlobalProperties,
        PropertyExpressionKind, StylePropertyExpression, Value,
    };
    use forge3d_style::style::function::convert_function;
    use forge3d_style::style::reference::{property_spec, PropertySpec};
    use forge3d_style::style::types::{LayerType, PropertyGroup};
    use serde_json::json;

    fn paint(layer_type: LayerType, key: &str) -> &'static PropertySpec {
        property_spec(PropertyGroup::Paint, layer_type, key).unwrap()
    }

    fn layout(layer_type: LayerType, key: &str) -> &'static PropertySpec {
        property_spec(PropertyGroup::Layout, layer_type, key).unwrap()
    }

    fn at_zoom(expr: &StylePropertyExpression, zoom: f64) -> Value {
        expr.evaluate(&EvaluationContext::new(GlobalProperties::new(zoom)))
    }

    fn for_feature(expr: &StylePropertyExpression, zoom: f64, feature: &Feature) -> Value {
        expr.evaluate(&EvaluationContext::new(GlobalProperties::new(zoom)).with_feature(feature))
    }

    #[test]
    fn zoom_function_clamps_at_the_ends() {
        let value = json!({"stops": [[10, 0.1], [20, 0.9]]});
        let expr = normalize_property_value(&value, paint(LayerType::Fill, "fill-opacity")).unwrap();
        assert_eq!(expr.kind(), PropertyExpressionKind::Camera);
        assert_eq!(expr.zoom_stops(), &[10.0, 20.0]);
        assert_eq!(at_zoom(&expr, 5.0), Value::Number(0.1));
        assert_eq!(at_zoom(&expr, 25.0), Value::Number(0.9));
        match at_zoom(&expr, 15.0) {
            Value::Number(n) => assert!((n - 0.5).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn zoom_function_shape() {
        let converted = convert_function(
            &json!({"base": 1.5, "stops": [[5, 1], [10, 4]]}),
            paint(LayerType::Line, "line-width"),
        )
        .unwrap();
        assert_eq!(
            converted,
            json!(["interpolate", ["exponential", 1.5], ["zoom"], 5, 1, 10, 4])
        );

        // Non-interpolatable properties step instead.
        let converted = convert_function(
            &json!({"stops": [[0, "butt"], [10, "round"]]}),
            layout(LayerType::Line, "line-cap"),
        )
        .unwrap();
        assert_eq!(converted, json!(["step", ["zoom"], "butt", 10, "round"]));
    }

    #[test]
    fn step_zoom_function_evaluates() {
        let value = json!({"stops": [[0, "butt"], [10, "round"]]});
        let expr = normalize_property_value(&value, layout(LayerType::Line, "line-cap")).unwrap();
        assert_eq!(at_zoom(&expr, 5.0), Value::from("butt"));
        assert_eq!(at_zoom(&expr, 12.0), Value::from("round"));
    }

    #[test]
    fn exponential_property_function() {
        let value = json!({"property": "rank", "stops": [[1, 2], [5, 10]]});
        let expr = normalize_property_value(&value, paint(LayerType::Circle, "circle-radius")).unwrap();
        assert_eq!(expr.kind(), PropertyExpressionKind::Source);
        let feature = Feature::new(GeometryType::Point).with_property("rank", 3.0);
        assert_eq!(for_feature(&expr, 0.0, &feature), Value::Number(6.0));
    }

    #[test]
    fn categorical_property_function() {
        let value = json!({
            "property": "class",
            "type": "categorical",
            "stops": [["park", "green"], ["water", "blue"]],
            "default": "gray"
        });
        let expr = normalize_property_value(&value, paint(LayerType::Fill, "fill-color")).unwrap();
        let park = Feature::new(GeometryType::Polygon).with_property("class", "park");
        let road = Feature::new(GeometryType::Polygon).with_property("class", "road");
        assert_eq!(for_feature(&expr, 0.0, &park), Value::Color(Color::new(0.0, 128.0 / 255.0, 0.0, 1.0)));
        assert_eq!(for_feature(&expr, 0.0, &road), Value::Color(Color::new(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0, 1.0)));
    }

    #[test]
    fn interval_property_function() {
        let value = json!({"property": "pop", "type": "interval", "stops": [[0, 4], [1000, 8]]});
        let expr = normalize_property_value(&value, paint(LayerType::Circle, "circle-radius")).unwrap();
        let town = Feature::new(GeometryType::Point).with_property("pop", 500.0);
        let city = Feature::new(GeometryType::Point).with_property("pop", 2000.0);
        assert_eq!(for_feature(&expr, 0.0, &town), Value::Number(4.0));
        assert_eq!(for_feature(&expr, 0.0, &city), Value::Number(8.0));
    }

    #[test]
    fn zoom_and_property_function() {
        let value = json!({
            "property": "rank",
            "stops": [
                [{"zoom": 0, "value": 1}, 1],
                [{"zoom": 0, "value": 5}, 5],
                [{"zoom": 10, "value": 1}, 10],
                [{"zoom": 10, "value": 5}, 50]
            ]
        });
        let expr = normalize_property_value(&value, paint(LayerType::Circle, "circle-radius")).unwrap();
        assert_eq!(expr.kind(), PropertyExpressionKind::Composite);
        assert_eq!(expr.zoom_stops(), &[0.0, 10.0]);

        let feature = Feature::new(GeometryType::Point).with_property("rank", 1.0);
        assert_eq!(for_feature(&expr, 5.0, &feature), Value::Number(5.5));
        assert_eq!(for_feature(&expr, 10.0, &feature), Value::Number(10.0));
    }

    #[test]
    fn identity_function() {
        let value = json!({"type": "identity", "property": "width"});
        let expr = normalize_property_value(&value, paint(LayerType::Line, "line-width")).unwrap();
        let feature = Feature::new(GeometryType::LineString).with_property("width", 3.0);
        assert_eq!(for_feature(&expr, 0.0, &feature), Value::Number(3.0));
        // Missing property: default of the property.
        let bare = Feature::new(GeometryType::LineString);
        assert_eq!(for_feature(&expr, 0.0, &bare), Value::Number(1.0));
    }

    #[test]
    fn token_strings() {
        let value = json!("{name} ({ref})");
        let expr = normalize_property_value(&value, layout(LayerType::Symbol, "text-field")).unwrap();
        let feature = Feature::new(GeometryType::Point)
            .with_property("name", "Main")
            .with_property("ref", "A1");
        assert_eq!(for_feature(&expr, 0.0, &feature).to_string(), "Main (A1)");
    }

    #[test]
    fn invalid_functions_are_rejected() {
        let spec = paint(LayerType::Fill, "fill-opacity");
        let errors = normalize_property_value(&json!({"type": "bogus", "stops": [[0, 1]]}), spec).unwrap_err();
        assert_eq!(errors[0].message, "Unknown zoom function type \"bogus\"");

        let errors = normalize_property_value(&json!({"stops": []}), spec).unwrap_err();
        assert_eq!(errors[0].message, "Function stops must be non-empty.");
    }
}
