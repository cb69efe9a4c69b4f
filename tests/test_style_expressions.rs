// tests/test_style_expressions.rs
// Expression parsing, folding and evaluation through the public API
// Covers arithmetic, data lookups, bindings, branching, curves and errors
//
// RELEVANT FILES: src/style/expression/mod.rs, src/style/expression/parsing.rs,
// src/style/expression/definitions/mod.rs

#[cfg(test)]
mod style_expression_tests {
    use forge3d_style::style::expression::is_constant::{is_feature_constant, is_global_property_constant};
    use forge3d_style::style::expression::{
        create_expression, Color, EvaluationContext, Expression, Feature, GeometryType,
        GlobalProperties, Value,
    };
    use forge3d_style::style::reference::property_spec;
    use forge3d_style::style::types::{LayerType, PropertyGroup};
    use serde_json::json;

    fn eval(expression: serde_json::Value, ctx: &EvaluationContext) -> Value {
        create_expression(&expression, None)
            .unwrap()
            .evaluate_without_error_handling(ctx)
            .unwrap()
    }

    #[test]
    fn sum_of_literals_folds_to_constant() {
        let expr = create_expression(&json!(["+", 1, 2, 3]), None).unwrap();
        assert!(matches!(expr.expression(), Expression::Literal(_)));
        assert_eq!(expr.evaluate(&EvaluationContext::default()), Value::Number(6.0));
    }

    #[test]
    fn get_reads_feature_properties() {
        let expr = create_expression(&json!(["get", "height"]), None).unwrap();
        assert!(!is_feature_constant(expr.expression()));

        let tall = Feature::new(GeometryType::Polygon).with_property("height", 12.0);
        let ctx = EvaluationContext::default().with_feature(&tall);
        assert_eq!(expr.evaluate(&ctx), Value::Number(12.0));

        let flat = Feature::new(GeometryType::Polygon);
        let ctx = EvaluationContext::default().with_feature(&flat);
        assert_eq!(expr.evaluate(&ctx), Value::Null);
    }

    #[test]
    fn serialize_keeps_canonical_form() {
        let expr = create_expression(&json!(["get", "height"]), None).unwrap();
        assert_eq!(expr.expression().serialize(), json!(["get", "height"]));
    }

    #[test]
    fn let_bindings_see_earlier_names() {
        let value = eval(
            json!(["let", "a", 1, "b", ["+", ["var", "a"], 1], ["*", ["var", "b"], 2]]),
            &EvaluationContext::default(),
        );
        assert_eq!(value, Value::Number(4.0));

        let errors = create_expression(&json!(["var", "missing"]), None).unwrap_err();
        assert!(errors[0].message.contains("Unknown variable \"missing\""), "{:?}", errors);
    }

    #[test]
    fn case_and_match_pick_branches() {
        let feature = Feature::new(GeometryType::LineString)
            .with_property("class", "primary")
            .with_property("lanes", 4.0);
        let ctx = EvaluationContext::default().with_feature(&feature);

        let case = json!(["case", [">", ["get", "lanes"], 2], "wide", "narrow"]);
        assert_eq!(eval(case, &ctx), Value::from("wide"));

        let matched = json!(["match", ["get", "class"], ["motorway", "trunk"], 1, "primary", 2, 0]);
        assert_eq!(eval(matched, &ctx), Value::Number(2.0));

        let fallback = json!(["match", ["get", "lanes"], 1, "one", "many"]);
        assert_eq!(eval(fallback, &ctx), Value::from("many"));
    }

    #[test]
    fn coalesce_skips_nulls() {
        let feature = Feature::new(GeometryType::Point).with_property("name_en", "Vienna");
        let ctx = EvaluationContext::default().with_feature(&feature);
        let expr = json!(["coalesce", ["get", "name_de"], ["get", "name_en"], "unnamed"]);
        assert_eq!(eval(expr, &ctx), Value::from("Vienna"));
    }

    #[test]
    fn zoom_interpolation_and_steps() {
        let curve = create_expression(
            &json!(["interpolate", ["linear"], ["zoom"], 10, 0, 20, 100]),
            None,
        )
        .unwrap();
        assert!(!is_global_property_constant(curve.expression(), &["zoom"]));
        let at = |zoom: f64| curve.evaluate(&EvaluationContext::new(GlobalProperties::new(zoom)));
        assert_eq!(at(5.0), Value::Number(0.0));
        assert_eq!(at(15.0), Value::Number(50.0));
        assert_eq!(at(25.0), Value::Number(100.0));

        let step = create_expression(&json!(["step", ["zoom"], "small", 10, "medium", 15, "large"]), None).unwrap();
        let at = |zoom: f64| step.evaluate(&EvaluationContext::new(GlobalProperties::new(zoom)));
        assert_eq!(at(3.0), Value::from("small"));
        assert_eq!(at(10.0), Value::from("medium"));
        assert_eq!(at(20.0), Value::from("large"));
    }

    #[test]
    fn color_interpolation() {
        let expr = create_expression(
            &json!(["interpolate", ["linear"], ["zoom"], 0, "black", 10, "white"]),
            None,
        )
        .unwrap();
        let ctx = EvaluationContext::new(GlobalProperties::new(5.0));
        let Value::Color(c) = expr.evaluate(&ctx) else {
            panic!("expected a color");
        };
        let [r, g, b, a] = c.to_array();
        assert!((r - 127.5).abs() < 0.01 && (g - 127.5).abs() < 0.01 && (b - 127.5).abs() < 0.01);
        assert_eq!(a, 1.0);
    }

    #[test]
    fn typed_property_expressions() {
        let spec = property_spec(PropertyGroup::Paint, LayerType::Fill, "fill-color").unwrap();
        let expr = create_expression(&json!(["get", "color"]), Some(spec)).unwrap();

        let red = Feature::new(GeometryType::Polygon).with_property("color", "red");
        let ctx = EvaluationContext::default().with_feature(&red);
        assert_eq!(expr.evaluate(&ctx), Value::Color(Color::new(1.0, 0.0, 0.0, 1.0)));

        // Unparseable colors fall back to the property default.
        let junk = Feature::new(GeometryType::Polygon).with_property("color", "no-such-color");
        let ctx = EvaluationContext::default().with_feature(&junk);
        assert!(expr.evaluate_without_error_handling(&ctx).is_err());
        assert_eq!(expr.evaluate(&ctx), Value::Color(Color::BLACK));
    }

    #[test]
    fn parse_errors_are_path_keyed() {
        let errors = create_expression(&json!(["+", 1, ["get", "a", "b", "c"]]), None).unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors[0].key.starts_with("[2]"), "{:?}", errors);

        let errors = create_expression(&json!(["no-such-operator", 1]), None).unwrap_err();
        assert_eq!(errors[0].key, "[0]");
    }

    #[test]
    fn runtime_errors_carry_messages() {
        let feature = Feature::new(GeometryType::Point)
            .with_properties_json(&json!({"items": [1, 2]}));
        let ctx = EvaluationContext::default().with_feature(&feature);
        let expr = create_expression(&json!(["at", 5, ["array", ["get", "items"]]]), None).unwrap();
        let err = expr.evaluate_without_error_handling(&ctx).unwrap_err();
        assert_eq!(err.message, "Array index out of bounds: 5 > 1.");
        assert_eq!(expr.evaluate(&ctx), Value::Null);
    }

    #[test]
    fn string_helpers() {
        let ctx = EvaluationContext::default();
        assert_eq!(eval(json!(["upcase", "abc"]), &ctx), Value::from("ABC"));
        assert_eq!(eval(json!(["concat", "a", 1, true]), &ctx), Value::from("a1true"));
        assert_eq!(eval(json!(["length", "héllo"]), &ctx), Value::Number(5.0));
        assert_eq!(eval(json!(["to-string", ["rgba", 255, 0, 0, 1]]), &ctx), Value::from("rgba(255,0,0,1)"));
    }
}
