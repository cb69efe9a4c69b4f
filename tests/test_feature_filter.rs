// tests/test_feature_filter.rs
// Layer filters: legacy syntax, expression syntax and the static/dynamic split
//
// RELEVANT FILES: src/style/filter.rs, src/style/expression/definitions/compound.rs,
// src/style/expression/definitions/within.rs

#[cfg(test)]
mod feature_filter_tests {
    use forge3d_style::style::expression::{
        CanonicalTileId, EvaluationContext, Feature, GeometryType, GlobalProperties, TilePoint,
    };
    use forge3d_style::style::filter::{convert_filter, create_filter, extract_static_filter, FeatureFilter};
    use serde_json::json;

    fn compile(filter: serde_json::Value) -> FeatureFilter {
        create_filter(Some(&filter)).unwrap()
    }

    fn passes(filter: &FeatureFilter, feature: &Feature) -> bool {
        filter.matches(&EvaluationContext::default().with_feature(feature))
    }

    #[test]
    fn legacy_all_with_has() {
        let filter = compile(json!(["all", ["==", "type", "park"], ["has", "name"]]));
        let named = Feature::new(GeometryType::Polygon)
            .with_property("type", "park")
            .with_property("name", "X");
        let unnamed = Feature::new(GeometryType::Polygon).with_property("type", "park");
        assert!(passes(&filter, &named));
        assert!(!passes(&filter, &unnamed));
    }

    #[test]
    fn missing_filter_accepts_everything() {
        let filter = create_filter(None).unwrap();
        assert!(passes(&filter, &Feature::new(GeometryType::Point)));
        assert!(!filter.has_dynamic_filter());
    }

    #[test]
    fn legacy_type_and_id_filters() {
        let polygons = compile(json!(["==", "$type", "Polygon"]));
        assert!(passes(&polygons, &Feature::new(GeometryType::Polygon)));
        assert!(!passes(&polygons, &Feature::new(GeometryType::Point)));

        let ids = compile(json!(["in", "$id", 1, 2, 3]));
        assert!(passes(&ids, &Feature::new(GeometryType::Point).with_id(2.0)));
        assert!(!passes(&ids, &Feature::new(GeometryType::Point).with_id(4.0)));

        let no_id = compile(json!(["!has", "$id"]));
        assert!(passes(&no_id, &Feature::new(GeometryType::Point)));
    }

    #[test]
    fn legacy_in_and_negations() {
        let filter = compile(json!(["!in", "class", "motorway", "trunk"]));
        let path = Feature::new(GeometryType::LineString).with_property("class", "path");
        let trunk = Feature::new(GeometryType::LineString).with_property("class", "trunk");
        assert!(passes(&filter, &path));
        assert!(!passes(&filter, &trunk));

        let none = compile(json!(["none", ["==", "class", "path"], ["<", "rank", 3]]));
        let ranked = Feature::new(GeometryType::LineString)
            .with_property("class", "road")
            .with_property("rank", 5.0);
        assert!(passes(&none, &ranked));
        assert!(!passes(&none, &path));
    }

    #[test]
    fn legacy_ordering_needs_same_kind() {
        let filter = compile(json!([">", "rank", 3]));
        let high = Feature::new(GeometryType::Point).with_property("rank", 5.0);
        let text = Feature::new(GeometryType::Point).with_property("rank", "5");
        assert!(passes(&filter, &high));
        assert!(!passes(&filter, &text));
    }

    #[test]
    fn large_in_lists_are_sorted() {
        let mut legacy = vec![json!("in"), json!("code")];
        legacy.extend((0..250).rev().map(|n| json!(n)));
        let converted = convert_filter(&serde_json::Value::Array(legacy.clone()));
        assert_eq!(converted[0], "filter-in-large");
        assert_eq!(converted[2][1][0], json!(0));
        assert_eq!(converted[2][1][249], json!(249));

        let filter = compile(serde_json::Value::Array(legacy));
        assert!(passes(&filter, &Feature::new(GeometryType::Point).with_property("code", 117.0)));
        assert!(!passes(&filter, &Feature::new(GeometryType::Point).with_property("code", 300.0)));
    }

    #[test]
    fn expression_filters_pass_through() {
        let filter = compile(json!(["all", [">=", ["get", "height"], 10], ["!=", ["get", "kind"], "shed"]]));
        let tower = Feature::new(GeometryType::Polygon)
            .with_property("height", 40.0)
            .with_property("kind", "tower");
        let shed = Feature::new(GeometryType::Polygon)
            .with_property("height", 40.0)
            .with_property("kind", "shed");
        assert!(passes(&filter, &tower));
        assert!(!passes(&filter, &shed));
        assert!(!filter.has_dynamic_filter());
    }

    #[test]
    fn pitch_filters_split_static_and_dynamic() {
        let raw = json!(["all", ["==", ["get", "class"], "a"], ["<", ["pitch"], 60]]);
        assert_eq!(
            extract_static_filter(&raw).unwrap(),
            json!(["all", ["==", ["get", "class"], "a"], true])
        );

        let filter = compile(raw);
        assert!(filter.has_dynamic_filter());
        assert!(filter.needs_feature());

        let a = Feature::new(GeometryType::Point).with_property("class", "a");
        let b = Feature::new(GeometryType::Point).with_property("class", "b");
        let flat = GlobalProperties::new(10.0).with_pitch(30.0);
        let steep = GlobalProperties::new(10.0).with_pitch(70.0);

        assert!(filter.evaluate_static(&EvaluationContext::new(steep).with_feature(&a)));
        assert!(filter.matches(&EvaluationContext::new(flat).with_feature(&a)));
        assert!(!filter.matches(&EvaluationContext::new(steep).with_feature(&a)));
        assert!(!filter.matches(&EvaluationContext::new(flat).with_feature(&b)));
    }

    #[test]
    fn dynamic_case_branches_become_any() {
        let raw = json!(["case", ["<", ["pitch"], 60], ["==", ["get", "a"], 1], ["==", ["get", "b"], 2]]);
        assert_eq!(
            extract_static_filter(&raw).unwrap(),
            json!(["any", ["==", ["get", "a"], 1], ["==", ["get", "b"], 2]])
        );
    }

    #[test]
    fn within_needs_geometry_and_tile() {
        let polygon = json!({
            "type": "Polygon",
            "coordinates": [[[-10, -10], [10, -10], [10, 10], [-10, 10], [-10, -10]]]
        });
        let filter = compile(json!(["within", polygon]));
        assert!(filter.needs_geometry());

        // At zoom 0 the origin sits in the middle of the single tile.
        let inside = Feature::new(GeometryType::Point).with_geometry(vec![vec![TilePoint::new(4096, 4096)]]);
        let outside = Feature::new(GeometryType::Point).with_geometry(vec![vec![TilePoint::new(100, 100)]]);
        let tile = CanonicalTileId::new(0, 0, 0);

        assert!(filter.matches(&EvaluationContext::default().with_feature(&inside).with_canonical(tile)));
        assert!(!filter.matches(&EvaluationContext::default().with_feature(&outside).with_canonical(tile)));
        // No tile id: nothing can be placed.
        assert!(!filter.matches(&EvaluationContext::default().with_feature(&inside)));
    }

    #[test]
    fn invalid_expression_filters_fail() {
        assert!(create_filter(Some(&json!(["==", ["get", "a"]]))).is_err());
        assert!(create_filter(Some(&json!(["+", 1, 2]))).is_err());
    }
}
