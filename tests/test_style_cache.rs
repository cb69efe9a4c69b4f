// tests/test_style_cache.rs
// End-to-end: load a style, resolve layer attributes through the cache
// Exercises parsing, validation, memoization, invalidation and filters
//
// RELEVANT FILES: src/style/parser.rs, src/style/cache.rs, src/style/converters.rs

#[cfg(test)]
mod style_cache_tests {
    use forge3d_style::style::{
        fill_attributes, line_attributes, parse_style_str, symbol_attributes, EvaluationContext,
        Feature, GlobalProperties, PropertyGroup, StyleCache, StyleSpec, Value,
    };
    use forge3d_style::style::expression::GeometryType;
    use forge3d_style::StyleError;

    const STYLE: &str = r##"{
        "version": 8,
        "name": "City",
        "sources": {"composite": {"type": "vector"}},
        "layers": [
            {"id": "land", "type": "background", "paint": {"background-color": "#eeeeee"}},
            {"id": "parks", "type": "fill", "source": "composite", "source-layer": "landuse",
             "filter": ["==", "class", "park"],
             "paint": {"fill-color": ["match", ["get", "size"], "large", "#006400", "#90ee90"],
                       "fill-opacity": {"stops": [[10, 0.2], [16, 1]]}}},
            {"id": "roads", "type": "line", "source": "composite", "source-layer": "road",
             "filter": ["all", ["match", ["get", "class"], ["primary", "secondary"], true, false], ["<", ["pitch"], 60]],
             "layout": {"line-join": "round"},
             "paint": {"line-width": ["interpolate", ["exponential", 2], ["zoom"], 10, 1, 14, 16],
                       "line-color": ["case", ["boolean", ["feature-state", "hover"], false], "red", "white"]}},
            {"id": "places", "type": "symbol", "source": "composite", "source-layer": "place",
             "minzoom": 4,
             "layout": {"text-field": ["format", ["upcase", ["get", "name"]], {}], "text-size": 12}}
        ]
    }"##;

    fn style() -> StyleSpec {
        parse_style_str(STYLE).unwrap()
    }

    #[test]
    fn fill_layer_resolves_per_zoom_and_feature() {
        let spec = style();
        let parks = spec.require_layer("parks").unwrap();
        let mut cache = StyleCache::new();

        let large = Feature::new(GeometryType::Polygon)
            .with_property("class", "park")
            .with_property("size", "large");
        let ctx = EvaluationContext::new(GlobalProperties::new(13.0)).with_feature(&large);

        assert!(cache.evaluate_filter(&parks.id, parks.filter.as_ref(), &ctx).unwrap());
        let attrs = fill_attributes(&mut cache, parks, &ctx).unwrap();
        assert!((attrs.color[1] - 100.0 / 255.0).abs() < 1e-4);
        assert!((attrs.color[3] - 0.6).abs() < 1e-4);

        let opacity = cache
            .get_value(parks, PropertyGroup::Paint, "fill-opacity", &EvaluationContext::new(GlobalProperties::new(20.0)))
            .unwrap();
        assert_eq!(opacity, Value::Number(1.0));
    }

    #[test]
    fn line_layer_reads_feature_state_and_pitch() {
        let spec = style();
        let roads = spec.require_layer("roads").unwrap();
        let mut cache = StyleCache::new();
        let primary = Feature::new(GeometryType::LineString).with_property("class", "primary");

        let mut state = forge3d_style::style::expression::FeatureState::new();
        state.insert("hover".into(), Value::Bool(true));
        let hovered = EvaluationContext::new(GlobalProperties::new(12.0))
            .with_feature(&primary)
            .with_feature_state(&state);
        let attrs = line_attributes(&mut cache, roads, &hovered).unwrap();
        assert_eq!(attrs.color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(attrs.join, "round");
        // Exponential base 2 from 1 to 16 over four zoom levels.
        let expected = 1.0 + 15.0 * (4.0f32 - 1.0) / (16.0 - 1.0);
        assert!((attrs.width - expected).abs() < 1e-4, "{}", attrs.width);

        let plain = EvaluationContext::new(GlobalProperties::new(12.0)).with_feature(&primary);
        assert_eq!(line_attributes(&mut cache, roads, &plain).unwrap().color, [1.0, 1.0, 1.0, 1.0]);

        let tilted = EvaluationContext::new(GlobalProperties::new(12.0).with_pitch(75.0)).with_feature(&primary);
        assert!(!cache.evaluate_filter(&roads.id, roads.filter.as_ref(), &tilted).unwrap());
        assert!(cache.evaluate_filter(&roads.id, roads.filter.as_ref(), &plain).unwrap());
    }

    #[test]
    fn symbol_layer_formats_text() {
        let spec = style();
        let places = spec.require_layer("places").unwrap();
        assert!(!places.in_zoom_range(3.0));

        let mut cache = StyleCache::new();
        let town = Feature::new(GeometryType::Point).with_property("name", "Graz");
        let ctx = EvaluationContext::new(GlobalProperties::new(8.0)).with_feature(&town);
        let attrs = symbol_attributes(&mut cache, places, &ctx).unwrap();
        assert_eq!(attrs.text.as_deref(), Some("GRAZ"));
        assert_eq!(attrs.size, 12.0);
    }

    #[test]
    fn cache_is_memoized_until_cleared() {
        let spec = style();
        let mut cache = StyleCache::new();
        let ctx = EvaluationContext::new(GlobalProperties::new(12.0));
        for layer in spec.active_layers(12.0) {
            cache.evaluate_filter(&layer.id, layer.filter.as_ref(), &ctx).unwrap();
        }
        assert_eq!(cache.filter_count(), 4);

        let roads = spec.require_layer("roads").unwrap();
        cache.get_value(roads, PropertyGroup::Paint, "line-width", &ctx).unwrap();
        cache.get_value(roads, PropertyGroup::Paint, "line-width", &ctx).unwrap();
        assert_eq!(cache.property_count(), 1);

        cache.invalidate_layer("roads");
        assert_eq!((cache.property_count(), cache.filter_count()), (0, 3));
        cache.clear();
        assert_eq!(cache.filter_count(), 0);
    }

    #[test]
    fn invalid_styles_report_every_problem() {
        let broken = STYLE
            .replace("\"#eeeeee\"", "\"#eeeeeg\"")
            .replace("\"text-size\": 12", "\"text-size\": [\"get\"]");
        match parse_style_str(&broken) {
            Err(StyleError::Validation(problems)) => {
                assert_eq!(problems.len(), 2, "{:?}", problems);
                assert!(problems[0].starts_with("layers.land.paint.background-color"));
                assert!(problems[1].starts_with("layers.places.layout.text-size"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|s| s.name)),
        }
    }
}
