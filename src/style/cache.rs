//! Per-layer memoization of compiled property values and filters.
//!
//! A cache belongs to one loaded style. Entries are compiled on first
//! access and live until the layer is invalidated or the cache cleared.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::error::StyleResult;
use crate::style::expression::{normalize_property_value, EvaluationContext, StylePropertyExpression, Value};
use crate::style::filter::{create_filter, FeatureFilter};
use crate::style::reference::property_spec;
use crate::style::types::{PropertyGroup, StyleLayer};

type PropertyKey = (String, PropertyGroup, String);

/// Compiled evaluators keyed by layer id.
#[derive(Debug, Default)]
pub struct StyleCache {
    properties: HashMap<PropertyKey, StylePropertyExpression>,
    filters: HashMap<String, FeatureFilter>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled evaluator for one layout or paint property of `layer`.
    pub fn property(
        &mut self,
        layer: &StyleLayer,
        group: PropertyGroup,
        key: &str,
    ) -> StyleResult<&StylePropertyExpression> {
        let cache_key = (layer.id.clone(), group, key.to_string());
        if !self.properties.contains_key(&cache_key) {
            let spec = property_spec(group, layer.layer_type, key)?;
            let raw = layer.property(group, key).unwrap_or(&JsonValue::Null);
            let compiled = normalize_property_value(raw, spec)?;
            self.properties.insert(cache_key.clone(), compiled);
        }
        Ok(&self.properties[&cache_key])
    }

    /// Resolve a property of `layer` for the feature and camera in `ctx`.
    pub fn get_value(
        &mut self,
        layer: &StyleLayer,
        group: PropertyGroup,
        key: &str,
        ctx: &EvaluationContext,
    ) -> StyleResult<Value> {
        Ok(self.property(layer, group, key)?.evaluate(ctx))
    }

    /// Compiled filter of a layer.
    pub fn filter(&mut self, layer_id: &str, filter: Option<&JsonValue>) -> StyleResult<&FeatureFilter> {
        if !self.filters.contains_key(layer_id) {
            let compiled = create_filter(filter)?;
            self.filters.insert(layer_id.to_string(), compiled);
        }
        Ok(&self.filters[layer_id])
    }

    /// True when the feature in `ctx` passes the layer's filter.
    pub fn evaluate_filter(
        &mut self,
        layer_id: &str,
        filter: Option<&JsonValue>,
        ctx: &EvaluationContext,
    ) -> StyleResult<bool> {
        Ok(self.filter(layer_id, filter)?.matches(ctx))
    }

    /// Drop everything compiled for `layer_id`, e.g. after its paint or
    /// layout was replaced.
    pub fn invalidate_layer(&mut self, layer_id: &str) {
        let before = self.properties.len();
        self.properties.retain(|(id, _, _), _| id != layer_id);
        let filter_removed = self.filters.remove(layer_id).is_some();
        log::debug!(
            "Invalidated layer {}: {} properties, filter {}",
            layer_id,
            before - self.properties.len(),
            if filter_removed { "dropped" } else { "not cached" }
        );
    }

    pub fn clear(&mut self) {
        self.properties.clear();
        self.filters.clear();
    }

    /// Number of compiled property evaluators.
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::expression::{Color, Feature, GeometryType, GlobalProperties};
    use serde_json::json;

    fn layer(value: JsonValue) -> StyleLayer {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_get_value_memoizes() {
        let water = layer(json!({
            "id": "water",
            "type": "fill",
            "paint": {"fill-color": "#0066ff", "fill-opacity": ["interpolate", ["linear"], ["zoom"], 0, 0, 10, 1]}
        }));
        let mut cache = StyleCache::new();
        let ctx = EvaluationContext::new(GlobalProperties::new(5.0));

        let opacity = cache.get_value(&water, PropertyGroup::Paint, "fill-opacity", &ctx).unwrap();
        assert_eq!(opacity, Value::Number(0.5));
        let color = cache.get_value(&water, PropertyGroup::Paint, "fill-color", &ctx).unwrap();
        let [r, g, b, a] = color.as_color().map(|c| c.to_array()).unwrap();
        assert!(r.abs() < 1e-9 && (g - 102.0).abs() < 1e-9 && (b - 255.0).abs() < 1e-9);
        assert_eq!(a, 1.0);
        // Unset properties resolve to their default.
        let antialias = cache.get_value(&water, PropertyGroup::Paint, "fill-antialias", &ctx).unwrap();
        assert_eq!(antialias, Value::Bool(true));
        assert_eq!(cache.property_count(), 3);

        cache.get_value(&water, PropertyGroup::Paint, "fill-opacity", &ctx).unwrap();
        assert_eq!(cache.property_count(), 3);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let a = layer(json!({"id": "a", "type": "line", "paint": {"line-width": 2}}));
        let b = layer(json!({"id": "b", "type": "line"}));
        let mut cache = StyleCache::new();
        let ctx = EvaluationContext::default();
        cache.get_value(&a, PropertyGroup::Paint, "line-width", &ctx).unwrap();
        cache.get_value(&b, PropertyGroup::Paint, "line-width", &ctx).unwrap();
        cache.evaluate_filter("a", a.filter.as_ref(), &ctx).unwrap();
        assert_eq!((cache.property_count(), cache.filter_count()), (2, 1));

        cache.invalidate_layer("a");
        assert_eq!((cache.property_count(), cache.filter_count()), (1, 0));
        cache.clear();
        assert_eq!((cache.property_count(), cache.filter_count()), (0, 0));
    }

    #[test]
    fn test_invalidate_picks_up_new_values() {
        let mut road = layer(json!({"id": "road", "type": "line", "paint": {"line-color": "red"}}));
        let mut cache = StyleCache::new();
        let ctx = EvaluationContext::default();
        let red = cache.get_value(&road, PropertyGroup::Paint, "line-color", &ctx).unwrap();
        assert_eq!(red, Value::Color(Color::new(1.0, 0.0, 0.0, 1.0)));

        road.paint.insert("line-color".into(), json!("blue"));
        let stale = cache.get_value(&road, PropertyGroup::Paint, "line-color", &ctx).unwrap();
        assert_eq!(stale, red);
        cache.invalidate_layer("road");
        let blue = cache.get_value(&road, PropertyGroup::Paint, "line-color", &ctx).unwrap();
        assert_eq!(blue, Value::Color(Color::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_filter_cache() {
        let mut cache = StyleCache::new();
        let filter = json!(["==", "class", "motorway"]);
        let motorway = Feature::new(GeometryType::LineString).with_property("class", "motorway");
        let path = Feature::new(GeometryType::LineString).with_property("class", "path");
        let ctx = EvaluationContext::default().with_feature(&motorway);
        assert!(cache.evaluate_filter("roads", Some(&filter), &ctx).unwrap());
        let ctx = EvaluationContext::default().with_feature(&path);
        assert!(!cache.evaluate_filter("roads", Some(&filter), &ctx).unwrap());
        assert_eq!(cache.filter_count(), 1);
    }

    #[test]
    fn test_errors_surface() {
        let bad = layer(json!({"id": "bad", "type": "fill", "paint": {"fill-opacity": ["get"]}}));
        let mut cache = StyleCache::new();
        let ctx = EvaluationContext::default();
        assert!(cache.get_value(&bad, PropertyGroup::Paint, "fill-opacity", &ctx).is_err());
        assert!(cache.get_value(&bad, PropertyGroup::Paint, "no-such-property", &ctx).is_err());
        assert_eq!(cache.property_count(), 0);
    }
}
