//! Style document types.
//!
//! Layout and paint values are kept as raw JSON: each one is compiled
//! against its property specification on demand (see [`crate::style::cache`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Complete style document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSpec {
    /// Style version (always 8).
    #[serde(default = "default_version")]
    pub version: u32,
    /// Style name.
    #[serde(default)]
    pub name: String,
    /// Style layers, bottom to top.
    #[serde(default)]
    pub layers: Vec<StyleLayer>,
    /// Data sources (informational, not interpreted).
    #[serde(default)]
    pub sources: JsonValue,
    #[serde(default)]
    pub sprite: Option<String>,
    #[serde(default)]
    pub glyphs: Option<String>,
}

fn default_version() -> u32 {
    8
}

/// A single style layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleLayer {
    /// Unique layer ID.
    pub id: String,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(rename = "source-layer")]
    #[serde(default)]
    pub source_layer: Option<String>,
    /// Paint property values keyed by property name.
    #[serde(default)]
    pub paint: Map<String, JsonValue>,
    /// Layout property values keyed by property name.
    #[serde(default)]
    pub layout: Map<String, JsonValue>,
    /// Legacy or expression filter.
    #[serde(default)]
    pub filter: Option<JsonValue>,
    #[serde(default)]
    pub minzoom: Option<f64>,
    #[serde(default)]
    pub maxzoom: Option<f64>,
}

impl StyleLayer {
    /// Raw value of a property, if the layer sets it.
    pub fn property(&self, group: PropertyGroup, key: &str) -> Option<&JsonValue> {
        match group {
            PropertyGroup::Layout => self.layout.get(key),
            PropertyGroup::Paint => self.paint.get(key),
        }
    }

    /// Check if layer is visible (default true if not specified).
    pub fn is_visible(&self) -> bool {
        self.layout
            .get("visibility")
            .and_then(JsonValue::as_str)
            .map(|v| v != "none")
            .unwrap_or(true)
    }

    /// Check if layer passes zoom range filter. `maxzoom` is exclusive.
    pub fn in_zoom_range(&self, zoom: f64) -> bool {
        let min_ok = self.minzoom.map(|z| zoom >= z).unwrap_or(true);
        let max_ok = self.maxzoom.map(|z| zoom < z).unwrap_or(true);
        min_ok && max_ok
    }
}

/// Layer types known to the property reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Fill,
    Line,
    Symbol,
    Background,
    Circle,
    Raster,
    Hillshade,
    #[serde(other)]
    Unknown,
}

impl LayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Fill => "fill",
            LayerType::Line => "line",
            LayerType::Symbol => "symbol",
            LayerType::Background => "background",
            LayerType::Circle => "circle",
            LayerType::Raster => "raster",
            LayerType::Hillshade => "hillshade",
            LayerType::Unknown => "unknown",
        }
    }
}

/// Which half of a layer a property lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyGroup {
    Layout,
    Paint,
}

impl PropertyGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyGroup::Layout => "layout",
            PropertyGroup::Paint => "paint",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_layer_deserialize() {
        let layer: StyleLayer = serde_json::from_value(json!({
            "id": "roads",
            "type": "line",
            "source-layer": "road",
            "paint": {"line-width": 2},
            "filter": ["==", "class", "motorway"],
            "minzoom": 5
        }))
        .unwrap();
        assert_eq!(layer.layer_type, LayerType::Line);
        assert_eq!(layer.source_layer.as_deref(), Some("road"));
        assert_eq!(layer.property(PropertyGroup::Paint, "line-width"), Some(&json!(2)));
        assert!(layer.property(PropertyGroup::Layout, "line-width").is_none());
        assert!(layer.in_zoom_range(5.0));
        assert!(!layer.in_zoom_range(4.9));
    }

    #[test]
    fn test_unknown_layer_type() {
        let layer: StyleLayer =
            serde_json::from_value(json!({"id": "x", "type": "fill-extrusion"})).unwrap();
        assert_eq!(layer.layer_type, LayerType::Unknown);
        assert!(layer.is_visible());
    }
}
