//! Evaluation context: the per-call environment an expression reads from.

use std::cell::RefCell;
use std::collections::HashMap;

use super::color::Color;
use super::value::{Value, ValueMap};

/// Runtime evaluation failure (bad index, failed coercion, ...).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type EvalResult = Result<Value, EvalError>;

/// Vector tile geometry type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryType {
    #[default]
    Unknown,
    Point,
    LineString,
    Polygon,
}

impl GeometryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Unknown => "Unknown",
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
        }
    }

    /// Parse a GeoJSON-ish geometry name; multi-geometries map to their base type.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Point" | "MultiPoint" => GeometryType::Point,
            "LineString" | "MultiLineString" => GeometryType::LineString,
            "Polygon" | "MultiPolygon" => GeometryType::Polygon,
            _ => GeometryType::Unknown,
        }
    }
}

/// A point in tile-local integer coordinates (0..8192 inside the tile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TilePoint {
    pub x: i32,
    pub y: i32,
}

impl TilePoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A feature as seen by expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    pub id: Option<Value>,
    pub geometry_type: GeometryType,
    pub properties: ValueMap,
    /// Rings / lines / point groups in tile coordinates.
    pub geometry: Vec<Vec<TilePoint>>,
}

impl Feature {
    pub fn new(geometry_type: GeometryType) -> Self {
        Self {
            geometry_type,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn with_properties_json(mut self, properties: &serde_json::Value) -> Self {
        if let Value::Object(map) = Value::from_json(properties) {
            self.properties.extend(map);
        }
        self
    }

    pub fn with_geometry(mut self, geometry: Vec<Vec<TilePoint>>) -> Self {
        self.geometry = geometry;
        self
    }
}

/// Feature-state values keyed by state name.
pub type FeatureState = ValueMap;

/// Tile address used by `within`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalTileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl CanonicalTileId {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

/// Camera data needed by `distance-from-center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureDistanceData {
    pub bearing: [f64; 2],
    pub center: [f64; 2],
    pub scale: f64,
}

/// Camera and render-pass values shared by every feature in one evaluation pass.
#[derive(Clone, Copy, Default)]
pub struct GlobalProperties {
    pub zoom: f64,
    pub pitch: Option<f64>,
    pub heatmap_density: Option<f64>,
    pub line_progress: Option<f64>,
    pub accumulated: Option<f64>,
    pub is_supported_script: Option<fn(&str) -> bool>,
}

impl std::fmt::Debug for GlobalProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalProperties")
            .field("zoom", &self.zoom)
            .field("pitch", &self.pitch)
            .field("heatmap_density", &self.heatmap_density)
            .field("line_progress", &self.line_progress)
            .field("accumulated", &self.accumulated)
            .field("is_supported_script", &self.is_supported_script.is_some())
            .finish()
    }
}

impl GlobalProperties {
    pub fn new(zoom: f64) -> Self {
        Self {
            zoom,
            ..Default::default()
        }
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_heatmap_density(mut self, density: f64) -> Self {
        self.heatmap_density = Some(density);
        self
    }

    pub fn with_line_progress(mut self, progress: f64) -> Self {
        self.line_progress = Some(progress);
        self
    }

    pub fn with_accumulated(mut self, accumulated: f64) -> Self {
        self.accumulated = Some(accumulated);
        self
    }

    pub fn with_supported_script(mut self, predicate: fn(&str) -> bool) -> Self {
        self.is_supported_script = Some(predicate);
        self
    }
}

/// Everything an expression may read while evaluating.
///
/// Built per evaluation call from borrowed pieces; not reentrant. The
/// color cache lives only as long as the context.
#[derive(Debug, Default)]
pub struct EvaluationContext<'a> {
    pub globals: GlobalProperties,
    pub feature: Option<&'a Feature>,
    pub feature_state: Option<&'a FeatureState>,
    pub available_images: &'a [String],
    pub canonical: Option<CanonicalTileId>,
    pub feature_tile_coord: Option<[f64; 2]>,
    pub feature_distance_data: Option<FeatureDistanceData>,
    parse_color_cache: RefCell<HashMap<String, Option<Color>>>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(globals: GlobalProperties) -> Self {
        Self {
            globals,
            ..Default::default()
        }
    }

    pub fn with_feature(mut self, feature: &'a Feature) -> Self {
        self.feature = Some(feature);
        self
    }

    pub fn with_feature_state(mut self, state: &'a FeatureState) -> Self {
        self.feature_state = Some(state);
        self
    }

    pub fn with_available_images(mut self, images: &'a [String]) -> Self {
        self.available_images = images;
        self
    }

    pub fn with_canonical(mut self, canonical: CanonicalTileId) -> Self {
        self.canonical = Some(canonical);
        self
    }

    pub fn with_distance_data(mut self, tile_coord: [f64; 2], data: FeatureDistanceData) -> Self {
        self.feature_tile_coord = Some(tile_coord);
        self.feature_distance_data = Some(data);
        self
    }

    pub fn id(&self) -> Value {
        self.feature
            .and_then(|f| f.id.clone())
            .unwrap_or(Value::Null)
    }

    pub fn geometry_type(&self) -> Option<&'static str> {
        self.feature.map(|f| f.geometry_type.as_str())
    }

    pub fn geometry(&self) -> Option<&'a [Vec<TilePoint>]> {
        self.feature.map(|f| f.geometry.as_slice())
    }

    pub fn properties(&self) -> Option<&'a ValueMap> {
        self.feature.map(|f| &f.properties)
    }

    pub fn canonical_id(&self) -> Option<CanonicalTileId> {
        self.canonical
    }

    /// Signed distance of the feature along the camera bearing.
    pub fn distance_from_center(&self) -> f64 {
        match (self.feature_tile_coord, self.feature_distance_data) {
            (Some([x, y]), Some(data)) => {
                let dx = x * data.scale - data.center[0];
                let dy = y * data.scale - data.center[1];
                data.bearing[0] * dx + data.bearing[1] * dy
            }
            _ => 0.0,
        }
    }

    pub fn is_image_available(&self, name: &str) -> bool {
        self.available_images.iter().any(|img| img == name)
    }

    /// CSS color parsing memoized for the lifetime of this context.
    pub fn parse_color(&self, input: &str) -> Option<Color> {
        if let Some(cached) = self.parse_color_cache.borrow().get(input) {
            return *cached;
        }
        let parsed = Color::parse(input);
        self.parse_color_cache
            .borrow_mut()
            .insert(input.to_string(), parsed);
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_accessors() {
        let feature = Feature::new(GeometryType::Polygon)
            .with_id(7.0)
            .with_property("name", "park");
        let ctx = EvaluationContext::new(GlobalProperties::new(3.0)).with_feature(&feature);
        assert_eq!(ctx.id(), Value::Number(7.0));
        assert_eq!(ctx.geometry_type(), Some("Polygon"));
        assert_eq!(
            ctx.properties().and_then(|p| p.get("name")),
            Some(&Value::from("park"))
        );
    }

    #[test]
    fn test_empty_context() {
        let ctx = EvaluationContext::default();
        assert_eq!(ctx.id(), Value::Null);
        assert_eq!(ctx.geometry_type(), None);
        assert_eq!(ctx.distance_from_center(), 0.0);
    }

    #[test]
    fn test_distance_from_center() {
        let data = FeatureDistanceData {
            bearing: [0.0, 1.0],
            center: [10.0, 10.0],
            scale: 2.0,
        };
        let ctx = EvaluationContext::default().with_distance_data([5.0, 8.0], data);
        assert!((ctx.distance_from_center() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_color_cache() {
        let ctx = EvaluationContext::default();
        assert_eq!(ctx.parse_color("red"), Some(Color::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(ctx.parse_color("red"), Some(Color::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(ctx.parse_color("nope"), None);
    }
}
