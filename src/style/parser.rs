//! Mapbox GL style document parser.
//!
//! Loading a style validates it: every layout and paint value and every
//! filter is compiled once, and all failures are reported together.

use std::fs;
use std::path::Path;

use crate::error::{StyleError, StyleResult};
use crate::style::expression::normalize_property_value;
use crate::style::filter::create_filter;
use crate::style::reference::reference;
use crate::style::types::{LayerType, PropertyGroup, StyleLayer, StyleSpec};

/// Parse and validate a style JSON file.
pub fn parse_style(path: &Path) -> StyleResult<StyleSpec> {
    let content = fs::read_to_string(path)?;
    parse_style_str(&content)
}

/// Parse and validate a style from a JSON string.
pub fn parse_style_str(json: &str) -> StyleResult<StyleSpec> {
    let spec: StyleSpec = serde_json::from_str(json)?;
    validate_style(&spec)?;
    log::info!(
        "Loaded style \"{}\" with {} layers",
        spec.name,
        spec.layers.len()
    );
    Ok(spec)
}

/// Check the version and compile every property value and filter.
pub fn validate_style(spec: &StyleSpec) -> StyleResult<()> {
    if spec.version != 8 {
        return Err(StyleError::invalid(format!(
            "Unsupported style version: {} (expected 8)",
            spec.version
        )));
    }

    let mut problems = Vec::new();
    for layer in &spec.layers {
        validate_layer(layer, &mut problems)?;
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(StyleError::Validation(problems))
    }
}

fn validate_layer(layer: &StyleLayer, problems: &mut Vec<String>) -> StyleResult<()> {
    if layer.layer_type == LayerType::Unknown {
        log::warn!("Layer \"{}\" has an unsupported type; skipping validation", layer.id);
        return Ok(());
    }

    let table = reference()?;
    for (group, values) in [
        (PropertyGroup::Layout, &layer.layout),
        (PropertyGroup::Paint, &layer.paint),
    ] {
        for (key, value) in values {
            // Transition objects are not property values.
            if key.ends_with("-transition") {
                continue;
            }
            let Some(spec) = table.property(group, layer.layer_type, key) else {
                problems.push(format!(
                    "layers.{}.{}.{}: unknown property",
                    layer.id,
                    group.as_str(),
                    key
                ));
                continue;
            };
            if let Err(errors) = normalize_property_value(value, spec) {
                problems.extend(errors.iter().map(|e| {
                    format!("layers.{}.{}.{}{}", layer.id, group.as_str(), key, keyed(e.key.as_str(), &e.message))
                }));
            }
        }
    }

    if let Some(filter) = &layer.filter {
        match create_filter(Some(filter)) {
            Ok(_) => {}
            Err(StyleError::Expression(errors)) => {
                problems.extend(errors.iter().map(|e| {
                    format!("layers.{}.filter{}", layer.id, keyed(e.key.as_str(), &e.message))
                }));
            }
            Err(other) => problems.push(format!("layers.{}.filter: {}", layer.id, other)),
        }
    }
    Ok(())
}

fn keyed(key: &str, message: &str) -> String {
    if key.is_empty() {
        format!(": {}", message)
    } else {
        format!("{}: {}", key, message)
    }
}

impl StyleSpec {
    /// Get all layers of a specific type.
    pub fn layers_by_type(&self, layer_type: LayerType) -> Vec<&StyleLayer> {
        self.layers
            .iter()
            .filter(|l| l.layer_type == layer_type)
            .collect()
    }

    /// Find a layer by ID.
    pub fn layer_by_id(&self, id: &str) -> Option<&StyleLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Like [`StyleSpec::layer_by_id`], failing with [`StyleError::UnknownLayer`].
    pub fn require_layer(&self, id: &str) -> StyleResult<&StyleLayer> {
        self.layer_by_id(id)
            .ok_or_else(|| StyleError::UnknownLayer(id.to_string()))
    }

    /// Get layers for a specific source-layer name.
    pub fn layers_for_source_layer(&self, source_layer: &str) -> Vec<&StyleLayer> {
        self.layers
            .iter()
            .filter(|l| l.source_layer.as_deref() == Some(source_layer))
            .collect()
    }

    /// Layers drawn at `zoom`: visible and inside their zoom range.
    pub fn active_layers(&self, zoom: f64) -> impl Iterator<Item = &StyleLayer> {
        self.layers
            .iter()
            .filter(move |l| l.is_visible() && l.in_zoom_range(zoom))
    }
}
