//! Converters from evaluated style properties to flat per-feature render
//! attributes.
//!
//! Every attribute is resolved through a [`StyleCache`], so zoom curves,
//! data expressions and legacy functions all land here as plain numbers
//! and straight-alpha RGBA.

use crate::error::{StyleError, StyleResult};
use crate::style::cache::StyleCache;
use crate::style::expression::{EvaluationContext, Value};
use crate::style::types::{LayerType, PropertyGroup, StyleLayer};

/// Polygon fill attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct FillAttributes {
    pub color: [f32; 4],
    pub outline_color: Option<[f32; 4]>,
    pub antialias: bool,
    pub translate: [f32; 2],
    pub pattern: Option<String>,
}

/// Polyline attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct LineAttributes {
    pub color: [f32; 4],
    pub width: f32,
    pub gap_width: f32,
    pub offset: f32,
    pub blur: f32,
    pub cap: String,
    pub join: String,
    pub dasharray: Vec<f32>,
}

/// Point attributes of circle layers.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleAttributes {
    pub radius: f32,
    pub color: [f32; 4],
    pub blur: f32,
    pub stroke_width: f32,
    pub stroke_color: [f32; 4],
}

/// Text and icon attributes of symbol layers.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolAttributes {
    pub text: Option<String>,
    pub font: Vec<String>,
    pub size: f32,
    pub color: [f32; 4],
    pub halo_color: [f32; 4],
    pub halo_width: f32,
    /// Text offset in pixels.
    pub offset: [f32; 2],
    pub icon: Option<String>,
    pub icon_size: f32,
}

struct Resolver<'c, 'l, 'e, 'f> {
    cache: &'c mut StyleCache,
    layer: &'l StyleLayer,
    ctx: &'e EvaluationContext<'f>,
}

impl Resolver<'_, '_, '_, '_> {
    fn value(&mut self, group: PropertyGroup, key: &str) -> StyleResult<Value> {
        self.cache.get_value(self.layer, group, key, self.ctx)
    }

    fn paint(&mut self, key: &str) -> StyleResult<Value> {
        self.value(PropertyGroup::Paint, key)
    }

    fn layout(&mut self, key: &str) -> StyleResult<Value> {
        self.value(PropertyGroup::Layout, key)
    }

    fn number(&mut self, group: PropertyGroup, key: &str) -> StyleResult<f32> {
        Ok(self.value(group, key)?.as_f64().unwrap_or(0.0) as f32)
    }

    fn color(&mut self, key: &str) -> StyleResult<Option<[f32; 4]>> {
        Ok(self.paint(key)?.as_color().map(|c| c.to_rgba_f32()))
    }

    /// Color with the matching opacity property folded into alpha.
    fn color_with_opacity(&mut self, color_key: &str, opacity_key: &str) -> StyleResult<[f32; 4]> {
        let mut rgba = self.color(color_key)?.unwrap_or([0.0, 0.0, 0.0, 1.0]);
        rgba[3] *= self.number(PropertyGroup::Paint, opacity_key)?;
        Ok(rgba)
    }
}

fn numbers(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_f64()).map(|n| n as f32).collect())
        .unwrap_or_default()
}

fn pair(value: &Value) -> [f32; 2] {
    match numbers(value).as_slice() {
        [x, y, ..] => [*x, *y],
        _ => [0.0, 0.0],
    }
}

fn image_name(value: &Value) -> Option<String> {
    match value {
        Value::Image(image) => Some(image.name.clone()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn expect_type(layer: &StyleLayer, expected: LayerType) -> StyleResult<()> {
    if layer.layer_type != expected {
        return Err(StyleError::invalid(format!(
            "layer \"{}\" is a {} layer, not {}",
            layer.id,
            layer.layer_type.as_str(),
            expected.as_str()
        )));
    }
    Ok(())
}

/// Resolve the attributes of a fill layer.
pub fn fill_attributes(
    cache: &mut StyleCache,
    layer: &StyleLayer,
    ctx: &EvaluationContext,
) -> StyleResult<FillAttributes> {
    expect_type(layer, LayerType::Fill)?;
    let mut r = Resolver { cache, layer, ctx };
    let color = r.color_with_opacity("fill-color", "fill-opacity")?;
    let outline_color = r.color("fill-outline-color")?;
    Ok(FillAttributes {
        color,
        outline_color,
        antialias: r.paint("fill-antialias")?.as_bool().unwrap_or(true),
        translate: pair(&r.paint("fill-translate")?),
        pattern: image_name(&r.paint("fill-pattern")?),
    })
}

/// Resolve the attributes of a line layer.
pub fn line_attributes(
    cache: &mut StyleCache,
    layer: &StyleLayer,
    ctx: &EvaluationContext,
) -> StyleResult<LineAttributes> {
    expect_type(layer, LayerType::Line)?;
    let mut r = Resolver { cache, layer, ctx };
    Ok(LineAttributes {
        color: r.color_with_opacity("line-color", "line-opacity")?,
        width: r.number(PropertyGroup::Paint, "line-width")?,
        gap_width: r.number(PropertyGroup::Paint, "line-gap-width")?,
        offset: r.number(PropertyGroup::Paint, "line-offset")?,
        blur: r.number(PropertyGroup::Paint, "line-blur")?,
        cap: r.layout("line-cap")?.as_str().unwrap_or("butt").to_string(),
        join: r.layout("line-join")?.as_str().unwrap_or("miter").to_string(),
        dasharray: numbers(&r.paint("line-dasharray")?),
    })
}

/// Resolve the attributes of a circle layer.
pub fn circle_attributes(
    cache: &mut StyleCache,
    layer: &StyleLayer,
    ctx: &EvaluationContext,
) -> StyleResult<CircleAttributes> {
    expect_type(layer, LayerType::Circle)?;
    let mut r = Resolver { cache, layer, ctx };
    Ok(CircleAttributes {
        radius: r.number(PropertyGroup::Paint, "circle-radius")?,
        color: r.color_with_opacity("circle-color", "circle-opacity")?,
        blur: r.number(PropertyGroup::Paint, "circle-blur")?,
        stroke_width: r.number(PropertyGroup::Paint, "circle-stroke-width")?,
        stroke_color: r.color_with_opacity("circle-stroke-color", "circle-stroke-opacity")?,
    })
}

/// Resolve the attributes of a symbol layer.
pub fn symbol_attributes(
    cache: &mut StyleCache,
    layer: &StyleLayer,
    ctx: &EvaluationContext,
) -> StyleResult<SymbolAttributes> {
    expect_type(layer, LayerType::Symbol)?;
    let mut r = Resolver { cache, layer, ctx };

    let text = match r.layout("text-field")? {
        Value::Formatted(formatted) if !formatted.is_empty() => Some(formatted.to_string()),
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    };
    let font = match r.layout("text-font")? {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    let size = r.number(PropertyGroup::Layout, "text-size")?;
    // Offsets are in ems of the text size.
    let [dx, dy] = pair(&r.layout("text-offset")?);

    Ok(SymbolAttributes {
        text,
        font,
        size,
        color: r.color_with_opacity("text-color", "text-opacity")?,
        halo_color: r.color("text-halo-color")?.unwrap_or([0.0; 4]),
        halo_width: r.number(PropertyGroup::Paint, "text-halo-width")?,
        offset: [dx * size, dy * size],
        icon: image_name(&r.layout("icon-image")?),
        icon_size: r.number(PropertyGroup::Layout, "icon-size")?,
    })
}

/// Background color with `background-opacity` applied.
pub fn background_color(
    cache: &mut StyleCache,
    layer: &StyleLayer,
    ctx: &EvaluationContext,
) -> StyleResult<[f32; 4]> {
    expect_type(layer, LayerType::Background)?;
    Resolver { cache, layer, ctx }.color_with_opacity("background-color", "background-opacity")
}
