//! Style property reference: expected type, default and expression support
//! of every layout and paint property, plus the filter pseudo-property.
//!
//! The table is embedded JSON, deserialized once on first use.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{StyleError, StyleResult};
use crate::style::expression::color::Color;
use crate::style::expression::types::Type;
use crate::style::expression::value::Value;
use crate::style::types::{LayerType, PropertyGroup};

static REFERENCE: OnceCell<StyleReference> = OnceCell::new();

/// Which inputs a property's expressions may depend on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpressionSupport {
    #[serde(default)]
    pub interpolated: bool,
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// Specification of one style property.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertySpec {
    /// `number`, `color`, `enum`, `array`, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub default: Option<JsonValue>,
    /// Item type of `array` properties.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub length: Option<usize>,
    /// Enum domain, as an object keyed by value or a plain list.
    #[serde(default)]
    pub values: Option<JsonValue>,
    #[serde(default)]
    pub expression: Option<ExpressionSupport>,
    #[serde(rename = "property-type", default)]
    pub property_type: Option<String>,
    /// String values may contain `{name}` tokens.
    #[serde(default)]
    pub tokens: bool,
    #[serde(default)]
    pub transition: bool,
}

impl PropertySpec {
    /// Type expressions for this property must produce, if it has one.
    pub fn expected_type(&self) -> Option<Type> {
        match self.kind.as_str() {
            "array" => {
                let item = self
                    .value
                    .as_deref()
                    .and_then(scalar_type)
                    .unwrap_or(Type::Value);
                Some(Type::array(item, self.length))
            }
            other => scalar_type(other),
        }
    }

    /// Value substituted for null, NaN and failed evaluations.
    pub fn default_value(&self) -> Value {
        match (&self.default, self.kind.as_str()) {
            (Some(JsonValue::String(s)), "color") => {
                Color::parse(s).map(Value::Color).unwrap_or(Value::Null)
            }
            (Some(JsonValue::Array(_)) | Some(JsonValue::Object(_)), "color") => {
                Value::Color(Color::TRANSPARENT)
            }
            (Some(default), _) => Value::from_json(default),
            (None, _) => Value::Null,
        }
    }

    /// Allowed values of an `enum` property.
    pub fn enum_values(&self) -> Option<Vec<String>> {
        if self.kind != "enum" {
            return None;
        }
        match self.values.as_ref()? {
            JsonValue::Object(map) => Some(map.keys().cloned().collect()),
            JsonValue::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn supports_property_expression(&self) -> bool {
        matches!(
            self.property_type.as_deref(),
            Some("data-driven") | Some("cross-faded-data-driven")
        )
    }

    pub fn supports_zoom_expression(&self) -> bool {
        self.expression
            .as_ref()
            .map(|e| e.parameters.iter().any(|p| p == "zoom"))
            .unwrap_or(false)
    }

    pub fn supports_interpolation(&self) -> bool {
        self.expression
            .as_ref()
            .map(|e| e.interpolated)
            .unwrap_or(false)
    }
}

fn scalar_type(name: &str) -> Option<Type> {
    Some(match name {
        "color" => Type::Color,
        "string" | "enum" => Type::String,
        "number" => Type::Number,
        "boolean" => Type::Boolean,
        "formatted" => Type::Formatted,
        "resolvedImage" => Type::ResolvedImage,
        _ => return None,
    })
}

/// The whole property table.
#[derive(Debug, Deserialize)]
pub struct StyleReference {
    filter: PropertySpec,
    #[serde(flatten)]
    groups: HashMap<String, BTreeMap<String, PropertySpec>>,
}

impl StyleReference {
    fn group(&self, group: PropertyGroup, layer_type: LayerType) -> Option<&BTreeMap<String, PropertySpec>> {
        self.groups
            .get(&format!("{}_{}", group.as_str(), layer_type.as_str()))
    }

    pub fn property(&self, group: PropertyGroup, layer_type: LayerType, key: &str) -> Option<&PropertySpec> {
        self.group(group, layer_type)?.get(key)
    }

    /// All properties of one group, sorted by name.
    pub fn properties(
        &self,
        group: PropertyGroup,
        layer_type: LayerType,
    ) -> impl Iterator<Item = (&str, &PropertySpec)> {
        self.group(group, layer_type)
            .into_iter()
            .flat_map(|props| props.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Specification filters are compiled against.
    pub fn filter(&self) -> &PropertySpec {
        &self.filter
    }
}

/// The embedded property table.
pub fn reference() -> StyleResult<&'static StyleReference> {
    REFERENCE
        .get_or_try_init(|| serde_json::from_str(include_str!("reference.json")))
        .map_err(StyleError::from)
}

/// Look up one property, failing with [`StyleError::UnknownProperty`].
pub fn property_spec(
    group: PropertyGroup,
    layer_type: LayerType,
    key: &str,
) -> StyleResult<&'static PropertySpec> {
    reference()?
        .property(group, layer_type, key)
        .ok_or_else(|| StyleError::UnknownProperty {
            group: group.as_str().to_string(),
            layer_type: layer_type.as_str().to_string(),
            key: key.to_string(),
        })
}

/// Specification used for layer filters.
pub fn filter_spec() -> StyleResult<&'static PropertySpec> {
    Ok(reference()?.filter())
}
