//! Mapbox GL style support.
//!
//! - [`expression`]: typed expression language (parse, fold, evaluate)
//! - [`function`]: legacy `stops` functions rewritten as expressions
//! - [`filter`]: legacy and expression filters with a static/dynamic split
//! - [`reference`]: per-property types, defaults and expression support
//! - [`cache`]: compiled values memoized per layer
//! - [`converters`]: flat render attributes for fill, line, circle and symbol layers
//!
//! See <https://docs.mapbox.com/mapbox-gl-js/style-spec/> for the format.

pub mod cache;
pub mod converters;
pub mod expression;
pub mod filter;
pub mod function;
pub mod parser;
pub mod reference;
pub mod types;

pub use cache::StyleCache;
pub use converters::{
    background_color, circle_attributes, fill_attributes, line_attributes, symbol_attributes,
    CircleAttributes, FillAttributes, LineAttributes, SymbolAttributes,
};
pub use expression::{
    create_expression, create_property_expression, normalize_property_value, EvaluationContext,
    Feature, GlobalProperties, PropertyExpressionKind, StyleExpression, StylePropertyExpression,
    Value,
};
pub use filter::{convert_filter, create_filter, FeatureFilter};
pub use function::{convert_function, is_function};
pub use parser::{parse_style, parse_style_str, validate_style};
pub use reference::{property_spec, PropertySpec};
pub use types::{LayerType, PropertyGroup, StyleLayer, StyleSpec};
