//! Mapbox GL style expression engine.
//!
//! Parses style documents, compiles layout and paint values (expressions,
//! legacy functions, token strings) and layer filters into typed
//! evaluators, and resolves them per feature and camera state.
//!
//! ```no_run
//! use forge3d_style::style::{parse_style_str, EvaluationContext, GlobalProperties, PropertyGroup, StyleCache};
//!
//! # fn main() -> anyhow::Result<()> {
//! let spec = parse_style_str(r#"{"version": 8, "layers": [
//!     {"id": "water", "type": "fill", "paint": {"fill-opacity": {"stops": [[0, 0], [10, 1]]}}}
//! ]}"#)?;
//! let mut cache = StyleCache::new();
//! let ctx = EvaluationContext::new(GlobalProperties::new(5.0));
//! let opacity = cache.get_value(spec.require_layer("water")?, PropertyGroup::Paint, "fill-opacity", &ctx)?;
//! assert_eq!(opacity.as_f64(), Some(0.5));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod style;

pub use error::{StyleError, StyleResult};
pub use style::expression::{Color, Expression, ParsingError, Type, Value};
