// src/cli/eval_args.rs
// style_eval CLI configuration and argument parsing

use std::path::PathBuf;

use serde_json::Value as JsonValue;

use super::eval_parsing::{clamp_with_warning, flag_value, parse_f64, parse_json, parse_json_object, parse_tile};
use super::eval_types::{EvalCliError, PropertyTarget};
use crate::style::expression::{CanonicalTileId, GeometryType};

/// Parsed style_eval flags.
#[derive(Clone, Debug, Default)]
pub struct EvalCliConfig {
    pub style: Option<PathBuf>,
    pub layer: Option<String>,
    pub list_layers: bool,
    pub zoom: f64,
    pub pitch: f64,
    pub geometry_type: GeometryType,
    pub feature_id: Option<JsonValue>,
    pub properties: Option<JsonValue>,
    pub state: Option<JsonValue>,
    pub images: Vec<String>,
    pub tile: Option<CanonicalTileId>,
    pub targets: Vec<PropertyTarget>,
}

impl EvalCliConfig {
    /// Parse flags from a flat argument list (excluding argv[0]).
    pub fn parse(args: &[String]) -> Result<Self, EvalCliError> {
        let mut cfg = EvalCliConfig::default();
        let mut i = 0usize;
        while i < args.len() {
            match args[i].as_str() {
                "--style" => {
                    cfg.style = Some(PathBuf::from(flag_value(args, i, "--style")?));
                    i += 2;
                }
                "--layer" => {
                    cfg.layer = Some(flag_value(args, i, "--layer")?.to_string());
                    i += 2;
                }
                "--list" => {
                    cfg.list_layers = true;
                    i += 1;
                }
                "--zoom" => {
                    let v = parse_f64(args, i, "--zoom")?;
                    cfg.zoom = clamp_with_warning(v, 0.0, 24.0, "--zoom");
                    i += 2;
                }
                "--pitch" => {
                    let v = parse_f64(args, i, "--pitch")?;
                    cfg.pitch = clamp_with_warning(v, 0.0, 85.0, "--pitch");
                    i += 2;
                }
                "--geometry" => {
                    let value = flag_value(args, i, "--geometry")?;
                    cfg.geometry_type = match GeometryType::from_name(value) {
                        GeometryType::Unknown => {
                            return Err(EvalCliError::new(format!(
                                "unknown --geometry value '{value}'; expected one of Point, LineString, Polygon"
                            )))
                        }
                        ty => ty,
                    };
                    i += 2;
                }
                "--id" => {
                    cfg.feature_id = Some(parse_json(args, i, "--id")?);
                    i += 2;
                }
                "--feature" => {
                    cfg.properties = Some(parse_json_object(args, i, "--feature")?);
                    i += 2;
                }
                "--state" => {
                    cfg.state = Some(parse_json_object(args, i, "--state")?);
                    i += 2;
                }
                "--image" => {
                    cfg.images.push(flag_value(args, i, "--image")?.to_string());
                    i += 2;
                }
                "--tile" => {
                    cfg.tile = Some(parse_tile(flag_value(args, i, "--tile")?)?);
                    i += 2;
                }
                "--property" => {
                    let value = flag_value(args, i, "--property")?;
                    let target = PropertyTarget::from_str(value).ok_or_else(|| {
                        EvalCliError::new(format!(
                            "invalid --property value '{value}'; expected paint:<key> or layout:<key>"
                        ))
                    })?;
                    cfg.targets.push(target);
                    i += 2;
                }
                other => {
                    return Err(EvalCliError::new(format!("unknown flag '{other}'")));
                }
            }
        }

        if cfg.style.is_none() {
            return Err(EvalCliError::new("--style is required"));
        }
        if cfg.layer.is_none() && !cfg.list_layers {
            return Err(EvalCliError::new("either --layer or --list is required"));
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::types::PropertyGroup;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_full_invocation() {
        let cfg = EvalCliConfig::parse(&args(&[
            "--style", "style.json",
            "--layer", "roads",
            "--zoom", "12.5",
            "--geometry", "LineString",
            "--feature", r#"{"class": "motorway"}"#,
            "--id", "42",
            "--image", "marker",
            "--tile", "3/2/5",
            "--property", "paint:line-width",
            "--property", "layout:line-cap",
        ]))
        .unwrap();
        assert_eq!(cfg.layer.as_deref(), Some("roads"));
        assert_eq!(cfg.zoom, 12.5);
        assert_eq!(cfg.geometry_type, GeometryType::LineString);
        assert_eq!(cfg.feature_id, Some(serde_json::json!(42)));
        assert_eq!(cfg.images, vec!["marker"]);
        assert_eq!(cfg.tile, Some(CanonicalTileId::new(3, 2, 5)));
        assert_eq!(cfg.targets.len(), 2);
        assert_eq!(cfg.targets[1].group, PropertyGroup::Layout);
        assert_eq!(cfg.targets[1].label(), "layout.line-cap");
    }

    #[test]
    fn zoom_is_clamped() {
        let cfg = EvalCliConfig::parse(&args(&["--style", "s.json", "--list", "--zoom", "30"])).unwrap();
        assert_eq!(cfg.zoom, 24.0);
        assert!(cfg.list_layers);
    }

    #[test]
    fn reject_bad_values() {
        let err = EvalCliConfig::parse(&args(&["--style", "s.json", "--layer", "a", "--tile", "2/4/0"])).unwrap_err();
        assert!(err.to_string().contains("outside the zoom 2 grid"));

        let err = EvalCliConfig::parse(&args(&["--style", "s.json", "--layer", "a", "--feature", "[1]"])).unwrap_err();
        assert_eq!(err.to_string(), "--feature expects a JSON object");

        let err = EvalCliConfig::parse(&args(&["--style", "s.json", "--layer", "a", "--property", "style:x"])).unwrap_err();
        assert!(err.to_string().contains("invalid --property value"));

        let err = EvalCliConfig::parse(&args(&["--layer", "a"])).unwrap_err();
        assert_eq!(err.to_string(), "--style is required");

        let err = EvalCliConfig::parse(&args(&["--style", "s.json", "--zoom"])).unwrap_err();
        assert_eq!(err.to_string(), "missing value for --zoom");
    }

    #[test]
    fn bare_property_key_is_paint() {
        let target = PropertyTarget::from_str("fill-color").unwrap();
        assert_eq!(target.group, PropertyGroup::Paint);
        assert_eq!(target.key, "fill-color");
    }
}
