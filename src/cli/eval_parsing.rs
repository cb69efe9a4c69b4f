// src/cli/eval_parsing.rs
// style_eval CLI value parsing helpers

use serde_json::Value as JsonValue;

use super::eval_types::EvalCliError;
use crate::style::expression::CanonicalTileId;

/// Raw value following the flag at `idx`.
pub fn flag_value<'a>(args: &'a [String], idx: usize, flag: &str) -> Result<&'a str, EvalCliError> {
    args.get(idx + 1)
        .map(String::as_str)
        .ok_or_else(|| EvalCliError::new(format!("missing value for {flag}")))
}

/// Parse a float argument value.
pub fn parse_f64(args: &[String], idx: usize, flag: &str) -> Result<f64, EvalCliError> {
    let raw = flag_value(args, idx, flag)?;
    raw.parse::<f64>()
        .map_err(|_| EvalCliError::new(format!("invalid float value '{raw}' for {flag}")))
}

/// Parse a JSON argument value.
pub fn parse_json(args: &[String], idx: usize, flag: &str) -> Result<JsonValue, EvalCliError> {
    let raw = flag_value(args, idx, flag)?;
    serde_json::from_str(raw)
        .map_err(|e| EvalCliError::new(format!("invalid JSON for {flag}: {e}")))
}

/// Parse a JSON object argument value.
pub fn parse_json_object(args: &[String], idx: usize, flag: &str) -> Result<JsonValue, EvalCliError> {
    let value = parse_json(args, idx, flag)?;
    if !value.is_object() {
        return Err(EvalCliError::new(format!("{flag} expects a JSON object")));
    }
    Ok(value)
}

/// Parse a `z/x/y` tile id.
pub fn parse_tile(value: &str) -> Result<CanonicalTileId, EvalCliError> {
    let invalid = || EvalCliError::new(format!("invalid --tile value '{value}'; expected z/x/y"));
    let mut parts = value.split('/');
    let (Some(z), Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    let z = z.parse::<u8>().map_err(|_| invalid())?;
    let x = x.parse::<u32>().map_err(|_| invalid())?;
    let y = y.parse::<u32>().map_err(|_| invalid())?;
    if z > 31 || x >= 1u32 << z || y >= 1u32 << z {
        return Err(EvalCliError::new(format!(
            "tile {value} is outside the zoom {z} grid"
        )));
    }
    Ok(CanonicalTileId::new(z, x, y))
}

/// Warn and clamp a value into `[min, max]`.
pub fn clamp_with_warning(value: f64, min: f64, max: f64, flag: &str) -> f64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("clamping {} from {} to {}", flag, value, clamped);
    }
    clamped
}
