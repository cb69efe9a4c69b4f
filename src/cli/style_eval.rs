// src/cli/style_eval.rs
// Evaluate one style layer for a synthetic feature and camera

use std::env;
use std::io::Write;

use anyhow::Context;

use super::eval_args::EvalCliConfig;
use super::eval_types::PropertyTarget;
use crate::style::cache::StyleCache;
use crate::style::expression::{EvaluationContext, Feature, FeatureState, GlobalProperties, Value};
use crate::style::parser::parse_style;
use crate::style::types::{PropertyGroup, StyleLayer};

/// Parse `std::env::args` and print the evaluation to stdout.
pub fn run_style_eval_cli() -> anyhow::Result<()> {
    let all_args: Vec<String> = env::args().skip(1).collect();
    let cfg = EvalCliConfig::parse(&all_args)?;
    let stdout = std::io::stdout();
    run(&cfg, &mut stdout.lock())
}

/// Every layout and paint property the layer sets, layout first.
fn layer_targets(layer: &StyleLayer) -> Vec<PropertyTarget> {
    let layout = layer.layout.keys().map(|k| (PropertyGroup::Layout, k));
    let paint = layer.paint.keys().map(|k| (PropertyGroup::Paint, k));
    layout
        .chain(paint)
        .filter(|(_, key)| !key.ends_with("-transition"))
        .map(|(group, key)| PropertyTarget {
            group,
            key: key.clone(),
        })
        .collect()
}

/// Run a parsed invocation, writing one line per result to `out`.
pub fn run(cfg: &EvalCliConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let path = cfg.style.as_ref().context("--style is required")?;
    let spec = parse_style(path).with_context(|| format!("loading {}", path.display()))?;

    if cfg.list_layers {
        for layer in spec.active_layers(cfg.zoom) {
            writeln!(out, "{}\t{}", layer.id, layer.layer_type.as_str())?;
        }
        return Ok(());
    }

    let layer_id = cfg.layer.as_deref().context("--layer is required")?;
    let layer = spec.require_layer(layer_id)?;

    let mut feature = Feature::new(cfg.geometry_type);
    if let Some(properties) = &cfg.properties {
        feature = feature.with_properties_json(properties);
    }
    if let Some(id) = &cfg.feature_id {
        feature = feature.with_id(Value::from_json(id));
    }
    let state: Option<FeatureState> = match cfg.state.as_ref().map(Value::from_json) {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    };

    let globals = GlobalProperties::new(cfg.zoom).with_pitch(cfg.pitch);
    let mut ctx = EvaluationContext::new(globals)
        .with_feature(&feature)
        .with_available_images(&cfg.images);
    if let Some(state) = &state {
        ctx = ctx.with_feature_state(state);
    }
    if let Some(tile) = cfg.tile {
        ctx = ctx.with_canonical(tile);
    }

    if !layer.in_zoom_range(cfg.zoom) {
        log::warn!("layer {} is not drawn at zoom {}", layer.id, cfg.zoom);
    }

    let mut cache = StyleCache::new();
    let passes = cache.evaluate_filter(&layer.id, layer.filter.as_ref(), &ctx)?;
    writeln!(out, "filter = {}", passes)?;

    let targets = if cfg.targets.is_empty() {
        layer_targets(layer)
    } else {
        cfg.targets.clone()
    };
    for target in &targets {
        let kind = cache.property(layer, target.group, &target.key)?.kind();
        let value = cache.get_value(layer, target.group, &target.key, &ctx)?;
        writeln!(out, "{} = {} ({:?})", target.label(), value, kind)?;
    }
    Ok(())
}
