//! Dependence analysis over parsed expressions.

use super::definitions::Expression;

/// Camera and render-pass builtins that make an expression non-constant.
pub const GLOBAL_PROPERTIES: &[&str] = &[
    "zoom",
    "heatmap-density",
    "line-progress",
    "accumulated",
    "is-supported-script",
    "pitch",
    "distance-from-center",
];

/// True when evaluating `expr` reads nothing from the feature.
pub fn is_feature_constant(expr: &Expression) -> bool {
    match expr {
        Expression::Compound(c) => {
            let name = c.name();
            if (name == "get" || name == "has") && c.args().len() == 1 {
                return false;
            }
            if matches!(name, "feature-state" | "properties" | "geometry-type" | "id")
                || name.starts_with("filter-")
            {
                return false;
            }
        }
        Expression::Within(_) => return false,
        _ => {}
    }

    let mut result = true;
    expr.each_child(&mut |child| {
        if result && !is_feature_constant(child) {
            result = false;
        }
    });
    result
}

/// True when evaluating `expr` never reads feature state.
pub fn is_state_constant(expr: &Expression) -> bool {
    if let Expression::Compound(c) = expr {
        if c.name() == "feature-state" {
            return false;
        }
    }
    let mut result = true;
    expr.each_child(&mut |child| {
        if result && !is_state_constant(child) {
            result = false;
        }
    });
    result
}

/// True when `expr` calls none of the named global-property builtins.
pub fn is_global_property_constant(expr: &Expression, properties: &[&str]) -> bool {
    if let Expression::Compound(c) = expr {
        if properties.contains(&c.name()) {
            return false;
        }
    }
    let mut result = true;
    expr.each_child(&mut |child| {
        if result && !is_global_property_constant(child, properties) {
            result = false;
        }
    });
    result
}

/// True when `expr` can be folded into a literal at parse time.
///
/// Children must already be literals (type annotations are looked
/// through). `error`, collators and `within` never fold.
pub fn is_constant(expr: &Expression) -> bool {
    match expr {
        Expression::Var(v) => return is_constant(v.bound()),
        Expression::Compound(c) if c.name() == "error" => return false,
        Expression::Collator(_) | Expression::Within(_) => return false,
        _ => {}
    }

    let is_annotation = matches!(expr, Expression::Assertion(_) | Expression::Coercion(_));
    let mut children_constant = true;
    expr.each_child(&mut |child| {
        children_constant = children_constant
            && if is_annotation {
                is_constant(child)
            } else {
                matches!(child, Expression::Literal(_))
            };
    });
    if !children_constant {
        return false;
    }

    is_feature_constant(expr) && is_global_property_constant(expr, GLOBAL_PROPERTIES)
}
