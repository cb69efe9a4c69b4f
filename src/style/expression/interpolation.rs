//! Interpolation curves and stop lookup shared by `step`, `interpolate`
//! and compiled zoom curves.

use serde_json::{json, Value as JsonValue};

use super::color::Color;
use super::evaluation::EvalError;
use super::value::number_to_json;

/// Curve used to turn an input between two stops into a progress ratio.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationType {
    Linear,
    Exponential { base: f64 },
    CubicBezier { control_points: [f64; 4] },
}

impl InterpolationType {
    /// Progress ratio `t` in 0..1 of `input` between `lower` and `upper`.
    pub fn factor(&self, input: f64, lower: f64, upper: f64) -> f64 {
        match self {
            InterpolationType::Linear => exponential_interpolation(input, 1.0, lower, upper),
            InterpolationType::Exponential { base } => {
                exponential_interpolation(input, *base, lower, upper)
            }
            InterpolationType::CubicBezier { control_points } => {
                let [x1, y1, x2, y2] = *control_points;
                let t = exponential_interpolation(input, 1.0, lower, upper);
                UnitBezier::new(x1, y1, x2, y2).solve(t, 1e-6)
            }
        }
    }

    pub fn serialize(&self) -> JsonValue {
        match self {
            InterpolationType::Linear => json!(["linear"]),
            InterpolationType::Exponential { base } if *base == 1.0 => json!(["linear"]),
            InterpolationType::Exponential { base } => {
                json!(["exponential", number_to_json(*base)])
            }
            InterpolationType::CubicBezier { control_points } => {
                let mut out = vec![json!("cubic-bezier")];
                out.extend(control_points.iter().map(|p| number_to_json(*p)));
                JsonValue::Array(out)
            }
        }
    }
}

fn exponential_interpolation(input: f64, base: f64, lower: f64, upper: f64) -> f64 {
    let difference = upper - lower;
    let progress = input - lower;
    if difference == 0.0 {
        0.0
    } else if base == 1.0 {
        progress / difference
    } else {
        (base.powf(progress) - 1.0) / (base.powf(difference) - 1.0)
    }
}

/// Cubic bezier from (0,0) to (1,1) with two control points.
#[derive(Debug, Clone, Copy)]
pub struct UnitBezier {
    ax: f64,
    bx: f64,
    cx: f64,
    ay: f64,
    by: f64,
    cy: f64,
}

impl UnitBezier {
    pub fn new(p1x: f64, p1y: f64, p2x: f64, p2y: f64) -> Self {
        let cx = 3.0 * p1x;
        let bx = 3.0 * (p2x - p1x) - cx;
        let cy = 3.0 * p1y;
        let by = 3.0 * (p2y - p1y) - cy;
        Self {
            ax: 1.0 - cx - bx,
            bx,
            cx,
            ay: 1.0 - cy - by,
            by,
            cy,
        }
    }

    fn sample_curve_x(&self, t: f64) -> f64 {
        ((self.ax * t + self.bx) * t + self.cx) * t
    }

    fn sample_curve_y(&self, t: f64) -> f64 {
        ((self.ay * t + self.by) * t + self.cy) * t
    }

    fn sample_curve_derivative_x(&self, t: f64) -> f64 {
        (3.0 * self.ax * t + 2.0 * self.bx) * t + self.cx
    }

    /// Parametric `t` for a given `x`: up to 8 Newton steps, then bisection.
    pub fn solve_curve_x(&self, x: f64, epsilon: f64) -> f64 {
        if x < 0.0 {
            return 0.0;
        }
        if x > 1.0 {
            return 1.0;
        }

        let mut t = x;
        for _ in 0..8 {
            let x2 = self.sample_curve_x(t) - x;
            if x2.abs() < epsilon {
                return t;
            }
            let d2 = self.sample_curve_derivative_x(t);
            if d2.abs() < 1e-6 {
                break;
            }
            t -= x2 / d2;
        }

        let (mut t0, mut t1) = (0.0, 1.0);
        t = x;
        for _ in 0..20 {
            let x2 = self.sample_curve_x(t);
            if (x2 - x).abs() < epsilon {
                break;
            }
            if x > x2 {
                t0 = t;
            } else {
                t1 = t;
            }
            t = (t1 - t0) * 0.5 + t0;
        }
        t
    }

    pub fn solve(&self, x: f64, epsilon: f64) -> f64 {
        self.sample_curve_y(self.solve_curve_x(x, epsilon))
    }
}

pub fn interpolate_number(from: f64, to: f64, t: f64) -> f64 {
    from * (1.0 - t) + to * t
}

/// Interpolates premultiplied channels.
pub fn interpolate_color(from: &Color, to: &Color, t: f64) -> Color {
    Color::new(
        interpolate_number(from.r, to.r, t),
        interpolate_number(from.g, to.g, t),
        interpolate_number(from.b, to.b, t),
        interpolate_number(from.a, to.a, t),
    )
}

pub fn interpolate_array(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter()
        .zip(to.iter())
        .map(|(a, b)| interpolate_number(*a, *b, t))
        .collect()
}

/// Index of the greatest stop `<= input` (binary search over ascending stops).
pub fn find_stop_less_than_or_equal_to(stops: &[f64], input: f64) -> Result<usize, EvalError> {
    if stops.is_empty() {
        return Ok(0);
    }
    let last_index = stops.len() - 1;
    let mut lower: isize = 0;
    let mut upper: isize = last_index as isize;

    while lower <= upper {
        let current = ((lower + upper) / 2) as usize;
        let value = stops[current];
        if value <= input {
            if current == last_index || input < stops[current + 1] {
                return Ok(current);
            }
            lower = current as isize + 1;
        } else if value > input {
            upper = current as isize - 1;
        } else {
            return Err(EvalError::new("Input is not a number."));
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_and_exponential_factor() {
        let linear = InterpolationType::Linear;
        assert!((linear.factor(15.0, 10.0, 20.0) - 0.5).abs() < 1e-12);
        let exp = InterpolationType::Exponential { base: 2.0 };
        assert!((exp.factor(1.0, 0.0, 2.0) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(linear.factor(5.0, 3.0, 3.0), 0.0);
    }

    #[test]
    fn test_cubic_bezier_is_monotone_and_anchored() {
        let ease = InterpolationType::CubicBezier {
            control_points: [0.42, 0.0, 0.58, 1.0],
        };
        assert!(ease.factor(0.0, 0.0, 1.0).abs() < 1e-6);
        assert!((ease.factor(1.0, 0.0, 1.0) - 1.0).abs() < 1e-6);
        assert!((ease.factor(0.5, 0.0, 1.0) - 0.5).abs() < 1e-4);
        let mut prev = 0.0;
        for i in 1..=10 {
            let t = ease.factor(i as f64 / 10.0, 0.0, 1.0);
            assert!(t >= prev);
            prev = t;
        }
    }

    #[test]
    fn test_bezier_is_deterministic() {
        let b = UnitBezier::new(0.1, 0.7, 0.9, 0.2);
        assert_eq!(b.solve(0.37, 1e-6), b.solve(0.37, 1e-6));
    }

    #[test]
    fn test_find_stop() {
        let stops = [0.0, 10.0, 20.0, 30.0];
        assert_eq!(find_stop_less_than_or_equal_to(&stops, 15.0).unwrap(), 1);
        assert_eq!(find_stop_less_than_or_equal_to(&stops, 20.0).unwrap(), 2);
        assert_eq!(find_stop_less_than_or_equal_to(&stops, 35.0).unwrap(), 3);
        assert!(find_stop_less_than_or_equal_to(&stops, f64::NAN).is_err());
    }

    #[test]
    fn test_serialize_interpolation() {
        assert_eq!(
            InterpolationType::Exponential { base: 1.0 }.serialize(),
            json!(["linear"])
        );
        assert_eq!(
            InterpolationType::Exponential { base: 1.5 }.serialize(),
            json!(["exponential", 1.5])
        );
    }
}
