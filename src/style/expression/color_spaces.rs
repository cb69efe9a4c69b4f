//! CIE LAB and HCL conversions used by `interpolate-lab` / `interpolate-hcl`.

use super::color::Color;
use super::interpolation::interpolate_number;

// D65 reference white
const XN: f64 = 0.950470;
const YN: f64 = 1.0;
const ZN: f64 = 1.088830;
const T0: f64 = 4.0 / 29.0;
const T1: f64 = 6.0 / 29.0;
const T2: f64 = 3.0 * T1 * T1;
const T3: f64 = T1 * T1 * T1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabColor {
    pub l: f64,
    pub a: f64,
    pub b: f64,
    pub alpha: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HclColor {
    pub h: f64,
    pub c: f64,
    pub l: f64,
    pub alpha: f64,
}

fn xyz_to_lab(t: f64) -> f64 {
    if t > T3 {
        t.powf(1.0 / 3.0)
    } else {
        t / T2 + T0
    }
}

fn lab_to_xyz(t: f64) -> f64 {
    if t > T1 {
        t * t * t
    } else {
        T2 * (t - T0)
    }
}

fn xyz_to_rgb(x: f64) -> f64 {
    if x <= 0.0031308 {
        12.92 * x
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

fn rgb_to_xyz(x: f64) -> f64 {
    if x <= 0.04045 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}

pub fn rgb_to_lab(color: &Color) -> LabColor {
    let [r, g, b, alpha] = color.to_array01();
    let (r, g, b) = (rgb_to_xyz(r), rgb_to_xyz(g), rgb_to_xyz(b));
    let x = xyz_to_lab((0.4124564 * r + 0.3575761 * g + 0.1804375 * b) / XN);
    let y = xyz_to_lab((0.2126729 * r + 0.7151522 * g + 0.0721750 * b) / YN);
    let z = xyz_to_lab((0.0193339 * r + 0.1191920 * g + 0.9503041 * b) / ZN);
    LabColor {
        l: 116.0 * y - 16.0,
        a: 500.0 * (x - y),
        b: 200.0 * (y - z),
        alpha,
    }
}

pub fn lab_to_rgb(lab: &LabColor) -> Color {
    let mut y = (lab.l + 16.0) / 116.0;
    let mut x = if lab.a.is_nan() { y } else { y + lab.a / 500.0 };
    let mut z = if lab.b.is_nan() { y } else { y - lab.b / 200.0 };
    y = YN * lab_to_xyz(y);
    x = XN * lab_to_xyz(x);
    z = ZN * lab_to_xyz(z);
    Color::from_unpremultiplied(
        xyz_to_rgb(3.2404542 * x - 1.5371385 * y - 0.4985314 * z),
        xyz_to_rgb(-0.9692660 * x + 1.8760108 * y + 0.0415560 * z),
        xyz_to_rgb(0.0556434 * x - 0.2040259 * y + 1.0572252 * z),
        lab.alpha,
    )
}

pub fn interpolate_lab(from: &LabColor, to: &LabColor, t: f64) -> LabColor {
    LabColor {
        l: interpolate_number(from.l, to.l, t),
        a: interpolate_number(from.a, to.a, t),
        b: interpolate_number(from.b, to.b, t),
        alpha: interpolate_number(from.alpha, to.alpha, t),
    }
}

pub fn rgb_to_hcl(color: &Color) -> HclColor {
    let LabColor { l, a, b, alpha } = rgb_to_lab(color);
    let h = b.atan2(a).to_degrees();
    HclColor {
        h: if h < 0.0 { h + 360.0 } else { h },
        c: (a * a + b * b).sqrt(),
        l,
        alpha,
    }
}

pub fn hcl_to_rgb(hcl: &HclColor) -> Color {
    let h = hcl.h.to_radians();
    lab_to_rgb(&LabColor {
        l: hcl.l,
        a: h.cos() * hcl.c,
        b: h.sin() * hcl.c,
        alpha: hcl.alpha,
    })
}

/// Hue interpolation along the shorter arc.
fn interpolate_hue(a: f64, b: f64, t: f64) -> f64 {
    let d = b - a;
    let d = if d > 180.0 || d < -180.0 {
        d - 360.0 * (d / 360.0).round()
    } else {
        d
    };
    a + t * d
}

pub fn interpolate_hcl(from: &HclColor, to: &HclColor, t: f64) -> HclColor {
    HclColor {
        h: interpolate_hue(from.h, to.h, t),
        c: interpolate_number(from.c, to.c, t),
        l: interpolate_number(from.l, to.l, t),
        alpha: interpolate_number(from.alpha, to.alpha, t),
    }
}
