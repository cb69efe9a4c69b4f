//! Premultiplied RGBA colors and CSS color parsing.
//!
//! Channels are stored in 0..1 with r, g and b already multiplied by alpha.
//! Everything that leaves this module (strings, arrays for serialization)
//! uses the un-premultiplied representation.

use std::fmt;

use super::value::number_to_string;

/// RGBA color with premultiplied alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    /// Build from already-premultiplied channels.
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Build from straight (non-premultiplied) 0..1 channels.
    pub fn from_unpremultiplied(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r: r * a,
            g: g * a,
            b: b * a,
            a,
        }
    }

    /// Build from straight 0..255 channels and a 0..1 alpha.
    pub fn from_rgba8(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self::from_unpremultiplied(r / 255.0, g / 255.0, b / 255.0, a)
    }

    /// Parse a CSS color string (named, hex, `rgb[a]()`, `hsl[a]()`).
    pub fn parse(input: &str) -> Option<Self> {
        let [r, g, b, a] = parse_css_color(&input.to_lowercase())?;
        Some(Self::from_rgba8(r, g, b, a))
    }

    /// Un-premultiplied `[r, g, b, a]` with channels in 0..255.
    pub fn to_array(&self) -> [f64; 4] {
        if self.a == 0.0 {
            return [0.0; 4];
        }
        [
            self.r * 255.0 / self.a,
            self.g * 255.0 / self.a,
            self.b * 255.0 / self.a,
            self.a,
        ]
    }

    /// Un-premultiplied `[r, g, b, a]` with channels in 0..1.
    pub fn to_array01(&self) -> [f64; 4] {
        if self.a == 0.0 {
            return [0.0; 4];
        }
        [self.r / self.a, self.g / self.a, self.b / self.a, self.a]
    }

    pub fn to_array01_premultiplied_alpha(&self) -> [f64; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Straight-alpha channels as `f32`, the shape renderers consume.
    pub fn to_rgba_f32(&self) -> [f32; 4] {
        let [r, g, b, a] = self.to_array01();
        [r as f32, g as f32, b as f32, a as f32]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_array();
        write!(
            f,
            "rgba({},{},{},{})",
            js_round(r),
            js_round(g),
            js_round(b),
            number_to_string(a)
        )
    }
}

/// `Math.round`: halves round towards +infinity.
fn js_round(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// Validate straight 0..255 channels and a 0..1 alpha.
pub fn validate_rgba(r: f64, g: f64, b: f64, a: Option<f64>) -> Option<String> {
    let channels_ok = [r, g, b].iter().all(|c| (0.0..=255.0).contains(c));
    let describe = || {
        let mut parts = vec![number_to_string(r), number_to_string(g), number_to_string(b)];
        if let Some(a) = a {
            parts.push(number_to_string(a));
        }
        parts.join(", ")
    };
    if !channels_ok {
        return Some(format!(
            "Invalid rgba value [{}]: 'r', 'g', and 'b' must be between 0 and 255.",
            describe()
        ));
    }
    if let Some(a) = a {
        if !(0.0..=1.0).contains(&a) {
            return Some(format!(
                "Invalid rgba value [{}]: 'a' must be between 0 and 1.",
                describe()
            ));
        }
    }
    None
}

/// Parse a lowercase CSS color into straight `[r, g, b]` 0..255 and alpha 0..1.
fn parse_css_color(input: &str) -> Option<[f64; 4]> {
    let s: String = input.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(rgb) = named_color(&s) {
        return Some([rgb[0] as f64, rgb[1] as f64, rgb[2] as f64, 1.0]);
    }
    if s == "transparent" {
        return Some([0.0, 0.0, 0.0, 0.0]);
    }

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex_color(hex);
    }

    let open = s.find('(')?;
    if !s.ends_with(')') {
        return None;
    }
    let fname = &s[..open];
    let params: Vec<&str> = s[open + 1..s.len() - 1].split(',').collect();

    match fname {
        "rgb" | "rgba" => parse_rgb_params(&params),
        "hsl" | "hsla" => parse_hsl_params(&params),
        _ => None,
    }
}

fn parse_hex_color(hex: &str) -> Option<[f64; 4]> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1].repeat(2), 16).ok();
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    let (r, g, b, a) = match hex.len() {
        3 => (nibble(0)?, nibble(1)?, nibble(2)?, 255),
        4 => (nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?),
        6 => (byte(0)?, byte(2)?, byte(4)?, 255),
        8 => (byte(0)?, byte(2)?, byte(4)?, byte(6)?),
        _ => return None,
    };
    Some([r as f64, g as f64, b as f64, a as f64 / 255.0])
}

fn parse_rgb_params(params: &[&str]) -> Option<[f64; 4]> {
    if params.len() != 3 && params.len() != 4 {
        return None;
    }
    let channel = |p: &str| -> Option<f64> {
        if let Some(pct) = p.strip_suffix('%') {
            Some(clamp_css_byte(parse_float(pct)? / 100.0 * 255.0))
        } else {
            Some(clamp_css_byte(parse_float(p)?))
        }
    };
    let alpha = match params.get(3) {
        Some(p) => parse_css_alpha(p)?,
        None => 1.0,
    };
    Some([channel(params[0])?, channel(params[1])?, channel(params[2])?, alpha])
}

fn parse_hsl_params(params: &[&str]) -> Option<[f64; 4]> {
    if params.len() != 3 && params.len() != 4 {
        return None;
    }
    let h = ((parse_float(params[0])? % 360.0) + 360.0) % 360.0 / 360.0;
    let s = parse_css_unit(params[1])?;
    let l = parse_css_unit(params[2])?;
    let alpha = match params.get(3) {
        Some(p) => parse_css_alpha(p)?,
        None => 1.0,
    };

    let m2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
    let m1 = l * 2.0 - m2;
    Some([
        clamp_css_byte(hue_to_rgb(m1, m2, h + 1.0 / 3.0) * 255.0),
        clamp_css_byte(hue_to_rgb(m1, m2, h) * 255.0),
        clamp_css_byte(hue_to_rgb(m1, m2, h - 1.0 / 3.0) * 255.0),
        alpha,
    ])
}

fn hue_to_rgb(m1: f64, m2: f64, mut h: f64) -> f64 {
    if h < 0.0 {
        h += 1.0;
    } else if h > 1.0 {
        h -= 1.0;
    }
    if h * 6.0 < 1.0 {
        return m1 + (m2 - m1) * h * 6.0;
    }
    if h * 2.0 < 1.0 {
        return m2;
    }
    if h * 3.0 < 2.0 {
        return m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0;
    }
    m1
}

fn parse_float(s: &str) -> Option<f64> {
    let v: f64 = s.parse().ok()?;
    v.is_finite().then_some(v)
}

fn clamp_css_byte(v: f64) -> f64 {
    js_round(v).clamp(0, 255) as f64
}

/// A float that may carry a trailing `%`, clamped to 0..1.
fn parse_css_unit(s: &str) -> Option<f64> {
    let v = match s.strip_suffix('%') {
        Some(pct) => parse_float(pct)? / 100.0,
        None => parse_float(s)?,
    };
    Some(v.clamp(0.0, 1.0))
}

fn parse_css_alpha(s: &str) -> Option<f64> {
    parse_css_unit(s)
}

fn named_color(name: &str) -> Option<[u8; 3]> {
    let rgb = match name {
        "aliceblue" => [240, 248, 255],
        "antiquewhite" => [250, 235, 215],
        "aqua" => [0, 255, 255],
        "aquamarine" => [127, 255, 212],
        "azure" => [240, 255, 255],
        "beige" => [245, 245, 220],
        "bisque" => [255, 228, 196],
        "black" => [0, 0, 0],
        "blanchedalmond" => [255, 235, 205],
        "blue" => [0, 0, 255],
        "blueviolet" => [138, 43, 226],
        "brown" => [165, 42, 42],
        "burlywood" => [222, 184, 135],
        "cadetblue" => [95, 158, 160],
        "chartreuse" => [127, 255, 0],
        "chocolate" => [210, 105, 30],
        "coral" => [255, 127, 80],
        "cornflowerblue" => [100, 149, 237],
        "cornsilk" => [255, 248, 220],
        "crimson" => [220, 20, 60],
        "cyan" => [0, 255, 255],
        "darkblue" => [0, 0, 139],
        "darkcyan" => [0, 139, 139],
        "darkgoldenrod" => [184, 134, 11],
        "darkgray" | "darkgrey" => [169, 169, 169],
        "darkgreen" => [0, 100, 0],
        "darkkhaki" => [189, 183, 107],
        "darkmagenta" => [139, 0, 139],
        "darkolivegreen" => [85, 107, 47],
        "darkorange" => [255, 140, 0],
        "darkorchid" => [153, 50, 204],
        "darkred" => [139, 0, 0],
        "darksalmon" => [233, 150, 122],
        "darkseagreen" => [143, 188, 143],
        "darkslateblue" => [72, 61, 139],
        "darkslategray" | "darkslategrey" => [47, 79, 79],
        "darkturquoise" => [0, 206, 209],
        "darkviolet" => [148, 0, 211],
        "deeppink" => [255, 20, 147],
        "deepskyblue" => [0, 191, 255],
        "dimgray" | "dimgrey" => [105, 105, 105],
        "dodgerblue" => [30, 144, 255],
        "firebrick" => [178, 34, 34],
        "floralwhite" => [255, 250, 240],
        "forestgreen" => [34, 139, 34],
        "fuchsia" => [255, 0, 255],
        "gainsboro" => [220, 220, 220],
        "ghostwhite" => [248, 248, 255],
        "gold" => [255, 215, 0],
        "goldenrod" => [218, 165, 32],
        "gray" | "grey" => [128, 128, 128],
        "green" => [0, 128, 0],
        "greenyellow" => [173, 255, 47],
        "honeydew" => [240, 255, 240],
        "hotpink" => [255, 105, 180],
        "indianred" => [205, 92, 92],
        "indigo" => [75, 0, 130],
        "ivory" => [255, 255, 240],
        "khaki" => [240, 230, 140],
        "lavender" => [230, 230, 250],
        "lavenderblush" => [255, 240, 245],
        "lawngreen" => [124, 252, 0],
        "lemonchiffon" => [255, 250, 205],
        "lightblue" => [173, 216, 230],
        "lightcoral" => [240, 128, 128],
        "lightcyan" => [224, 255, 255],
        "lightgoldenrodyellow" => [250, 250, 210],
        "lightgray" | "lightgrey" => [211, 211, 211],
        "lightgreen" => [144, 238, 144],
        "lightpink" => [255, 182, 193],
        "lightsalmon" => [255, 160, 122],
        "lightseagreen" => [32, 178, 170],
        "lightskyblue" => [135, 206, 250],
        "lightslategray" | "lightslategrey" => [119, 136, 153],
        "lightsteelblue" => [176, 196, 222],
        "lightyellow" => [255, 255, 224],
        "lime" => [0, 255, 0],
        "limegreen" => [50, 205, 50],
        "linen" => [250, 240, 230],
        "magenta" => [255, 0, 255],
        "maroon" => [128, 0, 0],
        "mediumaquamarine" => [102, 205, 170],
        "mediumblue" => [0, 0, 205],
        "mediumorchid" => [186, 85, 211],
        "mediumpurple" => [147, 112, 219],
        "mediumseagreen" => [60, 179, 113],
        "mediumslateblue" => [123, 104, 238],
        "mediumspringgreen" => [0, 250, 154],
        "mediumturquoise" => [72, 209, 204],
        "mediumvioletred" => [199, 21, 133],
        "midnightblue" => [25, 25, 112],
        "mintcream" => [245, 255, 250],
        "mistyrose" => [255, 228, 225],
        "moccasin" => [255, 228, 181],
        "navajowhite" => [255, 222, 173],
        "navy" => [0, 0, 128],
        "oldlace" => [253, 245, 230],
        "olive" => [128, 128, 0],
        "olivedrab" => [107, 142, 35],
        "orange" => [255, 165, 0],
        "orangered" => [255, 69, 0],
        "orchid" => [218, 112, 214],
        "palegoldenrod" => [238, 232, 170],
        "palegreen" => [152, 251, 152],
        "paleturquoise" => [175, 238, 238],
        "palevioletred" => [219, 112, 147],
        "papayawhip" => [255, 239, 213],
        "peachpuff" => [255, 218, 185],
        "peru" => [205, 133, 63],
        "pink" => [255, 192, 203],
        "plum" => [221, 160, 221],
        "powderblue" => [176, 224, 230],
        "purple" => [128, 0, 128],
        "rebeccapurple" => [102, 51, 153],
        "red" => [255, 0, 0],
        "rosybrown" => [188, 143, 143],
        "royalblue" => [65, 105, 225],
        "saddlebrown" => [139, 69, 19],
        "salmon" => [250, 128, 114],
        "sandybrown" => [244, 164, 96],
        "seagreen" => [46, 139, 87],
        "seashell" => [255, 245, 238],
        "sienna" => [160, 82, 45],
        "silver" => [192, 192, 192],
        "skyblue" => [135, 206, 235],
        "slateblue" => [106, 90, 205],
        "slategray" | "slategrey" => [112, 128, 144],
        "snow" => [255, 250, 250],
        "springgreen" => [0, 255, 127],
        "steelblue" => [70, 130, 180],
        "tan" => [210, 180, 140],
        "teal" => [0, 128, 128],
        "thistle" => [216, 191, 216],
        "tomato" => [255, 99, 71],
        "turquoise" => [64, 224, 208],
        "violet" => [238, 130, 238],
        "wheat" => [245, 222, 179],
        "white" => [255, 255, 255],
        "whitesmoke" => [245, 245, 245],
        "yellow" => [255, 255, 0],
        "yellowgreen" => [154, 205, 50],
        _ => return None,
    };
    Some(rgb)
}
