//! Rich text, image references and collators.

use std::cmp::Ordering;
use std::fmt;

use serde_json::{json, Value as JsonValue};

use super::color::Color;
use super::value::number_to_json;

/// A sprite reference plus whether the sprite is currently loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImage {
    pub name: String,
    pub available: bool,
}

impl ResolvedImage {
    /// Unavailable image named `name`; `None` for an empty name.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            available: false,
        })
    }

    pub fn serialize(&self) -> JsonValue {
        json!(["image", self.name])
    }
}

/// One run of formatted text: either text with optional overrides, or an image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormattedSection {
    pub text: String,
    pub image: Option<ResolvedImage>,
    pub scale: Option<f64>,
    /// Comma-joined font stack.
    pub font_stack: Option<String>,
    pub text_color: Option<Color>,
}

impl FormattedSection {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Ordered list of formatted sections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Formatted {
    pub sections: Vec<FormattedSection>,
}

impl Formatted {
    pub fn new(sections: Vec<FormattedSection>) -> Self {
        Self { sections }
    }

    /// A single plain-text section.
    pub fn from_string(text: impl Into<String>) -> Self {
        Self {
            sections: vec![FormattedSection::text(text)],
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.sections.iter().any(|s| {
            !s.text.is_empty() || s.image.as_ref().map(|i| !i.name.is_empty()).unwrap_or(false)
        })
    }

    /// Canonical `["format", ...]` form with literal option values.
    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!("format")];
        for section in &self.sections {
            if let Some(image) = &section.image {
                out.push(json!(["image", image.name]));
                continue;
            }
            out.push(JsonValue::String(section.text.clone()));
            let mut options = serde_json::Map::new();
            if let Some(fonts) = &section.font_stack {
                let stack: Vec<&str> = fonts.split(',').collect();
                options.insert("text-font".into(), json!(["literal", stack]));
            }
            if let Some(scale) = section.scale {
                options.insert("font-scale".into(), number_to_json(scale));
            }
            if let Some(color) = &section.text_color {
                let [r, g, b, a] = color.to_array();
                let mut rgba = vec![json!("rgba")];
                rgba.extend([r, g, b, a].into_iter().map(number_to_json));
                options.insert("text-color".into(), JsonValue::Array(rgba));
            }
            out.push(JsonValue::Object(options));
        }
        JsonValue::Array(out)
    }
}

impl fmt::Display for Formatted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            f.write_str(&section.text)?;
        }
        Ok(())
    }
}

/// Locale-aware string comparison options.
///
/// Comparison folds case when not case sensitive and strips Latin
/// diacritics when not diacritic sensitive; ties are broken by the
/// next most specific level, mirroring a "search" usage collator.
#[derive(Debug, Clone, PartialEq)]
pub struct Collator {
    pub case_sensitive: bool,
    pub diacritic_sensitive: bool,
    pub locale: Option<String>,
}

impl Collator {
    pub fn new(case_sensitive: bool, diacritic_sensitive: bool, locale: Option<String>) -> Self {
        Self {
            case_sensitive,
            diacritic_sensitive,
            locale,
        }
    }

    pub fn compare(&self, lhs: &str, rhs: &str) -> Ordering {
        let key = |s: &str| -> String {
            s.chars()
                .map(|c| if self.diacritic_sensitive { c } else { strip_diacritic(c) })
                .flat_map(|c| {
                    let folded: Vec<char> = if self.case_sensitive {
                        vec![c]
                    } else {
                        c.to_lowercase().collect()
                    };
                    folded
                })
                .collect()
        };
        key(lhs).cmp(&key(rhs))
    }

    /// Locale the collator resolves to.
    pub fn resolved_locale(&self) -> String {
        self.locale.clone().unwrap_or_else(|| "en".to_string())
    }

    pub fn to_json(&self) -> JsonValue {
        let mut options = serde_json::Map::new();
        options.insert("case-sensitive".into(), json!(self.case_sensitive));
        options.insert("diacritic-sensitive".into(), json!(self.diacritic_sensitive));
        if let Some(locale) = &self.locale {
            options.insert("locale".into(), json!(locale));
        }
        JsonValue::Object(options)
    }
}

fn strip_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => 'C',
        'ď' | 'đ' => 'd',
        'Ď' | 'Đ' => 'D',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => 'G',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => 'I',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => 'O',
        'ŕ' | 'ř' => 'r',
        'Ŕ' | 'Ř' => 'R',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => 'S',
        'ţ' | 'ť' => 't',
        'Ţ' | 'Ť' => 'T',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' | 'Ÿ' => 'Y',
        'ź' | 'ż' | 'ž' => 'z',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collator_sensitivity() {
        let base = Collator::new(false, false, None);
        assert_eq!(base.compare("Résumé", "resume"), Ordering::Equal);

        let case = Collator::new(true, false, None);
        assert_ne!(case.compare("Resume", "resume"), Ordering::Equal);
        assert_eq!(case.compare("résumé", "resume"), Ordering::Equal);

        let accent = Collator::new(false, true, None);
        assert_ne!(accent.compare("résumé", "resume"), Ordering::Equal);
        assert_eq!(accent.compare("RESUME", "resume"), Ordering::Equal);
    }

    #[test]
    fn test_formatted_string_and_empty() {
        let f = Formatted::new(vec![
            FormattedSection::text("a"),
            FormattedSection::text("b"),
        ]);
        assert_eq!(f.to_string(), "ab");
        assert!(!f.is_empty());
        assert!(Formatted::from_string("").is_empty());
    }

    #[test]
    fn test_formatted_serialize() {
        let f = Formatted::new(vec![FormattedSection {
            text: "x".into(),
            scale: Some(1.5),
            font_stack: Some("a,b".into()),
            ..Default::default()
        }]);
        assert_eq!(
            f.serialize(),
            json!(["format", "x", {"font-scale": 1.5, "text-font": ["literal", ["a", "b"]]}])
        );
    }

    #[test]
    fn test_resolved_image_from_name() {
        assert!(ResolvedImage::from_name("").is_none());
        let img = ResolvedImage::from_name("park").unwrap();
        assert!(!img.available);
        assert_eq!(img.serialize(), json!(["image", "park"]));
    }
}
