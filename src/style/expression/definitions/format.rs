//! Text-producing nodes: `format`, `image` and `number-format`.

use serde_json::{json, Value as JsonValue};

use super::collator::is_present;
use super::{evaluate_number, evaluate_string, Expression};
use crate::style::expression::evaluation::{EvalError, EvalResult, EvaluationContext};
use crate::style::expression::formatted::{Formatted, FormattedSection, ResolvedImage};
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::types::Type;
use crate::style::expression::value::{type_of, Value};

/// One section of a `format` call with its optional overrides.
#[derive(Debug, Clone)]
pub struct FormatSectionExpression {
    pub content: Expression,
    pub scale: Option<Expression>,
    pub font: Option<Expression>,
    pub text_color: Option<Expression>,
}

impl FormatSectionExpression {
    pub fn new(content: Expression) -> Self {
        Self {
            content,
            scale: None,
            font: None,
            text_color: None,
        }
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Result<FormattedSection, EvalError> {
        let content = self.content.evaluate(ctx)?;
        if let Value::Image(image) = content {
            return Ok(FormattedSection {
                image: Some(image),
                ..Default::default()
            });
        }

        let scale = match &self.scale {
            Some(expr) => Some(evaluate_number(expr, ctx)?),
            None => None,
        };
        let font_stack = match &self.font {
            Some(expr) => match expr.evaluate(ctx)? {
                Value::Array(fonts) => Some(
                    fonts
                        .iter()
                        .map(|f| f.to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                other => {
                    return Err(EvalError::new(format!(
                        "Expected value to be of type array<string>, but found {} instead.",
                        type_of(&other)
                    )))
                }
            },
            None => None,
        };
        let text_color = match &self.text_color {
            Some(expr) => match expr.evaluate(ctx)? {
                Value::Color(c) => Some(c),
                other => {
                    return Err(EvalError::new(format!(
                        "Expected value to be of type color, but found {} instead.",
                        type_of(&other)
                    )))
                }
            },
            None => None,
        };

        Ok(FormattedSection {
            text: content.to_string(),
            image: None,
            scale,
            font_stack,
            text_color,
        })
    }
}

/// `["format", content, {options}, content, ...]`
#[derive(Debug, Clone)]
pub struct FormatExpression {
    pub sections: Vec<FormatSectionExpression>,
}

impl FormatExpression {
    pub fn new(sections: Vec<FormatSectionExpression>) -> Self {
        Self { sections }
    }

    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() < 2 {
            return ctx.error("Expected at least one argument.");
        }
        if args[1].is_object() {
            return ctx.error("First argument must be an image or text section.");
        }

        let mut sections: Vec<FormatSectionExpression> = Vec::new();
        let mut next_may_be_options = false;
        for arg in &args[1..] {
            if let (true, Some(options)) = (next_may_be_options, arg.as_object()) {
                next_may_be_options = false;
                let parse_option = |key: &str, ty: Type| -> Result<Option<Expression>, ()> {
                    match options.get(key) {
                        Some(raw) if is_present(raw) => ctx.parse(raw, 1, Some(ty)).map(Some).ok_or(()),
                        _ => Ok(None),
                    }
                };
                let scale = parse_option("font-scale", Type::Number).ok()?;
                let font = parse_option("text-font", Type::array(Type::String, None)).ok()?;
                let text_color = parse_option("text-color", Type::Color).ok()?;
                if let Some(last) = sections.last_mut() {
                    last.scale = scale;
                    last.font = font;
                    last.text_color = text_color;
                }
                continue;
            }

            let content = ctx.parse(arg, 1, Some(Type::Value))?;
            if !matches!(
                content.ty(),
                Type::String | Type::Value | Type::Null | Type::ResolvedImage
            ) {
                return ctx.error("Formatted text type must be 'string', 'value', 'image' or 'null'.");
            }
            next_may_be_options = true;
            sections.push(FormatSectionExpression::new(content));
        }

        Some(Expression::Format(FormatExpression::new(sections)))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let mut sections = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            sections.push(section.evaluate(ctx)?);
        }
        Ok(Value::Formatted(Formatted::new(sections)))
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        for section in &self.sections {
            f(&section.content);
            for option in [&section.scale, &section.font, &section.text_color]
                .into_iter()
                .flatten()
            {
                f(option);
            }
        }
    }

    pub fn serialize(&self) -> JsonValue {
        let mut out = vec![json!("format")];
        for section in &self.sections {
            out.push(section.content.serialize());
            let mut options = serde_json::Map::new();
            if let Some(scale) = &section.scale {
                options.insert("font-scale".into(), scale.serialize());
            }
            if let Some(font) = &section.font {
                options.insert("text-font".into(), font.serialize());
            }
            if let Some(color) = &section.text_color {
                options.insert("text-color".into(), color.serialize());
            }
            out.push(JsonValue::Object(options));
        }
        JsonValue::Array(out)
    }
}

/// `["image", name]`: resolves a sprite name against the loaded images.
#[derive(Debug, Clone)]
pub struct ImageExpression {
    pub input: Box<Expression>,
}

impl ImageExpression {
    pub fn new(input: Expression) -> Self {
        Self {
            input: Box::new(input),
        }
    }

    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() != 2 {
            return ctx.error("Expected two arguments.");
        }
        let Some(name) = ctx.parse(&args[1], 1, Some(Type::String)) else {
            return ctx.error("No image name provided.");
        };
        Some(Expression::Image(ImageExpression::new(name)))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let name = self.input.evaluate(ctx)?.to_string();
        Ok(match ResolvedImage::from_name(&name) {
            Some(mut image) => {
                image.available = ctx.is_image_available(&name);
                Value::Image(image)
            }
            None => Value::Null,
        })
    }

    pub fn serialize(&self) -> JsonValue {
        json!(["image", self.input.serialize()])
    }
}

/// `["number-format", number, {locale?, currency?, min-fraction-digits?, max-fraction-digits?}]`
#[derive(Debug, Clone)]
pub struct NumberFormat {
    pub number: Box<Expression>,
    pub locale: Option<Box<Expression>>,
    pub currency: Option<Box<Expression>>,
    pub min_fraction_digits: Option<Box<Expression>>,
    pub max_fraction_digits: Option<Box<Expression>>,
}

impl NumberFormat {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() != 3 {
            return ctx.error("Expected two arguments.");
        }
        let number = ctx.parse(&args[1], 1, Some(Type::Number))?;
        let Some(options) = args[2].as_object() else {
            return ctx.error("NumberFormat options argument must be an object.");
        };

        let option = |key: &str, ty: Type| -> Result<Option<Box<Expression>>, ()> {
            match options.get(key) {
                Some(raw) if is_present(raw) => ctx
                    .parse(raw, 1, Some(ty))
                    .map(|e| Some(Box::new(e)))
                    .ok_or(()),
                _ => Ok(None),
            }
        };
        let locale = option("locale", Type::String).ok()?;
        let currency = option("currency", Type::String).ok()?;
        let min_fraction_digits = option("min-fraction-digits", Type::Number).ok()?;
        let max_fraction_digits = option("max-fraction-digits", Type::Number).ok()?;

        Some(Expression::NumberFormat(NumberFormat {
            number: Box::new(number),
            locale,
            currency,
            min_fraction_digits,
            max_fraction_digits,
        }))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let number = evaluate_number(&self.number, ctx)?;
        let string_option = |expr: &Option<Box<Expression>>| -> Result<Option<String>, EvalError> {
            expr.as_ref().map(|e| evaluate_string(e, ctx)).transpose()
        };
        let number_option = |expr: &Option<Box<Expression>>| -> Result<Option<f64>, EvalError> {
            expr.as_ref().map(|e| evaluate_number(e, ctx)).transpose()
        };

        let options = NumberFormatOptions {
            locale: string_option(&self.locale)?,
            currency: string_option(&self.currency)?,
            min_fraction_digits: number_option(&self.min_fraction_digits)?,
            max_fraction_digits: number_option(&self.max_fraction_digits)?,
        };
        Ok(Value::String(options.format(number)))
    }

    pub fn each_child(&self, f: &mut dyn FnMut(&Expression)) {
        f(self.number.as_ref());
        for option in [
            &self.locale,
            &self.currency,
            &self.min_fraction_digits,
            &self.max_fraction_digits,
        ]
        .into_iter()
        .flatten()
        {
            f(option.as_ref());
        }
    }

    pub fn serialize(&self) -> JsonValue {
        let mut options = serde_json::Map::new();
        let entries = [
            ("locale", &self.locale),
            ("currency", &self.currency),
            ("min-fraction-digits", &self.min_fraction_digits),
            ("max-fraction-digits", &self.max_fraction_digits),
        ];
        for (key, expr) in entries {
            if let Some(expr) = expr {
                options.insert(key.into(), expr.serialize());
            }
        }
        json!(["number-format", self.number.serialize(), options])
    }
}

struct NumberFormatOptions {
    locale: Option<String>,
    currency: Option<String>,
    min_fraction_digits: Option<f64>,
    max_fraction_digits: Option<f64>,
}

struct LocaleSymbols {
    group: &'static str,
    decimal: &'static str,
    currency_after: bool,
}

fn locale_symbols(locale: Option<&str>) -> LocaleSymbols {
    let language = locale
        .and_then(|l| l.split(|c| c == '-' || c == '_').next())
        .unwrap_or("en")
        .to_ascii_lowercase();
    match language.as_str() {
        "de" => LocaleSymbols {
            group: ".",
            decimal: ",",
            currency_after: true,
        },
        "fr" => LocaleSymbols {
            group: "\u{202f}",
            decimal: ",",
            currency_after: true,
        },
        _ => LocaleSymbols {
            group: ",",
            decimal: ".",
            currency_after: false,
        },
    }
}

fn currency_symbol(code: &str) -> (&str, usize) {
    match code.to_ascii_uppercase().as_str() {
        "USD" => ("$", 2),
        "EUR" => ("€", 2),
        "GBP" => ("£", 2),
        "JPY" => ("¥", 0),
        _ => (code, 2),
    }
}

impl NumberFormatOptions {
    fn format(&self, number: f64) -> String {
        if number.is_nan() {
            return "NaN".to_string();
        }
        let symbols = locale_symbols(self.locale.as_deref());
        let currency = self.currency.as_deref().map(currency_symbol);

        let (default_min, default_max) = match currency {
            Some((_, digits)) => (digits, digits),
            None => (0, 3),
        };
        let clamp = |v: f64| v.clamp(0.0, 20.0) as usize;
        let min = self.min_fraction_digits.map(clamp).unwrap_or(default_min);
        let max = self
            .max_fraction_digits
            .map(clamp)
            .unwrap_or(default_max)
            .max(min);

        let body = if number.is_infinite() {
            "∞".to_string()
        } else {
            let fixed = format!("{:.*}", max, round_half_away(number.abs(), max));
            let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
            let mut frac = frac_part.to_string();
            while frac.len() > min && frac.ends_with('0') {
                frac.pop();
            }
            let grouped = group_digits(int_part, symbols.group);
            if frac.is_empty() {
                grouped
            } else {
                format!("{}{}{}", grouped, symbols.decimal, frac)
            }
        };

        // Values that round to zero drop their sign.
        let nonzero = number.is_infinite() || body.chars().any(|c| c.is_ascii_digit() && c != '0');
        let sign = if number < 0.0 && nonzero { "-" } else { "" };
        match currency {
            Some((symbol, _)) if symbols.currency_after => format!("{}{}\u{a0}{}", sign, body, symbol),
            Some((symbol, _)) => format!("{}{}{}", sign, symbol, body),
            None => format!("{}{}", sign, body),
        }
    }
}

fn round_half_away(value: f64, digits: usize) -> f64 {
    let factor = 10f64.powi(digits as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

fn group_digits(int_part: &str, separator: &str) -> String {
    let digits: Vec<char> = int_part.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(*c);
    }
    out
}
