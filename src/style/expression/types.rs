//! Static types of style expressions.
//!
//! `value` is the universal supertype, `error` is the bottom type, and
//! `array` is parameterised by an item type and an optional fixed length.

use std::fmt;

/// Static type of an expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Null,
    Number,
    String,
    Boolean,
    Color,
    Object,
    Value,
    Error,
    Collator,
    Formatted,
    ResolvedImage,
    Array {
        item: Box<Type>,
        length: Option<usize>,
    },
}

impl Type {
    /// Build an array type.
    pub fn array(item: Type, length: Option<usize>) -> Self {
        Type::Array {
            item: Box::new(item),
            length,
        }
    }

    /// `array<value>` with no fixed length.
    pub fn any_array() -> Self {
        Type::array(Type::Value, None)
    }

    /// Kind name as used in the wire format and in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Type::Null => "null",
            Type::Number => "number",
            Type::String => "string",
            Type::Boolean => "boolean",
            Type::Color => "color",
            Type::Object => "object",
            Type::Value => "value",
            Type::Error => "error",
            Type::Collator => "collator",
            Type::Formatted => "formatted",
            Type::ResolvedImage => "resolvedImage",
            Type::Array { .. } => "array",
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Type::Value)
    }

    /// True when both types have the same kind, ignoring array parameters.
    pub fn same_kind(&self, other: &Type) -> bool {
        self.kind() == other.kind()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Array { item, length } => match length {
                Some(n) => write!(f, "array<{}, {}>", item, n),
                None if item.is_value() => write!(f, "array"),
                None => write!(f, "array<{}>", item),
            },
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Types that `value` stands for.
fn value_member_types() -> [Type; 9] {
    [
        Type::Null,
        Type::Number,
        Type::String,
        Type::Boolean,
        Type::Color,
        Type::Formatted,
        Type::Object,
        Type::any_array(),
        Type::ResolvedImage,
    ]
}

/// Returns `None` when `actual` is a subtype of `expected`, otherwise a
/// description of the mismatch.
pub fn check_subtype(expected: &Type, actual: &Type) -> Option<String> {
    if matches!(actual, Type::Error) {
        return None;
    }

    match expected {
        Type::Array {
            item: expected_item,
            length: expected_len,
        } => {
            if let Type::Array { item, length } = actual {
                let empty_value_array = *length == Some(0) && item.is_value();
                let items_ok = empty_value_array || check_subtype(expected_item, item).is_none();
                let length_ok = expected_len.is_none() || expected_len == length;
                if items_ok && length_ok {
                    return None;
                }
            }
        }
        Type::Value => {
            if actual.is_value()
                || value_member_types()
                .iter()
                .any(|member| check_subtype(member, actual).is_none())
            {
                return None;
            }
        }
        _ => {
            if expected.same_kind(actual) {
                return None;
            }
        }
    }

    Some(format!(
        "Expected {} but found {} instead.",
        expected, actual
    ))
}

/// True if `provided` has the same kind as any of `allowed`.
pub fn is_valid_type(provided: &Type, allowed: &[Type]) -> bool {
    allowed.iter().any(|t| t.same_kind(provided))
}
