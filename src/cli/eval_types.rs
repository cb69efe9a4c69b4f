// src/cli/eval_types.rs
// style_eval CLI types: property targets and the CLI error

use std::fmt;

use crate::style::types::PropertyGroup;

/// One `--property group:key` request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyTarget {
    pub group: PropertyGroup,
    pub key: String,
}

impl PropertyTarget {
    /// Parse `paint:fill-color` or `layout:text-size`. A bare key is a paint
    /// property.
    pub fn from_str(value: &str) -> Option<Self> {
        let (group, key) = match value.split_once(':') {
            Some((group, key)) => (group, key),
            None => ("paint", value),
        };
        let group = match group.to_ascii_lowercase().as_str() {
            "paint" => PropertyGroup::Paint,
            "layout" => PropertyGroup::Layout,
            _ => return None,
        };
        if key.is_empty() {
            return None;
        }
        Some(Self {
            group,
            key: key.to_string(),
        })
    }

    pub fn label(&self) -> String {
        format!("{}.{}", self.group.as_str(), self.key)
    }
}

/// Error raised when parsing style_eval CLI flags.
#[derive(Debug)]
pub struct EvalCliError {
    msg: String,
}

impl EvalCliError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl fmt::Display for EvalCliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.msg.fmt(f)
    }
}

impl std::error::Error for EvalCliError {}
