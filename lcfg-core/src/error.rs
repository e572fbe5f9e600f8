//! Error types for LCFG operations

use crate::ValueType;
use thiserror::Error;

/// Tag and tag-list errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("Empty tag name")]
    EmptyName,

    #[error("Invalid tag '{name}': tag names must not contain whitespace")]
    InvalidName { name: String },
}

/// Template parsing and name-synthesis errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Empty template")]
    Empty,

    #[error("Invalid template '{template}': {reason}")]
    Invalid { template: String, reason: String },

    #[error("Template '{template}' has {count} placeholders, maximum is {max}")]
    TooManyPlaceholders {
        template: String,
        count: usize,
        max: usize,
    },

    #[error("No template found for field '{field}'")]
    NotFound { field: String },

    #[error("Field '{field}' needs {needed} tags, only {available} available")]
    InsufficientTags {
        field: String,
        needed: usize,
        available: usize,
    },
}

/// Resource validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Invalid resource name '{name}'")]
    InvalidName { name: String },

    #[error("Invalid value '{value}' for {value_type} resource '{name}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        value_type: ValueType,
        reason: String,
    },

    #[error("Unknown resource type '{given}'")]
    UnknownType { given: String },

    #[error("Invalid context expression '{context}'")]
    InvalidContext { context: String },

    #[error("Invalid priority '{given}'")]
    InvalidPriority { given: String },

    #[error("Invalid derivation '{given}'")]
    InvalidDerivation { given: String },
}

/// Component and component-set errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComponentError {
    #[error("Invalid component name '{name}'")]
    InvalidName { name: String },

    #[error("Merge conflict for resource '{resource}'")]
    MergeConflict { resource: String },

    #[error("No free bucket for '{name}' ({buckets} buckets in use)")]
    CapacityExhausted { name: String, buckets: usize },
}

/// Settings errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Status-file line errors. Parse variants carry the offending line number.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("Line {lineno}: missing '=' separator")]
    MissingSeparator { lineno: usize },

    #[error("Line {lineno}: invalid key '{key}'")]
    InvalidKey { lineno: usize, key: String },

    #[error("Line {lineno}: unknown type symbol '%{symbol}'")]
    UnknownTypeSymbol { lineno: usize, symbol: char },

    #[error("Line {lineno}: bad escape sequence '{sequence}'")]
    BadEscape { lineno: usize, sequence: String },
}

/// Master error type for all LCFG operations.
#[derive(Debug, Error)]
pub enum LcfgError {
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Status error: {0}")]
    Status(#[from] StatusError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LcfgError {
    /// True when the error is an unresolved merge conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            LcfgError::Component(ComponentError::MergeConflict { .. })
        )
    }
}

/// Result type alias for LCFG operations.
pub type LcfgResult<T> = Result<T, LcfgError>;
