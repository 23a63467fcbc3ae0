//! Validation error taxonomy for the response parser.
//!
//! `JsonParsing` and `Structural` are fatal with zero partial output;
//! `Semantic` is only reachable after full structural success; `Internal`
//! wraps anything unexpected so nothing propagates raw.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field-level detail attached to a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDetail {
    pub field: String,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub actual: Option<String>,
}

impl ValidationDetail {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }
}

/// Where in the batch a failure occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPath {
    #[serde(default)]
    pub entity_index: Option<usize>,
    #[serde(default)]
    pub field: Option<String>,
}

impl ErrorPath {
    pub fn at_index(entity_index: usize) -> Self {
        Self {
            entity_index: Some(entity_index),
            field: None,
        }
    }

    pub fn at_field(entity_index: usize, field: impl Into<String>) -> Self {
        Self {
            entity_index: Some(entity_index),
            field: Some(field.into()),
        }
    }
}

impl std::fmt::Display for ErrorPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.entity_index, &self.field) {
            (Some(i), Some(field)) => write!(f, "entity[{}].{}", i, field),
            (Some(i), None) => write!(f, "entity[{}]", i),
            (None, Some(field)) => write!(f, "{}", field),
            (None, None) => write!(f, "<batch>"),
        }
    }
}

/// Everything `ResponseParser::parse` can fail with.
///
/// Serializable so a failed trigger can persist its issues on the
/// `PendingGeneration` row.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("JSON parsing failed: {message}")]
    JsonParsing {
        message: String,
        #[serde(default)]
        details: Vec<ValidationDetail>,
        #[serde(default)]
        path: Option<ErrorPath>,
    },

    #[error("Structural validation failed: {message}")]
    Structural {
        message: String,
        #[serde(default)]
        details: Vec<ValidationDetail>,
        #[serde(default)]
        path: Option<ErrorPath>,
    },

    #[error("Semantic validation failed: {message}")]
    Semantic {
        message: String,
        #[serde(default)]
        details: Vec<ValidationDetail>,
        #[serde(default)]
        path: Option<ErrorPath>,
    },

    #[error("Internal parser error: {message}")]
    Internal {
        message: String,
        #[serde(default)]
        details: Vec<ValidationDetail>,
        #[serde(default)]
        path: Option<ErrorPath>,
    },
}

impl ValidationError {
    pub fn json_parsing(message: impl Into<String>) -> Self {
        Self::JsonParsing {
            message: message.into(),
            details: Vec::new(),
            path: None,
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
            details: Vec::new(),
            path: None,
        }
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic {
            message: message.into(),
            details: Vec::new(),
            path: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            details: Vec::new(),
            path: None,
        }
    }

    pub fn with_detail(mut self, detail: ValidationDetail) -> Self {
        self.details_mut().push(detail);
        self
    }

    pub fn with_path(mut self, new_path: ErrorPath) -> Self {
        *self.path_mut() = Some(new_path);
        self
    }

    pub fn message(&self) -> &str {
        match self {
            Self::JsonParsing { message, .. }
            | Self::Structural { message, .. }
            | Self::Semantic { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn details(&self) -> &[ValidationDetail] {
        match self {
            Self::JsonParsing { details, .. }
            | Self::Structural { details, .. }
            | Self::Semantic { details, .. }
            | Self::Internal { details, .. } => details,
        }
    }

    pub fn path(&self) -> Option<&ErrorPath> {
        match self {
            Self::JsonParsing { path, .. }
            | Self::Structural { path, .. }
            | Self::Semantic { path, .. }
            | Self::Internal { path, .. } => path.as_ref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::JsonParsing { .. } => "json_parsing",
            Self::Structural { .. } => "structural",
            Self::Semantic { .. } => "semantic",
            Self::Internal { .. } => "internal",
        }
    }

    fn details_mut(&mut self) -> &mut Vec<ValidationDetail> {
        match self {
            Self::JsonParsing { details, .. }
            | Self::Structural { details, .. }
            | Self::Semantic { details, .. }
            | Self::Internal { details, .. } => details,
        }
    }

    fn path_mut(&mut self) -> &mut Option<ErrorPath> {
        match self {
            Self::JsonParsing { path, .. }
            | Self::Structural { path, .. }
            | Self::Semantic { path, .. }
            | Self::Internal { path, .. } => path,
        }
    }
}
