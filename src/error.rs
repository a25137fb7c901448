use std::path::Path;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TestgraftError {
    #[error("Failed to read file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write merged output to '{path}': {source}")]
    OutputWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in mapping file '{path}': {source}")]
    InvalidMapFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Mapping file '{path}' must be a JSON object of qualified-name strings")]
    MapFileShape { path: String },

    #[error("Failed to serialize response JSON: {source}")]
    ResponseSerialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("Tree-sitter language initialization failed: {message}")]
    LanguageSetup { message: String },

    #[error("Syntax errors detected in {origin} source")]
    InvalidSyntax { origin: &'static str },

    #[error("Unknown merge mode '{mode}' (expected ADD, APPEND, or FOLD)")]
    UnknownMode { mode: String },

    #[error("FOLD mode is not implemented")]
    NotImplemented,

    #[error("APPEND mode requires a mapping")]
    MissingMapping,

    #[error("Target '{qualified}' not found in target source")]
    TargetNotFound { qualified: String },

    #[error("Signatures differ for '{qualified}': {detail}")]
    SignatureMismatch { qualified: String, detail: String },

    #[error("Snippet for '{qualified}' must contain exactly one callable definition")]
    MalformedSnippet { qualified: String },
}

impl TestgraftError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            Self::Io { .. } | Self::OutputWrite { .. } => ErrorResponse {
                error: ErrorBody {
                    r#type: "io_error".to_string(),
                    message: self.to_string(),
                    suggestion: None,
                },
            },
            Self::InvalidMapFile { .. } | Self::MapFileShape { .. } => ErrorResponse {
                error: ErrorBody {
                    r#type: "invalid_mapping".to_string(),
                    message: self.to_string(),
                    suggestion: Some(
                        "Provide a JSON object such as {\"TestFoo.test_new\": \"TestFoo.test_existing\"}"
                            .to_string(),
                    ),
                },
            },
            Self::ResponseSerialization { .. } => ErrorResponse {
                error: ErrorBody {
                    r#type: "serialization_error".to_string(),
                    message: self.to_string(),
                    suggestion: None,
                },
            },
            Self::LanguageSetup { .. } | Self::InvalidSyntax { .. } => ErrorResponse {
                error: ErrorBody {
                    r#type: "parse_failure".to_string(),
                    message: self.to_string(),
                    suggestion: None,
                },
            },
            Self::UnknownMode { .. } => ErrorResponse {
                error: ErrorBody {
                    r#type: "unknown_mode".to_string(),
                    message: self.to_string(),
                    suggestion: Some("Valid modes are 'add', 'append', and 'fold'".to_string()),
                },
            },
            Self::NotImplemented => ErrorResponse {
                error: ErrorBody {
                    r#type: "not_implemented".to_string(),
                    message: self.to_string(),
                    suggestion: None,
                },
            },
            Self::MissingMapping => ErrorResponse {
                error: ErrorBody {
                    r#type: "missing_mapping".to_string(),
                    message: self.to_string(),
                    suggestion: Some("Pass --map <FILE> when using --mode append".to_string()),
                },
            },
            Self::TargetNotFound { .. } => ErrorResponse {
                error: ErrorBody {
                    r#type: "target_missing".to_string(),
                    message: self.to_string(),
                    suggestion: Some(
                        "Run 'testgraft inspect' on the target file to list its callables"
                            .to_string(),
                    ),
                },
            },
            Self::SignatureMismatch { .. } => ErrorResponse {
                error: ErrorBody {
                    r#type: "signature_mismatch".to_string(),
                    message: self.to_string(),
                    suggestion: None,
                },
            },
            Self::MalformedSnippet { .. } => ErrorResponse {
                error: ErrorBody {
                    r#type: "invalid_snippet".to_string(),
                    message: self.to_string(),
                    suggestion: None,
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub r#type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}
