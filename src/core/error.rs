//! Error handling for dalec-assist
//!
//! This module provides the error types and user-friendly error reporting for the
//! dalec-assist CLI. The error system follows two principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`DalecError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! Use [`user_friendly_error`] to convert any error into a user-friendly format with
//! contextual suggestions.
//!
//! # Error Taxonomy
//!
//! Not every failure is an error. Documents that are not Dalec specs simply stop being
//! tracked, discovery failures are downgraded to warnings, and breakpoint mapping failures
//! are silent. The variants below cover what is left: missing input that aborts an action,
//! failed `docker buildx` invocations and configuration problems.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dalec_assist::core::{DalecError, ErrorContext};
//!
//! let context = ErrorContext::new(DalecError::NoActiveDocument)
//!     .with_suggestion("Pass the path of a Dalec spec")
//!     .with_details("The first line must start with #syntax=...");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for dalec-assist operations
///
/// # Error Categories
///
/// ## Missing input
/// - [`NoActiveDocument`](DalecError::NoActiveDocument) - nothing to act on
/// - [`NotASpecDocument`](DalecError::NotASpecDocument) - file is not a recognized Dalec spec
/// - [`SpecFileNotFound`](DalecError::SpecFileNotFound) - spec path does not exist on disk
/// - [`InvalidBuildArgs`](DalecError::InvalidBuildArgs) - `buildArgs` is not a string map
/// - [`InvalidDebugConfiguration`](DalecError::InvalidDebugConfiguration) - unusable launch request
///
/// ## External tool
/// - [`BuildxNotFound`](DalecError::BuildxNotFound) - the configured binary is not on `PATH`
/// - [`BuildxCommandFailed`](DalecError::BuildxCommandFailed) - non-zero exit status
///
/// ## Configuration and parsing
/// - [`ConfigError`](DalecError::ConfigError), [`JsonError`](DalecError::JsonError)
#[derive(Error, Debug, Clone)]
pub enum DalecError {
    /// No document was given and none is active.
    #[error("No Dalec spec selected")]
    NoActiveDocument,

    /// The document exists but its first line is not a Dalec syntax marker.
    #[error("Selected file is not recognized as a Dalec spec: {path}")]
    NotASpecDocument {
        /// The path that was checked
        path: String,
    },

    /// The spec file referenced by a launch configuration does not exist.
    #[error("Dalec spec file not found: {path}")]
    SpecFileNotFound {
        /// The resolved path that was checked
        path: String,
    },

    /// `buildArgs` was present but not an object of strings.
    #[error("Invalid buildArgs: {reason}")]
    InvalidBuildArgs {
        /// Why the value was rejected
        reason: String,
    },

    /// A debug launch configuration could not be resolved.
    #[error("Invalid debug configuration: {reason}")]
    InvalidDebugConfiguration {
        /// Why the configuration was rejected
        reason: String,
    },

    /// The buildx binary could not be located.
    #[error("'{binary}' is not installed or not found in PATH")]
    BuildxNotFound {
        /// Binary name that was searched for
        binary: String,
    },

    /// A buildx invocation exited unsuccessfully.
    #[error("docker buildx {operation} failed")]
    BuildxCommandFailed {
        /// The buildx operation (first argument after the prefix)
        operation: String,
        /// Captured error output
        stderr: String,
    },

    /// Configuration file problem
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// JSON payload could not be parsed
    #[error("Invalid JSON in {source_name}: {reason}")]
    JsonError {
        /// Where the JSON came from
        source_name: String,
        /// Parser message
        reason: String,
    },

    /// Anything else
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Error context wrapper that provides user-friendly error information
///
/// Combines a [`DalecError`] with an optional suggestion (printed in green) and
/// optional details (printed in yellow).
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: DalecError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: DalecError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`DalecError`] variants, [`std::io::Error`], TOML and JSON parse errors, and
/// falls back to the full error chain for anything else.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(dalec_error) = error.downcast_ref::<DalecError>() {
        return create_error_context(dalec_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(DalecError::Other {
                    message: format!("Permission denied: {error:#}"),
                })
                .with_suggestion("Check file ownership and permissions of the spec and context directories");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(DalecError::Other {
                    message: format!("{error:#}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(DalecError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your dalec-assist config file")
        .with_details("TOML parsing errors are usually caused by missing quotes or mismatched brackets");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(DalecError::Other {
        message,
    })
}

fn create_error_context(error: DalecError) -> ErrorContext {
    match &error {
        DalecError::NoActiveDocument => ErrorContext::new(error)
            .with_suggestion("Open a Dalec spec (first line must start with #syntax=...) and pass its path"),

        DalecError::NotASpecDocument { .. } => ErrorContext::new(error)
            .with_suggestion("Add a syntax line such as '# syntax=ghcr.io/project-dalec/dalec/frontend:latest' as the first line")
            .with_details("Only .yml/.yaml files whose first line references the Dalec frontend are recognized"),

        DalecError::SpecFileNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check the \"specFile\" entry of the launch configuration"),

        DalecError::InvalidBuildArgs { .. } => ErrorContext::new(error)
            .with_suggestion("buildArgs must be an object mapping argument names to string values"),

        DalecError::BuildxNotFound { binary } => {
            let suggestion = format!(
                "Install Docker with the buildx plugin, or point [buildx].command at the right binary instead of '{binary}'"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("dalec-assist shells out to docker buildx for target discovery, builds and debugging")
        }

        DalecError::BuildxCommandFailed { stderr, .. } => {
            let details = if stderr.trim().is_empty() {
                "buildx exited with a non-zero status and no error output".to_string()
            } else {
                stderr.trim().to_string()
            };
            ErrorContext::new(error)
                .with_details(details)
                .with_suggestion("Run the printed command manually with --progress=plain for more output")
        }

        DalecError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check ~/.dalec-assist/config.toml or the file passed with --config"),

        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DalecError::SpecFileNotFound {
            path: "/ws/dalec.yml".to_string(),
        };
        assert_eq!(error.to_string(), "Dalec spec file not found: /ws/dalec.yml");

        let error = DalecError::BuildxCommandFailed {
            operation: "build".to_string(),
            stderr: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "docker buildx build failed");
    }

    #[test]
    fn test_error_context_display() {
        let context = ErrorContext::new(DalecError::NoActiveDocument)
            .with_suggestion("open one")
            .with_details("none active");
        let rendered = context.to_string();
        assert!(rendered.contains("No Dalec spec selected"));
        assert!(rendered.contains("Details: none active"));
        assert!(rendered.contains("Suggestion: open one"));
    }

    #[test]
    fn test_user_friendly_error_for_dalec_error() {
        let ctx = user_friendly_error(anyhow::Error::from(DalecError::BuildxNotFound {
            binary: "docker".to_string(),
        }));
        assert!(matches!(ctx.error, DalecError::BuildxNotFound { .. }));
        assert!(ctx.suggestion.unwrap().contains("buildx"));
    }

    #[test]
    fn test_user_friendly_error_keeps_chain() {
        let error = anyhow::anyhow!("root").context("outer");
        let ctx = user_friendly_error(error);
        match ctx.error {
            DalecError::Other { message } => {
                assert!(message.starts_with("outer"));
                assert!(message.contains("Caused by:"));
                assert!(message.contains("root"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
