// src/error.rs
//! Unified error handling for the streaming engine
//!
//! Every fallible operation in the crate returns [`StreamResult`]. Leaf modules
//! keep their own small error enums (filters, configuration loading, acquisition)
//! and convert into [`StreamError`] at the module boundary so callers only ever
//! match on one type.
//!
//! Not having enough points in a feature window is *not* an error; it is reported
//! through [`crate::analysis::WindowOutcome::Insufficient`].

use std::collections::HashMap;
use std::error::Error;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the whole engine
#[derive(Debug, Error)]
pub enum StreamError {
    /// Invalid configuration; fatal, detected at construction or activation
    #[error("[CONFIG] Configuration error in {component}: {reason} ({})", .context.operation)]
    Configuration {
        component: String,
        reason: String,
        context: ErrorContext,
    },

    /// Broken bookkeeping invariant; fatal, indicates a bug or misuse
    #[error("[CONSISTENCY] {reason} ({}::{})", .context.component, .context.operation)]
    Consistency {
        reason: String,
        context: ErrorContext,
    },

    /// Failure reported by the acquisition transport
    #[error("[ACQUISITION] {reason} ({})", .context.operation)]
    Acquisition {
        reason: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// Numeric kernel failure inside a processing stage
    #[error("[PROCESSING] {stage:?} stage error: {reason} ({})", .context.operation)]
    Processing {
        stage: ProcessingStage,
        reason: String,
        context: ErrorContext,
    },

    /// Feature export failure
    #[error("[PERSISTENCE] {reason} ({})", .context.operation)]
    Persistence {
        reason: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
        context: ErrorContext,
    },
}

/// Processing stages for error tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStage {
    Filtering,
    ArtifactRejection,
    FeatureExtraction,
    FeatureCompilation,
}

/// Error context for debugging and analysis
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub additional_info: HashMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
            additional_info: HashMap::new(),
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }

    /// Add additional information to the context
    pub fn add_info<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

impl StreamError {
    /// Context attached to the error
    pub fn context(&self) -> &ErrorContext {
        match self {
            StreamError::Configuration { context, .. }
            | StreamError::Consistency { context, .. }
            | StreamError::Acquisition { context, .. }
            | StreamError::Processing { context, .. }
            | StreamError::Persistence { context, .. } => context,
        }
    }

    /// Whether the error stems from configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, StreamError::Configuration { .. })
    }

    /// Whether the error is a bookkeeping invariant violation
    pub fn is_consistency(&self) -> bool {
        matches!(self, StreamError::Consistency { .. })
    }
}

/// Result type alias for engine operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Error builder for convenient error construction
pub struct StreamErrorBuilder {
    component: String,
    operation: String,
}

impl StreamErrorBuilder {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
        }
    }

    fn context(&self) -> ErrorContext {
        ErrorContext::new(&self.component, &self.operation)
    }

    pub fn configuration(self, reason: impl Into<String>) -> StreamError {
        let context = self.context();
        StreamError::Configuration {
            component: self.component,
            reason: reason.into(),
            context,
        }
    }

    pub fn consistency(self, reason: impl Into<String>) -> StreamError {
        StreamError::Consistency {
            reason: reason.into(),
            context: self.context(),
        }
    }

    pub fn processing(self, stage: ProcessingStage, reason: impl Into<String>) -> StreamError {
        StreamError::Processing {
            stage,
            reason: reason.into(),
            context: self.context(),
        }
    }

    pub fn acquisition<E>(self, error: E) -> StreamError
    where
        E: Error + Send + Sync + 'static,
    {
        StreamError::Acquisition {
            reason: error.to_string(),
            source: Some(Box::new(error)),
            context: self.context(),
        }
    }

    pub fn persistence<E>(self, error: E) -> StreamError
    where
        E: Error + Send + Sync + 'static,
    {
        StreamError::Persistence {
            reason: error.to_string(),
            source: Some(Box::new(error)),
            context: self.context(),
        }
    }
}

/// Convenience trait for tagging foreign errors with a component and operation
pub trait IntoStreamError<T> {
    fn acquisition_err(self, component: &str, operation: &str) -> StreamResult<T>;
    fn persistence_err(self, component: &str, operation: &str) -> StreamResult<T>;
}

impl<T, E> IntoStreamError<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn acquisition_err(self, component: &str, operation: &str) -> StreamResult<T> {
        self.map_err(|err| StreamErrorBuilder::new(component, operation).acquisition(err))
    }

    fn persistence_err(self, component: &str, operation: &str) -> StreamResult<T> {
        self.map_err(|err| StreamErrorBuilder::new(component, operation).persistence(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("analyzer", "analyze_batch").add_info("channel", "0");
        assert_eq!(context.component, "analyzer");
        assert_eq!(context.operation, "analyze_batch");
        assert_eq!(context.additional_info.get("channel").map(String::as_str), Some("0"));
        assert!(context.timestamp <= SystemTime::now());
    }

    #[test]
    fn test_error_context_macro_records_location() {
        let context = error_context!("stream", "ingest");
        assert!(context.file.is_some());
        assert!(context.line.unwrap_or(0) > 0);
    }

    #[test]
    fn test_error_builder() {
        let err = StreamErrorBuilder::new("eeg", "validate_config").configuration("step too large");

        match err {
            StreamError::Configuration { component, reason, .. } => {
                assert_eq!(component, "eeg");
                assert_eq!(reason, "step too large");
            }
            _ => panic!("Expected configuration error"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = StreamErrorBuilder::new("temperature", "translate_span")
            .consistency("mask length 10 does not match window length 12");
        let display = format!("{}", err);
        assert!(display.contains("CONSISTENCY"));
        assert!(display.contains("temperature::translate_span"));
        assert!(err.is_consistency());
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StreamError>();
    }

    #[test]
    fn test_into_stream_error_trait() {
        let result: Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "device closed",
        ));

        match result.acquisition_err("serial", "read_batch") {
            Err(StreamError::Acquisition { reason, source, .. }) => {
                assert!(reason.contains("device closed"));
                assert!(source.is_some());
            }
            other => panic!("Expected acquisition error, got {:?}", other),
        }
    }
}
