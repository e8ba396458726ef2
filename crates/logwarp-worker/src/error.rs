//! Pipeline error taxonomy
//!
//! Setup errors abort a job before any line is processed. Everything else is
//! reported on the output subject and the job carries on.

use thiserror::Error;

use crate::timestamp::TimestampError;

/// Result type alias for pipeline operations
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Failure class, used for logging and for deciding whether a job aborts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Setup,
    Parse,
    Normalization,
    Write,
    Serialization,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Setup => "setup",
            ErrorClass::Parse => "parse",
            ErrorClass::Normalization => "normalization",
            ErrorClass::Write => "write",
            ErrorClass::Serialization => "serialization",
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Log file {0} does not exist")]
    SourceMissing(String),

    #[error("Unable to list log folder {folder}: {source}")]
    SourceListing {
        folder: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open file {path}: {source}")]
    SourceOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to compile grok pattern '{pattern}': {reason}")]
    PatternCompile { pattern: String, reason: String },

    #[error("Unable to parse line {line_number} ({reason}): {line}")]
    Parse {
        line_number: u64,
        line: String,
        reason: String,
    },

    #[error("Missing or invalid timestamp in line {line_number} ({source}): {line}")]
    Normalization {
        line_number: u64,
        line: String,
        #[source]
        source: TimestampError,
    },

    #[error("Failed to read log file after line {line_number}: {source}")]
    SourceRead {
        line_number: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Bulk insert failed: {reason}")]
    Write {
        /// Response status, if the store answered at all
        status: Option<u16>,
        reason: String,
    },

    #[error("Bulk insert failed: unable to encode document {id}: {source}")]
    Serialization {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::SourceMissing(_)
            | PipelineError::SourceListing { .. }
            | PipelineError::SourceOpen { .. }
            | PipelineError::PatternCompile { .. } => ErrorClass::Setup,
            PipelineError::Parse { .. } | PipelineError::SourceRead { .. } => ErrorClass::Parse,
            PipelineError::Normalization { .. } => ErrorClass::Normalization,
            PipelineError::Write { .. } => ErrorClass::Write,
            PipelineError::Serialization { .. } => ErrorClass::Serialization,
        }
    }

    /// Status code to report for a failed flush
    pub fn response_status(&self) -> u16 {
        match self {
            PipelineError::Write { status, .. } => status.unwrap_or(0),
            _ => 0,
        }
    }

    pub(crate) fn parse(line_number: u64, line: &str, reason: impl Into<String>) -> Self {
        PipelineError::Parse {
            line_number,
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}
