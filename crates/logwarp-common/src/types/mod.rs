//! Event-bus message contracts
//!
//! Job commands arrive on the command subject as [`JobMessage`]; the worker answers on the
//! output subject with [`JobStatusEvent`] after every bulk flush and [`JobErrorEvent`] for
//! every reported failure.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Job command as published on the command subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    /// Caller-chosen job identifier, echoed on every event
    pub id: String,
    /// Target index; empty means "take it from the records"
    #[serde(default)]
    pub index: String,
    /// File name of the log source, relative to the configured log folder
    pub log: String,
    /// Grok expression for the `grok` parser
    #[serde(default, rename = "grokpattern")]
    pub pattern: String,
    /// Parser selector (`grok`, `elastic`)
    #[serde(default)]
    pub parser: String,
}

impl JobMessage {
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Resolve the parser selector, case-insensitively
    pub fn parser_kind(&self) -> Option<ParserKind> {
        self.parser.parse().ok()
    }

    /// Explicit index name, if the job names one
    pub fn explicit_index(&self) -> Option<&str> {
        let index = self.index.trim();
        (!index.is_empty()).then_some(index)
    }
}

/// Record extraction strategy selected by a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// Match each line against a grok pattern
    Grok,
    /// Each line is a JSON document with `_id`, `_index` and `_source`
    Elastic,
}

impl ParserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::Grok => "grok",
            ParserKind::Elastic => "elastic",
        }
    }
}

impl std::str::FromStr for ParserKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grok" => Ok(ParserKind::Grok),
            "elastic" | "ndjson" => Ok(ParserKind::Elastic),
            other => Err(format!("unknown parser kind: {other}")),
        }
    }
}

impl std::fmt::Display for ParserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event published after every bulk flush
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusEvent {
    pub id: String,
    /// Status code of the most recent bulk response (0 if the request never completed)
    pub status: u16,
    /// Records attempted so far, across all flushes
    pub records: u64,
}

/// Failure event; transient, never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobErrorEvent {
    pub id: String,
    pub error: String,
}

/// Anything published on the output subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputEvent {
    Status(JobStatusEvent),
    Error(JobErrorEvent),
}

impl OutputEvent {
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl From<JobStatusEvent> for OutputEvent {
    fn from(event: JobStatusEvent) -> Self {
        OutputEvent::Status(event)
    }
}

impl From<JobErrorEvent> for OutputEvent {
    fn from(event: JobErrorEvent) -> Self {
        OutputEvent::Error(event)
    }
}
