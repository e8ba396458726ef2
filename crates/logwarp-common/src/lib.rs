//! Logwarp Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging and error handling for the Logwarp workspace.
//!
//! # Overview
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Tracing subscriber setup shared by every binary
//! - **Types**: Event-bus message contracts (job commands, status and error events)
//!
//! # Example
//!
//! ```no_run
//! use logwarp_common::types::JobMessage;
//! use logwarp_common::Result;
//!
//! fn decode(payload: &[u8]) -> Result<JobMessage> {
//!     JobMessage::from_slice(payload)
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{LogwarpError, Result};
