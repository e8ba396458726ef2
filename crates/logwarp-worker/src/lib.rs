//! Logwarp worker library
//!
//! Receives job commands from NATS, parses the named log file with a grok pattern or as
//! bulk-export JSON, and bulk-loads the records into OpenSearch while reporting progress
//! back on the output subject.
//!
//! # Example
//!
//! ```no_run
//! use logwarp_worker::{
//!     bus::NatsBus, context::WorkerContext, dispatcher::JobDispatcher, settings::Settings,
//!     store::OpenSearchClient,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load("./settings.toml")?;
//!     let store = OpenSearchClient::new(&settings.opensearch)?;
//!     let bus = NatsBus::connect(&settings.nats.address).await?;
//!     let commands = bus.subscribe(&settings.nats.command_subject).await?;
//!
//!     let ctx = WorkerContext::new(settings, Arc::new(bus), Arc::new(store));
//!     JobDispatcher::new(Arc::new(ctx)).listen(commands).await;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod batch;
pub mod bulk;
pub mod bus;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod pattern;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod settings;
pub mod source;
pub mod store;
pub mod timestamp;

pub use error::{PipelineError, PipelineResult};
