//! Dataflow job resource
//!
//! Declarative management of a single Dataflow template job.
//!
//! # Architecture
//!
//! - [`schema`] - The declared configuration and its validation
//! - [`adapter`] - Create / read / delete against the Dataflow API
//! - [`state`] - The persisted resource record
//! - [`plan`] - Decides between create, replace and refresh
//!
//! # Example
//!
//! ```ignore
//! use dfjob::gcp::client::GcpClient;
//! use dfjob::resource::{JobConfig, JobResourceAdapter, ProviderContext, ResourceRecord};
//!
//! async fn launch(config: &JobConfig) -> anyhow::Result<ResourceRecord> {
//!     let adapter = JobResourceAdapter::new(GcpClient::new(None).await?);
//!     let ctx = ProviderContext::new(Some("my-project".to_string()));
//!     let mut record = ResourceRecord::default();
//!     adapter.create(config, &mut record, &ctx).await?;
//!     Ok(record)
//! }
//! ```

pub mod adapter;
pub mod plan;
pub mod schema;
pub mod state;

pub use adapter::{JobResourceAdapter, ProviderContext, ReadOutcome};
pub use plan::{plan, Plan};
pub use schema::{map_on_delete, JobConfig, JobEnvironment, OnDelete, SchemaError};
pub use state::{ResourceRecord, StateStore};
