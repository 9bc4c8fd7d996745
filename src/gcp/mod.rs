//! GCP API interaction module
//!
//! This module provides the core functionality for talking to Google Cloud
//! Dataflow: authentication, the HTTP client, and the typed job API.
//!
//! # Module Structure
//!
//! - [`auth`] - Application Default Credentials and default project lookup
//! - [`client`] - Main GCP client and Dataflow URL builders
//! - [`dataflow`] - Dataflow v1b3 job types and the [`dataflow::DataflowApi`] trait
//! - [`http`] - HTTP utilities and [`http::ApiError`]
//!
//! # Example
//!
//! ```ignore
//! use dfjob::gcp::client::GcpClient;
//! use dfjob::gcp::dataflow::DataflowApi;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new(None).await?;
//!     let job = client.get_job("my-project", "2024-job-1").await?;
//!     println!("{:?}", job.current_state);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod dataflow;
pub mod http;
