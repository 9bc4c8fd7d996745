//! Declarative lifecycle management for Google Cloud Dataflow template jobs.
//!
//! A [`resource::JobConfig`] describes the job that should exist; the
//! [`resource::JobResourceAdapter`] launches it from its template, mirrors its
//! state, and cancels or drains it on delete.

pub mod config;
pub mod gcp;
pub mod resource;
