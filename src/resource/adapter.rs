//! Job resource adapter
//!
//! Drives one Dataflow template job through create, read and delete. Each
//! entry point makes a single remote call (create also re-reads the job) and
//! keeps no state of its own; everything persistent goes through the
//! [`ResourceRecord`] handed in by the caller.

use super::schema::{JobConfig, OnDelete};
use super::state::ResourceRecord;
use crate::gcp::dataflow::{DataflowApi, Job};
use crate::gcp::http::is_not_found;
use anyhow::{Context, Result};
use chrono::Utc;

/// Ambient settings the adapter resolves against
#[derive(Debug, Clone, Default)]
pub struct ProviderContext {
    /// Project used when a declaration does not name one
    pub default_project: Option<String>,
}

impl ProviderContext {
    pub fn new(default_project: Option<String>) -> Self {
        Self {
            default_project: default_project.filter(|p| !p.trim().is_empty()),
        }
    }

    /// Effective project: the declared one, else the ambient default
    pub fn project_for(&self, config: &JobConfig) -> Result<String> {
        config
            .project
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| self.default_project.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No project configured for job {}. Set `project`, GOOGLE_CLOUD_PROJECT or use --project",
                    config.name
                )
            })
    }

    /// Project of an already-created job
    fn project_for_record(&self, record: &ResourceRecord) -> Result<String> {
        if let Some(project) = &record.project {
            return Ok(project.clone());
        }
        match &record.config {
            Some(config) => self.project_for(config),
            None => self
                .default_project
                .clone()
                .ok_or_else(|| anyhow::anyhow!("No project recorded or configured for tracked job")),
        }
    }
}

/// Result of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The job exists and `state` was refreshed
    Present,
    /// The job is gone remotely; the record's id has been cleared
    Removed,
}

pub struct JobResourceAdapter<A> {
    api: A,
}

impl<A: DataflowApi> JobResourceAdapter<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Launch the declared job and start tracking it.
    ///
    /// Not idempotent: each call launches a new job. If the follow-up read
    /// fails the id stays recorded and the error is returned.
    pub async fn create(
        &self,
        config: &JobConfig,
        record: &mut ResourceRecord,
        ctx: &ProviderContext,
    ) -> Result<()> {
        config.validate()?;
        let project = ctx.project_for(config)?;

        let request = config.to_request();
        tracing::info!(
            "Launching Dataflow job {} from {} in {}",
            request.job_name,
            request.gcs_path,
            project
        );

        let job = self
            .api
            .create_job_from_template(&project, &request)
            .await?;

        let id = job
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Dataflow returned no job id for {}", config.name))?;

        tracing::info!("Dataflow job {} created with id {}", config.name, id);

        *record = ResourceRecord {
            id: Some(id),
            state: job.current_state,
            config: Some(config.clone()),
            project: Some(project),
            created_at: Some(Utc::now()),
            refreshed_at: None,
        };

        self.read(record, ctx).await?;
        Ok(())
    }

    /// Refresh `state` from the remote job
    pub async fn read(&self, record: &mut ResourceRecord, ctx: &ProviderContext) -> Result<ReadOutcome> {
        let Some(id) = record.id.clone() else {
            return Ok(ReadOutcome::Removed);
        };
        let project = ctx.project_for_record(record)?;

        match self.api.get_job(&project, &id).await {
            Ok(job) => {
                tracing::debug!("Dataflow job {} is {:?}", id, job.current_state);
                record.state = job.current_state;
                record.refreshed_at = Some(Utc::now());
                Ok(ReadOutcome::Present)
            }
            Err(e) if is_not_found(&e) => {
                tracing::warn!("Dataflow job {} not found, removing from state", id);
                record.id = None;
                record.state = None;
                Ok(ReadOutcome::Removed)
            }
            Err(e) => Err(e.context(format!("Failed to read Dataflow job {}", id))),
        }
    }

    /// Ask Dataflow to stop the tracked job according to its `on_delete`
    /// policy. Does not wait for the transition.
    pub async fn delete(&self, record: &ResourceRecord, ctx: &ProviderContext) -> Result<()> {
        let id = record
            .id
            .as_deref()
            .context("Cannot delete a job that is not tracked")?;
        let project = ctx.project_for_record(record)?;
        let policy = record
            .config
            .as_ref()
            .map(|c| c.on_delete)
            .unwrap_or_default();

        self.delete_with_policy(&project, id, policy.as_str()).await
    }

    /// Request the state transition for `policy` on job `id`.
    ///
    /// An unknown policy is rejected before any request is sent.
    pub async fn delete_with_policy(&self, project: &str, id: &str, policy: &str) -> Result<()> {
        let state = policy.parse::<OnDelete>()?.requested_state();

        tracing::info!("Requesting {} for Dataflow job {}", state, id);

        self.api
            .update_job(project, id, &Job::with_requested_state(state))
            .await?;

        Ok(())
    }
}
