//! Dataflow v1b3 API
//!
//! Typed request/response shapes for the three calls the job resource needs,
//! and the [`DataflowApi`] seam the resource adapter is written against.

use super::client::GcpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lifecycle states of a Dataflow job
///
/// The wire names live only in [`JobState::as_str`]; serde goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Unknown,
    Stopped,
    Running,
    Done,
    Failed,
    Cancelled,
    Updated,
    Draining,
    Drained,
    Pending,
    Cancelling,
    Queued,
    ResourceCleaningUp,
}

impl JobState {
    pub const ALL: [JobState; 13] = [
        JobState::Unknown,
        JobState::Stopped,
        JobState::Running,
        JobState::Done,
        JobState::Failed,
        JobState::Cancelled,
        JobState::Updated,
        JobState::Draining,
        JobState::Drained,
        JobState::Pending,
        JobState::Cancelling,
        JobState::Queued,
        JobState::ResourceCleaningUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Unknown => "JOB_STATE_UNKNOWN",
            JobState::Stopped => "JOB_STATE_STOPPED",
            JobState::Running => "JOB_STATE_RUNNING",
            JobState::Done => "JOB_STATE_DONE",
            JobState::Failed => "JOB_STATE_FAILED",
            JobState::Cancelled => "JOB_STATE_CANCELLED",
            JobState::Updated => "JOB_STATE_UPDATED",
            JobState::Draining => "JOB_STATE_DRAINING",
            JobState::Drained => "JOB_STATE_DRAINED",
            JobState::Pending => "JOB_STATE_PENDING",
            JobState::Cancelling => "JOB_STATE_CANCELLING",
            JobState::Queued => "JOB_STATE_QUEUED",
            JobState::ResourceCleaningUp => "JOB_STATE_RESOURCE_CLEANING_UP",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown Dataflow job state: {}", s))
    }
}

impl Serialize for JobState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Environment the template's workers run in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEnvironment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub temp_location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<i64>,
}

/// Body of `projects.templates.create`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobFromTemplateRequest {
    pub job_name: String,
    pub gcs_path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<RuntimeEnvironment>,
}

/// The subset of the Dataflow `Job` resource this crate reads or writes.
///
/// The state fields stay plain strings so states this crate does not know
/// about never fail a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_state: Option<String>,
}

impl Job {
    /// Update body that only asks for a lifecycle transition
    pub fn with_requested_state(state: JobState) -> Self {
        Self {
            requested_state: Some(state.as_str().to_string()),
            ..Self::default()
        }
    }
}

/// The remote calls the job resource performs
#[async_trait]
pub trait DataflowApi: Send + Sync {
    /// Launch a job from a classic template; the response carries the new job id
    async fn create_job_from_template(
        &self,
        project: &str,
        request: &CreateJobFromTemplateRequest,
    ) -> Result<Job>;

    async fn get_job(&self, project: &str, job_id: &str) -> Result<Job>;

    async fn update_job(&self, project: &str, job_id: &str, job: &Job) -> Result<Job>;
}

#[async_trait]
impl DataflowApi for GcpClient {
    async fn create_job_from_template(
        &self,
        project: &str,
        request: &CreateJobFromTemplateRequest,
    ) -> Result<Job> {
        let url = self.dataflow_templates_url(project);
        let body = serde_json::to_value(request)?;
        let response = self.post(&url, Some(&body)).await?;
        serde_json::from_value(response).context("Unexpected templates.create response")
    }

    async fn get_job(&self, project: &str, job_id: &str) -> Result<Job> {
        let url = self.dataflow_job_url(project, job_id);
        let response = self.get(&url).await?;
        serde_json::from_value(response).context("Unexpected jobs.get response")
    }

    async fn update_job(&self, project: &str, job_id: &str, job: &Job) -> Result<Job> {
        let url = self.dataflow_job_url(project, job_id);
        let body = serde_json::to_value(job)?;
        let response = self.put(&url, &body).await?;
        if response.is_null() {
            return Ok(Job::default());
        }
        serde_json::from_value(response).context("Unexpected jobs.update response")
    }
}
