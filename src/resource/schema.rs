//! Declared job configuration
//!
//! The desired state of one Dataflow template job, deserialized once from a
//! YAML or JSON declaration and validated before anything touches the API.

use crate::gcp::dataflow::{CreateJobFromTemplateRequest, JobState, RuntimeEnvironment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Job names accepted by Dataflow
pub const JOB_NAME_PATTERN: &str = r"^[a-z]([-a-z0-9]*[a-z0-9])?$";

fn job_name_regex() -> &'static regex_lite::Regex {
    static RE: OnceLock<regex_lite::Regex> = OnceLock::new();
    RE.get_or_init(|| regex_lite::Regex::new(JOB_NAME_PATTERN).expect("job name pattern compiles"))
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid job name {0:?}: must match {pattern}", pattern = JOB_NAME_PATTERN)]
    InvalidName(String),

    #[error("invalid `on_delete` policy: {0}")]
    InvalidOnDelete(String),

    #[error("`{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse declaration: {0}")]
    Parse(String),
}

pub fn validate_job_name(name: &str) -> Result<(), SchemaError> {
    if job_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidName(name.to_string()))
    }
}

/// What happens to the remote job when the resource is destroyed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDelete {
    Cancel,
    #[default]
    Drain,
}

impl OnDelete {
    /// The lifecycle state requested from Dataflow on delete
    pub fn requested_state(self) -> JobState {
        match self {
            OnDelete::Cancel => JobState::Cancelled,
            OnDelete::Drain => JobState::Draining,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OnDelete::Cancel => "cancel",
            OnDelete::Drain => "drain",
        }
    }
}

impl FromStr for OnDelete {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cancel" => Ok(OnDelete::Cancel),
            "drain" => Ok(OnDelete::Drain),
            other => Err(SchemaError::InvalidOnDelete(other.to_string())),
        }
    }
}

impl fmt::Display for OnDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a deletion policy string to the requested-state wire value
pub fn map_on_delete(policy: &str) -> Result<&'static str, SchemaError> {
    Ok(policy.parse::<OnDelete>()?.requested_state().as_str())
}

/// The optional `environment` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobEnvironment {
    #[serde(alias = "temp_gcs_location")]
    pub temp_location: String,
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<u32>,
}

impl From<&JobEnvironment> for RuntimeEnvironment {
    fn from(env: &JobEnvironment) -> Self {
        Self {
            temp_location: env.temp_location.clone(),
            zone: env.zone.clone(),
            max_workers: env.max_workers.filter(|n| *n > 0).map(i64::from),
        }
    }
}

/// Declared configuration of a Dataflow template job.
///
/// Every field is write-once: changing any of them means destroying the job
/// and launching a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub template_gcs_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<JobEnvironment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub on_delete: OnDelete,
}

impl JobConfig {
    /// Parse a YAML declaration (JSON is valid YAML, so both work)
    pub fn from_yaml(content: &str) -> Result<Self, SchemaError> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| SchemaError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a declaration file
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        validate_job_name(&self.name)?;

        if self.template_gcs_path.trim().is_empty() {
            return Err(SchemaError::EmptyField("template_gcs_path"));
        }
        if let Some(env) = &self.environment {
            if env.temp_location.trim().is_empty() {
                return Err(SchemaError::EmptyField("environment.temp_location"));
            }
            if env.zone.trim().is_empty() {
                return Err(SchemaError::EmptyField("environment.zone"));
            }
        }

        Ok(())
    }

    /// The `templates.create` body for this declaration
    pub fn to_request(&self) -> CreateJobFromTemplateRequest {
        CreateJobFromTemplateRequest {
            job_name: self.name.clone(),
            gcs_path: self.template_gcs_path.clone(),
            parameters: self.parameters.clone(),
            environment: self.environment.as_ref().map(RuntimeEnvironment::from),
        }
    }
}
