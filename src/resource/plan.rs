//! Replacement planning
//!
//! Every declared field is write-once, so any difference between the
//! declaration and the recorded configuration means destroy then create.

use super::schema::JobConfig;
use super::state::ResourceRecord;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Nothing tracked yet
    Create,
    /// Tracked job differs from the declaration in `fields`
    Replace { fields: Vec<&'static str> },
    /// Tracked job matches; only `state` needs refreshing
    Refresh,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Create => write!(f, "create"),
            Plan::Replace { fields } => write!(f, "replace ({} changed)", fields.join(", ")),
            Plan::Refresh => write!(f, "no changes"),
        }
    }
}

/// Names of the top-level fields that differ between two declarations
pub fn changed_fields(old: &JobConfig, new: &JobConfig) -> Vec<&'static str> {
    let mut fields = Vec::new();

    if old.name != new.name {
        fields.push("name");
    }
    if old.project != new.project {
        fields.push("project");
    }
    if old.template_gcs_path != new.template_gcs_path {
        fields.push("template_gcs_path");
    }
    if old.environment != new.environment {
        fields.push("environment");
    }
    if old.parameters != new.parameters {
        fields.push("parameters");
    }
    if old.on_delete != new.on_delete {
        fields.push("on_delete");
    }

    fields
}

pub fn plan(declared: &JobConfig, record: &ResourceRecord) -> Plan {
    if !record.is_tracked() {
        return Plan::Create;
    }

    // A record without a stored declaration (e.g. hand-written state) is
    // taken as matching
    let Some(current) = &record.config else {
        return Plan::Refresh;
    };

    let fields = changed_fields(current, declared);
    if fields.is_empty() {
        Plan::Refresh
    } else {
        Plan::Replace { fields }
    }
}
