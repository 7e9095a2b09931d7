//! Project domain model.
//!
//! A project owns the ordered phase sequence and a free-form property bag.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::phase::{Phase, PhaseType};

/// Project property keys read and written by the phase handlers.
pub mod properties {
    pub const WINNER_EXTERNAL_REFERENCE_ID: &str = "Winner External Reference ID";
    pub const RUNNER_UP_EXTERNAL_REFERENCE_ID: &str = "Runner-up External Reference ID";
    pub const REQUIRES_OTHER_FIXES: &str = "Requires Other Fixes";
    pub const POST_MORTEM_REQUIRED: &str = "Post-Mortem Required";
    pub const APPROVAL_REQUIRED: &str = "Approval Required";
    pub const PROJECT_NAME: &str = "Project Name";
    pub const PROJECT_VERSION: &str = "Project Version";
    pub const PROJECT_CATEGORY: &str = "Project Category";
}

/// Status of a project as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
    Cancelled,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Deleted => "deleted",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

/// Link from a project to one of its parent projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLink {
    pub parent_id: Uuid,
    /// When set, the child may run while the parent is still in progress.
    #[serde(default)]
    pub allow_overlap: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

impl Project {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: ProjectStatus::Active,
            properties: BTreeMap::new(),
            phases: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn index_of(&self, phase_id: Uuid) -> Option<usize> {
        self.phases.iter().position(|p| p.id == phase_id)
    }

    pub fn phase(&self, phase_id: Uuid) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == phase_id)
    }

    pub fn phase_mut(&mut self, phase_id: Uuid) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|p| p.id == phase_id)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Case-insensitive `"true"` check used by the optional-phase flags.
    pub fn property_is_true(&self, key: &str) -> bool {
        self.property(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn has_phase_of_type(&self, phase_type: PhaseType) -> bool {
        self.phases.iter().any(|p| p.phase_type == phase_type)
    }

    pub fn last_phase_of_type(&self, phase_type: PhaseType) -> Option<&Phase> {
        self.phases.iter().rev().find(|p| p.phase_type == phase_type)
    }

    pub fn phase_types(&self) -> Vec<PhaseType> {
        self.phases.iter().map(|p| p.phase_type).collect()
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}
