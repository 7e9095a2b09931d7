//! Serializable picture of one project and everything its phases touch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::domain::models::{Project, ProjectLink, Resource, Review, ScreeningResult, Submission, Upload};

/// A parent project referenced through a link, carried along so the parent
/// gate can be evaluated offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedProject {
    #[serde(flatten)]
    pub link: ProjectLink,
    #[serde(default)]
    pub project: Option<Project>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingTerms {
    pub project_id: Uuid,
    pub external_id: String,
}

/// Workflow snapshot, the file format of the command-line tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSnapshot {
    pub project: Project,
    pub parents: Vec<LinkedProject>,
    pub resources: Vec<Resource>,
    pub reviews: Vec<Review>,
    pub submissions: Vec<Submission>,
    /// Uploads that are not submissions (test cases, final fixes, documents)
    pub uploads: Vec<Upload>,
    pub screening: Vec<ScreeningResult>,
    /// Minimum passing score per scorecard id
    pub scorecards: BTreeMap<String, f64>,
    /// External ids subscribed to timeline notifications
    pub subscribers: Vec<String>,
    pub pending_terms: Vec<PendingTerms>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot: {0}")]
    Format(#[from] serde_yaml::Error),
}

impl WorkflowSnapshot {
    pub fn from_yaml(content: &str) -> Result<Self, SnapshotError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String, SnapshotError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_yaml()?).map_err(|source| SnapshotError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}
