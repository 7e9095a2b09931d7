//! Notification field bag.
//!
//! Key names are shared with existing notification templates and must stay
//! verbatim.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder for absent or blank values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Field keys understood by notification templates.
pub mod fields {
    pub const N_SUBMITTERS: &str = "N_SUBMITTERS";
    pub const SUBMITTER: &str = "SUBMITTER";
    pub const SUBMITTER_HANDLE: &str = "SUBMITTER_HANDLE";
    pub const SUBMITTER_RELIABILITY: &str = "SUBMITTER_RELIABILITY";
    pub const SUBMITTER_RATING: &str = "SUBMITTER_RATING";
    pub const SUBMITTER_SCORE: &str = "SUBMITTER_SCORE";
    pub const SUBMITTER_RESULT: &str = "SUBMITTER_RESULT";
    pub const SUBMITTER_PRE_APPEALS_SCORE: &str = "SUBMITTER_PRE_APPEALS_SCORE";
    pub const SUBMITTER_POST_APPEALS_SCORE: &str = "SUBMITTER_POST_APPEALS_SCORE";
    pub const NEED_PRIMARY_SCREENER: &str = "NEED_PRIMARY_SCREENER";
    pub const NO_SCREENING_PASS: &str = "NO_SCREENING_PASS";
    pub const N_REQUIRED_REVIEWERS: &str = "N_REQUIRED_REVIEWERS";
    pub const N_REVIEWERS: &str = "N_REVIEWERS";
    pub const NEED_REVIEWER: &str = "NEED_REVIEWER";
    pub const N_AGGREGATOR: &str = "N_AGGREGATOR";
    pub const N_FINAL_REVIEWERS: &str = "N_FINAL_REVIEWERS";
    pub const N_APPROVERS: &str = "N_APPROVERS";
    pub const N_REQUIRED_APPROVERS: &str = "N_REQUIRED_APPROVERS";
    pub const NEED_APPROVER: &str = "NEED_APPROVER";
    pub const N_POST_MORTEM_REVIEWERS: &str = "N_POST_MORTEM_REVIEWERS";
    pub const N_REQUIRED_POST_MORTEM_REVIEWERS: &str = "N_REQUIRED_POST_MORTEM_REVIEWERS";
    pub const NEED_POST_MORTEM_REVIEWERS: &str = "NEED_POST_MORTEM_REVIEWERS";
    pub const N_SPECIFICATION_REVIEWERS: &str = "N_SPECIFICATION_REVIEWERS";
    pub const RESULT: &str = "RESULT";

    pub const PHASE_TIMESTAMP: &str = "PHASE_TIMESTAMP";
    pub const USER_FIRST_NAME: &str = "USER_FIRST_NAME";
    pub const USER_LAST_NAME: &str = "USER_LAST_NAME";
    pub const USER_HANDLE: &str = "USER_HANDLE";
    pub const PROJECT_NAME: &str = "PROJECT_NAME";
    pub const PROJECT_VERSION: &str = "PROJECT_VERSION";
    pub const PROJECT_CATEGORY: &str = "PROJECT_CATEGORY";
    pub const PHASE_OPERATION: &str = "PHASE_OPERATION";
    pub const PHASE_TYPE: &str = "PHASE_TYPE";
    pub const OR_LINK: &str = "OR_LINK";
}

/// Which side of a phase transition is being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOperation {
    Start,
    End,
}

impl PhaseOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    List(Vec<FieldBag>),
}

impl FieldValue {
    /// Text value, or `"N/A"` when absent or blank.
    pub fn text_or_na(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Self::Text(v.to_string()),
            _ => Self::Text(NOT_AVAILABLE.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<FieldBag>> for FieldValue {
    fn from(value: Vec<FieldBag>) -> Self {
        Self::List(value)
    }
}

/// String-keyed values handed to the notification sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldBag(BTreeMap<String, FieldValue>);

impl FieldBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
