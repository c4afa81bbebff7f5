//! Project and milestone records.
//!
//! Field names follow the remote tables (`projects`, `milestones`) so the
//! records pass through the adapter unchanged.

use serde::{Deserialize, Serialize};

use crate::serde_utils::null_as_default;

/// Remote table holding projects.
pub const PROJECTS: &str = "projects";
/// Remote table holding milestones.
pub const MILESTONES: &str = "milestones";

/// Server-assigned identifier.
pub type Id = i64;

/// A project groups milestones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Id,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
}

/// Fields supplied when creating a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
}

/// Partial project update (PATCH semantics - only provided fields change).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// Milestone completion state, stored as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MilestoneStatus {
    Pending = 1,
    Completed = 2,
    /// Accepted when read, never written.
    Overdue = 3,
}

impl MilestoneStatus {
    /// Status after a completion toggle.
    pub fn toggled(self) -> Self {
        match self {
            MilestoneStatus::Completed => MilestoneStatus::Pending,
            MilestoneStatus::Pending | MilestoneStatus::Overdue => MilestoneStatus::Completed,
        }
    }

    pub fn is_completed(self) -> bool {
        self == MilestoneStatus::Completed
    }

    pub fn label(self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Overdue => "overdue",
        }
    }
}

impl From<MilestoneStatus> for u8 {
    fn from(status: MilestoneStatus) -> Self {
        status as u8
    }
}

impl TryFrom<u8> for MilestoneStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MilestoneStatus::Pending),
            2 => Ok(MilestoneStatus::Completed),
            3 => Ok(MilestoneStatus::Overdue),
            other => Err(format!("invalid milestone status {}", other)),
        }
    }
}

/// A dated checkpoint within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Id,
    pub project_id: Id,
    pub name: String,
    /// `YYYY-MM-DD`; fixed width so lexicographic order is date order.
    pub due_date: String,
    pub status: MilestoneStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
}

/// Fields supplied when adding a milestone to a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMilestone {
    pub name: String,
    pub due_date: String,
}

/// Row written for a new milestone.
#[derive(Debug, Serialize)]
pub(crate) struct MilestoneRow<'a> {
    pub project_id: Id,
    pub name: &'a str,
    pub due_date: String,
    pub status: MilestoneStatus,
}

/// Completion of a set of milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent; 0 when there are no milestones.
    pub percent: u8,
}

impl Progress {
    pub fn of(milestones: &[Milestone]) -> Self {
        let total = milestones.len();
        let completed = milestones
            .iter()
            .filter(|m| m.status.is_completed())
            .count();
        let percent = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u8
        };
        Self {
            completed,
            total,
            percent,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// A project with its milestones (ordered by due date) and progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub milestones: Vec<Milestone>,
    pub progress: Progress,
}
