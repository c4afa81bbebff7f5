//! Project and milestone operations on top of the table data adapter.

use chrono::NaiveDate;
use serde_json::json;
use tracing::{info, instrument};

use super::error::{TrackerError, TrackerResult};
use super::models::{
    Id, MILESTONES, Milestone, MilestoneRow, MilestoneStatus, NewMilestone, NewProject, PROJECTS,
    Progress, Project, ProjectPatch, ProjectSummary,
};
use crate::store::{Filter, Match, OrderBy, SelectOptions, TableAdapter, TableStore};

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Project tracker backed by any [`TableStore`].
pub struct Tracker<S> {
    data: TableAdapter<S>,
}

impl<S: TableStore> Tracker<S> {
    pub fn new(data: TableAdapter<S>) -> Self {
        Self { data }
    }

    /// Get the underlying adapter.
    pub fn data(&self) -> &TableAdapter<S> {
        &self.data
    }

    /// All projects, in store order.
    pub async fn projects(&self) -> TrackerResult<Vec<Project>> {
        Ok(self
            .data
            .select(PROJECTS, SelectOptions::new().columns("*"))
            .await?)
    }

    /// Projects whose name matches a case-sensitive `like` pattern.
    pub async fn search_projects(&self, pattern: &str) -> TrackerResult<Vec<Project>> {
        Ok(self
            .data
            .select(
                PROJECTS,
                SelectOptions::new().filter(Filter::like("name", pattern)),
            )
            .await?)
    }

    pub async fn project(&self, id: Id) -> TrackerResult<Project> {
        let mut rows: Vec<Project> = self
            .data
            .select(PROJECTS, SelectOptions::new().matching(Match::by("id", id)))
            .await?;
        rows.pop()
            .ok_or_else(|| TrackerError::not_found("Project", id))
    }

    #[instrument(skip(self, project), fields(name = %project.name))]
    pub async fn create_project(&self, project: &NewProject) -> TrackerResult<()> {
        let project = NewProject {
            name: require_text("name", &project.name)?,
            description: require_text("description", &project.description)?,
        };
        self.data.insert(PROJECTS, &project).await?;
        info!("project created");
        Ok(())
    }

    #[instrument(skip(self, patch))]
    pub async fn update_project(&self, id: Id, patch: &ProjectPatch) -> TrackerResult<()> {
        if patch.is_empty() {
            return Err(TrackerError::validation("nothing to update"));
        }
        let patch = ProjectPatch {
            name: patch
                .name
                .as_deref()
                .map(|n| require_text("name", n))
                .transpose()?,
            description: patch
                .description
                .as_deref()
                .map(|d| require_text("description", d))
                .transpose()?,
        };

        self.project(id).await?;
        self.data
            .update(PROJECTS, &patch, &Match::by("id", id))
            .await?;
        info!("project updated");
        Ok(())
    }

    /// Delete a project and, first, every milestone that belongs to it.
    #[instrument(skip(self))]
    pub async fn delete_project(&self, id: Id) -> TrackerResult<()> {
        self.project(id).await?;
        self.data
            .remove(MILESTONES, &Match::by("project_id", id))
            .await?;
        self.data.remove(PROJECTS, &Match::by("id", id)).await?;
        info!("project deleted");
        Ok(())
    }

    /// All milestones ordered by due date.
    pub async fn milestones(&self) -> TrackerResult<Vec<Milestone>> {
        Ok(self
            .data
            .select(
                MILESTONES,
                SelectOptions::new().order_by(OrderBy::asc("due_date")),
            )
            .await?)
    }

    /// Milestones of one project ordered by due date.
    pub async fn project_milestones(&self, project_id: Id) -> TrackerResult<Vec<Milestone>> {
        Ok(self
            .data
            .select(
                MILESTONES,
                SelectOptions::new()
                    .matching(Match::by("project_id", project_id))
                    .order_by(OrderBy::asc("due_date")),
            )
            .await?)
    }

    pub async fn milestone(&self, id: Id) -> TrackerResult<Milestone> {
        let mut rows: Vec<Milestone> = self
            .data
            .select(MILESTONES, SelectOptions::new().matching(Match::by("id", id)))
            .await?;
        rows.pop()
            .ok_or_else(|| TrackerError::not_found("Milestone", id))
    }

    /// Add a pending milestone. The due date is normalized to `YYYY-MM-DD`.
    #[instrument(skip(self, milestone), fields(name = %milestone.name))]
    pub async fn add_milestone(&self, project_id: Id, milestone: &NewMilestone) -> TrackerResult<()> {
        let name = require_text("name", &milestone.name)?;
        let due_date = NaiveDate::parse_from_str(milestone.due_date.trim(), DUE_DATE_FORMAT)
            .map_err(|e| {
                TrackerError::validation(format!(
                    "due date '{}' is not a YYYY-MM-DD date: {}",
                    milestone.due_date, e
                ))
            })?;

        self.project(project_id).await?;
        self.data
            .insert(
                MILESTONES,
                &MilestoneRow {
                    project_id,
                    name: &name,
                    due_date: due_date.format(DUE_DATE_FORMAT).to_string(),
                    status: MilestoneStatus::Pending,
                },
            )
            .await?;
        info!("milestone added");
        Ok(())
    }

    /// Flip a milestone between completed and pending; returns the new state.
    #[instrument(skip(self))]
    pub async fn toggle_milestone(&self, id: Id) -> TrackerResult<Milestone> {
        let mut milestone = self.milestone(id).await?;
        let status = milestone.status.toggled();
        self.data
            .update(MILESTONES, &json!({ "status": status }), &Match::by("id", id))
            .await?;
        milestone.status = status;
        info!(status = status.label(), "milestone toggled");
        Ok(milestone)
    }

    /// Every project with its milestones and progress.
    pub async fn overview(&self) -> TrackerResult<Vec<ProjectSummary>> {
        let projects = self.projects().await?;
        let milestones = self.milestones().await?;
        Ok(summarize(projects, milestones))
    }

    /// Overview restricted to projects matching a `like` pattern.
    pub async fn search_overview(&self, pattern: &str) -> TrackerResult<Vec<ProjectSummary>> {
        let projects = self.search_projects(pattern).await?;
        let milestones = self.milestones().await?;
        Ok(summarize(projects, milestones))
    }
}

/// Group milestones under their projects, keeping milestone order.
pub fn summarize(projects: Vec<Project>, milestones: Vec<Milestone>) -> Vec<ProjectSummary> {
    projects
        .into_iter()
        .map(|project| {
            let own: Vec<Milestone> = milestones
                .iter()
                .filter(|m| m.project_id == project.id)
                .cloned()
                .collect();
            ProjectSummary {
                progress: Progress::of(&own),
                project,
                milestones: own,
            }
        })
        .collect()
}

fn require_text(field: &str, value: &str) -> TrackerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::validation(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(trimmed.to_string())
}
