use tabled::{Table, Tabled};

use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::{apply_table_style, progress_bar, search_pattern, truncate_with_ellipsis};
use crate::store::TableStore;
use crate::tracker::{Id, NewProject, ProjectPatch, ProjectSummary, Tracker};

#[derive(Tabled)]
struct ProjectDisplay {
    #[tabled(rename = "ID")]
    id: Id,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Milestones")]
    milestones: String,
    #[tabled(rename = "Progress")]
    progress: String,
}

impl From<&ProjectSummary> for ProjectDisplay {
    fn from(summary: &ProjectSummary) -> Self {
        Self {
            id: summary.project.id,
            name: truncate_with_ellipsis(&summary.project.name, 40),
            description: truncate_with_ellipsis(&summary.project.description, 50),
            milestones: format!(
                "{}/{}",
                summary.progress.completed, summary.progress.total
            ),
            progress: if summary.progress.total == 0 {
                "-".to_string()
            } else {
                progress_bar(summary.progress.percent)
            },
        }
    }
}

/// List projects with milestone progress, optionally filtered by name
pub async fn list_projects<S: TableStore>(
    tracker: &Tracker<S>,
    search: Option<&str>,
    format: &str,
) -> CliResult<String> {
    let summaries = match search {
        Some(term) => tracker.search_overview(&search_pattern(term)).await?,
        None => tracker.overview().await?,
    };

    match format {
        "json" => Ok(serde_json::to_string_pretty(&summaries)?),
        _ => Ok(format_table(&summaries)),
    }
}

fn format_table(summaries: &[ProjectSummary]) -> String {
    if summaries.is_empty() {
        return "No projects found.".to_string();
    }

    let display: Vec<ProjectDisplay> = summaries.iter().map(|s| s.into()).collect();
    let mut table = Table::new(display);
    apply_table_style(&mut table);
    table.to_string()
}

/// Create a new project
pub async fn create_project<S: TableStore>(
    tracker: &Tracker<S>,
    name: &str,
    description: &str,
) -> CliResult<String> {
    tracker
        .create_project(&NewProject {
            name: name.to_string(),
            description: description.to_string(),
        })
        .await?;
    Ok(format!("✓ Created project: {}", name.trim()))
}

/// Update an existing project (PATCH semantics - only updates provided fields)
pub async fn update_project<S: TableStore>(
    tracker: &Tracker<S>,
    id: Id,
    patch: ProjectPatch,
) -> CliResult<String> {
    tracker.update_project(id, &patch).await?;
    let project = tracker.project(id).await?;
    Ok(format!("✓ Updated project: {} ({})", project.name, project.id))
}

/// Delete a project and its milestones (requires --force flag for safety)
pub async fn delete_project<S: TableStore>(
    tracker: &Tracker<S>,
    id: Id,
    force: bool,
) -> CliResult<String> {
    if !force {
        return Err(CliError::InvalidArgument {
            message: "Delete operation requires --force flag. This removes the project and all of its milestones.".to_string(),
        });
    }

    tracker.delete_project(id).await?;
    Ok(format!("✓ Deleted project: {}", id))
}
