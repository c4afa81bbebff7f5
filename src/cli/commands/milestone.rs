use tabled::{Table, Tabled};

use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, format_due_date, progress_bar, truncate_with_ellipsis};
use crate::store::TableStore;
use crate::tracker::{Id, Milestone, MilestoneStatus, NewMilestone, Progress, Tracker};

#[derive(Tabled)]
struct MilestoneDisplay {
    #[tabled(rename = "ID")]
    id: Id,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Milestone> for MilestoneDisplay {
    fn from(milestone: &Milestone) -> Self {
        let marker = match milestone.status {
            MilestoneStatus::Completed => "✓",
            MilestoneStatus::Pending => "○",
            MilestoneStatus::Overdue => "!",
        };
        Self {
            id: milestone.id,
            name: truncate_with_ellipsis(&milestone.name, 40),
            due: format_due_date(&milestone.due_date),
            status: format!("{} {}", marker, milestone.status.label()),
        }
    }
}

/// List a project's milestones ordered by due date
pub async fn list_milestones<S: TableStore>(
    tracker: &Tracker<S>,
    project_id: Id,
    format: &str,
) -> CliResult<String> {
    let project = tracker.project(project_id).await?;
    let milestones = tracker.project_milestones(project_id).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&milestones)?),
        _ => {
            if milestones.is_empty() {
                return Ok(format!("No milestones for project: {}", project.name));
            }
            let progress = Progress::of(&milestones);
            let display: Vec<MilestoneDisplay> = milestones.iter().map(|m| m.into()).collect();
            let mut table = Table::new(display);
            apply_table_style(&mut table);
            Ok(format!(
                "{} ({}/{})  {}\n{}",
                project.name,
                progress.completed,
                progress.total,
                progress_bar(progress.percent),
                table
            ))
        }
    }
}

/// Add a milestone to a project
pub async fn add_milestone<S: TableStore>(
    tracker: &Tracker<S>,
    project_id: Id,
    name: &str,
    due_date: &str,
) -> CliResult<String> {
    tracker
        .add_milestone(
            project_id,
            &NewMilestone {
                name: name.to_string(),
                due_date: due_date.to_string(),
            },
        )
        .await?;
    Ok(format!(
        "✓ Added milestone: {} (due {})",
        name.trim(),
        format_due_date(due_date.trim())
    ))
}

/// Toggle a milestone between completed and pending
pub async fn toggle_milestone<S: TableStore>(tracker: &Tracker<S>, id: Id) -> CliResult<String> {
    let milestone = tracker.toggle_milestone(id).await?;
    Ok(format!(
        "✓ Milestone {} is now {}: {}",
        milestone.id,
        milestone.status.label(),
        milestone.name
    ))
}
