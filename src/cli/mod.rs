mod commands;
pub mod error;
pub mod utils;


use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::commands::query::SelectArgs;
use crate::cli::error::CliResult;
use crate::config::StoreConfig;
use crate::store::{Filter, Match, OrderBy, PostgrestStore, TableAdapter, TableStore};
use crate::tracker::{Id, ProjectPatch, Tracker};

#[derive(Parser)]
#[command(name = "trk")]
#[command(author, version, about = "Project and milestone tracker", long_about = None)]
pub struct Cli {
    /// Override the store URL (default: TRACKER_URL env or http://localhost:54321)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Override the API key (default: TRACKER_API_KEY env)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Per-call timeout in seconds (default: TRACKER_TIMEOUT_SECS env or 30)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Milestone management commands
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommands,
    },
    /// Select raw rows from any table
    Query {
        /// Table name
        table: String,
        /// Column projection (default: *)
        #[arg(long)]
        columns: Option<String>,
        /// Exact match, repeatable (column=value)
        #[arg(long = "match")]
        matches: Vec<Match>,
        /// Filter, repeatable (op:column:value, not.op:column:value)
        #[arg(long = "filter")]
        filters: Vec<Filter>,
        /// Disjunction in store syntax (e.g. status.eq.1,name.like.*Tracker*)
        #[arg(long)]
        or: Option<String>,
        /// Ordering (column, column.asc or column.desc)
        #[arg(long)]
        order: Option<OrderBy>,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List projects with progress
    List {
        /// Only projects whose name contains this text (or matches a % pattern)
        #[arg(long)]
        search: Option<String>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Create a project
    Add {
        /// Project name
        name: String,
        /// Project description
        description: String,
    },
    /// Update a project's name and/or description
    Edit {
        /// Project ID
        id: Id,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a project and its milestones
    Delete {
        /// Project ID
        id: Id,
        /// Confirm deletion
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum MilestoneCommands {
    /// List a project's milestones
    List {
        /// Project ID
        project_id: Id,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Add a milestone to a project
    Add {
        /// Project ID
        project_id: Id,
        /// Milestone name
        name: String,
        /// Due date (YYYY-MM-DD)
        due_date: String,
    },
    /// Toggle a milestone between completed and pending
    Toggle {
        /// Milestone ID
        id: Id,
    },
}

/// Initialize tracing subscriber with env filter, logging to stderr
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "project_tracker=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        // Show help when no command provided
        let _ = Cli::parse_from(["trk", "--help"]);
        return Ok(());
    };

    init_tracing();

    let config = StoreConfig::resolve(cli.url, cli.api_key, cli.timeout);
    let store = PostgrestStore::new(&config)?;
    let tracker = Tracker::new(TableAdapter::new(store).with_timeout(config.timeout));

    let output = dispatch(&tracker, command).await?;
    println!("{}", output);
    Ok(())
}

async fn dispatch<S: TableStore>(tracker: &Tracker<S>, command: Commands) -> CliResult<String> {
    match command {
        Commands::Project { command } => match command {
            ProjectCommands::List { search, format } => {
                commands::project::list_projects(tracker, search.as_deref(), &format).await
            }
            ProjectCommands::Add { name, description } => {
                commands::project::create_project(tracker, &name, &description).await
            }
            ProjectCommands::Edit {
                id,
                name,
                description,
            } => {
                commands::project::update_project(tracker, id, ProjectPatch { name, description })
                    .await
            }
            ProjectCommands::Delete { id, force } => {
                commands::project::delete_project(tracker, id, force).await
            }
        },
        Commands::Milestone { command } => match command {
            MilestoneCommands::List { project_id, format } => {
                commands::milestone::list_milestones(tracker, project_id, &format).await
            }
            MilestoneCommands::Add {
                project_id,
                name,
                due_date,
            } => commands::milestone::add_milestone(tracker, project_id, &name, &due_date).await,
            MilestoneCommands::Toggle { id } => {
                commands::milestone::toggle_milestone(tracker, id).await
            }
        },
        Commands::Query {
            table,
            columns,
            matches,
            filters,
            or,
            order,
        } => {
            let args = SelectArgs {
                columns,
                matches,
                filters,
                or,
                order,
            };
            commands::query::select_rows(tracker.data(), &table, args).await
        }
    }
}
