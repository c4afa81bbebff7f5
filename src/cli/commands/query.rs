use crate::cli::error::{CliError, CliResult};
use crate::store::{Filter, Match, OrderBy, SelectOptions, TableAdapter, TableStore};
use serde_json::Value;

/// Raw select parameters as given on the command line
#[derive(Debug, Default)]
pub struct SelectArgs {
    pub columns: Option<String>,
    pub matches: Vec<Match>,
    pub filters: Vec<Filter>,
    pub or: Option<String>,
    pub order: Option<OrderBy>,
}

impl SelectArgs {
    fn into_options(self) -> CliResult<SelectOptions> {
        let mut options = SelectOptions::new();
        if let Some(columns) = self.columns {
            if columns.trim().is_empty() {
                return Err(CliError::InvalidArgument {
                    message: "--columns must not be empty".to_string(),
                });
            }
            options = options.columns(columns);
        }
        for matching in self.matches {
            options = options.matching(matching);
        }
        for filter in self.filters {
            options = options.filter(filter);
        }
        if let Some(expression) = self.or {
            options = options.filter(Filter::Or(expression));
        }
        if let Some(order) = self.order {
            options = options.order_by(order);
        }
        Ok(options)
    }
}

/// Run an arbitrary select against a table and print the rows as JSON
pub async fn select_rows<S: TableStore>(
    adapter: &TableAdapter<S>,
    table: &str,
    args: SelectArgs,
) -> CliResult<String> {
    let rows: Vec<Value> = adapter.select(table, args.into_options()?).await?;
    Ok(serde_json::to_string_pretty(&rows)?)
}
