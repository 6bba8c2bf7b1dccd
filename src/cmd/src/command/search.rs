use std::fs;
use std::path::PathBuf;

use clap::Args;
use common::query::Ordering;
use common::query::Sorting;
use common::validation::check_project;
use query::user_storage::SearchUsersRequest;
use query::user_storage::DEFAULT_LIMIT;
use tracing::debug;

use crate::command::init_user_storage;
use crate::command::parse_filter;
use crate::command::Cfg;
use crate::command::EventFilterArgs;
use crate::config::Config;
use crate::error::Result;

#[derive(Args, Clone, Debug)]
pub struct Search {
    #[command(flatten)]
    pub cfg: Cfg,
    #[arg(long)]
    pub project: String,
    /// User table columns to return
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Predicate over user attributes, e.g. "country = 'DE'"
    #[arg(long)]
    pub filter: Option<String>,
    #[command(flatten)]
    pub events: EventFilterArgs,
    #[arg(long)]
    pub sort: Option<String>,
    #[arg(long)]
    pub desc: bool,
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: u64,
    #[arg(long)]
    pub offset: Option<u64>,
    /// JSON request file, takes precedence over the flags above
    #[arg(long)]
    pub request: Option<PathBuf>,
}

impl Search {
    pub fn request(&self) -> Result<SearchUsersRequest> {
        if let Some(path) = &self.request {
            return Ok(serde_json::from_str(&fs::read_to_string(path)?)?);
        }

        let order = if self.desc {
            Ordering::Desc
        } else {
            Ordering::Asc
        };

        Ok(SearchUsersRequest {
            columns: self.columns.clone(),
            filter: parse_filter(self.filter.as_deref())?,
            event_filters: self.events.event_filters()?,
            sorting: self.sort.as_ref().map(|col| Sorting::new(col, order)),
            limit: self.limit,
            offset: self.offset,
        })
    }
}

pub async fn run(args: &Search, cfg: &Config) -> Result<()> {
    check_project(&args.project)?;
    let req = args.request()?;
    debug!(?req, "search request");

    let storage = init_user_storage(cfg).await?;
    let res = storage
        .user_storage
        .search_users(&args.project, req)
        .await?;
    println!("{}", serde_json::to_string_pretty(&res)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use common::query::EventFilter;
    use common::query::Expr;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        search: Search,
    }

    #[test]
    fn test_request_from_flags() -> Result<()> {
        let cli = Cli::parse_from([
            "search",
            "--config",
            "config.toml",
            "--project",
            "shop",
            "--columns",
            "id,email",
            "--event",
            "clicks",
            "--event",
            "purchases",
            "--event-predicate",
            "country = 'DE'",
            "--sort",
            "email",
            "--desc",
            "--offset",
            "20",
        ]);

        let req = cli.search.request()?;
        let predicate = Expr::parse("country = 'DE'")?;
        assert_eq!(req, SearchUsersRequest {
            columns: vec!["id".to_string(), "email".to_string()],
            filter: None,
            event_filters: vec![
                EventFilter::new("clicks").with_filter(predicate.clone()),
                EventFilter::new("purchases").with_filter(predicate),
            ],
            sorting: Some(Sorting::new("email", Ordering::Desc)),
            limit: DEFAULT_LIMIT,
            offset: Some(20),
        });
        Ok(())
    }

    #[test]
    fn test_invalid_filter() {
        let cli = Cli::parse_from([
            "search",
            "--config",
            "config.toml",
            "--project",
            "shop",
            "--filter",
            "country = (SELECT 1)",
        ]);
        assert!(cli.search.request().is_err());
    }
}
