use std::fs;
use std::path::PathBuf;

use clap::Args;
use common::validation::check_project;
use query::user_storage::CreateSegmentRequest;
use tracing::info;

use crate::command::init_user_storage;
use crate::command::parse_filter;
use crate::command::Cfg;
use crate::command::EventFilterArgs;
use crate::config::Config;
use crate::error::Result;

#[derive(Args, Clone, Debug)]
pub struct Segment {
    #[command(flatten)]
    pub cfg: Cfg,
    #[arg(long)]
    pub project: String,
    #[arg(long)]
    pub name: String,
    /// Table the segment is materialized into
    #[arg(long)]
    pub table: String,
    #[arg(long)]
    pub filter: Option<String>,
    #[command(flatten)]
    pub events: EventFilterArgs,
    /// Refresh interval, e.g. "1 hour"
    #[arg(long)]
    pub interval: Option<String>,
    /// JSON request file, takes precedence over the flags above
    #[arg(long)]
    pub request: Option<PathBuf>,
}

impl Segment {
    pub fn request(&self) -> Result<CreateSegmentRequest> {
        if let Some(path) = &self.request {
            return Ok(serde_json::from_str(&fs::read_to_string(path)?)?);
        }

        Ok(CreateSegmentRequest {
            name: self.name.clone(),
            table_name: self.table.clone(),
            filter: parse_filter(self.filter.as_deref())?,
            event_filters: self.events.event_filters()?,
            interval: self
                .interval
                .as_deref()
                .map(parse_duration::parse)
                .transpose()?,
        })
    }
}

pub async fn run(args: &Segment, cfg: &Config) -> Result<()> {
    check_project(&args.project)?;
    let req = args.request()?;
    let table_name = req.table_name.clone();

    let storage = init_user_storage(cfg).await?;
    storage.user_storage.create_segment(&args.project, req).await?;

    let view = storage.materialized_views.get(&args.project, &table_name)?;
    info!(segment = %view.name, table = %view.table_name, "segment created");
    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        segment: Segment,
    }

    #[test]
    fn test_request_from_flags() -> Result<()> {
        let cli = Cli::parse_from([
            "segment",
            "--config",
            "config.toml",
            "--project",
            "shop",
            "--name",
            "Buyers",
            "--table",
            "buyers",
            "--event",
            "purchases",
            "--interval",
            "1 hour",
        ]);

        let req = cli.segment.request()?;
        assert_eq!(req.table_name, "buyers");
        assert_eq!(req.event_filters.len(), 1);
        assert_eq!(req.interval, Some(Duration::from_secs(3600)));
        Ok(())
    }
}
