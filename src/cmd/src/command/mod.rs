pub mod search;
pub mod segment;
pub mod user_agent;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use common::query::EventFilter;
use common::query::Expr;
use ingester::mappers::UserAgentMapper;
use ingester::EventMapper;
use ingester::Pipeline;
use metadata::materialized_views;
use metadata::metastore;
use query::user_storage;
use query::user_storage::Dependencies;
use query::UserStorage;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::executor::DryRunExecutor;

#[derive(Args, Clone, Debug)]
pub struct Cfg {
    #[arg(long)]
    pub config: PathBuf,
}

/// Event filter flags shared by `search` and `segment`.
#[derive(Args, Clone, Debug, Default)]
pub struct EventFilterArgs {
    /// Users who did an event of this collection, repeatable
    #[arg(long = "event")]
    pub events: Vec<String>,
    /// Predicate applied to every event filter, e.g. "price > 10"
    #[arg(long)]
    pub event_predicate: Option<String>,
}

impl EventFilterArgs {
    pub fn event_filters(&self) -> Result<Vec<EventFilter>> {
        let predicate = self
            .event_predicate
            .as_deref()
            .map(Expr::parse)
            .transpose()?;

        Ok(self
            .events
            .iter()
            .map(|collection| {
                let filter = EventFilter::new(collection.as_str());
                match &predicate {
                    None => filter,
                    Some(expr) => filter.with_filter(expr.clone()),
                }
            })
            .collect())
    }
}

pub fn parse_filter(filter: Option<&str>) -> Result<Option<Expr>> {
    Ok(filter.map(Expr::parse).transpose()?)
}

/// Enrichment pipeline of the configured user agent database, if any.
pub fn init_pipeline(cfg: &Config) -> Result<Option<Pipeline>> {
    let Some(path) = &cfg.data.ua_db_path else {
        return Ok(None);
    };

    let ua = UserAgentMapper::try_new(path)?;
    Ok(Some(Pipeline::new(vec![Arc::new(ua) as Arc<dyn EventMapper>])))
}

/// Metastore seeded with the configured collections, extended with the fields the
/// enrichment pipeline adds.
pub fn init_metastore(cfg: &Config) -> Result<Arc<metastore::ProviderImpl>> {
    let md = metastore::ProviderImpl::new();
    let pipeline = init_pipeline(cfg)?;

    for (project, collections) in cfg.collections.iter() {
        for (collection, fields) in collections.iter() {
            md.create_collection(project, collection, fields.clone())?;
            if let Some(pipeline) = &pipeline {
                pipeline.apply_dependency(&md, project, collection)?;
            }
        }
        info!(project, collections = collections.len(), "metastore seeded");
    }

    Ok(Arc::new(md))
}

pub struct Storage {
    pub user_storage: Arc<dyn UserStorage>,
    pub materialized_views: Arc<materialized_views::ProviderImpl>,
}

pub async fn init_user_storage(cfg: &Config) -> Result<Storage> {
    let common_cfg: common::config::Config = cfg.clone().try_into()?;
    let materialized_views = Arc::new(materialized_views::ProviderImpl::new());

    let deps = Dependencies {
        event_executor: Arc::new(DryRunExecutor::new("events")),
        user_executor: Arc::new(DryRunExecutor::new("users")),
        metastore: init_metastore(cfg)?,
        materialized_views: materialized_views.clone(),
    };
    let user_storage = user_storage::build(&common_cfg.user_storage, deps).await?;

    Ok(Storage {
        user_storage,
        materialized_views,
    })
}
