use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::config;
use common::query::EventFilter;
use common::types::has_field;
use common::types::COLUMN_USER;
use common::validation::check_collection;
use metadata::materialized_views;
use metadata::materialized_views::MaterializedView;
use metadata::metastore;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::QueryError;
use crate::event_filter::user_column;
use crate::event_filter::EventFilterQueryBuilder;
use crate::executor::QueryExecutor;
use crate::sql::Clause;
use crate::sql::Ident;
use crate::sql::Query;
use crate::sql::Relation;
use crate::sql::Select;
use crate::sql::SelectItem;
use crate::sql::SqlExpr;
use crate::sql::TableName;
use crate::user_storage::attribute::paginate;
use crate::user_storage::attribute::user_table;
use crate::user_storage::attribute::AttributeSearch;
use crate::user_storage::CreateSegmentRequest;
use crate::user_storage::Dependencies;
use crate::user_storage::SearchUsersRequest;
use crate::user_storage::UserStorage;
use crate::QueryResult;
use crate::Result;

pub const CREATE_USERS_SCHEMA: &str = "CREATE SCHEMA IF NOT EXISTS users";

const ALIAS_COLLECTION: &str = "collection";
const ALIAS_SUBQUERY: &str = "t";
const COLUMN_ID: &str = "id";

/// User storage backed by the distributed event engine.
///
/// Event filtered searches and segments run on the event engine. Searches by user
/// attributes go to the user table; when they also carry event filters, the user table
/// is read through the engine's user connector so both sides meet in one query.
///
/// Construction does no I/O, [`PrestoUserStorage::init`] must be awaited before use.
pub struct PrestoUserStorage {
    config: config::UserStorage,
    executor: Arc<dyn QueryExecutor>,
    user_executor: Arc<dyn QueryExecutor>,
    metastore: Arc<dyn metastore::Provider>,
    materialized_views: Arc<dyn materialized_views::Provider>,
    filters: EventFilterQueryBuilder,
}

impl PrestoUserStorage {
    pub fn new(config: config::UserStorage, deps: Dependencies) -> Self {
        let filters =
            EventFilterQueryBuilder::new(config.enable_user_mapping, deps.metastore.clone());

        Self {
            config,
            executor: deps.event_executor,
            user_executor: deps.user_executor,
            metastore: deps.metastore,
            materialized_views: deps.materialized_views,
            filters,
        }
    }

    /// Creates the users schema.
    pub async fn init(&self) -> Result<()> {
        match self.user_executor.execute_raw(CREATE_USERS_SCHEMA).await {
            Ok(_) => {
                info!("users schema ready");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "unable to create schema for users");
                Err(QueryError::Init(format!(
                    "unable to create schema for users: {err}"
                )))
            }
        }
    }

    pub fn filter_query(&self, project: &str, filter: &EventFilter) -> Result<Select> {
        self.filters.build(project, filter)
    }

    /// `id IN (<filter query>)` per filter, for searches that start from the user table.
    pub fn event_filter_predicates(
        &self,
        project: &str,
        filters: &[EventFilter],
    ) -> Result<Vec<SqlExpr>> {
        filters
            .iter()
            .map(|f| -> Result<SqlExpr> {
                let table = TableName::new(vec![
                    Ident::new(project, "project")?,
                    Ident::new(&f.collection, "collection")?,
                ]);
                let query = self.filters.build_from(project, f, table)?;
                Ok(SqlExpr::column(None, Ident::system(COLUMN_ID)).in_subquery(query.into()))
            })
            .collect()
    }

    pub fn user_table(&self, project: &str, event_filter_active: bool) -> Result<TableName> {
        if event_filter_active {
            user_table(project, Some(&self.config.user_connector))
        } else {
            user_table(project, None)
        }
    }

    /// `SELECT DISTINCT _user AS <alias> FROM (<filter queries>) AS t`
    fn distinct_users(branches: Vec<Query>, alias: Ident) -> Result<Select> {
        let union = Query::union_all(branches)?;

        Ok(Select::new()
            .distinct()
            .with(Clause::Projection(SelectItem::aliased(user_column(), alias)))
            .with(Clause::From(Relation::subquery(
                union,
                Some(Ident::system(ALIAS_SUBQUERY)),
            ))))
    }

    fn event_filter_branches(&self, project: &str, filters: &[EventFilter]) -> Result<Vec<Query>> {
        filters
            .iter()
            .map(|f| -> Result<Query> { Ok(self.filters.build(project, f)?.into()) })
            .collect()
    }

    /// Every collection of the project that carries users.
    fn user_collections(&self, project: &str) -> Result<Vec<String>> {
        let collections: BTreeMap<_, _> = self.metastore.get_collections(project)?;
        Ok(collections
            .into_iter()
            .filter(|(_, fields)| has_field(fields, COLUMN_USER))
            .map(|(name, _)| name)
            .collect())
    }

    fn collection_branch(collection: &str) -> Result<Query> {
        let user = SqlExpr::column(
            Some(Ident::system(ALIAS_COLLECTION)),
            Ident::system(COLUMN_USER),
        );
        let select = Select::new()
            .with(Clause::Projection(SelectItem::new(user.clone())))
            .with(Clause::From(Relation::table(
                Ident::new(collection, "collection")?.into(),
                Some(Ident::system(ALIAS_COLLECTION)),
            )))
            .with(Clause::Predicate(user.is_not_null()));

        Ok(select.into())
    }

    /// Builds the search query over events. `None` when the project has nothing to
    /// search in.
    pub fn search_query(&self, project: &str, req: &SearchUsersRequest) -> Result<Option<Select>> {
        let identifier = Ident::new(&self.config.identifier_column, "identifier column")?;

        let branches = if !req.event_filters.is_empty() {
            self.event_filter_branches(project, &req.event_filters)?
        } else {
            let collections = self.user_collections(project)?;
            if collections.is_empty() {
                return Ok(None);
            }
            collections
                .iter()
                .map(|c| Self::collection_branch(c))
                .collect::<Result<Vec<_>>>()?
        };

        let select = Self::distinct_users(branches, identifier)?;
        Ok(Some(paginate(select, req)?))
    }

    /// The segment query: distinct users of all event filters as `id`.
    pub fn segment_query(&self, project: &str, req: &CreateSegmentRequest) -> Result<Select> {
        if req.filter.is_some() || req.event_filters.is_empty() {
            return Err(QueryError::BadRequest(
                "user segment must have at least one event filter".to_string(),
            ));
        }

        let branches = self.event_filter_branches(project, &req.event_filters)?;
        Self::distinct_users(branches, Ident::system(COLUMN_ID))
    }

    async fn search_attributes(
        &self,
        project: &str,
        req: &SearchUsersRequest,
    ) -> Result<QueryResult> {
        let event_filter_active = !req.event_filters.is_empty();
        let predicates = self.event_filter_predicates(project, &req.event_filters)?;
        let table = self.user_table(project, event_filter_active)?;
        let sql = AttributeSearch::build(table, req, predicates)?.to_string();

        debug!(project, sql = %sql, event_filter_active, "searching users by attributes");
        if event_filter_active {
            self.executor.execute(project, &sql).await
        } else {
            self.user_executor.execute(project, &sql).await
        }
    }
}

#[async_trait]
impl UserStorage for PrestoUserStorage {
    async fn search_users(&self, project: &str, req: SearchUsersRequest) -> Result<QueryResult> {
        if req.filter.is_some() {
            return self.search_attributes(project, &req).await;
        }

        let sql = match self.search_query(project, &req)? {
            None => {
                debug!(project, "no collection carries users, nothing to search");
                return Ok(QueryResult::empty());
            }
            Some(select) => select.to_string(),
        };

        debug!(project, sql = %sql, "searching users");
        self.executor.execute(project, &sql).await
    }

    async fn create_segment(&self, project: &str, req: CreateSegmentRequest) -> Result<()> {
        check_collection(&req.table_name)?;
        let query = self.segment_query(project, &req)?.to_string();

        info!(project, segment = %req.name, table = %req.table_name, "creating segment");
        let view = MaterializedView {
            description: Some(format!("Users who did {} event", req.table_name)),
            table_name: req.table_name,
            name: req.name,
            query,
            update_interval: req.interval,
            incremental: false,
            options: BTreeMap::new(),
        };

        Ok(self.materialized_views.create(project, view).await?)
    }
}
