//! Per event filter user queries.
//!
//! Each [`EventFilter`] compiles to one `SELECT` producing a `_user` row per identified
//! user that did a matching event. Search and segment queries union these together.

use std::sync::Arc;

use common::query::Aggregation;
use common::query::EventFilter;
use common::query::Operator;
use common::query::Timeframe;
use common::query::Value;
use common::types::has_field;
use common::types::COLUMN_DEVICE_ID;
use common::types::COLUMN_TIME;
use common::types::COLUMN_USER;
use common::types::TABLE_ANONYMOUS_ID_MAPPING;
use common::validation::check_collection;
use metadata::metastore;
use tracing::trace;

use crate::error::QueryError;
use crate::sql::filter_to_sql;
use crate::sql::Clause;
use crate::sql::Ident;
use crate::sql::Join;
use crate::sql::JoinKind;
use crate::sql::Relation;
use crate::sql::Select;
use crate::sql::SelectItem;
use crate::sql::SqlExpr;
use crate::sql::TableName;
use crate::Result;

const ALIAS_COLLECTION: &str = "collection";
const ALIAS_MAPPING: &str = "mapping";
const COLUMN_ID: &str = "id";

fn collection_col(name: &'static str) -> SqlExpr {
    SqlExpr::column(Some(Ident::system(ALIAS_COLLECTION)), Ident::system(name))
}

fn mapping_col(name: &'static str) -> SqlExpr {
    SqlExpr::column(Some(Ident::system(ALIAS_MAPPING)), Ident::system(name))
}

/// Output column of every filter query.
pub fn user_column() -> SqlExpr {
    SqlExpr::column(None, Ident::system(COLUMN_USER))
}

pub struct EventFilterQueryBuilder {
    enable_user_mapping: bool,
    metastore: Arc<dyn metastore::Provider>,
}

impl EventFilterQueryBuilder {
    pub fn new(enable_user_mapping: bool, metastore: Arc<dyn metastore::Provider>) -> Self {
        Self {
            enable_user_mapping,
            metastore,
        }
    }

    /// Builds the filter query reading from the collection itself.
    pub fn build(&self, project: &str, filter: &EventFilter) -> Result<Select> {
        let table = TableName::from(Ident::new(&filter.collection, "collection")?);
        self.build_from(project, filter, table)
    }

    /// Same as [`Self::build`], rendered.
    pub fn build_sql(&self, project: &str, filter: &EventFilter) -> Result<String> {
        Ok(self.build(project, filter)?.to_string())
    }

    /// Builds the filter query reading events from `table`, which must refer to the
    /// filter's collection.
    pub fn build_from(&self, project: &str, filter: &EventFilter, table: TableName) -> Result<Select> {
        check_collection(&filter.collection)?;
        // mapping mode also requires `_device_id`, the coalesce and join reference it
        let user_mapping =
            self.enable_user_mapping && self.has_device_id(project, &filter.collection)?;

        let projection = if user_mapping {
            SelectItem::aliased(
                SqlExpr::Coalesce(vec![
                    mapping_col(COLUMN_USER),
                    collection_col(COLUMN_USER),
                    collection_col(COLUMN_DEVICE_ID),
                ]),
                Ident::system(COLUMN_USER),
            )
        } else {
            SelectItem::new(collection_col(COLUMN_USER))
        };

        let mut select = Select::new()
            .with(Clause::Projection(projection))
            .with(Clause::From(Relation::table(
                table,
                Some(Ident::system(ALIAS_COLLECTION)),
            )));

        if user_mapping {
            select.push(Clause::Join(Join {
                kind: JoinKind::Left,
                relation: Relation::table(
                    Ident::system(TABLE_ANONYMOUS_ID_MAPPING).into(),
                    Some(Ident::system(ALIAS_MAPPING)),
                ),
                on: collection_col(COLUMN_USER).is_null().and(SqlExpr::binary(
                    mapping_col(COLUMN_ID),
                    Operator::Eq,
                    collection_col(COLUMN_DEVICE_ID),
                )),
            }));
        }

        select.push(Clause::Predicate(collection_col(COLUMN_USER).is_not_null()));
        if let Some(expr) = &filter.filter {
            select.push(Clause::Predicate(filter_to_sql(expr)?));
        }
        if let Some(timeframe) = &filter.timeframe {
            for predicate in timeframe_predicates(timeframe) {
                select.push(Clause::Predicate(predicate));
            }
        }

        if let Some(aggregation) = &filter.aggregation {
            if user_mapping {
                select.push(Clause::GroupBy(mapping_col(COLUMN_USER)));
                select.push(Clause::GroupBy(collection_col(COLUMN_USER)));
                select.push(Clause::GroupBy(collection_col(COLUMN_DEVICE_ID)));
            } else {
                select.push(Clause::GroupBy(collection_col(COLUMN_USER)));
            }

            for having in having_predicates(aggregation)? {
                select.push(Clause::Having(having));
            }
        }

        trace!(project, collection = %filter.collection, user_mapping, "event filter query built");

        Ok(select)
    }

    fn has_device_id(&self, project: &str, collection: &str) -> Result<bool> {
        let fields = self.metastore.get_collection(project, collection)?;
        Ok(has_field(&fields, COLUMN_DEVICE_ID))
    }
}

fn timeframe_predicates(timeframe: &Timeframe) -> Vec<SqlExpr> {
    let mut out = Vec::with_capacity(2);
    if let Some(start) = timeframe.start {
        out.push(SqlExpr::binary(
            collection_col(COLUMN_TIME),
            Operator::Gt,
            SqlExpr::Timestamp(start),
        ));
    }
    if let Some(end) = timeframe.end {
        out.push(SqlExpr::binary(
            collection_col(COLUMN_TIME),
            Operator::Lt,
            SqlExpr::Timestamp(end),
        ));
    }
    out
}

/// `minimum` is inclusive, `maximum` exclusive.
fn having_predicates(aggregation: &Aggregation) -> Result<Vec<SqlExpr>> {
    let target = if aggregation.targets_user() {
        collection_col(COLUMN_USER)
    } else {
        let field = aggregation.field.as_deref().ok_or_else(|| {
            QueryError::BadRequest(format!(
                "aggregation {} requires a field",
                aggregation.typ
            ))
        })?;
        SqlExpr::column(
            Some(Ident::system(ALIAS_COLLECTION)),
            Ident::new(field, "aggregation field")?,
        )
    };
    let aggregate = SqlExpr::aggregate(aggregation.typ, target);

    let mut out = Vec::with_capacity(2);
    if let Some(minimum) = aggregation.minimum {
        out.push(SqlExpr::binary(
            aggregate.clone(),
            Operator::GtEq,
            SqlExpr::Literal(Value::Int64(minimum)),
        ));
    }
    if let Some(maximum) = aggregation.maximum {
        out.push(SqlExpr::binary(
            aggregate,
            Operator::Lt,
            SqlExpr::Literal(Value::Int64(maximum)),
        ));
    }

    Ok(out)
}
