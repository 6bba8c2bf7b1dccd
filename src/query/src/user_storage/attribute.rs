use common::query::Sorting;
use common::types::SCHEMA_USERS;

use crate::sql::filter_to_sql;
use crate::sql::Clause;
use crate::sql::Ident;
use crate::sql::OrderBy;
use crate::sql::Relation;
use crate::sql::Select;
use crate::sql::SelectItem;
use crate::sql::SqlExpr;
use crate::sql::TableName;
use crate::user_storage::SearchUsersRequest;
use crate::Result;

/// User table of a project, optionally reached through a catalog of the event engine.
pub fn user_table(project: &str, connector: Option<&str>) -> Result<TableName> {
    let mut parts = Vec::with_capacity(3);
    if let Some(connector) = connector {
        parts.push(Ident::new(connector, "user connector")?);
    }
    parts.push(Ident::system(SCHEMA_USERS));
    parts.push(Ident::new(project, "project")?);

    Ok(TableName::new(parts))
}

pub fn order_by(sorting: &Sorting) -> Result<OrderBy> {
    Ok(OrderBy {
        expr: SqlExpr::column(None, Ident::new(&sorting.column, "sort column")?),
        order: sorting.order,
    })
}

/// Appends sorting and pagination shared by every search path.
pub fn paginate(mut select: Select, req: &SearchUsersRequest) -> Result<Select> {
    if let Some(sorting) = &req.sorting {
        select.push(Clause::OrderBy(order_by(sorting)?));
    }
    select.push(Clause::Limit(req.limit));
    if let Some(offset) = req.offset.filter(|v| *v > 0) {
        select.push(Clause::Offset(offset));
    }

    Ok(select)
}

/// Search over user attributes, with extra predicates ANDed in.
pub struct AttributeSearch;

impl AttributeSearch {
    pub fn build(
        table: TableName,
        req: &SearchUsersRequest,
        predicates: Vec<SqlExpr>,
    ) -> Result<Select> {
        let mut select = Select::new();
        for column in req.columns.iter() {
            select.push(Clause::Projection(SelectItem::new(SqlExpr::column(
                None,
                Ident::new(column, "column")?,
            ))));
        }
        select.push(Clause::From(Relation::table(table, None)));

        if let Some(filter) = &req.filter {
            select.push(Clause::Predicate(filter_to_sql(filter)?));
        }
        for predicate in predicates {
            select.push(Clause::Predicate(predicate));
        }

        paginate(select, req)
    }
}
