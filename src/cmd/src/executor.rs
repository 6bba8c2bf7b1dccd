use async_trait::async_trait;
use query::QueryExecutor;
use query::QueryResult;
use tracing::info;

/// Prints statements instead of running them.
pub struct DryRunExecutor {
    engine: &'static str,
}

impl DryRunExecutor {
    pub fn new(engine: &'static str) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl QueryExecutor for DryRunExecutor {
    async fn execute(&self, project: &str, sql: &str) -> query::Result<QueryResult> {
        info!(engine = self.engine, project, "executing query");
        println!("-- {} ({project})\n{sql};", self.engine);
        Ok(QueryResult::empty())
    }

    async fn execute_raw(&self, sql: &str) -> query::Result<QueryResult> {
        info!(engine = self.engine, "executing statement");
        println!("-- {}\n{sql};", self.engine);
        Ok(QueryResult::empty())
    }
}
