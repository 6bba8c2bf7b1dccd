#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use common::config;
    use common::config::UserStorageKind;
    use common::query::AggregateFunction;
    use common::query::Aggregation;
    use common::query::EventFilter;
    use common::query::Expr;
    use common::query::Ordering;
    use common::query::Sorting;
    use common::types::FieldType;
    use common::types::SchemaField;
    use metadata::materialized_views;
    use metadata::metastore;
    use query::error::QueryError;
    use query::error::Result;
    use query::test_util::create_metastore;
    use query::test_util::RecordingExecutor;
    use query::user_storage::build;
    use query::user_storage::presto::CREATE_USERS_SCHEMA;
    use query::user_storage::CreateSegmentRequest;
    use query::user_storage::Dependencies;
    use query::user_storage::PrestoUserStorage;
    use query::user_storage::SearchUsersRequest;
    use query::user_storage::UserStorage;
    use query::QueryResult;
    use tracing_test::traced_test;

    struct Env {
        events: Arc<RecordingExecutor>,
        users: Arc<RecordingExecutor>,
        views: Arc<materialized_views::ProviderImpl>,
        md: Arc<metastore::ProviderImpl>,
    }

    impl Env {
        fn new(events: RecordingExecutor) -> Result<Self> {
            Ok(Self {
                events: Arc::new(events),
                users: Arc::new(RecordingExecutor::new()),
                views: Arc::new(materialized_views::ProviderImpl::new()),
                md: create_metastore("shop", &[
                    ("clicks", &["_user", "_device_id", "_time"]),
                    ("purchases", &["_user", "_time", "amount"]),
                    ("pageviews", &["_time", "url"]),
                ])?,
            })
        }

        fn deps(&self) -> Dependencies {
            Dependencies {
                event_executor: self.events.clone(),
                user_executor: self.users.clone(),
                metastore: self.md.clone(),
                materialized_views: self.views.clone(),
            }
        }

        fn storage(&self, enable_user_mapping: bool) -> PrestoUserStorage {
            let cfg = config::UserStorage {
                enable_user_mapping,
                ..Default::default()
            };
            PrestoUserStorage::new(cfg, self.deps())
        }
    }

    fn at_least(n: i64) -> Aggregation {
        Aggregation {
            typ: AggregateFunction::Count,
            field: None,
            minimum: Some(n),
            maximum: None,
        }
    }

    #[tokio::test]
    async fn test_search_by_event_filters() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(false);

        let req = SearchUsersRequest {
            event_filters: vec![
                EventFilter::new("clicks").with_aggregation(at_least(3)),
                EventFilter::new("purchases"),
            ],
            ..Default::default()
        };
        storage.search_users("shop", req).await?;

        let queries = env.events.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].project.as_deref(), Some("shop"));
        assert_eq!(
            queries[0].sql,
            "SELECT DISTINCT _user AS \"id\" FROM (SELECT collection._user FROM \"clicks\" AS collection WHERE collection._user IS NOT NULL GROUP BY collection._user HAVING count(collection._user) >= 3 UNION ALL SELECT collection._user FROM \"purchases\" AS collection WHERE collection._user IS NOT NULL) AS t LIMIT 100"
        );
        assert!(env.users.queries().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_one_branch_per_filter() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(false);

        for n in 1..=4 {
            let req = SearchUsersRequest {
                event_filters: (0..n).map(|_| EventFilter::new("clicks")).collect(),
                ..Default::default()
            };
            let select = storage
                .search_query("shop", &req)?
                .expect("event filters always produce a query");
            assert_eq!(select.to_string().matches(" UNION ALL ").count(), n - 1);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_search_all_users() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(true);

        let req = SearchUsersRequest {
            sorting: Some(Sorting::new("id", Ordering::Desc)),
            limit: 10,
            offset: Some(20),
            ..Default::default()
        };
        storage.search_users("shop", req).await?;

        // collections without _user are skipped
        let queries = env.events.queries();
        assert_eq!(
            queries[0].sql,
            "SELECT DISTINCT _user AS \"id\" FROM (SELECT collection._user FROM \"clicks\" AS collection WHERE collection._user IS NOT NULL UNION ALL SELECT collection._user FROM \"purchases\" AS collection WHERE collection._user IS NOT NULL) AS t ORDER BY \"id\" DESC LIMIT 10 OFFSET 20"
        );
        Ok(())
    }

    #[traced_test]
    #[tokio::test]
    async fn test_empty_project() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(false);

        let res = storage
            .search_users("empty", SearchUsersRequest::default())
            .await?;
        assert!(res.is_empty());
        assert!(env.events.queries().is_empty());
        assert!(logs_contain("no collection carries users"));
        Ok(())
    }

    #[tokio::test]
    async fn test_search_returns_rows() -> Result<()> {
        let result = QueryResult::new(
            vec![SchemaField::new("id", FieldType::String, false)],
            vec![vec![serde_json::json!("u1")], vec![serde_json::json!("u2")]],
        );
        let env = Env::new(RecordingExecutor::with_result(result.clone()))?;
        let storage = env.storage(false);

        let req = SearchUsersRequest {
            event_filters: vec![EventFilter::new("clicks")],
            ..Default::default()
        };
        assert_eq!(storage.search_users("shop", req).await?, result);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_by_attributes() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(false);

        let req = SearchUsersRequest {
            columns: vec!["id".to_string(), "email".to_string()],
            filter: Some(Expr::parse("country = 'DE'")?),
            ..Default::default()
        };
        storage.search_users("shop", req).await?;

        assert!(env.events.queries().is_empty());
        assert_eq!(
            env.users.queries()[0].sql,
            "SELECT \"id\", \"email\" FROM users.\"shop\" WHERE \"country\" = 'DE' LIMIT 100"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_search_by_attributes_and_events() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(false);

        let req = SearchUsersRequest {
            filter: Some(Expr::parse("country = 'DE'")?),
            event_filters: vec![EventFilter::new("clicks").with_aggregation(at_least(2))],
            ..Default::default()
        };
        storage.search_users("shop", req).await?;

        assert!(env.users.queries().is_empty());
        assert_eq!(
            env.events.queries()[0].sql,
            "SELECT * FROM \"user\".users.\"shop\" WHERE \"country\" = 'DE' AND id IN (SELECT collection._user FROM \"shop\".\"clicks\" AS collection WHERE collection._user IS NOT NULL GROUP BY collection._user HAVING count(collection._user) >= 2) LIMIT 100"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_executor_error_is_propagated() -> Result<()> {
        let env = Env::new(RecordingExecutor::failing("line 1:8: Table 'clicks' not found"))?;
        let storage = env.storage(false);

        let req = SearchUsersRequest {
            event_filters: vec![EventFilter::new("clicks")],
            ..Default::default()
        };
        match storage.search_users("shop", req).await {
            Err(QueryError::Execution(msg)) => {
                assert_eq!(msg, "line 1:8: Table 'clicks' not found")
            }
            other => panic!("unexpected result {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_collection() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(false);

        let req = SearchUsersRequest {
            event_filters: vec![EventFilter::new("clicks\" UNION SELECT secret FROM keys --")],
            ..Default::default()
        };
        let err = storage.search_users("shop", req).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);
        assert!(env.events.queries().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_aggregation_field() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(false);

        let req = SearchUsersRequest {
            event_filters: vec![EventFilter::new("purchases").with_aggregation(Aggregation {
                typ: AggregateFunction::Sum,
                field: Some("amount\") --".to_string()),
                minimum: Some(100),
                maximum: None,
            })],
            ..Default::default()
        };
        let err = storage.search_users("shop", req).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);
        assert!(env.events.queries().is_empty());
        assert!(env.users.queries().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_segment() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(false);

        let req = CreateSegmentRequest {
            name: "Active buyers".to_string(),
            table_name: "active_buyers".to_string(),
            filter: None,
            event_filters: vec![EventFilter::new("purchases").with_aggregation(at_least(3))],
            interval: Some(Duration::from_secs(3600)),
        };
        storage.create_segment("shop", req).await?;

        let view = env.views.get("shop", "active_buyers")?;
        assert_eq!(view.name, "Active buyers");
        assert_eq!(
            view.description.as_deref(),
            Some("Users who did active_buyers event")
        );
        assert_eq!(
            view.query,
            "SELECT DISTINCT _user AS id FROM (SELECT collection._user FROM \"purchases\" AS collection WHERE collection._user IS NOT NULL GROUP BY collection._user HAVING count(collection._user) >= 3) AS t"
        );
        assert_eq!(view.update_interval, Some(Duration::from_secs(3600)));
        assert!(!view.incremental);
        assert!(env.events.queries().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_segments() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(false);

        let with_filter = CreateSegmentRequest {
            name: "German buyers".to_string(),
            table_name: "german_buyers".to_string(),
            filter: Some(Expr::parse("country = 'DE'")?),
            event_filters: vec![EventFilter::new("purchases")],
            interval: None,
        };
        let err = storage.create_segment("shop", with_filter).await.unwrap_err();
        assert!(matches!(err, QueryError::BadRequest(_)));

        let without_events = CreateSegmentRequest {
            name: "Nobody".to_string(),
            table_name: "nobody".to_string(),
            filter: None,
            event_filters: vec![],
            interval: None,
        };
        let err = storage
            .create_segment("shop", without_events)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::BadRequest(_)));

        let bad_table = CreateSegmentRequest {
            name: "Buyers".to_string(),
            table_name: "buyers; DROP TABLE x".to_string(),
            filter: None,
            event_filters: vec![EventFilter::new("purchases")],
            interval: None,
        };
        let err = storage.create_segment("shop", bad_table).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);

        assert!(env.views.list("shop")?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_segment() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let storage = env.storage(false);

        let req = CreateSegmentRequest {
            name: "Clickers".to_string(),
            table_name: "clickers".to_string(),
            filter: None,
            event_filters: vec![EventFilter::new("clicks")],
            interval: None,
        };
        storage.create_segment("shop", req.clone()).await?;
        let err = storage.create_segment("shop", req).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::CONFLICT);
        Ok(())
    }

    #[tokio::test]
    async fn test_build_creates_schema() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let cfg = config::UserStorage::default();

        let storage = build(&cfg, env.deps()).await?;
        let queries = env.users.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].project, None);
        assert_eq!(queries[0].sql, CREATE_USERS_SCHEMA);

        let req = SearchUsersRequest {
            event_filters: vec![EventFilter::new("clicks")],
            ..Default::default()
        };
        storage.search_users("shop", req).await?;
        assert_eq!(env.events.queries().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_build_init_failure() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let deps = Dependencies {
            user_executor: Arc::new(RecordingExecutor::failing("connection refused")),
            ..env.deps()
        };

        match build(&config::UserStorage::default(), deps).await {
            Err(QueryError::Init(msg)) => assert!(msg.contains("connection refused")),
            Err(err) => panic!("unexpected error {err:?}"),
            Ok(_) => panic!("init must fail"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_build_default_storage() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let cfg = config::UserStorage {
            kind: UserStorageKind::Default,
            ..Default::default()
        };

        let storage = build(&cfg, env.deps()).await?;
        assert!(env.users.queries().is_empty());

        let req = SearchUsersRequest {
            event_filters: vec![EventFilter::new("clicks")],
            ..Default::default()
        };
        let err = storage.search_users("shop", req).await.unwrap_err();
        assert!(matches!(err, QueryError::BadRequest(_)));

        storage
            .search_users("shop", SearchUsersRequest::default())
            .await?;
        assert_eq!(
            env.users.queries()[0].sql,
            "SELECT * FROM users.\"shop\" LIMIT 100"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_build_rejects_bad_config() -> Result<()> {
        let env = Env::new(RecordingExecutor::new())?;
        let cfg = config::UserStorage {
            identifier_column: "id, password".to_string(),
            ..Default::default()
        };

        assert!(build(&cfg, env.deps()).await.is_err());
        assert!(env.users.queries().is_empty());
        Ok(())
    }
}
