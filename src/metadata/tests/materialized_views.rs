use std::collections::BTreeMap;
use std::time::Duration;

use metadata::error::MetadataError;
use metadata::error::Result;
use metadata::materialized_views::MaterializedView;
use metadata::materialized_views::Provider;
use metadata::materialized_views::ProviderImpl;

fn view(table_name: &str) -> MaterializedView {
    MaterializedView {
        table_name: table_name.to_string(),
        name: "buyers".to_string(),
        description: None,
        query: "select 1".to_string(),
        update_interval: Some(Duration::from_secs(3600)),
        incremental: false,
        options: BTreeMap::new(),
    }
}

#[tokio::test]
async fn test_create_and_get() -> Result<()> {
    let views = ProviderImpl::new();
    views.create("shop", view("buyers")).await?;

    assert_eq!(views.get("shop", "buyers")?, view("buyers"));
    assert_eq!(views.list("shop")?.len(), 1);
    assert!(matches!(
        views.get("shop", "missing"),
        Err(MetadataError::NotFound(_))
    ));
    assert!(matches!(
        views.create("shop", view("buyers")).await,
        Err(MetadataError::AlreadyExists(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_invalid_table_name() {
    let views = ProviderImpl::new();
    assert!(views.create("shop", view("buy;ers")).await.is_err());
}
