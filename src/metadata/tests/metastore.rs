use common::types::FieldType;
use common::types::SchemaField;
use metadata::error::MetadataError;
use metadata::error::Result;
use metadata::metastore::Provider;
use metadata::metastore::ProviderImpl;

#[test]
fn test_collections() -> Result<()> {
    let md = ProviderImpl::new();

    assert!(md.get_collections("shop")?.is_empty());
    assert!(md.get_collection("shop", "clicks")?.is_empty());

    md.create_collection("shop", "purchases", vec![SchemaField::new(
        "_user",
        FieldType::String,
        true,
    )])?;
    md.create_collection("shop", "clicks", vec![
        SchemaField::new("_user", FieldType::String, true),
        SchemaField::new("_device_id", FieldType::String, true),
    ])?;

    let collections = md.get_collections("shop")?;
    assert_eq!(collections.keys().collect::<Vec<_>>(), vec!["clicks", "purchases"]);
    assert_eq!(md.get_collection("shop", "clicks")?.len(), 2);
    assert!(md.get_collections("other")?.is_empty());

    Ok(())
}

#[test]
fn test_create_existing() -> Result<()> {
    let md = ProviderImpl::new();
    md.create_collection("shop", "clicks", vec![])?;
    assert!(matches!(
        md.create_collection("shop", "clicks", vec![]),
        Err(MetadataError::AlreadyExists(_))
    ));

    Ok(())
}

#[test]
fn test_invalid_names() {
    let md = ProviderImpl::new();
    assert!(md.create_collection("shop", "cli\"cks", vec![]).is_err());
    assert!(md
        .create_collection("shop", "clicks", vec![SchemaField::new(
            "a b",
            FieldType::String,
            true
        )])
        .is_err());
}

#[test]
fn test_add_fields() -> Result<()> {
    let md = ProviderImpl::new();
    md.add_fields("shop", "pageview", vec![SchemaField::new(
        "user_agent",
        FieldType::String,
        true,
    )])?;
    let fields = md.add_fields("shop", "pageview", vec![
        SchemaField::new("user_agent", FieldType::Long, false),
        SchemaField::new("os", FieldType::String, true),
    ])?;

    assert_eq!(fields, vec![
        SchemaField::new("user_agent", FieldType::String, true),
        SchemaField::new("os", FieldType::String, true),
    ]);

    Ok(())
}
