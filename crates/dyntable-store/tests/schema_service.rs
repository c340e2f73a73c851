use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use dyntable_core::{
    Actor, CellValue, Error, RowData, TableType, Visibility,
};
use dyntable_registry::TypeRegistry;
use dyntable_store::{ColumnUpdate, MemoryStore, NewColumn, NewTable, SchemaService};

fn service() -> (SchemaService, Actor) {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(TypeRegistry::with_builtins());
    let owner = Actor::user(Uuid::new_v4(), "owner@example.com");
    (SchemaService::new(store, registry), owner)
}

fn new_table(name: &str, table_type: TableType) -> NewTable {
    NewTable {
        name: name.to_string(),
        description: None,
        visibility: Visibility::Private,
        table_type,
        rental_period: None,
    }
}

fn text_column(name: &str) -> NewColumn {
    NewColumn {
        name: name.to_string(),
        column_type: "text".to_string(),
        is_required: false,
        allow_duplicates: true,
        default_value: None,
        position: None,
    }
}

#[tokio::test]
async fn sale_tables_are_created_with_their_required_columns() -> Result<()> {
    let (service, owner) = service();
    let table = service
        .create_table(&owner, new_table("stock", TableType::Sale))
        .await?;

    let columns = service.list_columns(&owner, table.id).await?;
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["price", "qty"]);
    assert!(
        service
            .is_column_protected_by_type(&owner, table.id, "price")
            .await?
    );
    Ok(())
}

#[tokio::test]
async fn protected_columns_reject_structural_changes_until_type_reverts() -> Result<()> {
    let (service, owner) = service();
    let table = service
        .create_table(&owner, new_table("stock", TableType::Sale))
        .await?;
    let columns = service.list_columns(&owner, table.id).await?;
    let price = columns.iter().find(|c| c.name == "price").unwrap();

    let rename = ColumnUpdate {
        name: Some("cost".to_string()),
        ..ColumnUpdate::default()
    };
    let err = service
        .update_column(&owner, table.id, price.id, rename.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ColumnProtected { .. }));

    let flag_change = ColumnUpdate {
        is_required: Some(false),
        ..ColumnUpdate::default()
    };
    let err = service
        .update_column(&owner, table.id, price.id, flag_change)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ColumnProtected { .. }));

    // Non-structural settings stay editable while protected.
    let default_change = ColumnUpdate {
        default_value: Some(CellValue::Number(1.0)),
        ..ColumnUpdate::default()
    };
    service
        .update_column(&owner, table.id, price.id, default_change)
        .await?;

    // Back to default type, the same rename goes through.
    service
        .set_table_type(&owner, table.id, TableType::Default, None)
        .await?;
    let outcome = service
        .update_column(&owner, table.id, price.id, rename)
        .await?;
    assert!(outcome.renamed);
    assert_eq!(outcome.column.name, "cost");
    Ok(())
}

#[tokio::test]
async fn renaming_a_column_rewrites_row_data_keys() -> Result<()> {
    let (service, owner) = service();
    let table = service
        .create_table(&owner, new_table("catalog", TableType::Default))
        .await?;
    let column = service
        .add_column(&owner, table.id, text_column("Item Name"))
        .await?;

    for i in 0..3 {
        let mut data = RowData::new();
        data.insert("Item Name".to_string(), CellValue::from(format!("item {i}")));
        service.create_row(&owner, table.id, data).await?;
    }
    // One row never carried the key at all.
    service.create_row(&owner, table.id, RowData::new()).await?;

    let outcome = service
        .update_column(
            &owner,
            table.id,
            column.id,
            ColumnUpdate {
                name: Some("name".to_string()),
                ..ColumnUpdate::default()
            },
        )
        .await?;
    assert!(outcome.renamed);
    assert_eq!(outcome.rows_updated, 3);

    for row in service.list_rows(&owner, table.id).await? {
        assert!(!row.data.contains_key("Item Name"));
    }
    Ok(())
}

#[tokio::test]
async fn duplicate_column_names_are_rejected_case_insensitively() -> Result<()> {
    let (service, owner) = service();
    let table = service
        .create_table(&owner, new_table("catalog", TableType::Default))
        .await?;
    service.add_column(&owner, table.id, text_column("Name")).await?;

    let err = service
        .add_column(&owner, table.id, text_column("name"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateColumnName { .. }));
    Ok(())
}

#[tokio::test]
async fn recount_restores_dense_positions_after_churn() -> Result<()> {
    let (service, owner) = service();
    let table = service
        .create_table(&owner, new_table("catalog", TableType::Default))
        .await?;
    let a = service.add_column(&owner, table.id, text_column("a")).await?;
    let b = service.add_column(&owner, table.id, text_column("b")).await?;
    let c = service.add_column(&owner, table.id, text_column("c")).await?;
    service.add_column(&owner, table.id, text_column("d")).await?;

    service.swap_column_positions(&owner, table.id, a.id, c.id).await?;
    service.delete_column(&owner, table.id, b.id).await?;
    service.recount_column_positions(&owner, table.id).await?;

    let columns = service.list_columns(&owner, table.id).await?;
    let positions: Vec<i32> = columns.iter().map(|c| c.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    // Order after swapping a<->c and dropping b: c, a, d.
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a", "d"]);
    Ok(())
}

#[tokio::test]
async fn invalid_rows_are_reported_and_removed_exactly() -> Result<()> {
    let (service, owner) = service();
    let table = service
        .create_table(&owner, new_table("stock", TableType::Default))
        .await?;
    service
        .add_column(
            &owner,
            table.id,
            NewColumn {
                name: "price".to_string(),
                column_type: "number".to_string(),
                is_required: false,
                allow_duplicates: true,
                default_value: None,
                position: None,
            },
        )
        .await?;

    for i in 0..7 {
        let mut data = RowData::new();
        data.insert("price".to_string(), CellValue::from(i as f64));
        service.create_row(&owner, table.id, data).await?;
    }
    for _ in 0..3 {
        let mut data = RowData::new();
        data.insert("price".to_string(), CellValue::from("not a number"));
        service.create_row(&owner, table.id, data).await?;
    }

    // The report lists every row; invalid ones are flagged, never hidden.
    let report = service.validate_table(&owner, table.id).await?;
    assert_eq!(report.total_rows, 10);
    assert_eq!(report.invalid_rows, 3);
    assert_eq!(report.rows.len(), 10);

    let cleanup = service.delete_invalid_rows(&owner, table.id).await?;
    assert_eq!(cleanup.found_invalid, 3);
    assert_eq!(cleanup.removed, 3);
    assert_eq!(service.list_rows(&owner, table.id).await?.len(), 7);
    Ok(())
}

#[tokio::test]
async fn row_writes_succeed_with_warnings() -> Result<()> {
    let (service, owner) = service();
    let table = service
        .create_table(&owner, new_table("contacts", TableType::Default))
        .await?;
    service
        .add_column(
            &owner,
            table.id,
            NewColumn {
                name: "email".to_string(),
                column_type: "email".to_string(),
                is_required: false,
                allow_duplicates: true,
                default_value: None,
                position: None,
            },
        )
        .await?;

    let mut data = RowData::new();
    data.insert("email".to_string(), CellValue::from("not-an-email"));
    let outcome = service.create_row(&owner, table.id, data).await?;

    // The row is stored despite the warning.
    assert_eq!(service.list_rows(&owner, table.id).await?.len(), 1);
    let warning = outcome.warnings.get("email").expect("email warning");
    assert_eq!(warning.error.as_deref(), Some("Invalid email format"));
    Ok(())
}

#[tokio::test]
async fn non_owners_cannot_mutate_schema() -> Result<()> {
    let (service, owner) = service();
    let table = service
        .create_table(
            &owner,
            NewTable {
                visibility: Visibility::Public,
                ..new_table("open", TableType::Default)
            },
        )
        .await?;

    let stranger = Actor::user(Uuid::new_v4(), "stranger@example.com");
    // Visible table: reads work, schema mutation is denied.
    assert!(service.get_table(&stranger, table.id).await.is_ok());
    let err = service
        .add_column(&stranger, table.id, text_column("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AccessDenied(_)));

    // Invisible table: reported as not found, not denied.
    let hidden = service
        .create_table(&owner, new_table("hidden", TableType::Default))
        .await?;
    let err = service.get_table(&stranger, hidden.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    Ok(())
}
