use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Datelike, Utc};
use uuid::Uuid;

use dyntable_commerce::{
    CommerceEngine, CommerceError, RentRequest, SaleRequest, TransitionError,
};
use dyntable_core::{
    Actor, CellValue, InventoryAction, RentalStatus, RowData, TableType, Visibility,
};
use dyntable_registry::TypeRegistry;
use dyntable_store::{MemoryStore, NewTable, SchemaService};

struct Harness {
    service: SchemaService,
    engine: Arc<CommerceEngine>,
    owner: Actor,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(TypeRegistry::with_builtins());
    let service = SchemaService::new(store.clone(), registry);
    let engine = Arc::new(CommerceEngine::new(store));
    let owner = Actor::user(Uuid::new_v4(), "owner@example.com");
    Harness {
        service,
        engine,
        owner,
    }
}

impl Harness {
    async fn commerce_table(&self, table_type: TableType) -> Result<Uuid> {
        let table = self
            .service
            .create_table(
                &self.owner,
                NewTable {
                    name: format!("{table_type} items"),
                    description: None,
                    visibility: Visibility::Private,
                    table_type,
                    rental_period: None,
                },
            )
            .await?;
        Ok(table.id)
    }

    async fn item(&self, table_id: Uuid, pairs: &[(&str, CellValue)]) -> Result<Uuid> {
        let mut data = RowData::new();
        for (key, value) in pairs {
            data.insert((*key).to_string(), value.clone());
        }
        let outcome = self.service.create_row(&self.owner, table_id, data).await?;
        Ok(outcome.row.id)
    }

    async fn row_flags(&self, table_id: Uuid, row_id: Uuid) -> Result<(bool, bool)> {
        let row = self.service.get_row(&self.owner, table_id, row_id).await?;
        let used = row.data.get("used").and_then(CellValue::as_bool).unwrap_or(false);
        let available = row
            .data
            .get("available")
            .and_then(CellValue::as_bool)
            .unwrap_or(true);
        Ok((used, available))
    }
}

fn transition_err(err: CommerceError) -> TransitionError {
    match err {
        CommerceError::Transition(inner) => inner,
        other => panic!("expected transition error, got: {other}"),
    }
}

#[tokio::test]
async fn rent_release_walks_the_three_state_machine() -> Result<()> {
    let h = harness();
    let table_id = h.commerce_table(TableType::Rent).await?;
    let row_id = h
        .item(table_id, &[("name", "camera".into()), ("price", 25.0.into())])
        .await?;

    // INITIAL -> rent -> RENTED
    let rental = h
        .engine
        .rent_item(&h.owner, table_id, row_id, RentRequest::default())
        .await?;
    assert_eq!(rental.status, RentalStatus::Active);
    assert_eq!(h.row_flags(table_id, row_id).await?, (false, false));

    // A second rent fails as currently rented.
    let err = h
        .engine
        .rent_item(&h.owner, table_id, row_id, RentRequest::default())
        .await
        .unwrap_err();
    assert_eq!(transition_err(err), TransitionError::CurrentlyRented);

    // RENTED -> release -> RELEASED (terminal)
    let released = h
        .engine
        .release_item(&h.owner, table_id, row_id, None)
        .await?;
    assert_eq!(released.id, rental.id);
    assert_eq!(released.status, RentalStatus::Released);
    assert!(released.released_at.is_some());
    assert_eq!(h.row_flags(table_id, row_id).await?, (true, false));

    // No edges leave the terminal state.
    let err = h
        .engine
        .rent_item(&h.owner, table_id, row_id, RentRequest::default())
        .await
        .unwrap_err();
    assert_eq!(transition_err(err), TransitionError::AlreadyUsed);
    let err = h
        .engine
        .release_item(&h.owner, table_id, row_id, None)
        .await
        .unwrap_err();
    assert_eq!(transition_err(err), TransitionError::AlreadyReleased);
    Ok(())
}

#[tokio::test]
async fn releasing_an_unrented_item_fails() -> Result<()> {
    let h = harness();
    let table_id = h.commerce_table(TableType::Rent).await?;
    let row_id = h.item(table_id, &[("price", 10.0.into())]).await?;

    let err = h
        .engine
        .release_item(&h.owner, table_id, row_id, None)
        .await
        .unwrap_err();
    assert_eq!(transition_err(err), TransitionError::NotRented);
    Ok(())
}

#[tokio::test]
async fn unpriced_items_cannot_be_rented_or_sold() -> Result<()> {
    let h = harness();
    let rent_table = h.commerce_table(TableType::Rent).await?;
    // The seeded price column defaults to 0, which is not a valid price.
    let rent_row = h.item(rent_table, &[("name", "freebie".into())]).await?;
    let err = h
        .engine
        .rent_item(&h.owner, rent_table, rent_row, RentRequest::default())
        .await
        .unwrap_err();
    assert_eq!(transition_err(err), TransitionError::NotPriced);

    let sale_table = h.commerce_table(TableType::Sale).await?;
    let sale_row = h.item(sale_table, &[("qty", 5.0.into())]).await?;
    let err = h
        .engine
        .sell_item(
            &h.owner,
            sale_table,
            sale_row,
            SaleRequest {
                quantity: 1.0,
                customer_id: None,
                payment_method: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(transition_err(err), TransitionError::NotPriced);
    Ok(())
}

#[tokio::test]
async fn selling_decrements_qty_and_freezes_the_snapshot() -> Result<()> {
    let h = harness();
    let table_id = h.commerce_table(TableType::Sale).await?;
    let row_id = h
        .item(
            table_id,
            &[
                ("name", "widget".into()),
                ("price", 4.5.into()),
                ("qty", 10.0.into()),
            ],
        )
        .await?;

    let sale = h
        .engine
        .sell_item(
            &h.owner,
            table_id,
            row_id,
            SaleRequest {
                quantity: 3.0,
                customer_id: Some("cust-1".to_string()),
                payment_method: Some("card".to_string()),
                notes: None,
            },
        )
        .await?;

    let year = Utc::now().year();
    assert_eq!(sale.sale_number, format!("SALE-{year}-001"));
    assert_eq!(sale.unit_price, 4.5);
    assert_eq!(sale.total, 13.5);
    // The snapshot keeps the pre-sale quantity.
    assert_eq!(sale.snapshot.get("qty"), Some(&CellValue::Number(10.0)));

    let row = h.service.get_row(&h.owner, table_id, row_id).await?;
    assert_eq!(row.data.get("qty"), Some(&CellValue::Number(7.0)));

    // Asking for more than remains fails with the counts in the message.
    let err = h
        .engine
        .sell_item(
            &h.owner,
            table_id,
            row_id,
            SaleRequest {
                quantity: 8.0,
                customer_id: None,
                payment_method: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        transition_err(err),
        TransitionError::InsufficientQuantity {
            requested: 8.0,
            available: 7.0
        }
    );
    Ok(())
}

#[tokio::test]
async fn every_transition_appends_an_inventory_record() -> Result<()> {
    let h = harness();
    let table_id = h.commerce_table(TableType::Rent).await?;
    let row_id = h.item(table_id, &[("price", 12.0.into())]).await?;

    let rental = h
        .engine
        .rent_item(&h.owner, table_id, row_id, RentRequest::default())
        .await?;
    h.engine
        .release_item(&h.owner, table_id, row_id, None)
        .await?;

    let records = h
        .engine
        .list_inventory_transactions(&h.owner, table_id)
        .await?;
    let actions: Vec<InventoryAction> = records.iter().map(|r| r.action).collect();
    // Row creation logged an add; then the two transitions.
    assert_eq!(
        actions,
        vec![
            InventoryAction::Add,
            InventoryAction::Rent,
            InventoryAction::Release
        ]
    );
    let rent_record = &records[1];
    assert_eq!(rent_record.reference_id, Some(rental.id));
    assert!(rent_record.before.is_some());
    assert!(rent_record.after.is_some());
    Ok(())
}

#[tokio::test]
async fn concurrent_rents_only_book_the_item_once() -> Result<()> {
    let h = harness();
    let table_id = h.commerce_table(TableType::Rent).await?;
    let row_id = h.item(table_id, &[("price", 9.0.into())]).await?;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = Arc::clone(&h.engine);
        let owner = h.owner.clone();
        handles.push(tokio::spawn(async move {
            engine
                .rent_item(&owner, table_id, row_id, RentRequest::default())
                .await
        }));
    }

    let mut successes = 0;
    let mut already_rented = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => successes += 1,
            Err(CommerceError::Transition(TransitionError::CurrentlyRented)) => {
                already_rented += 1
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(already_rented, 3);
    Ok(())
}

#[tokio::test]
async fn concurrent_sales_allocate_unique_gapless_numbers() -> Result<()> {
    let h = harness();
    let table_id = h.commerce_table(TableType::Sale).await?;

    let mut row_ids = Vec::new();
    for _ in 0..5 {
        row_ids.push(
            h.item(table_id, &[("price", 2.0.into()), ("qty", 5.0.into())])
                .await?,
        );
    }

    let mut handles = Vec::new();
    for row_id in row_ids {
        let engine = Arc::clone(&h.engine);
        let owner = h.owner.clone();
        handles.push(tokio::spawn(async move {
            engine
                .sell_item(
                    &owner,
                    table_id,
                    row_id,
                    SaleRequest {
                        quantity: 1.0,
                        customer_id: None,
                        payment_method: None,
                        notes: None,
                    },
                )
                .await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let sale = handle.await??;
        numbers.insert(sale.sale_number);
    }

    let year = Utc::now().year();
    let expected: HashSet<String> = (1..=5)
        .map(|n| format!("SALE-{year}-{n:03}"))
        .collect();
    assert_eq!(numbers, expected);
    Ok(())
}

#[tokio::test]
async fn availability_follows_table_semantics() -> Result<()> {
    let h = harness();
    let sale_table = h.commerce_table(TableType::Sale).await?;
    let sale_row = h
        .item(sale_table, &[("price", 2.0.into()), ("qty", 3.0.into())])
        .await?;

    let availability = h
        .engine
        .check_availability(&h.owner, sale_table, sale_row, 2.0)
        .await?;
    assert!(availability.available);
    assert_eq!(availability.available_qty, 3.0);

    let short = h
        .engine
        .check_availability(&h.owner, sale_table, sale_row, 4.0)
        .await?;
    assert!(!short.available);

    let rent_table = h.commerce_table(TableType::Rent).await?;
    let rent_row = h.item(rent_table, &[("price", 2.0.into())]).await?;
    let rentable = h
        .engine
        .check_availability(&h.owner, rent_table, rent_row, 1.0)
        .await?;
    assert!(rentable.available);
    assert_eq!(rentable.available_qty, 1.0);

    h.engine
        .rent_item(&h.owner, rent_table, rent_row, RentRequest::default())
        .await?;
    let rented = h
        .engine
        .check_availability(&h.owner, rent_table, rent_row, 1.0)
        .await?;
    assert!(!rented.available);
    assert_eq!(rented.available_qty, 0.0);
    Ok(())
}

#[tokio::test]
async fn token_scoped_actors_can_transact_only_on_granted_tables() -> Result<()> {
    let h = harness();
    let table_id = h.commerce_table(TableType::Rent).await?;
    let row_id = h.item(table_id, &[("price", 5.0.into())]).await?;

    let scoped = Actor::user(Uuid::new_v4(), "api@example.com").with_table_access(vec![table_id]);
    h.engine
        .rent_item(&scoped, table_id, row_id, RentRequest::default())
        .await?;

    let unscoped =
        Actor::user(Uuid::new_v4(), "api@example.com").with_table_access(vec![Uuid::new_v4()]);
    let err = h
        .engine
        .release_item(&unscoped, table_id, row_id, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CommerceError::Core(dyntable_core::Error::NotFound { .. })
    ));
    Ok(())
}
