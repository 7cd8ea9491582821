//! Integration tests for products, warehouses and standalone stock receipts.

mod common;

use common::{CLEARING, EQUITY, INVENTORY, date, setup};
use corebook_core::ledger::LedgerError;
use corebook_core::workflow::WorkflowError;
use corebook_db::InventoryRepository;
use corebook_db::entities::sea_orm_active_enums::MovementType;
use corebook_db::repositories::{CreateProductInput, InventoryError, ReceiveStockInput};
use corebook_shared::types::{ProductId, WarehouseId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn receipt(
    fx: &common::Fixture,
    product_id: ProductId,
    quantity: Decimal,
    unit_cost: Decimal,
) -> ReceiveStockInput {
    ReceiveStockInput {
        company_id: fx.company_id,
        product_id,
        warehouse_id: fx.warehouse_id,
        quantity,
        unit_cost,
        received_on: date(2026, 1, 10),
        contra_account_code: None,
        idempotency_key: None,
    }
}

#[tokio::test]
async fn test_weighted_average_cost() {
    let Some(fx) = setup().await else { return };
    let inventory = InventoryRepository::new(fx.db.clone());
    let product = fx.stocked_product("WAC").await;

    inventory
        .receive_stock(receipt(&fx, product, dec!(100), dec!(200)))
        .await
        .expect("first receipt");
    let second = inventory
        .receive_stock(receipt(&fx, product, dec!(100), dec!(300)))
        .await
        .expect("second receipt");

    assert_eq!(second.item.qty_on_hand, dec!(200));
    assert_eq!(second.item.unit_cost, dec!(250));
}

#[tokio::test]
async fn test_receipt_posts_to_clearing_and_links_movement() {
    let Some(fx) = setup().await else { return };
    let inventory = InventoryRepository::new(fx.db.clone());
    let product = fx.stocked_product("LINK").await;

    let received = inventory
        .receive_stock(receipt(&fx, product, dec!(4), dec!(12.5)))
        .await
        .expect("receipt");

    assert_eq!(fx.balance(INVENTORY).await, dec!(50));
    assert_eq!(fx.balance(CLEARING).await, dec!(-50));

    let movements = inventory
        .get_movements(fx.company_id, product)
        .await
        .expect("movements");
    assert_eq!(movements.len(), 1);
    let movement = &movements[0];
    assert_eq!(movement.id, received.movement_id);
    assert_eq!(movement.movement_type, MovementType::Receipt);
    assert_eq!(movement.quantity, dec!(4));
    assert_eq!(movement.journal_entry_id, received.entry_id);
    assert!(received.entry_id.is_some());
}

#[tokio::test]
async fn test_contra_account_override() {
    let Some(fx) = setup().await else { return };
    let product = fx.stocked_product("OPENING").await;

    fx.stock(product, dec!(10), dec!(3)).await;

    assert_eq!(fx.balance(INVENTORY).await, dec!(30));
    assert_eq!(fx.balance(EQUITY).await, dec!(-30));
    assert_eq!(fx.balance(CLEARING).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_duplicate_receipt_key_changes_nothing() {
    let Some(fx) = setup().await else { return };
    let inventory = InventoryRepository::new(fx.db.clone());
    let product = fx.stocked_product("ONCE").await;
    let keyed = ReceiveStockInput {
        idempotency_key: Some("STK-OPENING-1".into()),
        ..receipt(&fx, product, dec!(5), dec!(10))
    };

    inventory.receive_stock(keyed.clone()).await.expect("first");
    let again = inventory.receive_stock(keyed).await;

    assert!(matches!(
        again,
        Err(WorkflowError::Ledger(LedgerError::DuplicateProposal(_)))
    ));
    let levels = inventory
        .get_stock_levels(fx.company_id, None)
        .await
        .expect("levels");
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].qty_on_hand, dec!(5));
    assert_eq!(
        inventory
            .get_movements(fx.company_id, product)
            .await
            .expect("movements")
            .len(),
        1
    );
}

#[tokio::test]
async fn test_receipt_rejects_bad_input() {
    let Some(fx) = setup().await else { return };
    let inventory = InventoryRepository::new(fx.db.clone());
    let product = fx.stocked_product("BAD").await;

    let zero = inventory
        .receive_stock(receipt(&fx, product, Decimal::ZERO, dec!(1)))
        .await;
    assert!(matches!(zero, Err(WorkflowError::InvalidQuantity(_))));

    let negative_cost = inventory
        .receive_stock(receipt(&fx, product, dec!(1), dec!(-1)))
        .await;
    assert!(matches!(negative_cost, Err(WorkflowError::InvalidLine(_))));

    let service = inventory
        .create_product(CreateProductInput {
            company_id: fx.company_id,
            sku: "SVC".into(),
            name: "Setup fee".into(),
            is_stocked: false,
            revenue_account_code: None,
        })
        .await
        .expect("service product");
    let unstocked = inventory
        .receive_stock(receipt(&fx, ProductId::from_uuid(service.id), dec!(1), dec!(1)))
        .await;
    assert!(matches!(unstocked, Err(WorkflowError::InvalidLine(_))));

    assert_eq!(fx.balance(INVENTORY).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_foreign_product_is_not_found() {
    let Some(a) = setup().await else { return };
    let Some(b) = setup().await else { return };
    let product = a.stocked_product("MINE").await;

    let result = InventoryRepository::new(b.db.clone())
        .receive_stock(receipt(&b, product, dec!(1), dec!(1)))
        .await;
    assert!(matches!(result, Err(WorkflowError::NotFound("product"))));
}

#[tokio::test]
async fn test_stock_levels_by_warehouse() {
    let Some(fx) = setup().await else { return };
    let inventory = InventoryRepository::new(fx.db.clone());
    let annex = inventory
        .create_warehouse(fx.company_id, "annex", "Annex")
        .await
        .expect("warehouse");
    assert_eq!(annex.code, "ANNEX");
    let annex_id = WarehouseId::from_uuid(annex.id);

    let bolt = fx.stocked_product("BOLT").await;
    let axle = fx.stocked_product("AXLE").await;
    fx.stock(bolt, dec!(10), dec!(2)).await;
    fx.stock(axle, dec!(3), dec!(40)).await;
    inventory
        .receive_stock(ReceiveStockInput {
            warehouse_id: annex_id,
            ..receipt(&fx, bolt, dec!(5), dec!(2))
        })
        .await
        .expect("annex receipt");

    let all = inventory
        .get_stock_levels(fx.company_id, None)
        .await
        .expect("levels");
    let keys: Vec<(&str, &str)> = all
        .iter()
        .map(|l| (l.sku.as_str(), l.warehouse_code.as_str()))
        .collect();
    assert_eq!(keys, vec![("AXLE", "MAIN"), ("BOLT", "ANNEX"), ("BOLT", "MAIN")]);
    assert_eq!(all[0].value, dec!(120));
    assert_eq!(all[0].qty_available, dec!(3));

    let annex_only = inventory
        .get_stock_levels(fx.company_id, Some(annex_id))
        .await
        .expect("levels");
    assert_eq!(annex_only.len(), 1);
    assert_eq!(annex_only[0].qty_on_hand, dec!(5));

    let codes: Vec<String> = inventory
        .get_warehouses(fx.company_id)
        .await
        .expect("warehouses")
        .into_iter()
        .map(|w| w.code)
        .collect();
    assert_eq!(codes, vec!["ANNEX", "MAIN"]);
}

#[tokio::test]
async fn test_duplicate_codes_conflict() {
    let Some(fx) = setup().await else { return };
    let inventory = InventoryRepository::new(fx.db.clone());
    fx.stocked_product("DUP").await;

    let product = inventory
        .create_product(CreateProductInput {
            company_id: fx.company_id,
            sku: " DUP ".into(),
            name: "Again".into(),
            is_stocked: true,
            revenue_account_code: None,
        })
        .await;
    assert!(matches!(product, Err(InventoryError::DuplicateSku(sku)) if sku == "DUP"));

    let warehouse = inventory.create_warehouse(fx.company_id, "main", "Again").await;
    assert!(matches!(warehouse, Err(InventoryError::DuplicateWarehouse(_))));

    let blank = inventory
        .create_product(CreateProductInput {
            company_id: fx.company_id,
            sku: "  ".into(),
            name: "Blank".into(),
            is_stocked: true,
            revenue_account_code: None,
        })
        .await;
    assert!(matches!(blank, Err(InventoryError::Invalid(_))));
}
