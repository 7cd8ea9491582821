//! Inventory repository: products, warehouses, stock receipts and levels.
//!
//! Stock rows are only changed while locked `FOR UPDATE`. When several rows
//! are needed they are locked in (product, warehouse) order.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use corebook_core::rules::AccountRole;
use corebook_core::workflow::{
    CostingService, Decision, PostingBuilder, PostingContext, WorkflowError,
};
use corebook_shared::AppError;
use corebook_shared::types::{CompanyId, ProductId, WarehouseId};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{
    companies, inventory_items, inventory_movements, products,
    sea_orm_active_enums::MovementType, warehouses,
};
use crate::repositories::composer::{Staged, Transition, db_err, run_transition};
use crate::repositories::ledger::LedgerRepository;
use crate::repositories::rule::RuleRepository;

/// Error types for product and warehouse setup.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// SKU already exists in the company.
    #[error("SKU '{0}' already exists")]
    DuplicateSku(String),

    /// Warehouse code already exists in the company.
    #[error("Warehouse code '{0}' already exists")]
    DuplicateWarehouse(String),

    /// Blank required field.
    #[error("Invalid input: {0}")]
    Invalid(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::DuplicateSku(_) | InventoryError::DuplicateWarehouse(_) => {
                Self::Conflict(err.to_string())
            }
            InventoryError::Invalid(_) => Self::Validation(err.to_string()),
            InventoryError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct CreateProductInput {
    /// Owning company.
    pub company_id: CompanyId,
    /// Stock-keeping unit, unique within the company.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Whether stock is tracked.
    pub is_stocked: bool,
    /// Revenue account code used when invoicing; falls back to the sales revenue rule.
    pub revenue_account_code: Option<String>,
}

/// Input for a standalone stock receipt.
#[derive(Debug, Clone)]
pub struct ReceiveStockInput {
    /// Owning company.
    pub company_id: CompanyId,
    /// Received product.
    pub product_id: ProductId,
    /// Receiving warehouse.
    pub warehouse_id: WarehouseId,
    /// Quantity received, positive.
    pub quantity: Decimal,
    /// Unit cost in base currency.
    pub unit_cost: Decimal,
    /// Posting date.
    pub received_on: NaiveDate,
    /// Credit account; the goods-received clearing rule when `None`.
    pub contra_account_code: Option<String>,
    /// Idempotency key; generated when `None`.
    pub idempotency_key: Option<String>,
}

/// Result of a stock receipt.
#[derive(Debug, Clone)]
pub struct StockReceipt {
    /// Stock row after the receipt.
    pub item: inventory_items::Model,
    /// Movement row written.
    pub movement_id: Uuid,
    /// Journal entry, absent for zero-cost receipts.
    pub entry_id: Option<Uuid>,
}

/// One stock position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    /// Product.
    pub product_id: Uuid,
    /// Product SKU.
    pub sku: String,
    /// Product name.
    pub product_name: String,
    /// Warehouse.
    pub warehouse_id: Uuid,
    /// Warehouse code.
    pub warehouse_code: String,
    /// Quantity on hand.
    pub qty_on_hand: Decimal,
    /// Quantity reserved by confirmed orders.
    pub qty_reserved: Decimal,
    /// On hand minus reserved.
    pub qty_available: Decimal,
    /// Weighted-average unit cost.
    pub unit_cost: Decimal,
    /// On hand times unit cost.
    pub value: Decimal,
}

/// New movement row.
pub(crate) struct NewMovement {
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub purchase_order_line_id: Option<Uuid>,
    pub sales_order_id: Option<Uuid>,
    pub journal_entry_id: Option<Uuid>,
}

/// Locks the stock rows for the given (product, warehouse) pairs, creating
/// empty rows first where none exist. Rows are locked in key order.
pub(crate) async fn lock_items(
    txn: &DatabaseTransaction,
    company_id: Uuid,
    keys: impl IntoIterator<Item = (Uuid, Uuid)>,
) -> Result<BTreeMap<(Uuid, Uuid), inventory_items::Model>, WorkflowError> {
    let keys: BTreeSet<(Uuid, Uuid)> = keys.into_iter().collect();
    let mut locked = BTreeMap::new();

    for (product_id, warehouse_id) in keys {
        let empty = inventory_items::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(company_id),
            product_id: Set(product_id),
            warehouse_id: Set(warehouse_id),
            qty_on_hand: Set(Decimal::ZERO),
            qty_reserved: Set(Decimal::ZERO),
            unit_cost: Set(Decimal::ZERO),
            updated_at: Set(Utc::now().into()),
        };
        inventory_items::Entity::insert(empty)
            .on_conflict(
                OnConflict::columns([
                    inventory_items::Column::CompanyId,
                    inventory_items::Column::ProductId,
                    inventory_items::Column::WarehouseId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(txn)
            .await
            .map_err(db_err)?;

        let item = inventory_items::Entity::find()
            .filter(inventory_items::Column::CompanyId.eq(company_id))
            .filter(inventory_items::Column::ProductId.eq(product_id))
            .filter(inventory_items::Column::WarehouseId.eq(warehouse_id))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::NotFound("inventory item"))?;
        locked.insert((product_id, warehouse_id), item);
    }

    Ok(locked)
}

/// Adds received stock to a locked row and reblends its unit cost.
pub(crate) async fn receive_into(
    txn: &DatabaseTransaction,
    item: inventory_items::Model,
    quantity: Decimal,
    unit_cost: Decimal,
) -> Result<inventory_items::Model, WorkflowError> {
    let blended =
        CostingService::weighted_average(item.qty_on_hand, item.unit_cost, quantity, unit_cost)?;
    let on_hand = item
        .qty_on_hand
        .checked_add(quantity)
        .ok_or(WorkflowError::AmountOverflow("quantity on hand"))?;

    let mut active: inventory_items::ActiveModel = item.into();
    active.qty_on_hand = Set(on_hand);
    active.unit_cost = Set(blended);
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await.map_err(db_err)
}

/// Removes shipped stock and its reservation from a locked row.
pub(crate) async fn issue_from(
    txn: &DatabaseTransaction,
    item: inventory_items::Model,
    quantity: Decimal,
) -> Result<inventory_items::Model, WorkflowError> {
    let on_hand = item.qty_on_hand - quantity;
    let reserved = (item.qty_reserved - quantity).max(Decimal::ZERO);

    let mut active: inventory_items::ActiveModel = item.into();
    active.qty_on_hand = Set(on_hand);
    active.qty_reserved = Set(reserved);
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await.map_err(db_err)
}

/// Reserves stock on a locked row after checking availability.
pub(crate) async fn reserve_on(
    txn: &DatabaseTransaction,
    item: inventory_items::Model,
    quantity: Decimal,
) -> Result<inventory_items::Model, WorkflowError> {
    CostingService::check_available(item.product_id, item.qty_on_hand, item.qty_reserved, quantity)?;
    let reserved = item
        .qty_reserved
        .checked_add(quantity)
        .ok_or(WorkflowError::AmountOverflow("reserved quantity"))?;

    let mut active: inventory_items::ActiveModel = item.into();
    active.qty_reserved = Set(reserved);
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await.map_err(db_err)
}

/// Inserts a movement row.
pub(crate) async fn insert_movement(
    txn: &DatabaseTransaction,
    movement: NewMovement,
) -> Result<Uuid, WorkflowError> {
    let id = Uuid::now_v7();
    inventory_movements::ActiveModel {
        id: Set(id),
        company_id: Set(movement.company_id),
        product_id: Set(movement.product_id),
        warehouse_id: Set(movement.warehouse_id),
        movement_type: Set(movement.movement_type),
        quantity: Set(movement.quantity),
        unit_cost: Set(movement.unit_cost),
        purchase_order_line_id: Set(movement.purchase_order_line_id),
        sales_order_id: Set(movement.sales_order_id),
        journal_entry_id: Set(movement.journal_entry_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(txn)
    .await
    .map_err(db_err)?;
    Ok(id)
}

/// Loads the company row for a workflow.
pub(crate) async fn load_company(
    txn: &DatabaseTransaction,
    company_id: Uuid,
) -> Result<companies::Model, WorkflowError> {
    companies::Entity::find_by_id(company_id)
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or(WorkflowError::NotFound("company"))
}

/// Loads a product owned by the company.
pub(crate) async fn load_product(
    txn: &DatabaseTransaction,
    company_id: Uuid,
    product_id: Uuid,
) -> Result<products::Model, WorkflowError> {
    products::Entity::find_by_id(product_id)
        .filter(products::Column::CompanyId.eq(company_id))
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or(WorkflowError::NotFound("product"))
}

/// Loads a warehouse owned by the company.
pub(crate) async fn load_warehouse(
    txn: &DatabaseTransaction,
    company_id: Uuid,
    warehouse_id: Uuid,
) -> Result<warehouses::Model, WorkflowError> {
    warehouses::Entity::find_by_id(warehouse_id)
        .filter(warehouses::Column::CompanyId.eq(company_id))
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or(WorkflowError::NotFound("warehouse"))
}

/// Locked state of a standalone receipt.
struct StockHeader {
    company: companies::Model,
    item: inventory_items::Model,
}

struct ReceiveStock<'a> {
    input: &'a ReceiveStockInput,
    idempotency_key: String,
}

#[async_trait]
impl Transition for ReceiveStock<'_> {
    type Header = StockHeader;
    type State = ();
    type Output = StockReceipt;

    async fn lock(&self, txn: &DatabaseTransaction) -> Result<StockHeader, WorkflowError> {
        let company_id = self.input.company_id.into_inner();
        let company = load_company(txn, company_id).await?;
        let product = load_product(txn, company_id, self.input.product_id.into_inner()).await?;
        let warehouse =
            load_warehouse(txn, company_id, self.input.warehouse_id.into_inner()).await?;
        if !product.is_stocked {
            return Err(WorkflowError::InvalidLine(format!(
                "product {} is not stocked",
                product.sku
            )));
        }

        let mut items = lock_items(txn, company_id, [(product.id, warehouse.id)]).await?;
        let item = items
            .remove(&(product.id, warehouse.id))
            .ok_or(WorkflowError::NotFound("inventory item"))?;
        Ok(StockHeader { company, item })
    }

    fn check(&self, _header: &StockHeader) -> Result<Decision, WorkflowError> {
        CostingService::ensure_positive(self.input.quantity)?;
        if self.input.unit_cost < Decimal::ZERO {
            return Err(WorkflowError::InvalidLine("unit cost cannot be negative".into()));
        }
        Ok(Decision::Proceed)
    }

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        header: &StockHeader,
    ) -> Result<Staged<()>, WorkflowError> {
        let date = self.input.received_on;
        let inventory =
            RuleRepository::resolve_in_tx(txn, header.company.id, AccountRole::Inventory, date)
                .await?;
        let contra = match &self.input.contra_account_code {
            Some(code) => code.clone(),
            None => {
                RuleRepository::resolve_in_tx(
                    txn,
                    header.company.id,
                    AccountRole::GoodsReceivedClearing,
                    date,
                )
                .await?
            }
        };

        let ctx = PostingContext {
            company_code: header.company.code.clone(),
            currency: header.company.base_currency.clone(),
            exchange_rate: Decimal::ONE,
            posting_date: date,
        };
        let value = CostingService::line_total(self.input.quantity, self.input.unit_cost)?;
        let proposal = PostingBuilder::receipt(
            &ctx,
            self.idempotency_key.clone(),
            "Stock receipt".to_string(),
            &[(inventory, value)],
            &contra,
        );
        Ok(Staged::new((), proposal))
    }

    async fn finish(
        &self,
        txn: &DatabaseTransaction,
        header: StockHeader,
        _state: (),
        entry_id: Option<Uuid>,
    ) -> Result<StockReceipt, WorkflowError> {
        let item = receive_into(txn, header.item, self.input.quantity, self.input.unit_cost).await?;
        let movement_id = insert_movement(
            txn,
            NewMovement {
                company_id: item.company_id,
                product_id: item.product_id,
                warehouse_id: item.warehouse_id,
                movement_type: MovementType::Receipt,
                quantity: self.input.quantity,
                unit_cost: self.input.unit_cost,
                purchase_order_line_id: None,
                sales_order_id: None,
                journal_entry_id: entry_id,
            },
        )
        .await?;

        tracing::info!(
            product_id = %item.product_id,
            warehouse_id = %item.warehouse_id,
            quantity = %self.input.quantity,
            unit_cost = %item.unit_cost,
            "Stock received"
        );
        Ok(StockReceipt {
            item,
            movement_id,
            entry_id,
        })
    }

    fn unchanged(&self, _header: StockHeader) -> Result<StockReceipt, WorkflowError> {
        Err(WorkflowError::InvalidLine("stock receipt cannot be a no-op".into()))
    }
}

/// Inventory repository.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    db: DatabaseConnection,
    ledger: LedgerRepository,
}

impl InventoryRepository {
    /// Creates a new inventory repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let ledger = LedgerRepository::new(db.clone());
        Self { db, ledger }
    }

    /// Uses the given ledger (and its sequencer) for postings.
    #[must_use]
    pub fn with_ledger(mut self, ledger: LedgerRepository) -> Self {
        self.ledger = ledger;
        self
    }

    /// Creates a product.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSku` if the SKU exists in the company.
    #[tracing::instrument(skip(self), fields(company_id = %input.company_id, sku = %input.sku))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<products::Model, InventoryError> {
        let sku = input.sku.trim().to_string();
        if sku.is_empty() {
            return Err(InventoryError::Invalid("sku is required"));
        }
        if input.name.trim().is_empty() {
            return Err(InventoryError::Invalid("name is required"));
        }

        let product = products::ActiveModel {
            id: Set(ProductId::new().into_inner()),
            company_id: Set(input.company_id.into_inner()),
            sku: Set(sku.clone()),
            name: Set(input.name.trim().to_string()),
            is_stocked: Set(input.is_stocked),
            revenue_account_code: Set(input
                .revenue_account_code
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())),
            created_at: Set(Utc::now().into()),
        };

        match product.insert(&self.db).await {
            Ok(model) => Ok(model),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(InventoryError::DuplicateSku(sku))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Creates a warehouse.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateWarehouse` if the code exists in the company.
    #[tracing::instrument(skip(self))]
    pub async fn create_warehouse(
        &self,
        company_id: CompanyId,
        code: &str,
        name: &str,
    ) -> Result<warehouses::Model, InventoryError> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(InventoryError::Invalid("code is required"));
        }

        let warehouse = warehouses::ActiveModel {
            id: Set(WarehouseId::new().into_inner()),
            company_id: Set(company_id.into_inner()),
            code: Set(code.clone()),
            name: Set(name.trim().to_string()),
            created_at: Set(Utc::now().into()),
        };

        match warehouse.insert(&self.db).await {
            Ok(model) => Ok(model),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(InventoryError::DuplicateWarehouse(code))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Receives stock outside any purchase order.
    ///
    /// Posts Dr Inventory / Cr the contra account, writes a movement and
    /// reblends the weighted-average cost, all in one transaction.
    ///
    /// # Errors
    ///
    /// `NotFound` for foreign products or warehouses, `InvalidQuantity`,
    /// rule errors, or ledger errors (including `DuplicateProposal` when the
    /// idempotency key was already used).
    #[tracing::instrument(skip(self), fields(company_id = %input.company_id, product_id = %input.product_id))]
    pub async fn receive_stock(
        &self,
        input: ReceiveStockInput,
    ) -> Result<StockReceipt, WorkflowError> {
        let idempotency_key = input
            .idempotency_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| format!("STK-{}", Uuid::now_v7()));
        let transition = ReceiveStock {
            input: &input,
            idempotency_key,
        };
        run_transition(&self.db, &self.ledger, &transition).await
    }

    /// Stock positions for the company, optionally for one warehouse.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_stock_levels(
        &self,
        company_id: CompanyId,
        warehouse_id: Option<WarehouseId>,
    ) -> Result<Vec<StockLevel>, WorkflowError> {
        let company_id = company_id.into_inner();
        let mut query =
            inventory_items::Entity::find().filter(inventory_items::Column::CompanyId.eq(company_id));
        if let Some(warehouse_id) = warehouse_id {
            query = query.filter(inventory_items::Column::WarehouseId.eq(warehouse_id.into_inner()));
        }
        let items = query.all(&self.db).await.map_err(db_err)?;

        let products: BTreeMap<Uuid, products::Model> = products::Entity::find()
            .filter(products::Column::CompanyId.eq(company_id))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let warehouses: BTreeMap<Uuid, warehouses::Model> = self
            .get_warehouses(CompanyId::from_uuid(company_id))
            .await?
            .into_iter()
            .map(|w| (w.id, w))
            .collect();

        let mut levels: Vec<StockLevel> = items
            .into_iter()
            .filter_map(|item| {
                let product = products.get(&item.product_id)?;
                let warehouse = warehouses.get(&item.warehouse_id)?;
                Some(StockLevel {
                    product_id: item.product_id,
                    sku: product.sku.clone(),
                    product_name: product.name.clone(),
                    warehouse_id: item.warehouse_id,
                    warehouse_code: warehouse.code.clone(),
                    qty_on_hand: item.qty_on_hand,
                    qty_reserved: item.qty_reserved,
                    qty_available: item.qty_on_hand - item.qty_reserved,
                    unit_cost: item.unit_cost,
                    value: item.qty_on_hand.saturating_mul(item.unit_cost),
                })
            })
            .collect();
        levels.sort_by(|a, b| {
            a.sku
                .cmp(&b.sku)
                .then(a.warehouse_code.cmp(&b.warehouse_code))
        });
        Ok(levels)
    }

    /// The company's warehouses ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_warehouses(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<warehouses::Model>, WorkflowError> {
        warehouses::Entity::find()
            .filter(warehouses::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(warehouses::Column::Code)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Movement history of one product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_movements(
        &self,
        company_id: CompanyId,
        product_id: ProductId,
    ) -> Result<Vec<inventory_movements::Model>, WorkflowError> {
        inventory_movements::Entity::find()
            .filter(inventory_movements::Column::CompanyId.eq(company_id.into_inner()))
            .filter(inventory_movements::Column::ProductId.eq(product_id.into_inner()))
            .order_by_asc(inventory_movements::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }
}
