//! Sales order repository.
//!
//! Every status change runs through [`run_transition`], so the order header,
//! its stock rows, its document number and its ledger entry move together or
//! not at all.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use corebook_core::rules::AccountRole;
use corebook_core::workflow::{
    CostingService, Decision, PostingBuilder, PostingContext, SalesOrderStatus, WorkflowError,
    WorkflowService, doc_types, transition_key,
};
use corebook_shared::types::{
    CompanyId, PageRequest, PageResponse, ProductId, SalesOrderId, WarehouseId,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{
    companies, products, sales_order_lines, sales_orders, sea_orm_active_enums,
    sea_orm_active_enums::MovementType,
};
use crate::repositories::composer::{Staged, Transition, db_err, run_transition};
use crate::repositories::inventory::{
    NewMovement, insert_movement, issue_from, load_company, load_product, load_warehouse,
    lock_items, reserve_on,
};
use crate::repositories::ledger::LedgerRepository;
use crate::repositories::rule::RuleRepository;
use crate::repositories::sequence::SequenceRepository;

/// One line of a new order.
#[derive(Debug, Clone)]
pub struct CreateOrderLineInput {
    /// Product sold; `None` for free-text lines.
    pub product_id: Option<ProductId>,
    /// Line description; defaults to the product name.
    pub description: String,
    /// Quantity, positive.
    pub quantity: Decimal,
    /// Unit price in order currency.
    pub unit_price: Decimal,
}

/// Input for creating a sales order.
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    /// Owning company.
    pub company_id: CompanyId,
    /// Customer.
    pub customer_name: String,
    /// Order currency; the company's base currency when blank.
    pub currency: String,
    /// Rate to base currency; `1` when `None` or zero.
    pub exchange_rate: Option<Decimal>,
    /// Shipping warehouse.
    pub warehouse_id: WarehouseId,
    /// Order date.
    pub order_date: NaiveDate,
    /// Lines, at least one.
    pub lines: Vec<CreateOrderLineInput>,
}

/// A sales order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithLines {
    /// Header.
    pub order: sales_orders::Model,
    /// Lines ordered by line number.
    pub lines: Vec<sales_order_lines::Model>,
}

impl OrderWithLines {
    /// Order total in order currency.
    ///
    /// # Errors
    ///
    /// `AmountOverflow` when the total exceeds the decimal range.
    pub fn total(&self) -> Result<Decimal, WorkflowError> {
        CostingService::document_total(self.lines.iter().map(|l| (l.quantity, l.unit_price)))
    }
}

/// Resolves the currency and rate of a new workflow document.
pub(crate) fn document_currency(
    requested: &str,
    rate: Option<Decimal>,
    base_currency: &str,
) -> Result<(String, Decimal), WorkflowError> {
    let currency = match requested.trim() {
        "" => base_currency.to_string(),
        c => c.to_uppercase(),
    };
    let rate = match rate {
        None => Decimal::ONE,
        Some(r) if r.is_zero() => Decimal::ONE,
        Some(r) if r < Decimal::ZERO => {
            return Err(WorkflowError::InvalidLine(format!(
                "exchange rate must be positive, got {r}"
            )));
        }
        Some(r) => r,
    };
    Ok((currency, rate))
}

/// Locked order with everything the transitions read.
struct OrderHeader {
    company: companies::Model,
    order: OrderWithLines,
}

impl OrderHeader {
    fn context(&self, posting_date: NaiveDate) -> PostingContext {
        PostingContext {
            company_code: self.company.code.clone(),
            currency: self.order.order.currency.clone(),
            exchange_rate: self.order.order.exchange_rate,
            posting_date,
        }
    }

    /// Stock moves at base-currency cost.
    fn base_context(&self, posting_date: NaiveDate) -> PostingContext {
        PostingContext {
            company_code: self.company.code.clone(),
            currency: self.company.base_currency.clone(),
            exchange_rate: Decimal::ONE,
            posting_date,
        }
    }

    fn label(&self) -> String {
        let order = &self.order.order;
        order
            .order_number
            .clone()
            .unwrap_or_else(|| order.id.to_string())
    }
}

async fn lock_order(
    txn: &DatabaseTransaction,
    company_id: Uuid,
    order_id: Uuid,
) -> Result<OrderHeader, WorkflowError> {
    let order = sales_orders::Entity::find_by_id(order_id)
        .filter(sales_orders::Column::CompanyId.eq(company_id))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or(WorkflowError::NotFound("sales order"))?;
    let company = load_company(txn, company_id).await?;
    let lines = sales_order_lines::Entity::find()
        .filter(sales_order_lines::Column::OrderId.eq(order_id))
        .order_by_asc(sales_order_lines::Column::LineNo)
        .all(txn)
        .await
        .map_err(db_err)?;

    Ok(OrderHeader {
        company,
        order: OrderWithLines { order, lines },
    })
}

async fn line_products(
    txn: &DatabaseTransaction,
    header: &OrderHeader,
) -> Result<BTreeMap<Uuid, products::Model>, WorkflowError> {
    let ids: Vec<Uuid> = header
        .order
        .lines
        .iter()
        .filter_map(|l| l.product_id)
        .collect();
    if ids.is_empty() {
        return Ok(BTreeMap::new());
    }

    let found: BTreeMap<Uuid, products::Model> = products::Entity::find()
        .filter(products::Column::CompanyId.eq(header.company.id))
        .filter(products::Column::Id.is_in(ids.clone()))
        .all(txn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    if ids.iter().any(|id| !found.contains_key(id)) {
        return Err(WorkflowError::NotFound("product"));
    }
    Ok(found)
}

/// Quantity per stocked product across the order's lines.
async fn stocked_quantities(
    txn: &DatabaseTransaction,
    header: &OrderHeader,
) -> Result<BTreeMap<Uuid, Decimal>, WorkflowError> {
    let products = line_products(txn, header).await?;
    let mut quantities = BTreeMap::new();
    for line in &header.order.lines {
        let Some(product) = line.product_id.and_then(|id| products.get(&id)) else {
            continue;
        };
        if product.is_stocked {
            *quantities.entry(product.id).or_insert(Decimal::ZERO) += line.quantity;
        }
    }
    Ok(quantities)
}

#[derive(Debug, Clone)]
enum SalesAction {
    Confirm,
    Ship {
        shipped_on: NaiveDate,
    },
    Invoice {
        invoiced_on: NaiveDate,
    },
    Pay {
        paid_on: NaiveDate,
        bank_account_code: Option<String>,
    },
    Cancel,
}

/// Carried from `apply` to `finish`.
enum SalesState {
    Nothing,
    Number(Option<String>),
    Movements(Vec<NewMovement>),
}

struct SalesTransition<'a> {
    sequencer: &'a SequenceRepository,
    company_id: Uuid,
    order_id: Uuid,
    action: SalesAction,
}

impl SalesTransition<'_> {
    fn next_status(&self, current: SalesOrderStatus) -> Result<SalesOrderStatus, WorkflowError> {
        match self.action {
            SalesAction::Confirm => WorkflowService::confirm_order(current),
            SalesAction::Ship { .. } => WorkflowService::ship_order(current),
            SalesAction::Invoice { .. } => WorkflowService::invoice_order(current),
            SalesAction::Pay { .. } => WorkflowService::pay_order(current),
            SalesAction::Cancel => WorkflowService::cancel_order(current),
        }
    }

    async fn confirm(
        &self,
        txn: &DatabaseTransaction,
        header: &OrderHeader,
    ) -> Result<Staged<SalesState>, WorkflowError> {
        let order = &header.order.order;
        let quantities = stocked_quantities(txn, header).await?;
        let mut items = lock_items(
            txn,
            self.company_id,
            quantities.keys().map(|p| (*p, order.warehouse_id)),
        )
        .await?;
        for (product_id, quantity) in &quantities {
            let item = items
                .remove(&(*product_id, order.warehouse_id))
                .ok_or(WorkflowError::NotFound("inventory item"))?;
            reserve_on(txn, item, *quantity).await?;
        }

        let document = self
            .sequencer
            .assign_in_tx(
                txn,
                self.company_id,
                doc_types::SALES_ORDER,
                Some(order.order_date.year()),
                None,
            )
            .await?;
        Ok(Staged::new(SalesState::Number(document.number), None))
    }

    async fn ship(
        &self,
        txn: &DatabaseTransaction,
        header: &OrderHeader,
        shipped_on: NaiveDate,
    ) -> Result<Staged<SalesState>, WorkflowError> {
        let order = &header.order.order;
        let quantities = stocked_quantities(txn, header).await?;
        let mut items = lock_items(
            txn,
            self.company_id,
            quantities.keys().map(|p| (*p, order.warehouse_id)),
        )
        .await?;

        let mut cost = Decimal::ZERO;
        let mut movements = Vec::with_capacity(quantities.len());
        for (product_id, quantity) in &quantities {
            let item = items
                .remove(&(*product_id, order.warehouse_id))
                .ok_or(WorkflowError::NotFound("inventory item"))?;
            CostingService::check_available(
                *product_id,
                item.qty_on_hand,
                Decimal::ZERO,
                *quantity,
            )?;

            let unit_cost = item.unit_cost;
            cost = cost
                .checked_add(CostingService::line_total(*quantity, unit_cost)?)
                .ok_or(WorkflowError::AmountOverflow("shipment cost"))?;
            issue_from(txn, item, *quantity).await?;
            movements.push(NewMovement {
                company_id: self.company_id,
                product_id: *product_id,
                warehouse_id: order.warehouse_id,
                movement_type: MovementType::Shipment,
                quantity: -*quantity,
                unit_cost,
                purchase_order_line_id: None,
                sales_order_id: Some(order.id),
                journal_entry_id: None,
            });
        }

        let proposal = if cost > Decimal::ZERO {
            let cogs = RuleRepository::resolve_in_tx(
                txn,
                self.company_id,
                AccountRole::CostOfGoodsSold,
                shipped_on,
            )
            .await?;
            let inventory = RuleRepository::resolve_in_tx(
                txn,
                self.company_id,
                AccountRole::Inventory,
                shipped_on,
            )
            .await?;
            PostingBuilder::shipment(
                &header.base_context(shipped_on),
                transition_key(doc_types::SALES_ORDER, order.id, "SHIP"),
                format!("Shipment of order {}", header.label()),
                &cogs,
                &inventory,
                cost,
            )
        } else {
            None
        };
        Ok(Staged::new(SalesState::Movements(movements), proposal))
    }

    async fn invoice(
        &self,
        txn: &DatabaseTransaction,
        header: &OrderHeader,
        invoiced_on: NaiveDate,
    ) -> Result<Staged<SalesState>, WorkflowError> {
        let order = &header.order.order;
        let products = line_products(txn, header).await?;

        let mut fallback: Option<String> = None;
        let mut revenue = Vec::with_capacity(header.order.lines.len());
        for line in &header.order.lines {
            let assigned = line
                .product_id
                .and_then(|id| products.get(&id))
                .and_then(|p| p.revenue_account_code.clone());
            let code = if let Some(code) = assigned {
                code
            } else if let Some(code) = &fallback {
                code.clone()
            } else {
                let code = RuleRepository::resolve_in_tx(
                    txn,
                    self.company_id,
                    AccountRole::SalesRevenue,
                    invoiced_on,
                )
                .await?;
                fallback = Some(code.clone());
                code
            };
            revenue.push((
                code,
                CostingService::line_total(line.quantity, line.unit_price)?,
            ));
        }

        let receivable = RuleRepository::resolve_in_tx(
            txn,
            self.company_id,
            AccountRole::AccountsReceivable,
            invoiced_on,
        )
        .await?;
        let document = self
            .sequencer
            .assign_in_tx(
                txn,
                self.company_id,
                doc_types::SALES_INVOICE,
                Some(invoiced_on.year()),
                None,
            )
            .await?;

        let proposal = PostingBuilder::sales_invoice(
            &header.context(invoiced_on),
            transition_key(doc_types::SALES_ORDER, order.id, "INVOICE"),
            format!("Invoice for order {}", header.label()),
            &receivable,
            &revenue,
        )
        .map(|p| p.with_document(document.id));
        Ok(Staged::new(SalesState::Number(document.number), proposal))
    }

    async fn pay(
        &self,
        txn: &DatabaseTransaction,
        header: &OrderHeader,
        paid_on: NaiveDate,
        bank_account_code: Option<&str>,
    ) -> Result<Staged<SalesState>, WorkflowError> {
        let bank = match bank_account_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => code.to_string(),
            None => {
                RuleRepository::resolve_in_tx(txn, self.company_id, AccountRole::Bank, paid_on)
                    .await?
            }
        };
        let receivable = RuleRepository::resolve_in_tx(
            txn,
            self.company_id,
            AccountRole::AccountsReceivable,
            paid_on,
        )
        .await?;

        let proposal = PostingBuilder::customer_payment(
            &header.context(paid_on),
            transition_key(doc_types::SALES_ORDER, header.order.order.id, "PAYMENT"),
            format!("Payment for order {}", header.label()),
            &bank,
            &receivable,
            header.order.total()?,
        );
        Ok(Staged::new(SalesState::Nothing, proposal))
    }
}

#[async_trait]
impl Transition for SalesTransition<'_> {
    type Header = OrderHeader;
    type State = SalesState;
    type Output = OrderWithLines;

    async fn lock(&self, txn: &DatabaseTransaction) -> Result<OrderHeader, WorkflowError> {
        lock_order(txn, self.company_id, self.order_id).await
    }

    fn check(&self, header: &OrderHeader) -> Result<Decision, WorkflowError> {
        self.next_status(header.order.order.status.into())
            .map(|_| Decision::Proceed)
    }

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        header: &OrderHeader,
    ) -> Result<Staged<SalesState>, WorkflowError> {
        match &self.action {
            SalesAction::Confirm => self.confirm(txn, header).await,
            SalesAction::Ship { shipped_on } => self.ship(txn, header, *shipped_on).await,
            SalesAction::Invoice { invoiced_on } => self.invoice(txn, header, *invoiced_on).await,
            SalesAction::Pay {
                paid_on,
                bank_account_code,
            } => {
                self.pay(txn, header, *paid_on, bank_account_code.as_deref())
                    .await
            }
            SalesAction::Cancel => Ok(Staged::new(SalesState::Nothing, None)),
        }
    }

    async fn finish(
        &self,
        txn: &DatabaseTransaction,
        header: OrderHeader,
        state: SalesState,
        entry_id: Option<Uuid>,
    ) -> Result<OrderWithLines, WorkflowError> {
        let OrderWithLines { order, lines } = header.order;
        let previous: SalesOrderStatus = order.status.into();
        let next = self.next_status(previous)?;
        let now = Utc::now();

        let mut number = None;
        match state {
            SalesState::Movements(movements) => {
                for movement in movements {
                    insert_movement(
                        txn,
                        NewMovement {
                            journal_entry_id: entry_id,
                            ..movement
                        },
                    )
                    .await?;
                }
            }
            SalesState::Number(assigned) => number = assigned,
            SalesState::Nothing => {}
        }

        let mut active: sales_orders::ActiveModel = order.into();
        active.status = Set(next.into());
        active.updated_at = Set(now.into());
        match &self.action {
            SalesAction::Confirm => {
                active.order_number = Set(number);
                active.confirmed_at = Set(Some(now.into()));
            }
            SalesAction::Ship { .. } => {
                active.shipment_entry_id = Set(entry_id);
                active.shipped_at = Set(Some(now.into()));
            }
            SalesAction::Invoice { .. } => {
                active.invoice_number = Set(number);
                active.invoice_entry_id = Set(entry_id);
                active.invoiced_at = Set(Some(now.into()));
            }
            SalesAction::Pay { .. } => {
                active.payment_entry_id = Set(entry_id);
                active.paid_at = Set(Some(now.into()));
            }
            SalesAction::Cancel => {
                active.cancelled_at = Set(Some(now.into()));
            }
        }
        let order = active.update(txn).await.map_err(db_err)?;

        tracing::info!(
            order_id = %order.id,
            from = previous.as_str(),
            to = next.as_str(),
            entry_id = ?entry_id,
            "Sales order transitioned"
        );
        Ok(OrderWithLines { order, lines })
    }

    fn unchanged(&self, header: OrderHeader) -> Result<OrderWithLines, WorkflowError> {
        Ok(header.order)
    }
}

/// Sales order repository.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    db: DatabaseConnection,
    ledger: LedgerRepository,
}

impl OrderRepository {
    /// Creates a new order repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let ledger = LedgerRepository::new(db.clone());
        Self { db, ledger }
    }

    /// Uses the given ledger (and its sequencer) for postings and numbers.
    #[must_use]
    pub fn with_ledger(mut self, ledger: LedgerRepository) -> Self {
        self.ledger = ledger;
        self
    }

    /// Creates a DRAFT order with its lines.
    ///
    /// # Errors
    ///
    /// `EmptyOrder`, `InvalidQuantity`, `InvalidLine`, or `NotFound` for a
    /// warehouse or product the company does not own.
    #[tracing::instrument(skip(self, input), fields(company_id = %input.company_id, lines = input.lines.len()))]
    pub async fn create_order(
        &self,
        input: CreateOrderInput,
    ) -> Result<OrderWithLines, WorkflowError> {
        if input.lines.is_empty() {
            return Err(WorkflowError::EmptyOrder);
        }
        if input.customer_name.trim().is_empty() {
            return Err(WorkflowError::InvalidLine("customer name is required".into()));
        }

        let company_id = input.company_id.into_inner();
        let txn = self.db.begin().await.map_err(db_err)?;
        let company = load_company(&txn, company_id).await?;
        let warehouse = load_warehouse(&txn, company_id, input.warehouse_id.into_inner()).await?;
        let (currency, exchange_rate) =
            document_currency(&input.currency, input.exchange_rate, &company.base_currency)?;

        let order_id = SalesOrderId::new().into_inner();
        let now = Utc::now();
        let mut lines = Vec::with_capacity(input.lines.len());
        for (line_no, line) in (1_i32..).zip(&input.lines) {
            CostingService::ensure_positive(line.quantity)?;
            if line.unit_price < Decimal::ZERO {
                return Err(WorkflowError::InvalidLine(format!(
                    "line {line_no}: unit price cannot be negative"
                )));
            }
            let product = match line.product_id {
                Some(id) => Some(load_product(&txn, company_id, id.into_inner()).await?),
                None => None,
            };
            let description = match (line.description.trim(), &product) {
                ("", Some(p)) => p.name.clone(),
                ("", None) => {
                    return Err(WorkflowError::InvalidLine(format!(
                        "line {line_no}: description or product is required"
                    )));
                }
                (d, _) => d.to_string(),
            };
            lines.push(sales_order_lines::ActiveModel {
                id: Set(Uuid::now_v7()),
                order_id: Set(order_id),
                line_no: Set(line_no),
                product_id: Set(product.map(|p| p.id)),
                description: Set(description),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
            });
        }
        CostingService::document_total(input.lines.iter().map(|l| (l.quantity, l.unit_price)))?;

        let order = sales_orders::ActiveModel {
            id: Set(order_id),
            company_id: Set(company_id),
            customer_name: Set(input.customer_name.trim().to_string()),
            status: Set(sea_orm_active_enums::SalesOrderStatus::Draft),
            currency: Set(currency),
            exchange_rate: Set(exchange_rate),
            warehouse_id: Set(warehouse.id),
            order_date: Set(input.order_date),
            order_number: Set(None),
            invoice_number: Set(None),
            shipment_entry_id: Set(None),
            invoice_entry_id: Set(None),
            payment_entry_id: Set(None),
            confirmed_at: Set(None),
            shipped_at: Set(None),
            invoiced_at: Set(None),
            paid_at: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;
        sales_order_lines::Entity::insert_many(lines)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        let lines = sales_order_lines::Entity::find()
            .filter(sales_order_lines::Column::OrderId.eq(order_id))
            .order_by_asc(sales_order_lines::Column::LineNo)
            .all(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        tracing::info!(%order_id, "Sales order created");
        Ok(OrderWithLines { order, lines })
    }

    /// DRAFT → CONFIRMED: reserves stock and assigns the order number.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, `InsufficientStock`, `NotFound`, or sequencing errors.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(
        &self,
        company_id: CompanyId,
        order_id: SalesOrderId,
    ) -> Result<OrderWithLines, WorkflowError> {
        self.transition(company_id, order_id, SalesAction::Confirm)
            .await
    }

    /// CONFIRMED → SHIPPED: issues stock and posts Dr COGS / Cr Inventory.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, `InsufficientStock`, rule or ledger errors.
    #[tracing::instrument(skip(self))]
    pub async fn ship_order(
        &self,
        company_id: CompanyId,
        order_id: SalesOrderId,
        shipped_on: NaiveDate,
    ) -> Result<OrderWithLines, WorkflowError> {
        self.transition(company_id, order_id, SalesAction::Ship { shipped_on })
            .await
    }

    /// SHIPPED → INVOICED: assigns the invoice number and posts Dr AR / Cr revenue.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, rule, sequencing or ledger errors.
    #[tracing::instrument(skip(self))]
    pub async fn invoice_order(
        &self,
        company_id: CompanyId,
        order_id: SalesOrderId,
        invoiced_on: NaiveDate,
    ) -> Result<OrderWithLines, WorkflowError> {
        self.transition(company_id, order_id, SalesAction::Invoice { invoiced_on })
            .await
    }

    /// INVOICED → PAID: posts Dr Bank / Cr AR for the order total.
    ///
    /// `bank_account_code` overrides the bank rule.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, rule or ledger errors.
    #[tracing::instrument(skip(self))]
    pub async fn record_payment(
        &self,
        company_id: CompanyId,
        order_id: SalesOrderId,
        paid_on: NaiveDate,
        bank_account_code: Option<String>,
    ) -> Result<OrderWithLines, WorkflowError> {
        self.transition(
            company_id,
            order_id,
            SalesAction::Pay {
                paid_on,
                bank_account_code,
            },
        )
        .await
    }

    /// DRAFT → CANCELLED.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        company_id: CompanyId,
        order_id: SalesOrderId,
    ) -> Result<OrderWithLines, WorkflowError> {
        self.transition(company_id, order_id, SalesAction::Cancel)
            .await
    }

    /// Fetches an order with its lines.
    ///
    /// # Errors
    ///
    /// `NotFound` for missing or foreign orders.
    pub async fn get_order(
        &self,
        company_id: CompanyId,
        order_id: SalesOrderId,
    ) -> Result<OrderWithLines, WorkflowError> {
        let order_id = order_id.into_inner();
        let order = sales_orders::Entity::find_by_id(order_id)
            .filter(sales_orders::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::NotFound("sales order"))?;
        let lines = sales_order_lines::Entity::find()
            .filter(sales_order_lines::Column::OrderId.eq(order_id))
            .order_by_asc(sales_order_lines::Column::LineNo)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(OrderWithLines { order, lines })
    }

    /// Lists the company's orders, newest first, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_orders(
        &self,
        company_id: CompanyId,
        status: Option<SalesOrderStatus>,
        page: &PageRequest,
    ) -> Result<PageResponse<sales_orders::Model>, WorkflowError> {
        let mut query = sales_orders::Entity::find()
            .filter(sales_orders::Column::CompanyId.eq(company_id.into_inner()));
        if let Some(status) = status {
            query = query.filter(
                sales_orders::Column::Status.eq(sea_orm_active_enums::SalesOrderStatus::from(status)),
            );
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let orders = query
            .order_by_desc(sales_orders::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(PageResponse::new(orders, page, total))
    }

    async fn transition(
        &self,
        company_id: CompanyId,
        order_id: SalesOrderId,
        action: SalesAction,
    ) -> Result<OrderWithLines, WorkflowError> {
        let transition = SalesTransition {
            sequencer: self.ledger.sequencer(),
            company_id: company_id.into_inner(),
            order_id: order_id.into_inner(),
            action,
        };
        run_transition(&self.db, &self.ledger, &transition).await
    }
}
