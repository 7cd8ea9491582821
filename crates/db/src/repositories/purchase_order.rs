//! Purchase order repository.
//!
//! Receipts lock the PO header and then every PO line `FOR UPDATE` before
//! summing what was already received, so two concurrent receipts against the
//! same line cannot both pass the over-receipt guard.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use corebook_core::rules::AccountRole;
use corebook_core::workflow::{
    CostingService, Decision, InvoiceDeviation, PostingBuilder, PostingContext,
    PurchaseOrderStatus, WorkflowError, WorkflowService, doc_types, transition_key,
};
use corebook_shared::config::LedgerConfig;
use corebook_shared::types::{
    CompanyId, PageRequest, PageResponse, ProductId, PurchaseOrderId, WarehouseId,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{
    companies, purchase_order_lines, purchase_orders, purchase_receipts, sea_orm_active_enums,
    sea_orm_active_enums::MovementType,
};
use crate::repositories::account::AccountRepository;
use crate::repositories::composer::{Staged, Transition, db_err, run_transition};
use crate::repositories::inventory::{
    NewMovement, insert_movement, load_company, load_product, load_warehouse, lock_items,
    receive_into,
};
use crate::repositories::ledger::LedgerRepository;
use crate::repositories::order::document_currency;
use crate::repositories::rule::RuleRepository;
use crate::repositories::sequence::SequenceRepository;

/// Default vendor-invoice tolerance, in percent.
pub const DEFAULT_INVOICE_TOLERANCE_PCT: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// One line of a new purchase order: a product or an expense account, not both.
#[derive(Debug, Clone)]
pub struct CreatePoLineInput {
    /// Stocked product received into the PO's warehouse.
    pub product_id: Option<ProductId>,
    /// Expense account debited on receipt, for service lines.
    pub expense_account_code: Option<String>,
    /// Line description; defaults to the product name.
    pub description: String,
    /// Ordered quantity, positive.
    pub quantity: Decimal,
    /// Unit cost in PO currency.
    pub unit_cost: Decimal,
}

/// Input for creating a purchase order.
#[derive(Debug, Clone)]
pub struct CreatePoInput {
    /// Owning company.
    pub company_id: CompanyId,
    /// Vendor.
    pub vendor_name: String,
    /// PO currency; the company's base currency when blank.
    pub currency: String,
    /// Rate to base currency; `1` when `None` or zero.
    pub exchange_rate: Option<Decimal>,
    /// Receiving warehouse.
    pub warehouse_id: WarehouseId,
    /// Order date.
    pub order_date: NaiveDate,
    /// Lines, at least one.
    pub lines: Vec<CreatePoLineInput>,
}

/// Quantity received against one PO line.
#[derive(Debug, Clone, Copy)]
pub struct ReceiveLineInput {
    /// PO line.
    pub line_id: Uuid,
    /// Quantity received now, positive.
    pub quantity: Decimal,
}

/// Input for a goods or service receipt.
#[derive(Debug, Clone)]
pub struct ReceivePoInput {
    /// Owning company.
    pub company_id: CompanyId,
    /// Purchase order.
    pub purchase_order_id: PurchaseOrderId,
    /// Lines received.
    pub lines: Vec<ReceiveLineInput>,
    /// Posting date.
    pub received_on: NaiveDate,
    /// Idempotency key for the receipt's posting; generated when `None`.
    pub idempotency_key: Option<String>,
}

/// Input for recording the vendor's invoice.
#[derive(Debug, Clone)]
pub struct VendorInvoiceInput {
    /// Owning company.
    pub company_id: CompanyId,
    /// Purchase order.
    pub purchase_order_id: PurchaseOrderId,
    /// Amount on the vendor's invoice, in PO currency.
    pub amount: Decimal,
    /// Vendor's own invoice reference.
    pub vendor_reference: Option<String>,
    /// Posting date.
    pub invoiced_on: NaiveDate,
}

/// A purchase order with its lines and received quantities.
#[derive(Debug, Clone, Serialize)]
pub struct PoWithLines {
    /// Header.
    pub purchase_order: purchase_orders::Model,
    /// Lines ordered by line number.
    pub lines: Vec<purchase_order_lines::Model>,
    /// Cumulative received quantity per line id.
    pub received: BTreeMap<Uuid, Decimal>,
}

impl PoWithLines {
    /// PO total in PO currency.
    ///
    /// # Errors
    ///
    /// `AmountOverflow` when the total exceeds the decimal range.
    pub fn total(&self) -> Result<Decimal, WorkflowError> {
        CostingService::document_total(self.lines.iter().map(|l| (l.quantity, l.unit_cost)))
    }

    /// Quantity received so far on a line.
    #[must_use]
    pub fn received_qty(&self, line_id: Uuid) -> Decimal {
        self.received.get(&line_id).copied().unwrap_or_default()
    }

    /// Whether every line is fully received.
    #[must_use]
    pub fn fully_received(&self) -> bool {
        self.lines
            .iter()
            .all(|l| self.received_qty(l.id) >= l.quantity)
    }
}

/// Result of a purchase-order transition.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    /// PO after the transition.
    pub purchase_order: PoWithLines,
    /// Entry posted by the transition, if any.
    pub entry_id: Option<Uuid>,
    /// Vendor-invoice deviation warning.
    pub deviation: Option<InvoiceDeviation>,
}

struct PoHeader {
    company: companies::Model,
    po: PoWithLines,
}

impl PoHeader {
    fn context(&self, posting_date: NaiveDate) -> PostingContext {
        let po = &self.po.purchase_order;
        PostingContext {
            company_code: self.company.code.clone(),
            currency: po.currency.clone(),
            exchange_rate: po.exchange_rate,
            posting_date,
        }
    }

    fn label(&self) -> String {
        let po = &self.po.purchase_order;
        po.po_number.clone().unwrap_or_else(|| po.id.to_string())
    }
}

async fn received_quantities<C: sea_orm::ConnectionTrait>(
    conn: &C,
    po_id: Uuid,
) -> Result<BTreeMap<Uuid, Decimal>, WorkflowError> {
    let rows: Vec<(Uuid, Decimal)> = purchase_receipts::Entity::find()
        .select_only()
        .column(purchase_receipts::Column::PurchaseOrderLineId)
        .column(purchase_receipts::Column::Quantity)
        .filter(purchase_receipts::Column::PurchaseOrderId.eq(po_id))
        .into_tuple()
        .all(conn)
        .await
        .map_err(db_err)?;

    let mut received = BTreeMap::new();
    for (line_id, quantity) in rows {
        *received.entry(line_id).or_insert(Decimal::ZERO) += quantity;
    }
    Ok(received)
}

/// Locks the header, then its lines, then sums receipts.
async fn lock_po(
    txn: &DatabaseTransaction,
    company_id: Uuid,
    po_id: Uuid,
) -> Result<PoHeader, WorkflowError> {
    let purchase_order = purchase_orders::Entity::find_by_id(po_id)
        .filter(purchase_orders::Column::CompanyId.eq(company_id))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or(WorkflowError::NotFound("purchase order"))?;
    let company = load_company(txn, company_id).await?;
    let lines = purchase_order_lines::Entity::find()
        .filter(purchase_order_lines::Column::PurchaseOrderId.eq(po_id))
        .order_by_asc(purchase_order_lines::Column::LineNo)
        .lock_exclusive()
        .all(txn)
        .await
        .map_err(db_err)?;
    let received = received_quantities(txn, po_id).await?;

    Ok(PoHeader {
        company,
        po: PoWithLines {
            purchase_order,
            lines,
            received,
        },
    })
}

#[derive(Debug, Clone)]
enum PurchaseAction {
    Approve,
    Receive {
        lines: Vec<ReceiveLineInput>,
        received_on: NaiveDate,
        idempotency_key: String,
    },
    Invoice {
        amount: Decimal,
        vendor_reference: Option<String>,
        invoiced_on: NaiveDate,
    },
    Pay {
        paid_on: NaiveDate,
        bank_account_code: Option<String>,
    },
}

struct PendingReceipt {
    line_id: Uuid,
    quantity: Decimal,
    received_on: NaiveDate,
}

enum PurchaseState {
    Nothing,
    Number(Option<String>),
    Receipts {
        receipts: Vec<PendingReceipt>,
        movements: Vec<NewMovement>,
    },
    Invoiced {
        number: Option<String>,
        deviation: Option<InvoiceDeviation>,
    },
}

struct PurchaseTransition<'a> {
    sequencer: &'a SequenceRepository,
    tolerance_pct: Decimal,
    company_id: Uuid,
    po_id: Uuid,
    action: PurchaseAction,
}

impl PurchaseTransition<'_> {
    /// Quantity per line for this receipt, with duplicate lines merged.
    fn receiving(&self, header: &PoHeader) -> Result<BTreeMap<Uuid, Decimal>, WorkflowError> {
        let PurchaseAction::Receive { lines, .. } = &self.action else {
            return Ok(BTreeMap::new());
        };
        if lines.is_empty() {
            return Err(WorkflowError::InvalidLine("no lines to receive".into()));
        }

        let mut receiving: BTreeMap<Uuid, Decimal> = BTreeMap::new();
        for input in lines {
            CostingService::ensure_positive(input.quantity)?;
            if !header.po.lines.iter().any(|l| l.id == input.line_id) {
                return Err(WorkflowError::NotFound("purchase order line"));
            }
            *receiving.entry(input.line_id).or_insert(Decimal::ZERO) += input.quantity;
        }
        for (line_id, quantity) in &receiving {
            let ordered = header
                .po
                .lines
                .iter()
                .find(|l| l.id == *line_id)
                .map(|l| l.quantity)
                .unwrap_or_default();
            CostingService::check_receipt(
                *line_id,
                ordered,
                header.po.received_qty(*line_id),
                *quantity,
            )?;
        }
        Ok(receiving)
    }

    async fn approve(
        &self,
        txn: &DatabaseTransaction,
        header: &PoHeader,
    ) -> Result<Staged<PurchaseState>, WorkflowError> {
        let document = self
            .sequencer
            .assign_in_tx(
                txn,
                self.company_id,
                doc_types::PURCHASE_ORDER,
                Some(header.po.purchase_order.order_date.year()),
                None,
            )
            .await?;
        Ok(Staged::new(PurchaseState::Number(document.number), None))
    }

    async fn receive(
        &self,
        txn: &DatabaseTransaction,
        header: &PoHeader,
        received_on: NaiveDate,
        idempotency_key: &str,
    ) -> Result<Staged<PurchaseState>, WorkflowError> {
        let po = &header.po.purchase_order;
        let receiving = self.receiving(header)?;
        let lines: Vec<&purchase_order_lines::Model> = header
            .po
            .lines
            .iter()
            .filter(|l| receiving.contains_key(&l.id))
            .collect();

        let goods = lines
            .iter()
            .filter_map(|l| l.product_id)
            .map(|p| (p, po.warehouse_id));
        let mut items = lock_items(txn, self.company_id, goods).await?;

        let inventory = if lines.iter().any(|l| l.product_id.is_some()) {
            Some(
                RuleRepository::resolve_in_tx(
                    txn,
                    self.company_id,
                    AccountRole::Inventory,
                    received_on,
                )
                .await?,
            )
        } else {
            None
        };
        let clearing = RuleRepository::resolve_in_tx(
            txn,
            self.company_id,
            AccountRole::GoodsReceivedClearing,
            received_on,
        )
        .await?;

        let mut debits = Vec::with_capacity(lines.len());
        let mut receipts = Vec::with_capacity(lines.len());
        let mut movements = Vec::new();
        for line in lines {
            let quantity = receiving.get(&line.id).copied().unwrap_or_default();
            let value = CostingService::line_total(quantity, line.unit_cost)?;

            match (line.product_id, &line.expense_account_code, &inventory) {
                (Some(product_id), _, Some(inventory)) => {
                    let key = (product_id, po.warehouse_id);
                    let item = items
                        .remove(&key)
                        .ok_or(WorkflowError::NotFound("inventory item"))?;
                    let base_cost = line
                        .unit_cost
                        .checked_mul(po.exchange_rate)
                        .ok_or(WorkflowError::AmountOverflow("base unit cost"))?;
                    let item = receive_into(txn, item, quantity, base_cost).await?;
                    items.insert(key, item);

                    movements.push(NewMovement {
                        company_id: self.company_id,
                        product_id,
                        warehouse_id: po.warehouse_id,
                        movement_type: MovementType::Receipt,
                        quantity,
                        unit_cost: base_cost,
                        purchase_order_line_id: Some(line.id),
                        sales_order_id: None,
                        journal_entry_id: None,
                    });
                    debits.push((inventory.clone(), value));
                }
                (None, Some(expense), _) => debits.push((expense.clone(), value)),
                _ => {
                    return Err(WorkflowError::InvalidLine(format!(
                        "line {} has neither a product nor an expense account",
                        line.line_no
                    )));
                }
            }
            receipts.push(PendingReceipt {
                line_id: line.id,
                quantity,
                received_on,
            });
        }

        let proposal = PostingBuilder::receipt(
            &header.context(received_on),
            idempotency_key.to_string(),
            format!("Goods receipt for {}", header.label()),
            &debits,
            &clearing,
        );
        Ok(Staged::new(
            PurchaseState::Receipts {
                receipts,
                movements,
            },
            proposal,
        ))
    }

    async fn invoice(
        &self,
        txn: &DatabaseTransaction,
        header: &PoHeader,
        amount: Decimal,
        vendor_reference: Option<&str>,
        invoiced_on: NaiveDate,
    ) -> Result<Staged<PurchaseState>, WorkflowError> {
        let po = &header.po.purchase_order;
        let total = header.po.total()?;
        let deviation = CostingService::invoice_deviation(total, amount, self.tolerance_pct);
        if let Some(deviation) = &deviation {
            tracing::warn!(
                po_id = %po.id,
                expected = %deviation.expected,
                invoiced = %deviation.invoiced,
                deviation_pct = %deviation.deviation_pct,
                "{}",
                deviation.message()
            );
        }

        let clearing = RuleRepository::resolve_in_tx(
            txn,
            self.company_id,
            AccountRole::GoodsReceivedClearing,
            invoiced_on,
        )
        .await?;
        let payable = RuleRepository::resolve_in_tx(
            txn,
            self.company_id,
            AccountRole::AccountsPayable,
            invoiced_on,
        )
        .await?;
        let document = self
            .sequencer
            .assign_in_tx(
                txn,
                self.company_id,
                doc_types::PURCHASE_INVOICE,
                Some(invoiced_on.year()),
                None,
            )
            .await?;

        let narration = match vendor_reference {
            Some(reference) => format!("Vendor invoice {reference} for {}", header.label()),
            None => format!("Vendor invoice for {}", header.label()),
        };
        let proposal = PostingBuilder::vendor_invoice(
            &header.context(invoiced_on),
            transition_key(doc_types::PURCHASE_ORDER, po.id, "INVOICE"),
            narration,
            &clearing,
            &payable,
            total,
        )
        .map(|p| p.with_document(document.id));
        Ok(Staged::new(
            PurchaseState::Invoiced {
                number: document.number,
                deviation,
            },
            proposal,
        ))
    }

    async fn pay(
        &self,
        txn: &DatabaseTransaction,
        header: &PoHeader,
        paid_on: NaiveDate,
        bank_account_code: Option<&str>,
    ) -> Result<Staged<PurchaseState>, WorkflowError> {
        let bank = match bank_account_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => code.to_string(),
            None => {
                RuleRepository::resolve_in_tx(txn, self.company_id, AccountRole::Bank, paid_on)
                    .await?
            }
        };
        let payable = RuleRepository::resolve_in_tx(
            txn,
            self.company_id,
            AccountRole::AccountsPayable,
            paid_on,
        )
        .await?;

        let proposal = PostingBuilder::vendor_payment(
            &header.context(paid_on),
            transition_key(doc_types::PURCHASE_ORDER, header.po.purchase_order.id, "PAYMENT"),
            format!("Payment for {}", header.label()),
            &payable,
            &bank,
            header.po.total()?,
        );
        Ok(Staged::new(PurchaseState::Nothing, proposal))
    }
}

#[async_trait]
impl Transition for PurchaseTransition<'_> {
    type Header = PoHeader;
    type State = PurchaseState;
    type Output = PurchaseOutcome;

    async fn lock(&self, txn: &DatabaseTransaction) -> Result<PoHeader, WorkflowError> {
        lock_po(txn, self.company_id, self.po_id).await
    }

    fn check(&self, header: &PoHeader) -> Result<Decision, WorkflowError> {
        let current: PurchaseOrderStatus = header.po.purchase_order.status.into();
        match &self.action {
            PurchaseAction::Approve => WorkflowService::approve_po(current),
            PurchaseAction::Receive { .. } => {
                WorkflowService::receive_po(current)?;
                self.receiving(header)?;
                Ok(Decision::Proceed)
            }
            PurchaseAction::Invoice { amount, .. } => {
                WorkflowService::invoice_po(current)?;
                if *amount <= Decimal::ZERO {
                    return Err(WorkflowError::InvalidLine(format!(
                        "vendor invoice amount must be positive, got {amount}"
                    )));
                }
                Ok(Decision::Proceed)
            }
            PurchaseAction::Pay { .. } => WorkflowService::pay_po(current).map(|_| Decision::Proceed),
        }
    }

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        header: &PoHeader,
    ) -> Result<Staged<PurchaseState>, WorkflowError> {
        match &self.action {
            PurchaseAction::Approve => self.approve(txn, header).await,
            PurchaseAction::Receive {
                received_on,
                idempotency_key,
                ..
            } => self.receive(txn, header, *received_on, idempotency_key).await,
            PurchaseAction::Invoice {
                amount,
                vendor_reference,
                invoiced_on,
            } => {
                self.invoice(txn, header, *amount, vendor_reference.as_deref(), *invoiced_on)
                    .await
            }
            PurchaseAction::Pay {
                paid_on,
                bank_account_code,
            } => {
                self.pay(txn, header, *paid_on, bank_account_code.as_deref())
                    .await
            }
        }
    }

    async fn finish(
        &self,
        txn: &DatabaseTransaction,
        header: PoHeader,
        state: PurchaseState,
        entry_id: Option<Uuid>,
    ) -> Result<PurchaseOutcome, WorkflowError> {
        let PoWithLines {
            purchase_order,
            lines,
            mut received,
        } = header.po;
        let previous: PurchaseOrderStatus = purchase_order.status.into();
        let now = Utc::now();
        let mut active: purchase_orders::ActiveModel = purchase_order.into();
        active.updated_at = Set(now.into());
        let mut deviation = None;

        let next = match (&self.action, state) {
            (PurchaseAction::Approve, PurchaseState::Number(number)) => {
                active.po_number = Set(number);
                active.approved_at = Set(Some(now.into()));
                PurchaseOrderStatus::Approved
            }
            (
                PurchaseAction::Receive { .. },
                PurchaseState::Receipts {
                    receipts,
                    movements,
                },
            ) => {
                for receipt in receipts {
                    purchase_receipts::ActiveModel {
                        id: Set(Uuid::now_v7()),
                        company_id: Set(self.company_id),
                        purchase_order_id: Set(self.po_id),
                        purchase_order_line_id: Set(receipt.line_id),
                        quantity: Set(receipt.quantity),
                        received_on: Set(receipt.received_on),
                        journal_entry_id: Set(entry_id),
                        created_at: Set(now.into()),
                    }
                    .insert(txn)
                    .await
                    .map_err(db_err)?;
                    *received.entry(receipt.line_id).or_insert(Decimal::ZERO) += receipt.quantity;
                }
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

                let complete = lines.iter().all(|l| {
                    received.get(&l.id).copied().unwrap_or_default() >= l.quantity
                });
                if complete {
                    active.received_at = Set(Some(now.into()));
                    PurchaseOrderStatus::Received
                } else {
                    previous
                }
            }
            (
                PurchaseAction::Invoice {
                    amount,
                    vendor_reference,
                    ..
                },
                PurchaseState::Invoiced {
                    number,
                    deviation: found,
                },
            ) => {
                active.invoice_number = Set(number);
                active.vendor_reference = Set(vendor_reference.clone());
                active.vendor_invoice_amount = Set(Some(*amount));
                active.invoice_entry_id = Set(entry_id);
                active.invoiced_at = Set(Some(now.into()));
                deviation = found;
                PurchaseOrderStatus::Invoiced
            }
            (PurchaseAction::Pay { .. }, PurchaseState::Nothing) => {
                active.payment_entry_id = Set(entry_id);
                active.paid_at = Set(Some(now.into()));
                PurchaseOrderStatus::Paid
            }
            _ => {
                return Err(WorkflowError::Database(
                    "purchase order transition staged the wrong state".into(),
                ));
            }
        };

        active.status = Set(next.into());
        let purchase_order = active.update(txn).await.map_err(db_err)?;

        tracing::info!(
            po_id = %purchase_order.id,
            from = previous.as_str(),
            to = next.as_str(),
            entry_id = ?entry_id,
            "Purchase order transitioned"
        );
        Ok(PurchaseOutcome {
            purchase_order: PoWithLines {
                purchase_order,
                lines,
                received,
            },
            entry_id,
            deviation,
        })
    }

    fn unchanged(&self, header: PoHeader) -> Result<PurchaseOutcome, WorkflowError> {
        tracing::info!(po_id = %self.po_id, "Purchase order already approved");
        Ok(PurchaseOutcome {
            purchase_order: header.po,
            entry_id: None,
            deviation: None,
        })
    }
}

/// Purchase order repository.
#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    db: DatabaseConnection,
    ledger: LedgerRepository,
    tolerance_pct: Decimal,
}

impl PurchaseOrderRepository {
    /// Creates a new purchase order repository with the default 5% tolerance.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let ledger = LedgerRepository::new(db.clone());
        Self {
            db,
            ledger,
            tolerance_pct: DEFAULT_INVOICE_TOLERANCE_PCT,
        }
    }

    /// Uses the given ledger (and its sequencer) for postings and numbers.
    #[must_use]
    pub fn with_ledger(mut self, ledger: LedgerRepository) -> Self {
        self.ledger = ledger;
        self
    }

    /// Applies the ledger configuration's invoice tolerance.
    #[must_use]
    pub fn with_config(mut self, config: &LedgerConfig) -> Self {
        self.tolerance_pct = config.invoice_deviation_tolerance_pct;
        self
    }

    /// Creates a DRAFT purchase order.
    ///
    /// # Errors
    ///
    /// `EmptyOrder`, `InvalidQuantity`, `InvalidLine` for lines with both or
    /// neither of product and expense account, `NotFound` for foreign
    /// warehouses or products, and `AccountNotFound` for unknown expense codes.
    #[tracing::instrument(skip(self, input), fields(company_id = %input.company_id, lines = input.lines.len()))]
    pub async fn create_po(&self, input: CreatePoInput) -> Result<PoWithLines, WorkflowError> {
        if input.lines.is_empty() {
            return Err(WorkflowError::EmptyOrder);
        }
        if input.vendor_name.trim().is_empty() {
            return Err(WorkflowError::InvalidLine("vendor name is required".into()));
        }

        let company_id = input.company_id.into_inner();
        let txn = self.db.begin().await.map_err(db_err)?;
        let company = load_company(&txn, company_id).await?;
        let warehouse = load_warehouse(&txn, company_id, input.warehouse_id.into_inner()).await?;
        let (currency, exchange_rate) =
            document_currency(&input.currency, input.exchange_rate, &company.base_currency)?;

        let expense_codes: Vec<String> = input
            .lines
            .iter()
            .filter_map(|l| l.expense_account_code.as_deref())
            .map(|c| c.trim().to_string())
            .collect();
        AccountRepository::resolve_codes_in_tx(&txn, company_id, expense_codes).await?;

        let po_id = PurchaseOrderId::new().into_inner();
        let now = Utc::now();
        let mut lines = Vec::with_capacity(input.lines.len());
        for (line_no, line) in (1_i32..).zip(&input.lines) {
            CostingService::ensure_positive(line.quantity)?;
            if line.unit_cost < Decimal::ZERO {
                return Err(WorkflowError::InvalidLine(format!(
                    "line {line_no}: unit cost cannot be negative"
                )));
            }
            let expense = line
                .expense_account_code
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);

            let product = match (line.product_id, &expense) {
                (Some(id), None) => {
                    let product = load_product(&txn, company_id, id.into_inner()).await?;
                    if !product.is_stocked {
                        return Err(WorkflowError::InvalidLine(format!(
                            "line {line_no}: product {} is not stocked",
                            product.sku
                        )));
                    }
                    Some(product)
                }
                (None, Some(_)) => None,
                _ => {
                    return Err(WorkflowError::InvalidLine(format!(
                        "line {line_no}: exactly one of product or expense account is required"
                    )));
                }
            };
            let description = match (line.description.trim(), &product) {
                ("", Some(p)) => p.name.clone(),
                ("", None) => {
                    return Err(WorkflowError::InvalidLine(format!(
                        "line {line_no}: description is required"
                    )));
                }
                (d, _) => d.to_string(),
            };

            lines.push(purchase_order_lines::ActiveModel {
                id: Set(Uuid::now_v7()),
                purchase_order_id: Set(po_id),
                line_no: Set(line_no),
                product_id: Set(product.map(|p| p.id)),
                expense_account_code: Set(expense),
                description: Set(description),
                quantity: Set(line.quantity),
                unit_cost: Set(line.unit_cost),
            });
        }
        CostingService::document_total(input.lines.iter().map(|l| (l.quantity, l.unit_cost)))?;

        let purchase_order = purchase_orders::ActiveModel {
            id: Set(po_id),
            company_id: Set(company_id),
            vendor_name: Set(input.vendor_name.trim().to_string()),
            status: Set(sea_orm_active_enums::PurchaseOrderStatus::Draft),
            currency: Set(currency),
            exchange_rate: Set(exchange_rate),
            warehouse_id: Set(warehouse.id),
            order_date: Set(input.order_date),
            po_number: Set(None),
            invoice_number: Set(None),
            vendor_reference: Set(None),
            vendor_invoice_amount: Set(None),
            invoice_entry_id: Set(None),
            payment_entry_id: Set(None),
            approved_at: Set(None),
            received_at: Set(None),
            invoiced_at: Set(None),
            paid_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;
        purchase_order_lines::Entity::insert_many(lines)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        let lines = purchase_order_lines::Entity::find()
            .filter(purchase_order_lines::Column::PurchaseOrderId.eq(po_id))
            .order_by_asc(purchase_order_lines::Column::LineNo)
            .all(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        tracing::info!(%po_id, "Purchase order created");
        Ok(PoWithLines {
            purchase_order,
            lines,
            received: BTreeMap::new(),
        })
    }

    /// DRAFT → APPROVED and assigns the PO number. Approving an APPROVED PO
    /// returns it unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any later status.
    #[tracing::instrument(skip(self))]
    pub async fn approve_po(
        &self,
        company_id: CompanyId,
        po_id: PurchaseOrderId,
    ) -> Result<PoWithLines, WorkflowError> {
        self.transition(company_id, po_id, PurchaseAction::Approve)
            .await
            .map(|o| o.purchase_order)
    }

    /// Receives goods and services against an APPROVED PO.
    ///
    /// Goods lines post Dr Inventory and update stock at weighted-average
    /// cost in base currency; service lines post Dr their expense account.
    /// Everything is credited to goods-received clearing. The PO becomes
    /// RECEIVED once every line is fully received.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, `QuantityExceedsOrdered`, `InvalidQuantity`,
    /// `NotFound` for lines of another PO, rule or ledger errors.
    #[tracing::instrument(skip(self, input), fields(company_id = %input.company_id, po_id = %input.purchase_order_id))]
    pub async fn receive_po(&self, input: ReceivePoInput) -> Result<PurchaseOutcome, WorkflowError> {
        let idempotency_key = input
            .idempotency_key
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| {
                transition_key(
                    doc_types::PURCHASE_ORDER,
                    input.purchase_order_id.into_inner(),
                    &format!("{}-{}", doc_types::GOODS_RECEIPT, Uuid::now_v7()),
                )
            });
        self.transition(
            input.company_id,
            input.purchase_order_id,
            PurchaseAction::Receive {
                lines: input.lines,
                received_on: input.received_on,
                idempotency_key,
            },
        )
        .await
    }

    /// RECEIVED → INVOICED: posts Dr GR-clearing / Cr AP at the PO total.
    ///
    /// A vendor amount outside the tolerance is logged and returned as a
    /// warning; it never blocks.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, `InvalidLine` for non-positive amounts, rule,
    /// sequencing or ledger errors.
    #[tracing::instrument(skip(self, input), fields(company_id = %input.company_id, po_id = %input.purchase_order_id))]
    pub async fn record_vendor_invoice(
        &self,
        input: VendorInvoiceInput,
    ) -> Result<PurchaseOutcome, WorkflowError> {
        let vendor_reference = input
            .vendor_reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        self.transition(
            input.company_id,
            input.purchase_order_id,
            PurchaseAction::Invoice {
                amount: input.amount,
                vendor_reference,
                invoiced_on: input.invoiced_on,
            },
        )
        .await
    }

    /// INVOICED → PAID: posts Dr AP / Cr the chosen bank account.
    ///
    /// `bank_account_code` overrides the bank rule.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, rule or ledger errors.
    #[tracing::instrument(skip(self))]
    pub async fn pay_vendor(
        &self,
        company_id: CompanyId,
        po_id: PurchaseOrderId,
        paid_on: NaiveDate,
        bank_account_code: Option<String>,
    ) -> Result<PurchaseOutcome, WorkflowError> {
        self.transition(
            company_id,
            po_id,
            PurchaseAction::Pay {
                paid_on,
                bank_account_code,
            },
        )
        .await
    }

    /// Fetches a PO with its lines and received quantities.
    ///
    /// # Errors
    ///
    /// `NotFound` for missing or foreign POs.
    pub async fn get_po(
        &self,
        company_id: CompanyId,
        po_id: PurchaseOrderId,
    ) -> Result<PoWithLines, WorkflowError> {
        let po_id = po_id.into_inner();
        let purchase_order = purchase_orders::Entity::find_by_id(po_id)
            .filter(purchase_orders::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::NotFound("purchase order"))?;
        let lines = purchase_order_lines::Entity::find()
            .filter(purchase_order_lines::Column::PurchaseOrderId.eq(po_id))
            .order_by_asc(purchase_order_lines::Column::LineNo)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let received = received_quantities(&self.db, po_id).await?;
        Ok(PoWithLines {
            purchase_order,
            lines,
            received,
        })
    }

    /// Lists the company's POs, newest first, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_pos(
        &self,
        company_id: CompanyId,
        status: Option<PurchaseOrderStatus>,
        page: &PageRequest,
    ) -> Result<PageResponse<purchase_orders::Model>, WorkflowError> {
        let mut query = purchase_orders::Entity::find()
            .filter(purchase_orders::Column::CompanyId.eq(company_id.into_inner()));
        if let Some(status) = status {
            query = query.filter(
                purchase_orders::Column::Status
                    .eq(sea_orm_active_enums::PurchaseOrderStatus::from(status)),
            );
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let pos = query
            .order_by_desc(purchase_orders::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(PageResponse::new(pos, page, total))
    }

    async fn transition(
        &self,
        company_id: CompanyId,
        po_id: PurchaseOrderId,
        action: PurchaseAction,
    ) -> Result<PurchaseOutcome, WorkflowError> {
        let transition = PurchaseTransition {
            sequencer: self.ledger.sequencer(),
            tolerance_pct: self.tolerance_pct,
            company_id: company_id.into_inner(),
            po_id: po_id.into_inner(),
            action,
        };
        run_transition(&self.db, &self.ledger, &transition).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(id: Uuid, quantity: Decimal, unit_cost: Decimal) -> purchase_order_lines::Model {
        purchase_order_lines::Model {
            id,
            purchase_order_id: Uuid::nil(),
            line_no: 1,
            product_id: None,
            expense_account_code: Some("6100".into()),
            description: "Consulting".into(),
            quantity,
            unit_cost,
        }
    }

    fn po(lines: Vec<purchase_order_lines::Model>, received: BTreeMap<Uuid, Decimal>) -> PoWithLines {
        let now = Utc::now();
        PoWithLines {
            purchase_order: purchase_orders::Model {
                id: Uuid::nil(),
                company_id: Uuid::nil(),
                vendor_name: "Acme".into(),
                status: sea_orm_active_enums::PurchaseOrderStatus::Approved,
                currency: "USD".into(),
                exchange_rate: Decimal::ONE,
                warehouse_id: Uuid::nil(),
                order_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                po_number: None,
                invoice_number: None,
                vendor_reference: None,
                vendor_invoice_amount: None,
                invoice_entry_id: None,
                payment_entry_id: None,
                approved_at: None,
                received_at: None,
                invoiced_at: None,
                paid_at: None,
                created_at: now.into(),
                updated_at: now.into(),
            },
            lines,
            received,
        }
    }

    #[test]
    fn test_default_tolerance_is_five_percent() {
        assert_eq!(DEFAULT_INVOICE_TOLERANCE_PCT, dec!(5));
    }

    #[test]
    fn test_total_sums_lines() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let po = po(
            vec![line(a, dec!(10), dec!(20)), line(b, dec!(2), dec!(12.5))],
            BTreeMap::new(),
        );
        assert_eq!(po.total().unwrap(), dec!(225));
    }

    #[test]
    fn test_fully_received_needs_every_line() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let lines = vec![line(a, dec!(10), dec!(1)), line(b, dec!(5), dec!(1))];

        let partial = po(lines.clone(), BTreeMap::from([(a, dec!(10)), (b, dec!(4))]));
        assert!(!partial.fully_received());
        assert_eq!(partial.received_qty(b), dec!(4));

        let complete = po(lines, BTreeMap::from([(a, dec!(10)), (b, dec!(5))]));
        assert!(complete.fully_received());
    }

    #[test]
    fn test_unreceived_line_reports_zero() {
        let a = Uuid::now_v7();
        let po = po(vec![line(a, dec!(1), dec!(1))], BTreeMap::new());
        assert_eq!(po.received_qty(a), Decimal::ZERO);
        assert!(!po.fully_received());
    }
}
