//! `SeaORM` Entity for purchase_orders table.

use super::sea_orm_active_enums::PurchaseOrderStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub vendor_name: String,
    pub status: PurchaseOrderStatus,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub warehouse_id: Uuid,
    pub order_date: Date,
    pub po_number: Option<String>,
    pub invoice_number: Option<String>,
    pub vendor_reference: Option<String>,
    pub vendor_invoice_amount: Option<Decimal>,
    pub invoice_entry_id: Option<Uuid>,
    pub payment_entry_id: Option<Uuid>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub received_at: Option<DateTimeWithTimeZone>,
    pub invoiced_at: Option<DateTimeWithTimeZone>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order_lines::Entity")]
    PurchaseOrderLines,
}

impl Related<super::purchase_order_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrderLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
