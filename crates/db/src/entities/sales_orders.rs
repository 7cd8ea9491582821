//! `SeaORM` Entity for sales_orders table.

use super::sea_orm_active_enums::SalesOrderStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub customer_name: String,
    pub status: SalesOrderStatus,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub warehouse_id: Uuid,
    pub order_date: Date,
    pub order_number: Option<String>,
    pub invoice_number: Option<String>,
    pub shipment_entry_id: Option<Uuid>,
    pub invoice_entry_id: Option<Uuid>,
    pub payment_entry_id: Option<Uuid>,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub shipped_at: Option<DateTimeWithTimeZone>,
    pub invoiced_at: Option<DateTimeWithTimeZone>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales_order_lines::Entity")]
    SalesOrderLines,
}

impl Related<super::sales_order_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesOrderLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
