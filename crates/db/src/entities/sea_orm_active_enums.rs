//! `SeaORM` active enums mirroring the PostgreSQL enum types, with
//! conversions to and from the core domain enums.

use corebook_core::rules::AccountRole as CoreAccountRole;
use corebook_core::sequence::{
    DocumentStatus as CoreDocumentStatus, NumberingStrategy as CoreNumberingStrategy,
};
use corebook_core::workflow::{
    PurchaseOrderStatus as CorePurchaseOrderStatus, SalesOrderStatus as CoreSalesOrderStatus,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
pub enum AccountType {
    #[sea_orm(string_value = "asset")]
    Asset,
    #[sea_orm(string_value = "liability")]
    Liability,
    #[sea_orm(string_value = "equity")]
    Equity,
    #[sea_orm(string_value = "revenue")]
    Revenue,
    #[sea_orm(string_value = "expense")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_role")]
pub enum AccountRole {
    #[sea_orm(string_value = "accounts_receivable")]
    AccountsReceivable,
    #[sea_orm(string_value = "accounts_payable")]
    AccountsPayable,
    #[sea_orm(string_value = "inventory")]
    Inventory,
    #[sea_orm(string_value = "cost_of_goods_sold")]
    CostOfGoodsSold,
    #[sea_orm(string_value = "sales_revenue")]
    SalesRevenue,
    #[sea_orm(string_value = "bank")]
    Bank,
    #[sea_orm(string_value = "goods_received_clearing")]
    GoodsReceivedClearing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "numbering_strategy")]
pub enum NumberingStrategy {
    #[sea_orm(string_value = "global")]
    Global,
    #[sea_orm(string_value = "per_financial_year")]
    PerFinancialYear,
    #[sea_orm(string_value = "per_branch")]
    PerBranch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "document_status")]
pub enum DocumentStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "POSTED")]
    Posted,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "sales_order_status")]
pub enum SalesOrderStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "SHIPPED")]
    Shipped,
    #[sea_orm(string_value = "INVOICED")]
    Invoiced,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "purchase_order_status")]
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "RECEIVED")]
    Received,
    #[sea_orm(string_value = "INVOICED")]
    Invoiced,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "movement_type")]
pub enum MovementType {
    #[sea_orm(string_value = "receipt")]
    Receipt,
    #[sea_orm(string_value = "shipment")]
    Shipment,
}

macro_rules! mirror_enum {
    ($db:ident, $core:ident, [$($variant:ident),+ $(,)?]) => {
        impl From<$db> for $core {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => $core::$variant,)+
                }
            }
        }

        impl From<$core> for $db {
            fn from(value: $core) -> Self {
                match value {
                    $($core::$variant => $db::$variant,)+
                }
            }
        }
    };
}

mirror_enum!(
    AccountRole,
    CoreAccountRole,
    [
        AccountsReceivable,
        AccountsPayable,
        Inventory,
        CostOfGoodsSold,
        SalesRevenue,
        Bank,
        GoodsReceivedClearing,
    ]
);
mirror_enum!(NumberingStrategy, CoreNumberingStrategy, [Global, PerFinancialYear, PerBranch]);
mirror_enum!(DocumentStatus, CoreDocumentStatus, [Draft, Posted, Cancelled]);
mirror_enum!(
    SalesOrderStatus,
    CoreSalesOrderStatus,
    [Draft, Confirmed, Shipped, Invoiced, Paid, Cancelled]
);
mirror_enum!(
    PurchaseOrderStatus,
    CorePurchaseOrderStatus,
    [Draft, Approved, Received, Invoiced, Paid]
);
