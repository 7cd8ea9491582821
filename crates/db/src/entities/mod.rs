//! `SeaORM` entity definitions.
//!
//! One module per table. Enum columns map to the PostgreSQL enum types
//! declared in the initial migration.

#![allow(missing_docs)]

pub mod account_rules;
pub mod accounts;
pub mod companies;
pub mod document_sequences;
pub mod document_types;
pub mod documents;
pub mod inventory_items;
pub mod inventory_movements;
pub mod journal_entries;
pub mod journal_lines;
pub mod products;
pub mod purchase_order_lines;
pub mod purchase_orders;
pub mod purchase_receipts;
pub mod sales_order_lines;
pub mod sales_orders;
pub mod sea_orm_active_enums;
pub mod warehouses;
