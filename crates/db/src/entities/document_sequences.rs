//! `SeaORM` Entity for document_sequences table.
//!
//! Rows are only ever written by the atomic upsert-increment in the
//! sequence repository; the entity exists for reads.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "document_sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub company_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub document_type: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub financial_year: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub branch: String,
    pub last_value: i64,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
