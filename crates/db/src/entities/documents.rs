//! `SeaORM` Entity for documents table.

use super::sea_orm_active_enums::DocumentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub document_type: String,
    pub status: DocumentStatus,
    pub financial_year: Option<i32>,
    pub branch: Option<String>,
    pub number: Option<String>,
    pub posted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document_types::Entity",
        from = "Column::DocumentType",
        to = "super::document_types::Column::Code"
    )]
    DocumentTypes,
}

impl Related<super::document_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentTypes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
