//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `SalesOrderId` where a
//! `PurchaseOrderId` is expected. All IDs are UUID v7 so they sort by
//! creation time, which the account statement relies on as a tie-breaker.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new time-ordered ID (UUID v7).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(CompanyId, "Unique identifier for a company.");
typed_id!(AccountId, "Unique identifier for a chart of accounts entry.");
typed_id!(JournalEntryId, "Unique identifier for a journal entry.");
typed_id!(DocumentId, "Unique identifier for a numbered document.");
typed_id!(SalesOrderId, "Unique identifier for a sales order.");
typed_id!(PurchaseOrderId, "Unique identifier for a purchase order.");
typed_id!(ProductId, "Unique identifier for a product.");
typed_id!(WarehouseId, "Unique identifier for a warehouse.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_is_v7() {
        let id = JournalEntryId::new();
        assert_eq!(id.into_inner().get_version_num(), 7);
    }

    #[test]
    fn test_typed_id_orders_by_creation() {
        let first = DocumentId::new();
        let second = DocumentId::new();
        assert!(first < second);
    }

    #[test]
    fn test_typed_id_uuid_conversions() {
        let uuid = Uuid::now_v7();
        let id: SalesOrderId = uuid.into();
        let back: Uuid = id.into();
        assert_eq!(back, uuid);
        assert_eq!(SalesOrderId::from_uuid(uuid), id);
    }

    #[test]
    fn test_typed_id_display_and_parse() {
        let uuid = Uuid::now_v7();
        let id = CompanyId::from_uuid(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
        assert_eq!(CompanyId::from_str(&uuid.to_string()).unwrap(), id);
        assert!(CompanyId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_typed_id_serializes_transparently() {
        let uuid = Uuid::now_v7();
        let id = PurchaseOrderId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
