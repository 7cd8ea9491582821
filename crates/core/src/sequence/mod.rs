//! Gapless document numbering rules.
//!
//! # Modules
//!
//! - `types` - Numbering strategy, document status, counter scope
//! - `error` - Numbering errors
//! - `service` - Scope resolution and number formatting

pub mod error;
pub mod service;
pub mod types;

pub use error::SequenceError;
pub use service::{DEFAULT_NUMBER_WIDTH, SequenceService};
pub use types::{DocumentStatus, DocumentTypeConfig, NumberingStrategy, SequenceScope};
