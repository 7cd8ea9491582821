//! Core business logic for Corebook.
//!
//! This crate contains pure business logic with no database dependencies.
//! Proposal validation, numbering rules, account rule selection, costing
//! and order state machines live here.
//!
//! # Modules
//!
//! - `ledger` - Double-entry proposals, validation, reversal and statements
//! - `sequence` - Document numbering scopes and formats
//! - `rules` - Account role resolution by date and priority
//! - `workflow` - Sales order, purchase order and inventory logic

pub mod ledger;
pub mod rules;
pub mod sequence;
pub mod workflow;
