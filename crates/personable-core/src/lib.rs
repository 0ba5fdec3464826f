//! # personable-core
//!
//! Core types, filters, and record workflows for the personable CRM backend.
//!
//! This crate holds the entity model, the filter builder and its predicate
//! form, the [`Outcome`] wrapper every operation returns, the storage traits
//! that backends implement, and the lead conversion workflow. An in-process
//! backend lives in [`memory`]; the PostgreSQL backend is `personable-db`.
//!
//! ## Logging
//!
//! Events use the fields `subsystem` (`api`, `service`, `db`, `memory`),
//! `component`, `op`, `collection`, `record_id`, `lead_id`, `contact_id`,
//! `actor`, `result_count`, `duration_ms`, `error` and `consistency`.
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Failed outcomes, conversions left pending |
//! | WARN  | A reconciliation pass that skipped a lead |
//! | INFO  | Startup, shutdown, conversions, reconciliation reports |
//! | DEBUG | Per-operation outcomes, predicate sizes |
//! | TRACE | Per-document iteration |

pub mod conversion;
pub mod error;
pub mod filter;
pub mod memory;
pub mod models;
pub mod outcome;
pub mod predicate;
pub mod services;
pub mod traits;

// Re-export commonly used types at crate root
pub use conversion::{contact_from_lead, convert_lead, reconcile_pending_conversions, ReconcileReport};
pub use error::{Error, Result};
pub use filter::{ContactFilter, LeadFilter, RecordFilter, UserFilter};
pub use memory::MemoryCollection;
pub use models::*;
pub use outcome::{Outcome, Problem};
pub use predicate::{Clause, Condition, FieldPath, Predicate};
pub use services::{
    ContactService, ConvertLead, LeadService, NewLead, UpdateContact, UserInput, UserService,
};
pub use traits::*;
