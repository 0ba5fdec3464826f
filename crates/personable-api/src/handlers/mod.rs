//! HTTP handlers, one module per record family.

pub mod contacts;
pub mod health;
pub mod leads;
pub mod users;
