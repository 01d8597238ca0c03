//! # vestige-core
//!
//! Core types shared across all Vestige crates:
//! - Dynamic records, ordered record keys, and filter predicates
//! - The declarative schema descriptor (entities, fields, relations)
//! - Cascade edges derived from the descriptor
//! - The append-only deletion audit record and its cascade payload
//! - Schema error types

pub mod audit;
pub mod errors;
pub mod record;
pub mod schema;
