//! Core domain modules for IISLens.
//!
//! Contains the record data model, the tolerant W3C parser and its
//! background reader, filter criteria, the record predicate, statistics
//! and the cancellable filter engine.

pub mod criteria;
pub mod field_schema;
pub mod filter;
pub mod filter_engine;
pub mod filter_preset;
pub mod log_parser;
pub mod log_reader;
pub mod log_record;
pub mod statistics;
