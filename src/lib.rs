//! IISLens library crate.
//!
//! Exposes the parser, filter engine and [`app::Session`] so that the
//! binary and the integration tests share one implementation. The binary
//! entry point is in `main.rs`.

pub mod app;
mod app_update;
pub mod core;
pub mod export;
pub mod util;
