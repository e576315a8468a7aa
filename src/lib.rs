//! In-memory proof-of-work ledger for ballot transactions
//!
//! The [`blockchain`] module holds the ledger itself. [`voting`], [`config`]
//! and [`api`] make up the service around it.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod voting;
