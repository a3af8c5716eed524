//! Reserve Engine
//!
//! A central-bank accounting engine: named accounts with balances, access
//! privileges, and access tokens, mutated by authorized transactions over a
//! single JSON-over-HTTP endpoint.
//!
//! # Architecture
//!
//! - **Pure processor**: state transitions are pure functions; the envelope
//!   owns all mutability behind a reader/writer lock
//! - **Append-only ledger**: every applied non-query transaction is
//!   persisted, and the full state is replayed from the ledger on startup
//! - **Capability scopes**: every action is gated by the acting account's
//!   privileges and, when presented, by the authorizer's token scopes
//! - **Exact arithmetic**: amounts are integers; balances never go negative
//!
//! # Invariants
//!
//! - Transfers conserve the total money supply; only minting changes it
//! - The ledger is append-only and its order matches transaction ids
//! - Replaying the ledger reproduces the live state

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod api;
pub mod authorize;
pub mod client;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod service;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use engine::BankState;
pub use error::{Error, Result, TransactionError};
pub use ledger::Ledger;
pub use service::BankService;
pub use types::{
    AccessScope, AccessTokenId, AccountAction, AccountData, AccountId, CurrencyAmount,
    Transaction, TransactionAuthorization, TransactionId, TransactionOutcome,
    TransactionRequest, TransactionResult, ROOT_ACCOUNT_ID,
};
