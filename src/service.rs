//! Service envelope
//!
//! Owns the mutable processor state behind a reader/writer lock and the
//! monotonic transaction-id counter. Incoming requests are stamped with an
//! id and a UTC timestamp, then applied through the ledger processor: pure
//! queries run under the read lock and may proceed in parallel, mutating
//! actions run under the write lock and commit the returned state before
//! releasing it. The ledger append happens while the write lock is held,
//! so durability is linearized with state transitions.

use crate::config::Config;
use crate::engine::BankState;
use crate::error::{Error, Result, TransactionError};
use crate::ledger::Ledger;
use crate::metrics::Metrics;
use crate::types::{
    AccessScope, AccessTokenId, AccountAction, AccountId, Transaction, TransactionRequest,
    TransactionResult, ROOT_ACCOUNT_ID,
};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// The running service: ledger, state, and id counter
#[derive(Debug)]
pub struct BankService {
    ledger: Ledger,
    state: RwLock<BankState>,
    next_id: AtomicU64,
    metrics: Metrics,
}

impl BankService {
    /// Open the ledger, replay it into a fresh state, and initialise the
    /// id counter to the highest id seen
    pub fn open(config: &Config, metrics: Metrics) -> Result<Self> {
        let ledger = Ledger::open(&config.ledger.store_path)?;
        let (state, max_id) = ledger.load_state()?;
        metrics.set_account_count(state.account_count());
        Ok(Self {
            ledger,
            state: RwLock::new(state),
            next_id: AtomicU64::new(max_id),
            metrics,
        })
    }

    /// Promote a request to a stamped transaction
    fn stamp(&self, request: TransactionRequest) -> Transaction {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Transaction::stamp(request, id, Utc::now())
    }

    /// Untrusted entry point (external HTTP)
    ///
    /// Requests without an access token are rejected before any lock is
    /// taken.
    pub fn submit(
        &self,
        request: TransactionRequest,
    ) -> Result<std::result::Result<TransactionResult, TransactionError>> {
        if request.access_token.is_none() {
            self.metrics.record_apply(false, 0.0);
            return Ok(Err(TransactionError::Unauthorized));
        }
        self.submit_trusted(request)
    }

    /// Trusted entry point (internal callers, e.g. the root-token
    /// bootstrap); skips the token-presence gate
    pub fn submit_trusted(
        &self,
        request: TransactionRequest,
    ) -> Result<std::result::Result<TransactionResult, TransactionError>> {
        let transaction = self.stamp(request);
        let started = Instant::now();

        let outcome = if transaction.action.is_query() {
            let state = self.state.read();
            self.ledger
                .apply(&state, &transaction)?
                .map(|(_, result)| result)
        } else {
            let mut state = self.state.write();
            match self.ledger.apply(&state, &transaction)? {
                Ok((next, result)) => {
                    *state = next;
                    self.metrics.set_account_count(state.account_count());
                    Ok(result)
                }
                Err(err) => Err(err),
            }
        };

        self.metrics
            .record_apply(outcome.is_ok(), started.elapsed().as_secs_f64());
        match &outcome {
            Ok(_) => tracing::debug!(
                id = transaction.id,
                action = transaction.action.name(),
                account = %transaction.account,
                "transaction applied"
            ),
            Err(err) => tracing::debug!(
                id = transaction.id,
                action = transaction.action.name(),
                account = %transaction.account,
                error = %err,
                "transaction rejected"
            ),
        }
        Ok(outcome)
    }

    /// All tokens currently issued by the root account
    pub fn root_tokens(&self) -> Vec<(AccessTokenId, BTreeSet<AccessScope>)> {
        let state = self.state.read();
        state
            .account(&AccountId::new(ROOT_ACCOUNT_ID))
            .map(|root| {
                root.tokens
                    .iter()
                    .map(|(id, scopes)| (id.clone(), scopes.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Create one fresh `Unbounded` root token if the root account has
    /// none, so an operator can bootstrap
    pub fn mint_root_token_if_absent(&self) -> Result<()> {
        if !self.root_tokens().is_empty() {
            return Ok(());
        }
        let request = TransactionRequest {
            account: AccountId::new(ROOT_ACCOUNT_ID),
            authorization: crate::types::TransactionAuthorization::SelfAuthorized,
            access_token: None,
            action: AccountAction::CreateToken {
                token_id: AccessTokenId::generate(),
                scopes: BTreeSet::from([AccessScope::Unbounded]),
            },
        };
        match self.submit_trusted(request)? {
            Ok(_) => {
                tracing::info!("minted bootstrap root token");
                Ok(())
            }
            Err(err) => Err(Error::Bootstrap(format!(
                "could not mint root token: {err}"
            ))),
        }
    }

    /// Run a closure against the current state under the read lock
    pub fn with_state<T>(&self, f: impl FnOnce(&BankState) -> T) -> T {
        f(&self.state.read())
    }
}
