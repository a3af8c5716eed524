//! History / ledger processor
//!
//! Wraps the in-memory processor and the transaction store. Successful
//! non-query transactions are appended to the store before the new state is
//! handed back, so the ledger only ever contains transactions that applied
//! cleanly and replay is total by construction. History queries, which the
//! inner processor defers with its not-implemented sentinel, are answered
//! here by scanning the store.

use crate::engine::BankState;
use crate::error::{Result, TransactionError};
use crate::storage::TransactionStore;
use crate::types::{
    AccountAction, AccountId, Transaction, TransactionId, TransactionResult, ROOT_ACCOUNT_ID,
};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Ledger-backed transaction processor
#[derive(Debug)]
pub struct Ledger {
    store: TransactionStore,
}

impl Ledger {
    /// Open the ledger over a store file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            store: TransactionStore::open(path)?,
        })
    }

    /// The backing store
    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    /// Apply one transaction against `state`
    ///
    /// The outer `Result` carries infrastructure failures (store I/O,
    /// codec); the inner one is the transaction outcome. A returned state
    /// is only produced together with a successful result.
    pub fn apply(
        &self,
        state: &BankState,
        transaction: &Transaction,
    ) -> Result<std::result::Result<(BankState, TransactionResult), TransactionError>> {
        match state.apply(transaction) {
            Ok((next, result)) => {
                if !transaction.action.is_query() {
                    self.store.append(transaction)?;
                    tracing::debug!(
                        id = transaction.id,
                        action = transaction.action.name(),
                        "transaction appended to ledger"
                    );
                }
                Ok(Ok((next, result)))
            }
            Err(TransactionError::ActionNotImplemented) => {
                if let AccountAction::QueryHistory { since } = &transaction.action {
                    let history = self.history_for(&transaction.account, *since)?;
                    Ok(Ok((state.clone(), TransactionResult::History(history))))
                } else {
                    Ok(Err(TransactionError::ActionNotImplemented))
                }
            }
            Err(err) => Ok(Err(err)),
        }
    }

    /// Transactions visible to `caller`: those it performed, plus transfers
    /// it received, at or after `since`. Most recent first.
    fn history_for(&self, caller: &AccountId, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        let mut matches: Vec<Transaction> = self
            .store
            .scan()?
            .into_iter()
            .filter(|transaction| {
                transaction.performed_at >= since
                    && (transaction.account == *caller
                        || matches!(
                            &transaction.action,
                            AccountAction::Transfer { destination, .. } if destination == caller
                        ))
            })
            .collect();
        matches.sort_by(|a, b| {
            b.performed_at
                .cmp(&a.performed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matches)
    }

    /// Rebuild the state by folding the stored transactions over the
    /// bootstrapped root account
    ///
    /// Returns the state and the highest transaction id seen, which seeds
    /// the envelope's id counter. Entries that no longer apply are dropped
    /// with a warning rather than aborting startup.
    pub fn load_state(&self) -> Result<(BankState, TransactionId)> {
        let mut state = BankState::new();
        state.ensure_system_account(AccountId::new(ROOT_ACCOUNT_ID));

        let mut max_id = 0;
        let mut replayed = 0usize;
        for transaction in self.store.scan()? {
            max_id = max_id.max(transaction.id);
            match state.apply(&transaction) {
                Ok((next, _)) => {
                    state = next;
                    replayed += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        id = transaction.id,
                        action = transaction.action.name(),
                        error = %err,
                        "dropping ledger entry that no longer applies"
                    );
                }
            }
        }

        tracing::info!(
            transactions = replayed,
            accounts = state.account_count(),
            last_id = max_id,
            "state rebuilt from ledger"
        );
        Ok((state, max_id))
    }
}
