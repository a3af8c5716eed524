//! In-memory transaction processor
//!
//! A pure state-transition function over the account map. [`BankState::apply`]
//! authenticates one stamped transaction and produces a new state value plus a
//! result; the processor itself holds no mutable state and performs no I/O.
//!
//! # Sequencing
//!
//! 1. Structural validation (non-positive amounts are rejected first).
//! 2. Authentication: proxy chain, admin privilege, account scope, token scope.
//! 3. The acting account must exist.
//! 4. Action dispatch; action-specific preconditions yield their own errors.
//!
//! All authorization failures collapse into `Unauthorized` so that callers
//! cannot probe which accounts or tokens exist.

use crate::authorize::{
    final_authorizer, in_scope_any, is_admin_authorized, proxy_chain, validate_action,
};
use crate::error::TransactionError;
use crate::types::{
    AccessScope, AccountAction, AccountData, AccountId, CurrencyAmount, Transaction,
    TransactionResult,
};
use std::collections::{BTreeMap, BTreeSet};

/// Full in-memory state: the account map plus the privileges that seed
/// newly opened accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankState {
    accounts: BTreeMap<AccountId, AccountData>,
    default_privileges: BTreeSet<AccessScope>,
}

impl Default for BankState {
    fn default() -> Self {
        Self::new()
    }
}

impl BankState {
    /// Empty state with the canonical default privileges for new accounts
    pub fn new() -> Self {
        Self {
            accounts: BTreeMap::new(),
            default_privileges: BTreeSet::from([
                AccessScope::QueryBalance,
                AccessScope::QueryHistory,
                AccessScope::QueryPrivileges,
                AccessScope::Transfer,
            ]),
        }
    }

    /// Empty state with custom default privileges
    pub fn with_default_privileges(default_privileges: BTreeSet<AccessScope>) -> Self {
        Self {
            accounts: BTreeMap::new(),
            default_privileges,
        }
    }

    /// Insert a system account (zero balance, `Unbounded` privilege, no
    /// tokens) unless the name is already taken. Used to seed `@root`
    /// before ledger replay.
    pub fn ensure_system_account(&mut self, id: AccountId) {
        self.accounts.entry(id).or_insert_with(|| {
            AccountData::with_privileges(BTreeSet::from([AccessScope::Unbounded]))
        });
    }

    /// Look up one account
    pub fn account(&self, id: &AccountId) -> Option<&AccountData> {
        self.accounts.get(id)
    }

    /// Iterate over all accounts in name order
    pub fn accounts(&self) -> impl Iterator<Item = (&AccountId, &AccountData)> {
        self.accounts.iter()
    }

    /// Number of accounts
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Sum of all balances
    pub fn money_supply(&self) -> CurrencyAmount {
        self.accounts.values().map(|account| account.balance).sum()
    }

    /// Privileges granted to newly opened accounts
    pub fn default_privileges(&self) -> &BTreeSet<AccessScope> {
        &self.default_privileges
    }

    /// Authenticate and apply one transaction, returning the successor
    /// state and the result
    ///
    /// The input state is untouched; on error nothing is returned, so a
    /// failed apply can never leak a half-updated state.
    pub fn apply(
        &self,
        transaction: &Transaction,
    ) -> Result<(BankState, TransactionResult), TransactionError> {
        validate_action(&transaction.action)?;

        if !self.authenticate(transaction) {
            return Err(TransactionError::Unauthorized);
        }

        // The acting account must exist; its absence is indistinguishable
        // from any other authorization failure.
        if !self.accounts.contains_key(&transaction.account) {
            return Err(TransactionError::Unauthorized);
        }

        let mut next = self.clone();
        let result = match &transaction.action {
            AccountAction::QueryBalance => {
                let balance = self
                    .accounts
                    .get(&transaction.account)
                    .map(|account| account.balance)
                    .ok_or(TransactionError::Unauthorized)?;
                TransactionResult::Balance(balance)
            }

            AccountAction::QueryPrivileges => {
                let privileges = self
                    .accounts
                    .get(&transaction.account)
                    .map(|account| account.privileges.clone())
                    .ok_or(TransactionError::Unauthorized)?;
                TransactionResult::AccessScopes(privileges)
            }

            // Answered by the history processor, which owns the store.
            AccountAction::QueryHistory { .. } => {
                return Err(TransactionError::ActionNotImplemented)
            }

            AccountAction::OpenAccount {
                new_id,
                initial_token_id,
            } => {
                if next.accounts.contains_key(new_id) {
                    return Err(TransactionError::AccountAlreadyExists);
                }
                let mut opened = AccountData::with_privileges(self.default_privileges.clone());
                opened
                    .tokens
                    .insert(initial_token_id.clone(), BTreeSet::from([AccessScope::Unbounded]));
                next.accounts.insert(new_id.clone(), opened);
                TransactionResult::AccessToken(initial_token_id.clone())
            }

            AccountAction::CreateToken { token_id, scopes } => {
                let source = next
                    .accounts
                    .get_mut(&transaction.account)
                    .ok_or(TransactionError::Unauthorized)?;
                if source.tokens.contains_key(token_id) {
                    return Err(TransactionError::TokenAlreadyExists);
                }
                source.tokens.insert(token_id.clone(), scopes.clone());
                TransactionResult::AccessToken(token_id.clone())
            }

            AccountAction::AddPrivileges { target, scopes } => {
                let target = next
                    .accounts
                    .get_mut(target)
                    .ok_or(TransactionError::DestinationDoesNotExist)?;
                target.privileges.extend(scopes.iter().copied());
                TransactionResult::Successful(transaction.id)
            }

            AccountAction::RemovePrivileges { target, scopes } => {
                let target = next
                    .accounts
                    .get_mut(target)
                    .ok_or(TransactionError::DestinationDoesNotExist)?;
                for scope in scopes {
                    target.privileges.remove(scope);
                }
                TransactionResult::Successful(transaction.id)
            }

            AccountAction::AddProxy { target, proxy } => {
                if !next.accounts.contains_key(proxy) {
                    return Err(TransactionError::DestinationDoesNotExist);
                }
                let target = next
                    .accounts
                    .get_mut(target)
                    .ok_or(TransactionError::DestinationDoesNotExist)?;
                target.proxy_access.insert(proxy.clone());
                TransactionResult::Successful(transaction.id)
            }

            AccountAction::RemoveProxy { target, proxy } => {
                let target = next
                    .accounts
                    .get_mut(target)
                    .ok_or(TransactionError::DestinationDoesNotExist)?;
                target.proxy_access.remove(proxy);
                TransactionResult::Successful(transaction.id)
            }

            AccountAction::Mint { amount } => {
                let source = next
                    .accounts
                    .get_mut(&transaction.account)
                    .ok_or(TransactionError::Unauthorized)?;
                source.balance = source
                    .balance
                    .checked_add(*amount)
                    .ok_or(TransactionError::InvalidAmount)?;
                TransactionResult::Successful(transaction.id)
            }

            AccountAction::Transfer {
                amount,
                destination,
            } => {
                if !next.accounts.contains_key(destination) {
                    return Err(TransactionError::DestinationDoesNotExist);
                }
                {
                    let source = next
                        .accounts
                        .get_mut(&transaction.account)
                        .ok_or(TransactionError::Unauthorized)?;
                    if source.balance < *amount {
                        return Err(TransactionError::InsufficientFunds);
                    }
                    source.balance -= *amount;
                }
                // Self-transfers round-trip: the debit above and this
                // credit hit the same entry.
                let target = next
                    .accounts
                    .get_mut(destination)
                    .ok_or(TransactionError::DestinationDoesNotExist)?;
                target.balance = target
                    .balance
                    .checked_add(*amount)
                    .ok_or(TransactionError::InvalidAmount)?;
                TransactionResult::Successful(transaction.id)
            }
        };

        Ok((next, result))
    }

    /// Conjunction of the four authentication checks: the proxy chain is
    /// real, an admin-authorized chain ends in an administrator, the acting
    /// account carries a scope for the action, and any presented token is
    /// held by the final authorizer with an admitting scope.
    fn authenticate(&self, transaction: &Transaction) -> bool {
        let chain = proxy_chain(transaction);

        // (a) Every adjacent pair (x, y): x exists and has granted y proxy
        // access; the last element must exist.
        for pair in chain.windows(2) {
            match self.accounts.get(pair[0]) {
                Some(account) if account.proxy_access.contains(pair[1]) => {}
                _ => return false,
            }
        }
        let last = match chain.last() {
            Some(last) => *last,
            None => return false,
        };
        if !self.accounts.contains_key(last) {
            return false;
        }

        // (b) Admin-authorized chains require the final authorizer to be
        // an administrator.
        if is_admin_authorized(transaction) {
            let is_admin = self
                .accounts
                .get(final_authorizer(transaction))
                .map(|account| {
                    account.privileges.contains(&AccessScope::Admin)
                        || account.privileges.contains(&AccessScope::Unbounded)
                })
                .unwrap_or(false);
            if !is_admin {
                return false;
            }
        }

        // (c) The acting account itself must be privileged to undergo the
        // action, independent of who the caller is.
        let account_in_scope = self
            .accounts
            .get(&transaction.account)
            .map(|account| in_scope_any(&transaction.action, &account.privileges))
            .unwrap_or(false);
        if !account_in_scope {
            return false;
        }

        // (d) A presented token binds to the final authorizer, not the
        // acting account, and its scopes must admit the action. An absent
        // token passes; the envelope gates token presence.
        if let Some(token) = &transaction.access_token {
            let token_in_scope = self
                .accounts
                .get(final_authorizer(transaction))
                .and_then(|account| account.tokens.get(token))
                .map(|scopes| in_scope_any(&transaction.action, scopes))
                .unwrap_or(false);
            if !token_in_scope {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccessTokenId;
    use crate::types::TransactionAuthorization as Auth;
    use chrono::Utc;

    const PRIME_MOVER: &str = "@prime-mover";

    fn bootstrap() -> BankState {
        let mut state = BankState::new();
        state.ensure_system_account(AccountId::new(PRIME_MOVER));
        state
    }

    fn tx(account: &str, authorization: Auth, action: AccountAction) -> Transaction {
        Transaction {
            id: 1,
            performed_at: Utc::now(),
            account: AccountId::new(account),
            authorization,
            access_token: None,
            action,
        }
    }

    fn apply_all(state: BankState, transactions: &[Transaction]) -> BankState {
        transactions.iter().fold(state, |state, transaction| {
            state.apply(transaction).expect("transaction applies").0
        })
    }

    fn open_account(new_id: &str, token: &str) -> Transaction {
        tx(
            PRIME_MOVER,
            Auth::SelfAuthorized,
            AccountAction::OpenAccount {
                new_id: AccountId::new(new_id),
                initial_token_id: AccessTokenId::new(token),
            },
        )
    }

    #[test]
    fn test_initial_balance_query() {
        let state = bootstrap();
        let (next, result) = state
            .apply(&tx(PRIME_MOVER, Auth::SelfAuthorized, AccountAction::QueryBalance))
            .unwrap();
        assert_eq!(result, TransactionResult::Balance(0));
        assert_eq!(next, state);
    }

    #[test]
    fn test_open_then_query_as_admin() {
        let state = apply_all(bootstrap(), &[open_account("user", "tok1")]);
        let (_, result) = state
            .apply(&tx(
                "user",
                Auth::AdminAuthorized {
                    admin_id: AccountId::new(PRIME_MOVER),
                },
                AccountAction::QueryBalance,
            ))
            .unwrap();
        assert_eq!(result, TransactionResult::Balance(0));
    }

    #[test]
    fn test_open_seeds_default_privileges_and_token() {
        let state = apply_all(bootstrap(), &[open_account("user", "tok1")]);
        let user = state.account(&AccountId::new("user")).unwrap();
        assert_eq!(user.balance, 0);
        assert_eq!(&user.privileges, state.default_privileges());
        assert_eq!(
            user.tokens.get(&AccessTokenId::new("tok1")),
            Some(&BTreeSet::from([AccessScope::Unbounded]))
        );
    }

    #[test]
    fn test_mint_and_transfer() {
        let state = apply_all(
            bootstrap(),
            &[
                open_account("user", "t1"),
                tx(PRIME_MOVER, Auth::SelfAuthorized, AccountAction::Mint { amount: 10 }),
                tx(
                    PRIME_MOVER,
                    Auth::SelfAuthorized,
                    AccountAction::Transfer {
                        amount: 10,
                        destination: AccountId::new("user"),
                    },
                ),
            ],
        );
        assert_eq!(state.account(&AccountId::new("user")).unwrap().balance, 10);
        assert_eq!(state.account(&AccountId::new(PRIME_MOVER)).unwrap().balance, 0);
        assert_eq!(state.money_supply(), 10);
    }

    #[test]
    fn test_insufficient_funds_leaves_balances_unchanged() {
        let state = apply_all(bootstrap(), &[open_account("bob", "t2")]);
        let err = state
            .apply(&tx(
                "bob",
                Auth::SelfAuthorized,
                AccountAction::Transfer {
                    amount: 5,
                    destination: AccountId::new(PRIME_MOVER),
                },
            ))
            .unwrap_err();
        assert_eq!(err, TransactionError::InsufficientFunds);
        assert_eq!(state.account(&AccountId::new("bob")).unwrap().balance, 0);
    }

    #[test]
    fn test_invalid_amount_rejected_before_authentication() {
        // No account named "ghost" exists, yet the error is InvalidAmount,
        // not Unauthorized: validation runs first.
        let state = bootstrap();
        for amount in [0, -1] {
            let err = state
                .apply(&tx("ghost", Auth::SelfAuthorized, AccountAction::Mint { amount }))
                .unwrap_err();
            assert_eq!(err, TransactionError::InvalidAmount);
        }
    }

    #[test]
    fn test_self_transfer_round_trips() {
        let state = apply_all(
            bootstrap(),
            &[
                tx(PRIME_MOVER, Auth::SelfAuthorized, AccountAction::Mint { amount: 7 }),
                tx(
                    PRIME_MOVER,
                    Auth::SelfAuthorized,
                    AccountAction::Transfer {
                        amount: 7,
                        destination: AccountId::new(PRIME_MOVER),
                    },
                ),
            ],
        );
        assert_eq!(state.account(&AccountId::new(PRIME_MOVER)).unwrap().balance, 7);
    }

    #[test]
    fn test_transfer_to_missing_destination() {
        let state = apply_all(
            bootstrap(),
            &[tx(PRIME_MOVER, Auth::SelfAuthorized, AccountAction::Mint { amount: 5 })],
        );
        let err = state
            .apply(&tx(
                PRIME_MOVER,
                Auth::SelfAuthorized,
                AccountAction::Transfer {
                    amount: 5,
                    destination: AccountId::new("nobody"),
                },
            ))
            .unwrap_err();
        assert_eq!(err, TransactionError::DestinationDoesNotExist);
    }

    #[test]
    fn test_missing_acting_account_is_unauthorized() {
        let err = bootstrap()
            .apply(&tx("ghost", Auth::SelfAuthorized, AccountAction::QueryBalance))
            .unwrap_err();
        assert_eq!(err, TransactionError::Unauthorized);
    }

    #[test]
    fn test_account_without_scope_is_unauthorized() {
        // Freshly opened accounts carry no Mint privilege.
        let state = apply_all(bootstrap(), &[open_account("user", "t1")]);
        let err = state
            .apply(&tx("user", Auth::SelfAuthorized, AccountAction::Mint { amount: 1 }))
            .unwrap_err();
        assert_eq!(err, TransactionError::Unauthorized);
    }

    #[test]
    fn test_admin_requires_admin_privilege() {
        let state = apply_all(
            bootstrap(),
            &[open_account("user", "t1"), open_account("mallory", "t2")],
        );
        // mallory is no administrator.
        let err = state
            .apply(&tx(
                "user",
                Auth::AdminAuthorized {
                    admin_id: AccountId::new("mallory"),
                },
                AccountAction::QueryBalance,
            ))
            .unwrap_err();
        assert_eq!(err, TransactionError::Unauthorized);
    }

    #[test]
    fn test_proxy_chain_must_be_granted() {
        let state = apply_all(
            bootstrap(),
            &[open_account("alice", "t1"), open_account("bob", "t2")],
        );
        let query_via_alice = tx(
            "bob",
            Auth::proxied(AccountId::new("alice"), Auth::SelfAuthorized),
            AccountAction::QueryBalance,
        );
        // alice has not granted bob proxy access.
        assert_eq!(
            state.apply(&query_via_alice).unwrap_err(),
            TransactionError::Unauthorized
        );

        // After an admin adds bob to alice's proxy_access the chain is real.
        let grant = tx(
            PRIME_MOVER,
            Auth::SelfAuthorized,
            AccountAction::AddProxy {
                target: AccountId::new("alice"),
                proxy: AccountId::new("bob"),
            },
        );
        let state = apply_all(state, &[grant]);
        assert!(state.apply(&query_via_alice).is_ok());
    }

    #[test]
    fn test_remove_proxy_revokes_access() {
        let state = apply_all(
            bootstrap(),
            &[
                open_account("alice", "t1"),
                open_account("bob", "t2"),
                tx(
                    PRIME_MOVER,
                    Auth::SelfAuthorized,
                    AccountAction::AddProxy {
                        target: AccountId::new("alice"),
                        proxy: AccountId::new("bob"),
                    },
                ),
                tx(
                    PRIME_MOVER,
                    Auth::SelfAuthorized,
                    AccountAction::RemoveProxy {
                        target: AccountId::new("alice"),
                        proxy: AccountId::new("bob"),
                    },
                ),
            ],
        );
        let err = state
            .apply(&tx(
                "bob",
                Auth::proxied(AccountId::new("alice"), Auth::SelfAuthorized),
                AccountAction::QueryBalance,
            ))
            .unwrap_err();
        assert_eq!(err, TransactionError::Unauthorized);
    }

    #[test]
    fn test_add_proxy_to_missing_account() {
        let state = apply_all(bootstrap(), &[open_account("alice", "t1")]);
        for (target, proxy) in [("alice", "nobody"), ("nobody", "alice")] {
            let err = state
                .apply(&tx(
                    PRIME_MOVER,
                    Auth::SelfAuthorized,
                    AccountAction::AddProxy {
                        target: AccountId::new(target),
                        proxy: AccountId::new(proxy),
                    },
                ))
                .unwrap_err();
            assert_eq!(err, TransactionError::DestinationDoesNotExist);
        }
    }

    #[test]
    fn test_token_binds_to_final_authorizer() {
        let state = apply_all(bootstrap(), &[open_account("user", "user-token")]);

        // The user's own token admits a self-authorized balance query.
        let mut query = tx("user", Auth::SelfAuthorized, AccountAction::QueryBalance);
        query.access_token = Some(AccessTokenId::new("user-token"));
        assert!(state.apply(&query).is_ok());

        // The same token does not exist on the admin, who is the final
        // authorizer of an admin-authorized query.
        let mut admin_query = tx(
            "user",
            Auth::AdminAuthorized {
                admin_id: AccountId::new(PRIME_MOVER),
            },
            AccountAction::QueryBalance,
        );
        admin_query.access_token = Some(AccessTokenId::new("user-token"));
        assert_eq!(
            state.apply(&admin_query).unwrap_err(),
            TransactionError::Unauthorized
        );
    }

    #[test]
    fn test_token_scopes_limit_actions() {
        let state = apply_all(
            bootstrap(),
            &[
                open_account("user", "boot"),
                tx(
                    PRIME_MOVER,
                    Auth::SelfAuthorized,
                    AccountAction::CreateToken {
                        token_id: AccessTokenId::new("balance-only"),
                        scopes: BTreeSet::from([AccessScope::QueryBalance]),
                    },
                ),
                tx(
                    PRIME_MOVER,
                    Auth::SelfAuthorized,
                    AccountAction::Mint { amount: 3 },
                ),
            ],
        );

        let mut query = tx(PRIME_MOVER, Auth::SelfAuthorized, AccountAction::QueryBalance);
        query.access_token = Some(AccessTokenId::new("balance-only"));
        let (_, result) = state.apply(&query).unwrap();
        assert_eq!(result, TransactionResult::Balance(3));

        let mut transfer = tx(
            PRIME_MOVER,
            Auth::SelfAuthorized,
            AccountAction::Transfer {
                amount: 1,
                destination: AccountId::new("user"),
            },
        );
        transfer.access_token = Some(AccessTokenId::new("balance-only"));
        assert_eq!(
            state.apply(&transfer).unwrap_err(),
            TransactionError::Unauthorized
        );
    }

    #[test]
    fn test_duplicate_account_and_token() {
        let create = tx(
            PRIME_MOVER,
            Auth::SelfAuthorized,
            AccountAction::CreateToken {
                token_id: AccessTokenId::new("t1"),
                scopes: BTreeSet::new(),
            },
        );
        let state = apply_all(bootstrap(), &[open_account("user", "t1"), create.clone()]);
        assert_eq!(
            state.apply(&open_account("user", "t9")).unwrap_err(),
            TransactionError::AccountAlreadyExists
        );
        // Same token id on a different account is fine; on the same
        // account it collides.
        assert_eq!(
            state.apply(&create).unwrap_err(),
            TransactionError::TokenAlreadyExists
        );
    }

    #[test]
    fn test_privilege_grant_and_revoke() {
        let mint_scopes = BTreeSet::from([AccessScope::Mint]);
        let state = apply_all(
            bootstrap(),
            &[
                open_account("user", "t1"),
                tx(
                    PRIME_MOVER,
                    Auth::SelfAuthorized,
                    AccountAction::AddPrivileges {
                        target: AccountId::new("user"),
                        scopes: mint_scopes.clone(),
                    },
                ),
            ],
        );
        let mint = tx("user", Auth::SelfAuthorized, AccountAction::Mint { amount: 2 });
        assert!(state.apply(&mint).is_ok());

        let state = apply_all(
            state,
            &[tx(
                PRIME_MOVER,
                Auth::SelfAuthorized,
                AccountAction::RemovePrivileges {
                    target: AccountId::new("user"),
                    scopes: mint_scopes,
                },
            )],
        );
        assert_eq!(state.apply(&mint).unwrap_err(), TransactionError::Unauthorized);
    }

    #[test]
    fn test_privilege_change_on_missing_target() {
        let state = bootstrap();
        let err = state
            .apply(&tx(
                PRIME_MOVER,
                Auth::SelfAuthorized,
                AccountAction::AddPrivileges {
                    target: AccountId::new("nobody"),
                    scopes: BTreeSet::from([AccessScope::Mint]),
                },
            ))
            .unwrap_err();
        assert_eq!(err, TransactionError::DestinationDoesNotExist);
    }

    #[test]
    fn test_query_history_defers_to_outer_processor() {
        let state = bootstrap();
        let err = state
            .apply(&tx(
                PRIME_MOVER,
                Auth::SelfAuthorized,
                AccountAction::QueryHistory { since: Utc::now() },
            ))
            .unwrap_err();
        assert_eq!(err, TransactionError::ActionNotImplemented);
    }

    #[test]
    fn test_mint_overflow_is_invalid_amount() {
        let state = apply_all(
            bootstrap(),
            &[tx(
                PRIME_MOVER,
                Auth::SelfAuthorized,
                AccountAction::Mint {
                    amount: CurrencyAmount::MAX,
                },
            )],
        );
        let err = state
            .apply(&tx(PRIME_MOVER, Auth::SelfAuthorized, AccountAction::Mint { amount: 1 }))
            .unwrap_err();
        assert_eq!(err, TransactionError::InvalidAmount);
    }
}
