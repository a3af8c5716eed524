//! Authorization helpers
//!
//! Pure functions over a [`Transaction`]: proxy-chain construction,
//! final-authorizer extraction, scope membership, and action validation.
//! The in-memory processor combines these into its authentication check.

use crate::error::TransactionError;
use crate::types::{AccessScope, AccountAction, AccountId, Transaction, TransactionAuthorization};

/// Head-first list of accounts in the authorization chain
///
/// Each `ProxyAuthorized` hop contributes its proxy account; the chain
/// terminates with the acting account (`SelfAuthorized`) or the
/// administrator (`AdminAuthorized`). The result is never empty and its
/// last element is the final authorizer.
pub fn proxy_chain(transaction: &Transaction) -> Vec<&AccountId> {
    let mut chain = Vec::new();
    let mut authorization = &transaction.authorization;
    loop {
        match authorization {
            TransactionAuthorization::ProxyAuthorized { proxy_id, tail } => {
                chain.push(proxy_id);
                authorization = tail;
            }
            TransactionAuthorization::SelfAuthorized => {
                chain.push(&transaction.account);
                break;
            }
            TransactionAuthorization::AdminAuthorized { admin_id } => {
                chain.push(admin_id);
                break;
            }
        }
    }
    chain
}

/// Innermost non-proxy principal: the admin, or the subject itself
pub fn final_authorizer(transaction: &Transaction) -> &AccountId {
    fn walk<'a>(authorization: &'a TransactionAuthorization, account: &'a AccountId) -> &'a AccountId {
        match authorization {
            TransactionAuthorization::SelfAuthorized => account,
            TransactionAuthorization::AdminAuthorized { admin_id } => admin_id,
            TransactionAuthorization::ProxyAuthorized { tail, .. } => walk(tail, account),
        }
    }
    walk(&transaction.authorization, &transaction.account)
}

/// Whether any node in the chain is `AdminAuthorized`
pub fn is_admin_authorized(transaction: &Transaction) -> bool {
    let mut authorization = &transaction.authorization;
    loop {
        match authorization {
            TransactionAuthorization::SelfAuthorized => return false,
            TransactionAuthorization::AdminAuthorized { .. } => return true,
            TransactionAuthorization::ProxyAuthorized { tail, .. } => authorization = tail,
        }
    }
}

/// Scope membership table
///
/// `Unbounded` admits everything. Every other scope admits exactly one
/// class of actions; the administrative actions (privilege, token, and
/// proxy management) are admitted by `Admin` only.
pub fn in_scope(action: &AccountAction, scope: AccessScope) -> bool {
    if scope == AccessScope::Unbounded {
        return true;
    }
    match action {
        AccountAction::Transfer { .. } => scope == AccessScope::Transfer,
        AccountAction::Mint { .. } => scope == AccessScope::Mint,
        AccountAction::QueryBalance => scope == AccessScope::QueryBalance,
        AccountAction::QueryHistory { .. } => scope == AccessScope::QueryHistory,
        AccountAction::QueryPrivileges => scope == AccessScope::QueryPrivileges,
        AccountAction::OpenAccount { .. } => scope == AccessScope::OpenAccount,
        AccountAction::CreateToken { .. }
        | AccountAction::AddPrivileges { .. }
        | AccountAction::RemovePrivileges { .. }
        | AccountAction::AddProxy { .. }
        | AccountAction::RemoveProxy { .. } => scope == AccessScope::Admin,
    }
}

/// Whether any scope in the set admits the action
pub fn in_scope_any<'a, I>(action: &AccountAction, scopes: I) -> bool
where
    I: IntoIterator<Item = &'a AccessScope>,
{
    scopes.into_iter().any(|scope| in_scope(action, *scope))
}

/// Structural validation, performed before authentication so that the
/// failure is visible even to unprivileged callers
pub fn validate_action(action: &AccountAction) -> Result<(), TransactionError> {
    match action {
        AccountAction::Mint { amount } | AccountAction::Transfer { amount, .. } if *amount <= 0 => {
            Err(TransactionError::InvalidAmount)
        }
        _ => Ok(()),
    }
}
