//! Core types for the accounting engine
//!
//! All types are designed for:
//! - Deterministic serialization (ordered maps and sets)
//! - Exact arithmetic (integer currency amounts, no floats)
//! - A stable tagged wire encoding (`Case`/`Fields`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Currency amount. Exact signed integer; account balances never go below zero.
pub type CurrencyAmount = i64;

/// Transaction identifier, assigned at stamp time and monotonically increasing.
pub type TransactionId = u64;

/// Account ID of the root account, created at startup if absent.
pub const ROOT_ACCOUNT_ID: &str = "@root";

/// Number of random bytes behind a generated access token.
const TOKEN_BYTE_LEN: usize = 40;

/// Account identifier (opaque non-empty string)
///
/// Names beginning with `@` are reserved for the system, e.g. [`ROOT_ACCOUNT_ID`].
/// Chat front-ends map platform identities to names like `<platform>/<user-id>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name is reserved for the system (`@`-prefixed)
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with('@')
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Access token identifier (opaque string)
///
/// Generated tokens are 40 random bytes, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessTokenId(String);

impl AccessTokenId {
    /// Create a token ID from an existing string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random token ID
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        use rand::RngCore;

        let mut bytes = [0u8; TOKEN_BYTE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccessTokenId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Capability tag that admits a class of actions
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "Case")]
pub enum AccessScope {
    /// Admits any action
    Unbounded,
    /// Balance queries
    QueryBalance,
    /// History queries
    QueryHistory,
    /// Privilege queries
    QueryPrivileges,
    /// Transfers out of the account
    Transfer,
    /// Minting new currency
    Mint,
    /// Opening new accounts
    OpenAccount,
    /// Administrative actions (privilege, token, and proxy management)
    Admin,
}

impl fmt::Display for AccessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessScope::Unbounded => "Unbounded",
            AccessScope::QueryBalance => "QueryBalance",
            AccessScope::QueryHistory => "QueryHistory",
            AccessScope::QueryPrivileges => "QueryPrivileges",
            AccessScope::Transfer => "Transfer",
            AccessScope::Mint => "Mint",
            AccessScope::OpenAccount => "OpenAccount",
            AccessScope::Admin => "Admin",
        };
        write!(f, "{name}")
    }
}

/// Value owned by the state map, one per account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    /// Current balance (≥ 0)
    pub balance: CurrencyAmount,

    /// Accounts permitted to act as proxy for this account
    pub proxy_access: BTreeSet<AccountId>,

    /// Scopes this account carries
    pub privileges: BTreeSet<AccessScope>,

    /// Access tokens issued by this account, each with its own scope set
    pub tokens: BTreeMap<AccessTokenId, BTreeSet<AccessScope>>,
}

impl AccountData {
    /// Fresh account with the given privileges, zero balance, and no tokens
    pub fn with_privileges(privileges: BTreeSet<AccessScope>) -> Self {
        Self {
            balance: 0,
            proxy_access: BTreeSet::new(),
            privileges,
            tokens: BTreeMap::new(),
        }
    }
}

/// Requested state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Case", content = "Fields")]
pub enum AccountAction {
    /// Move `amount` from the acting account to `destination`
    Transfer {
        /// Amount to move (must be > 0)
        amount: CurrencyAmount,
        /// Receiving account
        destination: AccountId,
    },
    /// Create `amount` new currency on the acting account
    Mint {
        /// Amount to create (must be > 0)
        amount: CurrencyAmount,
    },
    /// Read the acting account's balance
    QueryBalance,
    /// Read the acting account's privileges
    QueryPrivileges,
    /// Read the acting account's transaction history
    QueryHistory {
        /// Only transactions performed at or after this instant are returned
        since: DateTime<Utc>,
    },
    /// Open a fresh account with an initial access token
    OpenAccount {
        /// Name of the account to create
        new_id: AccountId,
        /// Token ID granted on the new account
        initial_token_id: AccessTokenId,
    },
    /// Issue a new access token on the acting account
    CreateToken {
        /// Token ID to issue
        token_id: AccessTokenId,
        /// Scopes the token carries
        scopes: BTreeSet<AccessScope>,
    },
    /// Grant scopes to `target`
    AddPrivileges {
        /// Account receiving the scopes
        target: AccountId,
        /// Scopes to grant
        scopes: BTreeSet<AccessScope>,
    },
    /// Revoke scopes from `target`
    RemovePrivileges {
        /// Account losing the scopes
        target: AccountId,
        /// Scopes to revoke
        scopes: BTreeSet<AccessScope>,
    },
    /// Permit `proxy` to act as proxy for `target`
    AddProxy {
        /// Account whose proxy set is extended
        target: AccountId,
        /// Account being granted proxy access
        proxy: AccountId,
    },
    /// Withdraw `proxy`'s permission to act for `target`
    RemoveProxy {
        /// Account whose proxy set is shrunk
        target: AccountId,
        /// Account losing proxy access
        proxy: AccountId,
    },
}

impl AccountAction {
    /// Whether the action observes state without changing it
    ///
    /// Classification is by tag alone; the envelope uses it to pick the
    /// read or write side of the state lock, and the ledger uses it to
    /// decide whether the transaction is persisted.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            AccountAction::QueryBalance
                | AccountAction::QueryPrivileges
                | AccountAction::QueryHistory { .. }
        )
    }

    /// Short name of the action tag, for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            AccountAction::Transfer { .. } => "Transfer",
            AccountAction::Mint { .. } => "Mint",
            AccountAction::QueryBalance => "QueryBalance",
            AccountAction::QueryPrivileges => "QueryPrivileges",
            AccountAction::QueryHistory { .. } => "QueryHistory",
            AccountAction::OpenAccount { .. } => "OpenAccount",
            AccountAction::CreateToken { .. } => "CreateToken",
            AccountAction::AddPrivileges { .. } => "AddPrivileges",
            AccountAction::RemovePrivileges { .. } => "RemovePrivileges",
            AccountAction::AddProxy { .. } => "AddProxy",
            AccountAction::RemoveProxy { .. } => "RemoveProxy",
        }
    }
}

/// How a transaction claims its authority
///
/// Read head-first: zero or more proxy hops, culminating in either the
/// subject itself (`SelfAuthorized`) or an administrator (`AdminAuthorized`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Case", content = "Fields")]
pub enum TransactionAuthorization {
    /// The acting account authorizes itself
    SelfAuthorized,
    /// An administrator acts on the account
    AdminAuthorized {
        /// The administrator account
        admin_id: AccountId,
    },
    /// A proxy hop; `tail` holds the rest of the chain
    ProxyAuthorized {
        /// The account being proxied through
        proxy_id: AccountId,
        /// Remainder of the authorization chain
        tail: Box<TransactionAuthorization>,
    },
}

impl TransactionAuthorization {
    /// Wrap an authorization in one proxy hop
    pub fn proxied(proxy_id: AccountId, tail: TransactionAuthorization) -> Self {
        TransactionAuthorization::ProxyAuthorized {
            proxy_id,
            tail: Box::new(tail),
        }
    }
}

/// Transaction as submitted by a client, before stamping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Account the action operates on
    pub account: AccountId,

    /// Claimed authority for the action
    pub authorization: TransactionAuthorization,

    /// Token presented by the final authorizer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessTokenId>,

    /// The requested action
    pub action: AccountAction,
}

/// Stamped transaction: a request plus identifier and timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier assigned by the envelope
    pub id: TransactionId,

    /// UTC instant the envelope stamped the request
    pub performed_at: DateTime<Utc>,

    /// Account the action operates on
    pub account: AccountId,

    /// Claimed authority for the action
    pub authorization: TransactionAuthorization,

    /// Token presented by the final authorizer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessTokenId>,

    /// The requested action
    pub action: AccountAction,
}

impl Transaction {
    /// Promote a request to a transaction
    pub fn stamp(request: TransactionRequest, id: TransactionId, performed_at: DateTime<Utc>) -> Self {
        Self {
            id,
            performed_at,
            account: request.account,
            authorization: request.authorization,
            access_token: request.access_token,
            action: request.action,
        }
    }
}

/// Successful outcome of applying a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Case", content = "Fields")]
pub enum TransactionResult {
    /// The transaction was applied; carries its id
    Successful(TransactionId),
    /// Matching history entries, most recent first
    History(Vec<Transaction>),
    /// An account balance
    Balance(CurrencyAmount),
    /// The id of a created token
    AccessToken(AccessTokenId),
    /// A set of scopes
    AccessScopes(BTreeSet<AccessScope>),
}

/// Wire envelope for `Result<TransactionResult, TransactionError>`
///
/// Serialized as `{"Case": "Ok", "Fields": …}` or `{"Case": "Error", "Fields": …}`;
/// both shapes travel with HTTP status 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Case", content = "Fields")]
pub enum TransactionOutcome {
    /// The transaction was applied
    Ok(TransactionResult),
    /// The transaction was rejected
    Error(crate::error::TransactionError),
}

impl TransactionOutcome {
    /// Convert back into a plain `Result`
    pub fn into_result(self) -> Result<TransactionResult, crate::error::TransactionError> {
        match self {
            TransactionOutcome::Ok(result) => Ok(result),
            TransactionOutcome::Error(err) => Err(err),
        }
    }
}

impl From<Result<TransactionResult, crate::error::TransactionError>> for TransactionOutcome {
    fn from(result: Result<TransactionResult, crate::error::TransactionError>) -> Self {
        match result {
            Ok(result) => TransactionOutcome::Ok(result),
            Err(err) => TransactionOutcome::Error(err),
        }
    }
}
