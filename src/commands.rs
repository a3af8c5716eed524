//! Textual command DSL
//!
//! A tiny word-based language used by the interactive front-ends:
//!
//! ```text
//! command := ( "proxy" account )* ( "admin" account )? action
//! action  := "balance" | "mint" amount | "transfer" destination amount
//! ```
//!
//! `proxy` hops may stack; `admin` may appear at most once and must follow
//! the proxy hops. Keywords are case-insensitive and `bal` abbreviates
//! `balance`. Parsing lowers directly to a [`TransactionRequest`] on behalf
//! of an authoring account and its access token.

use crate::types::{
    AccessTokenId, AccountAction, AccountId, CurrencyAmount, TransactionAuthorization,
    TransactionRequest,
};
use thiserror::Error;

/// A word of input, with its byte offset in the original text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// The word itself
    pub text: &'a str,
    /// Byte offset of the word's first character
    pub start_index: usize,
}

/// Ways a command can fail to parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The first action word is not a known command
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    /// Input continued after a complete command
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),

    /// A number was required
    #[error("expected a number, found `{0}`")]
    ExpectedNumber(String),

    /// A strictly positive number was required
    #[error("expected a positive number, found `{0}`")]
    ExpectedPositiveNumber(String),

    /// `proxy` appeared outside its prefix position
    #[error("`{0}` may only appear before the command")]
    UnexpectedProxy(String),

    /// `admin` appeared outside its prefix position
    #[error("`{0}` may only appear once, before the command")]
    UnexpectedAdmin(String),

    /// Input ended before the command was complete
    #[error("command ended unexpectedly")]
    UnfinishedCommand,
}

/// Split input on ASCII whitespace, keeping each word's offset
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (index, ch) in input.char_indices() {
        let is_space = matches!(ch, ' ' | '\t' | '\r' | '\n');
        match (is_space, start) {
            (false, None) => start = Some(index),
            (true, Some(word_start)) => {
                tokens.push(Token {
                    text: &input[word_start..index],
                    start_index: word_start,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(word_start) = start {
        tokens.push(Token {
            text: &input[word_start..],
            start_index: word_start,
        });
    }
    tokens
}

/// Lowercase a keyword token and expand abbreviations
fn normalize_keyword(text: &str) -> String {
    let keyword = text.to_ascii_lowercase();
    match keyword.as_str() {
        "bal" => "balance".to_string(),
        _ => keyword,
    }
}

/// Parse one command authored by `author` carrying `access_token`,
/// lowering it to a transaction request
pub fn parse_command(
    input: &str,
    author: &AccountId,
    access_token: &AccessTokenId,
) -> Result<TransactionRequest, CommandError> {
    let mut parser = Parser {
        tokens: tokenize(input),
        position: 0,
    };

    // Prefix: proxy hops first, then at most one admin.
    let mut proxies = Vec::new();
    while parser.peek_keyword().as_deref() == Some("proxy") {
        parser.advance();
        proxies.push(parser.expect_account()?);
    }
    let admin_subject = if parser.peek_keyword().as_deref() == Some("admin") {
        parser.advance();
        Some(parser.expect_account()?)
    } else {
        None
    };

    let action = parser.parse_action()?;
    parser.expect_end()?;

    // The action account is the admin's subject when present, otherwise the
    // author; the tail records who vouched for it.
    let (account, tail) = match admin_subject {
        Some(subject) => (
            subject,
            TransactionAuthorization::AdminAuthorized {
                admin_id: author.clone(),
            },
        ),
        None => (author.clone(), TransactionAuthorization::SelfAuthorized),
    };

    // Wrap outward in reverse collection order, so the first typed hop
    // ends up outermost.
    let mut authorization = tail;
    for proxy in proxies.into_iter().rev() {
        authorization = TransactionAuthorization::proxied(proxy, authorization);
    }

    Ok(TransactionRequest {
        account,
        authorization,
        access_token: Some(access_token.clone()),
        action,
    })
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.position).copied()
    }

    fn peek_keyword(&self) -> Option<String> {
        self.peek().map(|token| normalize_keyword(token.text))
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        if token.is_some() {
            self.advance();
        }
        token
    }

    fn expect_account(&mut self) -> Result<AccountId, CommandError> {
        self.next()
            .map(|token| AccountId::new(token.text))
            .ok_or(CommandError::UnfinishedCommand)
    }

    fn expect_positive_amount(&mut self) -> Result<CurrencyAmount, CommandError> {
        let token = self.next().ok_or(CommandError::UnfinishedCommand)?;
        let amount: CurrencyAmount = token
            .text
            .parse()
            .map_err(|_| CommandError::ExpectedNumber(token.text.to_string()))?;
        if amount <= 0 {
            return Err(CommandError::ExpectedPositiveNumber(token.text.to_string()));
        }
        Ok(amount)
    }

    fn parse_action(&mut self) -> Result<AccountAction, CommandError> {
        let token = self.next().ok_or(CommandError::UnfinishedCommand)?;
        match normalize_keyword(token.text).as_str() {
            "balance" => Ok(AccountAction::QueryBalance),
            "mint" => {
                let amount = self.expect_positive_amount()?;
                Ok(AccountAction::Mint { amount })
            }
            "transfer" => {
                let destination = self.expect_account()?;
                let amount = self.expect_positive_amount()?;
                Ok(AccountAction::Transfer {
                    amount,
                    destination,
                })
            }
            "proxy" => Err(CommandError::UnexpectedProxy(token.text.to_string())),
            "admin" => Err(CommandError::UnexpectedAdmin(token.text.to_string())),
            _ => Err(CommandError::UnknownCommand(token.text.to_string())),
        }
    }

    fn expect_end(&mut self) -> Result<(), CommandError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(CommandError::UnexpectedToken(token.text.to_string())),
        }
    }
}
