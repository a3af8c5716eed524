//! Interactive command-line front-end
//!
//! Reads commands from standard input, parses them on behalf of one account
//! and token, and submits them to a running server.

use reserve_engine::client::BankClient;
use reserve_engine::commands::parse_command;
use reserve_engine::types::{AccessTokenId, AccountId, TransactionResult};
use std::io::{self, BufRead, Write};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let (url, account, token) = match (args.next(), args.next(), args.next()) {
        (Some(url), Some(account), Some(token)) => (url, account, token),
        _ => {
            eprintln!("usage: cli <server-url> <account-id> <access-token>");
            std::process::exit(2);
        }
    };

    let author = AccountId::new(account);
    let token = AccessTokenId::new(token);
    let client = BankClient::new(url);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "{author}> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }

        let request = match parse_command(line, &author, &token) {
            Ok(request) => request,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match client.submit(&request).await {
            Ok(result) => print_result(&result),
            Err(err) => println!("{err}"),
        }
    }

    Ok(())
}

fn print_result(result: &TransactionResult) {
    match result {
        TransactionResult::Successful(id) => println!("ok (transaction {id})"),
        TransactionResult::Balance(amount) => println!("{amount}"),
        TransactionResult::AccessToken(token) => println!("token {token}"),
        TransactionResult::AccessScopes(scopes) => {
            let scopes = scopes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            println!("{scopes}");
        }
        TransactionResult::History(transactions) => {
            for transaction in transactions {
                println!(
                    "{} #{} {} {}",
                    transaction.performed_at.to_rfc3339(),
                    transaction.id,
                    transaction.account,
                    transaction.action.name()
                );
            }
        }
    }
}
