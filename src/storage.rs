//! Append-only transaction store
//!
//! One serialized [`Transaction`] per line of newline-delimited JSON. The
//! only contracts are append-only writes, ordered scans, and surviving a
//! re-open on restart; a missing file is an empty ledger, any other read
//! failure is fatal.

use crate::error::Result;
use crate::types::Transaction;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// JSON-lines transaction store
#[derive(Debug)]
pub struct TransactionStore {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl TransactionStore {
    /// Open or create the store file, creating parent directories as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::info!(path = %path.display(), "transaction store opened");
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Append one transaction and flush it to the file
    pub fn append(&self, transaction: &Transaction) -> Result<()> {
        let mut line = serde_json::to_string(transaction)?;
        line.push('\n');

        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Read every stored transaction in insertion order
    pub fn scan(&self) -> Result<Vec<Transaction>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut transactions = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            transactions.push(serde_json::from_str(&line)?);
        }
        Ok(transactions)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
