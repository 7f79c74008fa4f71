//! Transaction log loading and caching
//!
//! The log is read once into an immutable [`TransactionLog`] and shared as an
//! `Arc`. [`LogCache`] keys the loaded log by file path and modification time,
//! so an edited file is picked up on the next request while requests already
//! holding a snapshot keep working on the old one.

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::models::{CsvRecord, Transaction};

/// How many rejected rows are logged individually before going quiet.
const MAX_LOGGED_REJECTS: usize = 5;

/// Counters collected while reading a log
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadStats {
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub invalid_dates: usize,
    pub missing_values: usize,
}

/// Read-only, in-memory transaction log
#[derive(Debug, Default)]
pub struct TransactionLog {
    transactions: Vec<Transaction>,
    stats: LoadStats,
}

impl TransactionLog {
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let stats = LoadStats {
            rows_read: transactions.len(),
            rows_rejected: 0,
            invalid_dates: transactions.iter().filter(|t| t.order_date.is_none()).count(),
            missing_values: transactions.iter().filter(|t| t.order_value.is_none()).count(),
        };
        Self { transactions, stats }
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading transaction log from {:?}", path);
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open transaction log {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("failed to read {}", path.display()))
    }

    /// Parse a CSV log. Rows that do not deserialize are counted and skipped;
    /// only a missing or unreadable header is fatal.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers().context("transaction log has no header row")?;
        for required in ["Employee Name", "Shop Name", "Order Date"] {
            if !headers.iter().any(|h| h == required) {
                return Err(anyhow!("transaction log is missing the {:?} column", required));
            }
        }
        if !headers.iter().any(|h| h == "Order Value") {
            warn!("No \"Order Value\" column; sales figures will be zero");
        }

        let mut transactions = Vec::new();
        let mut rejected = 0;
        for (i, row) in reader.deserialize::<CsvRecord>().enumerate() {
            match row {
                Ok(record) => transactions.push(Transaction::from(record)),
                Err(e) => {
                    if rejected < MAX_LOGGED_REJECTS {
                        warn!("Failed to parse row {}: {}", i + 1, e);
                    }
                    rejected += 1;
                }
            }
        }

        let mut log = Self::from_transactions(transactions);
        log.stats.rows_read += rejected;
        log.stats.rows_rejected = rejected;

        info!(
            "Loaded {} transactions ({} rejected, {} invalid dates, {} without value)",
            log.transactions.len(),
            log.stats.rows_rejected,
            log.stats.invalid_dates,
            log.stats.missing_values
        );
        Ok(log)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Distinct employee names in first-seen order
    pub fn employees(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.transactions
            .iter()
            .filter(|t| seen.insert(t.employee_name.as_str()))
            .map(|t| t.employee_name.clone())
            .collect()
    }
}

/// Identity of a loaded source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKey {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl SourceKey {
    pub fn for_path(path: &Path) -> Result<Self> {
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("failed to stat {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            modified,
        })
    }
}

struct CachedLog {
    key: SourceKey,
    log: Arc<TransactionLog>,
}

/// Cache of the loaded log, keyed by [`SourceKey`]
pub struct LogCache {
    path: PathBuf,
    entry: RwLock<Option<CachedLog>>,
}

impl LogCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entry: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached log, reloading it if the file changed on disk.
    pub fn get(&self) -> Result<Arc<TransactionLog>> {
        let key = SourceKey::for_path(&self.path)?;
        {
            let entry = self
                .entry
                .read()
                .map_err(|_| anyhow!("log cache lock poisoned"))?;
            if let Some(cached) = entry.as_ref() {
                if cached.key == key {
                    return Ok(cached.log.clone());
                }
                debug!("Transaction log changed on disk, reloading");
            }
        }
        self.load(key)
    }

    /// Reload unconditionally.
    pub fn refresh(&self) -> Result<Arc<TransactionLog>> {
        let key = SourceKey::for_path(&self.path)?;
        self.load(key)
    }

    pub fn invalidate(&self) {
        if let Ok(mut entry) = self.entry.write() {
            *entry = None;
        }
    }

    pub fn is_cached(&self) -> bool {
        self.entry.read().map(|e| e.is_some()).unwrap_or(false)
    }

    // Parsing happens outside the lock; the swap replaces the Arc so earlier
    // readers keep their snapshot.
    fn load(&self, key: SourceKey) -> Result<Arc<TransactionLog>> {
        let log = Arc::new(TransactionLog::from_csv_path(&key.path)?);
        let mut entry = self
            .entry
            .write()
            .map_err(|_| anyhow!("log cache lock poisoned"))?;
        *entry = Some(CachedLog {
            key,
            log: log.clone(),
        });
        Ok(log)
    }
}
