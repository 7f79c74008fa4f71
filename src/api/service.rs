//! Shared report service
//!
//! Used by the REST handlers and usable directly from any other front end.
//! Every request works on an `Arc` snapshot of the log, so a refresh never
//! disturbs a report that is already being computed.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::ledger::{LoadStats, LogCache, TransactionLog};
use crate::report::{build_report, ReportOutcome};

#[derive(Debug, Clone)]
pub struct Stats {
    pub source: PathBuf,
    pub transactions: usize,
    pub employees: usize,
    pub load: LoadStats,
}

pub struct ReportService {
    cache: Arc<LogCache>,
}

impl ReportService {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            cache: Arc::new(LogCache::new(log_path)),
        }
    }

    async fn snapshot(&self) -> Result<Arc<TransactionLog>> {
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || cache.get())
            .await
            .context("log loader task failed")?
    }

    pub async fn report(&self, employee: &str) -> Result<ReportOutcome> {
        let log = self.snapshot().await?;
        let employee = employee.to_string();
        tokio::task::spawn_blocking(move || build_report(&log, &employee))
            .await
            .context("report task failed")
    }

    pub async fn employees(&self) -> Result<Vec<String>> {
        Ok(self.snapshot().await?.employees())
    }

    pub async fn stats(&self) -> Result<Stats> {
        let log = self.snapshot().await?;
        Ok(Stats {
            source: self.cache.path().to_path_buf(),
            transactions: log.len(),
            employees: log.employees().len(),
            load: log.stats().clone(),
        })
    }

    /// Force a reload of the log from disk.
    pub async fn refresh(&self) -> Result<Stats> {
        let cache = self.cache.clone();
        let log = tokio::task::spawn_blocking(move || cache.refresh())
            .await
            .context("log loader task failed")??;
        info!("Transaction log refreshed: {} rows", log.len());
        Ok(Stats {
            source: self.cache.path().to_path_buf(),
            transactions: log.len(),
            employees: log.employees().len(),
            load: log.stats().clone(),
        })
    }
}
