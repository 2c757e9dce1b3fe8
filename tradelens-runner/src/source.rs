//! Trade sources — where strategy ledgers come from.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use tradelens_core::{CoreError, StrategyId, StrategyLedger, Trade, TradeLedger};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unknown strategy '{0}'")]
    UnknownStrategy(StrategyId),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse trades in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid ledger for '{id}': {source}")]
    Invalid {
        id: StrategyId,
        #[source]
        source: CoreError,
    },
}

/// Supplies trade ledgers keyed by strategy id.
pub trait TradeSource {
    /// Known strategy ids, sorted.
    fn strategy_ids(&self) -> Result<Vec<StrategyId>, SourceError>;

    fn list_trades(&self, id: &StrategyId) -> Result<TradeLedger, SourceError>;

    /// Load every strategy, in `strategy_ids` order.
    fn load_all(&self) -> Result<Vec<StrategyLedger>, SourceError> {
        self.strategy_ids()?
            .into_iter()
            .map(|id| {
                let ledger = self.list_trades(&id)?;
                Ok(StrategyLedger::new(id, ledger))
            })
            .collect()
    }
}

/// Ledgers held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    ledgers: BTreeMap<StrategyId, TradeLedger>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<StrategyId>, ledger: TradeLedger) {
        self.ledgers.insert(id.into(), ledger);
    }

    pub fn with(mut self, id: impl Into<StrategyId>, ledger: TradeLedger) -> Self {
        self.insert(id, ledger);
        self
    }
}

impl TradeSource for InMemorySource {
    fn strategy_ids(&self) -> Result<Vec<StrategyId>, SourceError> {
        Ok(self.ledgers.keys().cloned().collect())
    }

    fn list_trades(&self, id: &StrategyId) -> Result<TradeLedger, SourceError> {
        self.ledgers
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::UnknownStrategy(id.clone()))
    }
}

/// A directory of `<strategy-id>.json` files, each a JSON array of trades.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    dir: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &StrategyId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }
}

impl TradeSource for JsonDirectorySource {
    fn strategy_ids(&self) -> Result<Vec<StrategyId>, SourceError> {
        let io_err = |source| SourceError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(StrategyId::new(stem));
            }
        }
        ids.sort();
        debug!(dir = %self.dir.display(), strategies = ids.len(), "scanned trade directory");
        Ok(ids)
    }

    fn list_trades(&self, id: &StrategyId) -> Result<TradeLedger, SourceError> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(SourceError::UnknownStrategy(id.clone()));
        }
        read_ledger_file(&path).map_err(|e| match e {
            SourceError::Invalid { source, .. } => SourceError::Invalid {
                id: id.clone(),
                source,
            },
            other => other,
        })
    }
}

/// Read a JSON array of trades from `path` into a validated ledger.
pub fn read_ledger_file(path: &Path) -> Result<TradeLedger, SourceError> {
    let json = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let trades: Vec<Trade> = serde_json::from_str(&json).map_err(|source| SourceError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    TradeLedger::new(trades).map_err(|source| SourceError::Invalid {
        id: StrategyId::new(
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default(),
        ),
        source,
    })
}
