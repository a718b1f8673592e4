//! Shared helpers for command implementations.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use time::Date;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dropquery_core::{Clock, HttpSyncClient, Ledger, SqliteStorage, SyncClient};
use dropquery_types::ledger::parse_date;

use crate::config::Config;

/// Ledger opened for one command, plus the sync worker feeding off it.
pub struct Session {
    pub ledger: Arc<Ledger<SqliteStorage>>,
    sync_worker: Option<(JoinHandle<()>, Duration)>,
}

impl Session {
    /// Open the ledger database and wire up sync when enabled.
    ///
    /// `database` overrides the configured storage path.
    pub fn open(config: &Config, database: Option<&Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let path: PathBuf = database.map_or_else(|| config.storage.path.clone(), Path::to_path_buf);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        debug!("Opening ledger at {}", path.display());
        let storage = SqliteStorage::open(&path)
            .with_context(|| format!("Failed to open ledger: {}", path.display()))?;
        Self::with_storage(config, storage, clock)
    }

    /// Session over an in-memory database.
    pub fn in_memory(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let storage = SqliteStorage::open_in_memory().context("Failed to open in-memory ledger")?;
        Self::with_storage(config, storage, clock)
    }

    fn with_storage(config: &Config, storage: SqliteStorage, clock: Arc<dyn Clock>) -> Result<Self> {
        let ledger_config = config.ledger.ledger_config();
        ledger_config.validate()?;
        let mut ledger = Ledger::new(storage, clock).with_config(ledger_config);

        let mut sync_worker = None;
        if config.sync.enabled {
            let (client, handle) =
                HttpSyncClient::spawn(config.sync.sync_config(), CancellationToken::new())
                    .context("Failed to start remote sync")?;
            let client: Arc<dyn SyncClient> = Arc::new(client);
            ledger = ledger.with_sync(client);
            sync_worker = Some((handle, Duration::from_secs(config.sync.timeout_secs)));
        }

        Ok(Self {
            ledger: Arc::new(ledger),
            sync_worker,
        })
    }

    /// Release the ledger and give queued sync events a chance to go out.
    pub async fn finish(self) {
        let Self {
            ledger,
            sync_worker,
        } = self;
        // The worker exits once the last client handle, owned by the ledger, is gone.
        drop(ledger);
        if let Some((handle, timeout)) = sync_worker
            && tokio::time::timeout(timeout, handle).await.is_err()
        {
            warn!("Remote sync did not finish within {:?}", timeout);
        }
    }
}

/// Parse a `YYYY-MM-DD` date argument.
pub fn parse_date_arg(s: &str) -> Result<Date> {
    match parse_date(s) {
        Ok(date) => Ok(date),
        Err(_) => bail!("Invalid date '{}'. Use YYYY-MM-DD", s),
    }
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}
