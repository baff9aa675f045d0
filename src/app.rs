use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::ResolvedConfig;
use crate::domain::{
    COPIED_PREFIX, CatalogEntry, Category, EntryFormat, UNKNOWN_CREATOR, validate_name,
};
use crate::error::BrewpadError;
use crate::readiness::{ReadinessGate, ReadinessStatus, Signal, min_display_time};
use crate::remote::{HealthStatus, RemoteIndexClient};
use crate::store::{CatalogStore, DeleteOutcome, check_size};
use crate::sync::{CatalogSyncEngine, SyncPhase, SyncReport};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogEvent {
    SyncPhase(SyncPhase),
    Pruned { file_name: String },
    Downloaded { file_name: String },
    DownloadFailed { file_name: String, reason: String },
    Reloaded { entries: usize },
    EntrySaved { id: Uuid, name: String },
    EntryImported { id: Uuid, name: String },
    EntryDeleted { id: Uuid, name: String },
}

/// Receives catalog events as they happen.
pub trait EventSink {
    fn event(&self, event: CatalogEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct StartupResult {
    pub ready: bool,
    pub readiness: ReadinessStatus,
    pub min_display_secs: f64,
    pub local_entries: usize,
    pub sync: SyncReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub id: Uuid,
    pub name: String,
    pub outcome: DeleteOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveResult {
    pub id: Uuid,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeaturedResult {
    pub weekly_features: Vec<CatalogEntry>,
    pub community_highlights: Vec<CatalogEntry>,
}

/// Ties the store, the remote client, the in-memory catalog and the
/// readiness gate together.
pub struct App<R: RemoteIndexClient> {
    config: ResolvedConfig,
    store: CatalogStore,
    catalog: Arc<Catalog>,
    gate: Arc<ReadinessGate>,
    sync: CatalogSyncEngine<R>,
    sink: Arc<dyn EventSink + Send + Sync>,
}

impl<R: RemoteIndexClient> App<R> {
    pub fn new(
        config: ResolvedConfig,
        store: CatalogStore,
        remote: R,
        sink: Arc<dyn EventSink + Send + Sync>,
    ) -> Self {
        let catalog = Arc::new(Catalog::new());
        let gate = Arc::new(ReadinessGate::new());
        let sync = CatalogSyncEngine::new(
            remote,
            store.clone(),
            Arc::clone(&catalog),
            Arc::clone(&gate),
            Arc::clone(&sink),
        );
        Self {
            config,
            store,
            catalog,
            gate,
            sync,
            sink,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn gate(&self) -> &Arc<ReadinessGate> {
        &self.gate
    }

    pub fn sync_engine(&self) -> &CatalogSyncEngine<R> {
        &self.sync
    }

    /// Minimum display time for today, given the configured birthday.
    pub fn min_display_time(&self) -> Duration {
        min_display_time(
            Local::now().date_naive(),
            self.config.birthday,
            self.config.min_splash,
            self.config.birthday_splash,
        )
    }

    /// Startup: starts the display timer, then loads the local catalog and
    /// runs a sync cycle concurrently. Waits at most `wait` for readiness.
    pub fn start(&self, wait: Duration) -> StartupResult {
        let min_display = self.min_display_time();
        let timer = self.gate.start_min_timer(min_display);

        let (local_entries, sync) = thread::scope(|scope| {
            let local = scope.spawn(|| self.sync.load_local());
            let sync = scope.spawn(|| self.sync.run_cycle());
            let local_entries = local.join().unwrap_or_else(|_| {
                warn!("local load thread panicked");
                0
            });
            let sync = sync.join();
            (local_entries, sync)
        });
        let sync = match sync {
            Ok(report) => report,
            Err(_) => {
                warn!("sync thread panicked");
                self.gate.mark(Signal::SyncAttempted);
                empty_report()
            }
        };

        let ready = self.gate.wait_ready(wait);
        if ready {
            timer.join().ok();
        }
        StartupResult {
            ready,
            readiness: self.gate.status(),
            min_display_secs: min_display.as_secs_f64(),
            local_entries,
            sync,
        }
    }

    /// Loads the local catalog without contacting the server.
    pub fn load_local(&self) -> usize {
        self.sync.load_local()
    }

    /// Manual refresh; `on_complete` runs once after the catalog reload.
    pub fn refresh<F>(&self, on_complete: F) -> SyncReport
    where
        F: FnOnce(&SyncReport),
    {
        self.sync.refresh(on_complete)
    }

    pub fn check_health(&self) -> HealthStatus {
        self.sync.remote().check_health()
    }

    pub fn list(&self, category: Option<Category>) -> ListResult {
        ListResult {
            entries: self.catalog.for_category(category),
        }
    }

    pub fn featured(&self) -> FeaturedResult {
        FeaturedResult {
            weekly_features: self.catalog.weekly_features(),
            community_highlights: self.catalog.community_highlights(),
        }
    }

    /// Looks an entry up by id or name and renders it in the configured
    /// unit system, or the one given in `to_imperial`.
    pub fn show(&self, key: &str, to_imperial: Option<bool>) -> Result<CatalogEntry, BrewpadError> {
        let entry = self
            .catalog
            .lookup(key)
            .ok_or_else(|| BrewpadError::EntryNotFound(key.to_string()))?;
        Ok(entry.converted(to_imperial.unwrap_or_else(|| self.config.to_imperial())))
    }

    /// A new, empty entry attributed to the configured user.
    pub fn new_entry(&self, name: &str, category: Category) -> CatalogEntry {
        let mut entry = CatalogEntry::new(name, category);
        entry.creator = self
            .config
            .username
            .clone()
            .unwrap_or_else(|| UNKNOWN_CREATOR.to_string());
        entry
    }

    /// Writes a created or edited entry in the generic format. Blank lines
    /// are dropped first; the catalog is only reloaded after the write
    /// succeeded.
    pub fn save_entry(
        &self,
        entry: &CatalogEntry,
        previous: Option<&CatalogEntry>,
    ) -> Result<SaveResult, BrewpadError> {
        if entry.is_built_in {
            return Err(BrewpadError::ReadOnlyEntry(format!(
                "{} ships with Brewpad",
                entry.name
            )));
        }
        if let Some(previous) = previous {
            if previous.id() != entry.id() {
                return Err(BrewpadError::InvalidEntry(
                    "an edit must keep the recipe id".to_string(),
                ));
            }
            if previous.is_protected() {
                return Err(BrewpadError::ReadOnlyEntry(format!(
                    "{} is published by Brewpad",
                    previous.name
                )));
            }
            let synced = self
                .store
                .source_files(previous.id())?
                .into_iter()
                .any(|(_, format)| format == EntryFormat::RemoteSync);
            if synced {
                return Err(BrewpadError::ReadOnlyEntry(format!(
                    "{} is kept in sync with the recipe server; import a copy to edit it",
                    previous.name
                )));
            }
        }

        let mut entry = entry.clone();
        entry.name = entry.name.trim().to_string();
        entry.ingredients.retain(|line| !line.trim().is_empty());
        entry.preparations.retain(|line| !line.trim().is_empty());
        entry.is_weekly_feature = false;
        entry.is_community_highlight = false;
        validate(&entry)?;

        let path = match previous {
            Some(previous) => self
                .store
                .rename_on_edit(previous, &entry, EntryFormat::Generic)?,
            None => self.store.write(&entry, EntryFormat::Generic)?,
        };
        info!("saved recipe {} to {path}", entry.name);
        self.sync.reload();
        self.sink.event(CatalogEvent::EntrySaved {
            id: entry.id(),
            name: entry.name.clone(),
        });
        Ok(SaveResult {
            id: entry.id(),
            name: entry.name,
            path: path.to_string(),
        })
    }

    /// Deletes an entry. Built-in and first-party entries are refused
    /// without touching the disk or the catalog.
    pub fn delete_entry(&self, key: &str) -> Result<DeleteResult, BrewpadError> {
        let entry = self
            .catalog
            .lookup(key)
            .ok_or_else(|| BrewpadError::EntryNotFound(key.to_string()))?;
        let outcome = self.store.delete(&entry)?;
        if outcome == DeleteOutcome::Removed {
            self.sync.reload();
            self.sink.event(CatalogEvent::EntryDeleted {
                id: entry.id(),
                name: entry.name.clone(),
            });
        }
        Ok(DeleteResult {
            id: entry.id(),
            name: entry.name,
            outcome,
        })
    }

    /// Imports a shared recipe file as a local copy in the generic format.
    pub fn import_file(&self, path: &Utf8Path) -> Result<SaveResult, BrewpadError> {
        let format = EntryFormat::from_path(path.as_std_path()).ok_or_else(|| {
            BrewpadError::InvalidEntry(format!("unsupported recipe file: {path}"))
        })?;
        let size = fs::metadata(path.as_std_path())
            .map_err(|err| BrewpadError::Filesystem(format!("stat {path}: {err}")))?
            .len();
        check_size(path.as_str(), size)?;
        let bytes = fs::read(path.as_std_path())
            .map_err(|err| BrewpadError::Filesystem(format!("read {path}: {err}")))?;
        let shared = format.decode(&bytes)?;

        let mut entry = shared.duplicate();
        entry.is_built_in = false;
        entry.is_weekly_feature = false;
        entry.is_community_highlight = false;
        entry.creator = copied_attribution(&shared.creator);
        validate_name(&entry.name)?;

        let written = self.store.write(&entry, EntryFormat::Generic)?;
        info!("imported {path} as {written}");
        self.sync.reload();
        self.sink.event(CatalogEvent::EntryImported {
            id: entry.id(),
            name: entry.name.clone(),
        });
        Ok(SaveResult {
            id: entry.id(),
            name: entry.name,
            path: written.to_string(),
        })
    }

    /// Writes a shareable copy of an entry to `dir` as
    /// `<lowercased_name>.brewpadrecipe`.
    pub fn export_entry(&self, key: &str, dir: &Utf8Path) -> Result<Utf8PathBuf, BrewpadError> {
        let mut entry = self
            .catalog
            .lookup(key)
            .ok_or_else(|| BrewpadError::EntryNotFound(key.to_string()))?;
        entry.is_built_in = false;
        entry.is_weekly_feature = false;
        entry.is_community_highlight = false;
        let path = dir.join(format!(
            "{}.{}",
            entry.storage_stem(),
            EntryFormat::RemoteSync.extension()
        ));
        let content = serde_json::to_vec_pretty(&entry)
            .map_err(|err| BrewpadError::InvalidEntry(err.to_string()))?;
        CatalogStore::write_bytes_atomic(&path, &content)?;
        info!("exported {} to {path}", entry.name);
        Ok(path)
    }
}

fn copied_attribution(creator: &str) -> String {
    if creator.starts_with(COPIED_PREFIX) {
        creator.to_string()
    } else {
        format!("{COPIED_PREFIX}{creator}")
    }
}

fn validate(entry: &CatalogEntry) -> Result<(), BrewpadError> {
    validate_name(&entry.name)?;
    if entry.description.trim().is_empty() {
        return Err(BrewpadError::IncompleteEntry(
            "description is empty".to_string(),
        ));
    }
    Ok(())
}

fn empty_report() -> SyncReport {
    SyncReport {
        listing_reachable: false,
        listed: Vec::new(),
        pruned: Vec::new(),
        downloaded: Vec::new(),
        failed: Vec::new(),
        entries: 0,
        skipped_local: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribution_is_not_stacked() {
        assert_eq!(copied_attribution("maria"), "Copied from maria");
        assert_eq!(
            copied_attribution("Copied from maria"),
            "Copied from maria"
        );
    }
}
