use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::{CatalogEvent, EventSink};
use crate::catalog::Catalog;
use crate::domain::{CatalogEntry, EntryFormat, FIRST_PARTY_CREATOR};
use crate::error::BrewpadError;
use crate::readiness::{ReadinessGate, Signal};
use crate::remote::{RemoteIndexClient, with_recipe_extension};
use crate::store::{CatalogStore, check_size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPhase {
    Idle,
    ListingFetched,
    Pruning,
    Downloading,
    Reloading,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncOutcome {
    Success,
    Partial,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub listing_reachable: bool,
    pub listed: Vec<String>,
    pub pruned: Vec<String>,
    pub downloaded: Vec<String>,
    pub failed: Vec<FailedItem>,
    pub entries: usize,
    pub skipped_local: usize,
}

impl SyncReport {
    pub fn outcome(&self) -> SyncOutcome {
        if self.listing_reachable && self.failed.is_empty() {
            SyncOutcome::Success
        } else {
            SyncOutcome::Partial
        }
    }
}

/// Mirrors the remote recipe index into the local recipes directory and
/// keeps the in-memory catalog in step with the disk.
pub struct CatalogSyncEngine<R: RemoteIndexClient> {
    remote: R,
    store: CatalogStore,
    catalog: Arc<Catalog>,
    gate: Arc<ReadinessGate>,
    sink: Arc<dyn EventSink + Send + Sync>,
    cycle: Mutex<()>,
    reload: Mutex<()>,
}

impl<R: RemoteIndexClient> CatalogSyncEngine<R> {
    pub fn new(
        remote: R,
        store: CatalogStore,
        catalog: Arc<Catalog>,
        gate: Arc<ReadinessGate>,
        sink: Arc<dyn EventSink + Send + Sync>,
    ) -> Self {
        Self {
            remote,
            store,
            catalog,
            gate,
            sink,
            cycle: Mutex::new(()),
            reload: Mutex::new(()),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Reads the disk and swaps the catalog. Load and swap happen under one
    /// lock so a slower, older read can never overwrite a newer one.
    pub fn reload(&self) -> (usize, usize) {
        let _guard = self.reload.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let loaded = self.store.load_all();
        let skipped = loaded.skipped.len();
        let entries = loaded.into_entries();
        let count = entries.len();
        self.catalog.replace(entries);
        self.sink.event(CatalogEvent::Reloaded { entries: count });
        (count, skipped)
    }

    /// Initial local load; flips the local-loaded readiness signal.
    pub fn load_local(&self) -> usize {
        let (count, _) = self.reload();
        self.gate.mark(Signal::LocalLoaded);
        count
    }

    /// One full cycle: list, prune, download one file at a time, reload.
    /// Always ends by flipping the sync-attempted readiness signal, whatever
    /// failed along the way. Cycles never overlap; a second caller waits for
    /// the running one to finish and then runs its own.
    pub fn run_cycle(&self) -> SyncReport {
        let _cycle = self.cycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut report = SyncReport {
            listing_reachable: false,
            listed: Vec::new(),
            pruned: Vec::new(),
            downloaded: Vec::new(),
            failed: Vec::new(),
            entries: 0,
            skipped_local: 0,
        };
        self.phase(SyncPhase::Idle);

        match self.remote.fetch_listing() {
            Ok(listing) => {
                report.listing_reachable = true;
                report.listed = listing;
                self.phase(SyncPhase::ListingFetched);
                info!("remote listing has {} recipes", report.listed.len());

                self.phase(SyncPhase::Pruning);
                self.prune(&mut report);

                self.phase(SyncPhase::Downloading);
                self.download_all(&mut report);
            }
            Err(err) => {
                warn!("failed to fetch recipe listing: {err}");
            }
        }

        self.phase(SyncPhase::Reloading);
        let (entries, skipped) = self.reload();
        report.entries = entries;
        report.skipped_local = skipped;
        self.gate.mark(Signal::SyncAttempted);
        self.phase(SyncPhase::Done);

        info!(
            downloaded = report.downloaded.len(),
            pruned = report.pruned.len(),
            failed = report.failed.len(),
            "sync cycle finished"
        );
        report
    }

    /// Manual refresh. `on_complete` runs exactly once, after the reload.
    pub fn refresh<F>(&self, on_complete: F) -> SyncReport
    where
        F: FnOnce(&SyncReport),
    {
        let report = self.run_cycle();
        on_complete(&report);
        report
    }

    /// Deletes local remote-sync files the server no longer lists. Files in
    /// the generic format are never touched.
    fn prune(&self, report: &mut SyncReport) {
        let listed: HashSet<&str> = report.listed.iter().map(String::as_str).collect();
        let files = match self.store.recipe_files() {
            Ok(files) => files,
            Err(err) => {
                warn!("unable to scan recipes for pruning: {err}");
                return;
            }
        };

        for (path, format) in files {
            if format != EntryFormat::RemoteSync {
                continue;
            }
            let Some(file_name) = path.file_name() else {
                continue;
            };
            if listed.contains(file_name) {
                continue;
            }
            match self.store.remove_file(file_name) {
                Ok(()) => {
                    info!("pruned {file_name}");
                    self.sink.event(CatalogEvent::Pruned {
                        file_name: file_name.to_string(),
                    });
                    report.pruned.push(file_name.to_string());
                }
                Err(err) => {
                    warn!("failed to prune {file_name}: {err}");
                    report.failed.push(FailedItem {
                        file_name: file_name.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    fn download_all(&self, report: &mut SyncReport) {
        let listed = report.listed.clone();
        for name in &listed {
            let file_name = with_recipe_extension(name);
            match self.download_one(&file_name) {
                Ok(entry) => {
                    debug!("downloaded {file_name} ({})", entry.name);
                    self.sink.event(CatalogEvent::Downloaded {
                        file_name: file_name.clone(),
                    });
                    report.downloaded.push(file_name);
                }
                Err(err) => {
                    warn!("failed to download {file_name}: {err}");
                    self.sink.event(CatalogEvent::DownloadFailed {
                        file_name: file_name.clone(),
                        reason: err.to_string(),
                    });
                    report.failed.push(FailedItem {
                        file_name,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    fn download_one(&self, file_name: &str) -> Result<CatalogEntry, BrewpadError> {
        let bytes = self.remote.download_one(file_name)?;
        check_size(file_name, bytes.len() as u64)?;
        let entry = reconcile_download(&bytes)?;
        self.store.write_remote(file_name, &entry)?;
        Ok(entry)
    }

    fn phase(&self, phase: SyncPhase) {
        debug!(?phase, "sync phase");
        self.sink.event(CatalogEvent::SyncPhase(phase));
    }
}

/// Decodes a downloaded payload and applies the server-side metadata rules:
/// the feature flags are kept as declared, the entry is never built-in, and
/// the creator becomes Brewpad unless the entry is a community highlight.
pub fn reconcile_download(bytes: &[u8]) -> Result<CatalogEntry, BrewpadError> {
    let mut entry = EntryFormat::RemoteSync.decode(bytes)?;
    entry.is_built_in = false;
    if !entry.is_community_highlight {
        entry.creator = FIRST_PARTY_CREATOR.to_string();
    }
    Ok(entry)
}
