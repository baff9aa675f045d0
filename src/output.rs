use std::io::{self, Write};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::{
    CatalogEvent, DeleteResult, EventSink, FeaturedResult, ListResult, SaveResult, StartupResult,
};
use crate::domain::CatalogEntry;
use crate::remote::HealthStatus;
use crate::sync::SyncReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_startup(result: &StartupResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_sync(report: &SyncReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_list(result: &ListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_featured(result: &FeaturedResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_entry(entry: &CatalogEntry) -> io::Result<()> {
        Self::print_json(entry)
    }

    pub fn print_delete(result: &DeleteResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_save(result: &SaveResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_health(status: &HealthStatus) -> io::Result<()> {
        Self::print_json(status)
    }

    pub fn print_value<T: Serialize>(value: &T) -> io::Result<()> {
        Self::print_json(value)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl EventSink for JsonOutput {
    fn event(&self, _event: CatalogEvent) {}
}

/// Forwards catalog events to the log.
pub struct LogSink;

impl EventSink for LogSink {
    fn event(&self, event: CatalogEvent) {
        match event {
            CatalogEvent::SyncPhase(phase) => debug!(?phase, "sync"),
            CatalogEvent::Pruned { file_name } => info!("removed {file_name}"),
            CatalogEvent::Downloaded { file_name } => debug!("downloaded {file_name}"),
            CatalogEvent::DownloadFailed { file_name, reason } => {
                warn!("{file_name}: {reason}")
            }
            CatalogEvent::Reloaded { entries } => debug!(entries, "catalog reloaded"),
            CatalogEvent::EntrySaved { name, .. } => info!("saved {name}"),
            CatalogEvent::EntryImported { name, .. } => info!("imported {name}"),
            CatalogEvent::EntryDeleted { name, .. } => info!("deleted {name}"),
        }
    }
}
