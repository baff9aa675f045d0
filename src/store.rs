use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::Serialize;
use tempfile::Builder;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{CatalogEntry, EntryFormat, FIRST_PARTY_CREATOR, MAX_RECIPE_FILE_SIZE};
use crate::error::BrewpadError;

/// A recipe packaged with the application.
#[derive(Debug, Clone, Copy)]
pub struct BundledRecipe {
    pub name: &'static str,
    pub json: &'static str,
}

pub const BUNDLED_RECIPES: &[BundledRecipe] = &[
    BundledRecipe {
        name: "cappuccino",
        json: include_str!("../assets/recipes/cappuccino.json"),
    },
    BundledRecipe {
        name: "earl_grey",
        json: include_str!("../assets/recipes/earl_grey.json"),
    },
];

#[derive(Debug, Clone, Default)]
pub struct LoadedCatalog {
    pub built_in: Vec<CatalogEntry>,
    pub local: Vec<CatalogEntry>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadedCatalog {
    pub fn into_entries(self) -> Vec<CatalogEntry> {
        let mut entries = self.built_in;
        entries.extend(self.local);
        entries
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteOutcome {
    Removed,
    /// Built-in or first-party entry; nothing was touched on disk.
    Refused,
    NotFound,
}

/// Maps catalog entries to files in the local recipes directory.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    recipes_dir: Utf8PathBuf,
    bundled: &'static [BundledRecipe],
}

impl CatalogStore {
    pub fn new() -> Result<Self, BrewpadError> {
        Ok(Self::new_with_paths(default_recipes_dir()?))
    }

    pub fn new_with_paths(recipes_dir: Utf8PathBuf) -> Self {
        Self {
            recipes_dir,
            bundled: BUNDLED_RECIPES,
        }
    }

    pub fn with_bundled(mut self, bundled: &'static [BundledRecipe]) -> Self {
        self.bundled = bundled;
        self
    }

    pub fn recipes_dir(&self) -> &Utf8Path {
        &self.recipes_dir
    }

    pub fn ensure_recipes_dir(&self) -> Result<(), BrewpadError> {
        fs::create_dir_all(self.recipes_dir.as_std_path())
            .map_err(|err| BrewpadError::Filesystem(err.to_string()))
    }

    /// `<lowercased_name>_<last 8 hex of id>.<ext>`
    pub fn generate_filename(entry: &CatalogEntry, format: EntryFormat) -> String {
        format!(
            "{}_{}.{}",
            entry.storage_stem(),
            entry.id_suffix(),
            format.extension()
        )
    }

    pub fn entry_path(&self, entry: &CatalogEntry, format: EntryFormat) -> Utf8PathBuf {
        self.recipes_dir.join(Self::generate_filename(entry, format))
    }

    pub fn load_all(&self) -> LoadedCatalog {
        let mut loaded = LoadedCatalog {
            built_in: self.load_bundled(),
            ..LoadedCatalog::default()
        };

        let files = match self.recipe_files() {
            Ok(files) => files,
            Err(err) => {
                warn!("unable to list {}: {err}", self.recipes_dir);
                return loaded;
            }
        };

        for (path, format) in files {
            match read_entry(&path, format) {
                Ok(entry) => {
                    debug!("loaded recipe {} from {path}", entry.name);
                    loaded.local.push(entry);
                }
                Err(err) => {
                    warn!("skipping recipe file {path}: {err}");
                    loaded.skipped.push(SkippedFile {
                        path: path.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            built_in = loaded.built_in.len(),
            local = loaded.local.len(),
            skipped = loaded.skipped.len(),
            "recipe load complete"
        );
        loaded
    }

    fn load_bundled(&self) -> Vec<CatalogEntry> {
        self.bundled
            .iter()
            .filter_map(|bundled| {
                match EntryFormat::Generic.decode(bundled.json.as_bytes()) {
                    Ok(mut entry) => {
                        entry.is_built_in = true;
                        entry.creator = FIRST_PARTY_CREATOR.to_string();
                        entry.is_weekly_feature = false;
                        entry.is_community_highlight = false;
                        Some(entry)
                    }
                    Err(err) => {
                        warn!("skipping bundled recipe {}: {err}", bundled.name);
                        None
                    }
                }
            })
            .collect()
    }

    /// Every file in the recipes directory with an accepted extension,
    /// sorted by path. A missing directory is an empty catalog.
    pub fn recipe_files(&self) -> Result<Vec<(Utf8PathBuf, EntryFormat)>, BrewpadError> {
        if !self.recipes_dir.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(self.recipes_dir.as_std_path())
            .map_err(|err| BrewpadError::Filesystem(err.to_string()))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| BrewpadError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(format) = EntryFormat::from_path(&path) else {
                continue;
            };
            match Utf8PathBuf::from_path_buf(path) {
                Ok(path) => files.push((path, format)),
                Err(path) => warn!("ignoring non-utf8 path {}", path.display()),
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    /// Serializes `entry` to the path given by [`Self::generate_filename`].
    pub fn write(
        &self,
        entry: &CatalogEntry,
        format: EntryFormat,
    ) -> Result<Utf8PathBuf, BrewpadError> {
        let path = self.entry_path(entry, format);
        let content = serde_json::to_vec_pretty(entry)
            .map_err(|err| BrewpadError::InvalidEntry(err.to_string()))?;
        Self::write_bytes_atomic(&path, &content)?;
        debug!("wrote {path}");
        Ok(path)
    }

    /// Writes a server-provided entry under the server's own file name.
    pub fn write_remote(
        &self,
        file_name: &str,
        entry: &CatalogEntry,
    ) -> Result<Utf8PathBuf, BrewpadError> {
        let path = self.recipes_dir.join(file_name);
        let content = serde_json::to_vec_pretty(entry)
            .map_err(|err| BrewpadError::InvalidEntry(err.to_string()))?;
        Self::write_bytes_atomic(&path, &content)?;
        debug!("stored remote recipe {path}");
        Ok(path)
    }

    /// Files in the recipes directory that currently hold the entry with
    /// `id`, whatever they are named. Downloaded entries keep the server's
    /// file name, so the generated name alone does not find them.
    pub fn source_files(
        &self,
        id: Uuid,
    ) -> Result<Vec<(Utf8PathBuf, EntryFormat)>, BrewpadError> {
        Ok(self
            .recipe_files()?
            .into_iter()
            .filter(|(path, format)| {
                read_entry(path, *format).is_ok_and(|entry| entry.id() == id)
            })
            .collect())
    }

    /// Removes every file holding `entry`: both generated names plus any
    /// differently named file with the same id. Protected entries are
    /// refused before any filesystem call.
    pub fn delete(&self, entry: &CatalogEntry) -> Result<DeleteOutcome, BrewpadError> {
        if entry.is_protected() {
            info!("refusing to delete protected recipe {}", entry.name);
            return Ok(DeleteOutcome::Refused);
        }

        let mut paths: Vec<Utf8PathBuf> = EntryFormat::ALL
            .into_iter()
            .map(|format| self.entry_path(entry, format))
            .filter(|path| path.as_std_path().is_file())
            .collect();
        paths.extend(
            self.source_files(entry.id())?
                .into_iter()
                .map(|(path, _)| path),
        );
        paths.sort();
        paths.dedup();

        if paths.is_empty() {
            warn!("no recipe file found for {}", entry.name);
            return Ok(DeleteOutcome::NotFound);
        }
        for path in &paths {
            fs::remove_file(path.as_std_path())
                .map_err(|err| BrewpadError::Filesystem(format!("remove {path}: {err}")))?;
            info!("deleted {path}");
        }
        Ok(DeleteOutcome::Removed)
    }

    /// Persists an edit. The file for the new entry is written first; only
    /// then are the other files holding the same id removed, so a failed
    /// write never loses the previous version and one file remains.
    pub fn rename_on_edit(
        &self,
        old: &CatalogEntry,
        new: &CatalogEntry,
        format: EntryFormat,
    ) -> Result<Utf8PathBuf, BrewpadError> {
        let path = self.write(new, format)?;
        let mut stale: Vec<Utf8PathBuf> = self
            .source_files(old.id())?
            .into_iter()
            .map(|(found, _)| found)
            .collect();
        if old.id() != new.id() {
            stale.extend(
                self.source_files(new.id())?
                    .into_iter()
                    .map(|(found, _)| found),
            );
        }
        for old_path in stale.into_iter().filter(|found| *found != path) {
            fs::remove_file(old_path.as_std_path())
                .map_err(|err| BrewpadError::Filesystem(format!("remove {old_path}: {err}")))?;
            debug!("removed superseded recipe file {old_path}");
        }
        Ok(path)
    }

    /// Removes a file in the recipes directory by bare file name.
    pub fn remove_file(&self, file_name: &str) -> Result<(), BrewpadError> {
        let path = self.recipes_dir.join(file_name);
        fs::remove_file(path.as_std_path())
            .map_err(|err| BrewpadError::Filesystem(format!("remove {path}: {err}")))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), BrewpadError> {
        let parent = path
            .parent()
            .ok_or_else(|| BrewpadError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| BrewpadError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(".brewpad-write")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| BrewpadError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| BrewpadError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| BrewpadError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Reads and decodes one recipe file, enforcing the size cap first.
pub fn read_entry(path: &Utf8Path, format: EntryFormat) -> Result<CatalogEntry, BrewpadError> {
    let size = fs::metadata(path.as_std_path())
        .map_err(|err| BrewpadError::Filesystem(format!("stat {path}: {err}")))?
        .len();
    check_size(path.as_str(), size)?;
    let bytes = fs::read(path.as_std_path())
        .map_err(|err| BrewpadError::Filesystem(format!("read {path}: {err}")))?;
    format.decode(&bytes)
}

pub fn check_size(name: &str, size: u64) -> Result<(), BrewpadError> {
    if size > MAX_RECIPE_FILE_SIZE {
        return Err(BrewpadError::FileTooLarge {
            name: name.to_string(),
            size,
            limit: MAX_RECIPE_FILE_SIZE,
        });
    }
    Ok(())
}

pub fn default_recipes_dir() -> Result<Utf8PathBuf, BrewpadError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.data_dir().join("brewpad").join("Recipes")).ok()
        })
        .ok_or_else(|| BrewpadError::Filesystem("unable to resolve recipes directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;

    #[test]
    fn filename_layout() {
        let id = Uuid::parse_str("2c5b9b3f-4e6d-5f7a-8a9c-1d2e3f4a5678").unwrap();
        let entry = CatalogEntry::with_id(id, "Earl Grey Tea", Category::Tea);
        assert_eq!(
            CatalogStore::generate_filename(&entry, EntryFormat::Generic),
            "earl_grey_tea_3F4A5678.json"
        );
        assert_eq!(
            CatalogStore::generate_filename(&entry, EntryFormat::RemoteSync),
            "earl_grey_tea_3F4A5678.brewpadrecipe"
        );
    }

    #[test]
    fn size_guard() {
        assert!(check_size("small", MAX_RECIPE_FILE_SIZE).is_ok());
        assert!(check_size("big", MAX_RECIPE_FILE_SIZE + 1).is_err());
    }
}
