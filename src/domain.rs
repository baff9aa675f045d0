use std::fmt;
use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::convert;
use crate::error::BrewpadError;

/// Creator recorded on entries published by Brewpad itself.
pub const FIRST_PARTY_CREATOR: &str = "Brewpad";
/// Creator used when a payload does not declare one.
pub const UNKNOWN_CREATOR: &str = "Unknown";
/// Attribution prefix for locally imported copies of someone else's entry.
pub const COPIED_PREFIX: &str = "Copied from ";

/// Upper bound for any recipe file, local or downloaded.
pub const MAX_RECIPE_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Category {
    Coffee,
    Tea,
    #[serde(rename = "Green Tea")]
    GreenTea,
    Milk,
    Chocolate,
    Alcohol,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Coffee,
        Category::Tea,
        Category::GreenTea,
        Category::Milk,
        Category::Chocolate,
        Category::Alcohol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Coffee => "Coffee",
            Category::Tea => "Tea",
            Category::GreenTea => "Green Tea",
            Category::Milk => "Milk",
            Category::Chocolate => "Chocolate",
            Category::Alcohol => "Alcohol",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = BrewpadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace(['_', '-'], " ");
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().to_lowercase() == normalized)
            .ok_or_else(|| BrewpadError::InvalidCategory(value.to_string()))
    }
}

/// On-disk representation of an entry. The two formats share one JSON
/// schema and differ only in whether the feature flags survive decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryFormat {
    Generic,
    RemoteSync,
}

impl EntryFormat {
    pub const ALL: [EntryFormat; 2] = [EntryFormat::Generic, EntryFormat::RemoteSync];

    pub fn extension(&self) -> &'static str {
        match self {
            EntryFormat::Generic => "json",
            EntryFormat::RemoteSync => "brewpadrecipe",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        EntryFormat::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(ext))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn trusts_feature_flags(&self) -> bool {
        matches!(self, EntryFormat::RemoteSync)
    }

    /// Decodes an entry, clearing the feature flags unless this format is
    /// allowed to carry them.
    pub fn decode(&self, bytes: &[u8]) -> Result<CatalogEntry, BrewpadError> {
        let mut entry: CatalogEntry = serde_json::from_slice(bytes)
            .map_err(|err| BrewpadError::InvalidEntry(err.to_string()))?;
        if !self.trusts_feature_flags() {
            entry.is_weekly_feature = false;
            entry.is_community_highlight = false;
        }
        Ok(entry)
    }
}

impl fmt::Display for EntryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One recipe record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "EntryRecord")]
pub struct CatalogEntry {
    id: Uuid,
    pub name: String,
    pub category: Category,
    pub description: String,
    pub ingredients: Vec<String>,
    pub preparations: Vec<String>,
    pub is_built_in: bool,
    pub creator: String,
    pub is_weekly_feature: bool,
    pub is_community_highlight: bool,
}

/// Wire shape accepted on decode. Older payloads mark weekly features with
/// `isFeatured`; either key may be present, or both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRecord {
    id: Uuid,
    name: String,
    category: Category,
    description: String,
    ingredients: Vec<String>,
    preparations: Vec<String>,
    #[serde(default)]
    is_built_in: bool,
    #[serde(default = "default_creator")]
    creator: String,
    #[serde(default)]
    is_weekly_feature: bool,
    #[serde(default)]
    is_featured: bool,
    #[serde(default)]
    is_community_highlight: bool,
}

impl From<EntryRecord> for CatalogEntry {
    fn from(record: EntryRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            category: record.category,
            description: record.description,
            ingredients: record.ingredients,
            preparations: record.preparations,
            is_built_in: record.is_built_in,
            creator: record.creator,
            is_weekly_feature: record.is_weekly_feature || record.is_featured,
            is_community_highlight: record.is_community_highlight,
        }
    }
}

fn default_creator() -> String {
    UNKNOWN_CREATOR.to_string()
}

/// Names end up in file names, so they may not carry path syntax.
pub fn validate_name(name: &str) -> Result<(), BrewpadError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BrewpadError::IncompleteEntry("name is empty".to_string()));
    }
    if name.contains(['/', '\\', '\0']) || name.contains("..") {
        return Err(BrewpadError::InvalidEntry(format!(
            "recipe name may not contain path separators or '..': {name}"
        )));
    }
    Ok(())
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self::with_id(Uuid::new_v4(), name, category)
    }

    pub fn with_id(id: Uuid, name: impl Into<String>, category: Category) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            description: String::new(),
            ingredients: Vec::new(),
            preparations: Vec::new(),
            is_built_in: false,
            creator: default_creator(),
            is_weekly_feature: false,
            is_community_highlight: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Same content under a freshly generated id.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    pub fn is_first_party(&self) -> bool {
        self.creator == FIRST_PARTY_CREATOR
    }

    pub fn is_copy(&self) -> bool {
        self.creator.starts_with(COPIED_PREFIX)
    }

    /// Built-in and first-party entries can never be deleted by the user.
    pub fn is_protected(&self) -> bool {
        self.is_built_in || self.is_first_party()
    }

    pub fn is_featured(&self) -> bool {
        self.is_weekly_feature || self.is_community_highlight
    }

    /// Lowercased name with spaces replaced by underscores. Path
    /// separators become underscores too and leading dots are dropped, so
    /// the stem is always a single file name component.
    pub fn storage_stem(&self) -> String {
        let stem = self.name.to_lowercase().replace([' ', '/', '\\', '\0'], "_");
        stem.trim_start_matches('.').to_string()
    }

    /// Last eight hex characters of the hyphenated, uppercase id.
    pub fn id_suffix(&self) -> String {
        let id = self.id.hyphenated().to_string().to_uppercase();
        id[id.len() - 8..].to_string()
    }

    /// Copy with every ingredient and preparation line rewritten into the
    /// requested unit system.
    pub fn converted(&self, to_imperial: bool) -> Self {
        Self {
            ingredients: self
                .ingredients
                .iter()
                .map(|line| convert::convert(line, to_imperial))
                .collect(),
            preparations: self
                .preparations
                .iter()
                .map(|line| convert::convert(line, to_imperial))
                .collect(),
            ..self.clone()
        }
    }
}
