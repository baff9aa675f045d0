use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use uuid::Uuid;

use brewpad_catalog::domain::{CatalogEntry, Category, EntryFormat, MAX_RECIPE_FILE_SIZE};
use brewpad_catalog::error::BrewpadError;
use brewpad_catalog::store::{BundledRecipe, CatalogStore, DeleteOutcome, read_entry};

fn temp_store() -> (tempfile::TempDir, CatalogStore) {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().join("Recipes")).unwrap();
    (temp, CatalogStore::new_with_paths(dir))
}

fn user_entry(name: &str) -> CatalogEntry {
    let mut entry = CatalogEntry::new(name, Category::Coffee);
    entry.description = "Test recipe".to_string();
    entry.ingredients = vec!["18g coffee".to_string()];
    entry.creator = "sam".to_string();
    entry
}

const FLAGGED_JSON: &str = r#"{
    "id": "0d9e8f7a-1111-4222-8333-444455556666",
    "name": "Iced Mocha",
    "category": "Chocolate",
    "description": "Cold",
    "ingredients": [],
    "preparations": [],
    "creator": "sam",
    "isWeeklyFeature": true,
    "isCommunityHighlight": true
}"#;

#[test]
fn bundled_recipes_are_forced_built_in() {
    static BUNDLED: &[BundledRecipe] = &[BundledRecipe {
        name: "flagged",
        json: FLAGGED_JSON,
    }];
    let (_temp, store) = temp_store();
    let store = store.with_bundled(BUNDLED);

    let loaded = store.load_all();
    assert_eq!(loaded.built_in.len(), 1);
    let entry = &loaded.built_in[0];
    assert!(entry.is_built_in);
    assert_eq!(entry.creator, "Brewpad");
    assert!(!entry.is_weekly_feature);
    assert!(!entry.is_community_highlight);
    assert!(loaded.local.is_empty());
}

#[test]
fn packaged_recipes_decode() {
    let (_temp, store) = temp_store();
    let loaded = store.load_all();
    let names: Vec<&str> = loaded.built_in.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Cappuccino", "Earl Grey Tea"]);
    assert_eq!(
        loaded.built_in[0].id(),
        Uuid::parse_str("1b4f8a2e-3d5c-4e6f-9a7b-8c2d1e0f3456").unwrap()
    );
}

#[test]
fn feature_flags_are_only_trusted_for_remote_sync_files() {
    let (_temp, store) = temp_store();
    store.ensure_recipes_dir().unwrap();
    let dir = store.recipes_dir().to_owned();
    std::fs::write(dir.join("mocha_55556666.json"), FLAGGED_JSON).unwrap();
    std::fs::write(dir.join("mocha_55556666.brewpadrecipe"), FLAGGED_JSON).unwrap();

    let generic = read_entry(&dir.join("mocha_55556666.json"), EntryFormat::Generic).unwrap();
    assert!(!generic.is_weekly_feature);
    assert!(!generic.is_community_highlight);

    let remote =
        read_entry(&dir.join("mocha_55556666.brewpadrecipe"), EntryFormat::RemoteSync).unwrap();
    assert!(remote.is_weekly_feature);
    assert!(remote.is_community_highlight);

    let loaded = store.load_all();
    assert_eq!(loaded.local.len(), 2);
    assert_eq!(
        loaded.local.iter().filter(|e| e.is_weekly_feature).count(),
        1
    );
}

#[test]
fn missing_optional_fields_take_defaults() {
    let json = r#"{
        "id": "0d9e8f7a-1111-4222-8333-444455557777",
        "name": "Plain Milk",
        "category": "Milk",
        "description": "",
        "ingredients": [],
        "preparations": []
    }"#;
    let entry = EntryFormat::RemoteSync.decode(json.as_bytes()).unwrap();
    assert_eq!(entry.creator, "Unknown");
    assert!(!entry.is_built_in);
    assert!(!entry.is_weekly_feature);
    assert!(!entry.is_community_highlight);
}

#[test]
fn corrupt_and_oversized_files_are_skipped() {
    let (_temp, store) = temp_store();
    let good = user_entry("Latte");
    store.write(&good, EntryFormat::Generic).unwrap();
    let dir = store.recipes_dir().to_owned();
    std::fs::write(dir.join("broken_00000000.json"), b"{ not json").unwrap();
    let big = std::fs::File::create(dir.join("huge_11111111.brewpadrecipe")).unwrap();
    big.set_len(MAX_RECIPE_FILE_SIZE + 1).unwrap();
    std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

    let loaded = store.load_all();
    assert_eq!(loaded.local.len(), 1);
    assert_eq!(loaded.local[0].id(), good.id());
    assert_eq!(loaded.skipped.len(), 2);
}

#[test]
fn oversized_file_is_rejected_before_decode() {
    let (_temp, store) = temp_store();
    store.ensure_recipes_dir().unwrap();
    let path = store.recipes_dir().join("huge_11111111.json");
    let big = std::fs::File::create(path.as_std_path()).unwrap();
    big.set_len(MAX_RECIPE_FILE_SIZE + 1).unwrap();

    let err = read_entry(&path, EntryFormat::Generic).unwrap_err();
    assert_matches!(err, BrewpadError::FileTooLarge { .. });
}

#[test]
fn write_creates_directory_and_uses_generated_name() {
    let (_temp, store) = temp_store();
    let entry = user_entry("Flat White");
    let path = store.write(&entry, EntryFormat::Generic).unwrap();
    assert_eq!(
        path.file_name().unwrap(),
        format!("flat_white_{}.json", entry.id_suffix())
    );
    let back = read_entry(&path, EntryFormat::Generic).unwrap();
    assert_eq!(back, entry);
}

#[test]
fn protected_entries_are_never_deleted() {
    let (_temp, store) = temp_store();
    let mut first_party = user_entry("Cold Brew");
    first_party.creator = "Brewpad".to_string();
    let path = store.write(&first_party, EntryFormat::RemoteSync).unwrap();

    assert_eq!(store.delete(&first_party).unwrap(), DeleteOutcome::Refused);
    assert!(path.as_std_path().exists());

    let mut built_in = user_entry("Espresso");
    built_in.is_built_in = true;
    let path = store.write(&built_in, EntryFormat::Generic).unwrap();
    assert_eq!(store.delete(&built_in).unwrap(), DeleteOutcome::Refused);
    assert!(path.as_std_path().exists());
}

#[test]
fn delete_removes_either_extension() {
    let (_temp, store) = temp_store();
    let entry = user_entry("Cortado");
    let generic = store.write(&entry, EntryFormat::Generic).unwrap();
    let remote = store.write(&entry, EntryFormat::RemoteSync).unwrap();

    assert_eq!(store.delete(&entry).unwrap(), DeleteOutcome::Removed);
    assert!(!generic.as_std_path().exists());
    assert!(!remote.as_std_path().exists());
    assert_eq!(store.delete(&entry).unwrap(), DeleteOutcome::NotFound);
}

#[test]
fn rename_leaves_exactly_one_file_with_same_id() {
    let (_temp, store) = temp_store();
    let old = user_entry("Macchiato");
    store.write(&old, EntryFormat::Generic).unwrap();

    let mut renamed = old.clone();
    renamed.name = "Latte Macchiato".to_string();
    let path = store
        .rename_on_edit(&old, &renamed, EntryFormat::Generic)
        .unwrap();

    let files = store.recipe_files().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].0, path);
    let back = read_entry(&path, EntryFormat::Generic).unwrap();
    assert_eq!(back.id(), old.id());
    assert_eq!(back.name, "Latte Macchiato");
}

#[test]
fn edit_without_rename_overwrites_in_place() {
    let (_temp, store) = temp_store();
    let old = user_entry("Ristretto");
    store.write(&old, EntryFormat::Generic).unwrap();

    let mut edited = old.clone();
    edited.description = "Shorter".to_string();
    store
        .rename_on_edit(&old, &edited, EntryFormat::Generic)
        .unwrap();

    let loaded = store.load_all();
    assert_eq!(loaded.local.len(), 1);
    assert_eq!(loaded.local[0].description, "Shorter");
}

#[test]
fn missing_directory_is_an_empty_catalog() {
    let (_temp, store) = temp_store();
    assert!(store.recipe_files().unwrap().is_empty());
    assert!(store.load_all().local.is_empty());
}

#[test]
fn delete_finds_downloads_stored_under_server_name() {
    let (_temp, store) = temp_store();
    let mut entry = user_entry("Honey Latte");
    entry.creator = "maria".to_string();
    entry.is_community_highlight = true;
    let path = store.write_remote("honey.brewpadrecipe", &entry).unwrap();

    let sources = store.source_files(entry.id()).unwrap();
    assert_eq!(sources, vec![(path.clone(), EntryFormat::RemoteSync)]);

    assert_eq!(store.delete(&entry).unwrap(), DeleteOutcome::Removed);
    assert!(!path.as_std_path().exists());
}

#[test]
fn rename_removes_differently_named_file_with_same_id() {
    let (_temp, store) = temp_store();
    let old = user_entry("Honey Latte");
    let stray = store.write_remote("honey.brewpadrecipe", &old).unwrap();

    let mut new = old.clone();
    new.name = "Maple Latte".to_string();
    let path = store.rename_on_edit(&old, &new, EntryFormat::Generic).unwrap();

    assert!(!stray.as_std_path().exists());
    let files = store.recipe_files().unwrap();
    assert_eq!(files, vec![(path, EntryFormat::Generic)]);
}

#[test]
fn failed_rename_write_keeps_previous_file() {
    let (_temp, store) = temp_store();
    let old = user_entry("Cold Brew");
    let old_path = store.write(&old, EntryFormat::Generic).unwrap();

    let mut new = old.clone();
    new.name = "Iced Brew".to_string();
    std::fs::create_dir_all(store.entry_path(&new, EntryFormat::Generic)).unwrap();

    let err = store.rename_on_edit(&old, &new, EntryFormat::Generic).unwrap_err();
    assert_matches!(err, BrewpadError::Filesystem(_));
    assert_eq!(read_entry(&old_path, EntryFormat::Generic).unwrap(), old);
}
