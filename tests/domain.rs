use brewpad_catalog::domain::{CatalogEntry, Category, EntryFormat};

#[test]
fn category_serializes_display_name() {
    let json = serde_json::to_string(&Category::GreenTea).unwrap();
    assert_eq!(json, "\"Green Tea\"");
    let back: Category = serde_json::from_str("\"Green Tea\"").unwrap();
    assert_eq!(back, Category::GreenTea);
}

#[test]
fn entry_uses_camel_case_schema() {
    let mut entry = CatalogEntry::new("Matcha Latte", Category::GreenTea);
    entry.is_weekly_feature = true;
    let value = serde_json::to_value(&entry).unwrap();
    assert_eq!(value["isWeeklyFeature"], true);
    assert_eq!(value["isCommunityHighlight"], false);
    assert_eq!(value["isBuiltIn"], false);
    assert_eq!(value["creator"], "Unknown");
    assert_eq!(value["category"], "Green Tea");
    assert_eq!(value["id"], entry.id().to_string());
}

#[test]
fn legacy_featured_flag_maps_to_weekly() {
    let json = r#"{
        "id": "0d9e8f7a-1111-4222-8333-444455558888",
        "name": "Hot Chocolate",
        "category": "Chocolate",
        "description": "Rich",
        "ingredients": [],
        "preparations": [],
        "isFeatured": true
    }"#;
    let entry = EntryFormat::RemoteSync.decode(json.as_bytes()).unwrap();
    assert!(entry.is_weekly_feature);
}

#[test]
fn unknown_fields_are_ignored() {
    let json = r#"{
        "id": "0d9e8f7a-1111-4222-8333-444455559999",
        "name": "Negroni",
        "category": "Alcohol",
        "description": "Bitter",
        "ingredients": ["30ml gin"],
        "preparations": [],
        "rating": 5
    }"#;
    assert!(EntryFormat::Generic.decode(json.as_bytes()).is_ok());
}

#[test]
fn protection_and_attribution() {
    let mut entry = CatalogEntry::new("Chai", Category::Tea);
    assert!(!entry.is_protected());
    entry.creator = "Brewpad".to_string();
    assert!(entry.is_first_party());
    assert!(entry.is_protected());
    entry.creator = "Copied from maria".to_string();
    assert!(entry.is_copy());
    assert!(!entry.is_protected());
}

#[test]
fn duplicate_gets_fresh_id() {
    let entry = CatalogEntry::new("Chai", Category::Tea);
    let copy = entry.duplicate();
    assert_ne!(copy.id(), entry.id());
    assert_eq!(copy.name, entry.name);
}

#[test]
fn converted_rewrites_lines_only() {
    let mut entry = CatalogEntry::new("Pour Over", Category::Coffee);
    entry.description = "Bright and clean, 20g per cup".to_string();
    entry.ingredients = vec!["20g coffee".to_string(), "300ml water".to_string()];
    entry.preparations = vec!["Heat water to 93°C".to_string()];

    let imperial = entry.converted(true);
    assert_eq!(imperial.ingredients, vec!["0.7 oz coffee", "10.1 fl oz water"]);
    assert_eq!(imperial.preparations, vec!["Heat water to 199°F"]);
    assert_eq!(imperial.description, entry.description);
    assert_eq!(imperial.id(), entry.id());
}

#[test]
fn legacy_and_current_featured_keys_may_both_appear() {
    for (legacy, current) in [(false, true), (true, false), (true, true)] {
        let json = format!(
            r#"{{
                "id": "0d9e8f7a-1111-4222-8333-44445555aaaa",
                "name": "Hot Chocolate",
                "category": "Chocolate",
                "description": "Rich",
                "ingredients": [],
                "preparations": [],
                "isFeatured": {legacy},
                "isWeeklyFeature": {current}
            }}"#
        );
        let synced = EntryFormat::RemoteSync.decode(json.as_bytes()).unwrap();
        assert!(synced.is_weekly_feature);
        let local = EntryFormat::Generic.decode(json.as_bytes()).unwrap();
        assert!(!local.is_weekly_feature);
    }
}
