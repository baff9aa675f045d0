use brewpad_catalog::remote::extract_recipe_filenames;

#[test]
fn scrapes_html_directory_listing() {
    let html = r#"<html><body>
        <a href="mocha_1A2B3C4D.brewpadrecipe">mocha_1A2B3C4D.brewpadrecipe</a>
        <a href="/recipes/chai_99AA00BB.brewpadrecipe">chai_99AA00BB.brewpadrecipe</a>
        <a href="notes.txt">notes.txt</a>
    </body></html>"#;

    assert_eq!(
        extract_recipe_filenames(html),
        vec!["mocha_1A2B3C4D.brewpadrecipe", "chai_99AA00BB.brewpadrecipe"]
    );
}

#[test]
fn plain_text_listing_is_accepted() {
    let text = "latte.brewpadrecipe\nflat-white.brewpadrecipe\n";
    assert_eq!(
        extract_recipe_filenames(text),
        vec!["latte.brewpadrecipe", "flat-white.brewpadrecipe"]
    );
}

#[test]
fn empty_or_unrelated_body_yields_nothing() {
    assert!(extract_recipe_filenames("").is_empty());
    assert!(extract_recipe_filenames("<html>403 Forbidden</html>").is_empty());
}

#[test]
fn hidden_files_are_ignored() {
    let text = "./.draft.brewpadrecipe ok.brewpadrecipe";
    assert_eq!(extract_recipe_filenames(text), vec!["ok.brewpadrecipe"]);
}
