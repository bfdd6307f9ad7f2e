use std::fs;

use eframe::egui::vec2;
use storymap::config::StatsConfig;
use storymap::data::stats::{StatsSource, open_stats, stats_file_name};
use storymap::interaction::histogram::{FeatureSelection, HistogramUpdater};

const EMPTY: &str = r#"{"xs": [0, 1, 2], "non_permuted_ys": [2, 4, 0], "permuted_ys": [1, 1, 1]}"#;
const SEXE_AGE: &str = r#"{"xs": [0, 1, 2], "non_permuted_ys": [0, 8, 2], "permuted_ys": [1, 0, 1]}"#;

fn catalog() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("stats_.json"), EMPTY).unwrap();
    fs::write(dir.path().join("stats_sexe.json"), EMPTY).unwrap();
    fs::write(dir.path().join("stats_age.json"), EMPTY).unwrap();
    fs::write(dir.path().join("stats_sexe_age.json"), SEXE_AGE).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a stats file").unwrap();
    dir
}

#[test]
fn directory_features_are_discovered_from_file_names() {
    let dir = catalog();
    let loaded = open_stats(dir.path(), &[], &["sexe".to_owned(), "metier".to_owned()]).unwrap();

    assert_eq!(loaded.source.features(), ["age", "sexe"]);
    assert_eq!(loaded.selected, ["sexe"]);
    assert_eq!(loaded.stats.non_permuted_ys, [2.0, 4.0, 0.0]);
}

#[test]
fn configured_features_override_discovery() {
    let dir = catalog();
    let source = StatsSource::open(dir.path(), &["sexe".to_owned(), "sexe".to_owned()]).unwrap();
    assert_eq!(source.features(), ["sexe"]);
    assert_eq!(source.known_selection(&["age".to_owned(), "sexe".to_owned()]), ["sexe"]);
}

#[test]
fn single_document_ignores_the_selection() {
    let dir = catalog();
    let path = dir.path().join("stats_sexe_age.json");
    let loaded = open_stats(&path, &[], &["sexe".to_owned()]).unwrap();

    assert!(loaded.source.features().is_empty());
    assert!(loaded.selected.is_empty());
    assert_eq!(loaded.source.path_for(&["age".to_owned()]), path);
}

#[test]
fn checking_a_feature_reloads_the_joined_file_and_morphs_the_bars() {
    let dir = catalog();
    let loaded = open_stats(dir.path(), &[], &["sexe".to_owned()]).unwrap();
    let config = StatsConfig::default();

    let mut histogram = HistogramUpdater::new(config.clone(), vec2(300.0, 100.0));
    histogram.update(loaded.stats, 0.0);
    let mut selection = FeatureSelection::new(loaded.selected, config.lockout());

    let selected = selection.toggle("age", 1.0).unwrap();
    assert_eq!(stats_file_name(&selected), "stats_sexe_age.json");
    assert!(selection.is_locked(1.0 + config.lockout() / 2.0));

    let stats = loaded.source.load(&selected).unwrap();
    assert!(selection.is_current(&selected));
    histogram.update(stats, 1.0);

    let bar = |key: &str| histogram.bars().iter().find(|bar| bar.label == key).unwrap();
    assert_eq!(bar("non_permuted-1").target().height, 100.0);
    assert_eq!(bar("permuted-0").geometry(1.0).height, 25.0);
    assert_eq!(bar("permuted-0").target().height, 12.5);
    assert!(!bar("non_permuted-2").is_exiting());
    assert_eq!(bar("non_permuted-2").geometry(1.0).height, 0.0);
    assert_eq!(bar("non_permuted-2").target().height, 25.0);
    assert!(bar("non_permuted-0").is_exiting());
    assert!(bar("permuted-1").is_exiting());

    histogram.prune(1.0 + config.duration());
    assert_eq!(histogram.bars().len(), 4);
}

#[test]
fn missing_selection_file_is_an_error_with_the_path() {
    let dir = catalog();
    let source = StatsSource::open(dir.path(), &["metier".to_owned()]).unwrap();
    let error = source.load(&["metier".to_owned()]).unwrap_err();
    assert!(format!("{error:#}").contains("stats_metier.json"));
}
