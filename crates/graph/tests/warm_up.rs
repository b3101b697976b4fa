mod support;

use pretty_assertions::assert_eq;
use support::Fixture;
use wikigraph_graph::{CacheConfig, LoadMode, TableName};

#[test]
fn warm_up_without_threshold_caches_everything_requested() {
    let fixture = Fixture::new();
    fixture.load(LoadMode::Overwrite);
    let wiki = fixture.open();

    let report = wiki.warm_up(&CacheConfig::default()).unwrap();
    assert_eq!(report.valid_ids, None);
    assert_eq!(report.tables.len(), 3);
    assert!(report.skipped.is_empty());

    assert_eq!(wiki.page(3).unwrap().unwrap().title, "Kiwifruit");
    assert_eq!(wiki.label("Kiwi").unwrap().unwrap().senses.len(), 2);
}

#[test]
fn warm_up_prunes_unpopular_pages() {
    let fixture = Fixture::new();
    fixture.load(LoadMode::Overwrite);
    let wiki = fixture.open();

    // Inbound link counts: 2 → 2, 3 → 1, 4 → 3, 5 → 2.
    let config = CacheConfig {
        tables: vec![
            TableName::Page,
            TableName::Label,
            TableName::PageLinksIn,
            TableName::ArticlesByTitle,
            TableName::PageLabels,
        ],
        min_links_in: 1,
    };
    let report = wiki.warm_up(&config).unwrap();
    assert_eq!(report.valid_ids, Some(3));

    assert!(wiki.page(3).unwrap().is_none());
    assert!(wiki.page(1).unwrap().is_none());
    // Categories and redirects survive pruning.
    assert!(wiki.page(6).unwrap().is_some());
    assert!(wiki.page(7).unwrap().is_some());

    let kiwi = wiki.label("Kiwi").unwrap().unwrap();
    let senses: Vec<i32> = kiwi.senses.iter().map(|s| s.page_id).collect();
    assert_eq!(senses, vec![2]);

    assert_eq!(wiki.neighbors(4, wikigraph_graph::LinkDirection::In).unwrap(), vec![2, 5]);
    assert!(wiki.links_in(3).unwrap().is_empty());
    assert!(wiki.article_by_title("Kiwifruit").unwrap().is_none());
    assert!(wiki.labels_for_page(3).unwrap().is_empty());
    assert_eq!(wiki.labels_for_page(2).unwrap().len(), 2);

    // Links out were not cached and still read from disk.
    assert_eq!(wiki.links_out(3).unwrap().len(), 1);
}

#[test]
fn missing_tables_are_reported_as_skipped() {
    let fixture = Fixture::new();
    std::fs::remove_file(fixture.data_dir().join("translations.tsv")).unwrap();
    fixture.load(LoadMode::Overwrite);
    let wiki = fixture.open();

    let config = CacheConfig {
        tables: vec![TableName::Translations, TableName::Statistics],
        min_links_in: 0,
    };
    let report = wiki.warm_up(&config).unwrap();
    assert_eq!(report.skipped, vec![TableName::Translations]);
    assert_eq!(report.tables[0].table, TableName::Statistics);
    assert_eq!(report.tables[0].rows, 3);
}

#[test]
fn duplicate_cache_tables_are_rejected() {
    let fixture = Fixture::new();
    fixture.load(LoadMode::Overwrite);
    let wiki = fixture.open();

    let config = CacheConfig {
        tables: vec![TableName::Label, TableName::Label],
        min_links_in: 0,
    };
    assert!(wiki.warm_up(&config).is_err());
}
