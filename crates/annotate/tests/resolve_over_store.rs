use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use wikigraph_annotate::{
    resolve_collisions, DisambiguationConfig, LinkOverlapScorer, QueryResolver, RelatednessCache,
    Scorer, SpanDetector, Stopwords,
};
use wikigraph_graph::{LinkDirection, LoadMode, Loader, Wikipedia};
use wikigraph_store::{StoreConfig, StoreDir};

const FILES: [(&str, &str); 5] = [
    (
        "page.tsv",
        "1\tKiwi\tdisambiguation\n2\tKiwi (bird)\tarticle\n3\tKiwifruit\tarticle\n\
         4\tNew Zealand\tarticle\n5\tConservation\tarticle\n",
    ),
    (
        "label.tsv",
        "Kiwi\t50\t120\t30\t60\t2:25:45:T;3:10:15\n\
         New Zealand\t80\t200\t70\t150\t4:70:150:T\n\
         conservation\t40\t55\t12\t14\t5:12:14:T\n\
         in\t900\t5000\t3\t3\t6:3:3\n",
    ),
    ("pageLinkIn.tsv", "2\t4:0,2;5:1\n3\t4:3\n4\t2:0,2;3:1;5:0\n5\t2:1;4:4\n"),
    ("pageLinkOut.tsv", "2\t4:0,2;5:1\n3\t4:1\n4\t2:0;3:3;5:4\n5\t2:0;4:0\n"),
    ("stats.tsv", "articleCount\t5\n"),
];

/// Labels for the quoted-phrase query. "Zealand" sits inside "New Zealand"
/// and "Park" inside the quoted "National Park".
const PHRASE_LABELS: &str = "\
Kiwi\t50\t120\t30\t60\t2:25:45:T;3:10:15
New Zealand\t80\t200\t70\t150\t4:70:150:T
Zealand\t40\t50\t2\t2\t4:2:2
National Park\t30\t40\t15\t20\t6:15:20:T
Park\t100\t300\t5\t6\t6:5:6
";

fn open_fixture(dir: &TempDir) -> Wikipedia {
    open_fixture_with(dir, &[])
}

/// Load the base corpus, replacing any file named in `overrides`
fn open_fixture_with(dir: &TempDir, overrides: &[(&str, &str)]) -> Wikipedia {
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    for (name, body) in FILES.iter().copied().chain(overrides.iter().copied()) {
        fs::write(data.join(name), body).unwrap();
    }
    let store = || StoreDir::new(dir.path().join("store"), StoreConfig::for_tests()).unwrap();
    Loader::new(store(), &data, LoadMode::Overwrite)
        .load_all()
        .unwrap();
    Wikipedia::open(store()).unwrap()
}

#[test]
fn link_overlap_scores_are_symmetric_and_bounded() {
    let dir = TempDir::new().unwrap();
    let wiki = open_fixture(&dir);
    let scorer = LinkOverlapScorer::new(&wiki).unwrap();

    for a in 2..=5 {
        assert_eq!(scorer.score(a, a).unwrap(), 1.0);
        for b in 2..=5 {
            let ab = scorer.score(a, b).unwrap();
            assert_eq!(ab, scorer.score(b, a).unwrap());
            assert!((0.0..=1.0).contains(&ab), "{a} {b} -> {ab}");
        }
    }

    // in(2) = {4, 5} and in(4) = {2, 3, 5} share 5 and link each other.
    assert_eq!(scorer.score(2, 4).unwrap(), 1.0);
    let fruit = scorer.score(3, 4).unwrap();
    let expected = 1.0 - (3f64.ln() - 2f64.ln()) / 5f64.ln();
    assert!((fruit - expected).abs() < 1e-12);

    let out = LinkOverlapScorer::new(&wiki)
        .unwrap()
        .direction(LinkDirection::Out);
    assert!((0.0..=1.0).contains(&out.score(3, 5).unwrap()));
}

#[test]
fn cached_scores_match_direct_scores() {
    let dir = TempDir::new().unwrap();
    let wiki = open_fixture(&dir);
    let scorer = LinkOverlapScorer::new(&wiki).unwrap();
    let mut cache = RelatednessCache::new(&scorer);

    let first = cache.get(3, 5).unwrap();
    assert_eq!(first, scorer.score(3, 5).unwrap());
    assert_eq!(cache.get(5, 3).unwrap(), first);
    assert_eq!(cache.scorer_calls(), 1);
}

#[test]
fn query_resolves_kiwi_to_the_bird() {
    let dir = TempDir::new().unwrap();
    let wiki = open_fixture(&dir);
    let scorer = LinkOverlapScorer::new(&wiki).unwrap();
    let stopwords: Stopwords = ["in"].into_iter().collect();
    let resolver =
        QueryResolver::new(&wiki, &scorer, &stopwords, DisambiguationConfig::default()).unwrap();

    let query = "Kiwi conservation in New Zealand";
    let resolved = resolver.resolve(query).unwrap();
    let texts: Vec<&str> = resolved.labels.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["Kiwi", "conservation", "in", "New Zealand"]);

    let kiwi = &resolved.labels[0];
    assert_eq!(kiwi.chosen, Some(2));
    assert_eq!(kiwi.senses[0].title.as_deref(), Some("Kiwi (bird)"));
    assert!(kiwi.senses[0].weight > kiwi.senses[1].weight);

    let stop = &resolved.labels[2];
    assert!(stop.stopword);
    assert_eq!(stop.chosen, None);
    assert_eq!(&query[stop.start..stop.end], "in");

    assert_eq!(resolved.labels[3].chosen, Some(4));
}

#[test]
fn quoted_phrase_query_keeps_three_disjoint_spans() {
    let dir = TempDir::new().unwrap();
    let pages = "1\tKiwi\tdisambiguation\n2\tKiwi (bird)\tarticle\n3\tKiwifruit\tarticle\n\
                 4\tNew Zealand\tarticle\n5\tConservation\tarticle\n6\tNational park\tarticle\n";
    let wiki = open_fixture_with(&dir, &[("page.tsv", pages), ("label.tsv", PHRASE_LABELS)]);
    let stopwords: Stopwords = ["in"].into_iter().collect();
    let query = r#"Kiwi conservation in New Zealand "National Park""#;

    let detected = SpanDetector::new(&wiki, &stopwords, 15).detect(query).unwrap();
    let detected_texts: Vec<&str> = detected.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(detected_texts, vec!["Kiwi", "New Zealand", "Zealand", "National Park"]);

    let kept: Vec<(String, usize, usize)> = resolve_collisions(detected)
        .into_iter()
        .map(|s| (s.text, s.start, s.end))
        .collect();
    assert_eq!(
        kept,
        vec![
            ("Kiwi".to_string(), 0, 4),
            ("New Zealand".to_string(), 21, 32),
            ("National Park".to_string(), 34, 47),
        ]
    );

    let scorer = LinkOverlapScorer::new(&wiki).unwrap();
    let resolver =
        QueryResolver::new(&wiki, &scorer, &stopwords, DisambiguationConfig::default()).unwrap();
    let resolved = resolver.resolve(query).unwrap();
    let chosen: Vec<(&str, usize, usize, Option<i32>)> = resolved
        .labels
        .iter()
        .map(|l| (l.text.as_str(), l.start, l.end, l.chosen))
        .collect();
    assert_eq!(
        chosen,
        vec![
            ("Kiwi", 0, 4, Some(2)),
            ("New Zealand", 21, 32, Some(4)),
            ("National Park", 34, 47, Some(6)),
        ]
    );
    assert!(resolved.weight.is_some());
    assert_eq!(resolved.labels[2].senses[0].title.as_deref(), Some("National park"));
}

#[test]
fn simple_query_lists_senses_by_prior() {
    let dir = TempDir::new().unwrap();
    let wiki = open_fixture(&dir);
    let scorer = LinkOverlapScorer::new(&wiki).unwrap();
    let stopwords = Stopwords::default();
    let config = DisambiguationConfig {
        min_prior_probability: 0.3,
        ..DisambiguationConfig::default()
    };
    let resolver = QueryResolver::new(&wiki, &scorer, &stopwords, config).unwrap();

    let resolved = resolver.resolve_simple("Kiwi").unwrap();
    let ids: Vec<i32> = resolved.labels[0].senses.iter().map(|s| s.page_id).collect();
    assert_eq!(ids, vec![2]);
}
