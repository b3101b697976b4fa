use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use wikigraph_annotate::{resolve_collisions, SpanDetector, Stopwords};
use wikigraph_codec::{LabelRecord, SenseRecord};

const VOCAB: [&str; 5] = ["kiwi", "new", "zealand", "park", "in"];

fn label(link_doc_count: u32) -> Arc<LabelRecord> {
    Arc::new(LabelRecord {
        doc_count: 100,
        occ_count: 100,
        link_doc_count,
        link_occ_count: 1,
        senses: vec![SenseRecord {
            page_id: 1,
            link_doc_count: 1,
            link_occ_count: 1,
            from_title: false,
            from_redirect: false,
        }],
    })
}

fn query() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(VOCAB.to_vec()), 1..8)
}

proptest! {
    #[test]
    fn kept_spans_are_sorted_and_disjoint(
        words in query(),
        picks in prop::collection::vec((0usize..8, 1usize..4, 0u32..=100), 0..10),
    ) {
        let text = words.join(" ");
        let mut labels: HashMap<String, Arc<LabelRecord>> = HashMap::new();
        for (start, len, weight) in picks {
            if start < words.len() {
                let end = (start + len).min(words.len());
                labels.insert(words[start..end].join(" "), label(weight));
            }
        }
        let stopwords: Stopwords = ["in"].into_iter().collect();

        let spans = SpanDetector::new(&labels, &stopwords, 15).detect(&text).unwrap();
        for span in &spans {
            prop_assert_eq!(&text[span.start..span.end], span.text.as_str());
            prop_assert!(labels.contains_key(&span.text));
        }

        let kept = resolve_collisions(spans);
        for pair in kept.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }
}
