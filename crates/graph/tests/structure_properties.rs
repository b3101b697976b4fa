use proptest::prelude::*;
use wikigraph_graph::{StructureBuilder, StructureQuery};

/// Random document: a flat run of paragraphs, some wrapped in one section
fn document() -> impl Strategy<Value = Vec<(bool, Vec<i32>)>> {
    prop::collection::vec((any::<bool>(), prop::collection::vec(1i32..50, 1..5)), 1..8)
}

proptest! {
    #[test]
    fn sentence_bounds_contain_the_position(doc in document(), probe in 0i32..2000) {
        let mut builder = StructureBuilder::new();
        let mut pos = 0;
        for (nested, gaps) in &doc {
            let mut breaks = vec![pos];
            for gap in gaps {
                pos += gap;
                breaks.push(pos);
            }
            if *nested {
                builder.open_section();
            }
            builder.paragraph(breaks).unwrap();
            if *nested {
                builder.close_section().unwrap();
            }
        }
        let root = builder.finish().unwrap();

        if let Some((start, end)) = root.sentence_bounds(probe) {
            prop_assert!(start <= probe && probe < end);
        } else {
            // Only positions past the last break have no sentence here.
            prop_assert!(probe >= pos);
        }
        prop_assert!(root.enclosing_section(probe).start() <= probe.max(0));
    }
}
