//! Set operations over sorted link lists.
//!
//! Every stored list is ordered by neighbor id without repeats, so lookups are
//! binary searches and pairwise comparisons are a single merge pass. The
//! functions read cached slot arrays in place.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use wikigraph_codec::{LinkLocation, LinkSlot, PageId};

use crate::error::{GraphError, Result};

/// Which list of a page to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    /// Pages linking to the page
    #[default]
    In,
    /// Pages the page links to
    Out,
}

impl std::str::FromStr for LinkDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            other => Err(format!("unknown link direction '{other}'")),
        }
    }
}

/// Outcome of merging two pages' link lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LinkIntersection {
    /// Neighbors present in both lists
    pub shared: usize,
    /// Links of one page pointing straight at the other
    pub mutual: usize,
    /// Shared neighbors whose sentence sets overlap
    pub shared_in_sentence: usize,
    /// Distinct neighbors across both lists
    pub union: usize,
}

impl LinkIntersection {
    /// Overlap used by relatedness scoring: shared neighbors plus direct links
    #[must_use]
    pub const fn overlap(&self) -> usize {
        self.shared + self.mutual
    }
}

/// One entry of a sorted link list. Stored arrays may carry holes, which
/// every operation here steps over.
pub trait LinkEntry {
    fn link(&self) -> Option<&LinkLocation>;
}

impl LinkEntry for LinkLocation {
    fn link(&self) -> Option<&LinkLocation> {
        Some(self)
    }
}

impl LinkEntry for LinkSlot {
    fn link(&self) -> Option<&LinkLocation> {
        self.as_link()
    }
}

/// Number of links in a list, holes excluded
#[must_use]
pub fn link_count<E: LinkEntry>(links: &[E]) -> usize {
    links.iter().filter(|entry| entry.link().is_some()).count()
}

/// Binary-search a sorted list for `target`
#[must_use]
pub fn find_link<E: LinkEntry>(links: &[E], target: PageId) -> Option<&LinkLocation> {
    let (mut lo, mut hi) = (0, links.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        // First real link at or after `mid`; the holes before it carry no key.
        let next = links[mid..hi]
            .iter()
            .enumerate()
            .find_map(|(offset, entry)| entry.link().map(|link| (mid + offset, link)));
        let Some((index, link)) = next else {
            hi = mid;
            continue;
        };
        match link.target.cmp(&target) {
            Ordering::Equal => return Some(link),
            Ordering::Less => lo = index + 1,
            Ordering::Greater => hi = mid,
        }
    }
    None
}

/// Sentence indices where every target in `targets` is linked.
///
/// Duplicate targets count once. An empty target set matches nothing.
#[must_use]
pub fn sentences_mentioning_all<E: LinkEntry>(links: &[E], targets: &[PageId]) -> Vec<u32> {
    let mut wanted: Vec<PageId> = targets.to_vec();
    wanted.sort_unstable();
    wanted.dedup();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut counts: HashMap<u32, usize> = HashMap::new();
    for target in &wanted {
        let Some(link) = find_link(links, *target) else {
            return Vec::new();
        };
        for sentence in &link.sentences {
            *counts.entry(*sentence).or_insert(0) += 1;
        }
    }

    let mut sentences: Vec<u32> = counts
        .into_iter()
        .filter(|(_, count)| *count == wanted.len())
        .map(|(sentence, _)| sentence)
        .collect();
    sentences.sort_unstable();
    sentences
}

/// Merge-join the lists of pages `a` and `b` in one linear pass
#[must_use]
pub fn intersect_links<A: LinkEntry, B: LinkEntry>(
    a: PageId,
    links_a: &[A],
    b: PageId,
    links_b: &[B],
) -> LinkIntersection {
    let mut result = LinkIntersection::default();
    let mut iter_a = links_a.iter().filter_map(|entry| entry.link()).peekable();
    let mut iter_b = links_b.iter().filter_map(|entry| entry.link()).peekable();

    loop {
        let order = match (iter_a.peek(), iter_b.peek()) {
            (Some(la), Some(lb)) => la.target.cmp(&lb.target),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        let (from_a, from_b) = match order {
            Ordering::Equal => (iter_a.next(), iter_b.next()),
            Ordering::Less => (iter_a.next(), None),
            Ordering::Greater => (None, iter_b.next()),
        };

        // A list naming the other page is a direct link, shared neighbor or not.
        if from_a.is_some_and(|link| link.target == b) {
            result.mutual += 1;
        }
        if from_b.is_some_and(|link| link.target == a) {
            result.mutual += 1;
        }
        if let (Some(la), Some(lb)) = (from_a, from_b) {
            result.shared += 1;
            if sorted_overlap(&la.sentences, &lb.sentences) {
                result.shared_in_sentence += 1;
            }
        }
        result.union += 1;
    }
    result
}

fn sorted_overlap(a: &[u32], b: &[u32]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Equal => return true,
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    false
}

/// Sort a freshly assembled list by neighbor id, rejecting repeats
pub fn normalize_links(page: PageId, mut links: Vec<LinkLocation>) -> Result<Vec<LinkLocation>> {
    links.sort_by_key(|link| link.target);
    if let Some(pair) = links.windows(2).find(|pair| pair[0].target == pair[1].target) {
        return Err(GraphError::LinkList {
            page,
            reason: format!("neighbor {} listed twice", pair[0].target),
        });
    }
    Ok(links)
}

/// True if the list is strictly ascending by neighbor id
#[must_use]
pub fn is_strictly_sorted(links: &[LinkLocation]) -> bool {
    links.windows(2).all(|pair| pair[0].target < pair[1].target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn link(target: PageId, sentences: &[u32]) -> LinkLocation {
        LinkLocation::new(target, sentences.to_vec()).unwrap()
    }

    #[test]
    fn finds_mentions_by_binary_search() {
        let links = vec![link(2, &[0]), link(5, &[1, 3]), link(9, &[])];
        assert_eq!(find_link(&links, 5).map(|l| l.sentences.clone()), Some(vec![1, 3]));
        assert!(find_link(&links, 4).is_none());
    }

    #[test]
    fn sentences_with_all_targets() {
        let links = vec![link(2, &[0, 4, 7]), link(5, &[1, 4, 7]), link(9, &[4])];
        assert_eq!(sentences_mentioning_all(&links, &[2, 5]), vec![4, 7]);
        assert_eq!(sentences_mentioning_all(&links, &[2, 5, 9]), vec![4]);
        assert_eq!(sentences_mentioning_all(&links, &[2, 2]), vec![0, 4, 7]);
        assert!(sentences_mentioning_all(&links, &[2, 3]).is_empty());
        assert!(sentences_mentioning_all(&links, &[]).is_empty());
    }

    #[test]
    fn merge_join_counts_shared_and_mutual() {
        // Page 10 links from 1, 3, 20; page 20 links from 3, 4, 10.
        let a = vec![link(1, &[0]), link(3, &[2, 5]), link(20, &[1])];
        let b = vec![link(3, &[5]), link(4, &[0]), link(10, &[3])];
        let result = intersect_links(10, &a, 20, &b);
        assert_eq!(
            result,
            LinkIntersection {
                shared: 1,
                mutual: 2,
                shared_in_sentence: 1,
                union: 5,
            }
        );
        assert_eq!(result.overlap(), 3);
    }

    #[test]
    fn merge_join_is_symmetric() {
        let a = vec![link(1, &[0]), link(3, &[2]), link(7, &[])];
        let b = vec![link(3, &[1]), link(7, &[4])];
        let ab = intersect_links(100, &a, 200, &b);
        let ba = intersect_links(200, &b, 100, &a);
        assert_eq!(ab, ba);
        assert_eq!(ab.shared, 2);
        assert_eq!(ab.shared_in_sentence, 0);
    }

    #[test]
    fn shared_neighbor_naming_a_page_is_also_mutual() {
        // Page 20 lists itself, so 20 is both shared and a direct link from 10.
        let a = vec![link(3, &[1]), link(20, &[0])];
        let b = vec![link(3, &[1]), link(20, &[2])];
        let result = intersect_links(10, &a, 20, &b);
        assert_eq!(result.shared, 2);
        assert_eq!(result.mutual, 1);
        assert_eq!(result.shared_in_sentence, 1);
        assert_eq!(result, intersect_links(20, &b, 10, &a));
    }

    fn with_holes(links: &[LinkLocation], every: usize) -> Vec<LinkSlot> {
        let mut slots = vec![LinkSlot::Hole];
        for (i, link) in links.iter().enumerate() {
            slots.push(LinkSlot::Link(link.clone()));
            if i % every == 0 {
                slots.push(LinkSlot::Hole);
                slots.push(LinkSlot::Hole);
            }
        }
        slots
    }

    #[test]
    fn slot_arrays_with_holes_match_compacted_lists() {
        let a = vec![
            link(1, &[0]),
            link(3, &[2, 5]),
            link(6, &[1]),
            link(20, &[2]),
            link(31, &[4]),
        ];
        let b = vec![link(3, &[5]), link(4, &[0]), link(10, &[3]), link(31, &[])];
        let slots_a = with_holes(&a, 2);
        let slots_b = with_holes(&b, 1);

        assert_eq!(
            intersect_links(10, &slots_a, 20, &slots_b),
            intersect_links(10, &a, 20, &b)
        );
        assert_eq!(
            intersect_links(10, &slots_a, 20, &b),
            intersect_links(10, &a, 20, &b)
        );
        assert_eq!(link_count(&slots_a), a.len());

        for target in 0..35 {
            assert_eq!(find_link(&slots_a, target), find_link(&a, target), "target {target}");
            assert_eq!(find_link(&slots_b, target), find_link(&b, target), "target {target}");
        }
        assert_eq!(sentences_mentioning_all(&slots_a, &[3, 20]), vec![2]);
        assert_eq!(sentences_mentioning_all(&a, &[3, 20]), vec![2]);
        assert_eq!(find_link(&[LinkSlot::Hole, LinkSlot::Hole], 1), None);
    }

    #[test]
    fn normalize_sorts_and_rejects_duplicates() {
        let sorted = normalize_links(1, vec![link(9, &[]), link(2, &[])]).unwrap();
        assert!(is_strictly_sorted(&sorted));
        assert!(normalize_links(1, vec![link(2, &[]), link(2, &[1])]).is_err());
    }
}
