//! Values persisted in the store

use serde::{Deserialize, Serialize};

use crate::error::InvariantError;

/// Page identifier as written by the dump
pub type PageId = i32;

/// Kind of a stored page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Article,
    Category,
    Redirect,
    Disambiguation,
}

impl PageType {
    /// One-byte tag used on disk
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Article => 1,
            Self::Category => 2,
            Self::Redirect => 3,
            Self::Disambiguation => 4,
        }
    }

    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Article),
            2 => Some(Self::Category),
            3 => Some(Self::Redirect),
            4 => Some(Self::Disambiguation),
            _ => None,
        }
    }

    /// Parse the textual form used in dump files (name or numeric code)
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "article" | "1" => Some(Self::Article),
            "category" | "2" => Some(Self::Category),
            "redirect" | "3" => Some(Self::Redirect),
            "disambiguation" | "4" => Some(Self::Disambiguation),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Category => "category",
            Self::Redirect => "redirect",
            Self::Disambiguation => "disambiguation",
        }
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored page record (the id is the key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub title: String,
    pub page_type: PageType,
}

impl PageRecord {
    pub fn new(title: impl Into<String>, page_type: PageType) -> Self {
        Self {
            title: title.into(),
            page_type,
        }
    }
}

/// Usage statistics of a surface text, with its candidate senses
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Documents mentioning the text at all
    pub doc_count: u32,
    /// Total mentions
    pub occ_count: u64,
    /// Documents where the text is used as a link anchor
    pub link_doc_count: u32,
    /// Total anchor occurrences
    pub link_occ_count: u64,
    /// Candidate senses, most frequently linked first
    pub senses: Vec<SenseRecord>,
}

impl LabelRecord {
    /// Share of documents in which the text is a link
    #[must_use]
    pub fn link_probability(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            f64::from(self.link_doc_count) / f64::from(self.doc_count)
        }
    }

    /// Share of this label's anchor occurrences that point at `sense`
    #[must_use]
    pub fn prior_probability(&self, sense: &SenseRecord) -> f64 {
        if self.link_occ_count == 0 {
            0.0
        } else {
            f64::from(sense.link_occ_count) / self.link_occ_count as f64
        }
    }

    /// Senses paired with their prior probability, in stored order
    pub fn senses_with_prior(&self) -> impl Iterator<Item = (&SenseRecord, f64)> + '_ {
        self.senses
            .iter()
            .map(move |sense| (sense, self.prior_probability(sense)))
    }
}

/// One candidate page for a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseRecord {
    pub page_id: PageId,
    pub link_doc_count: u32,
    pub link_occ_count: u32,
    /// The label matches the page title
    pub from_title: bool,
    /// The label matches a redirect title pointing at the page
    pub from_redirect: bool,
}

/// A surface text used to refer to a page, seen from the page's side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLabel {
    pub text: String,
    /// Documents where the text links to this page
    pub link_doc_count: u32,
    /// Times the text links to this page
    pub link_occ_count: u32,
    pub from_title: bool,
    pub from_redirect: bool,
    /// This page is the text's most common sense
    pub is_primary: bool,
}

/// A directed link to `target` and the sentences it occurs in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkLocation {
    pub target: PageId,
    pub sentences: Vec<u32>,
}

impl LinkLocation {
    /// Build a location, checking that sentence indices ascend without repeats
    pub fn new(target: PageId, sentences: Vec<u32>) -> Result<Self, InvariantError> {
        if let Some(index) = first_non_increasing(&sentences) {
            return Err(InvariantError::SentencesNotIncreasing { index });
        }
        Ok(Self { target, sentences })
    }
}

/// A stored slot in a link array: either a link or a pruned hole
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSlot {
    Link(LinkLocation),
    Hole,
}

impl LinkSlot {
    #[must_use]
    pub const fn as_link(&self) -> Option<&LinkLocation> {
        match self {
            Self::Link(link) => Some(link),
            Self::Hole => None,
        }
    }

    #[must_use]
    pub fn into_link(self) -> Option<LinkLocation> {
        match self {
            Self::Link(link) => Some(link),
            Self::Hole => None,
        }
    }
}

/// Drop holes from a decoded link array
#[must_use]
pub fn compact_links(slots: Vec<LinkSlot>) -> Vec<LinkLocation> {
    slots.into_iter().filter_map(LinkSlot::into_link).collect()
}

/// Node of a page's document structure tree.
///
/// A paragraph carries its sentence-break offsets and starts at the first
/// break. A section carries children ordered by start offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureNode {
    Section {
        start: i32,
        children: Vec<StructureNode>,
    },
    Paragraph {
        breaks: Vec<i32>,
    },
}

impl StructureNode {
    /// Build a paragraph from strictly increasing sentence breaks
    pub fn paragraph(breaks: Vec<i32>) -> Result<Self, InvariantError> {
        if breaks.is_empty() {
            return Err(InvariantError::EmptyParagraph);
        }
        if let Some(index) = first_non_increasing(&breaks) {
            return Err(InvariantError::BreaksNotIncreasing { index });
        }
        Ok(Self::Paragraph { breaks })
    }

    /// Build a section whose children are ordered by start offset
    pub fn section(start: i32, children: Vec<StructureNode>) -> Result<Self, InvariantError> {
        for (index, pair) in children.windows(2).enumerate() {
            if pair[1].start() < pair[0].start() {
                return Err(InvariantError::ChildrenOutOfOrder { index: index + 1 });
            }
        }
        Ok(Self::Section { start, children })
    }

    #[must_use]
    pub fn start(&self) -> i32 {
        match self {
            Self::Section { start, .. } => *start,
            Self::Paragraph { breaks } => breaks.first().copied().unwrap_or_default(),
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Paragraph { .. })
    }

    #[must_use]
    pub fn children(&self) -> &[StructureNode] {
        match self {
            Self::Section { children, .. } => children,
            Self::Paragraph { .. } => &[],
        }
    }

    #[must_use]
    pub fn breaks(&self) -> &[i32] {
        match self {
            Self::Section { .. } => &[],
            Self::Paragraph { breaks } => breaks,
        }
    }

    /// Nodes in the subtree, this one included
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Self::node_count).sum::<usize>()
    }
}

/// Title of the same concept in another language edition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub language: String,
    pub title: String,
}

fn first_non_increasing<T: PartialOrd>(values: &[T]) -> Option<usize> {
    values
        .windows(2)
        .position(|pair| pair[1] <= pair[0])
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_type_codes_are_stable() {
        for ty in [
            PageType::Article,
            PageType::Category,
            PageType::Redirect,
            PageType::Disambiguation,
        ] {
            assert_eq!(PageType::from_code(ty.code()), Some(ty));
            assert_eq!(PageType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(PageType::from_code(0), None);
        assert_eq!(PageType::parse("Category"), Some(PageType::Category));
    }

    #[test]
    fn label_probabilities() {
        let label = LabelRecord {
            doc_count: 10,
            occ_count: 14,
            link_doc_count: 4,
            link_occ_count: 8,
            senses: vec![SenseRecord {
                page_id: 1,
                link_doc_count: 3,
                link_occ_count: 6,
                from_title: true,
                from_redirect: false,
            }],
        };
        assert!((label.link_probability() - 0.4).abs() < 1e-12);
        assert!((label.prior_probability(&label.senses[0]) - 0.75).abs() < 1e-12);
        assert_eq!(LabelRecord::default().link_probability(), 0.0);
    }

    #[test]
    fn paragraph_rejects_unsorted_breaks() {
        assert_eq!(
            StructureNode::paragraph(vec![0, 5, 5]),
            Err(InvariantError::BreaksNotIncreasing { index: 2 })
        );
        assert_eq!(
            StructureNode::paragraph(Vec::new()),
            Err(InvariantError::EmptyParagraph)
        );
    }

    #[test]
    fn section_rejects_out_of_order_children() {
        let a = StructureNode::paragraph(vec![10, 20]).unwrap();
        let b = StructureNode::paragraph(vec![0, 5]).unwrap();
        assert_eq!(
            StructureNode::section(0, vec![a, b]),
            Err(InvariantError::ChildrenOutOfOrder { index: 1 })
        );
    }

    #[test]
    fn link_location_requires_ascending_sentences() {
        assert!(LinkLocation::new(3, vec![1, 2, 9]).is_ok());
        assert_eq!(
            LinkLocation::new(3, vec![2, 1]),
            Err(InvariantError::SentencesNotIncreasing { index: 1 })
        );
    }

    #[test]
    fn compaction_drops_holes() {
        let slots = vec![
            LinkSlot::Link(LinkLocation::new(1, vec![0]).unwrap()),
            LinkSlot::Hole,
            LinkSlot::Link(LinkLocation::new(4, vec![]).unwrap()),
        ];
        let links = compact_links(slots);
        assert_eq!(links.iter().map(|l| l.target).collect::<Vec<_>>(), [1, 4]);
    }
}
