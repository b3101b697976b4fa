//! Document structure index: section/paragraph trees and offset lookups.
//!
//! A page's layout arrives as a compact bracketed string such as
//! `[0,40,92](([92,130])[130,171])`: `(` opens a section, `)` closes it and
//! `[a,b,...]` is a paragraph with those sentence-break offsets. A new section
//! starts where the last paragraph ended, so sections without leading prose
//! still get a usable boundary.

use once_cell::sync::Lazy;
use regex::Regex;
use wikigraph_codec::StructureNode;

use crate::error::{GraphError, Result};

static STRUCTURE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\()|(\))|\[(.*?)\]").expect("structure token regex"));

struct OpenSection {
    start: i32,
    children: Vec<StructureNode>,
}

/// Stack of sections still being filled.
///
/// Nodes are built bottom-up: closing a section freezes its children into an
/// immutable [`StructureNode`] and hands it to the parent.
pub struct StructureBuilder {
    stack: Vec<OpenSection>,
    last_pos: i32,
}

impl Default for StructureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: vec![OpenSection {
                start: 0,
                children: Vec::new(),
            }],
            last_pos: 0,
        }
    }

    /// Depth of open sections below the root
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn open_section(&mut self) {
        self.stack.push(OpenSection {
            start: self.last_pos,
            children: Vec::new(),
        });
    }

    pub fn close_section(&mut self) -> Result<()> {
        if self.stack.len() < 2 {
            return Err(GraphError::Structure(
                "unbalanced ')' with no open section".to_string(),
            ));
        }
        let Some(open) = self.stack.pop() else {
            return Err(GraphError::Structure("empty section stack".to_string()));
        };
        let node = StructureNode::section(open.start, open.children)?;
        self.push_child(node)
    }

    pub fn paragraph(&mut self, breaks: Vec<i32>) -> Result<()> {
        let node = StructureNode::paragraph(breaks)?;
        if let StructureNode::Paragraph { breaks } = &node {
            if let Some(last) = breaks.last() {
                self.last_pos = *last;
            }
        }
        self.push_child(node)
    }

    /// Freeze the root section. Every opened section must have been closed.
    pub fn finish(mut self) -> Result<StructureNode> {
        if self.stack.len() != 1 {
            return Err(GraphError::Structure(format!(
                "{} section(s) left open",
                self.depth()
            )));
        }
        let Some(root) = self.stack.pop() else {
            return Err(GraphError::Structure("empty section stack".to_string()));
        };
        Ok(StructureNode::section(root.start, root.children)?)
    }

    fn push_child(&mut self, node: StructureNode) -> Result<()> {
        let Some(parent) = self.stack.last_mut() else {
            return Err(GraphError::Structure("empty section stack".to_string()));
        };
        if let Some(previous) = parent.children.last() {
            if node.start() < previous.start() {
                return Err(GraphError::Structure(format!(
                    "node starting at {} precedes its sibling at {}",
                    node.start(),
                    previous.start()
                )));
            }
        }
        parent.children.push(node);
        Ok(())
    }
}

/// Parse a bracketed structure string into its root section
pub fn parse_structure(input: &str) -> Result<StructureNode> {
    let mut builder = StructureBuilder::new();
    for caps in STRUCTURE_TOKEN.captures_iter(input) {
        if caps.get(1).is_some() {
            builder.open_section();
        } else if caps.get(2).is_some() {
            builder.close_section()?;
        } else if let Some(body) = caps.get(3) {
            let breaks = body
                .as_str()
                .split(',')
                .map(|value| {
                    value.trim().parse::<i32>().map_err(|err| {
                        GraphError::Structure(format!("bad sentence break '{value}': {err}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            builder.paragraph(breaks)?;
        }
    }
    builder.finish()
}

/// Index of the last element not greater than `probe`, if any
fn floor_index<T: Ord + Copy>(sorted: &[T], probe: T) -> Option<usize> {
    sorted.partition_point(|value| *value <= probe).checked_sub(1)
}

fn child_index(children: &[StructureNode], pos: i32) -> Option<usize> {
    children
        .partition_point(|child| child.start() <= pos)
        .checked_sub(1)
}

/// Offset lookups over a structure tree
pub trait StructureQuery {
    /// Smallest node enclosing `pos`: descend through the last child starting
    /// at or before `pos` until a paragraph is reached.
    fn enclosing_section(&self, pos: i32) -> &StructureNode;

    /// Lowest common ancestor of the nodes enclosing both positions
    fn enclosing_section_pair(&self, pos1: i32, pos2: i32) -> &StructureNode;

    /// `(start, end)` of the sentence containing `pos`, or `None` when `pos`
    /// lies before the first break or in the open tail after the last one
    fn sentence_bounds(&self, pos: i32) -> Option<(i32, i32)>;

    /// Bounds of the sentence containing both positions, if they share one
    fn sentence_bounds_pair(&self, pos1: i32, pos2: i32) -> Option<(i32, i32)>;
}

impl StructureQuery for StructureNode {
    fn enclosing_section(&self, pos: i32) -> &StructureNode {
        let mut node = self;
        while let Some(index) = child_index(node.children(), pos) {
            node = &node.children()[index];
        }
        node
    }

    fn enclosing_section_pair(&self, pos1: i32, pos2: i32) -> &StructureNode {
        let mut node = self;
        loop {
            let children = node.children();
            match (child_index(children, pos1), child_index(children, pos2)) {
                (Some(a), Some(b)) if a == b => node = &children[a],
                _ => return node,
            }
        }
    }

    fn sentence_bounds(&self, pos: i32) -> Option<(i32, i32)> {
        let breaks = self.enclosing_section(pos).breaks();
        let index = floor_index(breaks, pos)?;
        let end = breaks.get(index + 1)?;
        Some((breaks[index], *end))
    }

    fn sentence_bounds_pair(&self, pos1: i32, pos2: i32) -> Option<(i32, i32)> {
        let breaks = self.enclosing_section_pair(pos1, pos2).breaks();
        let index = floor_index(breaks, pos1)?;
        if floor_index(breaks, pos2)? != index {
            return None;
        }
        let end = breaks.get(index + 1)?;
        Some((breaks[index], *end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "[0,40,92](([92,130])[130,171])([180,200,240])";

    #[test]
    fn parses_nested_sections() {
        let root = parse_structure(SAMPLE).unwrap();
        assert_eq!(root.start(), 0);
        assert_eq!(root.children().len(), 3);

        let first = &root.children()[0];
        assert_eq!(first.breaks(), &[0, 40, 92]);

        let section = &root.children()[1];
        assert!(!section.is_leaf());
        assert_eq!(section.start(), 92);
        assert_eq!(section.children()[0].start(), 92);
        assert_eq!(section.children()[1].breaks(), &[130, 171]);

        // Starts where the previous paragraph ended, not where its own prose begins.
        assert_eq!(root.children()[2].start(), 171);
    }

    #[test]
    fn rejects_unbalanced_input() {
        assert!(parse_structure("([0,5]").is_err());
        assert!(parse_structure("[0,5])").is_err());
        assert!(parse_structure("[0,x]").is_err());
        assert!(parse_structure("[5,2]").is_err());
    }

    #[test]
    fn empty_string_is_an_empty_root() {
        let root = parse_structure("").unwrap();
        assert!(root.children().is_empty());
        assert_eq!(root.enclosing_section(10).start(), 0);
        assert_eq!(root.sentence_bounds(10), None);
    }

    #[test]
    fn finds_enclosing_paragraph_and_sentence() {
        let root = parse_structure(SAMPLE).unwrap();

        let node = root.enclosing_section(50);
        assert_eq!(node.breaks(), &[0, 40, 92]);
        assert_eq!(root.sentence_bounds(50), Some((40, 92)));
        assert_eq!(root.sentence_bounds(40), Some((40, 92)));

        assert_eq!(root.sentence_bounds(150), Some((130, 171)));
        // Section opened at 171 has no paragraph before 180.
        assert_eq!(root.sentence_bounds(175), None);
        // Open tail after the last break.
        assert_eq!(root.sentence_bounds(250), None);
        assert_eq!(root.sentence_bounds(-4), None);
    }

    #[test]
    fn pair_lookup_stops_at_common_ancestor() {
        let root = parse_structure(SAMPLE).unwrap();

        let lca = root.enclosing_section_pair(100, 150);
        assert_eq!(lca.start(), 92);
        assert!(!lca.is_leaf());

        let lca = root.enclosing_section_pair(10, 150);
        assert_eq!(lca, &root);

        assert_eq!(root.sentence_bounds_pair(95, 120), Some((92, 130)));
        assert_eq!(root.sentence_bounds_pair(10, 50), None);
        assert_eq!(root.sentence_bounds_pair(100, 150), None);
    }

    #[test]
    fn builder_is_consumed_into_tree() {
        let mut builder = StructureBuilder::new();
        builder.paragraph(vec![0, 10]).unwrap();
        builder.open_section();
        assert_eq!(builder.depth(), 1);
        builder.paragraph(vec![12, 20]).unwrap();
        builder.close_section().unwrap();
        let root = builder.finish().unwrap();
        assert_eq!(root.node_count(), 4);
        assert_eq!(root.children()[1].start(), 10);
    }
}
