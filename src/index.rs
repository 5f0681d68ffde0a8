//! Per-tree indices for candidate lookup and relation checks
//!
//! Built once per tree before matching: document order, leaf spans for the
//! precedence relations, and an inverted index from label to nodes.

use crate::tree::{NodeId, Tree};
use rustc_hash::FxHashMap;

/// Inverted index and span table for one tree
#[derive(Debug, Clone)]
pub struct TreeIndex<'t> {
    /// Nodes reachable from the root, in pre-order
    preorder: Vec<NodeId>,
    /// Position of each node in `preorder`
    order: Vec<Option<usize>>,
    /// First and last leaf position covered by each node
    spans: Vec<Option<(usize, usize)>>,
    /// Nodes by label, each list in pre-order
    by_label: FxHashMap<&'t str, Vec<NodeId>>,
}

impl<'t> TreeIndex<'t> {
    /// Build an index from a tree
    pub fn build(tree: &'t Tree) -> Self {
        let preorder = tree.preorder();
        let mut order = vec![None; tree.nodes.len()];
        let mut by_label: FxHashMap<&'t str, Vec<NodeId>> = FxHashMap::default();

        for (position, &id) in preorder.iter().enumerate() {
            order[id] = Some(position);
            by_label
                .entry(tree.nodes[id].label.as_str())
                .or_default()
                .push(id);
        }

        // Leaves get consecutive positions in document order
        let mut spans = vec![None; tree.nodes.len()];
        let mut next_leaf = 0;
        for &id in &preorder {
            if tree.nodes[id].is_leaf() {
                spans[id] = Some((next_leaf, next_leaf));
                next_leaf += 1;
            }
        }
        // Reverse pre-order reaches children before their parent
        for &id in preorder.iter().rev() {
            let children = &tree.nodes[id].children;
            if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
                if let (Some((start, _)), Some((_, end))) = (spans[first], spans[last]) {
                    spans[id] = Some((start, end));
                }
            }
        }

        Self {
            preorder,
            order,
            spans,
            by_label,
        }
    }

    pub fn preorder(&self) -> &[NodeId] {
        &self.preorder
    }

    /// Position of a node in document order
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.order.get(id).copied().flatten()
    }

    /// First and last leaf positions covered by a node
    pub fn span(&self, id: NodeId) -> Option<(usize, usize)> {
        self.spans.get(id).copied().flatten()
    }

    /// Nodes carrying exactly this label, in document order
    pub fn get_by_label(&self, label: &str) -> &[NodeId] {
        self.by_label.get(label).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptb::parse_tree;

    #[test]
    fn test_spans() {
        let tree = parse_tree("(S (NP (DT the) (NN dog)) (VP (VBZ runs)))").unwrap();
        let index = TreeIndex::build(&tree);

        assert_eq!(index.span(0), Some((0, 2))); // S
        assert_eq!(index.span(1), Some((0, 1))); // NP
        assert_eq!(index.span(4), Some((1, 1))); // NN
        assert_eq!(index.span(6), Some((2, 2))); // VP
    }

    #[test]
    fn test_label_lookup_in_document_order() {
        let tree = parse_tree("(S (NP (NN a)) (VP (NP (NN b))))").unwrap();
        let index = TreeIndex::build(&tree);

        let nps = index.get_by_label("NP");
        assert_eq!(nps.len(), 2);
        assert!(index.position(nps[0]) < index.position(nps[1]));
        assert!(index.get_by_label("PP").is_empty());
    }
}
