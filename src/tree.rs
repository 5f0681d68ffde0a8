//! Constituency tree data structures
//!
//! Trees are stored as an arena of labeled nodes with parent/child links.
//! Leaves carry the words of the sentence; their parents are the
//! part-of-speech preterminals.

use std::fmt;

/// Unique identifier for a node (index into `Tree::nodes`)
pub type NodeId = usize;

/// A node in a constituency tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn new(id: NodeId, label: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A parse tree (one sentence)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub root_id: Option<NodeId>,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with the given label, returning its id.
    /// The first node added becomes the root.
    pub fn add_node(&mut self, label: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, label));
        if self.root_id.is_none() {
            self.root_id = Some(id);
        }
        id
    }

    /// Add a node as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, label: &str) -> NodeId {
        let id = self.add_node(label);
        self.set_parent(id, parent);
        id
    }

    /// Remove the most recently added node, detaching it from its parent.
    /// Only valid while that node has no children.
    pub fn pop_node(&mut self) -> Option<Node> {
        let node = self.nodes.pop()?;
        if let Some(parent) = node.parent {
            self.nodes[parent].children.retain(|&child| child != node.id);
        }
        if self.root_id == Some(node.id) {
            self.root_id = None;
        }
        Some(node)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Set the parent of a node, appending it to the parent's children
    pub fn set_parent(&mut self, child_id: NodeId, parent_id: NodeId) {
        if child_id >= self.nodes.len() || parent_id >= self.nodes.len() {
            return;
        }
        self.nodes[child_id].parent = Some(parent_id);
        self.nodes[parent_id].children.push(child_id);
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).map(|node| node.label.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.get_node(id)
            .and_then(|node| node.parent)
            .and_then(|parent_id| self.get_node(parent_id))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get_node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Node ids in pre-order (document order) starting from the root
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.root_id {
            self.preorder_from(root, &mut order);
        }
        order
    }

    /// Pre-order traversal of the subtree rooted at `id`, appended to `out`
    pub fn preorder_from(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
    }

    /// Leaves of the whole tree, left to right
    pub fn leaves(&self) -> Vec<NodeId> {
        match self.root_id {
            Some(root) => self.leaves_under(root),
            None => Vec::new(),
        }
    }

    /// Leaves of the subtree rooted at `id`, left to right
    pub fn leaves_under(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        self.preorder_from(id, &mut order);
        order.retain(|&n| self.nodes[n].is_leaf());
        order
    }

    /// Surface text of a subtree: its leaf labels joined by single spaces
    pub fn yield_text(&self, id: NodeId) -> String {
        self.leaves_under(id)
            .into_iter()
            .map(|leaf| self.nodes[leaf].label.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether `ancestor` properly dominates `id`
    pub fn dominates(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.get_node(id).and_then(|node| node.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.nodes[parent].parent;
        }
        false
    }

    /// Sentence text (all leaves)
    pub fn sentence(&self) -> String {
        self.root_id
            .map(|root| self.yield_text(root))
            .unwrap_or_default()
    }

    fn fmt_node(&self, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = &self.nodes[id];
        if node.is_leaf() {
            return write!(f, "{}", node.label);
        }
        write!(f, "({}", node.label)?;
        for &child in &node.children {
            write!(f, " ")?;
            self.fmt_node(child, f)?;
        }
        write!(f, ")")
    }
}

/// Penn Treebank bracketed rendering
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root_id {
            Some(root) => self.fmt_node(root, f),
            None => write!(f, "()"),
        }
    }
}
