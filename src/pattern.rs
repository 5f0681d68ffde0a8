//! Pattern representation for the structural matcher
//!
//! A pattern is an arena of node tests. Node 0 is the anchor; every other
//! node is reached from its parent through one relation.

use regex::Regex;
use std::fmt::Debug;

/// Index into `Pattern::nodes`
pub type PatternNodeId = usize;

/// Label written for "match any node"
pub const WILDCARD: &str = "__";

/// Test applied to a single node label
#[derive(Clone)]
pub enum LabelTest {
    Any,
    Exact(String),
    Regex(String, Regex), // Pattern string + compiled regex
}

impl LabelTest {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            LabelTest::Any => true,
            LabelTest::Exact(expected) => expected == label,
            LabelTest::Regex(_, regex) => regex.is_match(label),
        }
    }
}

// Manual Debug implementation
impl Debug for LabelTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelTest::Any => f.write_str("Any"),
            LabelTest::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            LabelTest::Regex(pattern, _) => f.debug_tuple("Regex").field(pattern).finish(),
        }
    }
}

// Compare pattern strings, not compiled regexes
impl PartialEq for LabelTest {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LabelTest::Any, LabelTest::Any) => true,
            (LabelTest::Exact(a), LabelTest::Exact(b)) => a == b,
            (LabelTest::Regex(a, _), LabelTest::Regex(b, _)) => a == b,
            _ => false,
        }
    }
}

/// Alternation of label tests, optionally negated
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTest {
    pub negated: bool,
    pub alternatives: Vec<LabelTest>,
}

impl NodeTest {
    pub fn any() -> Self {
        Self {
            negated: false,
            alternatives: vec![LabelTest::Any],
        }
    }

    pub fn matches(&self, label: &str) -> bool {
        self.alternatives.iter().any(|test| test.matches(label)) != self.negated
    }

    /// The single exact label this test requires, if any (used for
    /// candidate lookup)
    pub fn exact_label(&self) -> Option<&str> {
        match (self.negated, self.alternatives.as_slice()) {
            (false, [LabelTest::Exact(label)]) => Some(label),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationType {
    Dominates,
    ImmediatelyDominates,
    DominatedBy,
    ImmediatelyDominatedBy,
    Precedes,
    ImmediatelyPrecedes,
    Follows,
    ImmediatelyFollows,
    SisterOf,
}

impl RelationType {
    pub fn from_operator(op: &str) -> Option<RelationType> {
        Some(match op {
            "<<" => RelationType::Dominates,
            "<" => RelationType::ImmediatelyDominates,
            ">>" => RelationType::DominatedBy,
            ">" => RelationType::ImmediatelyDominatedBy,
            ".." => RelationType::Precedes,
            "." => RelationType::ImmediatelyPrecedes,
            ",," => RelationType::Follows,
            "," => RelationType::ImmediatelyFollows,
            "$" => RelationType::SisterOf,
            _ => return None,
        })
    }
}

/// A node in the pattern with its capture label
#[derive(Debug, Clone)]
pub struct PatternNode {
    pub label: String,
    pub test: NodeTest,
    pub relations: Vec<(RelationType, PatternNodeId)>,
}

/// A complete pattern to match against trees
#[derive(Debug, Clone, Default)]
pub struct Pattern {
    pub nodes: Vec<PatternNode>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its id
    pub fn add_node(&mut self, label: &str, test: NodeTest) -> PatternNodeId {
        let id = self.nodes.len();
        self.nodes.push(PatternNode {
            label: label.to_string(),
            test,
            relations: Vec::new(),
        });
        id
    }

    /// Relate `from` to `to`: `from <relation> to`
    pub fn add_relation(&mut self, from: PatternNodeId, relation: RelationType, to: PatternNodeId) {
        if let Some(node) = self.nodes.get_mut(from) {
            node.relations.push((relation, to));
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.label.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
