//! Tree matching
//!
//! The engine only relies on two capabilities: compile a query string, and
//! run the compiled query over a tree to get a lazy sequence of bindings.
//! [`MatchEngine`] and [`CompiledQuery`] describe that seam;
//! [`StructuralMatcher`] implements it for the query language produced by
//! [`crate::compiler::compile_to_query`].

use crate::error::PatternError;
use crate::index::TreeIndex;
use crate::pattern::{Pattern, PatternNodeId, RelationType};
use crate::query::parse_query;
use crate::tree::{NodeId, Tree};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of one match: capture id -> matched node, plus the tree it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding<'t> {
    tree: &'t Tree,
    captures: BTreeMap<u32, NodeId>,
}

impl<'t> Binding<'t> {
    pub fn new(tree: &'t Tree, captures: BTreeMap<u32, NodeId>) -> Self {
        Self { tree, captures }
    }

    /// Build from capture labels. Labels that are not numeric ids are dropped.
    pub fn from_labels<'a>(tree: &'t Tree, labels: impl IntoIterator<Item = (&'a str, NodeId)>) -> Self {
        let captures = labels
            .into_iter()
            .filter_map(|(label, node)| label.parse::<u32>().ok().map(|id| (id, node)))
            .collect();
        Self { tree, captures }
    }

    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    pub fn get(&self, id: u32) -> Option<NodeId> {
        self.captures.get(&id).copied()
    }

    /// Surface text of the node bound to `id`
    pub fn text(&self, id: u32) -> Option<String> {
        self.get(id).map(|node| self.tree.yield_text(node))
    }

    /// Iterate over (capture id, node) pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, NodeId)> + '_ {
        self.captures.iter().map(|(&id, &node)| (id, node))
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }
}

/// A query ready to run against trees
pub trait CompiledQuery {
    /// Lazily yield every match in `tree`. Calling again starts over.
    fn matches<'t>(&self, tree: &'t Tree) -> Box<dyn Iterator<Item = Binding<'t>> + 't>;

    /// First match in `tree`, if any
    fn find<'t>(&self, tree: &'t Tree) -> Option<Binding<'t>> {
        self.matches(tree).next()
    }
}

/// Compiles query strings into runnable queries
pub trait MatchEngine {
    type Query: CompiledQuery;

    fn compile(&self, query: &str) -> Result<Self::Query, PatternError>;
}

/// Built-in structural matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralMatcher;

impl MatchEngine for StructuralMatcher {
    type Query = CompiledPattern;

    fn compile(&self, query: &str) -> Result<CompiledPattern, PatternError> {
        let pattern = parse_query(query)?;
        tracing::debug!(query, nodes = pattern.nodes.len(), "compiled structural query");
        Ok(CompiledPattern {
            pattern: Arc::new(pattern),
        })
    }
}

/// A parsed pattern, shareable across threads
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: Arc<Pattern>,
}

impl CompiledPattern {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }
}

impl CompiledQuery for CompiledPattern {
    fn matches<'t>(&self, tree: &'t Tree) -> Box<dyn Iterator<Item = Binding<'t>> + 't> {
        if self.pattern.is_empty() {
            return Box::new(std::iter::empty());
        }
        Box::new(Matches::new(tree, Arc::clone(&self.pattern)))
    }
}

/// Anchor candidates in document order, narrowed by label when possible
fn anchor_candidates(pattern: &Pattern, index: &TreeIndex<'_>) -> Vec<NodeId> {
    match pattern.nodes[0].test.exact_label() {
        Some(label) => index.get_by_label(label).to_vec(),
        None => index.preorder().to_vec(),
    }
}

/// A pattern node to bind, and the earlier step and relation its candidates
/// come from. Only the anchor has no link.
struct Step {
    target: PatternNodeId,
    link: Option<(usize, RelationType)>,
}

/// Pattern nodes in depth-first order, so each step's source is already bound
fn plan(pattern: &Pattern, p: PatternNodeId, link: Option<(usize, RelationType)>, steps: &mut Vec<Step>) {
    let index = steps.len();
    steps.push(Step { target: p, link });
    for &(relation, target) in &pattern.nodes[p].relations {
        plan(pattern, target, Some((index, relation)), steps);
    }
}

/// Candidates for one step and the position of the next one to try
struct Frame {
    candidates: Vec<NodeId>,
    next: usize,
}

impl Frame {
    fn new(candidates: Vec<NodeId>) -> Self {
        Self { candidates, next: 0 }
    }

    /// Node bound at this step
    fn current(&self) -> NodeId {
        self.candidates[self.next - 1]
    }
}

/// Backtracking search over one tree.
///
/// Each call to `next` resumes from the last complete assignment, so taking
/// the first match costs no more than finding it.
struct Matches<'t> {
    tree: &'t Tree,
    index: TreeIndex<'t>,
    pattern: Arc<Pattern>,
    steps: Vec<Step>,
    frames: Vec<Frame>,
}

impl<'t> Matches<'t> {
    fn new(tree: &'t Tree, pattern: Arc<Pattern>) -> Self {
        let index = TreeIndex::build(tree);
        let mut steps = Vec::with_capacity(pattern.nodes.len());
        plan(&pattern, 0, None, &mut steps);
        let frames = vec![Frame::new(anchor_candidates(&pattern, &index))];
        Self {
            tree,
            index,
            pattern,
            steps,
            frames,
        }
    }

    fn binding(&self) -> Binding<'t> {
        let captures = self
            .steps
            .iter()
            .zip(&self.frames)
            .filter_map(|(step, frame)| {
                self.pattern.nodes[step.target]
                    .label
                    .parse::<u32>()
                    .ok()
                    .map(|id| (id, frame.current()))
            })
            .collect();
        Binding::new(self.tree, captures)
    }

    /// Nodes standing in `relation` to `node`, in document order
    fn related(&self, relation: RelationType, node: NodeId) -> Vec<NodeId> {
        let tree = self.tree;
        match relation {
            RelationType::Dominates => {
                let mut below = Vec::new();
                tree.preorder_from(node, &mut below);
                below.remove(0);
                below
            }
            RelationType::ImmediatelyDominates => tree.children(node).to_vec(),
            RelationType::DominatedBy => {
                let mut above = Vec::new();
                let mut current = tree.nodes[node].parent;
                while let Some(parent) = current {
                    above.push(parent);
                    current = tree.nodes[parent].parent;
                }
                above
            }
            RelationType::ImmediatelyDominatedBy => tree.nodes[node].parent.into_iter().collect(),
            RelationType::SisterOf => match tree.nodes[node].parent {
                Some(parent) => tree
                    .children(parent)
                    .iter()
                    .copied()
                    .filter(|&sister| sister != node)
                    .collect(),
                None => Vec::new(),
            },
            RelationType::Precedes
            | RelationType::ImmediatelyPrecedes
            | RelationType::Follows
            | RelationType::ImmediatelyFollows => {
                let Some((start, end)) = self.index.span(node) else {
                    return Vec::new();
                };
                self.index
                    .preorder()
                    .iter()
                    .copied()
                    .filter(|&other| {
                        let Some((other_start, other_end)) = self.index.span(other) else {
                            return false;
                        };
                        match relation {
                            RelationType::Precedes => other_start > end,
                            RelationType::ImmediatelyPrecedes => other_start == end + 1,
                            RelationType::Follows => other_end < start,
                            _ => other_end + 1 == start,
                        }
                    })
                    .collect()
            }
        }
    }
}

impl<'t> Iterator for Matches<'t> {
    type Item = Binding<'t>;

    fn next(&mut self) -> Option<Binding<'t>> {
        while let Some(frame) = self.frames.last_mut() {
            let Some(&node) = frame.candidates.get(frame.next) else {
                self.frames.pop();
                continue;
            };
            frame.next += 1;

            let step = self.frames.len() - 1;
            let target = self.steps[step].target;
            if !self.pattern.nodes[target].test.matches(&self.tree.nodes[node].label) {
                continue;
            }
            let Some(next_step) = self.steps.get(step + 1) else {
                return Some(self.binding());
            };
            let candidates = match next_step.link {
                Some((source, relation)) => self.related(relation, self.frames[source].current()),
                None => Vec::new(),
            };
            self.frames.push(Frame::new(candidates));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptb::parse_tree;
    use std::time::{Duration, Instant};

    const SENTENCE: &str =
        "(ROOT (S (NP (DT The) (NN dog)) (VP (VBD chased) (NP (DT the) (NN cat))) (. .)))";

    fn texts(binding: &Binding<'_>) -> Vec<(u32, String)> {
        binding
            .iter()
            .map(|(id, node)| (id, binding.tree().yield_text(node)))
            .collect()
    }

    fn run(query: &str, tree: &Tree) -> Vec<Vec<(u32, String)>> {
        let compiled = StructuralMatcher.compile(query).unwrap();
        compiled.matches(tree).map(|b| texts(&b)).collect()
    }

    #[test]
    fn test_single_node_matches_in_document_order() {
        let tree = parse_tree(SENTENCE).unwrap();
        let matches = run("(NN=1)", &tree);

        assert_eq!(
            matches,
            vec![vec![(1, "dog".to_string())], vec![(1, "cat".to_string())]]
        );
    }

    #[test]
    fn test_dominance() {
        let tree = parse_tree(SENTENCE).unwrap();

        let matches = run("(VP=1 << (NN=2))", &tree);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0][1], (2, "cat".to_string()));

        let matches = run("(VP=1 < (NN=2))", &tree);
        assert!(matches.is_empty());

        let matches = run("(NN=1 >> (VP=2))", &tree);
        assert_eq!(matches, vec![vec![(1, "cat".to_string()), (2, "chased the cat".to_string())]]);

        let matches = run("(NN=1 > (NP=2))", &tree);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_precedence() {
        let tree = parse_tree(SENTENCE).unwrap();

        let matches = run("(NP=1 .. (VBD=2))", &tree);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0][0], (1, "The dog".to_string()));

        let matches = run("(NN=1 . (VBD=2))", &tree);
        assert_eq!(matches.len(), 1);

        let matches = run("(NN=1 ,, (VBD=2))", &tree);
        assert_eq!(matches[0][0], (1, "cat".to_string()));

        let matches = run("(VBD=1 , (NP=2))", &tree);
        assert_eq!(matches, vec![vec![(1, "chased".to_string()), (2, "The dog".to_string())]]);
    }

    #[test]
    fn test_sisters() {
        let tree = parse_tree(SENTENCE).unwrap();
        let matches = run("(NP=1 $ (VP=2))", &tree);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0][0], (1, "The dog".to_string()));
    }

    #[test]
    fn test_wildcard_regex_and_negation() {
        let tree = parse_tree(SENTENCE).unwrap();

        assert_eq!(run("(/^V/=1)", &tree).len(), 2); // VP, VBD
        assert_eq!(run("(NP=1 < (!DT=2))", &tree).len(), 2);
        assert_eq!(run("(NP|VP=1)", &tree).len(), 3);
        let all = run("(__=1)", &tree);
        assert_eq!(all.len(), tree.nodes.len());
    }

    #[test]
    fn test_all_matches_are_enumerated_lazily() {
        let tree = parse_tree(SENTENCE).unwrap();
        let compiled = StructuralMatcher.compile("(NP=1 < (DT=2))").unwrap();

        let mut matches = compiled.matches(&tree);
        let first = matches.next().unwrap();
        assert_eq!(first.text(2).as_deref(), Some("The"));
        let second = matches.next().unwrap();
        assert_eq!(second.text(2).as_deref(), Some("the"));
        assert!(matches.next().is_none());

        // Restartable
        assert_eq!(compiled.find(&tree).unwrap().text(1).as_deref(), Some("The dog"));
    }

    #[test]
    fn test_first_match_with_many_wildcards_is_cheap() {
        let words: String = (0..25).map(|i| format!(" (NN w{i})")).collect();
        let tree = parse_tree(&format!("(S{words})")).unwrap();
        let compiled = StructuralMatcher
            .compile("(S=1 << (__=2) << (__=3) << (__=4) << (__=5) << (__=6) << (__=7))")
            .unwrap();

        let started = Instant::now();
        let binding = compiled.find(&tree).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));

        // Depth-first: every wildcard takes the first node below S
        for id in 2..=7 {
            assert_eq!(binding.text(id).as_deref(), Some("w0"));
        }
        assert_eq!(binding.get(2), Some(1));

        let mut matches = compiled.matches(&tree);
        matches.next();
        let second = matches.next().unwrap();
        assert_eq!(second.get(6), Some(1));
        assert_eq!(second.get(7), Some(2));
    }

    #[test]
    fn test_relations_of_one_node_backtrack_in_order() {
        let tree = parse_tree(SENTENCE).unwrap();
        let matches = run("(S=1 < (NP=2) < (/^[.V]/=3))", &tree);

        let pairs: Vec<_> = matches.iter().map(|m| (m[1].1.as_str(), m[2].1.as_str())).collect();
        assert_eq!(pairs, vec![("The dog", "chased the cat"), ("The dog", ".")]);
    }

    #[test]
    fn test_non_numeric_labels_are_dropped() {
        let tree = parse_tree(SENTENCE).unwrap();
        let binding = Binding::from_labels(&tree, [("1", 0), ("x", 1)]);

        assert_eq!(binding.len(), 1);
        assert_eq!(binding.get(1), Some(0));
    }

    #[test]
    fn test_pattern_errors_surface() {
        assert!(matches!(StructuralMatcher.compile(""), Err(PatternError::Empty)));
        assert!(StructuralMatcher.compile("(NP=1 <").is_err());
    }
}
