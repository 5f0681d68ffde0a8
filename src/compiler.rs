//! Compilation of match fragments into an executable structural query
//!
//! The fragment list is first turned into an arena (`FragmentTree`) where
//! every fragment records the index of its parent. The query is then
//! emitted from the arena, each fragment becoming a node test labeled with
//! its id so bindings can be looked up by id afterwards:
//!
//! ```text
//! (NP=1 << (NN=2) . (VP=3))
//! ```
//!
//! The first level-1 fragment is the anchor. Further level-1 fragments are
//! related to the anchor by their own kind.

use crate::error::{CompileError, StructureError};
use crate::fragment::{FragmentKind, MatchFragment};
use std::fmt::Write as _;

/// Hierarchy of a rule's fragments with parent links
#[derive(Debug, Clone)]
pub struct FragmentTree<'a> {
    pub fragments: &'a [MatchFragment],
    /// Parent index for each fragment (None for level-1 fragments)
    pub parents: Vec<Option<usize>>,
    /// Child indices for each fragment, in order
    pub children: Vec<Vec<usize>>,
    /// Level-1 fragment indices, in order
    pub roots: Vec<usize>,
}

impl<'a> FragmentTree<'a> {
    /// Build the arena, rejecting level jumps the same way
    /// [`crate::expression::compile_to_expression`] does.
    pub fn build(fragments: &'a [MatchFragment]) -> Result<Self, StructureError> {
        let mut parents = Vec::with_capacity(fragments.len());
        let mut children = vec![Vec::new(); fragments.len()];
        let mut roots = Vec::new();
        // Most recent fragment index seen at each level (index 0 = level 1)
        let mut open: Vec<usize> = Vec::new();
        let mut previous = 0u32;

        for (idx, fragment) in fragments.iter().enumerate() {
            let level = fragment.level;
            if level == 0 {
                return Err(StructureError::ZeroLevel { id: fragment.id });
            }
            if level > previous + 1 {
                return Err(StructureError::LevelJump {
                    id: fragment.id,
                    previous,
                    level,
                });
            }

            open.truncate(level as usize - 1);
            let parent = open.last().copied();
            match parent {
                Some(p) => children[p].push(idx),
                None => roots.push(idx),
            }
            parents.push(parent);
            open.push(idx);
            previous = level;
        }

        Ok(Self {
            fragments,
            parents,
            children,
            roots,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Compile fragments into a query string for the matching primitive.
///
/// Every kind must name a known relation. An empty fragment list compiles
/// to an empty query, which callers treat as "no pattern".
pub fn compile_to_query(fragments: &[MatchFragment]) -> Result<String, CompileError> {
    let tree = FragmentTree::build(fragments)?;
    if tree.is_empty() {
        return Ok(String::new());
    }

    let kinds = fragments
        .iter()
        .map(|f| {
            f.kind.parse::<FragmentKind>().map_err(|_| CompileError::UnknownKind {
                id: f.id,
                kind: f.kind.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let anchor = tree.roots[0];
    let mut anchor_relations: Vec<usize> = tree.children[anchor].clone();
    anchor_relations.extend(tree.roots.iter().skip(1));

    let mut query = String::new();
    emit_node(&tree, &kinds, anchor, &anchor_relations, &mut query);
    Ok(query)
}

fn emit_node(
    tree: &FragmentTree<'_>,
    kinds: &[FragmentKind],
    idx: usize,
    relations: &[usize],
    out: &mut String,
) {
    let fragment = &tree.fragments[idx];
    let test = match fragment.pattern.trim() {
        "" => "__",
        pattern => pattern,
    };
    let _ = write!(out, "({}={}", test, fragment.id);
    for &child in relations {
        let _ = write!(out, " {} ", kinds[child].operator());
        emit_node(tree, kinds, child, &tree.children[child], out);
    }
    out.push(')');
}
